use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use derive_more::{Add, AddAssign, From, Into, Sub, SubAssign, Sum};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

// ---------------------------------------------------------------------------
// Money
// ---------------------------------------------------------------------------

pub const LAKHS_PER_CRORE: i64 = 100;

/// Largest single amount the ledger accepts. Keeps every purse, price and
/// squad total far inside i64 lakhs.
pub const MAX_CRORES: f64 = 1e9;

/// Fixed-point money stored as whole lakhs (1 crore = 100 lakhs).
///
/// On the wire money is a decimal number of crores: `Money(205)` is `2.05`.
/// Deserialization accepts a JSON number or a numeric string and rejects
/// negative, non-finite and over-cap values, so a malformed amount never
/// reaches the ledger.
#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Add,
    Sub,
    AddAssign,
    SubAssign,
    Sum,
    From,
    Into,
    sqlx::Type,
)]
#[sqlx(transparent)]
pub struct Money(pub i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Rounds to the nearest lakh. None for NaN, infinities, negatives and
    /// anything above `MAX_CRORES`.
    pub fn from_crores(crores: f64) -> Option<Self> {
        if !crores.is_finite() || !(0.0..=MAX_CRORES).contains(&crores) {
            return None;
        }
        Some(Money((crores * LAKHS_PER_CRORE as f64).round() as i64))
    }

    #[inline]
    pub fn to_crores(self) -> f64 {
        self.0 as f64 / LAKHS_PER_CRORE as f64
    }

    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money)
    }

    pub fn saturating_add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl fmt::Debug for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Money({}L)", self.0)
    }
}

/// "2.00 Cr" from one crore upwards, "50 Lakhs" below.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 >= LAKHS_PER_CRORE {
            write!(f, "{:.2} Cr", self.to_crores())
        } else {
            write!(f, "{} Lakhs", self.0)
        }
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_crores())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MoneyVisitor;

        impl de::Visitor<'_> for MoneyVisitor {
            type Value = Money;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a non-negative amount in crores")
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Money, E> {
                Money::from_crores(v)
                    .ok_or_else(|| E::custom(format!("invalid amount {v}: must be between 0 and {MAX_CRORES} crores")))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
                self.visit_f64(v as f64)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
                self.visit_f64(v as f64)
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
                let parsed = v
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| E::custom(format!("invalid amount {v:?}: not a number")))?;
                self.visit_f64(parsed)
            }
        }

        deserializer.deserialize_any(MoneyVisitor)
    }
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
pub enum Category {
    Batsman,
    Bowler,
    #[serde(rename = "All-rounder")]
    #[sqlx(rename = "All-rounder")]
    AllRounder,
    Wicketkeeper,
    Spinner,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Category::Batsman => "Batsman",
            Category::Bowler => "Bowler",
            Category::AllRounder => "All-rounder",
            Category::Wicketkeeper => "Wicketkeeper",
            Category::Spinner => "Spinner",
        };
        write!(f, "{s}")
    }
}

/// Per-player auction state.
///
/// `not_started -> in_auction -> sold | unsold`; `retained` is entered only
/// through retention and left only through release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum PlayerStatus {
    NotStarted,
    InAuction,
    Sold,
    Unsold,
    Retained,
}

impl PlayerStatus {
    /// True when the player must own exactly one squad entry.
    pub fn is_owned(self) -> bool {
        matches!(self, PlayerStatus::Sold | PlayerStatus::Retained)
    }
}

impl fmt::Display for PlayerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PlayerStatus::NotStarted => "not_started",
            PlayerStatus::InAuction => "in_auction",
            PlayerStatus::Sold => "sold",
            PlayerStatus::Unsold => "unsold",
            PlayerStatus::Retained => "retained",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Auction round
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum RoundStatus {
    Live,
    Completed,
}

impl fmt::Display for RoundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundStatus::Live => write!(f, "live"),
            RoundStatus::Completed => write!(f, "completed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Principal roles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[serde(alias = "participant")]
    Team,
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "team" | "participant" => Ok(Role::Team),
            other => Err(format!("unknown role {other:?}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// Nanosecond UTC epoch, the timestamp unit of every table.
pub fn now_ns() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_rounds_crores_to_nearest_lakh() {
        assert_eq!(Money::from_crores(2.05), Some(Money(205)));
        assert_eq!(Money::from_crores(0.204), Some(Money(20)));
        assert_eq!(Money::from_crores(-1.0), None);
        assert_eq!(Money::from_crores(f64::NAN), None);
    }

    #[test]
    fn money_above_the_cap_is_rejected() {
        assert_eq!(Money::from_crores(MAX_CRORES), Some(Money(100_000_000_000)));
        assert_eq!(Money::from_crores(MAX_CRORES + 1.0), None);
        assert!(serde_json::from_str::<Money>("6e16").is_err());
        assert!(serde_json::from_str::<Money>("\"1e10\"").is_err());
    }

    #[test]
    fn money_display_switches_units_at_one_crore() {
        assert_eq!(Money(250).to_string(), "2.50 Cr");
        assert_eq!(Money(50).to_string(), "50 Lakhs");
    }

    #[test]
    fn money_deserializes_numbers_and_numeric_strings() {
        let m: Money = serde_json::from_str("90").unwrap();
        assert_eq!(m, Money(9000));
        let m: Money = serde_json::from_str("\"5.5\"").unwrap();
        assert_eq!(m, Money(550));
        assert!(serde_json::from_str::<Money>("\"five\"").is_err());
        assert!(serde_json::from_str::<Money>("-2").is_err());
    }

    #[test]
    fn money_serializes_as_crores() {
        assert_eq!(serde_json::to_string(&Money(8500)).unwrap(), "85.0");
    }

    #[test]
    fn category_uses_hyphenated_all_rounder() {
        let c: Category = serde_json::from_str("\"All-rounder\"").unwrap();
        assert_eq!(c, Category::AllRounder);
        assert_eq!(c.to_string(), "All-rounder");
    }

    #[test]
    fn role_parses_participant_as_team() {
        assert_eq!("participant".parse::<Role>(), Ok(Role::Team));
        assert_eq!(" Admin ".parse::<Role>(), Ok(Role::Admin));
        assert!("owner".parse::<Role>().is_err());
    }
}

use serde::Deserialize;

// ---------------------------------------------------------------------------
// API response types (mirror the server's JSON shapes)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct VersionResponse {
    pub version: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrentResponse {
    pub round: Option<LiveRound>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LiveRound {
    pub id: i64,
    pub current_bid: f64,
    pub player: PlayerView,
    pub leading_team: Option<TeamRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerView {
    pub name: String,
    pub category: String,
    pub country: String,
    pub is_overseas: bool,
    pub base_price: f64,
    pub set_no: Option<i64>,
    pub status: String,
    pub sold_price: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeamRef {
    pub name: String,
    pub short_code: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeamsResponse {
    pub teams: Vec<TeamRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeamRow {
    pub short_code: String,
    pub name: String,
    pub purse_start: f64,
    pub purse_remaining: f64,
    pub max_squad_size: i64,
    pub summary: SquadSummary,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SquadSummary {
    pub squad_size: i64,
    pub overseas: i64,
    pub spent: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecentlySoldResponse {
    pub players: Vec<ClosedPlayer>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClosedPlayer {
    #[serde(flatten)]
    pub player: PlayerView,
    pub team: Option<TeamRef>,
}

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStatus {
    Connected,
    Error(String),
    Connecting,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub status: ConnectionStatus,
    /// Ledger version of the data on screen. None until the first full fetch.
    pub version: Option<i64>,
    pub live: Option<LiveRound>,
    pub teams: Vec<TeamRow>,
    pub recently_sold: Vec<ClosedPlayer>,
    pub last_refresh: std::time::Instant,
    pub base_url: String,
}

impl AppState {
    pub fn new(base_url: String) -> Self {
        Self {
            status: ConnectionStatus::Connecting,
            version: None,
            live: None,
            teams: Vec::new(),
            recently_sold: Vec::new(),
            last_refresh: std::time::Instant::now(),
            base_url,
        }
    }

    /// Polls the ledger version and refetches the views only when it moved
    /// (or `force` is set).
    pub async fn refresh(&mut self, client: &reqwest::Client, force: bool) {
        let version_url = format!("{}/auction/version", self.base_url);
        let version = match fetch::<VersionResponse>(client, &version_url).await {
            Ok(v) => v.version,
            Err(e) => {
                self.status = ConnectionStatus::Error(e);
                return;
            }
        };
        if !force && self.version == Some(version) {
            self.status = ConnectionStatus::Connected;
            return;
        }

        let current_url = format!("{}/auction/current", self.base_url);
        let teams_url = format!("{}/teams", self.base_url);
        let sold_url = format!("{}/auction/recently-sold?limit=5", self.base_url);

        let (current, teams, sold) = tokio::join!(
            fetch::<CurrentResponse>(client, &current_url),
            fetch::<TeamsResponse>(client, &teams_url),
            fetch::<RecentlySoldResponse>(client, &sold_url),
        );

        match (current, teams, sold) {
            (Ok(c), Ok(t), Ok(s)) => {
                self.live = c.round;
                self.teams = t.teams;
                self.recently_sold = s.players;
                self.version = Some(version);
                self.status = ConnectionStatus::Connected;
                self.last_refresh = std::time::Instant::now();
            }
            (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => {
                self.status = ConnectionStatus::Error(e);
            }
        }
    }
}

async fn fetch<T: serde::de::DeserializeOwned>(client: &reqwest::Client, url: &str) -> Result<T, String> {
    let resp = client.get(url).send().await.map_err(|e| e.to_string())?;
    if !resp.status().is_success() {
        return Err(format!("{url} returned {}", resp.status()));
    }
    resp.json::<T>().await.map_err(|e| format!("parse error: {e}"))
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// Crores as the auction hall reads them: "2.50 Cr", or "50 L" below a crore.
pub fn format_money(crores: f64) -> String {
    if crores >= 1.0 {
        format!("{crores:.2} Cr")
    } else {
        format!("{:.0} L", crores * 100.0)
    }
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{head}…")
    }
}

mod app;

use std::io;
use std::time::Duration;

use app::{format_money, truncate, AppState, ConnectionStatus};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame, Terminal,
};

const REFRESH_INTERVAL: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> io::Result<()> {
    let base_url = std::env::var("API_URL").unwrap_or_else(|_| "http://localhost:3001".to_string());

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

    let mut app = AppState::new(base_url);

    // Initial fetch before rendering
    app.refresh(&client, true).await;

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, &mut app, &client).await;

    // Restore terminal regardless of result
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
    client: &reqwest::Client,
) -> io::Result<()> {
    let mut last_tick = std::time::Instant::now();

    loop {
        terminal.draw(|f| render(f, app))?;

        let timeout = REFRESH_INTERVAL
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => return Ok(()),
                        KeyCode::Char('r') | KeyCode::Char('R') => {
                            app.refresh(client, true).await;
                            last_tick = std::time::Instant::now();
                        }
                        _ => {}
                    }
                }
            }
        }

        if last_tick.elapsed() >= REFRESH_INTERVAL {
            app.refresh(client, false).await;
            last_tick = std::time::Instant::now();
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render(f: &mut Frame, app: &AppState) {
    let area = f.area();

    // header | live round | teams + feed | footer
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(7),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    render_header(f, app, chunks[0]);
    render_live_round(f, app, chunks[1]);

    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[2]);
    render_teams_table(f, app, halves[0]);
    render_recently_sold(f, app, halves[1]);

    render_footer(f, chunks[3]);
}

fn titled(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            title,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
}

fn render_header(f: &mut Frame, app: &AppState, area: Rect) {
    let (status_text, status_color) = match &app.status {
        ConnectionStatus::Connected => ("● connected".to_string(), Color::Green),
        ConnectionStatus::Connecting => ("◌ connecting".to_string(), Color::Yellow),
        ConnectionStatus::Error(e) => (format!("✗ {}", truncate(e, 40)), Color::Red),
    };
    let version = app.version.map_or("-".to_string(), |v| format!("v{v}"));

    let line = Line::from(vec![
        Span::styled(
            " Mock Auction  ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled(status_text, Style::default().fg(status_color)),
        Span::raw("  │  "),
        Span::styled(format!("{} teams", app.teams.len()), Style::default().fg(Color::White)),
        Span::raw("  │  "),
        Span::styled(
            format!("ledger {version}, updated {}s ago", app.last_refresh.elapsed().as_secs()),
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    let paragraph = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    f.render_widget(paragraph, area);
}

fn render_live_round(f: &mut Frame, app: &AppState, area: Rect) {
    let lines = match &app.live {
        None => vec![Line::from(Span::styled(
            "Waiting for the next player…",
            Style::default().fg(Color::DarkGray),
        ))],
        Some(round) => {
            let p = &round.player;
            let flag = if p.is_overseas { "  ✈ overseas" } else { "" };
            let set = p.set_no.map_or(String::new(), |s| format!("  set {s}"));
            let leader = match &round.leading_team {
                Some(t) => Span::styled(
                    format!("{} ({})", t.name, t.short_code),
                    Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                ),
                None => Span::styled("no bids yet", Style::default().fg(Color::DarkGray)),
            };
            vec![
                Line::from(vec![
                    Span::styled(
                        p.name.clone(),
                        Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(
                        format!("  {} · {}{flag}{set}", p.category, p.country),
                        Style::default().fg(Color::Gray),
                    ),
                ]),
                Line::from(vec![
                    Span::raw("Base "),
                    Span::styled(format_money(p.base_price), Style::default().fg(Color::Gray)),
                    Span::raw("   Current bid "),
                    Span::styled(
                        format_money(round.current_bid),
                        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                    ),
                ]),
                Line::from(vec![Span::raw("Leading: "), leader]),
            ]
        }
    };

    let title = match &app.live {
        Some(round) => format!(" LIVE · ROUND {} ", round.id),
        None => " LIVE ".to_string(),
    };
    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(titled(&title));
    f.render_widget(paragraph, area);
}

fn render_teams_table(f: &mut Frame, app: &AppState, area: Rect) {
    let header_cells = ["Team", "Purse", "Spent", "Squad", "OS"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));
    let header = Row::new(header_cells).height(1);

    let rows: Vec<Row> = app
        .teams
        .iter()
        .map(|t| {
            let share = if t.purse_start > 0.0 {
                t.purse_remaining / t.purse_start
            } else {
                0.0
            };
            let purse_color = if share >= 0.5 {
                Color::Green
            } else if share >= 0.2 {
                Color::Yellow
            } else {
                Color::Red
            };
            Row::new(vec![
                Cell::from(format!("{} {}", t.short_code, truncate(&t.name, 16))),
                Cell::from(format_money(t.purse_remaining)).style(Style::default().fg(purse_color)),
                Cell::from(format_money(t.summary.spent)),
                Cell::from(format!("{}/{}", t.summary.squad_size, t.max_squad_size))
                    .style(Style::default().fg(Color::Cyan)),
                Cell::from(t.summary.overseas.to_string()).style(Style::default().fg(Color::DarkGray)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Min(12),
            Constraint::Length(10),
            Constraint::Length(10),
            Constraint::Length(6),
            Constraint::Length(3),
        ],
    )
    .header(header)
    .block(titled(" TEAMS "));
    f.render_widget(table, area);
}

fn render_recently_sold(f: &mut Frame, app: &AppState, area: Rect) {
    let rows: Vec<Row> = app
        .recently_sold
        .iter()
        .map(|c| {
            let (outcome, color) = match (&c.team, c.player.sold_price) {
                (Some(team), Some(price)) => (format!("{} · {}", team.short_code, format_money(price)), Color::Green),
                _ => (c.player.status.to_uppercase(), Color::Red),
            };
            Row::new(vec![
                Cell::from(truncate(&c.player.name, 20)),
                Cell::from(outcome).style(Style::default().fg(color)),
            ])
        })
        .collect();

    let table = Table::new(rows, [Constraint::Min(10), Constraint::Length(16)]).block(titled(" RECENTLY SOLD "));
    f.render_widget(table, area);
}

fn render_footer(f: &mut Frame, area: Rect) {
    let line = Line::from(vec![
        Span::styled(" [q] ", Style::default().fg(Color::Yellow)),
        Span::raw("quit  "),
        Span::styled("[r] ", Style::default().fg(Color::Yellow)),
        Span::raw("refresh  "),
        Span::styled("auto-refresh: 2s", Style::default().fg(Color::DarkGray)),
    ]);
    let paragraph = Paragraph::new(line).style(Style::default().fg(Color::White));
    f.render_widget(paragraph, area);
}

use std::sync::Arc;
use std::time::{Duration, Instant};
use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Style, Modifier},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, BarChart, Table, Row, Cell},
    Terminal,
};
use tracing::warn;

use crate::client::{format_address, format_number};
use crate::rules::{AlertStatus, PriceAlertRule};
use crate::severity::Severity;
use crate::state::AppState;
use eyre::Result;

pub fn run_tui(state: Arc<AppState>, rules: Vec<PriceAlertRule>) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &state, &rules);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    res.map_err(Into::into)
}

fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Critical => Color::Red,
        Severity::High => Color::LightRed,
        Severity::Medium => Color::Yellow,
        Severity::Low => Color::Blue,
        Severity::Info => Color::DarkGray,
    }
}

/// Cuts `text` to at most `max` characters, ending in "..." when cut.
fn shorten(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}

/// Moves the selection to the wallet after the current one, wrapping.
fn cycle_selection(state: &AppState) {
    let wallets = state.wallets();
    if wallets.is_empty() {
        return;
    }
    let current = state.selected_wallet();
    let index = wallets
        .iter()
        .position(|w| Some(w.address) == current)
        .map_or(0, |i| (i + 1) % wallets.len());

    if let Err(e) = state.set_selected_wallet(Some(wallets[index].address)) {
        warn!("Failed to persist wallet selection: {}", e);
    }
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    state: &AppState,
    rules: &[PriceAlertRule],
) -> std::io::Result<()> {
    let start_time = Instant::now();

    loop {
        let network = state.network_stats();
        let portfolio = state.portfolio_stats();
        let wallets = state.wallets();
        let selected = state.selected_wallet();
        let last_refresh = *state.last_refresh.lock().unwrap_or_else(|e| e.into_inner());
        let history: Vec<_> = state
            .alert_history
            .lock()
            .map(|h| h.iter().rev().cloned().collect())
            .unwrap_or_default();

        terminal.draw(|f| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .margin(1)
                .constraints(
                    [
                        Constraint::Length(3), // Header
                        Constraint::Min(8),    // Wallets
                        Constraint::Length(10), // Alerts
                        Constraint::Min(8),    // History
                    ]
                    .as_ref(),
                )
                .split(f.area());

            // --- Header ---
            let header_layout = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(40), Constraint::Percentage(35), Constraint::Percentage(25)])
                .split(chunks[0]);

            let change_color = if network.avax_change_24h >= 0.0 { Color::Green } else { Color::Red };
            let block_widget = Paragraph::new(format!(
                "BLOCK: #{} | GAS: {} gwei",
                network.block_number, network.gas_price
            ))
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .block(Block::default().borders(Borders::ALL));

            let price_widget = Paragraph::new(Line::from(vec![
                Span::raw(format!("AVAX: ${:.2} ", network.avax_price)),
                Span::styled(
                    format!("({:+.2}%)", network.avax_change_24h),
                    Style::default().fg(change_color).add_modifier(Modifier::BOLD),
                ),
                Span::raw(format!(" | MCAP ${}", format_number(network.market_cap, 2))),
                Span::styled(
                    if network.price_live { "" } else { " (offline)" },
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
            .block(Block::default().borders(Borders::ALL));

            let refresh_text = match last_refresh {
                Some(at) => format!("REFRESHED: {}s ago", at.elapsed().as_secs()),
                None => format!("UPTIME: {}s", start_time.elapsed().as_secs()),
            };
            let status_widget = Paragraph::new(refresh_text)
                .style(Style::default().fg(Color::White))
                .block(Block::default().title(" Status ").borders(Borders::ALL));

            f.render_widget(block_widget, header_layout[0]);
            f.render_widget(price_widget, header_layout[1]);
            f.render_widget(status_widget, header_layout[2]);

            // --- Wallets ---
            let wallet_headers = Row::new(vec!["LABEL", "ADDRESS", "AVAX", "USD", "TOKENS"])
                .style(Style::default().add_modifier(Modifier::BOLD).fg(Color::Yellow))
                .bottom_margin(1);

            let wallet_rows: Vec<Row> = wallets
                .iter()
                .map(|w| {
                    let style = if Some(w.address) == selected {
                        Style::default().fg(Color::Black).bg(Color::Cyan)
                    } else {
                        Style::default()
                    };
                    Row::new(vec![
                        Cell::from(w.label.clone()),
                        Cell::from(format_address(&w.address.to_string(), 6, 4)),
                        Cell::from(w.balance.clone()),
                        Cell::from(format!("${}", w.balance_usd)),
                        Cell::from(w.tokens.len().to_string()),
                    ])
                    .style(style)
                })
                .collect();

            let wallet_title = format!(
                " Wallets (Tab) | Total ${:.2} | {:.4} AVAX ",
                portfolio.total_value_usd, portfolio.avax_value
            );
            let wallet_table = Table::new(wallet_rows, [
                Constraint::Length(16),
                Constraint::Length(15),
                Constraint::Length(14),
                Constraint::Length(14),
                Constraint::Fill(1),
            ])
            .header(wallet_headers)
            .block(Block::default().title(wallet_title).borders(Borders::ALL))
            .column_spacing(2);

            f.render_widget(wallet_table, chunks[1]);

            // --- Middle Section (Price Alerts & Bar Chart) ---
            let mid_chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(60), Constraint::Percentage(40)].as_ref())
                .split(chunks[2]);

            let rule_lines: Vec<Line> = if rules.is_empty() {
                vec![Line::from("No price alerts configured")]
            } else {
                rules
                    .iter()
                    .map(|rule| {
                        let current = network.avax_price;
                        let (label, color) = match rule.status(current) {
                            AlertStatus::Triggered => ("TRIGGERED", Color::Red),
                            AlertStatus::Waiting => ("waiting", Color::Green),
                            AlertStatus::Inactive => ("inactive", Color::DarkGray),
                        };
                        Line::from(vec![
                            Span::raw(format!(
                                "{} {:?} ${:.2}  {:>5.1}%  ",
                                rule.asset,
                                rule.condition,
                                rule.price,
                                rule.progress(current)
                            )),
                            Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)),
                        ])
                    })
                    .collect()
            };
            let rules_p = Paragraph::new(rule_lines)
                .block(Block::default().title(" Price Alerts ").borders(Borders::ALL));
            f.render_widget(rules_p, mid_chunks[0]);

            let count_of = |severity: Severity| -> u64 {
                history
                    .iter()
                    .filter(|a| a.severity == severity)
                    .map(|a| a.count)
                    .sum()
            };
            let data = [
                ("Critical", count_of(Severity::Critical)),
                ("High", count_of(Severity::High)),
                ("Medium", count_of(Severity::Medium)),
                ("Low", count_of(Severity::Low)),
            ];

            let bar_chart = BarChart::default()
                .block(Block::default().title(" Alert Distribution ").borders(Borders::ALL))
                .data(&data)
                .bar_width(8)
                .bar_style(Style::default().fg(Color::Yellow))
                .value_style(Style::default().fg(Color::White).add_modifier(Modifier::BOLD));

            f.render_widget(bar_chart, mid_chunks[1]);

            // --- Footer (Recent Alerts Table) ---
            let headers = Row::new(vec!["SEVERITY", "TIME AGO", "MESSAGE"])
                .style(Style::default().add_modifier(Modifier::BOLD).fg(Color::Yellow))
                .bottom_margin(1);

            let rows: Vec<Row> = history
                .iter()
                .take(15)
                .map(|alert| {
                    let mut display_msg = shorten(&alert.message, 60);
                    if alert.count > 1 {
                        display_msg = format!("{} (x{})", display_msg, alert.count);
                    }

                    Row::new(vec![
                        Cell::from(alert.severity.to_string()).style(
                            Style::default()
                                .fg(severity_color(alert.severity))
                                .add_modifier(Modifier::BOLD),
                        ),
                        Cell::from(format!("{}s", alert.last_seen.elapsed().as_secs()))
                            .style(Style::default().fg(Color::DarkGray)),
                        Cell::from(display_msg),
                    ])
                })
                .collect();

            let table = Table::new(rows, [
                Constraint::Length(12), // Severity
                Constraint::Length(10), // Time
                Constraint::Fill(1),    // Message
            ])
            .header(headers)
            .block(Block::default().title(" Recent Alerts ").borders(Borders::ALL))
            .column_spacing(2);

            f.render_widget(table, chunks[3]);
        })?;

        if event::poll(Duration::from_millis(200))? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') => return Ok(()),
                    KeyCode::Tab => cycle_selection(state),
                    _ => {}
                }
            }
        }
    }
}

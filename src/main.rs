use std::io;
use std::path::Path;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::Marker;
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Axis, Bar, BarChart, BarGroup, Block, Borders, Chart, Clear, Dataset, GraphType, Paragraph,
};

use teamscope::config::Settings;
use teamscope::merge::{TeamRecord, read_merged_csv};
use teamscope::state::{self, AppState, BoxStats, ChartView, Metric, Screen};
use teamscope::table::fmt_num;
use teamscope::table_export;

const EXPORT_PATH: &str = "teamscope_analysis.xlsx";

const CLUSTER_COLORS: [Color; 6] = [
    Color::Cyan,
    Color::Yellow,
    Color::Green,
    Color::Magenta,
    Color::LightRed,
    Color::LightBlue,
];

struct App {
    state: AppState,
    settings: Settings,
    should_quit: bool,
}

impl App {
    fn new(settings: Settings) -> Self {
        let mut records = Vec::new();
        let mut startup = Vec::new();
        match read_merged_csv(&settings.merged_csv) {
            Ok(loaded) => {
                startup.push(format!(
                    "[INFO] Loaded {} teams from {}",
                    loaded.len(),
                    settings.merged_csv.display()
                ));
                records = loaded;
            }
            Err(err) => startup.push(format!("[WARN] {err:#}; run build_table first")),
        }
        let mut state = AppState::new(records, settings.cluster_k);
        for line in startup {
            state.push_log(line);
        }
        Self {
            state,
            settings,
            should_quit: false,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('?') => self.state.show_help = !self.state.show_help,
            KeyCode::Char('1') => self.state.screen = Screen::Table,
            KeyCode::Char('2') => self.state.screen = Screen::Team,
            KeyCode::Char('3') => self.state.screen = Screen::Charts,
            KeyCode::Char('4') => self.state.screen = Screen::Clusters,
            KeyCode::Char('d') | KeyCode::Enter => self.state.screen = Screen::Team,
            KeyCode::Char('b') | KeyCode::Esc => self.state.screen = Screen::Table,
            KeyCode::Char('j') | KeyCode::Down => self.state.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.state.select_prev(),
            KeyCode::Char('s') => {
                self.state.cycle_sort();
                self.state.push_log(format!(
                    "[INFO] Sorting by {}",
                    self.state.sort_metric.label()
                ));
            }
            KeyCode::Char('m') => self.state.cycle_compare(),
            KeyCode::Char('c') => self.state.cycle_chart(),
            KeyCode::Char('r') => self.reload(),
            KeyCode::Char('x') => self.export(),
            _ => {}
        }
    }

    fn reload(&mut self) {
        match read_merged_csv(&self.settings.merged_csv) {
            Ok(records) => {
                let count = records.len();
                self.state.set_records(records, self.settings.cluster_k);
                self.state.push_log(format!(
                    "[INFO] Reloaded {count} teams from {}",
                    self.settings.merged_csv.display()
                ));
            }
            Err(err) => self.state.push_log(format!("[WARN] Reload failed: {err:#}")),
        }
    }

    fn export(&mut self) {
        let path = Path::new(EXPORT_PATH);
        match table_export::export_workbook(path, &self.state.records, &self.state.clusters) {
            Ok(report) => self.state.push_log(format!(
                "[INFO] Exported {} teams, {} cluster rows to {}",
                report.teams,
                report.cluster_rows,
                path.display()
            )),
            Err(err) => self.state.push_log(format!("[WARN] Export failed: {err:#}")),
        }
    }
}

fn main() -> io::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let settings = Settings::from_env();

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let mut app = App::new(settings);
    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header =
        Paragraph::new(header_text(&app.state)).block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    match app.state.screen {
        Screen::Table => render_table(frame, chunks[1], &app.state),
        Screen::Team => render_team(frame, chunks[1], &app.state),
        Screen::Charts => render_charts(frame, chunks[1], &app.state),
        Screen::Clusters => render_clusters(frame, chunks[1], &app.state),
    }

    let footer =
        Paragraph::new(footer_text(&app.state)).block(Block::default().borders(Borders::TOP));
    frame.render_widget(footer, chunks[2]);

    if app.state.show_help {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(state: &AppState) -> String {
    let title = match state.screen {
        Screen::Table => format!(
            "TEAMSCOPE TABLE | {} teams | Sort: {}",
            state.records.len(),
            state.sort_metric.label()
        ),
        Screen::Team => format!(
            "TEAMSCOPE TEAM | {}",
            state
                .selected_record()
                .map(|r| display_team(&r.team))
                .unwrap_or_else(|| "-".to_string())
        ),
        Screen::Charts => format!("TEAMSCOPE CHARTS | {}", state.chart.label()),
        Screen::Clusters => format!("TEAMSCOPE CLUSTERS | k={}", state.clusters.k),
    };
    let line1 = format!("  ,-,  {title}");
    let line2 = " ( o )".to_string();
    let line3 = "  `-`".to_string();
    format!("{line1}\n{line2}\n{line3}")
}

fn footer_text(state: &AppState) -> String {
    match state.screen {
        Screen::Table => {
            "1-4 Screens | Enter/d Team | j/k/↑/↓ Move | s Sort | r Reload | x Export | ? Help | q Quit"
                .to_string()
        }
        Screen::Team => {
            "b/Esc Back | j/k Team | m Compare metric | x Export | ? Help | q Quit".to_string()
        }
        Screen::Charts => "c Next chart | j/k Team | b/Esc Back | ? Help | q Quit".to_string(),
        Screen::Clusters => "j/k Team | r Reload | b/Esc Back | ? Help | q Quit".to_string(),
    }
}

/// Canonical ids read back from the merged table are lowercase with
/// underscores; the screens show them with spaces.
fn display_team(team: &str) -> String {
    team.replace('_', " ")
}

fn render_table(frame: &mut Frame, area: Rect, state: &AppState) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(area);

    let widths = table_columns();
    render_table_header(frame, sections[0], &widths, state);

    let list_area = sections[1];
    let order = state.sorted_indices();
    if order.is_empty() {
        let empty = Paragraph::new("No merged table loaded; run build_table and press r")
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, list_area);
    } else {
        let visible = list_area.height as usize;
        let start = state.table_offset(visible);
        let end = (start + visible).min(order.len());
        let sort_max = order
            .iter()
            .map(|&idx| state.sort_metric.value(&state.records[idx]))
            .fold(0.0f64, f64::max);

        for (i, pos) in (start..end).enumerate() {
            let row_area = Rect {
                x: list_area.x,
                y: list_area.y + i as u16,
                width: list_area.width,
                height: 1,
            };

            let selected = pos == state.selected;
            let row_style = if selected {
                Style::default().fg(Color::White).bg(Color::DarkGray)
            } else {
                Style::default()
            };
            if selected {
                frame.render_widget(Block::default().style(row_style), row_area);
            }

            let cols = Layout::default()
                .direction(Direction::Horizontal)
                .constraints(widths)
                .split(row_area);

            let rec = &state.records[order[pos]];
            render_cell_text(frame, cols[0], &format!("{}", pos + 1), row_style);
            render_cell_text(frame, cols[1], &display_team(&rec.team), row_style);
            render_cell_text(
                frame,
                cols[2],
                &fmt_num(state.sort_metric.value(rec)),
                row_style,
            );
            let bar = metric_bar(state.sort_metric.value(rec), sort_max, selected);
            frame.render_widget(bar, cols[3]);
            render_cell_text(frame, cols[4], &fmt_num(rec.rating), row_style);
            render_cell_text(frame, cols[5], &fmt_num(rec.goals), row_style);
            render_cell_text(frame, cols[6], &fmt_num(rec.possession), row_style);
            render_cell_text(frame, cols[7], &fmt_num(rec.pass_pct), row_style);
            render_cell_text(frame, cols[8], &fmt_num(rec.form), row_style);
            render_cell_text(
                frame,
                cols[9],
                rec.market_value.as_deref().unwrap_or("-"),
                row_style,
            );
        }
    }

    let console = Paragraph::new(console_text(state))
        .block(Block::default().title("Console").borders(Borders::TOP));
    frame.render_widget(console, sections[2]);
}

fn table_columns() -> [Constraint; 10] {
    [
        Constraint::Length(4),
        Constraint::Length(22),
        Constraint::Length(9),
        Constraint::Min(12),
        Constraint::Length(8),
        Constraint::Length(8),
        Constraint::Length(8),
        Constraint::Length(8),
        Constraint::Length(7),
        Constraint::Length(11),
    ]
}

fn render_table_header(frame: &mut Frame, area: Rect, widths: &[Constraint], state: &AppState) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(widths)
        .split(area);
    let style = Style::default().add_modifier(Modifier::BOLD);

    render_cell_text(frame, cols[0], "#", style);
    render_cell_text(frame, cols[1], "Team", style);
    render_cell_text(frame, cols[2], state.sort_metric.label(), style);
    render_cell_text(frame, cols[3], "", style);
    render_cell_text(frame, cols[4], "Rating", style);
    render_cell_text(frame, cols[5], "Goals", style);
    render_cell_text(frame, cols[6], "Poss", style);
    render_cell_text(frame, cols[7], "Pass%", style);
    render_cell_text(frame, cols[8], "Form", style);
    render_cell_text(frame, cols[9], "Value", style);
}

fn render_cell_text(frame: &mut Frame, area: Rect, text: &str, style: Style) {
    let text_area = Rect {
        x: area.x,
        y: area.y + (area.height / 2),
        width: area.width,
        height: 1,
    };
    let paragraph = Paragraph::new(text).style(style);
    frame.render_widget(paragraph, text_area);
}

fn metric_bar(value: f64, max: f64, selected: bool) -> BarChart<'static> {
    let mut style = Style::default().fg(Color::Cyan);
    if selected {
        style = style.bg(Color::DarkGray);
    }
    let scaled = if max > 0.0 {
        (value / max * 100.0).round() as u64
    } else {
        0
    };
    let bar = Bar::default()
        .value(scaled)
        .text_value(String::new())
        .style(style);
    BarChart::default()
        .data(BarGroup::default().bars(&[bar]))
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(0)
        .group_gap(0)
        .max(100)
}

fn render_team(frame: &mut Frame, area: Rect, state: &AppState) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(26),
            Constraint::Min(36),
            Constraint::Length(34),
        ])
        .split(area);

    let list = Paragraph::new(team_list_text(state))
        .block(Block::default().title("Teams").borders(Borders::ALL));
    frame.render_widget(list, columns[0]);

    let middle = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(11),
            Constraint::Min(8),
            Constraint::Length(5),
        ])
        .split(columns[1]);

    let Some(rec) = state.selected_record() else {
        let empty = Paragraph::new("No team selected")
            .block(Block::default().title("Profile").borders(Borders::ALL));
        frame.render_widget(empty, middle[0]);
        return;
    };

    let profile = Paragraph::new(profile_text(state, rec))
        .block(Block::default().title("Profile").borders(Borders::ALL));
    frame.render_widget(profile, middle[0]);

    let speed = speed_chart(rec);
    frame.render_widget(speed, middle[1]);

    let game_state = Paragraph::new(game_state_text(rec))
        .block(Block::default().title("Game state").borders(Borders::ALL));
    frame.render_widget(game_state, middle[2]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(9), Constraint::Length(7)])
        .split(columns[2]);

    let compare = Paragraph::new(comparison_text(state))
        .block(Block::default().title("Comparison").borders(Borders::ALL));
    frame.render_widget(compare, right[0]);

    let similar = Paragraph::new(similar_text(state, rec))
        .block(Block::default().title("Similar teams").borders(Borders::ALL));
    frame.render_widget(similar, right[1]);
}

fn team_list_text(state: &AppState) -> String {
    let order = state.sorted_indices();
    if order.is_empty() {
        return "No teams yet".to_string();
    }
    let mut lines = Vec::new();
    for (pos, &idx) in order.iter().enumerate() {
        let prefix = if pos == state.selected { "> " } else { "  " };
        lines.push(format!("{prefix}{}", display_team(&state.records[idx].team)));
    }
    lines.join("\n")
}

fn profile_text(state: &AppState, rec: &TeamRecord) -> String {
    let rank = state.selected + 1;
    [
        format!("Rank: #{rank} by {}", state.sort_metric.label()),
        format!("Rating: {}", fmt_num(rec.rating)),
        format!(
            "Favourite tactic: {}",
            rec.favorite_tactics.as_deref().unwrap_or("-")
        ),
        format!("Form (last 5): {} pts", fmt_num(rec.form)),
        format!("Squad size: {}", fmt_num(rec.squad_size)),
        format!(
            "Points/season: {} (5y) {} (10y)",
            fmt_num(rec.points_last_5),
            fmt_num(rec.points_last_10)
        ),
        format!("Total xG: {}", fmt_num(rec.total_xg())),
        format!(
            "Goals {} | Shots/g {} | Poss {}",
            fmt_num(rec.goals),
            fmt_num(rec.shots_pg),
            fmt_num(rec.possession)
        ),
        format!(
            "Market value: {}",
            rec.market_value.as_deref().unwrap_or("-")
        ),
    ]
    .join("\n")
}

fn speed_chart(rec: &TeamRecord) -> BarChart<'static> {
    let groups = [
        ("Normal", rec.normal),
        ("Standard", rec.standard),
        ("Slow", rec.slow),
        ("Fast", rec.fast),
    ];
    let mut chart = BarChart::default()
        .block(
            Block::default()
                .title("Shots by attack speed")
                .borders(Borders::ALL),
        )
        .bar_width(9)
        .bar_gap(1);
    for (label, split) in groups {
        let bar = Bar::default()
            .value(split.shots.max(0.0).round() as u64)
            .text_value(fmt_num(split.shots))
            .style(Style::default().fg(Color::Cyan));
        chart = chart.data(BarGroup::default().label(Line::from(label)).bars(&[bar]));
    }
    chart
}

fn game_state_text(rec: &TeamRecord) -> String {
    [
        format!("Leading: {} min", fmt_num(rec.winning_time)),
        format!("Trailing: {} min", fmt_num(rec.losing_time)),
        format!("Level: {} min", fmt_num(rec.draw_time)),
    ]
    .join("\n")
}

fn comparison_text(state: &AppState) -> String {
    let window = state.comparison();
    let metric = state.compare_metric;
    let mut lines = vec![
        format!("[m] metric: {} (rank #{})", metric.label(), window.rank),
        String::new(),
    ];
    for &idx in &window.above {
        let rec = &state.records[idx];
        lines.push(format!(
            "  {:<20} {}",
            display_team(&rec.team),
            fmt_num(metric.value(rec))
        ));
    }
    if let Some(rec) = state.selected_record() {
        lines.push(format!(
            "> {:<20} {}",
            display_team(&rec.team),
            fmt_num(metric.value(rec))
        ));
    }
    for &idx in &window.below {
        let rec = &state.records[idx];
        lines.push(format!(
            "  {:<20} {}",
            display_team(&rec.team),
            fmt_num(metric.value(rec))
        ));
    }
    lines.join("\n")
}

fn similar_text(state: &AppState, rec: &TeamRecord) -> String {
    let Some(point) = state.clusters.points.iter().find(|p| p.team == rec.team) else {
        return "Need at least two teams".to_string();
    };
    if point.similar.is_empty() {
        return "No neighbours found".to_string();
    }
    point
        .similar
        .iter()
        .enumerate()
        .map(|(i, team)| format!("{}. {}", i + 1, display_team(team)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_charts(frame: &mut Frame, area: Rect, state: &AppState) {
    if state.records.is_empty() {
        let empty = Paragraph::new("No merged table loaded; run build_table and press r")
            .block(Block::default().title("Charts").borders(Borders::ALL));
        frame.render_widget(empty, area);
        return;
    }
    if let Some((x_metric, y_metric)) = state.chart.scatter_axes() {
        render_scatter(frame, area, state, x_metric, y_metric);
        return;
    }
    match state.chart {
        ChartView::SpeedBars => render_speed_mix(frame, area, state),
        ChartView::CorrelationHeatmap => render_heatmap(frame, area, state),
        ChartView::TacticBox => render_tactic_box(frame, area, state),
        _ => {}
    }
}

fn render_scatter(
    frame: &mut Frame,
    area: Rect,
    state: &AppState,
    x_metric: Metric,
    y_metric: Metric,
) {
    let pts: Vec<(f64, f64)> = state
        .records
        .iter()
        .map(|r| (x_metric.value(r), y_metric.value(r)))
        .collect();
    let xs: Vec<f64> = pts.iter().map(|p| p.0).collect();
    let ys: Vec<f64> = pts.iter().map(|p| p.1).collect();
    let r = state::pearson(&xs, &ys);
    let (x_lo, x_hi) = padded_bounds(&xs);
    let (y_lo, y_hi) = padded_bounds(&ys);

    let highlight: Vec<(f64, f64)> = state
        .selected_record()
        .map(|rec| vec![(x_metric.value(rec), y_metric.value(rec))])
        .unwrap_or_default();

    let datasets = vec![
        Dataset::default()
            .name("teams")
            .marker(Marker::Dot)
            .graph_type(GraphType::Scatter)
            .style(Style::default().fg(Color::Cyan))
            .data(&pts),
        Dataset::default()
            .name("selected")
            .marker(Marker::Block)
            .graph_type(GraphType::Scatter)
            .style(Style::default().fg(Color::Yellow))
            .data(&highlight),
    ];

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .title(format!("{} (r={r:+.2})", state.chart.label()))
                .borders(Borders::ALL),
        )
        .x_axis(
            Axis::default()
                .title(x_metric.label())
                .bounds([x_lo, x_hi])
                .labels(vec![Span::raw(fmt_num(x_lo)), Span::raw(fmt_num(x_hi))]),
        )
        .y_axis(
            Axis::default()
                .title(y_metric.label())
                .bounds([y_lo, y_hi])
                .labels(vec![Span::raw(fmt_num(y_lo)), Span::raw(fmt_num(y_hi))]),
        );
    frame.render_widget(chart, area);
}

fn padded_bounds(values: &[f64]) -> (f64, f64) {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for &v in values {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if !lo.is_finite() || !hi.is_finite() {
        return (0.0, 1.0);
    }
    if (hi - lo).abs() < 1e-9 {
        return (lo - 1.0, hi + 1.0);
    }
    let pad = (hi - lo) * 0.08;
    (lo - pad, hi + pad)
}

fn render_speed_mix(frame: &mut Frame, area: Rect, state: &AppState) {
    let Some(rec) = state.selected_record() else {
        let empty = Paragraph::new("No team selected")
            .block(Block::default().title("Attack speed mix").borders(Borders::ALL));
        frame.render_widget(empty, area);
        return;
    };

    let title = format!(
        "{}: goals per 100 shots by attack speed",
        display_team(&rec.team)
    );
    let mut chart = BarChart::default()
        .block(Block::default().title(title).borders(Borders::ALL))
        .bar_width(9)
        .bar_gap(2);
    for (label, rate) in state::speed_conversion(rec) {
        let bar = Bar::default()
            .value(rate.max(0.0).round() as u64)
            .text_value(fmt_num(rate))
            .style(Style::default().fg(Color::Green));
        chart = chart.data(BarGroup::default().label(Line::from(label)).bars(&[bar]));
    }
    frame.render_widget(chart, area);
}

fn heat_code(metric: Metric) -> &'static str {
    match metric {
        Metric::Goals => "GLS",
        Metric::ShotsPg => "SHT",
        Metric::Discipline => "DSC",
        Metric::Possession => "POS",
        Metric::PassPct => "PAS",
        Metric::AerialsWon => "AER",
        Metric::Rating => "RTG",
        Metric::PointsLast10 => "P10",
        _ => "???",
    }
}

fn heat_style(r: f64) -> Style {
    let color = if r > 0.5 {
        Color::Green
    } else if r > 0.2 {
        Color::LightGreen
    } else if r < -0.5 {
        Color::Red
    } else if r < -0.2 {
        Color::LightRed
    } else {
        Color::DarkGray
    };
    Style::default().fg(color)
}

fn render_heatmap(frame: &mut Frame, area: Rect, state: &AppState) {
    let matrix = state::correlation_matrix(&state.records);
    let mut lines = Vec::new();

    let mut header = vec![Span::raw("     ")];
    for metric in state::HEATMAP_METRICS {
        header.push(Span::styled(
            format!(" {:>5}", heat_code(metric)),
            Style::default().add_modifier(Modifier::BOLD),
        ));
    }
    lines.push(Line::from(header));

    for (i, metric) in state::HEATMAP_METRICS.iter().enumerate() {
        let mut spans = vec![Span::styled(
            format!("{:>5}", heat_code(*metric)),
            Style::default().add_modifier(Modifier::BOLD),
        )];
        for &r in &matrix[i] {
            spans.push(Span::styled(format!(" {r:+.2}"), heat_style(r)));
        }
        lines.push(Line::from(spans));
    }

    let heat = Paragraph::new(lines).block(
        Block::default()
            .title("Metric correlations (Pearson)")
            .borders(Borders::ALL),
    );
    frame.render_widget(heat, area);
}

fn render_tactic_box(frame: &mut Frame, area: Rect, state: &AppState) {
    let groups = state::tactic_box_stats(&state.records);
    if groups.is_empty() {
        let empty = Paragraph::new("No formation data yet").block(
            Block::default()
                .title("Points by formation")
                .borders(Borders::ALL),
        );
        frame.render_widget(empty, area);
        return;
    }

    let lo = groups
        .iter()
        .map(|(_, s)| s.min)
        .fold(f64::INFINITY, f64::min);
    let hi = groups
        .iter()
        .map(|(_, s)| s.max)
        .fold(f64::NEG_INFINITY, f64::max);

    const PLOT_WIDTH: usize = 40;
    let mut lines = vec![
        "Points per season (last 10), by favourite formation".to_string(),
        String::new(),
    ];
    for (tactic, stats) in &groups {
        lines.push(format!(
            "{tactic:<9} {} n={}",
            box_line(stats, lo, hi, PLOT_WIDTH),
            stats.count
        ));
        lines.push(format!(
            "{:<9} min {} q1 {} med {} q3 {} max {}",
            "",
            fmt_num(stats.min),
            fmt_num(stats.q1),
            fmt_num(stats.median),
            fmt_num(stats.q3),
            fmt_num(stats.max)
        ));
    }

    let plot = Paragraph::new(lines.join("\n")).block(
        Block::default()
            .title("Points by formation")
            .borders(Borders::ALL),
    );
    frame.render_widget(plot, area);
}

fn box_line(stats: &BoxStats, lo: f64, hi: f64, width: usize) -> String {
    let span = (hi - lo).max(1e-9);
    let col = |v: f64| {
        (((v - lo) / span) * (width - 1) as f64)
            .round()
            .clamp(0.0, (width - 1) as f64) as usize
    };
    let mut chars = vec![' '; width];
    for c in chars.iter_mut().take(col(stats.max) + 1).skip(col(stats.min)) {
        *c = '-';
    }
    for c in chars.iter_mut().take(col(stats.q3) + 1).skip(col(stats.q1)) {
        *c = '=';
    }
    chars[col(stats.min)] = '|';
    chars[col(stats.max)] = '|';
    chars[col(stats.median)] = '#';
    chars.into_iter().collect()
}

fn render_clusters(frame: &mut Frame, area: Rect, state: &AppState) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(40), Constraint::Length(38)])
        .split(area);

    let points = &state.clusters.points;
    if points.is_empty() {
        let empty = Paragraph::new("Need at least two teams to cluster")
            .block(Block::default().title("Clusters").borders(Borders::ALL));
        frame.render_widget(empty, columns[0]);
    } else {
        let xs: Vec<f64> = points.iter().map(|p| p.x).collect();
        let ys: Vec<f64> = points.iter().map(|p| p.y).collect();
        let (x_lo, x_hi) = padded_bounds(&xs);
        let (y_lo, y_hi) = padded_bounds(&ys);

        let by_cluster: Vec<Vec<(f64, f64)>> = (0..state.clusters.k)
            .map(|c| {
                points
                    .iter()
                    .filter(|p| p.cluster == c)
                    .map(|p| (p.x, p.y))
                    .collect()
            })
            .collect();

        let selected_team = state.selected_record().map(|r| r.team.clone());
        let highlight: Vec<(f64, f64)> = selected_team
            .as_deref()
            .and_then(|team| points.iter().find(|p| p.team == team))
            .map(|p| vec![(p.x, p.y)])
            .unwrap_or_default();

        let mut datasets: Vec<Dataset> = by_cluster
            .iter()
            .enumerate()
            .map(|(c, pts)| {
                Dataset::default()
                    .name(format!("C{c}"))
                    .marker(Marker::Dot)
                    .graph_type(GraphType::Scatter)
                    .style(Style::default().fg(CLUSTER_COLORS[c % CLUSTER_COLORS.len()]))
                    .data(pts)
            })
            .collect();
        datasets.push(
            Dataset::default()
                .name("selected")
                .marker(Marker::Block)
                .graph_type(GraphType::Scatter)
                .style(Style::default().fg(Color::White))
                .data(&highlight),
        );

        let chart = Chart::new(datasets)
            .block(
                Block::default()
                    .title("Style map (attack vs control, z-scores)")
                    .borders(Borders::ALL),
            )
            .x_axis(
                Axis::default()
                    .title("attack")
                    .bounds([x_lo, x_hi])
                    .labels(vec![Span::raw(fmt_num(x_lo)), Span::raw(fmt_num(x_hi))]),
            )
            .y_axis(
                Axis::default()
                    .title("control")
                    .bounds([y_lo, y_hi])
                    .labels(vec![Span::raw(fmt_num(y_lo)), Span::raw(fmt_num(y_hi))]),
            );
        frame.render_widget(chart, columns[0]);
    }

    let list = Paragraph::new(cluster_list_text(state))
        .block(Block::default().title("Membership").borders(Borders::ALL));
    frame.render_widget(list, columns[1]);
}

fn cluster_list_text(state: &AppState) -> String {
    if state.clusters.points.is_empty() {
        return "No clusters yet".to_string();
    }
    let selected_team = state.selected_record().map(|r| r.team.clone());
    let mut lines = Vec::new();
    for c in 0..state.clusters.k {
        lines.push(format!("Cluster {c}:"));
        for point in state.clusters.points.iter().filter(|p| p.cluster == c) {
            let marker = if selected_team.as_deref() == Some(point.team.as_str()) {
                ">"
            } else {
                " "
            };
            lines.push(format!("{marker} {}", display_team(&point.team)));
        }
        lines.push(String::new());
    }
    lines.join("\n")
}

fn console_text(state: &AppState) -> String {
    if state.logs.is_empty() {
        return "No alerts yet".to_string();
    }
    state
        .logs
        .iter()
        .rev()
        .take(2)
        .cloned()
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 60, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "Teamscope - Help",
        "",
        "Global:",
        "  1-4          Table / Team / Charts / Clusters",
        "  Enter / d    Team detail",
        "  b / Esc      Back to table",
        "  j/k or ↑/↓   Move selection",
        "  s            Cycle sort metric",
        "  m            Cycle comparison metric",
        "  c            Cycle chart",
        "  r            Reload merged table",
        "  x            Export xlsx workbook",
        "  ?            Toggle help",
        "  q            Quit",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}

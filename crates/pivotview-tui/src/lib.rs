// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use pivotview_app::{
    Axis, BarChart as BarProjection, BreakdownChart, CellContent, ChartOptions, ChartSpec,
    ChartType, FetchFailure, FilterOptions, HoverPoint, Panel, ParsedQuery, PieChart,
    PivotTableWidget, ReportOptions, TableCell, TableLayout, Tooltip, WidgetCommand, WidgetEvent,
    available_charts, format_number, split_url,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{
    Bar, BarChart, BarGroup, Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap,
};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

const EMPTY_TEXT: &str = "No data available";
const PIE_BAR_WIDTH: usize = 24;
const ZOOM_CLOSED_MARK: &str = "+";
const ZOOM_OPEN_MARK: &str = "-";
const RECORD_BULLET: &str = "·";
const LOADED_AT_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[hour]:[minute]:[second]");

const CHART_KEYS: [(char, ChartOptions); 6] = [
    ('1', ChartOptions::new(ChartType::Piechart, Axis::Rows)),
    ('2', ChartOptions::new(ChartType::Barchart, Axis::Rows)),
    ('3', ChartOptions::new(ChartType::Piechart, Axis::Cols)),
    ('4', ChartOptions::new(ChartType::Barchart, Axis::Cols)),
    ('5', ChartOptions::new(ChartType::Breakdown, Axis::Rows)),
    ('6', ChartOptions::new(ChartType::Breakdown, Axis::Cols)),
];

/// Where the terminal host gets fresh report data from.
pub trait PivotRuntime {
    fn fetch(&mut self, url: &str) -> Result<String>;

    /// Runs the fetch and reports the outcome on `tx`. Implementations may hand the
    /// work to another thread and return immediately.
    fn spawn_fetch(&mut self, request_id: u64, url: &str, tx: Sender<InternalEvent>) -> Result<()> {
        let event = match self.fetch(url) {
            Ok(body) => InternalEvent::FetchCompleted { request_id, body },
            Err(error) => InternalEvent::FetchFailed {
                request_id,
                failure: FetchFailure::classify(&error),
            },
        };
        tx.send(event)
            .map_err(|_| anyhow!("fetch event channel closed"))?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
    FetchCompleted { request_id: u64, body: String },
    FetchFailed { request_id: u64, failure: FetchFailure },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum FormField {
    #[default]
    Rows,
    Cols,
    Fact,
    Totals,
    Filters,
}

impl FormField {
    const ALL: [Self; 5] = [
        Self::Rows,
        Self::Cols,
        Self::Fact,
        Self::Totals,
        Self::Filters,
    ];

    const fn label(self) -> &'static str {
        match self {
            Self::Rows => "rows",
            Self::Cols => "cols",
            Self::Fact => "fact",
            Self::Totals => "totals",
            Self::Filters => "filters",
        }
    }

    fn step(self, delta: isize) -> Self {
        let index = Self::ALL
            .iter()
            .position(|field| *field == self)
            .unwrap_or(0) as isize;
        let len = Self::ALL.len() as isize;
        Self::ALL[(index + delta).rem_euclid(len) as usize]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct OptionsForm {
    field: FormField,
    rows: String,
    cols: String,
    fact: String,
    totals: bool,
    /// `key=value` expressions separated by `;`.
    filters: String,
}

impl OptionsForm {
    fn open(options: ReportOptions, filters: String) -> Self {
        Self {
            field: FormField::Rows,
            rows: options.rows.unwrap_or_default(),
            cols: options.cols.unwrap_or_default(),
            fact: options.fact.unwrap_or_default(),
            totals: options.totals,
            filters,
        }
    }

    fn text_mut(&mut self) -> Option<&mut String> {
        match self.field {
            FormField::Rows => Some(&mut self.rows),
            FormField::Cols => Some(&mut self.cols),
            FormField::Fact => Some(&mut self.fact),
            FormField::Filters => Some(&mut self.filters),
            FormField::Totals => None,
        }
    }

    fn report_options(&self) -> ReportOptions {
        let field = |value: &str| {
            let value = value.trim();
            (!value.is_empty()).then(|| value.to_owned())
        };
        ReportOptions {
            rows: field(&self.rows),
            cols: field(&self.cols),
            fact: field(&self.fact),
            totals: self.totals,
        }
    }

    fn filter_expressions(&self) -> Vec<String> {
        self.filters
            .split([';', '\n'])
            .map(str::trim)
            .filter(|expression| !expression.is_empty())
            .map(str::to_owned)
            .collect()
    }
}

/// Cursor over the displayed grid, not the raw matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct GridCursor {
    row: usize,
    col: usize,
}

impl GridCursor {
    fn moved(self, table: &TableLayout, rows: isize, cols: isize) -> Self {
        let clamp = |value: usize, delta: isize, len: usize| {
            value
                .saturating_add_signed(delta)
                .min(len.saturating_sub(1))
        };
        Self {
            row: clamp(self.row, rows, table.body.len()),
            col: clamp(self.col, cols, table.columns.len()),
        }
    }

    fn cell<'a>(&self, table: &'a TableLayout) -> Option<&'a TableCell> {
        table
            .body
            .get(self.row)
            .and_then(|row| row.cells.get(self.col))
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
struct ViewData {
    cursor: GridCursor,
    hover: Option<usize>,
    tooltip: Option<Tooltip>,
    form: OptionsForm,
    status_line: Option<String>,
    status_token: u64,
    request_id: u64,
    in_flight: Option<u64>,
    loaded_at: Option<OffsetDateTime>,
}

pub fn run_app<R: PivotRuntime>(
    widget: &mut PivotTableWidget,
    runtime: &mut R,
    reload_on_start: bool,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::default();
    let (internal_tx, internal_rx) = mpsc::channel();

    if !widget.state().options_collapsed {
        view_data.form = OptionsForm::open(widget.report_options(), String::new());
    }
    if reload_on_start {
        let events = widget.dispatch(WidgetCommand::Reload {
            options: None,
            filters: None,
            force: true,
        });
        apply_widget_events(widget, runtime, &mut view_data, &internal_tx, events);
    }

    let mut result = Ok(());
    loop {
        process_internal_events(widget, runtime, &mut view_data, &internal_tx, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, widget, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = event::poll(Duration::from_millis(120)).context("poll event")?;
        if has_event {
            match event::read().context("read event")? {
                Event::Key(key) => {
                    if handle_key_event(widget, runtime, &mut view_data, &internal_tx, key) {
                        break;
                    }
                }
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn process_internal_events<R: PivotRuntime>(
    widget: &mut PivotTableWidget,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                view_data.status_line = None;
            }
            InternalEvent::ClearStatus { .. } => {}
            InternalEvent::FetchCompleted { request_id, body } => {
                if view_data.in_flight != Some(request_id) {
                    log::debug!("dropping stale fetch result {request_id}");
                    continue;
                }
                view_data.in_flight = None;
                view_data.loaded_at = Some(OffsetDateTime::now_utc());
                let events = widget.dispatch(WidgetCommand::FetchSucceeded(body));
                apply_widget_events(widget, runtime, view_data, tx, events);
            }
            InternalEvent::FetchFailed {
                request_id,
                failure,
            } => {
                if view_data.in_flight != Some(request_id) {
                    continue;
                }
                view_data.in_flight = None;
                let events = widget.dispatch(WidgetCommand::FetchFailed(failure));
                apply_widget_events(widget, runtime, view_data, tx, events);
            }
        }
    }
}

fn apply_widget_events<R: PivotRuntime>(
    widget: &mut PivotTableWidget,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    events: Vec<WidgetEvent>,
) {
    for event in events {
        match event {
            WidgetEvent::Rendered { .. } => {
                view_data.cursor = match widget.table() {
                    Some(table) => view_data.cursor.moved(&table, 0, 0),
                    None => GridCursor::default(),
                };
            }
            WidgetEvent::ChartChanged(_) => {
                view_data.hover = None;
            }
            WidgetEvent::ZoomOpened { records, .. } => {
                let noun = if records.len() == 1 { "record" } else { "records" };
                emit_status(view_data, tx, format!("{} {noun}", records.len()));
            }
            WidgetEvent::ZoomClosed(_) => {}
            WidgetEvent::TooltipShown(tooltip) => {
                view_data.tooltip = Some(tooltip);
            }
            WidgetEvent::TooltipClosed => {
                view_data.tooltip = None;
            }
            WidgetEvent::FetchRequested(url) => {
                view_data.request_id = view_data.request_id.saturating_add(1);
                let request_id = view_data.request_id;
                view_data.in_flight = Some(request_id);
                if let Err(error) = runtime.spawn_fetch(request_id, &url, tx.clone()) {
                    view_data.in_flight = None;
                    let failure = FetchFailure::Transport(format!("{error:#}"));
                    let events = widget.dispatch(WidgetCommand::FetchFailed(failure));
                    apply_widget_events(widget, runtime, view_data, tx, events);
                }
            }
            WidgetEvent::LoadingChanged(_) => {}
            WidgetEvent::TotalsChanged(show) => {
                let status = if show { "totals on" } else { "totals off" };
                emit_status(view_data, tx, status);
            }
            WidgetEvent::PanelToggled {
                panel: Panel::Options,
                collapsed: false,
            } => {
                let filters = std::mem::take(&mut view_data.form.filters);
                view_data.form = OptionsForm::open(widget.report_options(), filters);
            }
            WidgetEvent::PanelToggled { .. } => {}
            WidgetEvent::ReloadFailed(message) => {
                emit_status(view_data, tx, format!("reload failed: {message}"));
            }
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_secs(4));
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    view_data.status_line = Some(message.into());
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn dispatch<R: PivotRuntime>(
    widget: &mut PivotTableWidget,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    command: WidgetCommand,
) {
    let events = widget.dispatch(command);
    apply_widget_events(widget, runtime, view_data, tx, events);
}

fn handle_key_event<R: PivotRuntime>(
    widget: &mut PivotTableWidget,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    if !widget.state().options_collapsed {
        handle_form_key(widget, runtime, view_data, internal_tx, key);
        return false;
    }

    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Up | KeyCode::Char('k') => move_cursor(widget, view_data, -1, 0),
        KeyCode::Down | KeyCode::Char('j') => move_cursor(widget, view_data, 1, 0),
        KeyCode::Left | KeyCode::Char('h') => move_cursor(widget, view_data, 0, -1),
        KeyCode::Right | KeyCode::Char('l') => move_cursor(widget, view_data, 0, 1),
        KeyCode::Enter => {
            let Some(at) = widget
                .table()
                .and_then(|table| view_data.cursor.cell(&table).map(|cell| cell.at))
            else {
                return false;
            };
            let events = widget.dispatch(WidgetCommand::ToggleZoom(at));
            if events.is_empty() {
                emit_status(view_data, internal_tx, "no records behind this cell");
            }
            apply_widget_events(widget, runtime, view_data, internal_tx, events);
        }
        KeyCode::Char(ch @ '1'..='6') => {
            let Some((_, chart)) = CHART_KEYS.iter().find(|(key, _)| *key == ch) else {
                return false;
            };
            let available = widget
                .data()
                .report()
                .map(|report| available_charts(&report.labels))
                .unwrap_or_default();
            if available.contains(chart) {
                dispatch(
                    widget,
                    runtime,
                    view_data,
                    internal_tx,
                    WidgetCommand::ShowChart(*chart),
                );
            } else {
                emit_status(view_data, internal_tx, "chart not available for this report");
            }
        }
        KeyCode::Char('x') => {
            dispatch(widget, runtime, view_data, internal_tx, WidgetCommand::HideChart);
        }
        KeyCode::Char(']') => step_hover(widget, runtime, view_data, internal_tx, 1),
        KeyCode::Char('[') => step_hover(widget, runtime, view_data, internal_tx, -1),
        KeyCode::Esc if view_data.hover.is_some() => {
            view_data.hover = None;
            dispatch(widget, runtime, view_data, internal_tx, WidgetCommand::Hover(None));
        }
        KeyCode::Char('t') => {
            if widget.state().loading {
                emit_status(view_data, internal_tx, "reload in progress");
                return false;
            }
            let show = !widget.state().show_totals;
            dispatch(
                widget,
                runtime,
                view_data,
                internal_tx,
                WidgetCommand::ToggleTotals(show),
            );
        }
        KeyCode::Char('o') => {
            dispatch(
                widget,
                runtime,
                view_data,
                internal_tx,
                WidgetCommand::ToggleOptionsPanel,
            );
        }
        KeyCode::Char('f') => {
            dispatch(
                widget,
                runtime,
                view_data,
                internal_tx,
                WidgetCommand::ToggleFiltersPanel,
            );
        }
        KeyCode::Char('r') => {
            if widget.state().loading {
                emit_status(view_data, internal_tx, "reload in progress");
                return false;
            }
            dispatch(
                widget,
                runtime,
                view_data,
                internal_tx,
                WidgetCommand::Reload {
                    options: None,
                    filters: None,
                    force: true,
                },
            );
        }
        _ => {}
    }
    false
}

fn handle_form_key<R: PivotRuntime>(
    widget: &mut PivotTableWidget,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    match key.code {
        KeyCode::Esc => {
            dispatch(
                widget,
                runtime,
                view_data,
                internal_tx,
                WidgetCommand::ToggleOptionsPanel,
            );
        }
        KeyCode::Tab | KeyCode::Down => view_data.form.field = view_data.form.field.step(1),
        KeyCode::BackTab | KeyCode::Up => view_data.form.field = view_data.form.field.step(-1),
        KeyCode::Enter => {
            if widget.state().loading {
                emit_status(view_data, internal_tx, "reload in progress");
                return;
            }
            let options = view_data.form.report_options();
            let expressions = view_data.form.filter_expressions();
            let filters = FilterOptions::extract(Some(|| Ok(expressions)));
            dispatch(
                widget,
                runtime,
                view_data,
                internal_tx,
                WidgetCommand::Submit { options, filters },
            );
            if !widget.state().options_collapsed {
                dispatch(
                    widget,
                    runtime,
                    view_data,
                    internal_tx,
                    WidgetCommand::ToggleOptionsPanel,
                );
            }
        }
        KeyCode::Char(' ') if view_data.form.field == FormField::Totals => {
            view_data.form.totals = !view_data.form.totals;
        }
        KeyCode::Backspace => {
            if let Some(text) = view_data.form.text_mut() {
                text.pop();
            }
        }
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            if let Some(text) = view_data.form.text_mut() {
                text.push(ch);
            }
        }
        _ => {}
    }
}

fn move_cursor(widget: &PivotTableWidget, view_data: &mut ViewData, rows: isize, cols: isize) {
    if let Some(table) = widget.table() {
        view_data.cursor = view_data.cursor.moved(&table, rows, cols);
    }
}

fn step_hover<R: PivotRuntime>(
    widget: &mut PivotTableWidget,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    delta: isize,
) {
    let points = widget.chart().map(hover_points).unwrap_or_default();
    if points.is_empty() {
        emit_status(view_data, internal_tx, "no chart points");
        return;
    }
    let next = next_hover(view_data.hover, delta, points.len());
    view_data.hover = next;
    let point = next.and_then(|index| points.get(index).copied());
    dispatch(
        widget,
        runtime,
        view_data,
        internal_tx,
        WidgetCommand::Hover(point),
    );
}

/// Walks the points in display order; stepping past either end clears the hover.
fn next_hover(current: Option<usize>, delta: isize, len: usize) -> Option<usize> {
    match current {
        None if delta >= 0 => Some(0),
        None => len.checked_sub(1),
        Some(index) => index.checked_add_signed(delta).filter(|next| *next < len),
    }
}

/// Every hoverable point of a chart; breakdown points go group by group.
fn hover_points(chart: &ChartSpec) -> Vec<HoverPoint> {
    match chart {
        ChartSpec::Pie(pie) => (0..pie.slices.len())
            .map(|series| HoverPoint::new(series, 0))
            .collect(),
        ChartSpec::Bar(bar) => (0..bar.bars.len())
            .map(|series| HoverPoint::new(series, 0))
            .collect(),
        ChartSpec::Breakdown(breakdown) => (0..breakdown.groups.len())
            .flat_map(|group| {
                (0..breakdown.series.len()).map(move |series| HoverPoint::new(series, group))
            })
            .collect(),
    }
}

fn render(frame: &mut ratatui::Frame<'_>, widget: &PivotTableWidget, view_data: &ViewData) {
    let state = widget.state();
    let mut constraints = vec![Constraint::Length(3), Constraint::Min(1)];
    if !state.filters_collapsed {
        constraints.push(Constraint::Length(3));
    }
    constraints.push(Constraint::Length(3));
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(frame.area());

    let header = Paragraph::new(header_text(widget)).block(
        Block::default()
            .title(format!("pivotview {}", widget.id()))
            .borders(Borders::ALL),
    );
    frame.render_widget(header, layout[0]);

    match widget.chart() {
        Some(chart) => {
            let panes = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
                .split(layout[1]);
            render_table(frame, panes[0], widget, view_data);
            render_chart(frame, panes[1], chart, view_data);
        }
        None => render_table(frame, layout[1], widget, view_data),
    }

    let mut next = 2;
    if !state.filters_collapsed {
        let filters = Paragraph::new(filters_text(widget))
            .block(Block::default().title("filters").borders(Borders::ALL));
        frame.render_widget(filters, layout[next]);
        next += 1;
    }

    let status = Paragraph::new(status_text(widget, view_data))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, layout[next]);

    if !state.options_collapsed {
        let area = centered_rect(60, 50, frame.area());
        frame.render_widget(Clear, area);
        let form = Paragraph::new(form_text(&view_data.form)).block(
            Block::default()
                .title("report options")
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::Cyan)),
        );
        frame.render_widget(form, area);
    }
}

fn header_text(widget: &PivotTableWidget) -> String {
    let busy = if widget.state().loading { " [loading]" } else { "" };
    let source = widget.ajax_url().unwrap_or("embedded data");
    match widget.data().report() {
        Some(report) => format!("{} | {source}{busy}", report.labels.layer),
        None => format!("{source}{busy}"),
    }
}

fn filters_text(widget: &PivotTableWidget) -> String {
    let Some(url) = widget.ajax_url() else {
        return "no reload URL".to_owned();
    };
    let query = ParsedQuery::parse(split_url(url).1);
    let pairs = query
        .keys()
        .map(|key| format!("{key}={}", query.get(key).unwrap_or_default()))
        .collect::<Vec<_>>();
    if pairs.is_empty() {
        "no filters".to_owned()
    } else {
        pairs.join("  ")
    }
}

fn status_text(widget: &PivotTableWidget, view_data: &ViewData) -> String {
    let state = widget.state();
    let mode = if !state.options_collapsed {
        "FORM"
    } else if state.loading {
        "LOAD"
    } else {
        "VIEW"
    };
    let keys = if state.options_collapsed {
        "arrows move | enter zoom | 1-6 chart x hide | [ ] points | t totals | o options | f filters | r reload | q quit"
    } else {
        "tab next | space totals | enter submit | esc close"
    };

    let mut parts = vec![mode.to_owned()];
    if let Some(status) = &view_data.status_line {
        parts.push(status.clone());
    }
    if let Some(stamp) = view_data
        .loaded_at
        .and_then(|loaded_at| loaded_at.format(LOADED_AT_FORMAT).ok())
    {
        parts.push(format!("loaded {stamp} UTC"));
    }
    parts.push(keys.to_owned());
    parts.join(" | ")
}

fn form_text(form: &OptionsForm) -> String {
    let mut lines = FormField::ALL
        .iter()
        .map(|field| {
            let marker = if *field == form.field { ">" } else { " " };
            let value = match field {
                FormField::Rows => form.rows.clone(),
                FormField::Cols => form.cols.clone(),
                FormField::Fact => form.fact.clone(),
                FormField::Totals => if form.totals { "[x]" } else { "[ ]" }.to_owned(),
                FormField::Filters => form.filters.clone(),
            };
            format!("{marker} {:<8} {value}", field.label())
        })
        .collect::<Vec<_>>();
    lines.push(String::new());
    lines.push("filters: key=value; key=value".to_owned());
    lines.join("\n")
}

/// Display lines for one table cell: the value, then the drill-down records when open.
fn cell_lines(cell: &TableCell) -> Vec<String> {
    let value = match &cell.content {
        CellContent::Placeholder(none) => none.clone(),
        CellContent::Text(text) => text.clone(),
        CellContent::List(items) => items.join(", "),
    };
    match &cell.zoom {
        None => vec![value],
        Some(pivotview_app::Zoom::Closed) => vec![format!("{value} {ZOOM_CLOSED_MARK}")],
        Some(pivotview_app::Zoom::Open(records)) => {
            let mut lines = vec![format!("{value} {ZOOM_OPEN_MARK}")];
            lines.extend(
                records
                    .iter()
                    .map(|record| format!("{RECORD_BULLET} {record}")),
            );
            lines
        }
    }
}

fn render_table(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    widget: &PivotTableWidget,
    view_data: &ViewData,
) {
    let Some(table) = widget.table() else {
        let empty = Paragraph::new(EMPTY_TEXT)
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(empty, area);
        return;
    };

    let mut header_cells = vec![Cell::from(table.rows_label.clone())];
    header_cells.extend(table.columns.iter().map(|label| Cell::from(label.clone())));
    if let Some(label) = &table.header.totals_label {
        header_cells.push(Cell::from(label.clone()));
    }
    let header = Row::new(header_cells).style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    );

    let mut rows = table
        .body
        .iter()
        .enumerate()
        .map(|(position, body_row)| {
            let mut height = 1;
            let mut cells = vec![Cell::from(body_row.label.clone())];
            for (col, cell) in body_row.cells.iter().enumerate() {
                let lines = cell_lines(cell);
                height = height.max(lines.len());
                let mut rendered = Cell::from(lines.join("\n"));
                if view_data.cursor == (GridCursor { row: position, col }) {
                    rendered = rendered.style(Style::default().add_modifier(Modifier::REVERSED));
                }
                cells.push(rendered);
            }
            if let Some(total) = &body_row.total {
                cells.push(Cell::from(total.clone()));
            }
            let style = match body_row.parity {
                pivotview_app::Parity::Odd => Style::default().fg(Color::Gray),
                pivotview_app::Parity::Even => Style::default(),
            };
            Row::new(cells)
                .height(u16::try_from(height).unwrap_or(u16::MAX))
                .style(style)
        })
        .collect::<Vec<_>>();

    if let Some(footer) = &table.footer {
        let mut cells = vec![Cell::from(footer.label.clone())];
        cells.extend(footer.column_totals.iter().map(|total| Cell::from(total.clone())));
        cells.push(Cell::from(footer.grand_total.clone()));
        rows.push(Row::new(cells).style(Style::default().add_modifier(Modifier::BOLD)));
    }

    let label_width = table
        .body
        .iter()
        .map(|row| row.label.chars().count())
        .chain(std::iter::once(table.rows_label.chars().count()))
        .max()
        .unwrap_or(0)
        .clamp(6, 32);
    let mut widths = vec![Constraint::Length(label_width as u16 + 1)];
    widths.extend(table.columns.iter().map(|_| Constraint::Fill(1)));
    if table.header.totals_label.is_some() {
        widths.push(Constraint::Length(10));
    }

    let title = format!("{} | {}", table.header.layer_label, table.header.cols_label);
    let rendered = Table::new(rows, widths)
        .header(header)
        .block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(rendered, area);
}

fn render_chart(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    chart: &ChartSpec,
    view_data: &ViewData,
) {
    let (chart_area, tooltip_area) = match &view_data.tooltip {
        Some(_) => {
            let split = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(3), Constraint::Length(4)])
                .split(area);
            (split[0], Some(split[1]))
        }
        None => (area, None),
    };

    let block = Block::default().title(chart.title().to_owned()).borders(Borders::ALL);
    let hovered = view_data
        .hover
        .and_then(|index| hover_points(chart).get(index).copied());
    match chart {
        ChartSpec::Pie(pie) => {
            let lines = pie_lines(pie, hovered.map(|point| point.series_index));
            let body = Paragraph::new(lines.join("\n"))
                .block(block)
                .wrap(Wrap { trim: false });
            frame.render_widget(body, chart_area);
        }
        ChartSpec::Bar(bar) => {
            frame.render_widget(bar_chart(bar, hovered).block(block), chart_area);
        }
        ChartSpec::Breakdown(breakdown) => {
            frame.render_widget(breakdown_chart(breakdown, hovered).block(block), chart_area);
        }
    }

    if let (Some(tooltip), Some(area)) = (&view_data.tooltip, tooltip_area) {
        let body = Paragraph::new(tooltip_text(tooltip))
            .block(Block::default().borders(Borders::ALL))
            .style(Style::default().fg(Color::White));
        frame.render_widget(body, area);
    }
}

fn pie_lines(pie: &PieChart, hovered: Option<usize>) -> Vec<String> {
    let label_width = pie
        .slices
        .iter()
        .map(|slice| slice.label.chars().count())
        .max()
        .unwrap_or(0);
    pie.slices
        .iter()
        .enumerate()
        .map(|(index, slice)| {
            let percent = pie.percent(index).unwrap_or(0.0);
            let filled = ((percent / 100.0) * PIE_BAR_WIDTH as f64).round() as usize;
            let marker = if hovered == Some(index) { ">" } else { " " };
            format!(
                "{marker} {:<label_width$} {:<bar_width$} {percent:>5.1}% ({})",
                slice.label,
                "█".repeat(filled.min(PIE_BAR_WIDTH)),
                format_number(slice.value),
                bar_width = PIE_BAR_WIDTH,
            )
        })
        .collect()
}

fn bar_value(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.round() as u64
    } else {
        0
    }
}

fn highlight(active: bool) -> Style {
    if active {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::Cyan)
    }
}

fn bar_chart(bar: &BarProjection, hovered: Option<HoverPoint>) -> BarChart<'static> {
    let bars = bar
        .bars
        .iter()
        .enumerate()
        .map(|(index, point)| {
            Bar::default()
                .value(bar_value(point.value))
                .text_value(format_number(point.value))
                .label(Line::from(point.label.clone()))
                .style(highlight(
                    hovered.is_some_and(|hover| hover.series_index == index),
                ))
        })
        .collect::<Vec<_>>();
    BarChart::default()
        .data(BarGroup::default().bars(&bars))
        .bar_width(7)
        .bar_gap(1)
}

fn breakdown_chart(breakdown: &BreakdownChart, hovered: Option<HoverPoint>) -> BarChart<'static> {
    let mut chart = BarChart::default()
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(0)
        .group_gap(1);
    for (group_index, group) in breakdown.groups.iter().enumerate() {
        let bars = breakdown
            .series
            .iter()
            .enumerate()
            .map(|(series_index, series)| {
                let value = series
                    .points
                    .get(group_index)
                    .map(|(value, _)| *value)
                    .unwrap_or(0.0);
                let active = hovered.is_some_and(|hover| {
                    hover.series_index == series_index && hover.data_index == group_index
                });
                Bar::default()
                    .value(bar_value(value))
                    .text_value(format!("{} {}", series.label, format_number(value)))
                    .style(highlight(active))
            })
            .collect::<Vec<_>>();
        chart = chart.data(
            BarGroup::default()
                .label(Line::from(group.clone()))
                .bars(&bars),
        );
    }
    chart
}

fn tooltip_text(tooltip: &Tooltip) -> String {
    match &tooltip.value {
        Some(value) => format!("{}\n{} : {value}", tooltip.label, tooltip.text),
        None => format!("{}\n{}", tooltip.label, tooltip.text),
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::{
        FormField, GridCursor, InternalEvent, PivotRuntime, ViewData, cell_lines,
        handle_key_event, hover_points, next_hover, pie_lines, process_internal_events, render,
        status_text,
    };
    use anyhow::{Result, anyhow};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use pivotview_app::{
        Axis, AxisEntry, CellRef, ChartOptions, ChartSpec, ChartType, FetchFailure, PieChart,
        PivotTableWidget, WidgetCommand, WidgetId, WidgetOptions,
    };
    use pivotview_testkit::{sales_by_region_and_quarter, sales_with_other_bucket};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use std::sync::mpsc;

    #[derive(Debug, Default)]
    struct TestRuntime {
        body: Option<String>,
        failure: Option<FetchFailure>,
        fetched: Vec<String>,
    }

    impl PivotRuntime for TestRuntime {
        fn fetch(&mut self, url: &str) -> Result<String> {
            self.fetched.push(url.to_owned());
            if let Some(failure) = &self.failure {
                return Err(anyhow!(failure.clone()));
            }
            self.body
                .clone()
                .ok_or_else(|| anyhow!("no canned response"))
        }
    }

    fn widget() -> PivotTableWidget {
        PivotTableWidget::new(
            WidgetId::from("pt"),
            WidgetOptions {
                ajax_url: Some("http://host/pivot.json?mode=report".to_owned()),
                ..WidgetOptions::default()
            },
            Some(sales_by_region_and_quarter()),
        )
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn run_keys(
        widget: &mut PivotTableWidget,
        runtime: &mut TestRuntime,
        view_data: &mut ViewData,
        keys: &[KeyEvent],
    ) {
        let (tx, rx) = mpsc::channel();
        for key in keys {
            let _ = handle_key_event(widget, runtime, view_data, &tx, *key);
            process_internal_events(widget, runtime, view_data, &tx, &rx);
        }
    }

    #[test]
    fn ctrl_q_and_q_quit() {
        let mut widget = widget();
        let mut runtime = TestRuntime::default();
        let mut view_data = ViewData::default();
        let (tx, _rx) = mpsc::channel();

        assert!(handle_key_event(
            &mut widget,
            &mut runtime,
            &mut view_data,
            &tx,
            KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL),
        ));
        assert!(handle_key_event(
            &mut widget,
            &mut runtime,
            &mut view_data,
            &tx,
            key(KeyCode::Char('q')),
        ));
    }

    #[test]
    fn reload_key_fetches_and_replaces_payload() {
        let mut widget = widget();
        let mut runtime = TestRuntime {
            body: Some(sales_with_other_bucket()),
            ..TestRuntime::default()
        };
        let mut view_data = ViewData::default();

        run_keys(
            &mut widget,
            &mut runtime,
            &mut view_data,
            &[key(KeyCode::Char('r'))],
        );

        assert_eq!(runtime.fetched, vec!["http://host/pivot.json?mode=report"]);
        assert_eq!(widget.embedded(), sales_with_other_bucket());
        assert!(!widget.state().loading);
        assert!(view_data.loaded_at.is_some());
        assert_eq!(view_data.in_flight, None);
    }

    #[test]
    fn failed_reload_reports_login_message() {
        let mut widget = widget();
        let mut runtime = TestRuntime {
            failure: Some(FetchFailure::Unauthorized),
            ..TestRuntime::default()
        };
        let mut view_data = ViewData::default();

        run_keys(
            &mut widget,
            &mut runtime,
            &mut view_data,
            &[key(KeyCode::Char('r'))],
        );

        let status = view_data.status_line.clone().unwrap_or_default();
        assert!(status.contains(pivotview_app::LOGIN_REQUIRED_MESSAGE));
        assert!(!widget.state().loading);
        assert_eq!(widget.embedded(), sales_by_region_and_quarter());
    }

    #[test]
    fn stale_fetch_results_are_dropped() {
        let mut widget = widget();
        let mut runtime = TestRuntime::default();
        let mut view_data = ViewData {
            in_flight: Some(2),
            ..ViewData::default()
        };
        let (tx, rx) = mpsc::channel();
        tx.send(InternalEvent::FetchCompleted {
            request_id: 1,
            body: sales_with_other_bucket(),
        })
        .expect("send");
        process_internal_events(&mut widget, &mut runtime, &mut view_data, &tx, &rx);
        assert_eq!(widget.embedded(), sales_by_region_and_quarter());
        assert_eq!(view_data.in_flight, Some(2));
    }

    #[test]
    fn enter_toggles_zoom_under_cursor() {
        let mut widget = widget();
        let mut runtime = TestRuntime::default();
        let mut view_data = ViewData::default();

        run_keys(
            &mut widget,
            &mut runtime,
            &mut view_data,
            &[key(KeyCode::Enter)],
        );
        assert!(widget.state().is_zoom_open(CellRef::new(0, 0)));
        assert_eq!(view_data.status_line.as_deref(), Some("3 records"));

        run_keys(
            &mut widget,
            &mut runtime,
            &mut view_data,
            &[key(KeyCode::Down), key(KeyCode::Down), key(KeyCode::Right), key(KeyCode::Enter)],
        );
        assert_eq!(view_data.cursor, GridCursor { row: 2, col: 1 });
        assert_eq!(
            view_data.status_line.as_deref(),
            Some("no records behind this cell")
        );
    }

    #[test]
    fn cursor_clamps_to_displayed_grid() {
        let mut widget = widget();
        let mut runtime = TestRuntime::default();
        let mut view_data = ViewData::default();
        let keys = [key(KeyCode::Down); 8]
            .into_iter()
            .chain([key(KeyCode::Right); 8])
            .collect::<Vec<_>>();
        run_keys(&mut widget, &mut runtime, &mut view_data, &keys);
        assert_eq!(view_data.cursor, GridCursor { row: 2, col: 1 });

        run_keys(
            &mut widget,
            &mut runtime,
            &mut view_data,
            &[key(KeyCode::Up); 5],
        );
        assert_eq!(view_data.cursor.row, 0);
    }

    #[test]
    fn chart_keys_show_hover_and_hide() {
        let mut widget = widget();
        let mut runtime = TestRuntime::default();
        let mut view_data = ViewData::default();

        run_keys(
            &mut widget,
            &mut runtime,
            &mut view_data,
            &[key(KeyCode::Char('6')), key(KeyCode::Char(']'))],
        );
        assert!(matches!(widget.chart(), Some(ChartSpec::Breakdown(_))));
        let tooltip = view_data.tooltip.clone().expect("tooltip shown");
        assert_eq!(tooltip.label, "Q1");
        assert_eq!(tooltip.text, "North");

        run_keys(
            &mut widget,
            &mut runtime,
            &mut view_data,
            &[key(KeyCode::Char('x'))],
        );
        assert!(widget.chart().is_none());
        assert!(view_data.tooltip.is_none());
        assert_eq!(view_data.hover, None);
    }

    #[test]
    fn options_form_submits_filters_into_reload_url() {
        let mut widget = widget();
        let mut runtime = TestRuntime {
            body: Some(sales_by_region_and_quarter()),
            ..TestRuntime::default()
        };
        let mut view_data = ViewData::default();

        let mut keys = vec![key(KeyCode::Char('o'))];
        keys.extend("region".chars().map(|ch| key(KeyCode::Char(ch))));
        keys.push(key(KeyCode::BackTab));
        keys.extend("x=2".chars().map(|ch| key(KeyCode::Char(ch))));
        keys.push(key(KeyCode::Enter));
        run_keys(&mut widget, &mut runtime, &mut view_data, &keys);

        assert_eq!(
            runtime.fetched,
            vec!["http://host/pivot.json?mode=report&rows=region&x=2"]
        );
        assert!(widget.state().options_collapsed);
        assert_eq!(view_data.form.field, FormField::Filters);
        assert!(widget.state().show_totals);
    }

    #[test]
    fn totals_key_toggles_without_fetch() {
        let mut widget = widget();
        let mut runtime = TestRuntime::default();
        let mut view_data = ViewData::default();
        run_keys(
            &mut widget,
            &mut runtime,
            &mut view_data,
            &[key(KeyCode::Char('t'))],
        );
        assert!(!widget.state().show_totals);
        assert!(runtime.fetched.is_empty());
        assert_eq!(view_data.status_line.as_deref(), Some("totals off"));
    }

    #[test]
    fn next_hover_wraps_to_none_at_the_ends() {
        assert_eq!(next_hover(None, 1, 3), Some(0));
        assert_eq!(next_hover(None, -1, 3), Some(2));
        assert_eq!(next_hover(Some(2), 1, 3), None);
        assert_eq!(next_hover(Some(0), -1, 3), None);
        assert_eq!(next_hover(None, -1, 0), None);
    }

    #[test]
    fn breakdown_hover_points_go_group_by_group() {
        let mut widget = widget();
        widget.dispatch(WidgetCommand::ShowChart(ChartOptions::new(
            ChartType::Breakdown,
            Axis::Rows,
        )));
        let points = widget.chart().map(hover_points).unwrap_or_default();
        assert_eq!(points.len(), 6);
        assert_eq!((points[0].series_index, points[0].data_index), (0, 0));
        assert_eq!((points[1].series_index, points[1].data_index), (1, 0));
        assert_eq!((points[2].series_index, points[2].data_index), (0, 1));
    }

    #[test]
    fn open_zoom_lists_records_below_value() {
        let mut widget = widget();
        widget.dispatch(WidgetCommand::ToggleZoom(CellRef::new(0, 0)));
        let table = widget.table().expect("table");
        let lines = cell_lines(&table.body[0].cells[0]);
        assert_eq!(lines[0], "10 -");
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], "· Order #1001");
        assert_eq!(cell_lines(&table.body[0].cells[1]), vec!["14 +"]);
        assert_eq!(cell_lines(&table.body[2].cells[1]), vec!["-"]);
    }

    #[test]
    fn pie_lines_show_share_of_total() {
        let pie = PieChart::from_axis(
            &[AxisEntry::new("a", "A", 1.0), AxisEntry::new("b", "B", 3.0)],
            "Sales per Region".to_owned(),
        );
        let lines = pie_lines(&pie, Some(1));
        assert!(lines[0].ends_with(" 25.0% (1)"));
        assert!(lines[1].starts_with("> B"));
        assert!(lines[1].ends_with(" 75.0% (3)"));
    }

    #[test]
    fn status_line_reflects_mode_and_message() {
        let mut widget = widget();
        let view_data = ViewData {
            status_line: Some("totals off".to_owned()),
            ..ViewData::default()
        };
        assert!(status_text(&widget, &view_data).starts_with("VIEW | totals off | arrows"));

        widget.dispatch(WidgetCommand::ToggleOptionsPanel);
        assert!(status_text(&widget, &ViewData::default()).starts_with("FORM | tab next"));
    }

    #[test]
    fn render_draws_table_and_chart() -> Result<()> {
        let mut widget = widget();
        widget.dispatch(WidgetCommand::ShowChart(ChartOptions::new(
            ChartType::Barchart,
            Axis::Cols,
        )));
        let mut terminal = Terminal::new(TestBackend::new(120, 30))?;
        terminal.draw(|frame| render(frame, &widget, &ViewData::default()))?;

        let screen = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect::<String>();
        assert!(screen.contains("Sales per Quarter"));
        assert!(screen.contains("North"));
        assert!(screen.contains("Total"));
        Ok(())
    }
}

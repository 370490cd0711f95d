// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{
    CellRef, ChartOptions, ChartRequest, ChartSpec, ControlEntry, FetchFailure, FilterOptions,
    HoverOutcome, HoverPoint, ParsedQuery, PivotData, QueryParams, ReportOptions, TableLayout,
    Tooltip, ViewState, WidgetId, WidgetOptions, chart_controls, merge_query, split_url,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Options,
    Filters,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WidgetCommand {
    Refresh,
    ShowChart(ChartOptions),
    HideChart,
    ToggleZoom(CellRef),
    Hover(Option<HoverPoint>),
    ToggleTotals(bool),
    Submit {
        options: ReportOptions,
        filters: Option<FilterOptions>,
    },
    Reload {
        options: Option<QueryParams>,
        filters: Option<QueryParams>,
        force: bool,
    },
    FetchSucceeded(String),
    FetchFailed(FetchFailure),
    ToggleOptionsPanel,
    ToggleFiltersPanel,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WidgetEvent {
    Rendered { empty: bool },
    ChartChanged(Option<ChartOptions>),
    ZoomOpened { cell: CellRef, records: Vec<String> },
    ZoomClosed(CellRef),
    TooltipShown(Tooltip),
    TooltipClosed,
    FetchRequested(String),
    LoadingChanged(bool),
    TotalsChanged(bool),
    PanelToggled { panel: Panel, collapsed: bool },
    ReloadFailed(String),
}

/// One pivot table instance: its payload, its chart and everything the user toggled.
#[derive(Debug, Clone)]
pub struct PivotTableWidget {
    id: WidgetId,
    options: WidgetOptions,
    ajax_url: Option<String>,
    embedded: String,
    data: PivotData,
    chart: Option<ChartSpec>,
    state: ViewState,
}

impl PivotTableWidget {
    pub fn new(id: WidgetId, options: WidgetOptions, embedded: Option<String>) -> Self {
        let mut widget = Self {
            id,
            ajax_url: options.ajax_url.clone(),
            state: ViewState::from_options(&options),
            options,
            embedded: embedded.unwrap_or_default(),
            data: PivotData::Empty,
            chart: None,
        };
        widget.refresh();
        widget
    }

    pub fn id(&self) -> &WidgetId {
        &self.id
    }

    pub fn options(&self) -> &WidgetOptions {
        &self.options
    }

    pub fn ajax_url(&self) -> Option<&str> {
        self.ajax_url.as_deref()
    }

    /// The payload field as it currently stands, overwritten after each fetch.
    pub fn embedded(&self) -> &str {
        &self.embedded
    }

    pub fn data(&self) -> &PivotData {
        &self.data
    }

    pub fn chart(&self) -> Option<&ChartSpec> {
        self.chart.as_ref()
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn table(&self) -> Option<TableLayout> {
        self.data.report().map(|report| {
            TableLayout::build(report, self.state.show_totals, &self.state.open_zooms)
        })
    }

    /// Options form values as the current reload URL and totals flag describe them.
    pub fn report_options(&self) -> ReportOptions {
        let query = self
            .ajax_url
            .as_deref()
            .map(|url| ParsedQuery::parse(split_url(url).1))
            .unwrap_or_default();
        let field = |key: &str| query.get(key).map(str::to_owned);
        ReportOptions {
            rows: field("rows"),
            cols: field("cols"),
            fact: field("fact"),
            totals: self.state.show_totals,
        }
    }

    pub fn chart_controls(&self) -> Vec<ControlEntry> {
        self.data
            .report()
            .map(|report| chart_controls(&self.id, &report.labels))
            .unwrap_or_default()
    }

    pub fn dispatch(&mut self, command: WidgetCommand) -> Vec<WidgetEvent> {
        match command {
            WidgetCommand::Refresh => self.refresh(),
            WidgetCommand::ShowChart(chart) => self.render_chart(ChartRequest::Show(chart)),
            WidgetCommand::HideChart => self.render_chart(ChartRequest::Hide),
            WidgetCommand::ToggleZoom(cell) => self.toggle_zoom(cell),
            WidgetCommand::Hover(point) => self.hover(point),
            WidgetCommand::ToggleTotals(show) => {
                if show == self.state.show_totals {
                    return Vec::new();
                }
                self.reload(Some(ReportOptions::totals_only(show)), None, false)
            }
            WidgetCommand::Submit { options, filters } => self.reload(
                Some(options.to_params()),
                filters.map(FilterOptions::into_params),
                false,
            ),
            WidgetCommand::Reload {
                options,
                filters,
                force,
            } => self.reload(options, filters, force),
            WidgetCommand::FetchSucceeded(body) => {
                self.embedded = body;
                self.refresh()
            }
            WidgetCommand::FetchFailed(failure) => {
                let message = failure.message();
                log::error!("pivot reload failed for {}: {message}", self.id);
                let mut events = vec![WidgetEvent::ReloadFailed(message)];
                events.extend(self.set_loading(false));
                events
            }
            WidgetCommand::ToggleOptionsPanel => {
                self.state.options_collapsed = !self.state.options_collapsed;
                vec![WidgetEvent::PanelToggled {
                    panel: Panel::Options,
                    collapsed: self.state.options_collapsed,
                }]
            }
            WidgetCommand::ToggleFiltersPanel => {
                self.state.filters_collapsed = !self.state.filters_collapsed;
                vec![WidgetEvent::PanelToggled {
                    panel: Panel::Filters,
                    collapsed: self.state.filters_collapsed,
                }]
            }
        }
    }

    fn refresh(&mut self) -> Vec<WidgetEvent> {
        self.data = PivotData::parse(Some(&self.embedded));
        self.state.open_zooms.clear();
        if self.data.is_empty() {
            self.state.current_chart = None;
        }

        let mut events = vec![WidgetEvent::Rendered {
            empty: self.data.is_empty(),
        }];
        events.extend(self.render_chart(ChartRequest::Auto));
        events.extend(self.set_loading(false));
        events
    }

    fn render_chart(&mut self, request: ChartRequest) -> Vec<WidgetEvent> {
        let mut events = Vec::new();
        if self.state.cursor.hovered().is_some() {
            events.push(WidgetEvent::TooltipClosed);
        }
        self.state.cursor.reset();
        self.chart = None;

        if let Some(report) = self.data.report() {
            self.chart = self
                .state
                .resolve_chart(request, self.options.default_chart)
                .map(|chart| ChartSpec::build(report, chart));
        }

        let drawn = self.chart.as_ref().and(self.state.current_chart);
        events.push(WidgetEvent::ChartChanged(drawn));
        events
    }

    fn toggle_zoom(&mut self, cell: CellRef) -> Vec<WidgetEvent> {
        let Some(report) = self.data.report() else {
            return Vec::new();
        };
        let displayed = report.rows.get(cell.row).is_some_and(|row| !row.is_other())
            && report.cols.get(cell.col).is_some_and(|col| !col.is_other());
        let Some(target) = report.cell(cell.row, cell.col) else {
            return Vec::new();
        };
        if !displayed || !target.is_zoomable() {
            return Vec::new();
        }

        if self.state.toggle_zoom(cell) {
            let records = target
                .keys
                .iter()
                .map(|key| report.record_label(key))
                .collect();
            vec![WidgetEvent::ZoomOpened { cell, records }]
        } else {
            vec![WidgetEvent::ZoomClosed(cell)]
        }
    }

    fn hover(&mut self, point: Option<HoverPoint>) -> Vec<WidgetEvent> {
        let Some(chart) = &self.chart else {
            return Vec::new();
        };
        let Some(point) = point else {
            self.state.cursor.hover(None);
            return vec![WidgetEvent::TooltipClosed];
        };

        match self.state.cursor.hover(Some(chart.hover_key(point))) {
            HoverOutcome::Unchanged => Vec::new(),
            HoverOutcome::Close => vec![WidgetEvent::TooltipClosed],
            HoverOutcome::Show => match chart.tooltip(point) {
                Some(tooltip) => vec![
                    WidgetEvent::TooltipClosed,
                    WidgetEvent::TooltipShown(tooltip),
                ],
                None => {
                    self.state.cursor.reset();
                    vec![WidgetEvent::TooltipClosed]
                }
            },
        }
    }

    fn reload(
        &mut self,
        options: Option<QueryParams>,
        filters: Option<QueryParams>,
        force: bool,
    ) -> Vec<WidgetEvent> {
        if self.state.loading {
            log::debug!("{}: reload ignored while a request is in flight", self.id);
            return Vec::new();
        }

        let mut events = Vec::new();
        let mut needs_reload = false;
        if options.is_some() || filters.is_some() {
            let base = self.ajax_url.as_deref().unwrap_or_default();
            let merged = merge_query(base, options.as_ref(), filters.as_ref());
            if let Some(show) = merged.show_totals
                && show != self.state.show_totals
            {
                self.state.show_totals = show;
                events.push(WidgetEvent::TotalsChanged(show));
            }
            needs_reload = merged.needs_reload;
            if self.ajax_url.is_some() {
                self.ajax_url = Some(merged.url);
            }
        }

        if !(needs_reload || force) {
            events.extend(self.refresh());
            return events;
        }

        match self.ajax_url.clone() {
            Some(url) => {
                log::debug!("{}: fetching {url}", self.id);
                events.extend(self.set_loading(true));
                events.push(WidgetEvent::FetchRequested(url));
            }
            None => {
                log::warn!(
                    "{}: reload needed but no ajax URL is configured; re-rendering held data",
                    self.id
                );
                events.extend(self.refresh());
            }
        }
        events
    }

    fn set_loading(&mut self, loading: bool) -> Option<WidgetEvent> {
        if self.state.loading == loading {
            return None;
        }
        self.state.loading = loading;
        Some(WidgetEvent::LoadingChanged(loading))
    }
}

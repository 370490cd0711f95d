// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::ChartOptions;

/// Widget configuration as the page hands it over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WidgetOptions {
    pub show_totals: bool,
    pub collapse_form: bool,
    #[serde(rename = "ajaxURL")]
    pub ajax_url: Option<String>,
    pub default_chart: Option<ChartOptions>,
    pub show_chart: bool,
}

impl Default for WidgetOptions {
    fn default() -> Self {
        Self {
            show_totals: true,
            collapse_form: true,
            ajax_url: None,
            default_chart: None,
            show_chart: false,
        }
    }
}

/// Matrix coordinates of a table cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellRef {
    pub row: usize,
    pub col: usize,
}

impl CellRef {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChartRequest {
    /// Redraw whatever the widget would show on its own.
    Auto,
    Hide,
    Show(ChartOptions),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverOutcome {
    Unchanged,
    Show,
    Close,
}

/// Point under the pointer the last time a tooltip was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChartCursor {
    hovered: Option<(usize, Option<usize>)>,
}

impl ChartCursor {
    pub fn hover(&mut self, key: Option<(usize, Option<usize>)>) -> HoverOutcome {
        match key {
            Some(key) if self.hovered == Some(key) => HoverOutcome::Unchanged,
            Some(key) => {
                self.hovered = Some(key);
                HoverOutcome::Show
            }
            None => {
                self.hovered = None;
                HoverOutcome::Close
            }
        }
    }

    pub fn hovered(&self) -> Option<(usize, Option<usize>)> {
        self.hovered
    }

    pub fn reset(&mut self) {
        self.hovered = None;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
    pub show_totals: bool,
    pub show_chart: bool,
    pub current_chart: Option<ChartOptions>,
    pub open_zooms: BTreeSet<CellRef>,
    pub cursor: ChartCursor,
    pub loading: bool,
    pub options_collapsed: bool,
    pub filters_collapsed: bool,
}

impl ViewState {
    pub fn from_options(options: &WidgetOptions) -> Self {
        Self {
            show_totals: options.show_totals,
            show_chart: options.show_chart,
            current_chart: None,
            open_zooms: BTreeSet::new(),
            cursor: ChartCursor::default(),
            loading: false,
            options_collapsed: options.collapse_form,
            filters_collapsed: false,
        }
    }

    /// Picks the chart to draw: an explicit request wins, then the last chart chosen,
    /// then the configured default. `Hide` switches charts off until a chart is chosen.
    pub fn resolve_chart(
        &mut self,
        request: ChartRequest,
        default_chart: Option<ChartOptions>,
    ) -> Option<ChartOptions> {
        let chosen = match request {
            ChartRequest::Hide => {
                self.show_chart = false;
                return None;
            }
            ChartRequest::Show(chart) => chart,
            ChartRequest::Auto => {
                if !self.show_chart {
                    return None;
                }
                self.current_chart.or(default_chart)?
            }
        };
        self.show_chart = true;
        self.current_chart = Some(chosen);
        Some(chosen)
    }

    /// Returns whether the cell is open afterwards.
    pub fn toggle_zoom(&mut self, cell: CellRef) -> bool {
        if self.open_zooms.remove(&cell) {
            false
        } else {
            self.open_zooms.insert(cell);
            true
        }
    }

    pub fn is_zoom_open(&self, cell: CellRef) -> bool {
        self.open_zooms.contains(&cell)
    }
}

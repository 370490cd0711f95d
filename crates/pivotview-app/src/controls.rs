// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

use crate::{Axis, ChartOptions, ChartType, LabelSet, WidgetId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartIcon {
    pub element_id: String,
    pub chart: ChartOptions,
}

impl ChartIcon {
    fn new(widget_id: &WidgetId, chart_type: ChartType, axis: Axis) -> Self {
        let prefix = match chart_type {
            ChartType::Piechart => "pchart",
            ChartType::Barchart => "vchart",
            ChartType::Breakdown => "hchart",
        };
        Self {
            element_id: widget_id.suffixed(&format!("{prefix}-{}", axis.as_str())),
            chart: ChartOptions::new(chart_type, axis),
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self.chart.chart_type {
            ChartType::Piechart => "pt-pchart",
            ChartType::Barchart => "pt-vchart",
            ChartType::Breakdown => "pt-hchart",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlEntry {
    Icon(ChartIcon),
    Label(String),
}

/// Chart pickers for the axes that have a label. Breakdown needs both.
pub fn chart_controls(widget_id: &WidgetId, labels: &LabelSet) -> Vec<ControlEntry> {
    let mut entries = Vec::new();
    for axis in Axis::ALL {
        let label = labels.axis(axis);
        if label.is_empty() {
            continue;
        }
        entries.push(ControlEntry::Icon(ChartIcon::new(
            widget_id,
            ChartType::Piechart,
            axis,
        )));
        entries.push(ControlEntry::Icon(ChartIcon::new(
            widget_id,
            ChartType::Barchart,
            axis,
        )));
        entries.push(ControlEntry::Label(label.to_owned()));
    }

    if !labels.rows.is_empty() && !labels.cols.is_empty() {
        for axis in Axis::ALL {
            entries.push(ControlEntry::Icon(ChartIcon::new(
                widget_id,
                ChartType::Breakdown,
                axis,
            )));
            entries.push(ControlEntry::Label(labels.axis(axis).to_owned()));
        }
    }
    entries
}

/// Every chart the controls offer, in display order.
pub fn available_charts(labels: &LabelSet) -> Vec<ChartOptions> {
    chart_controls(&WidgetId::from(""), labels)
        .into_iter()
        .filter_map(|entry| match entry {
            ControlEntry::Icon(icon) => Some(icon.chart),
            ControlEntry::Label(_) => None,
        })
        .collect()
}

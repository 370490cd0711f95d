// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

use crate::{Axis, AxisEntry, ChartOptions, ChartType, PivotReport, format_number};

const CHART_HEIGHT_PX: usize = 360;
const PIE_WIDTH: &str = "800px";
const WIDE_WIDTH: &str = "96%";
const PIE_RADIUS: u32 = 125;
const BAR_WIDTH: f64 = 0.6;
const BREAKDOWN_BAR_WIDTH: f64 = 0.8;
const BREAKDOWN_LABEL_WIDTH: u32 = 120;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartFrame {
    pub width: String,
    pub height_px: usize,
}

impl ChartFrame {
    fn new(width: &str, height_px: usize) -> Self {
        Self {
            width: width.to_owned(),
            height_px,
        }
    }
}

/// A data point under the pointer, with the pointer's page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoverPoint {
    pub series_index: usize,
    pub data_index: usize,
    pub page_x: i32,
    pub page_y: i32,
}

impl HoverPoint {
    pub const fn new(series_index: usize, data_index: usize) -> Self {
        Self {
            series_index,
            data_index,
            page_x: 0,
            page_y: 0,
        }
    }

    pub const fn at(self, page_x: i32, page_y: i32) -> Self {
        Self {
            page_x,
            page_y,
            ..self
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tooltip {
    pub label: String,
    /// Breakdown tooltips put the series name here and the value in `value`.
    pub text: String,
    pub value: Option<String>,
    pub left: i32,
    pub top: i32,
}

impl Tooltip {
    fn new(label: String, text: String, value: Option<String>, point: HoverPoint) -> Self {
        Self {
            label,
            text,
            value,
            left: point.page_x + 10,
            top: point.page_y - 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieSlice {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieChart {
    pub title: String,
    pub frame: ChartFrame,
    pub radius: u32,
    pub slices: Vec<PieSlice>,
}

impl PieChart {
    pub fn from_axis(entries: &[AxisEntry], title: String) -> Self {
        Self {
            title,
            frame: ChartFrame::new(PIE_WIDTH, CHART_HEIGHT_PX),
            radius: PIE_RADIUS,
            slices: entries
                .iter()
                .map(|entry| PieSlice {
                    label: entry.label.clone(),
                    value: entry.subtotal,
                })
                .collect(),
        }
    }

    pub fn total(&self) -> f64 {
        self.slices.iter().map(|slice| slice.value).sum()
    }

    pub fn percent(&self, series_index: usize) -> Option<f64> {
        let slice = self.slices.get(series_index)?;
        let total = self.total();
        if total == 0.0 {
            return Some(0.0);
        }
        Some(slice.value / total * 100.0)
    }

    /// Each slice is a one-point series, so the hovered series' first value is the slice.
    pub fn tooltip(&self, point: HoverPoint) -> Option<Tooltip> {
        let slice = self.slices.get(point.series_index)?;
        let percent = self.percent(point.series_index)?;
        Some(Tooltip::new(
            slice.label.clone(),
            format!("{} ({:.1}%)", format_number(slice.value), percent),
            None,
            point,
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarPoint {
    pub x: usize,
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarChart {
    pub title: String,
    pub frame: ChartFrame,
    pub bar_width: f64,
    pub bars: Vec<BarPoint>,
    pub x_ticks: Vec<(usize, String)>,
    pub x_min: usize,
    pub x_max: usize,
}

impl BarChart {
    pub fn from_axis(entries: &[AxisEntry], title: String) -> Self {
        let bars = entries
            .iter()
            .enumerate()
            .map(|(index, entry)| BarPoint {
                x: index + 1,
                label: entry.label.clone(),
                value: entry.subtotal,
            })
            .collect::<Vec<_>>();
        let x_ticks = bars.iter().map(|bar| (bar.x, bar.label.clone())).collect();
        Self {
            title,
            frame: ChartFrame::new(WIDE_WIDTH, CHART_HEIGHT_PX),
            bar_width: BAR_WIDTH,
            x_max: bars.len() + 1,
            x_min: 0,
            bars,
            x_ticks,
        }
    }

    pub fn tooltip(&self, point: HoverPoint) -> Option<Tooltip> {
        let bar = self.bars.get(point.series_index)?;
        Some(Tooltip::new(
            bar.label.clone(),
            format_number(bar.value),
            None,
            point,
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownSeries {
    pub label: String,
    /// `(value, y)` pairs, one per group.
    pub points: Vec<(f64, usize)>,
}

/// Clustered horizontal bars: one band per group, one bar per series inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownChart {
    pub title: String,
    pub frame: ChartFrame,
    pub bar_width: f64,
    pub label_width: u32,
    pub groups: Vec<String>,
    pub series: Vec<BreakdownSeries>,
    pub y_ticks: Vec<(usize, String)>,
    pub y_max: usize,
    pub x_max: f64,
}

impl BreakdownChart {
    pub fn from_report(report: &PivotReport, axis: Axis, title: String) -> Self {
        let (groups, series_axis) = match axis {
            Axis::Rows => (&report.rows, &report.cols),
            Axis::Cols => (&report.cols, &report.rows),
        };
        let value_at = |group: usize, series: usize| {
            let (row, col) = match axis {
                Axis::Rows => (group, series),
                Axis::Cols => (series, group),
            };
            report.cell(row, col).map(|cell| cell.value).unwrap_or(0.0)
        };

        let group_count = groups.len();
        let series_count = series_axis.len();
        let mut x_max = 0.0_f64;
        let series = series_axis
            .iter()
            .enumerate()
            .map(|(series_index, entry)| {
                let points = (0..group_count)
                    .map(|group_index| {
                        let value = value_at(group_index, series_index);
                        if value > x_max {
                            x_max = value;
                        }
                        (
                            value,
                            breakdown_position(group_count, series_count, group_index, series_index),
                        )
                    })
                    .collect();
                BreakdownSeries {
                    label: entry.label.clone(),
                    points,
                }
            })
            .collect();

        let y_ticks = groups
            .iter()
            .enumerate()
            .map(|(group_index, entry)| {
                (
                    (group_count - group_index) * (series_count + 1) + 1,
                    entry.label.clone(),
                )
            })
            .collect();

        Self {
            title,
            frame: ChartFrame::new(WIDE_WIDTH, breakdown_height(group_count, series_count)),
            bar_width: BREAKDOWN_BAR_WIDTH,
            label_width: BREAKDOWN_LABEL_WIDTH,
            groups: groups.iter().map(|entry| entry.label.clone()).collect(),
            series,
            y_ticks,
            y_max: group_count * (series_count + 1) + 1,
            x_max: x_max * 1.1,
        }
    }

    pub fn tooltip(&self, point: HoverPoint) -> Option<Tooltip> {
        let group = self.groups.get(point.data_index)?;
        let series = self.series.get(point.series_index)?;
        let (value, _) = series.points.get(point.data_index)?;
        Some(Tooltip::new(
            group.clone(),
            series.label.clone(),
            Some(format_number(*value)),
            point,
        ))
    }
}

/// Vertical slot of a series bar inside its group band.
pub fn breakdown_position(
    group_count: usize,
    series_count: usize,
    group_index: usize,
    series_index: usize,
) -> usize {
    (group_count - group_index) * (series_count + 1) - series_index
}

/// Grows with content so bars keep roughly the same thickness.
pub fn breakdown_height(group_count: usize, series_count: usize) -> usize {
    (group_count * ((series_count + 1) * 16).max(50) + 70).max(CHART_HEIGHT_PX)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ChartSpec {
    Pie(PieChart),
    Bar(BarChart),
    Breakdown(BreakdownChart),
}

impl ChartSpec {
    pub fn build(report: &PivotReport, options: ChartOptions) -> Self {
        let labels = &report.labels;
        let title = format!(
            "{} {} {}",
            labels.layer,
            labels.per,
            labels.axis(options.axis)
        );
        let entries = report.axis(options.axis);
        match options.chart_type {
            ChartType::Piechart => Self::Pie(PieChart::from_axis(entries, title)),
            ChartType::Barchart => Self::Bar(BarChart::from_axis(entries, title)),
            ChartType::Breakdown => {
                Self::Breakdown(BreakdownChart::from_report(report, options.axis, title))
            }
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Pie(chart) => &chart.title,
            Self::Bar(chart) => &chart.title,
            Self::Breakdown(chart) => &chart.title,
        }
    }

    pub fn frame(&self) -> &ChartFrame {
        match self {
            Self::Pie(chart) => &chart.frame,
            Self::Bar(chart) => &chart.frame,
            Self::Breakdown(chart) => &chart.frame,
        }
    }

    pub fn tooltip(&self, point: HoverPoint) -> Option<Tooltip> {
        match self {
            Self::Pie(chart) => chart.tooltip(point),
            Self::Bar(chart) => chart.tooltip(point),
            Self::Breakdown(chart) => chart.tooltip(point),
        }
    }

    /// Identity of a hovered point; pie and bar points are identified by series alone.
    pub fn hover_key(&self, point: HoverPoint) -> (usize, Option<usize>) {
        match self {
            Self::Pie(_) | Self::Bar(_) => (point.series_index, None),
            Self::Breakdown(_) => (point.series_index, Some(point.data_index)),
        }
    }
}

// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Static HTML for a pivot table widget. Output is deterministic: the same widget
//! state always renders to the same bytes.

mod table;

use anyhow::{Context, Result};
use pivotview_app::{ChartSpec, ControlEntry, PivotTableWidget, ReportOptions, Tooltip};

pub use table::render_table;

/// Name of the hidden field carrying the embedded payload.
pub const PIVOTDATA_FIELD: &str = "pivotdata";
pub const EMPTY_TEXT: &str = "No data available";
const OPTIONS_LEGEND: &str = "Report Options";
const SUBMIT_LABEL: &str = "Update Report";

pub(crate) struct Html {
    buf: String,
}

impl Html {
    pub(crate) fn new() -> Self {
        Self {
            buf: String::with_capacity(8 * 1024),
        }
    }

    pub(crate) fn push<S: AsRef<str>>(&mut self, s: S) {
        self.buf.push_str(s.as_ref());
    }

    /// Pushes escaped text.
    pub(crate) fn text<S: AsRef<str>>(&mut self, s: S) {
        self.buf.push_str(&escape(s.as_ref()));
    }

    pub(crate) fn finish(self) -> String {
        self.buf
    }
}

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 8);
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

pub(crate) fn hidden_attr(hidden: bool) -> &'static str {
    if hidden { " hidden" } else { "" }
}

pub fn render_widget(widget: &PivotTableWidget) -> Result<String> {
    let id = widget.id().as_str();
    let state = widget.state();
    let mut w = Html::new();

    w.push(format!(r#"<div id="{}" class="pt-container">"#, escape(id)));
    w.push(format!(
        r#"<input type="hidden" name="{PIVOTDATA_FIELD}" value="{}">"#,
        escape(widget.embedded())
    ));

    render_options_form(&mut w, id, &widget.report_options(), state.options_collapsed);

    let table = widget.table();
    w.push(r#"<div class="pt-table">"#);
    if let Some(table) = &table {
        w.push(render_table(table));
    }
    w.push("</div>");
    w.push(format!(
        r#"<div class="pt-empty"{}>"#,
        hidden_attr(table.is_some())
    ));
    w.text(EMPTY_TEXT);
    w.push("</div>");

    render_chart_controls(&mut w, &widget.chart_controls());
    render_chart(&mut w, widget.chart())?;

    w.push(format!(
        r#"<div class="pt-throbber"{}></div>"#,
        hidden_attr(!state.loading)
    ));
    w.push("</div>");
    Ok(w.finish())
}

fn render_options_form(w: &mut Html, id: &str, options: &ReportOptions, collapsed: bool) {
    let id = escape(id);
    w.push(format!(r#"<fieldset id="{id}-options" class="pt-options">"#));
    w.push(format!(
        r#"<legend><span class="pt-form-toggle">{}</span>"#,
        if collapsed { "+" } else { "-" }
    ));
    w.text(OPTIONS_LEGEND);
    w.push("</legend>");
    w.push(format!(r#"<div class="pt-form"{}>"#, hidden_attr(collapsed)));

    for (name, label, value) in [
        ("rows", "Rows", &options.rows),
        ("cols", "Columns", &options.cols),
        ("fact", "Value", &options.fact),
    ] {
        w.push(format!(
            r#"<label for="{id}-{name}">{label}</label><input type="text" id="{id}-{name}" name="{name}" value="{}">"#,
            escape(value.as_deref().unwrap_or_default())
        ));
    }
    w.push(format!(
        r#"<label for="{id}-totals">Totals</label><input type="checkbox" id="{id}-totals" name="totals" value="1"{}>"#,
        if options.totals { " checked" } else { "" }
    ));
    w.push(format!(
        r#"<input type="button" class="pt-submit" value="{SUBMIT_LABEL}">"#
    ));
    w.push("</div></fieldset>");
}

fn render_chart_controls(w: &mut Html, entries: &[ControlEntry]) {
    w.push(r#"<div class="pt-chart-controls">"#);
    if !entries.is_empty() {
        w.push(r#"<div class="pt-chart-opts">"#);
        for entry in entries {
            match entry {
                ControlEntry::Icon(icon) => w.push(format!(
                    r#"<div id="{}" class="pt-chart-icon {}" data-type="{}" data-axis="{}"></div>"#,
                    escape(&icon.element_id),
                    icon.css_class(),
                    icon.chart.chart_type.as_str(),
                    icon.chart.axis.as_str(),
                )),
                ControlEntry::Label(label) => {
                    w.push(r#"<span class="pt-chart-label">"#);
                    w.text(label);
                    w.push("</span>");
                }
            }
        }
        w.push("</div>");
    }
    w.push("</div>");
}

fn render_chart(w: &mut Html, chart: Option<&ChartSpec>) -> Result<()> {
    w.push(format!(
        r#"<div class="pt-chart-contents"{}>"#,
        hidden_attr(chart.is_none())
    ));
    w.push(r#"<div class="pt-hide-chart" title="Hide chart"></div>"#);
    match chart {
        Some(chart) => {
            let spec = serde_json::to_string(chart).context("encode chart spec")?;
            let frame = chart.frame();
            w.push(r#"<div class="pt-chart-title"><h4>"#);
            w.text(chart.title());
            w.push("</h4></div>");
            w.push(format!(
                r#"<div class="pt-chart" style="width:{};height:{}px" data-chart="{}"></div>"#,
                escape(&frame.width),
                frame.height_px,
                escape(&spec)
            ));
        }
        None => {
            w.push(r#"<div class="pt-chart-title"></div>"#);
            w.push(r#"<div class="pt-chart"></div>"#);
        }
    }
    w.push("</div>");
    Ok(())
}

/// Absolutely positioned hover box for one chart point.
pub fn render_tooltip(tooltip: &Tooltip) -> String {
    let mut w = Html::new();
    w.push(format!(
        r#"<div class="pt-chart-tooltip" style="position:absolute;top:{}px;left:{}px">"#,
        tooltip.top, tooltip.left
    ));
    w.push(r#"<div class="pt-tooltip-label">"#);
    w.text(&tooltip.label);
    w.push(r#"</div><div class="pt-tooltip-text">"#);
    w.text(&tooltip.text);
    if let Some(value) = &tooltip.value {
        w.push(r#" : <span class="pt-tooltip-value">"#);
        w.text(value);
        w.push("</span>");
    }
    w.push("</div></div>");
    w.finish()
}

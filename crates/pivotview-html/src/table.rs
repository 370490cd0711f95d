// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use pivotview_app::{BodyRow, CellContent, FooterRow, TableCell, TableLayout, Zoom};

use crate::{Html, escape};

pub fn render_table(table: &TableLayout) -> String {
    let mut w = Html::new();
    w.push(r#"<table class="dataTable display report">"#);
    render_head(&mut w, table);

    w.push("<tbody>");
    for row in &table.body {
        render_row(&mut w, row);
    }
    w.push("</tbody>");

    if let Some(footer) = &table.footer {
        render_footer(&mut w, footer);
    }
    w.push("</table>");
    w.finish()
}

fn render_head(w: &mut Html, table: &TableLayout) {
    let header = &table.header;
    w.push("<thead><tr>");
    w.push(r#"<th scope="col">"#);
    w.text(&header.layer_label);
    w.push(format!(r#"</th><th scope="col" colspan="{}">"#, header.colspan));
    w.text(&header.cols_label);
    w.push("</th>");
    if let Some(label) = &header.totals_label {
        w.push(r#"<th class="totals_header row_totals" scope="col" rowspan="2">"#);
        w.text(label);
        w.push("</th>");
    }
    w.push("</tr><tr>");
    w.push(r#"<th scope="col">"#);
    w.text(&table.rows_label);
    w.push("</th>");
    for column in &table.columns {
        w.push(r#"<th scope="col">"#);
        w.text(column);
        w.push("</th>");
    }
    w.push("</tr></thead>");
}

fn render_row(w: &mut Html, row: &BodyRow) {
    w.push(format!(r#"<tr class="{}"><td>"#, row.parity.as_str()));
    w.text(&row.label);
    w.push("</td>");
    for cell in &row.cells {
        render_cell(w, cell);
    }
    if let Some(total) = &row.total {
        w.push("<td>");
        w.text(total);
        w.push("</td>");
    }
    w.push("</tr>");
}

fn render_cell(w: &mut Html, cell: &TableCell) {
    if cell.zoom.is_some() {
        let keys = cell
            .records
            .iter()
            .map(|key| key.as_str())
            .collect::<Vec<_>>();
        let records = serde_json::to_string(&keys).unwrap_or_else(|_| "[]".to_owned());
        w.push(format!(
            r#"<td data-row="{}" data-col="{}" data-records="{}">"#,
            cell.at.row,
            cell.at.col,
            escape(&records)
        ));
    } else {
        w.push("<td>");
    }

    w.push(r#"<div class="pt-cell-value">"#);
    match &cell.content {
        CellContent::Placeholder(none) => w.text(none),
        CellContent::Text(text) => w.text(text),
        CellContent::List(items) => render_list(w, items),
    }
    w.push("</div>");

    match &cell.zoom {
        None => {}
        Some(Zoom::Closed) => w.push(r#"<div class="pt-cell-zoom"></div>"#),
        Some(Zoom::Open(records)) => {
            w.push(r#"<div class="pt-cell-zoom opened"></div>"#);
            w.push(r#"<div class="pt-cell-records">"#);
            render_list(w, records);
            w.push("</div>");
        }
    }
    w.push("</td>");
}

fn render_list(w: &mut Html, items: &[String]) {
    w.push("<ul>");
    for item in items {
        w.push("<li>");
        w.text(item);
        w.push("</li>");
    }
    w.push("</ul>");
}

fn render_footer(w: &mut Html, footer: &FooterRow) {
    w.push(format!(
        r#"<tfoot><tr class="{} totals_row"><th class="totals_header" scope="row">"#,
        footer.parity.as_str()
    ));
    w.text(&footer.label);
    w.push("</th>");
    for total in &footer.column_totals {
        w.push("<td>");
        w.text(total);
        w.push("</td>");
    }
    w.push("<td>");
    w.text(&footer.grand_total);
    w.push("</td></tr></tfoot>");
}

// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::Serialize;
use std::collections::BTreeSet;

use crate::{Cell, CellItems, CellRef, PivotReport, RecordKey, format_number, value_text};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Parity {
    Even,
    Odd,
}

impl Parity {
    pub const fn of(index: usize) -> Self {
        if index % 2 == 1 { Self::Odd } else { Self::Even }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Even => "even",
            Self::Odd => "odd",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CellContent {
    /// No data; shows the `none` label.
    Placeholder(String),
    Text(String),
    List(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Zoom {
    Closed,
    Open(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableCell {
    pub at: CellRef,
    pub content: CellContent,
    /// `None` when the cell cannot be drilled into.
    pub zoom: Option<Zoom>,
    pub records: Vec<RecordKey>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableHeader {
    pub layer_label: String,
    pub cols_label: String,
    pub colspan: usize,
    pub totals_label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BodyRow {
    pub index: usize,
    pub parity: Parity,
    pub label: String,
    pub cells: Vec<TableCell>,
    pub total: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FooterRow {
    pub parity: Parity,
    pub label: String,
    pub column_totals: Vec<String>,
    pub grand_total: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableLayout {
    pub header: TableHeader,
    pub rows_label: String,
    pub columns: Vec<String>,
    pub body: Vec<BodyRow>,
    pub footer: Option<FooterRow>,
}

impl TableLayout {
    pub fn build(report: &PivotReport, show_totals: bool, open_zooms: &BTreeSet<CellRef>) -> Self {
        let labels = &report.labels;
        let display_columns = report.display_columns();

        let colspan = match report.cols.last() {
            Some(last) if last.is_other() => report.cols.len() - 1,
            _ => report.cols.len(),
        };

        let header = TableHeader {
            layer_label: labels.layer.clone(),
            cols_label: labels.cols.clone(),
            colspan,
            totals_label: show_totals.then(|| labels.total.clone()),
        };

        let columns = display_columns
            .iter()
            .filter_map(|index| report.cols.get(*index))
            .map(|col| col.label.clone())
            .collect();

        let body = report
            .cells
            .iter()
            .enumerate()
            .filter_map(|(index, cells)| {
                let entry = report.rows.get(index).filter(|entry| !entry.is_other())?;
                Some(BodyRow {
                    index,
                    parity: Parity::of(index),
                    label: entry.label.clone(),
                    cells: display_columns
                        .iter()
                        .filter_map(|col| {
                            let at = CellRef::new(index, *col);
                            let cell = cells.get(*col)?;
                            Some(table_cell(report, cell, at, open_zooms.contains(&at)))
                        })
                        .collect(),
                    total: show_totals.then(|| format_number(entry.subtotal)),
                })
            })
            .collect();

        let footer = show_totals.then(|| FooterRow {
            parity: Parity::of(report.rows.len()),
            label: labels.total.clone(),
            column_totals: display_columns
                .iter()
                .filter_map(|index| report.cols.get(*index))
                .map(|col| format_number(col.subtotal))
                .collect(),
            grand_total: format_number(report.total),
        });

        Self {
            header,
            rows_label: labels.rows.clone(),
            columns,
            body,
            footer,
        }
    }

    pub fn cell(&self, at: CellRef) -> Option<&TableCell> {
        self.body
            .iter()
            .find(|row| row.index == at.row)
            .and_then(|row| row.cells.iter().find(|cell| cell.at == at))
    }
}

fn table_cell(report: &PivotReport, cell: &Cell, at: CellRef, open: bool) -> TableCell {
    let content = match &cell.items {
        CellItems::Null => CellContent::Placeholder(report.labels.none.clone()),
        CellItems::List(items) => CellContent::List(items.iter().map(value_text).collect()),
        CellItems::Scalar(value) => CellContent::Text(value_text(value)),
    };

    let zoom = cell.is_zoomable().then(|| {
        if open {
            Zoom::Open(
                cell.keys
                    .iter()
                    .map(|key| report.record_label(key))
                    .collect(),
            )
        } else {
            Zoom::Closed
        }
    });

    TableCell {
        at,
        content,
        zoom,
        records: cell.keys.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::{CellContent, Parity, TableLayout, Zoom};
    use crate::{AxisEntry, Cell, CellRef, PivotData, PivotReport};
    use pivotview_testkit::{sales_by_region_and_quarter, sales_with_other_bucket};
    use std::collections::BTreeSet;

    fn parse(raw: String) -> PivotReport {
        match PivotData::parse(Some(&raw)) {
            PivotData::Report(report) => report,
            PivotData::Empty => panic!("fixture should parse"),
        }
    }

    #[test]
    fn layout_matches_axis_lengths() {
        let report = parse(sales_by_region_and_quarter());
        let table = TableLayout::build(&report, true, &BTreeSet::new());

        assert_eq!(table.header.colspan, report.cols.len());
        assert_eq!(table.columns.len(), report.cols.len());
        assert_eq!(table.body.len(), report.rows.len());
        assert!(table.body.iter().all(|row| row.cells.len() == report.cols.len()));
        assert_eq!(table.body[1].parity, Parity::Odd);
        assert_eq!(table.body[0].total.as_deref(), Some("24"));

        let footer = table.footer.expect("totals footer");
        assert_eq!(footer.column_totals, vec!["36", "19"]);
        assert_eq!(footer.grand_total, "55");
        assert_eq!(footer.parity, Parity::of(report.rows.len()));
    }

    #[test]
    fn other_bucket_gets_no_column_or_row() {
        let report = parse(sales_with_other_bucket());
        let table = TableLayout::build(&report, true, &BTreeSet::new());

        assert_eq!(table.header.colspan, report.cols.len() - 1);
        assert_eq!(table.columns.len(), report.cols.len() - 1);
        assert_eq!(table.body.len(), report.rows.len() - 1);
        assert!(
            table
                .body
                .iter()
                .all(|row| row.cells.len() == report.cols.len() - 1)
        );
        assert_eq!(
            table.footer.map(|footer| footer.column_totals.len()),
            Some(report.cols.len() - 1)
        );
    }

    #[test]
    fn disabling_totals_removes_exactly_the_totals_parts() {
        let report = parse(sales_by_region_and_quarter());
        let with = TableLayout::build(&report, true, &BTreeSet::new());
        let without = TableLayout::build(&report, false, &BTreeSet::new());

        assert!(with.header.totals_label.is_some());
        assert!(without.header.totals_label.is_none());
        assert!(without.footer.is_none());
        assert!(without.body.iter().all(|row| row.total.is_none()));
        assert_eq!(with.columns, without.columns);
        assert_eq!(
            with.body.iter().map(|row| &row.cells).collect::<Vec<_>>(),
            without.body.iter().map(|row| &row.cells).collect::<Vec<_>>()
        );
    }

    #[test]
    fn cells_render_placeholder_text_and_zoom_state() {
        let report = parse(sales_by_region_and_quarter());
        let open = BTreeSet::from([CellRef::new(0, 0)]);
        let table = TableLayout::build(&report, false, &open);

        let empty = table.cell(CellRef::new(2, 1)).expect("cell exists");
        assert_eq!(empty.content, CellContent::Placeholder("-".to_owned()));
        assert_eq!(empty.zoom, None);

        let opened = table.cell(CellRef::new(0, 0)).expect("cell exists");
        assert_eq!(opened.content, CellContent::Text("10".to_owned()));
        match &opened.zoom {
            Some(Zoom::Open(records)) => assert_eq!(records.len(), 3),
            other => panic!("expected open zoom, got {other:?}"),
        }

        let closed = table.cell(CellRef::new(1, 0)).expect("cell exists");
        assert_eq!(closed.zoom, Some(Zoom::Closed));
    }

    #[test]
    fn ragged_reports_build_without_panicking() {
        let report = PivotReport {
            rows: vec![AxisEntry::new("a", "A", 1.0)],
            cols: vec![AxisEntry::new("x", "X", 1.0), AxisEntry::new("y", "Y", 0.0)],
            cells: vec![vec![Cell::default()], vec![Cell::default(), Cell::default()]],
            ..PivotReport::default()
        };
        assert!(report.check_shape().is_err());

        let table = TableLayout::build(&report, true, &BTreeSet::new());
        assert_eq!(table.columns, vec!["X", "Y"]);
        assert_eq!(table.body.len(), 1);
        assert_eq!(table.body[0].cells.len(), 1);
    }
}

// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Axis key the server uses for the aggregated long-tail bucket.
pub const OTHER_KEY: &str = "__other__";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Rows,
    Cols,
}

impl Axis {
    pub const ALL: [Self; 2] = [Self::Rows, Self::Cols];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rows => "rows",
            Self::Cols => "cols",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "rows" => Some(Self::Rows),
            "cols" => Some(Self::Cols),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Piechart,
    Barchart,
    Breakdown,
}

impl ChartType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Piechart => "piechart",
            Self::Barchart => "barchart",
            Self::Breakdown => "breakdown",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "piechart" => Some(Self::Piechart),
            "barchart" => Some(Self::Barchart),
            "breakdown" => Some(Self::Breakdown),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChartOptions {
    #[serde(rename = "type")]
    pub chart_type: ChartType,
    pub axis: Axis,
}

impl ChartOptions {
    pub const fn new(chart_type: ChartType, axis: Axis) -> Self {
        Self { chart_type, axis }
    }
}

/// One bucket of an axis: `[key, raw value, display label, subtotal]` on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisEntry {
    pub key: Value,
    pub raw: Value,
    pub label: String,
    pub subtotal: f64,
}

impl AxisEntry {
    pub fn new(key: impl Into<Value>, label: impl Into<String>, subtotal: f64) -> Self {
        let key = key.into();
        Self {
            raw: key.clone(),
            key,
            label: label.into(),
            subtotal,
        }
    }

    pub fn other(label: impl Into<String>, subtotal: f64) -> Self {
        Self::new(OTHER_KEY, label, subtotal)
    }

    pub fn is_other(&self) -> bool {
        self.key.as_str() == Some(OTHER_KEY)
    }
}

impl<'de> Deserialize<'de> for AxisEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (key, raw, label, subtotal): (Value, Value, Value, Value) =
            Deserialize::deserialize(deserializer)?;
        Ok(Self {
            key,
            raw,
            label: value_text(&label),
            subtotal: value_number(&subtotal),
        })
    }
}

impl Serialize for AxisEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (&self.key, &self.raw, &self.label, self.subtotal).serialize(serializer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordKey(String);

impl RecordKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for RecordKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self(value_text(&value)))
    }
}

impl Serialize for RecordKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellItems {
    #[default]
    Null,
    Scalar(Value),
    List(Vec<Value>),
}

impl CellItems {
    /// Truthiness as the page script sees it: `0`, `""`, `false` and `null` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Scalar(value) => match value {
                Value::Null => false,
                Value::Bool(flag) => *flag,
                Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
                Value::String(text) => !text.is_empty(),
                Value::Array(_) | Value::Object(_) => true,
            },
            Self::List(_) => true,
        }
    }
}

impl<'de> Deserialize<'de> for CellItems {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Null => Self::Null,
            Value::Array(values) => Self::List(values),
            other => Self::Scalar(other),
        })
    }
}

impl Serialize for CellItems {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Scalar(value) => value.serialize(serializer),
            Self::List(values) => values.serialize(serializer),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Cell {
    #[serde(default)]
    pub items: CellItems,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub keys: Vec<RecordKey>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub value: f64,
}

impl Cell {
    pub fn is_zoomable(&self) -> bool {
        self.items.is_truthy() && !self.keys.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LabelSet {
    #[serde(default, deserialize_with = "lenient_text")]
    pub layer: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub rows: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub cols: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub total: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub none: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub per: String,
}

impl LabelSet {
    pub fn axis(&self, axis: Axis) -> &str {
        match axis {
            Axis::Rows => &self.rows,
            Axis::Cols => &self.cols,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PivotReport {
    pub cells: Vec<Vec<Cell>>,
    pub rows: Vec<AxisEntry>,
    pub cols: Vec<AxisEntry>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub total: f64,
    #[serde(default)]
    pub labels: LabelSet,
    #[serde(default, deserialize_with = "lenient_lookup")]
    pub lookup: BTreeMap<String, String>,
}

impl PivotReport {
    pub fn axis(&self, axis: Axis) -> &[AxisEntry] {
        match axis {
            Axis::Rows => &self.rows,
            Axis::Cols => &self.cols,
        }
    }

    pub fn check_shape(&self) -> Result<()> {
        if self.cells.len() != self.rows.len() {
            bail!(
                "pivot matrix has {} rows but the row axis has {} entries",
                self.cells.len(),
                self.rows.len()
            );
        }
        for (index, row) in self.cells.iter().enumerate() {
            if row.len() != self.cols.len() {
                bail!(
                    "pivot matrix row {} has {} cells but the column axis has {} entries",
                    index,
                    row.len(),
                    self.cols.len()
                );
            }
        }
        Ok(())
    }

    /// Indices of columns that get their own display column.
    pub fn display_columns(&self) -> Vec<usize> {
        self.cols
            .iter()
            .enumerate()
            .filter(|(_, col)| !col.is_other())
            .map(|(index, _)| index)
            .collect()
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.cells.get(row).and_then(|cells| cells.get(col))
    }

    /// Display label for a record key; unknown keys show the key itself.
    pub fn record_label(&self, key: &RecordKey) -> String {
        self.lookup
            .get(key.as_str())
            .cloned()
            .unwrap_or_else(|| key.as_str().to_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum PivotData {
    #[default]
    Empty,
    Report(PivotReport),
}

impl PivotData {
    /// Reads an embedded payload. Anything that is not a well-formed report is empty data.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
            return Self::Empty;
        };

        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(error) => {
                log::warn!("embedded pivot data is not valid JSON: {error}");
                return Self::Empty;
            }
        };

        match &value {
            Value::Object(map) => {
                if map.get("empty").is_some_and(json_truthy) {
                    return Self::Empty;
                }
            }
            _ => return Self::Empty,
        }

        let report: PivotReport = match serde_json::from_value(value) {
            Ok(report) => report,
            Err(error) => {
                log::warn!("embedded pivot data does not describe a report: {error}");
                return Self::Empty;
            }
        };

        if let Err(error) = report.check_shape() {
            log::warn!("ignoring pivot data: {error:#}");
            return Self::Empty;
        }

        Self::Report(report)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn report(&self) -> Option<&PivotReport> {
        match self {
            Self::Empty => None,
            Self::Report(report) => Some(report),
        }
    }
}

/// Formats a number the way the page prints it: no trailing `.0` on integral values.
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Number(number) => number
            .as_f64()
            .map(format_number)
            .unwrap_or_else(|| number.to_string()),
        other => other.to_string(),
    }
}

pub fn value_number(value: &Value) -> f64 {
    match value {
        Value::Number(number) => number.as_f64().unwrap_or(0.0),
        Value::String(text) => text.trim().parse().unwrap_or(0.0),
        Value::Bool(flag) => f64::from(u8::from(*flag)),
        _ => 0.0,
    }
}

fn json_truthy(value: &Value) -> bool {
    CellItems::Scalar(value.clone()).is_truthy()
}

fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(value_number(&Value::deserialize(deserializer)?))
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(value_text(&Value::deserialize(deserializer)?))
}

fn lenient_lookup<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeMap<String, String>, D::Error> {
    let raw: Option<BTreeMap<String, Value>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(key, value)| (key, value_text(&value)))
        .collect())
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

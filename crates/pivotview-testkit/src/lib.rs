// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use serde_json::{Value, json};
use std::path::PathBuf;

const REGIONS: [&str; 10] = [
    "North",
    "South",
    "East",
    "West",
    "Central",
    "Coastal",
    "Highlands",
    "Lowlands",
    "Metro",
    "Rural",
];

const PRODUCTS: [&str; 8] = [
    "Blankets",
    "Buckets",
    "Generators",
    "Hygiene kits",
    "Jerrycans",
    "Mosquito nets",
    "Tarpaulins",
    "Tents",
];

fn axis_entry(key: &str, label: &str, subtotal: f64) -> Value {
    json!([key, key, label, subtotal])
}

fn cell(value: f64, keys: &[u32]) -> Value {
    if keys.is_empty() {
        return json!({ "items": null, "keys": null, "value": 0 });
    }
    json!({ "items": value, "keys": keys, "value": value })
}

fn labels(layer: &str, rows: &str, cols: &str) -> Value {
    json!({
        "layer": layer,
        "rows": rows,
        "cols": cols,
        "total": "Total",
        "none": "-",
        "per": "per",
    })
}

fn order_lookup(ids: impl IntoIterator<Item = u32>) -> Value {
    let map = ids
        .into_iter()
        .map(|id| (id.to_string(), Value::from(format!("Order #{id}"))))
        .collect::<serde_json::Map<_, _>>();
    Value::Object(map)
}

/// Three regions by two quarters. East has no Q2 data; North/Q1 holds three orders.
pub fn sales_by_region_and_quarter() -> String {
    json!({
        "labels": labels("Sales", "Region", "Quarter"),
        "rows": [
            axis_entry("north", "North", 24.0),
            axis_entry("south", "South", 25.0),
            axis_entry("east", "East", 6.0),
        ],
        "cols": [
            axis_entry("q1", "Q1", 36.0),
            axis_entry("q2", "Q2", 19.0),
        ],
        "cells": [
            [cell(10.0, &[1001, 1002, 1003]), cell(14.0, &[1004])],
            [cell(20.0, &[1005, 1006]), cell(5.0, &[1007])],
            [cell(6.0, &[1008]), cell(0.0, &[])],
        ],
        "total": 55,
        "lookup": order_lookup(1001..=1008),
    })
    .to_string()
}

/// Same report with an aggregated long-tail row and column appended.
pub fn sales_with_other_bucket() -> String {
    json!({
        "labels": labels("Sales", "Region", "Quarter"),
        "rows": [
            axis_entry("north", "North", 25.0),
            axis_entry("south", "South", 25.0),
            axis_entry("east", "East", 6.0),
            axis_entry("__other__", "Other regions", 4.0),
        ],
        "cols": [
            axis_entry("q1", "Q1", 38.0),
            axis_entry("q2", "Q2", 19.0),
            axis_entry("__other__", "Other quarters", 3.0),
        ],
        "cells": [
            [cell(10.0, &[1001, 1002, 1003]), cell(14.0, &[1004]), cell(1.0, &[1009])],
            [cell(20.0, &[1005, 1006]), cell(5.0, &[1007]), cell(0.0, &[])],
            [cell(6.0, &[1008]), cell(0.0, &[]), cell(0.0, &[])],
            [cell(2.0, &[1010]), cell(0.0, &[]), cell(2.0, &[1011])],
        ],
        "total": 60,
        "lookup": order_lookup(1001..=1011),
    })
    .to_string()
}

/// What the server sends when the filters match nothing.
pub fn empty_payload() -> String {
    json!({ "empty": true }).to_string()
}

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }
}

/// Seeded generator for larger pivot payloads with consistent subtotals.
#[derive(Debug, Clone)]
pub struct ReportFaker {
    rng: DeterministicRng,
    next_record: u32,
}

impl ReportFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            next_record: 1,
        }
    }

    /// A `rows x cols` report of distributed items per region and product. Roughly
    /// one cell in five is empty.
    pub fn report(&mut self, rows: usize, cols: usize) -> String {
        let rows = rows.min(REGIONS.len());
        let cols = cols.min(PRODUCTS.len());

        let mut cells = Vec::with_capacity(rows);
        let mut row_totals = vec![0.0; rows];
        let mut col_totals = vec![0.0; cols];
        let mut lookup = Vec::new();

        for row_total in &mut row_totals {
            let mut line = Vec::with_capacity(cols);
            for col_total in &mut col_totals {
                if self.rng.int_n(5) == 0 {
                    line.push(cell(0.0, &[]));
                    continue;
                }
                let records = 1 + self.rng.int_n(3);
                let keys = (0..records).map(|_| self.record_id()).collect::<Vec<_>>();
                let value = (1 + self.rng.int_n(50)) as f64;
                *row_total += value;
                *col_total += value;
                lookup.extend(keys.iter().copied());
                line.push(cell(value, &keys));
            }
            cells.push(line);
        }

        let total: f64 = row_totals.iter().sum();
        json!({
            "labels": labels("Items", "Region", "Product"),
            "rows": REGIONS[..rows]
                .iter()
                .zip(&row_totals)
                .map(|(name, subtotal)| axis_entry(&name.to_lowercase(), name, *subtotal))
                .collect::<Vec<_>>(),
            "cols": PRODUCTS[..cols]
                .iter()
                .zip(&col_totals)
                .map(|(name, subtotal)| axis_entry(&name.to_lowercase(), name, *subtotal))
                .collect::<Vec<_>>(),
            "cells": cells,
            "total": total,
            "lookup": order_lookup(lookup),
        })
        .to_string()
    }

    fn record_id(&mut self) -> u32 {
        let id = self.next_record;
        self.next_record += 1;
        id
    }
}

/// Scratch directory plus a config path inside it that does not exist yet.
pub fn temp_config_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let path = dir.path().join("config.toml");
    Ok((dir, path))
}

pub fn region_names() -> &'static [&'static str] {
    &REGIONS
}

pub fn product_names() -> &'static [&'static str] {
    &PRODUCTS
}

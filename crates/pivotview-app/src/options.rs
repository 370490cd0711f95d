// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Ordered `(key, value)` pairs. A `None` or empty value is falsy and clears the key.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueryParams(Vec<(String, Option<String>)>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: Option<&str>) -> Self {
        self.push(key, value.map(str::to_owned));
        self
    }

    /// Later pushes of the same key replace the earlier value in place.
    pub fn push(&mut self, key: impl Into<String>, value: Option<String>) {
        let key = key.into();
        let value = value.filter(|value| !value.is_empty());
        match self.0.iter_mut().find(|(existing, _)| *existing == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<Option<&str>> {
        self.0
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_deref())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.0
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Option<String>)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, Option<String>)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (key, value) in iter {
            params.push(key, value);
        }
        params
    }
}

/// Report layout chosen in the options form.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReportOptions {
    pub rows: Option<String>,
    pub cols: Option<String>,
    pub fact: Option<String>,
    pub totals: bool,
}

impl ReportOptions {
    pub fn to_params(&self) -> QueryParams {
        QueryParams::new()
            .with("rows", self.rows.as_deref())
            .with("cols", self.cols.as_deref())
            .with("fact", self.fact.as_deref())
            .with("totals", self.totals.then_some("1"))
    }

    pub fn totals_only(show: bool) -> QueryParams {
        QueryParams::new().with("totals", show.then_some("1"))
    }
}

/// Flat filter map built from `key=value` filter expressions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterOptions(QueryParams);

impl FilterOptions {
    pub fn from_expressions<I, S>(expressions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut params = QueryParams::new();
        for expression in expressions {
            let Some((key, value)) = expression.as_ref().split_once('=') else {
                continue;
            };
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            params.push(key, Some(value.trim().to_owned()));
        }
        Self(params)
    }

    /// Asks the filter form for its current expressions. No form means no filters; a
    /// failing form is treated as an empty filter set.
    pub fn extract<F>(source: Option<F>) -> Option<Self>
    where
        F: FnOnce() -> Result<Vec<String>>,
    {
        let source = source?;
        match source() {
            Ok(expressions) => Some(Self::from_expressions(expressions)),
            Err(error) => {
                log::warn!("could not read current filters: {error:#}");
                Some(Self::default())
            }
        }
    }

    pub fn params(&self) -> &QueryParams {
        &self.0
    }

    pub fn into_params(self) -> QueryParams {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::{FilterOptions, QueryParams, ReportOptions};
    use anyhow::{Result, anyhow};

    #[test]
    fn report_options_emit_params_in_form_order() {
        let options = ReportOptions {
            rows: Some("region".to_owned()),
            cols: None,
            fact: Some("count(id)".to_owned()),
            totals: false,
        };
        let params = options.to_params();
        let keys = params.iter().map(|(key, _)| key).collect::<Vec<_>>();
        assert_eq!(keys, vec!["rows", "cols", "fact", "totals"]);
        assert_eq!(params.get("cols"), Some(None));
        assert_eq!(params.get("totals"), Some(None));
        assert_eq!(params.get("rows"), Some(Some("region")));
    }

    #[test]
    fn push_normalizes_empty_values_and_replaces_duplicates() {
        let mut params = QueryParams::new();
        params.push("x", Some(String::new()));
        params.push("x", Some("2".to_owned()));
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("x"), Some(Some("2")));
        assert_eq!(params.get("y"), None);
    }

    #[test]
    fn filter_expressions_split_on_first_equals() {
        let filters =
            FilterOptions::from_expressions(["status=open", "bogus", "name=a=b", "site.id="]);
        let params = filters.params();
        assert_eq!(params.get("status"), Some(Some("open")));
        assert_eq!(params.get("name"), Some(Some("a=b")));
        assert_eq!(params.get("site.id"), Some(None));
        assert!(!params.contains_key("bogus"));
    }

    #[test]
    fn filter_extraction_degrades_on_missing_or_failing_source() {
        let missing: Option<fn() -> Result<Vec<String>>> = None;
        assert_eq!(FilterOptions::extract(missing), None);

        let failing = FilterOptions::extract(Some(|| -> Result<Vec<String>> {
            Err(anyhow!("filter form exploded"))
        }));
        assert_eq!(failing, Some(FilterOptions::default()));

        let working = FilterOptions::extract(Some(|| -> Result<Vec<String>> {
            Ok(vec!["x=2".to_owned()])
        }))
        .expect("filters should be extracted");
        assert_eq!(working.params().get("x"), Some(Some("2")));
    }
}

// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use url::form_urlencoded;

use crate::QueryParams;

/// Dropped from every rebuilt URL.
// TODO: confirm with the report server owners whether `aggregate` can be sent again.
pub const AGGREGATE_PARAM: &str = "aggregate";
/// Applied to the local totals flag instead of the URL.
pub const TOTALS_PARAM: &str = "totals";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryMerge {
    pub url: String,
    pub needs_reload: bool,
    pub show_totals: Option<bool>,
}

/// Decoded query string with stable key order; a repeated key keeps its first position
/// and its last value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedQuery {
    pairs: Vec<(String, String)>,
}

impl ParsedQuery {
    /// Pairs without `=` are dropped.
    pub fn parse(query: &str) -> Self {
        let mut parsed = Self::default();
        for pair in query.split('&').filter(|pair| pair.contains('=')) {
            for (key, value) in form_urlencoded::parse(pair.as_bytes()) {
                parsed.set(&key, Some(value.into_owned()));
            }
        }
        parsed
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn set(&mut self, key: &str, value: Option<String>) {
        match value {
            Some(value) => match self.pairs.iter_mut().find(|(existing, _)| existing == key) {
                Some(slot) => slot.1 = value,
                None => self.pairs.push((key.to_owned(), value)),
            },
            None => self.pairs.retain(|(existing, _)| existing != key),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|(key, _)| key.as_str())
    }

    pub fn encode(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs.iter())
            .finish()
    }
}

/// Splits `base?query`; the query part is empty when there is none.
pub fn split_url(url: &str) -> (&str, &str) {
    url.split_once('?').unwrap_or((url, ""))
}

pub fn strip_aggregate(mut query: ParsedQuery) -> ParsedQuery {
    query.set(AGGREGATE_PARAM, None);
    query
}

/// The totals option, if present, as a local render flag.
pub fn intercept_totals(options: &QueryParams) -> Option<bool> {
    options
        .get(TOTALS_PARAM)
        .map(|value| value.is_some_and(|value| value != "0"))
}

/// Writes one merged value. Returns whether the value differs from the current one;
/// a falsy value removes the key.
pub fn apply_param(query: &mut ParsedQuery, key: &str, value: Option<&str>) -> bool {
    let value = value.filter(|value| !value.is_empty());
    let changed = query.get(key) != value;
    query.set(key, value.map(str::to_owned));
    changed
}

pub fn merge_query(
    base_url: &str,
    options: Option<&QueryParams>,
    filters: Option<&QueryParams>,
) -> QueryMerge {
    let (base, raw_query) = split_url(base_url);
    let mut query = strip_aggregate(ParsedQuery::parse(raw_query));
    let mut needs_reload = false;
    let mut show_totals = None;

    if let Some(options) = options {
        show_totals = intercept_totals(options);
        if show_totals.is_some() {
            query.set(TOTALS_PARAM, None);
        }
        for (key, value) in options.iter() {
            if key == TOTALS_PARAM {
                continue;
            }
            needs_reload |= apply_param(&mut query, key, value);
        }
    }

    if let Some(filters) = filters {
        for (key, value) in filters.iter() {
            needs_reload |= apply_param(&mut query, key, value);
        }
    }

    let encoded = query.encode();
    let url = if encoded.is_empty() {
        base.to_owned()
    } else {
        format!("{base}?{encoded}")
    };

    QueryMerge {
        url,
        needs_reload,
        show_totals,
    }
}

#[cfg(test)]
mod tests {
    use super::{ParsedQuery, apply_param, intercept_totals, merge_query, strip_aggregate};
    use crate::{QueryParams, ReportOptions};

    #[test]
    fn merge_strips_aggregate_consumes_totals_and_flags_changed_filter() {
        let options = ReportOptions::totals_only(false);
        let filters = QueryParams::new().with("x", Some("2"));

        let merged = merge_query(
            "/report/pivot.json?mode=report&aggregate=sum&x=1",
            Some(&options),
            Some(&filters),
        );

        assert_eq!(merged.url, "/report/pivot.json?mode=report&x=2");
        assert!(merged.needs_reload);
        assert_eq!(merged.show_totals, Some(false));
    }

    #[test]
    fn identical_values_do_not_need_reload() {
        let options = QueryParams::new()
            .with("rows", Some("region"))
            .with("cols", None);
        let merged = merge_query("/pivot?rows=region", Some(&options), None);
        assert_eq!(merged.url, "/pivot?rows=region");
        assert!(!merged.needs_reload);
        assert_eq!(merged.show_totals, None);
    }

    #[test]
    fn falsy_value_removes_param_and_flags_reload() {
        let filters = QueryParams::new().with("status", Some(""));
        let merged = merge_query("/pivot?status=open&page=2", None, Some(&filters));
        assert_eq!(merged.url, "/pivot?page=2");
        assert!(merged.needs_reload);
    }

    #[test]
    fn removing_every_param_drops_the_question_mark() {
        let filters = QueryParams::new().with("a", None);
        let merged = merge_query("/pivot?a=1&aggregate=avg", None, Some(&filters));
        assert_eq!(merged.url, "/pivot");
    }

    #[test]
    fn new_keys_are_appended_and_encoded() {
        let filters = QueryParams::new().with("name", Some("a b&c"));
        let merged = merge_query("/pivot?mode=report", None, Some(&filters));
        assert_eq!(merged.url, "/pivot?mode=report&name=a+b%26c");
        assert!(merged.needs_reload);
    }

    #[test]
    fn strip_aggregate_is_unconditional() {
        let query = strip_aggregate(ParsedQuery::parse("aggregate=sum&b=2"));
        assert_eq!(query.keys().collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn intercept_totals_reads_truthiness() {
        assert_eq!(intercept_totals(&ReportOptions::totals_only(true)), Some(true));
        assert_eq!(intercept_totals(&ReportOptions::totals_only(false)), Some(false));
        assert_eq!(intercept_totals(&QueryParams::new()), None);
    }

    #[test]
    fn apply_param_reports_changes_only() {
        let mut query = ParsedQuery::parse("x=1");
        assert!(!apply_param(&mut query, "x", Some("1")));
        assert!(!apply_param(&mut query, "y", None));
        assert!(apply_param(&mut query, "x", Some("3")));
        assert_eq!(query.get("x"), Some("3"));
    }

    #[test]
    fn intercepted_totals_leave_the_url_without_reload() {
        let merged = merge_query(
            "/p?totals=1&x=1",
            Some(&ReportOptions::totals_only(false)),
            None,
        );
        assert_eq!(merged.url, "/p?x=1");
        assert!(!merged.needs_reload);
        assert_eq!(merged.show_totals, Some(false));
    }

    #[test]
    fn bare_keys_without_value_are_dropped() {
        let query = ParsedQuery::parse("flag&x=1&empty=");
        assert_eq!(query.keys().collect::<Vec<_>>(), vec!["x", "empty"]);
        assert_eq!(query.get("empty"), Some(""));

        let filters = QueryParams::new().with("x", Some("1"));
        let merged = merge_query("/p?flag&x=1", None, Some(&filters));
        assert_eq!(merged.url, "/p?x=1");
        assert!(!merged.needs_reload);
    }
}

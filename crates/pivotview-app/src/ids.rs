// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// DOM id prefix shared by every element a widget instance owns.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WidgetId(String);

impl WidgetId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn generate() -> Self {
        Self(format!("pivottable-{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Element id for a fixed sub-region, e.g. `suffixed("options")`.
    pub fn suffixed(&self, suffix: &str) -> String {
        format!("{}-{}", self.0, suffix)
    }
}

impl From<&str> for WidgetId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::WidgetId;

    #[test]
    fn generated_ids_are_unique_per_instance() {
        let first = WidgetId::generate();
        let second = WidgetId::generate();
        assert_ne!(first, second);
        assert!(first.as_str().starts_with("pivottable-"));
    }

    #[test]
    fn suffixed_joins_with_dash() {
        let id = WidgetId::from("report");
        assert_eq!(id.suffixed("options"), "report-options");
        assert_eq!(id.suffixed("pchart-rows"), "report-pchart-rows");
    }
}

// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use log::LevelFilter;
use pivotview_app::{Axis, ChartOptions, ChartType, WidgetOptions};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const APP_NAME: &str = "pivotview";
const CONFIG_VERSION: i64 = 1;
const DEFAULT_WIDGET_ID: &str = "pivot";
const DEFAULT_TIMEOUT: &str = "10s";
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub widget: Widget,
    #[serde(default)]
    pub source: Source,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            widget: Widget::default(),
            source: Source::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Widget {
    pub id: Option<String>,
    pub show_totals: Option<bool>,
    pub collapse_form: Option<bool>,
    pub show_chart: Option<bool>,
    /// `<chart type>:<axis>`, for example `barchart:rows`.
    pub default_chart: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Source {
    pub ajax_url: Option<String>,
    pub timeout: Option<String>,
}

impl Default for Source {
    fn default() -> Self {
        Self {
            ajax_url: None,
            timeout: Some(DEFAULT_TIMEOUT.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    pub path: Option<String>,
    pub level: Option<String>,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            path: None,
            level: Some(DEFAULT_LOG_LEVEL.to_owned()),
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("PIVOTVIEW_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set PIVOTVIEW_CONFIG_PATH to the config file")
        })?;
        Ok(config_root.join(APP_NAME).join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} has no version. Add `version = 1` and put values under [widget], [source], and [log]",
                    path.display()
                )
            })?;
        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(timeout) = &self.source.timeout {
            let parsed = parse_duration(timeout)?;
            if parsed.is_zero() {
                bail!(
                    "source.timeout in {} must be positive, got {}",
                    path.display(),
                    timeout
                );
            }
        }

        if let Some(chart) = &self.widget.default_chart {
            parse_chart(chart)
                .with_context(|| format!("widget.default_chart in {}", path.display()))?;
        }

        if let Some(level) = &self.log.level {
            parse_level(level).with_context(|| format!("log.level in {}", path.display()))?;
        }

        if let Some(id) = &self.widget.id
            && id.trim().is_empty()
        {
            bail!("widget.id in {} must not be blank", path.display());
        }

        Ok(())
    }

    pub fn widget_id(&self) -> &str {
        self.widget.id.as_deref().unwrap_or(DEFAULT_WIDGET_ID)
    }

    /// Widget options with `ajax_url` taken from `url_override` when given.
    pub fn widget_options(&self, url_override: Option<&str>) -> Result<WidgetOptions> {
        let defaults = WidgetOptions::default();
        let default_chart = self
            .widget
            .default_chart
            .as_deref()
            .map(parse_chart)
            .transpose()?;
        Ok(WidgetOptions {
            show_totals: self.widget.show_totals.unwrap_or(defaults.show_totals),
            collapse_form: self.widget.collapse_form.unwrap_or(defaults.collapse_form),
            ajax_url: url_override
                .map(str::to_owned)
                .or_else(|| self.source.ajax_url.clone()),
            default_chart,
            show_chart: self.widget.show_chart.unwrap_or(defaults.show_chart),
        })
    }

    pub fn source_timeout(&self) -> Result<Duration> {
        parse_duration(self.source.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT))
    }

    pub fn log_level(&self) -> Result<LevelFilter> {
        parse_level(self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL))
    }

    pub fn log_path(&self) -> Result<PathBuf> {
        match &self.log.path {
            Some(path) => Ok(PathBuf::from(path)),
            None => {
                let data_root = dirs::data_dir().ok_or_else(|| {
                    anyhow!("cannot resolve data directory; set [log].path in the config file")
                })?;
                Ok(data_root.join(APP_NAME).join("pivotview.log"))
            }
        }
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# pivotview config\n# Place this file at: {}\n\nversion = 1\n\n[widget]\nid = \"{}\"\nshow_totals = true\ncollapse_form = true\nshow_chart = false\n# One of piechart, barchart, breakdown followed by rows or cols.\n# default_chart = \"barchart:rows\"\n\n[source]\n# Endpoint returning the pivot result as JSON.\n# ajax_url = \"https://example.com/report/pivot.json?mode=report\"\ntimeout = \"{}\"\n\n[log]\n# Optional. Default is the platform data dir (for example ~/.local/share/pivotview/pivotview.log)\n# path = \"/absolute/path/to/pivotview.log\"\nlevel = \"{}\"\n",
            path.display(),
            DEFAULT_WIDGET_ID,
            DEFAULT_TIMEOUT,
            DEFAULT_LOG_LEVEL,
        )
    }
}

fn parse_chart(raw: &str) -> Result<ChartOptions> {
    let (chart_type, axis) = raw
        .split_once(':')
        .ok_or_else(|| anyhow!("invalid chart {raw:?}; use <type>:<axis>, for example barchart:rows"))?;
    let chart_type = ChartType::parse(chart_type.trim()).ok_or_else(|| {
        anyhow!("unknown chart type {chart_type:?}; use piechart, barchart, or breakdown")
    })?;
    let axis = Axis::parse(axis.trim())
        .ok_or_else(|| anyhow!("unknown chart axis {axis:?}; use rows or cols"))?;
    Ok(ChartOptions::new(chart_type, axis))
}

fn parse_level(raw: &str) -> Result<LevelFilter> {
    raw.trim().parse::<LevelFilter>().map_err(|_| {
        anyhow!("invalid log level {raw:?}; use off, error, warn, info, debug, or trace")
    })
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        let secs = mins.checked_mul(60).ok_or_else(|| {
            anyhow!("timeout duration {raw:?} is too large; use a value of a few minutes at most")
        })?;
        return Ok(Duration::from_secs(secs));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 5s)")
}

#[cfg(test)]
mod tests {
    use super::{Config, parse_chart, parse_duration};
    use anyhow::Result;
    use log::LevelFilter;
    use pivotview_app::{Axis, ChartOptions, ChartType};
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};
    use std::time::Duration;

    fn write_config(content: &str) -> Result<(tempfile::TempDir, PathBuf)> {
        let (temp, path) = pivotview_testkit::temp_config_path()?;
        std::fs::write(&path, content)?;
        Ok((temp, path))
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        match ENV_LOCK.get_or_init(|| Mutex::new(())).lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[test]
    fn missing_config_uses_defaults() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let config = Config::load(&temp.path().join("missing.toml"))?;
        assert_eq!(config.version, 1);
        assert_eq!(config.widget_id(), "pivot");
        assert_eq!(config.source_timeout()?, Duration::from_secs(10));
        assert_eq!(config.log_level()?, LevelFilter::Info);

        let options = config.widget_options(None)?;
        assert!(options.show_totals);
        assert!(options.collapse_form);
        assert_eq!(options.ajax_url, None);
        Ok(())
    }

    #[test]
    fn unversioned_config_is_rejected_with_actionable_message() -> Result<()> {
        let (_temp, path) = write_config("[source]\najax_url = \"http://host/p.json\"\n")?;
        let error = Config::load(&path).expect_err("unversioned config should fail");
        let message = error.to_string();
        assert!(message.contains("version = 1"));
        assert!(message.contains("[widget], [source], and [log]"));
        Ok(())
    }

    #[test]
    fn unsupported_config_version_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 3\n")?;
        let error = Config::load(&path).expect_err("v3 config should fail");
        assert!(error.to_string().contains("unsupported config version 3"));
        Ok(())
    }

    #[test]
    fn malformed_config_returns_parse_error() -> Result<()> {
        let (_temp, path) = write_config("{{not toml")?;
        let error = Config::load(&path).expect_err("malformed config should fail");
        assert!(error.to_string().contains("parse TOML config"));
        Ok(())
    }

    #[test]
    fn full_config_maps_onto_widget_options() -> Result<()> {
        let (_temp, path) = write_config(
            "version = 1\n[widget]\nid = \"sales\"\nshow_totals = false\ncollapse_form = false\nshow_chart = true\ndefault_chart = \"breakdown:cols\"\n[source]\najax_url = \"http://host/pivot.json?mode=report\"\ntimeout = \"500ms\"\n[log]\npath = \"/tmp/pv.log\"\nlevel = \"debug\"\n",
        )?;
        let config = Config::load(&path)?;
        assert_eq!(config.widget_id(), "sales");
        assert_eq!(config.source_timeout()?, Duration::from_millis(500));
        assert_eq!(config.log_level()?, LevelFilter::Debug);
        assert_eq!(config.log_path()?, PathBuf::from("/tmp/pv.log"));

        let options = config.widget_options(None)?;
        assert!(!options.show_totals);
        assert!(!options.collapse_form);
        assert!(options.show_chart);
        assert_eq!(
            options.default_chart,
            Some(ChartOptions::new(ChartType::Breakdown, Axis::Cols))
        );
        assert_eq!(
            options.ajax_url.as_deref(),
            Some("http://host/pivot.json?mode=report")
        );
        Ok(())
    }

    #[test]
    fn url_override_beats_configured_source() -> Result<()> {
        let (_temp, path) =
            write_config("version = 1\n[source]\najax_url = \"http://host/a.json\"\n")?;
        let config = Config::load(&path)?;
        let options = config.widget_options(Some("http://other/b.json"))?;
        assert_eq!(options.ajax_url.as_deref(), Some("http://other/b.json"));
        Ok(())
    }

    #[test]
    fn invalid_values_are_rejected() -> Result<()> {
        for (content, needle) in [
            ("version = 1\n[source]\ntimeout = \"0s\"\n", "must be positive"),
            ("version = 1\n[widget]\ndefault_chart = \"donut:rows\"\n", "unknown chart type"),
            ("version = 1\n[widget]\ndefault_chart = \"barchart\"\n", "<type>:<axis>"),
            ("version = 1\n[log]\nlevel = \"loud\"\n", "invalid log level"),
            ("version = 1\n[widget]\nid = \" \"\n", "must not be blank"),
        ] {
            let (_temp, path) = write_config(content)?;
            let error = Config::load(&path).expect_err("invalid config should fail");
            let message = format!("{error:#}");
            assert!(message.contains(needle), "unexpected message: {message}");
        }
        Ok(())
    }

    #[test]
    fn default_path_honors_env_override() -> Result<()> {
        let _guard = env_lock();
        let temp = tempfile::tempdir()?;
        let override_path = temp.path().join("custom-config.toml");
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("PIVOTVIEW_CONFIG_PATH", &override_path);
        }
        let resolved = Config::default_path()?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("PIVOTVIEW_CONFIG_PATH");
        }
        assert_eq!(resolved, override_path);
        Ok(())
    }

    #[test]
    fn default_path_uses_config_toml_suffix_when_no_env_override() -> Result<()> {
        let _guard = env_lock();
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::remove_var("PIVOTVIEW_CONFIG_PATH");
        }
        let path = Config::default_path()?;
        assert!(path.ends_with("pivotview/config.toml"));
        Ok(())
    }

    #[test]
    fn chart_parsing_trims_parts() -> Result<()> {
        assert_eq!(
            parse_chart(" piechart : rows ")?,
            ChartOptions::new(ChartType::Piechart, Axis::Rows)
        );
        Ok(())
    }

    #[test]
    fn timeout_parses_ms_seconds_and_minutes() -> Result<()> {
        assert_eq!(parse_duration("500ms")?, Duration::from_millis(500));
        assert_eq!(parse_duration("5s")?, Duration::from_secs(5));
        assert_eq!(parse_duration("2m")?, Duration::from_secs(120));
        assert!(parse_duration("oops").is_err());
        Ok(())
    }

    #[test]
    fn timeout_rejects_minutes_that_overflow() {
        let error = parse_duration(&format!("{}m", u64::MAX)).expect_err("overflow should fail");
        assert!(error.to_string().contains("too large"));
    }

    #[test]
    fn example_config_loads_cleanly() -> Result<()> {
        let (_temp, path) = pivotview_testkit::temp_config_path()?;
        std::fs::write(&path, Config::example_config(&path))?;
        let config = Config::load(&path)?;
        assert_eq!(config.widget_id(), "pivot");
        assert!(config.source.ajax_url.is_none());
        Ok(())
    }
}

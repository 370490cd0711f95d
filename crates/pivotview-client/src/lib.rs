// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use pivotview_app::FetchFailure;
use reqwest::StatusCode;
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{ACCEPT, HeaderValue};
use std::time::Duration;
use url::Url;

/// Blocking fetcher for pivot report JSON.
#[derive(Debug, Clone)]
pub struct Client {
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(timeout: Duration) -> Result<Self> {
        if timeout.is_zero() {
            bail!("source.timeout must be positive");
        }
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;
        Ok(Self { timeout, http })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetches the report at `url` and returns the body once it is known to be JSON.
    pub fn fetch(&self, url: &str) -> Result<String> {
        let url = parse_report_url(url)?;
        log::debug!("GET {url}");

        let response = self
            .http
            .get(url.clone())
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .send()
            .map_err(|error| connection_error(&url, error))?;

        let status = response.status();
        let body = response
            .text()
            .with_context(|| format!("read response body from {url}"))?;
        if !status.is_success() {
            return Err(failure_response(status, body));
        }

        if let Err(error) = serde_json::from_str::<serde_json::Value>(&body) {
            return Err(anyhow!(FetchFailure::Response {
                status: status.as_u16(),
                body: format!("response from {url} is not JSON: {error}"),
            }));
        }
        Ok(body)
    }
}

pub fn parse_report_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).with_context(|| {
        format!("invalid report URL {raw:?} -- use an absolute http:// or https:// URL")
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => bail!("unsupported URL scheme {other:?} in {raw:?} -- use http or https"),
    }
}

fn connection_error(url: &Url, error: reqwest::Error) -> anyhow::Error {
    let reason = if error.is_timeout() {
        "request timed out"
    } else {
        "connection failed"
    };
    anyhow!(FetchFailure::Transport(format!(
        "cannot reach {} -- {reason} ({error})",
        url.origin().ascii_serialization()
    )))
}

fn failure_response(status: StatusCode, body: String) -> anyhow::Error {
    if status == StatusCode::UNAUTHORIZED {
        return anyhow!(FetchFailure::Unauthorized);
    }
    anyhow!(FetchFailure::Response {
        status: status.as_u16(),
        body: body.trim().to_owned(),
    })
}

// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::fmt;

/// Shown instead of the response body when the endpoint wants a login.
pub const LOGIN_REQUIRED_MESSAGE: &str = "login required to load report data";

/// Why a reload fetch did not produce new pivot data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    Unauthorized,
    Response { status: u16, body: String },
    Transport(String),
}

impl FetchFailure {
    /// Recovers the failure carried by an error chain; anything else is a transport error.
    pub fn classify(error: &anyhow::Error) -> Self {
        error
            .downcast_ref::<Self>()
            .cloned()
            .unwrap_or_else(|| Self::Transport(format!("{error:#}")))
    }

    pub fn message(&self) -> String {
        match self {
            Self::Unauthorized => LOGIN_REQUIRED_MESSAGE.to_owned(),
            Self::Response { status, body } if body.trim().is_empty() => {
                format!("server returned {status}")
            }
            Self::Response { body, .. } => body.clone(),
            Self::Transport(message) => message.clone(),
        }
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

impl std::error::Error for FetchFailure {}

// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use pivotview_app::FetchFailure;
use pivotview_client::Client;
use pivotview_tui::InternalEvent;
use std::sync::mpsc::Sender;
use std::thread;

/// Fetches reload URLs over HTTP, off the UI thread.
pub struct ClientRuntime {
    client: Client,
}

impl ClientRuntime {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl pivotview_tui::PivotRuntime for ClientRuntime {
    fn fetch(&mut self, url: &str) -> Result<String> {
        self.client.fetch(url)
    }

    fn spawn_fetch(&mut self, request_id: u64, url: &str, tx: Sender<InternalEvent>) -> Result<()> {
        let client = self.client.clone();
        let url = url.to_owned();
        thread::Builder::new()
            .name(format!("pivotview-fetch-{request_id}"))
            .spawn(move || {
                let event = match client.fetch(&url) {
                    Ok(body) => InternalEvent::FetchCompleted { request_id, body },
                    Err(error) => InternalEvent::FetchFailed {
                        request_id,
                        failure: FetchFailure::classify(&error),
                    },
                };
                let _ = tx.send(event);
            })
            .map_err(|error| anyhow!("spawn fetch worker: {error}"))?;
        Ok(())
    }
}

// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod runtime;

use anyhow::{Context, Result};
use config::Config;
use pivotview_app::{PivotTableWidget, WidgetId};
use pivotview_client::Client;
use runtime::ClientRuntime;
use std::env;
use std::fs;
use std::path::PathBuf;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `pivotview --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;

    let log_path = config.log_path()?;
    logging::init(&log_path, config.log_level()?)?;

    let widget = build_widget(&config, &options)?;
    let client = Client::new(config.source_timeout()?).with_context(|| {
        format!(
            "invalid [source] config in {}; fix the timeout value",
            options.config_path.display()
        )
    })?;
    if let Some(url) = widget.ajax_url() {
        pivotview_client::parse_report_url(url)
            .context("check reload URL from --url or [source].ajax_url")?;
    }

    if options.check_only {
        return Ok(());
    }

    if options.print_html {
        println!("{}", pivotview_html::render_widget(&widget)?);
        return Ok(());
    }

    log::info!(
        "starting pivotview {} (source: {})",
        widget.id(),
        widget.ajax_url().unwrap_or("embedded")
    );
    let reload_on_start = reloads_on_start(&options, &widget);
    let mut widget = widget;
    let mut runtime = ClientRuntime::new(client);
    pivotview_tui::run_app(&mut widget, &mut runtime, reload_on_start)
}

fn build_widget(config: &Config, options: &CliOptions) -> Result<PivotTableWidget> {
    let embedded = match &options.input {
        Some(path) => Some(
            fs::read_to_string(path)
                .with_context(|| format!("read pivot data {}", path.display()))?,
        ),
        None => None,
    };
    let widget_options = config.widget_options(options.url.as_deref())?;
    Ok(PivotTableWidget::new(
        WidgetId::new(config.widget_id()),
        widget_options,
        embedded,
    ))
}

/// Without an input file the only data source is the reload URL.
fn reloads_on_start(options: &CliOptions, widget: &PivotTableWidget) -> bool {
    options.input.is_none() && widget.ajax_url().is_some()
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    input: Option<PathBuf>,
    url: Option<String>,
    print_config_path: bool,
    print_example: bool,
    print_html: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        input: None,
        url: None,
        print_config_path: false,
        print_example: false,
        print_html: false,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--input" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--input requires a JSON file path"))?;
                options.input = Some(PathBuf::from(value.as_ref()));
            }
            "--url" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--url requires a report URL"))?;
                options.url = Some(value.as_ref().to_owned());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--html" => {
                options.print_html = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow::anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("pivotview");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a config template");
    println!("  --input <file>           Load pivot data JSON from a file");
    println!("  --url <url>              Reload URL (overrides [source].ajax_url)");
    println!("  --html                   Print the rendered widget HTML and exit");
    println!("  --check                  Validate config, input, and reload URL");
    println!("  --help                   Show this help");
}

use std::path::Path;

#[macro_use]
extern crate lazy_static;

use anyhow::{Context, Result};
use clap::{App, Arg};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod common;
mod config;
mod cowin;
mod error;
mod integration;
mod jobs;

use config::Config;
use cowin::Client;
use jobs::Job;

fn command_usage<'a, 'b>() -> App<'a, 'b> {
    App::new("vaccination-acquisition")
    .about("Scrapes district level vaccination statistics from the CoWIN public dashboard into CSV files")
    .arg(
        Arg::with_name("report")
            .short("r")
            .long("report")
            .takes_value(true)
            .possible_values(&Job::NAMES)
            .default_value("all")
            .help("Which report to build. `all` builds every report, weekly vaccination first.")
    )
    .arg(
        Arg::with_name("config")
            .short("c")
            .long("config")
            .takes_value(true)
            .help("Location of a TOML configuration overriding endpoints, user agent and output file names")
    )
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let matches = command_usage().get_matches();

    let job: Job = matches.value_of("report").unwrap_or("all").parse()?;

    let config = Config::load(matches.value_of("config").map(Path::new))
        .context("Failed to load configuration")?;

    let client = Client::new(&config.api);
    let date = common::today();

    info!(report = %job, date = %date, "Starting");

    let written = jobs::run(job, &client, &config.output, &date)
        .with_context(|| format!("Report `{}` aborted", job))?;

    for w in written {
        info!(report = %w.job, rows = w.rows, path = %w.path.display(), "Wrote CSV");
    }
    info!("Done");

    Ok(())
}

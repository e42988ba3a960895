pub mod cli;
pub mod commands;
pub mod config;
pub mod dates;
pub mod model;
pub mod render;
pub mod storage;
pub mod store;

use std::ffi::OsString;

use anyhow::Context;
use chrono::{Datelike, Local};
use clap::Parser;
use tracing::info;

pub fn run(raw_args: Vec<OsString>) -> anyhow::Result<()> {
    let cli = cli::GlobalCli::parse_from(raw_args);

    cli::init_tracing(cli.verbose, cli.quiet)?;

    info!(verbose = cli.verbose, quiet = cli.quiet, "starting annum CLI");

    let mut cfg = config::Config::load(cli.annumrc.as_deref())?;
    cfg.apply_overrides(
        cli.rc_overrides
            .into_iter()
            .map(|kv| (kv.key, kv.value)),
    );

    let data_dir = config::resolve_data_dir(&cfg, cli.data.as_deref())
        .context("failed to resolve data directory")?;

    let storage = storage::Storage::open(&data_dir)
        .with_context(|| format!("failed to open storage at {}", data_dir.display()))?;

    let today_year = Local::now().year();
    let mut store = store::CalendarStore::new(storage, today_year);
    store.initialize(today_year);

    let mut renderer = render::Renderer::new(&cfg)?;
    let command = cli.command.unwrap_or(cli::Command::Show);

    commands::dispatch(&mut store, &mut renderer, command)?;

    info!("done");
    Ok(())
}

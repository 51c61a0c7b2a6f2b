pub mod cli;
pub mod commands;
pub mod config;
pub mod datastore;
pub mod datetime;
pub mod error;
pub mod plan;
pub mod record;
pub mod render;
pub mod schedule;
pub mod stats;
pub mod status;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

pub use error::ScheduleError;
pub use plan::{
  ImmunizationPlan,
  PlanProgress
};
pub use schedule::compute_next_due;
pub use stats::{
  DashboardStats,
  aggregate
};
pub use status::{
  DueStatus,
  classify
};

/// Entry point of the `boosters`
/// binary.
pub fn run(
  args: Vec<OsString>
) -> anyhow::Result<()> {
  let cli =
    cli::GlobalCli::parse_from(args);
  cli::init_tracing(cli.verbosity())?;

  let mut cfg = config::Config::load(
    cli.config.as_deref()
  )?;
  cfg
    .apply_overrides(cli.overrides())
    .context("invalid --set override")?;
  if let Some(dir) = &cli.data {
    cfg.data_dir = Some(dir.clone());
  }
  debug!(?cfg, "effective settings");

  let data_dir = cfg.data_dir()?;
  let mut store =
    datastore::DataStore::open(
      &data_dir
    )
    .with_context(|| {
      format!(
        "cannot open data directory {}",
        data_dir.display()
      )
    })?;

  let inv = cli::Invocation::parse(
    &cfg, cli.rest
  )?;
  info!(command = %inv.command, data_dir = %data_dir.display(), "running");

  let mut renderer =
    render::Renderer::new(&cfg);
  commands::dispatch(
    &mut store,
    &cfg,
    &mut renderer,
    inv
  )
}

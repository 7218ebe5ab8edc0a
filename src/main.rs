use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use rotback::archive;
use rotback::catalog::{self, CatalogStore, SqliteCatalog};
use rotback::cli::{Cli, Command, RecordsArgs, RunArgs};
use rotback::config::{self, Config};
use rotback::engine::{self, JobResult};
use rotback::logging;
use rotback::report;

fn run_jobs(args: &RunArgs) -> anyhow::Result<bool> {
    let config = Config::from_run_args(args).context("invalid job configuration")?;
    let mut results: Vec<JobResult> = Vec::with_capacity(config.jobs.len());

    // jobs run strictly one after another, each with its own catalogue handle
    for job in &config.jobs {
        let mut store = catalog::open_catalog(job, &config.catalog_path)
            .with_context(|| format!("failed to open catalogue {}", config.catalog_path.display()))?;

        let mut result = engine::run_job(job, store.as_mut());
        drop(store);

        if config.archive && result.is_success() {
            if let Err(e) = archive::archive_destination(&config.archiver, &job.dest_root) {
                tracing::warn!(job = %job.name, error = %e, "archiving failed");
                result.errors.push(e);
            }
        }

        results.push(result);
    }

    report::print(&results, &config);

    Ok(results.iter().all(JobResult::is_success))
}

fn list_records(args: &RecordsArgs) -> anyhow::Result<bool> {
    let path = config::resolve_catalog_path(args.catalog.as_deref())?;
    if !path.exists() {
        anyhow::bail!("no catalogue at {}. Run 'rotback run' first.", path.display());
    }

    let store = SqliteCatalog::open(&path)
        .with_context(|| format!("failed to open catalogue {}", path.display()))?;

    let records = match &args.source {
        Some(source) => store.records_under_root(&config::absolutize(source)?)?,
        None => store.all_records()?,
    };

    report::print_records(&records, args.json);
    Ok(true)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let verbose = match &cli.command {
        Command::Run(args) => args.verbose,
        Command::Records(_) => false,
    };
    logging::init_logging(verbose);

    let outcome = match &cli.command {
        Command::Run(args) => run_jobs(args),
        Command::Records(args) => list_records(args),
    };

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

//! cfn-crud command line.
//!
//! Executes one definition document: aggregates parameters, creates or
//! updates the declared stacks and deletes the ones marked for deletion.
//! Exits 0 when every stack succeeded and 1 on the first fatal error.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use cfn_crud::config::RunConfig;
use cfn_crud::errors::CrudError;
use cfn_crud::events::LoggingEventSink;
use cfn_crud::observability::{init_logging, LogLevel};
use cfn_crud::provider::CloudFormationProvider;
use cfn_crud::run::{RunReport, StackRun};
use clap::Parser;
use tracing::{error, info};

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(name = "cfn-crud", version)]
#[command(about = "Create, update and delete CloudFormation stacks from a definition file")]
struct Args {
    /// Definition file (JSON, or YAML by extension)
    #[arg(short = 'f', long, value_name = "PATH")]
    definition_file: PathBuf,

    /// Debug logging on the console
    #[arg(short, long, conflicts_with = "verbose")]
    debug: bool,

    /// Progress logging on the console (default)
    #[arg(short, long)]
    verbose: bool,

    /// Delay between status polls
    #[arg(long, value_name = "MILLIS")]
    poll_interval_ms: Option<u64>,

    /// Provider region
    #[arg(long, env = "AWS_REGION")]
    region: Option<String>,

    /// Named credentials profile
    #[arg(long, env = "AWS_PROFILE")]
    profile: Option<String>,

    /// Debug log file
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Console logs as JSON
    #[arg(long)]
    json_logs: bool,
}

impl Args {
    fn config(&self) -> Result<RunConfig, CrudError> {
        let mut config = RunConfig::from_env()?;
        if let Some(millis) = self.poll_interval_ms {
            config = config.with_poll_interval_ms(millis);
        }
        if let Some(ref region) = self.region {
            config = config.with_region(region);
        }
        if let Some(ref profile) = self.profile {
            config = config.with_profile(profile);
        }
        if let Some(ref path) = self.log_file {
            config = config.with_log_file(path);
        }
        if self.json_logs {
            config = config.with_json_logs(true);
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match args.config() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("cfn-crud: {err}");
            return ExitCode::from(err.exit_code());
        }
    };
    if let Err(err) = init_logging(LogLevel::from_flags(args.debug && !args.verbose), &config) {
        eprintln!("cfn-crud: {err}");
        return ExitCode::from(err.exit_code());
    }

    match run(&args, &config).await {
        Ok(report) => {
            info!(
                run_id = %report.run_id,
                stacks = report.entries.len(),
                "All stacks processed"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            match err.downcast_ref::<CrudError>() {
                Some(crud) => error!(details = ?crud.to_dict(), "{err:#}"),
                None => error!("{err:#}"),
            }
            ExitCode::from(1)
        }
    }
}

async fn run(args: &Args, config: &RunConfig) -> anyhow::Result<RunReport> {
    let provider =
        CloudFormationProvider::from_env(config.region.clone(), config.profile.clone()).await;

    let report = StackRun::new(Arc::new(provider))
        .with_config(config)
        .with_event_sink(Arc::new(LoggingEventSink::debug()))
        .execute_file(&args.definition_file)
        .await
        .with_context(|| format!("run of {} failed", args.definition_file.display()))?;

    Ok(report)
}

//! Command-line front end: resolves (and optionally executes) one catalogue
//! request against a deployment description, printing the outcome as JSON.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use bytes::Bytes;
use clap::Parser;
use csw_core::{ExceptionReport, HttpVerb, RawRequest};
use csw_server::service::{
    build_operation_pipeline, Deployment, DeploymentConfig, DeploymentHandle, Dispatcher,
    OperationExecutor,
};
use csw_server::{InMemoryRepository, RepositoryLookup};
use serde::Serialize;
use tower::ServiceExt;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Resolve a CSW request against a deployment.
#[derive(Debug, Parser)]
#[command(name = "csw-resolve", version)]
struct Args {
    /// JSON deployment description.
    #[arg(long, env = "CSW_CONFIG")]
    config: PathBuf,

    /// HTTP method the request arrived with.
    #[arg(long, default_value = "GET")]
    method: HttpVerb,

    /// KVP query string, e.g. `service=CSW&request=GetCapabilities`.
    #[arg(long, conflicts_with = "body", required_unless_present = "body")]
    query: Option<String>,

    /// File holding an XML request body.
    #[arg(long)]
    body: Option<PathBuf>,

    /// Run the resolved operation against an empty in-memory repository.
    #[arg(long)]
    execute: bool,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}

fn report_failure(report: &ExceptionReport) -> anyhow::Result<ExitCode> {
    print_json(report)?;
    Ok(ExitCode::FAILURE)
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    init_tracing(args.json_logs);

    let config = DeploymentConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let deployment = Deployment::from_config(&config)?;
    info!(services = deployment.services().len(), "deployment loaded");
    let dispatcher = Dispatcher::new(Arc::new(DeploymentHandle::new(deployment)));

    let raw = match (args.query, args.body) {
        (Some(query), _) => RawRequest::Query(query),
        (None, Some(path)) => RawRequest::Body(Bytes::from(
            std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?,
        )),
        (None, None) => anyhow::bail!("one of --query or --body is required"),
    };

    let call = match dispatcher.dispatch(args.method, raw) {
        Ok(call) => call,
        Err(e) => return report_failure(&e.report()),
    };

    if !args.execute {
        print_json(&call.resolution.summary())?;
        return Ok(ExitCode::SUCCESS);
    }

    let repository = Arc::new(InMemoryRepository::new());
    repository.create_schema().await?;
    let server_config = Arc::clone(&call.config);
    let pipeline = build_operation_pipeline(OperationExecutor::new(repository), &server_config);
    match pipeline.oneshot(call).await {
        Ok(response) => {
            print_json(&response)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => report_failure(&e.report()),
    }
}

use anyhow::Context;
use clap::Parser;
use portcall::cli::{Args, taiwan_now};
use portcall::config::Config;
use portcall::logging::setup_logging;
use portcall::pipeline::Pipeline;
use portcall::portal::PortalClient;
use portcall::report;
use std::path::PathBuf;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    setup_logging(args.tracing);

    let config = Config::load()?;
    let (start, end) = args.resolve_range(taiwan_now());
    info!(
        version = env!("CARGO_PKG_VERSION"),
        start = %start,
        end = %end,
        "starting vessel-call query"
    );

    let pipeline = Pipeline::new(PortalClient::new(&config), &config);
    let outcome = pipeline.fetch(start, end).await?;

    if !outcome.failures.is_empty() {
        warn!(
            failed = outcome.failures.len(),
            "some segments failed; results are partial"
        );
        for failure in &outcome.failures {
            warn!(segment = %failure.segment, error = %failure.error, "failed segment");
        }
    }
    if outcome.records.is_empty() {
        info!("no qualifying vessel calls in the requested range");
    }

    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(format!("Report_{}.csv", start.format("%m%d"))));
    report::write_csv(&output, &outcome.records)
        .with_context(|| format!("failed to write report to {}", output.display()))?;
    info!(
        records = outcome.records.len(),
        path = %output.display(),
        "report written"
    );
    Ok(())
}

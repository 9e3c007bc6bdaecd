#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![deny(warnings)]
#![allow(clippy::multiple_crate_versions)]

use anyhow::Context;
use sso_smoketest::{FlowRunner, SmokeSettings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from Settings.toml and environment variables.
    // This also loads the .env file and initializes the logger.
    let settings = SmokeSettings::load()
        .map_err(|e| anyhow::anyhow!("failed to load settings: {e}"))?;

    let runner = FlowRunner::new(settings).context("failed to construct flow runner")?;
    let report = runner.run().await.context("verification run aborted")?;

    // The report is the sole output: one JSON object whose keys are exactly
    // the steps that were attempted.
    println!("{}", serde_json::to_string_pretty(&report)?);

    if report.has_failures() {
        std::process::exit(1);
    }
    Ok(())
}

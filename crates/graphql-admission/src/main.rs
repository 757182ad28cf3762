// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::{
    io::{self, Read},
    path::PathBuf,
    process::ExitCode,
};

use anyhow::{Context, Result};
use clap::Parser;
use graphql_admission::{ComplexityValidator, GatewayConfig, QueryValidator};
use tracing::{debug, info, warn};
use tracing_subscriber::{filter::EnvFilter, FmtSubscriber};

/// Measure a GraphQL document's depth and estimated cost, and check whether the gateway would
/// admit it.
#[derive(Parser, Debug)]
#[clap(name = "graphql-admission", rename_all = "kebab-case", author, version)]
struct Args {
    /// File containing the GraphQL document. Read from `stdin` if not provided.
    query: Option<PathBuf>,

    /// Path to a TOML file configuring limits and the cost model.
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Override the maximum depth (takes precedence over the config file and environment).
    #[clap(long)]
    max_depth: Option<usize>,

    /// Override the maximum cost (takes precedence over the config file and environment).
    #[clap(long)]
    max_cost: Option<u64>,

    /// Default log filter, used when `RUST_LOG` is not set.
    #[clap(long, default_value = "warn")]
    log_level: String,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(&args.log_level))
                .context("Invalid log level")?,
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install log subscriber")?;

    let config = match &args.config {
        Some(path) => GatewayConfig::load(path)?,
        None => GatewayConfig::default(),
    };

    let mut config = config.with_env_overrides()?;
    if let Some(max_depth) = args.max_depth {
        config.limits.max_depth = max_depth;
    }

    if let Some(max_cost) = args.max_cost {
        config.limits.max_cost = max_cost;
    }

    debug!(?config, "Loaded configuration");

    let query = match &args.query {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read query from {}", path.display()))?,
        None => {
            let mut query = String::new();
            io::stdin()
                .read_to_string(&mut query)
                .context("Failed to read query from stdin")?;
            query
        }
    };

    let document =
        async_graphql::parser::parse_query(&query).context("Failed to parse GraphQL document")?;

    let validator = ComplexityValidator::new(config.cost.cost_model());
    let result = validator.validate(&document, &config.limits.validation_options());

    println!("{}", serde_json::to_string_pretty(&result)?);

    if result.valid {
        info!(depth = result.depth, cost = result.cost, "Query admitted");
        Ok(ExitCode::SUCCESS)
    } else {
        warn!(errors = ?result.errors, "Query would be rejected");
        Ok(ExitCode::FAILURE)
    }
}

// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! code-analyst: periodic code-quality reports from repository history
//!
//! This binary clones a repository (or reuses a local copy), aggregates its
//! recent history into a text artifact, asks a generative model for a report
//! and prints or emails it.

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use code_analyst::commands;
use code_analyst::config::Config;
use tracing::{debug, error};

fn main() -> ExitCode {
    let config = Config::parse();

    // Logs go to stderr; stdout carries the report or artifact
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(config.log_level().into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &Config) -> anyhow::Result<()> {
    config.validate().context("Invalid configuration")?;
    debug!(?config, "Configuration loaded");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(commands::execute(config))?;
    Ok(())
}

//! CLI command definitions.
//!
//! This module defines the command structure for the Hermes CLI.

use std::path::Path;

use anyhow::Result;
use clap::{Parser, Subcommand};
use hermes_iac::{CompileError, Diagram};

pub mod compile;
pub mod config;
pub mod validate;

/// Hermes - infrastructure diagram compiler
#[derive(Parser)]
#[command(name = "hermes")]
#[command(version, about = "Hermes - compile infrastructure diagrams into AWS CDK scripts")]
#[command(long_about = r#"
Hermes turns an infrastructure diagram (VPCs, web servers, databases,
storage containers, static websites and the connections between them)
into a Python AWS CDK application.

COMMANDS:
  compile   → Validate a diagram and generate its CDK script
  validate  → Check a diagram without generating anything
  config    → Write the default compiler configuration

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Validation failure
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile a diagram into a CDK script
    Compile(compile::CompileArgs),

    /// Validate a diagram
    Validate(validate::ValidateArgs),

    /// Write the default compiler configuration
    Config(config::ConfigArgs),
}

/// Read and parse a diagram JSON file.
pub async fn load_diagram(path: &Path) -> Result<Diagram> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(CompileError::from)?;
    Ok(Diagram::from_json(&content)?)
}

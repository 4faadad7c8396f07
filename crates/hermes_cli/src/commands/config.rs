//! Config command - Write the default compiler configuration.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use hermes_iac::CompilerConfig;

#[derive(Args)]
pub struct ConfigArgs {
    /// Destination YAML file
    #[arg(short, long, default_value = "hermes.yaml")]
    pub output: PathBuf,

    /// Overwrite an existing file
    #[arg(short, long)]
    pub force: bool,
}

pub async fn execute(args: ConfigArgs) -> Result<()> {
    if args.output.exists() && !args.force {
        anyhow::bail!(
            "Configuration already exists at {:?}. Use --force to overwrite.",
            args.output
        );
    }

    CompilerConfig::default()
        .to_file(&args.output)
        .with_context(|| format!("Failed to write configuration to {:?}", args.output))?;

    println!("✅ Wrote default configuration to {}", args.output.display());
    Ok(())
}

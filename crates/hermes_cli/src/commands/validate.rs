//! Validate command - Check a diagram without generating code.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tracing::info;

use hermes_iac::{CompileError, Validator};

use super::load_diagram;

#[derive(Args)]
pub struct ValidateArgs {
    /// Diagram JSON file
    #[arg(short, long)]
    pub input: PathBuf,
}

pub async fn execute(args: ValidateArgs) -> Result<()> {
    info!("Validating diagram {:?}", args.input);

    let diagram = load_diagram(&args.input).await?;

    println!("📋 Validating {}...", diagram.name);
    Validator::check_diagram(&diagram).map_err(CompileError::from)?;

    println!(
        "   ✅ {} blocks and {} connections are valid",
        diagram.blocks.len(),
        diagram.connections.len()
    );
    Ok(())
}

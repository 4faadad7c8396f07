//! Compile command - Generate a CDK script from a diagram.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use hermes_iac::{compile_with, CompileError, CompilerConfig};

use super::load_diagram;

#[derive(Args)]
pub struct CompileArgs {
    /// Diagram JSON file
    #[arg(short, long)]
    pub input: PathBuf,

    /// Where to write the script (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Compiler configuration YAML file
    #[arg(short, long, env = "HERMES_CONFIG")]
    pub config: Option<PathBuf>,
}

pub async fn execute(args: CompileArgs) -> Result<()> {
    info!("Compiling diagram {:?}", args.input);

    let config = match &args.config {
        Some(path) => CompilerConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {:?}", path))?,
        None => CompilerConfig::default(),
    };

    let diagram = load_diagram(&args.input).await?;
    let script = compile_with(&diagram, &config)?;

    match &args.output {
        Some(path) => {
            tokio::fs::write(path, &script)
                .await
                .map_err(CompileError::from)?;
            println!("✅ Wrote {} to {}", diagram.name, path.display());
        }
        None => print!("{}", script),
    }

    Ok(())
}

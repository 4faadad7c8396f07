//! # hermes_iac
//!
//! Compiler from Hermes infrastructure diagrams to AWS CDK (Python) scripts.
//!
//! A compilation validates the diagram, linearizes it into an ordered
//! sequence of elements with generated names, and emits one declaration
//! block per element into a single script.
//!
//! ## Example
//!
//! ```rust,no_run
//! use hermes_iac::{compile, Connection, Diagram, Vpc, WebServer};
//!
//! let vpc = Vpc::new("v", "Network", vec![WebServer::new("w", "Web").into()]);
//! let diagram = Diagram::new(
//!     "d1",
//!     "Demo",
//!     vec![vpc.into()],
//!     vec![Connection::new("c", "v", "w", vec![80])],
//! );
//!
//! let script = compile(&diagram).unwrap();
//! println!("{}", script);
//! ```

pub mod codegen;
pub mod config;
pub mod diagram;
pub mod element;
pub mod error;
pub mod tree;
pub mod validator;
pub mod writer;

use tracing::info;

pub use codegen::{port_description, CdkModule, CodeGenerator, ImportSet};
pub use config::CompilerConfig;
pub use diagram::{
    Block, BlockKind, Connection, Database, Diagram, StaticWebsite, StorageContainer, Vpc,
    WebServer, INTERNET,
};
pub use element::{DatabaseEngine, Element, ElementKind, ElementRef};
pub use error::{BuildError, CompileError, CompileResult, ValidationError};
pub use tree::TreeBuilder;
pub use validator::Validator;
pub use writer::FileWriter;

/// Compile a diagram with the default configuration.
pub fn compile(diagram: &Diagram) -> CompileResult<String> {
    compile_with(diagram, &CompilerConfig::default())
}

/// Validate, linearize and generate the script for a diagram.
pub fn compile_with(diagram: &Diagram, config: &CompilerConfig) -> CompileResult<String> {
    info!("Compiling diagram {:?}", diagram.name);

    Validator::check_diagram(diagram)?;
    let elements = TreeBuilder::new(diagram, config).build()?;
    let script = CodeGenerator::new(config).generate(&diagram.name, &elements);

    info!(
        "Generated {} lines for diagram {:?}",
        script.lines().count(),
        diagram.name
    );
    Ok(script)
}

//! Error types for the diagram compiler.

use thiserror::Error;

use crate::diagram::BlockKind;

/// Result type alias for compiler operations.
pub type CompileResult<T> = Result<T, CompileError>;

/// Semantic errors found while validating a diagram.
///
/// Validation stops at the first violation, so a failed check always
/// carries exactly one of these.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Found illegal {character} character in {value}")]
    IllegalCharacter { character: char, value: String },

    #[error("All {kind}s must be inside a VPC")]
    MustBeInsideVpc { kind: BlockKind },

    #[error("{kind}s cannot be inside other VPCs")]
    MustNotBeInsideVpc { kind: BlockKind },

    #[error("Database engine must be either \"postgres\" or \"mysql\"")]
    InvalidEngine { engine: String },

    #[error("Connection source and destination cannot be the same")]
    SelfConnection { connection_id: String },

    #[error("Illegal connection: Blocks related to a VPC cannot connect outside that VPC")]
    CrossVpcConnection { connection_id: String },

    #[error("Illegal connection: port numbers must be in the range [1,65535] (got {port})")]
    PortRange { port: i64 },

    #[error("StorageContainers and StaticWebsites can only be connected to the Internet")]
    StorageEndpoint { connection_id: String },
}

/// Internal consistency failures of the tree builder.
///
/// These only surface when a diagram reaches the builder without having
/// passed validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("Connection {connection_id} references {endpoint_id}, which has no emitted element")]
    DanglingReference {
        connection_id: String,
        endpoint_id: String,
    },

    #[error("Block {id} of type {kind} is not allowed in this position")]
    MisplacedBlock { id: String, kind: BlockKind },

    #[error("Connection {connection_id} carries invalid port {port}")]
    InvalidPort { connection_id: String, port: i64 },

    #[error("Database {id} uses unsupported engine {engine:?}")]
    UnsupportedEngine { id: String, engine: String },
}

/// Errors that can occur while loading or compiling a diagram.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Internal compiler error: {0}")]
    Build(#[from] BuildError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

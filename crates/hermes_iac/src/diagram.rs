//! Diagram input model.
//!
//! A diagram is the user-authored graph handed to the compiler: top-level
//! blocks (VPCs and free-standing buckets), the children nested inside each
//! VPC, and directed connections between block ids or the Internet.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CompileResult;

/// Endpoint id standing for the public Internet.
pub const INTERNET: &str = "Internet";

pub const DEFAULT_AVAILABILITY_ZONE: &str = "us-east-1";
pub const DEFAULT_INDEX_FILE: &str = "index.html";
pub const DEFAULT_ERROR_FILE: &str = "error.html";

/// A complete infrastructure diagram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagram {
    pub id: String,
    pub name: String,
    pub blocks: Vec<Block>,
    pub connections: Vec<Connection>,
}

impl Diagram {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        blocks: Vec<Block>,
        connections: Vec<Connection>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            blocks,
            connections,
        }
    }

    /// Parse a diagram from its JSON representation.
    pub fn from_json(json: &str) -> CompileResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a diagram from a JSON file.
    pub fn from_file(path: &Path) -> CompileResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Top-level VPC blocks, in diagram order.
    pub fn vpcs(&self) -> impl Iterator<Item = &Vpc> {
        self.blocks.iter().filter_map(|block| match block {
            Block::Vpc(vpc) => Some(vpc),
            _ => None,
        })
    }

    /// Find a top-level block by id.
    pub fn find_block(&self, id: &str) -> Option<&Block> {
        self.blocks.iter().find(|block| block.id() == id)
    }
}

/// The kind of a block, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockKind {
    #[serde(rename = "VPC")]
    Vpc,
    WebServer,
    Database,
    StorageContainer,
    StaticWebsite,
}

impl BlockKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Vpc => "VPC",
            BlockKind::WebServer => "WebServer",
            BlockKind::Database => "Database",
            BlockKind::StorageContainer => "StorageContainer",
            BlockKind::StaticWebsite => "StaticWebsite",
        }
    }

    /// Blocks of this kind may only live inside a VPC.
    pub fn requires_vpc(&self) -> bool {
        matches!(self, BlockKind::WebServer | BlockKind::Database)
    }

    /// Blocks backed by a storage bucket, which only talk to the Internet.
    pub fn is_storage(&self) -> bool {
        matches!(self, BlockKind::StorageContainer | BlockKind::StaticWebsite)
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A diagram node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Block {
    #[serde(rename = "VPC")]
    Vpc(Vpc),
    WebServer(WebServer),
    Database(Database),
    StorageContainer(StorageContainer),
    StaticWebsite(StaticWebsite),
}

impl Block {
    pub fn id(&self) -> &str {
        match self {
            Block::Vpc(b) => &b.id,
            Block::WebServer(b) => &b.id,
            Block::Database(b) => &b.id,
            Block::StorageContainer(b) => &b.id,
            Block::StaticWebsite(b) => &b.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Block::Vpc(b) => &b.name,
            Block::WebServer(b) => &b.name,
            Block::Database(b) => &b.name,
            Block::StorageContainer(b) => &b.name,
            Block::StaticWebsite(b) => &b.name,
        }
    }

    pub fn kind(&self) -> BlockKind {
        match self {
            Block::Vpc(_) => BlockKind::Vpc,
            Block::WebServer(_) => BlockKind::WebServer,
            Block::Database(_) => BlockKind::Database,
            Block::StorageContainer(_) => BlockKind::StorageContainer,
            Block::StaticWebsite(_) => BlockKind::StaticWebsite,
        }
    }

    /// Children nested in this block. Only VPCs have any.
    pub fn children(&self) -> &[Block] {
        match self {
            Block::Vpc(vpc) => &vpc.children,
            _ => &[],
        }
    }
}

/// A virtual private cloud containing web servers and databases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vpc {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub children: Vec<Block>,
}

impl Vpc {
    pub fn new(id: impl Into<String>, name: impl Into<String>, children: Vec<Block>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            children,
        }
    }

    /// Whether `id` is this VPC or one of its direct children.
    pub fn in_scope(&self, id: &str) -> bool {
        self.id == id || self.has_child(id)
    }

    pub fn has_child(&self, id: &str) -> bool {
        self.children.iter().any(|child| child.id() == id)
    }
}

/// A compute instance living inside a VPC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebServer {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "blank_as_none", skip_serializing_if = "Option::is_none")]
    pub ami_id: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none", skip_serializing_if = "Option::is_none")]
    pub availability_zone: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none", skip_serializing_if = "Option::is_none")]
    pub user_data_script: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none", skip_serializing_if = "Option::is_none")]
    pub app_path: Option<String>,
}

impl WebServer {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ami_id: None,
            availability_zone: None,
            user_data_script: None,
            app_path: None,
        }
    }

    pub fn with_ami(mut self, ami_id: impl Into<String>) -> Self {
        self.ami_id = non_blank(ami_id.into());
        self
    }

    pub fn with_availability_zone(mut self, zone: impl Into<String>) -> Self {
        self.availability_zone = non_blank(zone.into());
        self
    }

    pub fn with_user_data(mut self, script: impl Into<String>) -> Self {
        self.user_data_script = non_blank(script.into());
        self
    }

    pub fn with_app_path(mut self, path: impl Into<String>) -> Self {
        self.app_path = non_blank(path.into());
        self
    }

    pub fn availability_zone(&self) -> &str {
        self.availability_zone
            .as_deref()
            .unwrap_or(DEFAULT_AVAILABILITY_ZONE)
    }
}

/// A managed relational database living inside a VPC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Database {
    pub id: String,
    pub name: String,
    pub engine: String,
}

impl Database {
    pub fn new(id: impl Into<String>, name: impl Into<String>, engine: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            engine: engine.into(),
        }
    }
}

/// A private storage bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageContainer {
    pub id: String,
    pub name: String,
}

impl StorageContainer {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A bucket serving a public static website.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticWebsite {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "blank_as_none", skip_serializing_if = "Option::is_none")]
    pub index_file: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none", skip_serializing_if = "Option::is_none")]
    pub error_file: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none", skip_serializing_if = "Option::is_none")]
    pub app_path: Option<String>,
}

impl StaticWebsite {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            index_file: None,
            error_file: None,
            app_path: None,
        }
    }

    pub fn with_documents(mut self, index: impl Into<String>, error: impl Into<String>) -> Self {
        self.index_file = non_blank(index.into());
        self.error_file = non_blank(error.into());
        self
    }

    pub fn with_app_path(mut self, path: impl Into<String>) -> Self {
        self.app_path = non_blank(path.into());
        self
    }

    pub fn index_file(&self) -> &str {
        self.index_file.as_deref().unwrap_or(DEFAULT_INDEX_FILE)
    }

    pub fn error_file(&self) -> &str {
        self.error_file.as_deref().unwrap_or(DEFAULT_ERROR_FILE)
    }
}

macro_rules! impl_into_block {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for Block {
                fn from(block: $variant) -> Self {
                    Block::$variant(block)
                }
            }
        )*
    };
}

impl_into_block!(Vpc, WebServer, Database, StorageContainer, StaticWebsite);

/// A directed edge between two blocks (or a block and the Internet).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub id: String,
    pub source_id: String,
    pub destination_id: String,
    /// Kept signed and wide so that out-of-range ports reach the validator.
    #[serde(default)]
    pub ports: Vec<i64>,
}

impl Connection {
    pub fn new(
        id: impl Into<String>,
        source_id: impl Into<String>,
        destination_id: impl Into<String>,
        ports: Vec<i64>,
    ) -> Self {
        Self {
            id: id.into(),
            source_id: source_id.into(),
            destination_id: destination_id.into(),
            ports,
        }
    }

    /// Whether either end of this connection is the Internet.
    pub fn touches_internet(&self) -> bool {
        self.source_id == INTERNET || self.destination_id == INTERNET
    }
}

fn non_blank(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.and_then(non_blank))
}

//! Intermediate representation produced by the tree builder.
//!
//! Each element corresponds to one diagram block or connection and carries
//! the names assigned to it for the generated script. Elements are only
//! constructed by [`crate::tree::TreeBuilder`].

use std::fmt;

/// Variant tag of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Vpc,
    Compute,
    Database,
    Bucket,
    SecurityGroupRule,
}

/// Lightweight reference to an element emitted earlier in the sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef {
    pub id: String,
    pub variable_name: String,
    pub resource_name: String,
    pub kind: ElementKind,
}

impl ElementRef {
    pub fn is_vpc(&self) -> bool {
        self.kind == ElementKind::Vpc
    }

    /// Variable holding the security group created for this element.
    pub fn security_group_variable(&self) -> String {
        format!("{}_sg", self.variable_name)
    }
}

/// Supported managed database engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatabaseEngine {
    MySql,
    Postgres,
}

impl DatabaseEngine {
    pub fn parse(engine: &str) -> Option<Self> {
        match engine {
            "mysql" => Some(DatabaseEngine::MySql),
            "postgres" => Some(DatabaseEngine::Postgres),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseEngine::MySql => "mysql",
            DatabaseEngine::Postgres => "postgres",
        }
    }
}

impl fmt::Display for DatabaseEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VpcElement {
    pub id: String,
    pub variable_name: String,
    pub resource_name: String,
}

impl VpcElement {
    pub fn to_ref(&self) -> ElementRef {
        ElementRef {
            id: self.id.clone(),
            variable_name: self.variable_name.clone(),
            resource_name: self.resource_name.clone(),
            kind: ElementKind::Vpc,
        }
    }
}

/// A web server instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputeElement {
    pub id: String,
    pub variable_name: String,
    pub resource_name: String,
    pub vpc: ElementRef,
    pub instance_type: String,
    pub is_public: bool,
    /// The remaining fields are already escaped for string literals.
    pub ami_id: Option<String>,
    pub availability_zone: String,
    pub user_data: Option<String>,
    pub app_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseElement {
    pub id: String,
    pub variable_name: String,
    pub resource_name: String,
    pub vpc: ElementRef,
    pub instance_type: String,
    pub engine: DatabaseEngine,
    pub is_public: bool,
    pub database_name: String,
}

/// Static website hosting configuration of a bucket. Both names are
/// escaped for string literals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebsiteDocuments {
    pub index: String,
    pub error: String,
}

/// A storage bucket, optionally hosting a static website.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketElement {
    pub id: String,
    pub variable_name: String,
    pub resource_name: String,
    pub website: Option<WebsiteDocuments>,
    /// Escaped for string literals.
    pub app_path: Option<String>,
}

/// Port rules derived from one connection inside a VPC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityGroupRule {
    pub id: String,
    pub source: ElementRef,
    pub target: ElementRef,
    pub ports: Vec<u16>,
    pub protocol: String,
}

impl SecurityGroupRule {
    /// The non-VPC endpoint when one side of the rule is a VPC.
    pub fn boundary_endpoint(&self) -> Option<&ElementRef> {
        if self.source.is_vpc() {
            Some(&self.target)
        } else if self.target.is_vpc() {
            Some(&self.source)
        } else {
            None
        }
    }
}

/// One unit of the ordered compilation sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    Vpc(VpcElement),
    Compute(ComputeElement),
    Database(DatabaseElement),
    Bucket(BucketElement),
    SecurityGroupRule(SecurityGroupRule),
}

impl Element {
    /// Id of the originating block or connection.
    pub fn id(&self) -> &str {
        match self {
            Element::Vpc(e) => &e.id,
            Element::Compute(e) => &e.id,
            Element::Database(e) => &e.id,
            Element::Bucket(e) => &e.id,
            Element::SecurityGroupRule(e) => &e.id,
        }
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            Element::Vpc(_) => ElementKind::Vpc,
            Element::Compute(_) => ElementKind::Compute,
            Element::Database(_) => ElementKind::Database,
            Element::Bucket(_) => ElementKind::Bucket,
            Element::SecurityGroupRule(_) => ElementKind::SecurityGroupRule,
        }
    }

    /// Script variable bound to this element. Rules have none.
    pub fn variable_name(&self) -> Option<&str> {
        match self {
            Element::Vpc(e) => Some(&e.variable_name),
            Element::Compute(e) => Some(&e.variable_name),
            Element::Database(e) => Some(&e.variable_name),
            Element::Bucket(e) => Some(&e.variable_name),
            Element::SecurityGroupRule(_) => None,
        }
    }

    pub fn resource_name(&self) -> Option<&str> {
        match self {
            Element::Vpc(e) => Some(&e.resource_name),
            Element::Compute(e) => Some(&e.resource_name),
            Element::Database(e) => Some(&e.resource_name),
            Element::Bucket(e) => Some(&e.resource_name),
            Element::SecurityGroupRule(_) => None,
        }
    }

    /// Reference usable by later elements, if this element is nameable.
    pub fn to_ref(&self) -> Option<ElementRef> {
        Some(ElementRef {
            id: self.id().to_string(),
            variable_name: self.variable_name()?.to_string(),
            resource_name: self.resource_name()?.to_string(),
            kind: self.kind(),
        })
    }
}

/// Escape user-supplied text so it survives inside a single- or
/// double-quoted string literal of the generated script.
pub fn escape_literal(value: &str) -> String {
    value
        .replace('\r', "")
        .replace('\n', "\\n")
        .replace('"', "\\\"")
        .replace('\'', "\\'")
}

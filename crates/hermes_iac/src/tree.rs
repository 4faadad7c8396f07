//! Linearization of a validated diagram into an ordered element sequence.
//!
//! Every element appears after the elements it references: a VPC is
//! followed by its children, then by the rules derived from connections
//! inside it. Buckets have no dependencies and are emitted where they
//! appear in the diagram.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::config::CompilerConfig;
use crate::diagram::{
    Block, Connection, Database, Diagram, StaticWebsite, StorageContainer, Vpc, WebServer,
    INTERNET,
};
use crate::element::{
    escape_literal, BucketElement, ComputeElement, DatabaseElement, DatabaseEngine, Element,
    ElementRef, SecurityGroupRule, VpcElement, WebsiteDocuments,
};
use crate::error::BuildError;

/// Builds the element sequence for one compilation.
///
/// Owns the naming counters, so a builder must not be reused across
/// diagrams.
pub struct TreeBuilder<'a> {
    diagram: &'a Diagram,
    config: &'a CompilerConfig,
    variable_counter: u32,
    resource_counters: HashMap<String, u32>,
    elements: Vec<Element>,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(diagram: &'a Diagram, config: &'a CompilerConfig) -> Self {
        Self {
            diagram,
            config,
            variable_counter: 0,
            resource_counters: HashMap::new(),
            elements: Vec::new(),
        }
    }

    /// Consume the builder and produce the ordered elements.
    pub fn build(mut self) -> Result<Vec<Element>, BuildError> {
        let diagram = self.diagram;

        for block in &diagram.blocks {
            match block {
                Block::Vpc(vpc) => self.add_vpc(vpc)?,
                Block::StorageContainer(container) => self.add_storage_container(container),
                Block::StaticWebsite(website) => self.add_static_website(website),
                Block::WebServer(_) | Block::Database(_) => {
                    return Err(BuildError::MisplacedBlock {
                        id: block.id().to_string(),
                        kind: block.kind(),
                    });
                }
            }
        }

        for connection in &diagram.connections {
            self.check_endpoints(connection)?;
        }

        info!(
            "Built {} elements for diagram {:?}",
            self.elements.len(),
            diagram.name
        );
        Ok(self.elements)
    }

    fn add_vpc(&mut self, vpc: &Vpc) -> Result<(), BuildError> {
        let diagram = self.diagram;
        let element = VpcElement {
            id: vpc.id.clone(),
            variable_name: self.next_variable_name(),
            resource_name: self.next_resource_name(&vpc.name),
        };
        let vpc_ref = element.to_ref();
        self.push(Element::Vpc(element));
        let connections = connections_in_vpc(vpc, &diagram.connections);

        for child in &vpc.children {
            let is_public = connections.iter().any(|c| {
                (c.source_id == vpc.id && c.destination_id == child.id())
                    || (c.destination_id == vpc.id && c.source_id == child.id())
            });

            match child {
                Block::WebServer(server) => self.add_web_server(server, &vpc_ref, is_public),
                Block::Database(database) => self.add_database(database, &vpc_ref, is_public)?,
                _ => {
                    return Err(BuildError::MisplacedBlock {
                        id: child.id().to_string(),
                        kind: child.kind(),
                    });
                }
            }
        }

        for connection in connections {
            self.add_connection(connection)?;
        }

        Ok(())
    }

    fn add_web_server(&mut self, server: &WebServer, vpc: &ElementRef, is_public: bool) {
        let element = Element::Compute(ComputeElement {
            id: server.id.clone(),
            variable_name: self.next_variable_name(),
            resource_name: self.next_resource_name(&server.name),
            vpc: vpc.clone(),
            instance_type: self.config.compute_instance_type.clone(),
            is_public,
            ami_id: server.ami_id.as_deref().map(escape_literal),
            availability_zone: escape_literal(server.availability_zone()),
            user_data: server.user_data_script.as_deref().map(escape_literal),
            app_path: server.app_path.as_deref().map(escape_literal),
        });
        self.push(element);
    }

    fn add_database(
        &mut self,
        database: &Database,
        vpc: &ElementRef,
        is_public: bool,
    ) -> Result<(), BuildError> {
        let engine = DatabaseEngine::parse(&database.engine).ok_or_else(|| {
            BuildError::UnsupportedEngine {
                id: database.id.clone(),
                engine: database.engine.clone(),
            }
        })?;
        let variable_name = self.next_variable_name();
        let resource_name = self.next_resource_name(&database.name);
        let database_name = format!(
            "{}-{}-{}",
            self.config.database_name_prefix, self.diagram.name, resource_name
        );

        let element = Element::Database(DatabaseElement {
            id: database.id.clone(),
            variable_name,
            resource_name,
            vpc: vpc.clone(),
            instance_type: self.config.database_instance_type.clone(),
            engine,
            is_public,
            database_name,
        });
        self.push(element);
        Ok(())
    }

    fn add_storage_container(&mut self, container: &StorageContainer) {
        let element = Element::Bucket(BucketElement {
            id: container.id.clone(),
            variable_name: self.next_variable_name(),
            resource_name: self.next_resource_name(&container.name),
            website: None,
            app_path: None,
        });
        self.push(element);
    }

    fn add_static_website(&mut self, website: &StaticWebsite) {
        let element = Element::Bucket(BucketElement {
            id: website.id.clone(),
            variable_name: self.next_variable_name(),
            resource_name: self.next_resource_name(&website.name),
            website: Some(WebsiteDocuments {
                index: escape_literal(website.index_file()),
                error: escape_literal(website.error_file()),
            }),
            app_path: website.app_path.as_deref().map(escape_literal),
        });
        self.push(element);
    }

    fn add_connection(&mut self, connection: &Connection) -> Result<(), BuildError> {
        let source = self.resolve(connection, &connection.source_id)?;
        let target = self.resolve(connection, &connection.destination_id)?;
        let ports = connection
            .ports
            .iter()
            .map(|&port| {
                u16::try_from(port)
                    .ok()
                    .filter(|p| *p != 0)
                    .ok_or_else(|| BuildError::InvalidPort {
                        connection_id: connection.id.clone(),
                        port,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.push(Element::SecurityGroupRule(SecurityGroupRule {
            id: connection.id.clone(),
            source,
            target,
            ports,
            protocol: self.config.protocol.clone(),
        }));
        Ok(())
    }

    /// Every endpoint other than the Internet must name an emitted element,
    /// including connections that produced no rule.
    fn check_endpoints(&self, connection: &Connection) -> Result<(), BuildError> {
        for endpoint_id in [&connection.source_id, &connection.destination_id] {
            if endpoint_id.as_str() != INTERNET {
                self.resolve(connection, endpoint_id)?;
            }
        }
        Ok(())
    }

    /// Find an already emitted element for a connection endpoint.
    fn resolve(&self, connection: &Connection, endpoint_id: &str) -> Result<ElementRef, BuildError> {
        self.elements
            .iter()
            .filter(|element| element.variable_name().is_some())
            .find(|element| element.id() == endpoint_id)
            .and_then(Element::to_ref)
            .ok_or_else(|| BuildError::DanglingReference {
                connection_id: connection.id.clone(),
                endpoint_id: endpoint_id.to_string(),
            })
    }

    fn push(&mut self, element: Element) {
        debug!("Emitting {:?} element for {}", element.kind(), element.id());
        self.elements.push(element);
    }

    fn next_variable_name(&mut self) -> String {
        self.variable_counter += 1;
        format!("a{}", self.variable_counter)
    }

    fn next_resource_name(&mut self, base: &str) -> String {
        let counter = self.resource_counters.entry(base.to_string()).or_insert(0);
        *counter += 1;
        format!("{}{}", base, counter)
    }
}

/// Connections that stay inside a VPC: those touching the VPC itself or one
/// of its children, excluding any that reach the Internet.
fn connections_in_vpc<'c>(vpc: &Vpc, connections: &'c [Connection]) -> Vec<&'c Connection> {
    connections
        .iter()
        .filter(|c| !c.touches_internet())
        .filter(|c| vpc.in_scope(&c.source_id) || vpc.in_scope(&c.destination_id))
        .collect()
}

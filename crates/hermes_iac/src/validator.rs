//! Semantic validation of diagrams.
//!
//! Checks run in a fixed order and stop at the first violation:
//! names, containment, database engines, then connections.

use tracing::debug;

use crate::diagram::{Block, Connection, Diagram, INTERNET};
use crate::error::ValidationError;

/// Characters rejected in the diagram name, checked in this order.
const DIAGRAM_NAME_FORBIDDEN: &[char] = &['-', '_', '"', '\'', '\n'];

/// Characters rejected in block names, checked in this order.
const BLOCK_NAME_FORBIDDEN: &[char] = &['\n', '"', '\''];

pub const SUPPORTED_ENGINES: &[&str] = &["mysql", "postgres"];

/// Validator for diagrams. Stateless; the same diagram always yields the
/// same result.
pub struct Validator;

impl Validator {
    /// Validate a whole diagram.
    pub fn check_diagram(diagram: &Diagram) -> Result<(), ValidationError> {
        debug!(
            "Validating diagram {:?} ({} blocks, {} connections)",
            diagram.name,
            diagram.blocks.len(),
            diagram.connections.len()
        );

        check_characters(&diagram.name, DIAGRAM_NAME_FORBIDDEN)?;

        for block in &diagram.blocks {
            Self::check_block(block, diagram)?;
            for child in block.children() {
                Self::check_block(child, diagram)?;
            }
        }

        for connection in &diagram.connections {
            Self::check_connection(connection, diagram)?;
        }

        Ok(())
    }

    fn check_block(block: &Block, diagram: &Diagram) -> Result<(), ValidationError> {
        check_characters(block.name(), BLOCK_NAME_FORBIDDEN)?;

        let kind = block.kind();
        let parents = diagram
            .vpcs()
            .filter(|vpc| vpc.has_child(block.id()))
            .count();

        // WebServers and Databases belong to exactly one VPC.
        if kind.requires_vpc() && parents != 1 {
            return Err(ValidationError::MustBeInsideVpc { kind });
        }

        if !kind.requires_vpc() && parents > 0 {
            return Err(ValidationError::MustNotBeInsideVpc { kind });
        }

        if let Block::Database(database) = block {
            if !SUPPORTED_ENGINES.contains(&database.engine.as_str()) {
                return Err(ValidationError::InvalidEngine {
                    engine: database.engine.clone(),
                });
            }
        }

        Ok(())
    }

    fn check_connection(connection: &Connection, diagram: &Diagram) -> Result<(), ValidationError> {
        if !connection.touches_internet() {
            if connection.source_id == connection.destination_id {
                return Err(ValidationError::SelfConnection {
                    connection_id: connection.id.clone(),
                });
            }

            for vpc in diagram.vpcs() {
                let source_inside = vpc.in_scope(&connection.source_id);
                let destination_inside = vpc.in_scope(&connection.destination_id);
                if source_inside != destination_inside {
                    return Err(ValidationError::CrossVpcConnection {
                        connection_id: connection.id.clone(),
                    });
                }
            }
        }

        if let Some(&port) = connection
            .ports
            .iter()
            .find(|port| !(1..=65535).contains(*port))
        {
            return Err(ValidationError::PortRange { port });
        }

        let is_storage = |id: &str| {
            id != INTERNET
                && diagram
                    .find_block(id)
                    .map(|block| block.kind().is_storage())
                    .unwrap_or(false)
        };
        if is_storage(&connection.source_id) && is_storage(&connection.destination_id) {
            return Err(ValidationError::StorageEndpoint {
                connection_id: connection.id.clone(),
            });
        }

        Ok(())
    }
}

fn check_characters(value: &str, forbidden: &[char]) -> Result<(), ValidationError> {
    match forbidden.iter().find(|c| value.contains(**c)) {
        Some(&character) => Err(ValidationError::IllegalCharacter {
            character,
            value: value.to_string(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagram::{BlockKind, Database, StaticWebsite, StorageContainer, Vpc, WebServer};

    fn diagram(blocks: Vec<Block>, connections: Vec<Connection>) -> Diagram {
        Diagram::new("id", "mydiagram", blocks, connections)
    }

    fn message(diagram: &Diagram) -> String {
        Validator::check_diagram(diagram).unwrap_err().to_string()
    }

    #[test]
    fn test_empty_diagram_is_valid() {
        assert!(Validator::check_diagram(&diagram(vec![], vec![])).is_ok());
    }

    #[test]
    fn test_invalid_diagram_name() {
        let diagram = Diagram::new("id", "my-diagram", vec![], vec![]);
        let err = Validator::check_diagram(&diagram).unwrap_err();

        assert_eq!(
            err,
            ValidationError::IllegalCharacter {
                character: '-',
                value: "my-diagram".to_string()
            }
        );
        assert_eq!(err.to_string(), "Found illegal - character in my-diagram");
    }

    #[test]
    fn test_diagram_name_rejects_underscore_but_block_name_does_not() {
        let diagram = Diagram::new("id", "my_diagram", vec![], vec![]);
        assert!(matches!(
            Validator::check_diagram(&diagram),
            Err(ValidationError::IllegalCharacter { character: '_', .. })
        ));

        let vpc = Vpc::new("1", "my_vpc", vec![WebServer::new("2", "web-server").into()]);
        let ok = Diagram::new("id", "mydiagram", vec![vpc.into()], vec![]);
        assert!(Validator::check_diagram(&ok).is_ok());
    }

    #[test]
    fn test_invalid_web_server_name() {
        let vpc = Vpc::new("2", "vpc", vec![WebServer::new("1", "block'").into()]);
        assert_eq!(
            message(&diagram(vec![vpc.into()], vec![])),
            "Found illegal ' character in block'"
        );
    }

    #[test]
    fn test_invalid_database_name() {
        let vpc = Vpc::new("2", "vpc", vec![Database::new("1", "block\"", "mysql").into()]);
        assert_eq!(
            message(&diagram(vec![vpc.into()], vec![])),
            "Found illegal \" character in block\""
        );
    }

    #[test]
    fn test_web_server_outside_vpc() {
        let blocks = vec![
            Vpc::new("2", "vpc", vec![]).into(),
            WebServer::new("1", "block").into(),
        ];
        let err = Validator::check_diagram(&diagram(blocks, vec![])).unwrap_err();

        assert_eq!(
            err,
            ValidationError::MustBeInsideVpc {
                kind: BlockKind::WebServer
            }
        );
        assert_eq!(err.to_string(), "All WebServers must be inside a VPC");
    }

    #[test]
    fn test_database_outside_vpc() {
        let blocks = vec![
            Vpc::new("2", "vpc", vec![]).into(),
            Database::new("1", "block", "postgres").into(),
        ];
        assert_eq!(
            message(&diagram(blocks, vec![])),
            "All Databases must be inside a VPC"
        );
    }

    #[test]
    fn test_web_server_in_two_vpcs() {
        let shared = WebServer::new("w", "block");
        let blocks = vec![
            Vpc::new("v1", "vpc", vec![shared.clone().into()]).into(),
            Vpc::new("v2", "vpc", vec![shared.into()]).into(),
        ];

        assert_eq!(
            Validator::check_diagram(&diagram(blocks, vec![])),
            Err(ValidationError::MustBeInsideVpc {
                kind: BlockKind::WebServer
            })
        );
    }

    #[test]
    fn test_storage_inside_vpc() {
        let vpc = Vpc::new("2", "vpc", vec![StorageContainer::new("1", "block").into()]);
        assert_eq!(
            message(&diagram(vec![vpc.into()], vec![])),
            "StorageContainers cannot be inside other VPCs"
        );

        let site = StaticWebsite::new("1", "block").with_documents("index.html", "error.html");
        let vpc = Vpc::new("2", "vpc", vec![site.into()]);
        assert_eq!(
            message(&diagram(vec![vpc.into()], vec![])),
            "StaticWebsites cannot be inside other VPCs"
        );
    }

    #[test]
    fn test_vpc_inside_vpc() {
        let inner = Vpc::new("1", "vpc1", vec![]);
        let outer = Vpc::new("2", "vpc2", vec![inner.clone().into()]);
        assert_eq!(
            message(&diagram(vec![inner.into(), outer.into()], vec![])),
            "VPCs cannot be inside other VPCs"
        );
    }

    #[test]
    fn test_invalid_database_engine() {
        let vpc = Vpc::new("2", "vpc", vec![Database::new("1", "block", "Postgres").into()]);
        let err = Validator::check_diagram(&diagram(vec![vpc.into()], vec![])).unwrap_err();

        assert_eq!(
            err,
            ValidationError::InvalidEngine {
                engine: "Postgres".to_string()
            }
        );
        assert_eq!(
            err.to_string(),
            "Database engine must be either \"postgres\" or \"mysql\""
        );
    }

    #[test]
    fn test_self_connection() {
        let vpc = Vpc::new("1", "vpc", vec![WebServer::new("2", "webserver").into()]);
        let con = Connection::new("3", "2", "2", vec![80]);
        assert_eq!(
            message(&diagram(vec![vpc.into()], vec![con])),
            "Connection source and destination cannot be the same"
        );
    }

    #[test]
    fn test_connections_between_vpcs() {
        let vpc1: Block = Vpc::new("1", "vpc", vec![WebServer::new("2", "webserver").into()]).into();
        let vpc2: Block = Vpc::new("5", "vpc", vec![WebServer::new("4", "webserver2").into()]).into();

        for (source, destination) in [("2", "4"), ("2", "5"), ("1", "5")] {
            let con = Connection::new("3", source, destination, vec![80]);
            let err = Validator::check_diagram(&diagram(vec![vpc1.clone(), vpc2.clone()], vec![con]))
                .unwrap_err();
            assert!(matches!(err, ValidationError::CrossVpcConnection { .. }));
        }
    }

    #[test]
    fn test_connection_into_vpc_from_outside_is_rejected() {
        let vpc: Block = Vpc::new("1", "vpc", vec![WebServer::new("2", "webserver").into()]).into();
        let bucket: Block = StorageContainer::new("3", "bucket").into();
        let con = Connection::new("4", "3", "2", vec![80]);

        assert!(matches!(
            Validator::check_diagram(&diagram(vec![vpc, bucket], vec![con])),
            Err(ValidationError::CrossVpcConnection { .. })
        ));
    }

    #[test]
    fn test_internet_connections_skip_scope_checks() {
        let vpc: Block = Vpc::new("1", "vpc", vec![WebServer::new("2", "webserver").into()]).into();
        let connections = vec![
            Connection::new("3", INTERNET, "2", vec![80]),
            Connection::new("4", "1", INTERNET, vec![443]),
            Connection::new("5", INTERNET, INTERNET, vec![22]),
        ];
        assert!(Validator::check_diagram(&diagram(vec![vpc], connections)).is_ok());
    }

    #[test]
    fn test_illegal_port_number() {
        let vpc: Block = Vpc::new("1", "vpc", vec![WebServer::new("2", "webserver").into()]).into();

        for port in [0, 65536] {
            let con = Connection::new("3", "1", "2", vec![80, port]);
            let err = Validator::check_diagram(&diagram(vec![vpc.clone()], vec![con])).unwrap_err();
            assert_eq!(err, ValidationError::PortRange { port });
        }

        let con = Connection::new("3", "1", "2", vec![1, 65535]);
        assert!(Validator::check_diagram(&diagram(vec![vpc], vec![con])).is_ok());
    }

    #[test]
    fn test_internet_connection_ports_are_checked() {
        let bucket: Block = StorageContainer::new("1", "bucket").into();
        let con = Connection::new("2", INTERNET, "1", vec![70000]);
        assert_eq!(
            Validator::check_diagram(&diagram(vec![bucket], vec![con])),
            Err(ValidationError::PortRange { port: 70000 })
        );
    }

    #[test]
    fn test_storage_to_storage_connection() {
        let blocks = vec![
            StorageContainer::new("1", "bucket").into(),
            StaticWebsite::new("2", "site").into(),
        ];
        let con = Connection::new("3", "1", "2", vec![80]);
        assert_eq!(
            message(&diagram(blocks, vec![con])),
            "StorageContainers and StaticWebsites can only be connected to the Internet"
        );
    }

    #[test]
    fn test_rule_order_reports_first_violation() {
        // Bad engine and bad port: the block rule runs first.
        let vpc: Block = Vpc::new("1", "vpc", vec![Database::new("2", "db", "oracle").into()]).into();
        let con = Connection::new("3", "1", "2", vec![0]);
        assert!(matches!(
            Validator::check_diagram(&diagram(vec![vpc], vec![con])),
            Err(ValidationError::InvalidEngine { .. })
        ));
    }

    #[test]
    fn test_validation_is_repeatable() {
        let vpc: Block = Vpc::new("1", "vpc", vec![WebServer::new("2", "webserver").into()]).into();
        let bad = diagram(vec![vpc], vec![Connection::new("3", "2", "2", vec![80])]);

        assert_eq!(Validator::check_diagram(&bad), Validator::check_diagram(&bad));
    }
}

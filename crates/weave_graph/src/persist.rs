// SPDX-License-Identifier: MIT OR Apache-2.0
//! Saving and loading packages.
//!
//! A [`PackageDef`] is the plain-data form of a package: its declared
//! sockets, nodes (with nested package definitions inline) and links.
//! Loading re-resolves every type name through a [`Registry`] and rebuilds
//! the graph through the same validated edit operations the editor uses, so
//! a document with an unknown type or an invalid link is rejected whole.

use crate::element::Element;
use crate::link::{LinkId, SocketAddr};
use crate::node::{Node, NodeId};
use crate::package::{GraphError, Package};
use crate::registry::Registry;
use crate::socket::{Socket, SocketDirection};
use crate::value::{Value, ValueType};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current package document format version
pub const FORMAT_VERSION: u32 = 1;

/// A socket's declared signature, and its manual value when unconnected
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocketDef {
    /// Socket name
    pub name: String,
    /// Socket type
    pub value_type: ValueType,
    /// Stored value, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl SocketDef {
    fn from_socket(socket: &Socket, keep_value: bool) -> Self {
        Self {
            name: socket.name.clone(),
            value_type: socket.value_type(),
            value: if keep_value { socket.value().cloned() } else { None },
        }
    }
}

/// A node in a package document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDef {
    /// Node ID within the package
    pub id: NodeId,
    /// Registry type name
    pub type_name: String,
    /// Display name
    pub name: String,
    /// Canvas position
    pub position: [f32; 2],
    /// Input signature
    pub inputs: Vec<SocketDef>,
    /// Output signature
    pub outputs: Vec<SocketDef>,
    /// Element configuration value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
    /// Definition of a nested package
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<Box<PackageDef>>,
}

/// A link in a package document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkDef {
    /// Link ID
    pub id: LinkId,
    /// Source node
    pub from_node: NodeId,
    /// Source output index
    pub from_socket: usize,
    /// Target node
    pub to_node: NodeId,
    /// Target input index
    pub to_socket: usize,
}

/// A complete package document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageDef {
    /// Format version
    pub version: u32,
    /// Package name
    pub name: String,
    /// Description
    #[serde(default)]
    pub description: String,
    /// Icon resource path
    #[serde(default)]
    pub icon: String,
    /// Declared package inputs
    pub inputs: Vec<SocketDef>,
    /// Declared package outputs
    pub outputs: Vec<SocketDef>,
    /// Canvas position of the `Inputs` pseudo-node
    pub inputs_position: [f32; 2],
    /// Canvas position of the `Outputs` pseudo-node
    pub outputs_position: [f32; 2],
    /// Next node id to hand out
    pub next_id: u64,
    /// Nodes, excluding the pseudo-nodes
    pub nodes: Vec<NodeDef>,
    /// Links
    pub links: Vec<LinkDef>,
}

impl PackageDef {
    /// Serialize to RON format
    pub fn to_ron(&self) -> Result<String, PersistError> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    /// Deserialize from RON format, rejecting newer format versions
    pub fn from_ron(s: &str) -> Result<Self, PersistError> {
        let def: Self = ron::from_str(s)?;
        if def.version > FORMAT_VERSION {
            return Err(PersistError::UnsupportedVersion {
                found: def.version,
                supported: FORMAT_VERSION,
            });
        }
        Ok(def)
    }
}

impl Package {
    /// Capture the package as a document
    pub fn to_def(&self) -> PackageDef {
        let position = |id: NodeId| self.node(id).map_or([0.0, 0.0], Node::position);

        let nodes = self
            .nodes()
            .filter(|node| !node.id().is_reserved())
            .map(|node| {
                let sockets = node.sockets();
                let inputs = sockets
                    .inputs()
                    .iter()
                    .enumerate()
                    .map(|(index, socket)| {
                        let connected = self.link_into(SocketAddr::input(node.id(), index)).is_some();
                        SocketDef::from_socket(socket, !connected)
                    })
                    .collect();
                let outputs = sockets
                    .outputs()
                    .iter()
                    .map(|socket| SocketDef::from_socket(socket, false))
                    .collect();
                NodeDef {
                    id: node.id(),
                    type_name: node.type_name().to_string(),
                    name: node.name().to_string(),
                    position: node.position(),
                    inputs,
                    outputs,
                    config: node.element().config(),
                    package: node.element().as_package().map(|nested| Box::new(nested.to_def())),
                }
            })
            .collect();

        let links = self
            .links()
            .map(|link| LinkDef {
                id: link.id,
                from_node: link.from_node,
                from_socket: link.from_socket,
                to_node: link.to_node,
                to_socket: link.to_socket,
            })
            .collect();

        PackageDef {
            version: FORMAT_VERSION,
            name: self.name.clone(),
            description: self.description.clone(),
            icon: self.icon.clone(),
            inputs: self
                .sockets()
                .inputs()
                .iter()
                .map(|socket| SocketDef::from_socket(socket, true))
                .collect(),
            outputs: self
                .sockets()
                .outputs()
                .iter()
                .map(|socket| SocketDef::from_socket(socket, false))
                .collect(),
            inputs_position: position(NodeId::INPUTS),
            outputs_position: position(NodeId::OUTPUTS),
            next_id: self.next_id,
            nodes,
            links,
        }
    }

    /// Rebuild a package from a document.
    ///
    /// The package is assembled off to the side and only returned once every
    /// node and link has been validated.
    pub fn from_def(def: &PackageDef, registry: &Registry) -> Result<Package, PersistError> {
        let mut package = Package::new(def.name.clone());
        package.description = def.description.clone();
        package.icon = def.icon.clone();

        for socket in &def.inputs {
            let index = package.add_input(socket.value_type, &socket.name)?;
            if let Some(value) = &socket.value {
                package.set_input(index, value.clone())?;
            }
        }
        for socket in &def.outputs {
            package.add_output(socket.value_type, &socket.name)?;
        }
        package.move_node(NodeId::INPUTS, def.inputs_position)?;
        package.move_node(NodeId::OUTPUTS, def.outputs_position)?;

        for node_def in &def.nodes {
            if node_def.id.is_reserved() {
                return Err(GraphError::ReservedNode(node_def.id).into());
            }
            if package.node(node_def.id).is_some() {
                return Err(GraphError::DuplicateNode(node_def.id).into());
            }

            let mut element: Box<dyn Element> = match &node_def.package {
                Some(nested) if node_def.type_name == Package::TYPE => {
                    Box::new(Package::from_def(nested, registry)?)
                }
                Some(_) => {
                    return Err(PersistError::Malformed(format!(
                        "node {} of type '{}' carries a nested package",
                        node_def.id, node_def.type_name
                    )))
                }
                None => registry
                    .create(&node_def.type_name)
                    .map_err(|_| GraphError::UnknownType(node_def.type_name.clone()))?,
            };

            reconcile(element.as_mut(), SocketDirection::Input, &node_def.inputs)?;
            reconcile(element.as_mut(), SocketDirection::Output, &node_def.outputs)?;
            if let Some(config) = &node_def.config {
                element.configure(config.clone()).map_err(GraphError::from)?;
            }
            for (index, socket) in node_def.inputs.iter().enumerate() {
                if let Some(value) = &socket.value {
                    element
                        .sockets_mut()
                        .write(SocketDirection::Input, index, value.clone())
                        .map_err(GraphError::from)?;
                }
            }

            package.insert_node(
                Node::new(node_def.id, node_def.name.clone(), element).with_position(node_def.position),
            );
        }
        package.next_id = package.next_id.max(def.next_id);

        for link in &def.links {
            package.connect_with_id(
                link.id,
                SocketAddr::output(link.from_node, link.from_socket),
                SocketAddr::input(link.to_node, link.to_socket),
            )?;
        }

        tracing::debug!(
            package = %package.name,
            nodes = def.nodes.len(),
            links = def.links.len(),
            "loaded package"
        );
        Ok(package)
    }

    /// Serialize to RON format
    pub fn to_ron(&self) -> Result<String, PersistError> {
        self.to_def().to_ron()
    }

    /// Deserialize from RON format
    pub fn from_ron(s: &str, registry: &Registry) -> Result<Package, PersistError> {
        Package::from_def(&PackageDef::from_ron(s)?, registry)
    }

    /// Save package to file
    pub fn save(&self, path: &Path) -> Result<(), PersistError> {
        std::fs::write(path, self.to_ron()?)?;
        Ok(())
    }

    /// Load package from file
    pub fn load(path: &Path, registry: &Registry) -> Result<Package, PersistError> {
        let contents = std::fs::read_to_string(path)?;
        Package::from_ron(&contents, registry)
    }
}

/// Bring an element's socket list in line with a stored signature
fn reconcile(element: &mut dyn Element, direction: SocketDirection, defs: &[SocketDef]) -> Result<(), GraphError> {
    let current = element.sockets().list(direction).len();
    for socket in defs.iter().skip(current) {
        element.add_socket(direction, socket.value_type, &socket.name)?;
    }
    while element.sockets().list(direction).len() > defs.len() {
        element.remove_socket(direction)?;
    }
    for (index, socket) in defs.iter().enumerate() {
        let Some(actual) = element.sockets_mut().get_mut(direction, index) else {
            continue;
        };
        if actual.value_type() != socket.value_type {
            return Err(GraphError::TypeMismatch {
                from: socket.value_type,
                to: actual.value_type(),
            });
        }
        actual.name = socket.name.clone();
    }
    Ok(())
}

/// Error when saving or loading packages and settings
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// File could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Document could not be serialized
    #[error("Serialization error: {0}")]
    Serialize(#[from] ron::Error),

    /// Document could not be parsed
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Document written by a newer format
    #[error("Unsupported format version {found} (supported up to {supported})")]
    UnsupportedVersion {
        /// Version in the document
        found: u32,
        /// Newest version understood
        supported: u32,
    },

    /// Document describes an invalid graph
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Document is structurally inconsistent
    #[error("Malformed document: {0}")]
    Malformed(String),
}

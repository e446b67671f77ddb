// SPDX-License-Identifier: MIT OR Apache-2.0
//! Packages: owned graphs of nodes and links that are elements themselves.
//!
//! Every package contains two reserved pseudo-nodes. The `Inputs` node's
//! outputs mirror the package's own inputs and the `Outputs` node's inputs
//! mirror its own outputs, so a package can sit inside another package as an
//! ordinary node. All graph edits validate first and either apply fully or
//! leave the package untouched.

use crate::config::EngineConfig;
use crate::element::{Element, ElementError, EvaluateError};
use crate::engine::{self, PackageState, Schedule};
use crate::link::{Link, LinkId, SocketAddr};
use crate::node::{Node, NodeId};
use crate::registry::{Registry, RegistryError};
use crate::socket::{Socket, SocketBounds, SocketDirection, SocketError, Sockets};
use crate::value::{Value, ValueType};
use indexmap::IndexMap;
use std::sync::Arc;

/// Element behind the `Inputs` and `Outputs` pseudo-nodes
#[derive(Debug)]
struct Boundary {
    type_name: &'static str,
    sockets: Sockets,
}

impl Boundary {
    fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            sockets: Sockets::new(SocketBounds::unbounded()),
        }
    }
}

impl Element for Boundary {
    fn type_name(&self) -> &str {
        self.type_name
    }

    fn sockets(&self) -> &Sockets {
        &self.sockets
    }

    fn sockets_mut(&mut self) -> &mut Sockets {
        &mut self.sockets
    }

    // Values are moved across the boundary by the owning package.
    fn evaluate(&mut self) -> Result<(), EvaluateError> {
        Ok(())
    }
}

/// A graph of nodes and links that can itself be used as an element
#[derive(Debug)]
pub struct Package {
    /// Package name
    pub name: String,
    /// Description
    pub description: String,
    /// Icon resource path
    pub icon: String,
    /// The package's own sockets, as seen by a parent package
    sockets: Sockets,
    /// Nodes in the package, in insertion order
    pub(crate) nodes: IndexMap<NodeId, Node>,
    /// Links between nodes
    pub(crate) links: IndexMap<LinkId, Link>,
    /// Next id handed to a new node
    pub(crate) next_id: u64,
    /// Evaluation settings
    pub(crate) config: EngineConfig,
    /// Cached evaluation order, dropped on every structural edit
    pub(crate) schedule: Option<Arc<Schedule>>,
    /// Evaluation state
    pub(crate) state: PackageState,
    /// Whether the last internal pass changed nothing
    pub(crate) settled: bool,
    /// Faulting nodes in the last internal pass
    pub(crate) inner_faults: usize,
}

impl Package {
    /// Registry type name of a nested package
    pub const TYPE: &'static str = "package";

    /// Create an empty package holding only its pseudo-nodes
    pub fn new(name: impl Into<String>) -> Self {
        let mut nodes = IndexMap::new();
        nodes.insert(
            NodeId::INPUTS,
            Node::new(NodeId::INPUTS, "Inputs", Box::new(Boundary::new("package/inputs")))
                .with_position([-200.0, 0.0]),
        );
        nodes.insert(
            NodeId::OUTPUTS,
            Node::new(NodeId::OUTPUTS, "Outputs", Box::new(Boundary::new("package/outputs")))
                .with_position([200.0, 0.0]),
        );
        Self {
            name: name.into(),
            description: String::new(),
            icon: "icons/package.png".to_string(),
            sockets: Sockets::new(SocketBounds::unbounded()),
            nodes,
            links: IndexMap::new(),
            next_id: NodeId::FIRST_USER.0,
            config: EngineConfig::default(),
            schedule: None,
            state: PackageState::Idle,
            settled: true,
            inner_faults: 0,
        }
    }

    /// Set the evaluation settings
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.set_config(config);
        self
    }

    /// Evaluation settings
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Replace the evaluation settings, for this package and every nested one
    pub fn set_config(&mut self, config: EngineConfig) {
        for node in self.nodes.values_mut() {
            if let Some(nested) = node.element.as_package_mut() {
                nested.set_config(config.clone());
            }
        }
        self.config = config;
    }

    /// Current evaluation state
    pub fn state(&self) -> &PackageState {
        &self.state
    }

    /// Fault to report on this package's node when nodes inside it faulted
    /// during its last evaluation as a nested element
    pub fn nested_fault(&self) -> Option<EvaluateError> {
        (self.inner_faults > 0).then(|| EvaluateError::Nested {
            package: self.name.clone(),
            faults: self.inner_faults,
        })
    }

    fn invalidate(&mut self) {
        self.schedule = None;
        self.state = PackageState::Idle;
    }

    /// Evaluation order, rebuilt if the graph changed since the last pass
    pub fn schedule(&mut self) -> Arc<Schedule> {
        if let Some(schedule) = &self.schedule {
            return Arc::clone(schedule);
        }
        let schedule = Arc::new(Schedule::build(self));
        tracing::debug!(
            package = %self.name,
            layers = schedule.layers().len(),
            feedback = schedule.feedback_count(),
            "rebuilt schedule"
        );
        self.schedule = Some(Arc::clone(&schedule));
        schedule
    }

    // ---------------------------------------------------------------------
    // Nodes
    // ---------------------------------------------------------------------

    /// Create a node of a registered type
    pub fn add_node(
        &mut self,
        registry: &Registry,
        type_name: &str,
        position: [f32; 2],
    ) -> Result<NodeId, GraphError> {
        let element = registry.create(type_name).map_err(|e| match e {
            RegistryError::UnknownType(t) | RegistryError::DuplicateType(t) => GraphError::UnknownType(t),
        })?;
        let name = registry
            .meta_info(type_name)
            .map_or_else(|| type_name.to_string(), |info| info.name.to_string());
        Ok(self.add_element(name, element, position))
    }

    /// Insert an already built element as a new node
    pub fn add_element(
        &mut self,
        name: impl Into<String>,
        element: Box<dyn Element>,
        position: [f32; 2],
    ) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.insert_node(Node::new(id, name, element).with_position(position));
        id
    }

    /// Insert a nested package as a new node
    pub fn add_package(&mut self, package: Package, position: [f32; 2]) -> NodeId {
        let name = package.name.clone();
        self.add_element(name, Box::new(package), position)
    }

    pub(crate) fn insert_node(&mut self, mut node: Node) {
        if let Some(nested) = node.element.as_package_mut() {
            nested.set_config(self.config.clone());
        }
        tracing::debug!(package = %self.name, node = %node.id, type_name = node.type_name(), "added node");
        self.next_id = self.next_id.max(node.id.0 + 1);
        self.nodes.insert(node.id, node);
        self.invalidate();
    }

    /// Remove a node and every link touching it
    pub fn remove_node(&mut self, node_id: NodeId) -> Result<Node, GraphError> {
        if node_id.is_reserved() {
            return Err(GraphError::ReservedNode(node_id));
        }
        if !self.nodes.contains_key(&node_id) {
            return Err(GraphError::NodeNotFound(node_id));
        }
        self.links.retain(|_, link| !link.involves_node(node_id));
        let node = self
            .nodes
            .shift_remove(&node_id)
            .ok_or(GraphError::NodeNotFound(node_id))?;
        tracing::debug!(package = %self.name, node = %node_id, "removed node");
        self.invalidate();
        Ok(node)
    }

    /// Rename a node
    pub fn rename_node(&mut self, node_id: NodeId, name: impl Into<String>) -> Result<(), GraphError> {
        self.node_mut(node_id)?.name = name.into();
        Ok(())
    }

    /// Move a node on the canvas
    pub fn move_node(&mut self, node_id: NodeId, position: [f32; 2]) -> Result<(), GraphError> {
        self.node_mut(node_id)?.position = position;
        Ok(())
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    fn node_mut(&mut self, node_id: NodeId) -> Result<&mut Node, GraphError> {
        self.nodes.get_mut(&node_id).ok_or(GraphError::NodeNotFound(node_id))
    }

    /// All nodes, pseudo-nodes first, then in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// All node IDs
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Number of nodes, including the two pseudo-nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Configure a node's element (e.g. a constant's value)
    pub fn configure_node(&mut self, node_id: NodeId, value: Value) -> Result<(), GraphError> {
        self.node_mut(node_id)?.element.configure(value)?;
        Ok(())
    }

    /// Append a socket to a node (variadic elements)
    pub fn add_socket(
        &mut self,
        node_id: NodeId,
        direction: SocketDirection,
        value_type: ValueType,
        name: &str,
    ) -> Result<usize, GraphError> {
        if node_id.is_reserved() {
            return Err(GraphError::ReservedNode(node_id));
        }
        let index = self.node_mut(node_id)?.element.add_socket(direction, value_type, name)?;
        self.invalidate();
        Ok(index)
    }

    /// Remove a node's last socket of a direction, with its links
    pub fn remove_socket(&mut self, node_id: NodeId, direction: SocketDirection) -> Result<(), GraphError> {
        if node_id.is_reserved() {
            return Err(GraphError::ReservedNode(node_id));
        }
        let node = self.node_mut(node_id)?;
        node.element.remove_socket(direction)?;
        let removed = SocketAddr {
            node: node_id,
            direction,
            index: node.sockets().list(direction).len(),
        };
        self.links.retain(|_, link| !link.involves_socket(removed));
        self.invalidate();
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Package sockets
    // ---------------------------------------------------------------------

    /// Declare a new package input, returning its index
    pub fn add_input(&mut self, value_type: ValueType, name: &str) -> Result<usize, GraphError> {
        Ok(self.add_external(SocketDirection::Input, value_type, name)?)
    }

    /// Declare a new package output, returning its index
    pub fn add_output(&mut self, value_type: ValueType, name: &str) -> Result<usize, GraphError> {
        Ok(self.add_external(SocketDirection::Output, value_type, name)?)
    }

    /// Remove the last package input and links from its pseudo socket
    pub fn remove_input(&mut self) -> Result<(), GraphError> {
        Ok(self.remove_external(SocketDirection::Input)?)
    }

    /// Remove the last package output and links into its pseudo socket
    pub fn remove_output(&mut self) -> Result<(), GraphError> {
        Ok(self.remove_external(SocketDirection::Output)?)
    }

    /// The pseudo-node socket mirroring an external socket
    fn mirror(direction: SocketDirection) -> (NodeId, SocketDirection) {
        match direction {
            SocketDirection::Input => (NodeId::INPUTS, SocketDirection::Output),
            SocketDirection::Output => (NodeId::OUTPUTS, SocketDirection::Input),
        }
    }

    fn add_external(
        &mut self,
        direction: SocketDirection,
        value_type: ValueType,
        name: &str,
    ) -> Result<usize, SocketError> {
        let (pseudo, pseudo_direction) = Self::mirror(direction);
        let index = self.sockets.push(direction, Socket::new(name, value_type))?;
        if let Some(node) = self.nodes.get_mut(&pseudo) {
            node.element
                .sockets_mut()
                .push(pseudo_direction, Socket::new(name, value_type))?;
        }
        self.invalidate();
        Ok(index)
    }

    fn remove_external(&mut self, direction: SocketDirection) -> Result<(), SocketError> {
        let (pseudo, pseudo_direction) = Self::mirror(direction);
        self.sockets.pop(direction)?;
        let index = self.sockets.list(direction).len();
        if let Some(node) = self.nodes.get_mut(&pseudo) {
            node.element.sockets_mut().pop(pseudo_direction)?;
        }
        let removed = SocketAddr {
            node: pseudo,
            direction: pseudo_direction,
            index,
        };
        self.links.retain(|_, link| !link.involves_socket(removed));
        self.invalidate();
        Ok(())
    }

    /// Set a package input value (the stimulus for the next tick)
    pub fn set_input(&mut self, index: usize, value: Value) -> Result<(), GraphError> {
        self.sockets.write(SocketDirection::Input, index, value)?;
        Ok(())
    }

    /// Current value of a package output
    pub fn output(&self, index: usize) -> Option<&Value> {
        self.sockets.output(index)?.value()
    }

    // ---------------------------------------------------------------------
    // Links
    // ---------------------------------------------------------------------

    /// Link an output socket to an input socket
    pub fn connect(&mut self, from: SocketAddr, to: SocketAddr) -> Result<LinkId, GraphError> {
        self.connect_with_id(LinkId::new(), from, to)
    }

    pub(crate) fn connect_with_id(
        &mut self,
        id: LinkId,
        from: SocketAddr,
        to: SocketAddr,
    ) -> Result<LinkId, GraphError> {
        let source_node = self.nodes.get(&from.node).ok_or(GraphError::NodeNotFound(from.node))?;
        let target_node = self.nodes.get(&to.node).ok_or(GraphError::NodeNotFound(to.node))?;

        if from.direction != SocketDirection::Output || to.direction != SocketDirection::Input {
            return Err(GraphError::InvalidDirection { from, to });
        }

        let source = source_node
            .sockets()
            .output(from.index)
            .ok_or(GraphError::SocketNotFound(from))?;
        let target = target_node
            .sockets()
            .input(to.index)
            .ok_or(GraphError::SocketNotFound(to))?;

        if self.link_into(to).is_some() {
            return Err(GraphError::AlreadyConnected(to));
        }

        if !source.value_type().can_connect_to(target.value_type()) {
            return Err(GraphError::TypeMismatch {
                from: source.value_type(),
                to: target.value_type(),
            });
        }

        if self.links.contains_key(&id) {
            return Err(GraphError::DuplicateLink(id));
        }

        let link = Link {
            id,
            from_node: from.node,
            from_socket: from.index,
            to_node: to.node,
            to_socket: to.index,
        };
        tracing::debug!(package = %self.name, from = %from, to = %to, "connected");
        self.links.insert(id, link);
        self.invalidate();
        Ok(id)
    }

    /// Remove a link
    pub fn disconnect(&mut self, link_id: LinkId) -> Result<Link, GraphError> {
        let link = self
            .links
            .shift_remove(&link_id)
            .ok_or(GraphError::LinkNotFound(link_id))?;
        tracing::debug!(package = %self.name, from = %link.source(), to = %link.target(), "disconnected");
        self.invalidate();
        Ok(link)
    }

    /// Get a link by ID
    pub fn link(&self, link_id: LinkId) -> Option<&Link> {
        self.links.get(&link_id)
    }

    /// All links
    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    /// Number of links
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// The link feeding an input socket, if any
    pub fn link_into(&self, input: SocketAddr) -> Option<&Link> {
        self.links.values().find(|link| link.target() == input)
    }

    /// Links feeding a node's inputs
    pub fn links_into(&self, node_id: NodeId) -> impl Iterator<Item = &Link> {
        self.links.values().filter(move |link| link.to_node == node_id)
    }

    /// Links leaving a node's outputs
    pub fn links_from(&self, node_id: NodeId) -> impl Iterator<Item = &Link> {
        self.links.values().filter(move |link| link.from_node == node_id)
    }

    // ---------------------------------------------------------------------
    // Values
    // ---------------------------------------------------------------------

    /// Current value of any socket in the package
    pub fn socket_value(&self, socket: SocketAddr) -> Option<&Value> {
        self.nodes.get(&socket.node)?.socket_value(socket.direction, socket.index)
    }

    /// Set the value of an unconnected input socket
    pub fn set_input_value(&mut self, input: SocketAddr, value: Value) -> Result<(), GraphError> {
        if input.direction != SocketDirection::Input {
            return Err(GraphError::InvalidDirection { from: input, to: input });
        }
        if self.link_into(input).is_some() {
            return Err(GraphError::AlreadyConnected(input));
        }
        let node = self.node_mut(input.node)?;
        if node.sockets().input(input.index).is_none() {
            return Err(GraphError::SocketNotFound(input));
        }
        node.element.sockets_mut().write(SocketDirection::Input, input.index, value)?;
        Ok(())
    }

    /// Copy the package's inputs onto the `Inputs` pseudo-node
    pub(crate) fn load_inputs(&mut self) {
        let values: Vec<Option<Value>> = self.sockets.inputs().iter().map(|s| s.value().cloned()).collect();
        if let Some(node) = self.nodes.get_mut(&NodeId::INPUTS) {
            let sockets = node.element.sockets_mut();
            for (index, value) in values.into_iter().enumerate() {
                if let Some(value) = value {
                    if let Err(e) = sockets.write(SocketDirection::Output, index, value) {
                        tracing::warn!(package = %self.name, index, "input not forwarded: {e}");
                    }
                }
            }
        }
    }

    /// Copy the `Outputs` pseudo-node's inputs to the package's outputs
    pub(crate) fn store_outputs(&mut self) {
        let Some(node) = self.nodes.get(&NodeId::OUTPUTS) else {
            return;
        };
        let values: Vec<Option<Value>> = node.sockets().inputs().iter().map(|s| s.value().cloned()).collect();
        for (index, value) in values.into_iter().enumerate() {
            if let Some(value) = value {
                if let Err(e) = self.sockets.write_output(index, value) {
                    tracing::warn!(package = %self.name, index, "output not forwarded: {e}");
                }
            }
        }
    }
}

impl Default for Package {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

impl Element for Package {
    fn type_name(&self) -> &str {
        Self::TYPE
    }

    fn sockets(&self) -> &Sockets {
        &self.sockets
    }

    fn sockets_mut(&mut self) -> &mut Sockets {
        &mut self.sockets
    }

    // Inner faults stay with the inner nodes, which already hold their last
    // values; healthy paths still reach the outputs.
    fn evaluate(&mut self) -> Result<(), EvaluateError> {
        self.load_inputs();
        let report = engine::run_pass(self);
        self.settled = report.changed.is_empty();
        self.inner_faults = report.faults.len();
        self.store_outputs();
        Ok(())
    }

    fn add_socket(
        &mut self,
        direction: SocketDirection,
        value_type: ValueType,
        name: &str,
    ) -> Result<usize, ElementError> {
        Ok(self.add_external(direction, value_type, name)?)
    }

    fn remove_socket(&mut self, direction: SocketDirection) -> Result<(), ElementError> {
        Ok(self.remove_external(direction)?)
    }

    fn reset(&mut self) {
        self.sockets.reset();
        for node in self.nodes.values_mut() {
            node.element.reset();
            node.fault = None;
        }
        self.settled = true;
        self.inner_faults = 0;
        self.state = PackageState::Idle;
    }

    fn is_settled(&self) -> bool {
        self.settled
    }

    fn as_package(&self) -> Option<&Package> {
        Some(self)
    }

    fn as_package_mut(&mut self) -> Option<&mut Package> {
        Some(self)
    }
}

/// Structural error from a graph edit; the package is left unchanged
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    /// Element type is not registered
    #[error("Unknown element type: {0}")]
    UnknownType(String),

    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Node id already in use
    #[error("Duplicate node id: {0}")]
    DuplicateNode(NodeId),

    /// Pseudo-nodes cannot be removed or resized directly
    #[error("Node {0} is reserved")]
    ReservedNode(NodeId),

    /// Socket not found on its node
    #[error("Socket not found: {0}")]
    SocketNotFound(SocketAddr),

    /// Link not found
    #[error("Link not found: {0:?}")]
    LinkNotFound(LinkId),

    /// Link id already in use
    #[error("Duplicate link id: {0:?}")]
    DuplicateLink(LinkId),

    /// Links run from an output to an input
    #[error("Invalid link direction: {from} -> {to}")]
    InvalidDirection {
        /// Offered source
        from: SocketAddr,
        /// Offered target
        to: SocketAddr,
    },

    /// Socket types are incompatible
    #[error("Type mismatch: cannot link {from} to {to}")]
    TypeMismatch {
        /// Source socket type
        from: ValueType,
        /// Target socket type
        to: ValueType,
    },

    /// Input already has an incoming link
    #[error("Input already connected: {0}")]
    AlreadyConnected(SocketAddr),

    /// Element rejected the change (capacity, minimum, configuration)
    #[error(transparent)]
    Element(#[from] ElementError),

    /// Socket rejected the value
    #[error(transparent)]
    Socket(#[from] SocketError),
}

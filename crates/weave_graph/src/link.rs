// SPDX-License-Identifier: MIT OR Apache-2.0
//! Link (edge) definitions for the graph.

use crate::node::NodeId;
use crate::socket::SocketDirection;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkId(pub Uuid);

impl LinkId {
    /// Create a new random link ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LinkId {
    fn default() -> Self {
        Self::new()
    }
}

/// Address of one socket inside a package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SocketAddr {
    /// Owning node
    pub node: NodeId,
    /// Socket direction
    pub direction: SocketDirection,
    /// Socket index within its direction
    pub index: usize,
}

impl SocketAddr {
    /// Address of an output socket
    pub fn output(node: NodeId, index: usize) -> Self {
        Self {
            node,
            direction: SocketDirection::Output,
            index,
        }
    }

    /// Address of an input socket
    pub fn input(node: NodeId, index: usize) -> Self {
        Self {
            node,
            direction: SocketDirection::Input,
            index,
        }
    }
}

impl fmt::Display for SocketAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}[{}]", self.node, self.direction, self.index)
    }
}

/// A directed link from an output socket to an input socket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    /// Unique link ID
    pub id: LinkId,
    /// Source node ID
    pub from_node: NodeId,
    /// Source output index
    pub from_socket: usize,
    /// Target node ID
    pub to_node: NodeId,
    /// Target input index
    pub to_socket: usize,
}

impl Link {
    /// Source socket address
    pub fn source(&self) -> SocketAddr {
        SocketAddr::output(self.from_node, self.from_socket)
    }

    /// Target socket address
    pub fn target(&self) -> SocketAddr {
        SocketAddr::input(self.to_node, self.to_socket)
    }

    /// Check if this link involves a specific node
    pub fn involves_node(&self, node_id: NodeId) -> bool {
        self.from_node == node_id || self.to_node == node_id
    }

    /// Check if this link is attached to a specific socket
    pub fn involves_socket(&self, socket: SocketAddr) -> bool {
        match socket.direction {
            SocketDirection::Output => self.source() == socket,
            SocketDirection::Input => self.target() == socket,
        }
    }
}

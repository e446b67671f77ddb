// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the graph.

use crate::element::{Element, EvaluateError};
use crate::package::Package;
use crate::socket::{SocketDirection, Sockets};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a node, unique within its package
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl NodeId {
    /// The package's `Inputs` pseudo-node
    pub const INPUTS: NodeId = NodeId(0);
    /// The package's `Outputs` pseudo-node
    pub const OUTPUTS: NodeId = NodeId(1);
    /// First id handed out to ordinary nodes
    pub const FIRST_USER: NodeId = NodeId(2);

    /// Whether this id names one of the reserved pseudo-nodes
    pub fn is_reserved(&self) -> bool {
        *self == Self::INPUTS || *self == Self::OUTPUTS
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A node instance in a package
#[derive(Debug)]
pub struct Node {
    /// Unique instance ID
    pub(crate) id: NodeId,
    /// Display name
    pub(crate) name: String,
    /// Position in the editor canvas
    pub(crate) position: [f32; 2],
    /// Owned element
    pub(crate) element: Box<dyn Element>,
    /// Fault from the most recent pass, if the element failed
    pub(crate) fault: Option<EvaluateError>,
}

impl Node {
    /// Create a node owning `element`
    pub fn new(id: NodeId, name: impl Into<String>, element: Box<dyn Element>) -> Self {
        Self {
            id,
            name: name.into(),
            position: [0.0, 0.0],
            element,
            fault: None,
        }
    }

    /// Set the position
    pub fn with_position(mut self, position: [f32; 2]) -> Self {
        self.position = position;
        self
    }

    /// Node ID
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Canvas position
    pub fn position(&self) -> [f32; 2] {
        self.position
    }

    /// Registry type name of the owned element
    pub fn type_name(&self) -> &str {
        self.element.type_name()
    }

    /// Owned element
    pub fn element(&self) -> &dyn Element {
        self.element.as_ref()
    }

    /// Owned element, mutably
    pub fn element_mut(&mut self) -> &mut dyn Element {
        self.element.as_mut()
    }

    /// Sockets of the owned element
    pub fn sockets(&self) -> &Sockets {
        self.element.sockets()
    }

    /// Fault raised by the element in the most recent pass
    pub fn fault(&self) -> Option<&EvaluateError> {
        self.fault.as_ref()
    }

    /// Current value of a socket, for live display
    pub fn socket_value(&self, direction: SocketDirection, index: usize) -> Option<&Value> {
        self.sockets().get(direction, index)?.value()
    }

    /// Current value of an input socket
    pub fn input_value(&self, index: usize) -> Option<&Value> {
        self.socket_value(SocketDirection::Input, index)
    }

    /// Current value of an output socket
    pub fn output_value(&self, index: usize) -> Option<&Value> {
        self.socket_value(SocketDirection::Output, index)
    }

    /// Evaluate the element, holding outputs at their previous values on failure.
    ///
    /// A nested package that evaluated with inner faults keeps its new outputs
    /// and records a [`EvaluateError::Nested`] fault. Returns whether any
    /// output changed.
    pub(crate) fn evaluate(&mut self) -> bool {
        let before = self.element.sockets().output_values();
        match self.element.evaluate() {
            Ok(()) => {
                self.fault = self.element.as_package().and_then(Package::nested_fault);
                let after = self.element.sockets().outputs();
                before.iter().zip(after).any(|(old, new)| match (old, new.value()) {
                    (Some(old), Some(new)) => !old.same_as(new),
                    (None, None) => false,
                    _ => true,
                })
            }
            Err(e) => {
                self.element.sockets_mut().restore_outputs(before);
                self.fault = Some(e);
                false
            }
        }
    }
}

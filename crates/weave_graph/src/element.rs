// SPDX-License-Identifier: MIT OR Apache-2.0
//! The element abstraction: typed sockets plus an evaluate step.

use crate::package::Package;
use crate::socket::{Socket, SocketDirection, SocketError, Sockets};
use crate::value::{Value, ValueType};
use std::fmt;

/// A unit of computation owned by a node.
///
/// Every element declares its sockets once at construction and exposes a
/// single [`Element::evaluate`] step that reads its inputs and writes its
/// outputs. Evaluation may only touch the element's own sockets and whatever
/// internal state the element explicitly owns.
pub trait Element: Send + Sync + fmt::Debug {
    /// Registry type name (e.g. `logic/not`)
    fn type_name(&self) -> &str;

    /// Declared sockets
    fn sockets(&self) -> &Sockets;

    /// Declared sockets, mutably
    fn sockets_mut(&mut self) -> &mut Sockets;

    /// Compute outputs from the current inputs.
    ///
    /// A failure leaves the element usable; the engine restores the outputs
    /// to their last committed values and records a fault for the node.
    fn evaluate(&mut self) -> Result<(), EvaluateError>;

    /// Per-instance configuration value, if the element has one
    fn config(&self) -> Option<Value> {
        None
    }

    /// Replace the per-instance configuration value
    fn configure(&mut self, value: Value) -> Result<(), ElementError> {
        let _ = value;
        Err(ElementError::NotConfigurable {
            type_name: self.type_name().to_string(),
        })
    }

    /// Append a socket. Elements only grow sockets of the type they already carry.
    fn add_socket(
        &mut self,
        direction: SocketDirection,
        value_type: ValueType,
        name: &str,
    ) -> Result<usize, ElementError> {
        if let Some(last) = self.sockets().list(direction).last() {
            if last.value_type() != value_type {
                return Err(SocketError::TypeMismatch {
                    expected: last.value_type(),
                    found: value_type,
                }
                .into());
            }
        }
        Ok(self.sockets_mut().push(direction, Socket::new(name, value_type))?)
    }

    /// Remove the last socket of a direction
    fn remove_socket(&mut self, direction: SocketDirection) -> Result<(), ElementError> {
        self.sockets_mut().pop(direction)?;
        Ok(())
    }

    /// Restore sockets and any internal state to their initial values
    fn reset(&mut self) {
        self.sockets_mut().reset();
    }

    /// Whether the element's internal state is quiescent.
    ///
    /// Only composite elements have internal state that can still be moving
    /// while their outputs look unchanged.
    fn is_settled(&self) -> bool {
        true
    }

    /// Downcast to a nested package
    fn as_package(&self) -> Option<&Package> {
        None
    }

    /// Downcast to a nested package, mutably
    fn as_package_mut(&mut self) -> Option<&mut Package> {
        None
    }
}

/// Error when configuring or resizing an element
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ElementError {
    /// Socket-level failure (capacity, minimum, type)
    #[error(transparent)]
    Socket(#[from] SocketError),

    /// Element has no configuration value
    #[error("Element '{type_name}' is not configurable")]
    NotConfigurable {
        /// Element type
        type_name: String,
    },

    /// Configuration value has the wrong type
    #[error("Invalid configuration: expected {expected}, found {found}")]
    InvalidConfig {
        /// Expected value type
        expected: ValueType,
        /// Offered value type
        found: ValueType,
    },
}

/// Error raised by a single element evaluation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvaluateError {
    /// A socket read or write failed (uninitialized input, runtime type mismatch)
    #[error(transparent)]
    Socket(#[from] SocketError),

    /// Division by zero
    #[error("Division by zero")]
    DivisionByZero,

    /// Nodes inside a nested package faulted
    #[error("{faults} node(s) faulted inside package '{package}'")]
    Nested {
        /// Nested package name
        package: String,
        /// Number of faulting nodes
        faults: usize,
    },
}

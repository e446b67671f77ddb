// SPDX-License-Identifier: MIT OR Apache-2.0
//! Socket definitions for element inputs/outputs.

use crate::value::{Value, ValueType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Socket direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SocketDirection {
    /// Input socket
    Input,
    /// Output socket
    Output,
}

impl fmt::Display for SocketDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => f.write_str("input"),
            Self::Output => f.write_str("output"),
        }
    }
}

/// A typed value slot on an element
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Socket {
    /// Socket name
    pub name: String,
    /// Data type, fixed for the socket's lifetime
    value_type: ValueType,
    /// Current value, `None` until first written
    value: Option<Value>,
    /// Declared default, restored by [`Socket::reset`]
    default: Option<Value>,
}

impl Socket {
    /// Create a new uninitialized socket
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            value: None,
            default: None,
        }
    }

    /// Declare a default value; the socket starts out holding it.
    pub fn with_default(mut self, value: Value) -> Result<Self, SocketError> {
        self.check(&value)?;
        self.value = Some(value.clone());
        self.default = Some(value);
        Ok(self)
    }

    /// Get the socket's value type
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// Whether the socket holds a value
    pub fn is_initialized(&self) -> bool {
        self.value.is_some()
    }

    /// Current value, if any
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Read the current value.
    pub fn read(&self) -> Result<&Value, SocketError> {
        self.value.as_ref().ok_or_else(|| SocketError::Uninitialized {
            socket: self.name.clone(),
        })
    }

    /// Write a value; its tag must match the socket's type.
    pub fn write(&mut self, value: Value) -> Result<(), SocketError> {
        self.check(&value)?;
        self.value = Some(value);
        Ok(())
    }

    /// Restore the declared default (or uninitialized if none)
    pub fn reset(&mut self) {
        self.value = self.default.clone();
    }

    pub(crate) fn restore(&mut self, value: Option<Value>) {
        self.value = value;
    }

    fn check(&self, value: &Value) -> Result<(), SocketError> {
        if value.value_type() == self.value_type {
            Ok(())
        } else {
            Err(SocketError::TypeMismatch {
                expected: self.value_type,
                found: value.value_type(),
            })
        }
    }
}

/// Minimum and maximum socket counts of an element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketBounds {
    /// Minimum number of inputs
    pub min_inputs: usize,
    /// Maximum number of inputs
    pub max_inputs: usize,
    /// Minimum number of outputs
    pub min_outputs: usize,
    /// Maximum number of outputs
    pub max_outputs: usize,
}

impl SocketBounds {
    /// Exactly `inputs` inputs and `outputs` outputs
    pub const fn fixed(inputs: usize, outputs: usize) -> Self {
        Self {
            min_inputs: inputs,
            max_inputs: inputs,
            min_outputs: outputs,
            max_outputs: outputs,
        }
    }

    /// Unbounded in both directions
    pub const fn unbounded() -> Self {
        Self {
            min_inputs: 0,
            max_inputs: usize::MAX,
            min_outputs: 0,
            max_outputs: usize::MAX,
        }
    }

    fn range(&self, direction: SocketDirection) -> (usize, usize) {
        match direction {
            SocketDirection::Input => (self.min_inputs, self.max_inputs),
            SocketDirection::Output => (self.min_outputs, self.max_outputs),
        }
    }
}

/// The ordered input and output sockets of one element, with their bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sockets {
    bounds: SocketBounds,
    inputs: Vec<Socket>,
    outputs: Vec<Socket>,
}

impl Sockets {
    /// Create an empty socket list with the given bounds
    pub fn new(bounds: SocketBounds) -> Self {
        Self {
            bounds,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Builder form of [`Sockets::add_input`] for element constructors.
    ///
    /// Constructors stay within their own bounds, so the capacity check can
    /// only fail on a programming error; in that case the socket is dropped.
    pub fn with_input(mut self, socket: Socket) -> Self {
        if let Err(e) = self.push(SocketDirection::Input, socket) {
            tracing::error!("element constructor exceeded its bounds: {e}");
        }
        self
    }

    /// Builder form of [`Sockets::add_output`]
    pub fn with_output(mut self, socket: Socket) -> Self {
        if let Err(e) = self.push(SocketDirection::Output, socket) {
            tracing::error!("element constructor exceeded its bounds: {e}");
        }
        self
    }

    /// Socket count bounds
    pub fn bounds(&self) -> SocketBounds {
        self.bounds
    }

    /// Input sockets
    pub fn inputs(&self) -> &[Socket] {
        &self.inputs
    }

    /// Output sockets
    pub fn outputs(&self) -> &[Socket] {
        &self.outputs
    }

    /// Sockets of one direction
    pub fn list(&self, direction: SocketDirection) -> &[Socket] {
        match direction {
            SocketDirection::Input => &self.inputs,
            SocketDirection::Output => &self.outputs,
        }
    }

    fn list_mut(&mut self, direction: SocketDirection) -> &mut Vec<Socket> {
        match direction {
            SocketDirection::Input => &mut self.inputs,
            SocketDirection::Output => &mut self.outputs,
        }
    }

    /// Get a socket by direction and index
    pub fn get(&self, direction: SocketDirection, index: usize) -> Option<&Socket> {
        self.list(direction).get(index)
    }

    /// Get a mutable socket by direction and index
    pub fn get_mut(&mut self, direction: SocketDirection, index: usize) -> Option<&mut Socket> {
        self.list_mut(direction).get_mut(index)
    }

    /// Get an input socket by index
    pub fn input(&self, index: usize) -> Option<&Socket> {
        self.inputs.get(index)
    }

    /// Get an output socket by index
    pub fn output(&self, index: usize) -> Option<&Socket> {
        self.outputs.get(index)
    }

    /// Append an input socket, returning its index
    pub fn add_input(&mut self, socket: Socket) -> Result<usize, SocketError> {
        self.push(SocketDirection::Input, socket)
    }

    /// Append an output socket, returning its index
    pub fn add_output(&mut self, socket: Socket) -> Result<usize, SocketError> {
        self.push(SocketDirection::Output, socket)
    }

    /// Append a socket in the given direction, returning its index
    pub fn push(&mut self, direction: SocketDirection, socket: Socket) -> Result<usize, SocketError> {
        let (_, max) = self.bounds.range(direction);
        let list = self.list_mut(direction);
        if list.len() >= max {
            return Err(SocketError::CapacityExceeded { direction, max });
        }
        list.push(socket);
        Ok(list.len() - 1)
    }

    /// Remove the last socket in the given direction
    pub fn pop(&mut self, direction: SocketDirection) -> Result<Socket, SocketError> {
        let (min, _) = self.bounds.range(direction);
        let list = self.list_mut(direction);
        if list.len() <= min {
            return Err(SocketError::BelowMinimum { direction, min });
        }
        list.pop().ok_or(SocketError::BelowMinimum { direction, min })
    }

    /// Read an input value
    pub fn read_input(&self, index: usize) -> Result<&Value, SocketError> {
        self.inputs
            .get(index)
            .ok_or(SocketError::OutOfRange {
                direction: SocketDirection::Input,
                index,
            })?
            .read()
    }

    /// Write an output value
    pub fn write_output(&mut self, index: usize, value: Value) -> Result<(), SocketError> {
        self.outputs
            .get_mut(index)
            .ok_or(SocketError::OutOfRange {
                direction: SocketDirection::Output,
                index,
            })?
            .write(value)
    }

    /// Write a value into a socket of either direction
    pub fn write(&mut self, direction: SocketDirection, index: usize, value: Value) -> Result<(), SocketError> {
        self.get_mut(direction, index)
            .ok_or(SocketError::OutOfRange { direction, index })?
            .write(value)
    }

    /// Read a boolean input
    pub fn read_bool(&self, index: usize) -> Result<bool, SocketError> {
        let value = self.read_input(index)?;
        value.as_bool().ok_or(SocketError::TypeMismatch {
            expected: ValueType::Bool,
            found: value.value_type(),
        })
    }

    /// Read an integer input
    pub fn read_int(&self, index: usize) -> Result<i32, SocketError> {
        let value = self.read_input(index)?;
        value.as_int().ok_or(SocketError::TypeMismatch {
            expected: ValueType::Int,
            found: value.value_type(),
        })
    }

    /// Read a float input
    pub fn read_float(&self, index: usize) -> Result<f64, SocketError> {
        let value = self.read_input(index)?;
        value.as_float().ok_or(SocketError::TypeMismatch {
            expected: ValueType::Float,
            found: value.value_type(),
        })
    }

    /// Snapshot of the current output values
    pub fn output_values(&self) -> Vec<Option<Value>> {
        self.outputs.iter().map(|s| s.value().cloned()).collect()
    }

    /// Put back output values taken with [`Sockets::output_values`]
    pub fn restore_outputs(&mut self, values: Vec<Option<Value>>) {
        for (socket, value) in self.outputs.iter_mut().zip(values) {
            socket.restore(value);
        }
    }

    /// Reset every socket to its declared default
    pub fn reset(&mut self) {
        self.inputs.iter_mut().chain(self.outputs.iter_mut()).for_each(Socket::reset);
    }
}

/// Error when reading, writing or resizing sockets
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SocketError {
    /// Value tag does not match the socket type
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Socket type
        expected: ValueType,
        /// Offered value type
        found: ValueType,
    },

    /// Socket has never been written and has no default
    #[error("Socket '{socket}' is uninitialized")]
    Uninitialized {
        /// Socket name
        socket: String,
    },

    /// No socket at this index
    #[error("No {direction} socket at index {index}")]
    OutOfRange {
        /// Direction looked up
        direction: SocketDirection,
        /// Index looked up
        index: usize,
    },

    /// Adding the socket would exceed the element's maximum
    #[error("Capacity exceeded: at most {max} {direction} sockets")]
    CapacityExceeded {
        /// Direction of the rejected socket
        direction: SocketDirection,
        /// Declared maximum
        max: usize,
    },

    /// Removing the socket would go below the element's minimum
    #[error("At least {min} {direction} sockets are required")]
    BelowMinimum {
        /// Direction of the rejected removal
        direction: SocketDirection,
        /// Declared minimum
        min: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_before_write_fails() {
        let socket = Socket::new("a", ValueType::Bool);
        assert!(matches!(socket.read(), Err(SocketError::Uninitialized { .. })));
    }

    #[test]
    fn test_write_checks_type() {
        let mut socket = Socket::new("a", ValueType::Int);
        let err = socket.write(Value::Float(1.0)).unwrap_err();
        assert_eq!(
            err,
            SocketError::TypeMismatch {
                expected: ValueType::Int,
                found: ValueType::Float
            }
        );
        assert!(!socket.is_initialized());

        socket.write(Value::Int(3)).unwrap();
        assert_eq!(socket.read().unwrap(), &Value::Int(3));
    }

    #[test]
    fn test_default_and_reset() {
        let mut socket = Socket::new("a", ValueType::Bool)
            .with_default(Value::Bool(true))
            .unwrap();
        socket.write(Value::Bool(false)).unwrap();
        socket.reset();
        assert_eq!(socket.read().unwrap(), &Value::Bool(true));
    }

    #[test]
    fn test_bounds_enforced() {
        let bounds = SocketBounds {
            min_inputs: 1,
            max_inputs: 2,
            min_outputs: 1,
            max_outputs: 1,
        };
        let mut sockets = Sockets::new(bounds)
            .with_input(Socket::new("#1", ValueType::Bool))
            .with_output(Socket::new("#1", ValueType::Bool));

        assert_eq!(sockets.add_input(Socket::new("#2", ValueType::Bool)), Ok(1));
        assert!(matches!(
            sockets.add_input(Socket::new("#3", ValueType::Bool)),
            Err(SocketError::CapacityExceeded { max: 2, .. })
        ));
        assert!(matches!(
            sockets.add_output(Socket::new("#2", ValueType::Bool)),
            Err(SocketError::CapacityExceeded { .. })
        ));

        sockets.pop(SocketDirection::Input).unwrap();
        assert!(matches!(
            sockets.pop(SocketDirection::Input),
            Err(SocketError::BelowMinimum { min: 1, .. })
        ));
        assert_eq!(sockets.inputs().len(), 1);
    }

    #[test]
    fn test_restore_outputs() {
        let mut sockets = Sockets::new(SocketBounds::fixed(0, 1))
            .with_output(Socket::new("out", ValueType::Int));
        sockets.write_output(0, Value::Int(1)).unwrap();
        let snapshot = sockets.output_values();
        sockets.write_output(0, Value::Int(2)).unwrap();
        sockets.restore_outputs(snapshot);
        assert_eq!(sockets.output(0).unwrap().value(), Some(&Value::Int(1)));
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Float arithmetic elements.

use crate::element::{Element, EvaluateError};
use crate::socket::{Socket, SocketBounds, Sockets};
use crate::value::{Value, ValueType};

/// Maximum number of operands on a variadic arithmetic element
pub const MAX_OPERANDS: usize = 8;

/// Arithmetic operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathKind {
    /// Sum of all inputs
    Add,
    /// Product of all inputs
    Multiply,
    /// First input minus second
    Subtract,
    /// First input divided by second
    Divide,
}

impl MathKind {
    /// Registry type name for this operation
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Add => "math/add",
            Self::Multiply => "math/multiply",
            Self::Subtract => "math/subtract",
            Self::Divide => "math/divide",
        }
    }

    fn max_inputs(&self) -> usize {
        match self {
            Self::Add | Self::Multiply => MAX_OPERANDS,
            Self::Subtract | Self::Divide => 2,
        }
    }
}

/// Float arithmetic over its inputs
#[derive(Debug)]
pub struct Arithmetic {
    kind: MathKind,
    sockets: Sockets,
}

impl Arithmetic {
    /// Create a two-operand element
    pub fn new(kind: MathKind) -> Self {
        let bounds = SocketBounds {
            min_inputs: 2,
            max_inputs: kind.max_inputs(),
            min_outputs: 1,
            max_outputs: 1,
        };
        Self {
            kind,
            sockets: Sockets::new(bounds)
                .with_input(Socket::new("A", ValueType::Float))
                .with_input(Socket::new("B", ValueType::Float))
                .with_output(Socket::new("Result", ValueType::Float)),
        }
    }
}

impl Element for Arithmetic {
    fn type_name(&self) -> &str {
        self.kind.type_name()
    }

    fn sockets(&self) -> &Sockets {
        &self.sockets
    }

    fn sockets_mut(&mut self) -> &mut Sockets {
        &mut self.sockets
    }

    fn evaluate(&mut self) -> Result<(), EvaluateError> {
        let operands = (0..self.sockets.inputs().len())
            .map(|i| self.sockets.read_float(i))
            .collect::<Result<Vec<_>, _>>()?;
        let result = match self.kind {
            MathKind::Add => operands.iter().sum(),
            MathKind::Multiply => operands.iter().product(),
            MathKind::Subtract => operands[0] - operands[1],
            MathKind::Divide => {
                if operands[1] == 0.0 {
                    return Err(EvaluateError::DivisionByZero);
                }
                operands[0] / operands[1]
            }
        };
        self.sockets.write_output(0, Value::Float(result))?;
        Ok(())
    }
}

/// Clamp a value into `[min, max]`
#[derive(Debug)]
pub struct Clamp {
    sockets: Sockets,
}

impl Clamp {
    /// Registry type name
    pub const TYPE: &'static str = "math/clamp";

    /// Create a clamp element
    pub fn new() -> Self {
        Self {
            sockets: Sockets::new(SocketBounds::fixed(3, 1))
                .with_input(Socket::new("Value", ValueType::Float))
                .with_input(Socket::new("Min", ValueType::Float))
                .with_input(Socket::new("Max", ValueType::Float))
                .with_output(Socket::new("Result", ValueType::Float)),
        }
    }
}

impl Default for Clamp {
    fn default() -> Self {
        Self::new()
    }
}

impl Element for Clamp {
    fn type_name(&self) -> &str {
        Self::TYPE
    }

    fn sockets(&self) -> &Sockets {
        &self.sockets
    }

    fn sockets_mut(&mut self) -> &mut Sockets {
        &mut self.sockets
    }

    fn evaluate(&mut self) -> Result<(), EvaluateError> {
        let value = self.sockets.read_float(0)?;
        let min = self.sockets.read_float(1)?;
        let max = self.sockets.read_float(2)?;
        // f64::clamp panics on inverted bounds; max/min does not.
        self.sockets.write_output(0, Value::Float(value.max(min).min(max)))?;
        Ok(())
    }
}

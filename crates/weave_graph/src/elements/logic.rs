// SPDX-License-Identifier: MIT OR Apache-2.0
//! Logic elements: inverter, variadic gates and a toggle flip-flop.
//!
//! Logic inputs default to `false`, so an unconnected gate input reads low.

use crate::element::{Element, ElementError, EvaluateError};
use crate::socket::{Socket, SocketBounds, SocketDirection, SocketError, Sockets};
use crate::value::{Value, ValueType};

/// Maximum number of inputs on a variadic gate
pub const MAX_GATE_INPUTS: usize = 8;

fn bool_input(name: &str) -> Socket {
    // A bool default always matches a bool socket.
    Socket::new(name, ValueType::Bool)
        .with_default(Value::Bool(false))
        .unwrap_or_else(|_| Socket::new(name, ValueType::Bool))
}

/// Boolean negation
#[derive(Debug)]
pub struct Not {
    sockets: Sockets,
}

impl Not {
    /// Registry type name
    pub const TYPE: &'static str = "logic/not";

    /// Create a new inverter
    pub fn new() -> Self {
        Self {
            sockets: Sockets::new(SocketBounds::fixed(1, 1))
                .with_input(bool_input("#1"))
                .with_output(Socket::new("#1", ValueType::Bool)),
        }
    }
}

impl Default for Not {
    fn default() -> Self {
        Self::new()
    }
}

impl Element for Not {
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
        let input = self.sockets.read_bool(0)?;
        self.sockets.write_output(0, Value::Bool(!input))?;
        Ok(())
    }
}

/// Gate operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateKind {
    /// All inputs high
    And,
    /// Any input high
    Or,
    /// Not all inputs high
    Nand,
    /// No input high
    Nor,
    /// Odd number of inputs high
    Xor,
}

impl GateKind {
    /// Registry type name for this gate
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::And => "logic/and",
            Self::Or => "logic/or",
            Self::Nand => "logic/nand",
            Self::Nor => "logic/nor",
            Self::Xor => "logic/xor",
        }
    }

    fn apply(&self, inputs: &[bool]) -> bool {
        let all = inputs.iter().all(|b| *b);
        let any = inputs.iter().any(|b| *b);
        match self {
            Self::And => all,
            Self::Or => any,
            Self::Nand => !all,
            Self::Nor => !any,
            Self::Xor => inputs.iter().filter(|b| **b).count() % 2 == 1,
        }
    }
}

/// Variadic boolean gate with 2 to 8 inputs
#[derive(Debug)]
pub struct Gate {
    kind: GateKind,
    sockets: Sockets,
}

impl Gate {
    /// Create a two-input gate
    pub fn new(kind: GateKind) -> Self {
        let bounds = SocketBounds {
            min_inputs: 2,
            max_inputs: MAX_GATE_INPUTS,
            min_outputs: 1,
            max_outputs: 1,
        };
        Self {
            kind,
            sockets: Sockets::new(bounds)
                .with_input(bool_input("#1"))
                .with_input(bool_input("#2"))
                .with_output(Socket::new("#1", ValueType::Bool)),
        }
    }

    /// Gate operation
    pub fn kind(&self) -> GateKind {
        self.kind
    }
}

impl Element for Gate {
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
        let inputs = (0..self.sockets.inputs().len())
            .map(|i| self.sockets.read_bool(i))
            .collect::<Result<Vec<_>, _>>()?;
        self.sockets.write_output(0, Value::Bool(self.kind.apply(&inputs)))?;
        Ok(())
    }

    fn add_socket(
        &mut self,
        direction: SocketDirection,
        value_type: ValueType,
        name: &str,
    ) -> Result<usize, ElementError> {
        if value_type != ValueType::Bool {
            return Err(SocketError::TypeMismatch {
                expected: ValueType::Bool,
                found: value_type,
            }
            .into());
        }
        let socket = match direction {
            SocketDirection::Input => bool_input(name),
            SocketDirection::Output => Socket::new(name, ValueType::Bool),
        };
        Ok(self.sockets.push(direction, socket)?)
    }
}

/// T flip-flop: flips its stored bit on every rising edge of the input
#[derive(Debug)]
pub struct Toggle {
    sockets: Sockets,
    state: bool,
    last_input: bool,
}

impl Toggle {
    /// Registry type name
    pub const TYPE: &'static str = "logic/toggle";

    /// Create a new flip-flop, initially low
    pub fn new() -> Self {
        Self {
            sockets: Sockets::new(SocketBounds::fixed(1, 1))
                .with_input(bool_input("T"))
                .with_output(Socket::new("Q", ValueType::Bool)),
            state: false,
            last_input: false,
        }
    }
}

impl Default for Toggle {
    fn default() -> Self {
        Self::new()
    }
}

impl Element for Toggle {
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
        let input = self.sockets.read_bool(0)?;
        if input && !self.last_input {
            self.state = !self.state;
        }
        self.last_input = input;
        self.sockets.write_output(0, Value::Bool(self.state))?;
        Ok(())
    }

    fn reset(&mut self) {
        self.sockets.reset();
        self.state = false;
        self.last_input = false;
    }
}

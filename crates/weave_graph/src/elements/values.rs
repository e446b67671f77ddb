// SPDX-License-Identifier: MIT OR Apache-2.0
//! Constants and value converters.

use crate::element::{Element, ElementError, EvaluateError};
use crate::socket::{Socket, SocketBounds, Sockets};
use crate::value::{Value, ValueType};
use std::f64::consts::PI;

/// Constant source with a configurable value
#[derive(Debug)]
pub struct Constant {
    type_name: &'static str,
    value: Value,
    sockets: Sockets,
}

impl Constant {
    /// Create a constant of the given type holding its zero value
    pub fn new(value_type: ValueType) -> Self {
        let type_name = match value_type {
            ValueType::Bool => "values/const_bool",
            ValueType::Int => "values/const_int",
            ValueType::Float => "values/const_float",
            ValueType::String => "values/const_string",
        };
        Self {
            type_name,
            value: value_type.zero(),
            sockets: Sockets::new(SocketBounds::fixed(0, 1))
                .with_output(Socket::new("Value", value_type)),
        }
    }

    /// Create a constant holding `value`
    pub fn with_value(value: Value) -> Self {
        let mut constant = Self::new(value.value_type());
        constant.value = value;
        constant
    }

    /// Current constant value
    pub fn value(&self) -> &Value {
        &self.value
    }
}

impl Element for Constant {
    fn type_name(&self) -> &str {
        self.type_name
    }

    fn sockets(&self) -> &Sockets {
        &self.sockets
    }

    fn sockets_mut(&mut self) -> &mut Sockets {
        &mut self.sockets
    }

    fn evaluate(&mut self) -> Result<(), EvaluateError> {
        self.sockets.write_output(0, self.value.clone())?;
        Ok(())
    }

    fn config(&self) -> Option<Value> {
        Some(self.value.clone())
    }

    fn configure(&mut self, value: Value) -> Result<(), ElementError> {
        let expected = self.value.value_type();
        if value.value_type() != expected {
            return Err(ElementError::InvalidConfig {
                expected,
                found: value.value_type(),
            });
        }
        self.value = value;
        Ok(())
    }
}

/// Conversion performed by a [`Converter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertKind {
    /// Integer to float widening
    IntToFloat,
    /// Float to integer, truncating toward zero and saturating
    FloatToInt,
    /// Degrees to radians
    DegreeToRadian,
    /// Radians to degrees
    RadianToDegree,
}

impl ConvertKind {
    /// Registry type name for this conversion
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::IntToFloat => "values/int_to_float",
            Self::FloatToInt => "values/float_to_int",
            Self::DegreeToRadian => "values/degree_to_radian",
            Self::RadianToDegree => "values/radian_to_degree",
        }
    }

    fn signature(&self) -> (Socket, Socket) {
        match self {
            Self::IntToFloat => (
                Socket::new("Int", ValueType::Int),
                Socket::new("Float", ValueType::Float),
            ),
            Self::FloatToInt => (
                Socket::new("Float", ValueType::Float),
                Socket::new("Int", ValueType::Int),
            ),
            Self::DegreeToRadian => (
                Socket::new("Degrees", ValueType::Float),
                Socket::new("Radians", ValueType::Float),
            ),
            Self::RadianToDegree => (
                Socket::new("Radians", ValueType::Float),
                Socket::new("Degrees", ValueType::Float),
            ),
        }
    }
}

/// Single-input, single-output value conversion
#[derive(Debug)]
pub struct Converter {
    kind: ConvertKind,
    sockets: Sockets,
}

impl Converter {
    /// Create a converter
    pub fn new(kind: ConvertKind) -> Self {
        let (input, output) = kind.signature();
        Self {
            kind,
            sockets: Sockets::new(SocketBounds::fixed(1, 1))
                .with_input(input)
                .with_output(output),
        }
    }

    /// Conversion performed
    pub fn kind(&self) -> ConvertKind {
        self.kind
    }
}

impl Element for Converter {
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
        let output = match self.kind {
            ConvertKind::IntToFloat => Value::Float(f64::from(self.sockets.read_int(0)?)),
            // `as` saturates at the i32 range and maps NaN to zero.
            ConvertKind::FloatToInt => Value::Int(self.sockets.read_float(0)? as i32),
            ConvertKind::DegreeToRadian => Value::Float(self.sockets.read_float(0)? * (PI / 180.0)),
            ConvertKind::RadianToDegree => Value::Float(self.sockets.read_float(0)? * (180.0 / PI)),
        };
        self.sockets.write_output(0, output)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::socket::{SocketDirection, SocketError};

    fn convert(kind: ConvertKind, input: Value) -> Result<Value, EvaluateError> {
        let mut converter = Converter::new(kind);
        converter
            .sockets_mut()
            .write(SocketDirection::Input, 0, input)
            .unwrap();
        converter.evaluate()?;
        Ok(converter.sockets().output(0).unwrap().value().unwrap().clone())
    }

    #[test]
    fn test_int_to_float_widening() {
        let boundaries = [
            0,
            1,
            -1,
            (1 << 24) + 1,
            -(1 << 24) - 1,
            i32::MAX,
            i32::MAX - 1,
            i32::MIN,
            i32::MIN + 1,
        ];
        let sweep = (i64::from(i32::MIN)..=i64::from(i32::MAX))
            .step_by(1_000_003)
            .filter_map(|i| i32::try_from(i).ok());
        for i in boundaries.into_iter().chain(sweep) {
            let out = convert(ConvertKind::IntToFloat, Value::Int(i)).unwrap();
            let back = out.as_float().unwrap();
            assert_eq!(back as i32, i);
            assert_eq!(back, f64::from(i));
        }
    }

    #[test]
    fn test_degree_to_radian() {
        for deg in [0.0f64, 45.0, 90.0, 180.0, -270.0, 1.0e6] {
            let out = convert(ConvertKind::DegreeToRadian, Value::Float(deg)).unwrap();
            let expected = deg * (PI / 180.0);
            assert!((out.as_float().unwrap() - expected).abs() <= expected.abs() * 1e-6);
        }
    }

    #[test]
    fn test_radian_to_degree() {
        let out = convert(ConvertKind::RadianToDegree, Value::Float(PI)).unwrap();
        assert!((out.as_float().unwrap() - 180.0).abs() < 1e-4);
    }

    #[test]
    fn test_float_to_int_truncates_and_saturates() {
        assert_eq!(convert(ConvertKind::FloatToInt, Value::Float(2.9)).unwrap(), Value::Int(2));
        assert_eq!(convert(ConvertKind::FloatToInt, Value::Float(-2.9)).unwrap(), Value::Int(-2));
        assert_eq!(
            convert(ConvertKind::FloatToInt, Value::Float(1.0e20)).unwrap(),
            Value::Int(i32::MAX)
        );
    }

    #[test]
    fn test_uninitialized_input_faults() {
        let mut converter = Converter::new(ConvertKind::IntToFloat);
        let err = converter.evaluate().unwrap_err();
        assert!(matches!(err, EvaluateError::Socket(SocketError::Uninitialized { .. })));
        assert!(converter.sockets().output(0).unwrap().value().is_none());
    }

    #[test]
    fn test_constant_configuration() {
        let mut constant = Constant::new(ValueType::Int);
        assert_eq!(constant.type_name(), "values/const_int");
        constant.configure(Value::Int(9)).unwrap();
        assert!(matches!(
            constant.configure(Value::Bool(true)),
            Err(ElementError::InvalidConfig { .. })
        ));
        constant.evaluate().unwrap();
        assert_eq!(constant.sockets().output(0).unwrap().value(), Some(&Value::Int(9)));
        assert_eq!(constant.config(), Some(Value::Int(9)));
    }
}

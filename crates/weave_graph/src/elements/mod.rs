// SPDX-License-Identifier: MIT OR Apache-2.0
//! Built-in element types.

pub mod logic;
pub mod math;
pub mod values;

use crate::element::Element;
use crate::package::Package;
use crate::registry::{ElementMeta, Registry, RegistryError};
use crate::value::ValueType;
use logic::{Gate, GateKind, Not, Toggle};
use math::{Arithmetic, Clamp, MathKind};
use values::{Constant, ConvertKind, Converter};

/// Register every built-in element type
pub fn register_builtins(registry: &mut Registry) -> Result<(), RegistryError> {
    // Logic
    registry.register(
        Not::TYPE,
        ElementMeta::new("NOT", "icons/logic/not.png").with_description("Logical negation"),
        || Box::new(Not::new()),
    )?;

    for (kind, name, description) in [
        (GateKind::And, "AND", "High when every input is high"),
        (GateKind::Or, "OR", "High when any input is high"),
        (GateKind::Nand, "NAND", "Low when every input is high"),
        (GateKind::Nor, "NOR", "High when no input is high"),
        (GateKind::Xor, "XOR", "High when an odd number of inputs is high"),
    ] {
        let icon = format!("icons/{}.png", kind.type_name());
        registry.register(
            kind.type_name(),
            ElementMeta::new(name, icon).with_description(description),
            move || Box::new(Gate::new(kind)),
        )?;
    }

    registry.register(
        Toggle::TYPE,
        ElementMeta::new("Toggle", "icons/logic/toggle.png")
            .with_description("Flips its output on every rising edge"),
        || Box::new(Toggle::new()),
    )?;

    // Values
    for (value_type, name) in [
        (ValueType::Bool, "Const bool"),
        (ValueType::Int, "Const int"),
        (ValueType::Float, "Const float"),
        (ValueType::String, "Const string"),
    ] {
        let constant = Constant::new(value_type);
        let type_name = constant.type_name().to_string();
        let icon = format!("icons/{type_name}.png");
        registry.register(
            type_name,
            ElementMeta::new(name, icon).with_description("Configurable constant"),
            move || Box::new(Constant::new(value_type)),
        )?;
    }

    for (kind, name, description) in [
        (ConvertKind::IntToFloat, "Int to float", "Widen an integer to a float"),
        (ConvertKind::FloatToInt, "Float to int", "Truncate a float toward zero"),
        (ConvertKind::DegreeToRadian, "Degree to radian", "Scale degrees to radians"),
        (ConvertKind::RadianToDegree, "Radian to degree", "Scale radians to degrees"),
    ] {
        let icon = format!("icons/{}.png", kind.type_name());
        registry.register(
            kind.type_name(),
            ElementMeta::new(name, icon).with_description(description),
            move || Box::new(Converter::new(kind)),
        )?;
    }

    // Math
    for (kind, name) in [
        (MathKind::Add, "Add"),
        (MathKind::Subtract, "Subtract"),
        (MathKind::Multiply, "Multiply"),
        (MathKind::Divide, "Divide"),
    ] {
        let icon = format!("icons/{}.png", kind.type_name());
        registry.register(kind.type_name(), ElementMeta::new(name, icon), move || {
            Box::new(Arithmetic::new(kind))
        })?;
    }

    registry.register(
        Clamp::TYPE,
        ElementMeta::new("Clamp", "icons/math/clamp.png"),
        || Box::new(Clamp::new()),
    )?;

    // Composite
    registry.register(
        Package::TYPE,
        ElementMeta::new("Package", "icons/package.png")
            .with_description("A nested graph used as a single element"),
        || Box::new(Package::new("Package")),
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_builtin_reports_its_registered_type() {
        let registry = Registry::with_builtins().unwrap();
        for info in registry.list() {
            let element = registry.create(info.type_name).unwrap();
            assert_eq!(element.type_name(), info.type_name);
        }
    }

    #[test]
    fn test_registering_twice_fails() {
        let mut registry = Registry::with_builtins().unwrap();
        assert!(matches!(
            register_builtins(&mut registry),
            Err(RegistryError::DuplicateType(_))
        ));
    }
}

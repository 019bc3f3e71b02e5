//! Slot documentation and the strict-mode validation contract.

use std::fmt;

use rustc_hash::FxHashMap;
use serde::Serialize;

/// Declared type of a slot input, driving strict-mode coercion checks.
///
/// Parsed leniently from the documented aliases (`int`/`integer`,
/// `bool`/`boolean`, `float`/`number`, `list`/`array`, `map`/`object`);
/// anything unrecognized degrades to [`ValueType::Any`], which always
/// passes.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Str,
    Int,
    Bool,
    Float,
    Decimal,
    List,
    Map,
    #[default]
    Any,
}

impl ValueType {
    /// Parse a declared type string.
    pub fn parse(s: &str) -> ValueType {
        match s {
            "string" => ValueType::Str,
            "int" | "integer" => ValueType::Int,
            "bool" | "boolean" => ValueType::Bool,
            "float" | "number" => ValueType::Float,
            "decimal" => ValueType::Decimal,
            "list" | "array" => ValueType::List,
            "map" | "object" => ValueType::Map,
            _ => ValueType::Any,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValueType::Str => "string",
            ValueType::Int => "int",
            ValueType::Bool => "bool",
            ValueType::Float => "float",
            ValueType::Decimal => "decimal",
            ValueType::List => "list",
            ValueType::Map => "map",
            ValueType::Any => "any",
        };
        f.write_str(s)
    }
}

/// Declaration of a single permitted attribute.
#[derive(Clone, Debug, Default, Serialize)]
pub struct InputMeta {
    pub description: String,
    pub required: bool,
    #[serde(rename = "type")]
    pub ty: ValueType,
}

impl InputMeta {
    pub fn new(description: impl Into<String>) -> Self {
        InputMeta {
            description: description.into(),
            required: false,
            ty: ValueType::Any,
        }
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn typed(mut self, ty: ValueType) -> Self {
        self.ty = ty;
        self
    }
}

/// Declarative description of a slot: documentation plus the strict-mode
/// contract.
///
/// When `inputs` is present the executor validates every attribute child
/// against it; when absent the slot accepts anything. `required_blocks`
/// names child blocks (like `do`) that must be present.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SlotMeta {
    pub description: String,
    /// Snippet of ZL source demonstrating the slot.
    pub example: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inputs: Option<FxHashMap<String, InputMeta>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required_blocks: Vec<String>,
}

impl SlotMeta {
    pub fn new(description: impl Into<String>) -> Self {
        SlotMeta {
            description: description.into(),
            ..SlotMeta::default()
        }
    }

    #[must_use]
    pub fn example(mut self, example: impl Into<String>) -> Self {
        self.example = example.into();
        self
    }

    #[must_use]
    pub fn input(mut self, name: impl Into<String>, meta: InputMeta) -> Self {
        self.inputs
            .get_or_insert_with(FxHashMap::default)
            .insert(name.into(), meta);
        self
    }

    #[must_use]
    pub fn required_block(mut self, name: impl Into<String>) -> Self {
        self.required_blocks.push(name.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn value_type_aliases() {
        assert_eq!(ValueType::parse("integer"), ValueType::Int);
        assert_eq!(ValueType::parse("number"), ValueType::Float);
        assert_eq!(ValueType::parse("array"), ValueType::List);
        assert_eq!(ValueType::parse("object"), ValueType::Map);
        assert_eq!(ValueType::parse("whatever"), ValueType::Any);
    }

    #[test]
    fn builder_collects_inputs() {
        let meta = SlotMeta::new("demo")
            .input("bar", InputMeta::new("a number").required().typed(ValueType::Int))
            .required_block("do");
        let inputs = meta.inputs.as_ref().map(FxHashMap::len);
        assert_eq!(inputs, Some(1));
        assert_eq!(meta.required_blocks, vec!["do".to_string()]);
    }
}

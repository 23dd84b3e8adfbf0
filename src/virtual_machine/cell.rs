//! Contents of a memory cell.

use crate::virtual_machine::isa::Instruction;
use std::fmt::{self, Display};

/// Static datum or stack slot.
///
/// Stack slots only ever hold [`Value::Int`]; text only appears in the static
/// data region.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Value {
    /// 64-bit signed integer.
    Int(i64),
    /// Text literal.
    Str(String),
}

impl Value {
    /// Returns the kind name for error messages.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "integer",
            Value::Str(_) => "string",
        }
    }

    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Str(_) => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

/// One addressable memory cell.
///
/// Code, static data and the stack share one address space; the tag only
/// records what was last stored, so wrong-kind accesses can be reported.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Cell {
    Instruction(Instruction),
    Value(Value),
}

impl Cell {
    /// Returns the kind name for error messages.
    pub const fn kind(&self) -> &'static str {
        match self {
            Cell::Instruction(_) => "instruction",
            Cell::Value(v) => v.type_name(),
        }
    }
}

impl Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Instruction(instr) => write!(f, "{instr}"),
            Cell::Value(Value::Str(s)) => write!(f, "{s:?}"),
            Cell::Value(v) => write!(f, "{v}"),
        }
    }
}

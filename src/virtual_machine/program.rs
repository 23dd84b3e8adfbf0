//! Symbolic program representation and the assembled memory image.
//!
//! [`Program`] is what a program builder hands to the assembler: procedures
//! and static data, both in declaration order. [`AssembledProgram`] is what the
//! assembler hands back: a flat image ready to load into the VM, plus the
//! symbol table used to produce it.

use crate::virtual_machine::cell::{Cell, Value};
use crate::virtual_machine::isa::Instruction;

/// Named, ordered list of instructions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Procedure {
    pub name: String,
    pub instructions: Vec<Instruction>,
}

/// Named static datum.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataItem {
    pub name: String,
    pub value: Value,
}

/// Pre-assembly program. Insertion order is load-bearing: it fixes the
/// address of every instruction and datum.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Program {
    pub procedures: Vec<Procedure>,
    pub data: Vec<DataItem>,
}

impl Program {
    /// Total number of instructions across all procedures.
    pub fn code_len(&self) -> usize {
        self.procedures.iter().map(|p| p.instructions.len()).sum()
    }

    /// Number of cells the assembled image will occupy.
    pub fn image_len(&self) -> usize {
        self.code_len() + self.data.len()
    }
}

/// Ordered symbol → address bindings produced by the layout pass.
///
/// A name defined twice keeps the later address.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SymbolTable {
    entries: Vec<(String, usize)>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name` to `address`, replacing any earlier binding in place.
    ///
    /// Returns `false` when an earlier binding was replaced.
    pub fn define(&mut self, name: &str, address: usize) -> bool {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some((_, bound)) => {
                *bound = address;
                false
            }
            None => {
                self.entries.push((name.to_string(), address));
                true
            }
        }
    }

    /// Returns the address bound to `name`.
    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, addr)| *addr)
    }

    /// Iterates bindings in definition order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entries.iter().map(|(n, a)| (n.as_str(), *a))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolved memory image: all code, then all data, no gaps.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssembledProgram {
    /// Cells starting at address 0.
    pub image: Vec<Cell>,
    /// Label bindings used during resolution.
    pub symbols: SymbolTable,
    /// Address of the first data cell (equals the number of instructions).
    pub code_len: usize,
}

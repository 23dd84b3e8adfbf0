//! Register names, instruction operands and operand resolution.

use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::vm::Registers;
use std::fmt::{self, Display};
use std::str::FromStr;

/// Named register of the machine.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Register {
    /// Program counter.
    Pc = 0,
    /// Stack pointer; addresses the most recently pushed slot.
    Sp = 1,
    /// Return-address register used by the calling convention.
    R = 2,
    A = 3,
    B = 4,
    C = 5,
}

impl Register {
    /// Number of registers in the file.
    pub const COUNT: usize = 6;

    /// All registers in index order.
    pub const ALL: [Register; Register::COUNT] = [
        Register::Pc,
        Register::Sp,
        Register::R,
        Register::A,
        Register::B,
        Register::C,
    ];

    /// Returns the assembly name of the register.
    pub const fn name(&self) -> &'static str {
        match self {
            Register::Pc => "PC",
            Register::Sp => "SP",
            Register::R => "R",
            Register::A => "A",
            Register::B => "B",
            Register::C => "C",
        }
    }

    /// Index of the register in the register file.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Looks a register up by its assembly name. Names are case-sensitive.
    pub fn from_name(name: &str) -> Option<Register> {
        Register::ALL.into_iter().find(|r| r.name() == name)
    }
}

impl Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Register {
    type Err = VMError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Register::from_name(s).ok_or_else(|| VMError::ExpectedRegister(s.to_string()))
    }
}

/// Source operand of an instruction.
///
/// `Label` only exists before assembly; the resolution pass rewrites every
/// label into an `Imm` holding the label's absolute address.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Operand {
    /// Literal integer.
    Imm(i64),
    /// Current value of a register.
    Reg(Register),
    /// Symbolic address, resolved at assembly time.
    Label(String),
}

impl Operand {
    /// Builds a label operand.
    pub fn label(name: impl Into<String>) -> Self {
        Operand::Label(name.into())
    }

    /// Returns a human-readable kind name for error messages.
    pub const fn kind(&self) -> &'static str {
        match self {
            Operand::Imm(_) => "Immediate",
            Operand::Reg(_) => "Register",
            Operand::Label(_) => "Label",
        }
    }

    /// Returns true for operands that carry no symbolic reference.
    pub const fn is_resolved(&self) -> bool {
        !matches!(self, Operand::Label(_))
    }

    /// Resolves the operand to a concrete integer against `registers`.
    ///
    /// Never mutates state. Returns [`VMError::UnresolvedLabel`] if a label
    /// slipped past assembly.
    pub fn resolve(&self, registers: &Registers) -> Result<i64, VMError> {
        match self {
            Operand::Imm(v) => Ok(*v),
            Operand::Reg(r) => Ok(registers.get(*r)),
            Operand::Label(name) => Err(VMError::UnresolvedLabel(name.clone())),
        }
    }

    /// Parses an assembly token: a decimal integer, a register name, or a
    /// label identifier.
    pub fn parse(tok: &str) -> Result<Operand, VMError> {
        if let Ok(v) = tok.parse::<i64>() {
            return Ok(Operand::Imm(v));
        }
        if let Some(r) = Register::from_name(tok) {
            return Ok(Operand::Reg(r));
        }
        if is_identifier(tok) {
            return Ok(Operand::Label(tok.to_string()));
        }
        Err(VMError::InvalidOperand {
            token: tok.to_string(),
        })
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub(crate) fn is_identifier(tok: &str) -> bool {
    let mut chars = tok.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl From<i64> for Operand {
    fn from(v: i64) -> Self {
        Operand::Imm(v)
    }
}

impl From<i32> for Operand {
    fn from(v: i32) -> Self {
        Operand::Imm(v.into())
    }
}

impl From<Register> for Operand {
    fn from(r: Register) -> Self {
        Operand::Reg(r)
    }
}

impl Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Imm(v) => write!(f, "{v}"),
            Operand::Reg(r) => write!(f, "{r}"),
            Operand::Label(name) => f.write_str(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_names_round_trip() {
        for r in Register::ALL {
            assert_eq!(r.name().parse::<Register>().unwrap(), r);
        }
        assert_eq!(Register::ALL[Register::Sp.index()], Register::Sp);
    }

    #[test]
    fn register_names_are_case_sensitive() {
        assert!(matches!(
            "pc".parse::<Register>(),
            Err(VMError::ExpectedRegister(_))
        ));
    }

    #[test]
    fn resolve_immediate_and_register() {
        let mut regs = Registers::new();
        regs.set(Register::B, 17);
        assert_eq!(Operand::Imm(-4).resolve(&regs).unwrap(), -4);
        assert_eq!(Operand::Reg(Register::B).resolve(&regs).unwrap(), 17);
        assert_eq!(Operand::Reg(Register::C).resolve(&regs).unwrap(), 0);
    }

    #[test]
    fn resolve_does_not_mutate_registers() {
        let mut regs = Registers::new();
        regs.set(Register::A, 9);
        let before = regs.clone();
        Operand::Reg(Register::A).resolve(&regs).unwrap();
        assert_eq!(regs, before);
    }

    #[test]
    fn resolve_label_is_an_error() {
        let regs = Registers::new();
        let err = Operand::label("main").resolve(&regs).unwrap_err();
        assert!(matches!(err, VMError::UnresolvedLabel(name) if name == "main"));
    }

    #[test]
    fn parse_operand_kinds() {
        assert_eq!(Operand::parse("42").unwrap(), Operand::Imm(42));
        assert_eq!(Operand::parse("-7").unwrap(), Operand::Imm(-7));
        assert_eq!(Operand::parse("SP").unwrap(), Operand::Reg(Register::Sp));
        assert_eq!(Operand::parse("gcd_loop").unwrap(), Operand::label("gcd_loop"));
        assert_eq!(Operand::parse("a").unwrap().kind(), "Label");
    }

    #[test]
    fn parse_operand_invalid() {
        for tok in ["\"text\"", "1abc", "a-b", ""] {
            assert!(matches!(
                Operand::parse(tok),
                Err(VMError::InvalidOperand { .. })
            ));
        }
    }

    #[test]
    fn operand_display() {
        assert_eq!(Operand::Imm(3).to_string(), "3");
        assert_eq!(Operand::Reg(Register::R).to_string(), "R");
        assert_eq!(Operand::label("hello").to_string(), "hello");
    }
}

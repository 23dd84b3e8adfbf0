//! Instruction Set Architecture (ISA) definitions.
//!
//! The [`for_each_instruction!`](crate::for_each_instruction) macro holds the
//! canonical instruction table and invokes a callback macro for code
//! generation, so the opcode list is written down exactly once.
//!
//! This module generates:
//! - The [`Opcode`] tag enum with mnemonics and arities
//! - The [`Instruction`] enum carrying typed operands
//! - Operand visitors used by the assembler's resolution pass
//!
//! # Operand kinds
//!
//! - `Src`: an [`Operand`] (immediate, register, or pre-assembly label)
//! - `Reg`: a [`Register`] written or tested by the instruction

use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::operand::{Operand, Register};
use std::fmt::{self, Display};

/// Invokes a callback macro with the complete instruction definition list.
#[macro_export]
macro_rules! for_each_instruction {
    ($callback:ident) => {
        $callback! {
            // =========================
            // Output
            // =========================
            /// DIS a ; emit the integer value of a
            Dis, "dis" => [a: Src],
            /// FMT addr ; emit the value stored in memory at addr
            Fmt, "fmt" => [addr: Src],
            // =========================
            // Data movement
            // =========================
            /// SET src, dst ; dst = src
            Set, "set" => [src: Src, dst: Reg],
            // =========================
            // Arithmetic
            // =========================
            /// ADD a, b, dst ; dst = a + b
            Add, "add" => [a: Src, b: Src, dst: Reg],
            /// SUB a, b, dst ; dst = a - b
            Sub, "sub" => [a: Src, b: Src, dst: Reg],
            /// MOD a, b, dst ; dst = a % b
            Mod, "mod" => [a: Src, b: Src, dst: Reg],
            /// EQL a, b, dst ; dst = (a == b) as 1 or 0
            Eql, "eql" => [a: Src, b: Src, dst: Reg],
            // =========================
            // Control flow
            // =========================
            /// IFZ r ; skip the next instruction if r == 0
            Ifz, "ifz" => [r: Reg],
            /// IFNZ r ; skip the next instruction if r != 0
            Ifnz, "ifnz" => [r: Reg],
            /// HALT ; spin on this instruction forever
            Halt, "halt" => [],
            /// NOOP ; no effect
            Noop, "noop" => [],
            // =========================
            // Stack
            // =========================
            /// PUSH a ; SP += 1 ; mem[SP] = a
            Push, "push" => [a: Src],
            /// POP dst ; dst = mem[SP] ; SP -= 1
            Pop, "pop" => [dst: Reg],
        }
    };
}

#[macro_export]
macro_rules! define_instructions {
    (
        $(
            $(#[$doc:meta])*
            $name:ident, $mnemonic:literal => [
                $( $field:ident : $kind:ident ),* $(,)?
            ]
        ),* $(,)?
    ) => {
        // =========================
        // Opcode tags
        // =========================
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
        pub enum Opcode {
            $(
                $(#[$doc])*
                $name,
            )*
        }

        impl Opcode {
            /// Every opcode in table order.
            pub const ALL: &'static [Opcode] = &[ $( Opcode::$name, )* ];

            /// Returns the assembly mnemonic for this opcode.
            pub const fn mnemonic(&self) -> &'static str {
                match self {
                    $( Opcode::$name => $mnemonic, )*
                }
            }

            /// Returns the fixed number of operands this opcode takes.
            pub const fn arity(&self) -> usize {
                match self {
                    $( Opcode::$name => define_instructions!(@count $( $field ),*), )*
                }
            }

            /// Looks an opcode up by mnemonic (case-insensitive).
            pub fn from_mnemonic(name: &str) -> Result<Opcode, VMError> {
                match name.to_ascii_lowercase().as_str() {
                    $( $mnemonic => Ok(Opcode::$name), )*
                    _ => Err(VMError::InvalidInstructionName {
                        name: name.to_string(),
                    }),
                }
            }
        }

        // =========================
        // Instructions
        // =========================
        #[derive(Clone, Debug, Eq, PartialEq, Hash)]
        pub enum Instruction {
            $(
                $(#[$doc])*
                $name {
                    $( $field: define_instructions!(@ty $kind) ),*
                },
            )*
        }

        impl Instruction {
            /// Returns the opcode tag of this instruction.
            pub const fn opcode(&self) -> Opcode {
                match self {
                    $( Instruction::$name { .. } => Opcode::$name, )*
                }
            }

            /// Returns the source operands in declaration order.
            pub fn operands(&self) -> Vec<&Operand> {
                let mut out = Vec::new();
                match self {
                    $(
                        Instruction::$name { $( $field ),* } => {
                            $( define_instructions!(@collect out, $kind, $field); )*
                        }
                    )*
                }
                out
            }

            /// Returns the source operands in declaration order, mutably.
            pub fn operands_mut(&mut self) -> Vec<&mut Operand> {
                let mut out = Vec::new();
                match self {
                    $(
                        Instruction::$name { $( $field ),* } => {
                            $( define_instructions!(@collect out, $kind, $field); )*
                        }
                    )*
                }
                out
            }

            /// Builds an instruction from an opcode and its operands in order.
            ///
            /// `Reg` slots only accept [`Operand::Reg`].
            pub fn from_operands(opcode: Opcode, operands: Vec<Operand>) -> Result<Instruction, VMError> {
                let expected = opcode.arity();
                if operands.len() != expected {
                    return Err(VMError::ArityMismatch {
                        instruction: opcode.mnemonic().to_string(),
                        expected,
                        actual: operands.len(),
                    });
                }

                #[allow(unused_mut, unused_variables)]
                let mut it = operands.into_iter();
                match opcode {
                    $(
                        Opcode::$name => Ok(Instruction::$name {
                            $( $field: define_instructions!(@take $kind, it, opcode)?, )*
                        }),
                    )*
                }
            }
        }

        impl Display for Instruction {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $(
                        #[allow(unused_mut)]
                        Instruction::$name { $( $field ),* } => {
                            let mut parts: Vec<String> = Vec::new();
                            $( parts.push($field.to_string()); )*
                            if parts.is_empty() {
                                f.write_str($mnemonic)
                            } else {
                                write!(f, "{} {}", $mnemonic, parts.join(", "))
                            }
                        }
                    )*
                }
            }
        }
    };

    // ---------- counting ----------
    (@count $( $x:ident ),* ) => {
        <[()]>::len(&[ $( define_instructions!(@unit $x) ),* ])
    };

    (@unit $x:ident) => { () };

    // ---------- types ----------
    (@ty Src) => { Operand };
    (@ty Reg) => { Register };

    // ---------- operand visiting ----------
    (@collect $out:ident, Src, $v:ident) => {
        $out.push($v);
    };

    (@collect $out:ident, Reg, $v:ident) => {
        let _ = $v;
    };

    // ---------- construction ----------
    (@take Src, $it:ident, $opcode:ident) => {
        take_operand(&mut $it, $opcode)
    };

    (@take Reg, $it:ident, $opcode:ident) => {
        take_operand(&mut $it, $opcode).and_then(|op| match op {
            Operand::Reg(r) => Ok(r),
            other => Err(VMError::ExpectedRegister(other.to_string())),
        })
    };
}

/// Pulls the next operand during [`Instruction::from_operands`].
fn take_operand(
    it: &mut impl Iterator<Item = Operand>,
    opcode: Opcode,
) -> Result<Operand, VMError> {
    it.next().ok_or_else(|| VMError::ArityMismatch {
        instruction: opcode.mnemonic().to_string(),
        expected: opcode.arity(),
        actual: 0,
    })
}

for_each_instruction!(define_instructions);

impl Instruction {
    /// Returns true once no label operands remain.
    pub fn is_resolved(&self) -> bool {
        self.operands().into_iter().all(Operand::is_resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mnemonic_lookup_is_case_insensitive() {
        assert_eq!(Opcode::from_mnemonic("ifnz").unwrap(), Opcode::Ifnz);
        assert_eq!(Opcode::from_mnemonic("HALT").unwrap(), Opcode::Halt);
    }

    #[test]
    fn mnemonic_lookup_invalid() {
        assert!(matches!(
            Opcode::from_mnemonic("jmp"),
            Err(VMError::InvalidInstructionName { name }) if name == "jmp"
        ));
    }

    #[test]
    fn every_opcode_round_trips_through_its_mnemonic() {
        for op in Opcode::ALL {
            assert_eq!(Opcode::from_mnemonic(op.mnemonic()).unwrap(), *op);
        }
    }

    #[test]
    fn arities() {
        assert_eq!(Opcode::Halt.arity(), 0);
        assert_eq!(Opcode::Noop.arity(), 0);
        assert_eq!(Opcode::Dis.arity(), 1);
        assert_eq!(Opcode::Pop.arity(), 1);
        assert_eq!(Opcode::Set.arity(), 2);
        assert_eq!(Opcode::Mod.arity(), 3);
    }

    #[test]
    fn from_operands_builds_typed_instruction() {
        let instr = Instruction::from_operands(
            Opcode::Add,
            vec![Operand::Reg(Register::A), Operand::Imm(1), Operand::Reg(Register::A)],
        )
        .unwrap();
        assert_eq!(
            instr,
            Instruction::Add {
                a: Operand::Reg(Register::A),
                b: Operand::Imm(1),
                dst: Register::A,
            }
        );
        assert_eq!(instr.opcode(), Opcode::Add);
    }

    #[test]
    fn from_operands_rejects_non_register_destination() {
        let err = Instruction::from_operands(Opcode::Set, vec![Operand::Imm(1), Operand::Imm(2)])
            .unwrap_err();
        assert!(matches!(err, VMError::ExpectedRegister(tok) if tok == "2"));
    }

    #[test]
    fn from_operands_wrong_arity() {
        let err = Instruction::from_operands(Opcode::Halt, vec![Operand::Imm(1)]).unwrap_err();
        assert!(matches!(
            err,
            VMError::ArityMismatch { expected: 0, actual: 1, .. }
        ));
    }

    #[test]
    fn operands_skip_register_slots() {
        let mut instr = Instruction::Set {
            src: Operand::label("gcd"),
            dst: Register::Pc,
        };
        assert_eq!(instr.operands(), vec![&Operand::label("gcd")]);
        assert!(!instr.is_resolved());
        for op in instr.operands_mut() {
            *op = Operand::Imm(9);
        }
        assert!(instr.is_resolved());
        assert_eq!(instr.to_string(), "set 9, PC");
    }

    #[test]
    fn display_without_operands() {
        assert_eq!(Instruction::Halt {}.to_string(), "halt");
        assert_eq!(
            Instruction::Mod {
                a: Operand::Reg(Register::A),
                b: Operand::Imm(20),
                dst: Register::B,
            }
            .to_string(),
            "mod A, 20, B"
        );
    }
}

//! Program construction API.
//!
//! [`ProgramBuilder`] collects procedures and static data in declaration order;
//! [`ProcedureBuilder`] exposes one method per opcode plus the jump and
//! calling-convention helpers.
//!
//! ```
//! use hybrid_vm::virtual_machine::builder::{ProgramBuilder, label};
//! use hybrid_vm::virtual_machine::operand::Register::A;
//!
//! let mut b = ProgramBuilder::new();
//! b.procedure("main", |p| {
//!     p.fmt(label("hello"));
//!     p.set(7, A);
//!     p.halt();
//! });
//! b.data("hello", "Hello, world!");
//! let program = b.build();
//! assert_eq!(program.procedures[0].instructions.len(), 4);
//! ```
//!
//! # Entry pads
//!
//! The step loop increments `PC` after every instruction, including a jump
//! written as `set target, PC`, so execution resumes at `target + 1`. Every
//! procedure therefore begins with a `noop` pad at its label address, and a
//! jump to the label lands on the procedure's first real instruction.
//!
//! # Calling convention
//!
//! There is no call opcode. [`ProcedureBuilder::call`] emits
//!
//! ```text
//! add PC, 2, scratch   # address of the jump below
//! push scratch
//! set target, PC
//! ```
//!
//! and the callee returns with `pop R` … [`ProcedureBuilder::ret`] (`set R, PC`),
//! resuming right after the jump. [`CALL_RETURN_OFFSET`] must match the
//! distance from the `add` to the jump.

use crate::virtual_machine::cell::Value;
use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::Instruction;
use crate::virtual_machine::operand::{Operand, Register};
use crate::virtual_machine::program::{DataItem, Procedure, Program};

/// Distance from the return-address computation to the jump in a call sequence.
pub const CALL_RETURN_OFFSET: i64 = 2;

/// Builds a label operand.
pub fn label(name: impl Into<String>) -> Operand {
    Operand::label(name)
}

/// Collects procedures and data in declaration order.
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    procedures: Vec<Procedure>,
    data: Vec<DataItem>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a procedure and fills it through `body`.
    pub fn procedure(
        &mut self,
        name: impl Into<String>,
        body: impl FnOnce(&mut ProcedureBuilder<'_>),
    ) -> &mut Self {
        let mut proc = self.open_procedure(name);
        body(&mut proc);
        self
    }

    /// Declares a procedure and returns a builder appending to it.
    ///
    /// Later calls to [`current`](Self::current) keep appending to this
    /// procedure until another one is opened.
    pub fn open_procedure(&mut self, name: impl Into<String>) -> ProcedureBuilder<'_> {
        self.procedures.push(Procedure {
            name: name.into(),
            instructions: vec![Instruction::Noop {}],
        });
        let last = self.procedures.len() - 1;
        ProcedureBuilder {
            instructions: &mut self.procedures[last].instructions,
        }
    }

    /// Returns a builder for the most recently opened procedure.
    pub fn current(&mut self) -> Result<ProcedureBuilder<'_>, VMError> {
        self.procedures
            .last_mut()
            .map(|p| ProcedureBuilder {
                instructions: &mut p.instructions,
            })
            .ok_or(VMError::InstructionOutsideProcedure)
    }

    /// Declares a static datum.
    pub fn data(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.data.push(DataItem {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn build(self) -> Program {
        Program {
            procedures: self.procedures,
            data: self.data,
        }
    }
}

/// Appends instructions to one procedure.
#[derive(Debug)]
pub struct ProcedureBuilder<'a> {
    instructions: &'a mut Vec<Instruction>,
}

impl ProcedureBuilder<'_> {
    /// Appends an already-built instruction.
    pub fn instruction(&mut self, instr: Instruction) -> &mut Self {
        self.instructions.push(instr);
        self
    }

    pub fn dis(&mut self, a: impl Into<Operand>) -> &mut Self {
        self.instruction(Instruction::Dis { a: a.into() })
    }

    pub fn fmt(&mut self, addr: impl Into<Operand>) -> &mut Self {
        self.instruction(Instruction::Fmt { addr: addr.into() })
    }

    pub fn set(&mut self, src: impl Into<Operand>, dst: Register) -> &mut Self {
        self.instruction(Instruction::Set {
            src: src.into(),
            dst,
        })
    }

    pub fn add(&mut self, a: impl Into<Operand>, b: impl Into<Operand>, dst: Register) -> &mut Self {
        self.instruction(Instruction::Add {
            a: a.into(),
            b: b.into(),
            dst,
        })
    }

    pub fn sub(&mut self, a: impl Into<Operand>, b: impl Into<Operand>, dst: Register) -> &mut Self {
        self.instruction(Instruction::Sub {
            a: a.into(),
            b: b.into(),
            dst,
        })
    }

    /// `mod a, b, dst`
    pub fn modulo(
        &mut self,
        a: impl Into<Operand>,
        b: impl Into<Operand>,
        dst: Register,
    ) -> &mut Self {
        self.instruction(Instruction::Mod {
            a: a.into(),
            b: b.into(),
            dst,
        })
    }

    pub fn eql(&mut self, a: impl Into<Operand>, b: impl Into<Operand>, dst: Register) -> &mut Self {
        self.instruction(Instruction::Eql {
            a: a.into(),
            b: b.into(),
            dst,
        })
    }

    pub fn ifz(&mut self, r: Register) -> &mut Self {
        self.instruction(Instruction::Ifz { r })
    }

    pub fn ifnz(&mut self, r: Register) -> &mut Self {
        self.instruction(Instruction::Ifnz { r })
    }

    pub fn push(&mut self, a: impl Into<Operand>) -> &mut Self {
        self.instruction(Instruction::Push { a: a.into() })
    }

    pub fn pop(&mut self, dst: Register) -> &mut Self {
        self.instruction(Instruction::Pop { dst })
    }

    pub fn halt(&mut self) -> &mut Self {
        self.instruction(Instruction::Halt {})
    }

    pub fn noop(&mut self) -> &mut Self {
        self.instruction(Instruction::Noop {})
    }

    /// Unconditional jump: `set target, PC`.
    pub fn jump(&mut self, target: impl Into<Operand>) -> &mut Self {
        self.set(target, Register::Pc)
    }

    /// Pushes the return address (clobbering `scratch`) and jumps to `target`.
    pub fn call(&mut self, target: impl Into<Operand>, scratch: Register) -> &mut Self {
        self.add(Register::Pc, CALL_RETURN_OFFSET, scratch)
            .push(scratch)
            .jump(target)
    }

    /// Jumps to the return address held in `reg`.
    pub fn ret(&mut self, reg: Register) -> &mut Self {
        self.jump(reg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::virtual_machine::operand::Register::{A, B, Pc, R};

    #[test]
    fn procedure_starts_with_entry_pad() {
        let mut b = ProgramBuilder::new();
        b.procedure("main", |p| {
            p.halt();
        });
        let program = b.build();
        assert_eq!(
            program.procedures[0].instructions,
            vec![Instruction::Noop {}, Instruction::Halt {}]
        );
    }

    #[test]
    fn call_sequence_shape() {
        let mut b = ProgramBuilder::new();
        b.procedure("main", |p| {
            p.call(label("gcd"), A);
        });
        let instrs = &b.build().procedures[0].instructions;
        assert_eq!(
            instrs[1..],
            [
                Instruction::Add {
                    a: Operand::Reg(Pc),
                    b: Operand::Imm(CALL_RETURN_OFFSET),
                    dst: A,
                },
                Instruction::Push {
                    a: Operand::Reg(A)
                },
                Instruction::Set {
                    src: label("gcd"),
                    dst: Pc,
                },
            ]
        );
        // The pushed address must be the jump's own address.
        let (add_at, jump_at) = (1, instrs.len() - 1);
        assert_eq!((jump_at - add_at) as i64, CALL_RETURN_OFFSET);
    }

    #[test]
    fn ret_jumps_through_register() {
        let mut b = ProgramBuilder::new();
        b.procedure("f", |p| {
            p.pop(R).ret(R);
        });
        let instrs = &b.build().procedures[0].instructions;
        assert_eq!(
            instrs[2],
            Instruction::Set {
                src: Operand::Reg(R),
                dst: Pc,
            }
        );
    }

    #[test]
    fn open_procedure_and_current_append_to_latest() {
        let mut b = ProgramBuilder::new();
        assert!(matches!(
            b.current(),
            Err(VMError::InstructionOutsideProcedure)
        ));
        b.open_procedure("one");
        b.current().unwrap().dis(1);
        b.open_procedure("two");
        b.current().unwrap().dis(2).modulo(A, 3, B);
        let program = b.build();
        assert_eq!(program.procedures[0].instructions.len(), 2);
        assert_eq!(program.procedures[1].instructions.len(), 3);
    }

    #[test]
    fn data_keeps_declaration_order_and_duplicates() {
        let mut b = ProgramBuilder::new();
        b.data("z", 1).data("a", "text").data("z", 1);
        let program = b.build();
        let names: Vec<_> = program.data.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["z", "a", "z"]);
        assert_eq!(program.data[1].value, Value::from("text"));
    }
}

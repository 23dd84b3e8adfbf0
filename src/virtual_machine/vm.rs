//! Core virtual machine implementation.
//!
//! The VM owns one flat [`Memory`] holding code, static data and the stack, plus
//! a six-entry [`Registers`] file. Every step fetches the instruction at `PC`,
//! executes it, and then advances `PC` by one. Control flow is expressed
//! relative to that increment: `halt` steps `PC` back first, a taken skip adds
//! one more, and `set target, PC` resumes at `target + 1`.
//!
//! Arithmetic wraps on overflow. Conditions the instruction set leaves
//! unspecified (stack underflow, reading the wrong kind of cell, `mod` by
//! zero) are reported as [`VMError`]s instead of being executed.

mod config;
mod memory;
mod registers;

pub use config::{DEFAULT_MAX_MEMORY_CELLS, SkipSense, VmConfig};
pub use memory::Memory;
pub use registers::Registers;

use crate::utils::log::{self, Level};
use crate::virtual_machine::cell::{Cell, Value};
use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::Instruction;
use crate::virtual_machine::operand::{Operand, Register};
use crate::virtual_machine::output::Output;
use crate::virtual_machine::program::AssembledProgram;

/// Outcome of a single step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Continue,
    /// A `halt` executed; stepping again re-executes it.
    Halted,
}

/// Outcome of [`VM::run`] or [`VM::run_for`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunSummary {
    /// Steps executed by this call.
    pub steps: u64,
    pub halted: bool,
}

/// Fetch-decode-execute interpreter.
#[derive(Debug)]
pub struct VM {
    memory: Memory,
    registers: Registers,
    config: VmConfig,
    /// Initial `SP`; popping at or below it underflows.
    stack_base: i64,
    steps: u64,
    halted: bool,
}

impl VM {
    /// Loads `program` with the default configuration.
    pub fn new(program: AssembledProgram) -> Result<Self, VMError> {
        Self::with_config(program, VmConfig::default())
    }

    pub fn with_config(program: AssembledProgram, config: VmConfig) -> Result<Self, VMError> {
        Self::from_image(program.image, config)
    }

    /// Loads a raw image at address 0.
    ///
    /// `PC` starts at 0 and `SP` at the last image address, so the first push
    /// lands just past the image.
    pub fn from_image(image: Vec<Cell>, config: VmConfig) -> Result<Self, VMError> {
        let stack_base = image.len() as i64 - 1;
        let memory = Memory::new(image, config.max_memory_cells)?;
        let mut registers = Registers::new();
        registers.set(Register::Sp, stack_base);
        Ok(Self {
            memory,
            registers,
            config,
            stack_base,
            steps: 0,
            halted: false,
        })
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    /// Mutable access for seeding registers before a run.
    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.registers
    }

    pub fn register(&self, r: Register) -> i64 {
        self.registers.get(r)
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    /// Total steps executed since the VM was created.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Runs until a `halt` executes.
    ///
    /// Returns [`VMError::StepLimitExceeded`] if the configured step limit is
    /// reached first.
    pub fn run<O: Output>(&mut self, out: &mut O) -> Result<RunSummary, VMError> {
        let start = self.steps;
        loop {
            if let Some(limit) = self.config.step_limit
                && self.steps - start >= limit
            {
                return Err(VMError::StepLimitExceeded { limit });
            }
            if self.step(out)? == Step::Halted {
                return Ok(RunSummary {
                    steps: self.steps - start,
                    halted: true,
                });
            }
        }
    }

    /// Executes at most `max_steps` steps, stopping early on `halt`.
    pub fn run_for<O: Output>(
        &mut self,
        out: &mut O,
        max_steps: u64,
    ) -> Result<RunSummary, VMError> {
        let start = self.steps;
        while self.steps - start < max_steps {
            if self.step(out)? == Step::Halted {
                return Ok(RunSummary {
                    steps: self.steps - start,
                    halted: true,
                });
            }
        }
        Ok(RunSummary {
            steps: self.steps - start,
            halted: false,
        })
    }

    /// Executes the instruction at `PC` and advances `PC` by one.
    pub fn step<O: Output>(&mut self, out: &mut O) -> Result<Step, VMError> {
        let pc = self.registers.get(Register::Pc);
        let instr = self.memory.fetch(pc)?.clone();
        if self.config.trace && cfg!(not(test)) {
            log::write(Level::Trace, &self.trace_line(pc, &instr));
        }

        let step = self.exec(instr, out)?;
        self.registers.update(Register::Pc, |pc| pc.wrapping_add(1));
        self.steps += 1;
        Ok(step)
    }

    /// One trace record: address, instruction, then the registers before it runs.
    fn trace_line(&self, pc: i64, instr: &Instruction) -> String {
        format!("{pc:>6}  {:<20} {}", instr.to_string(), self.registers)
    }

    fn exec<O: Output>(&mut self, instr: Instruction, out: &mut O) -> Result<Step, VMError> {
        match instr {
            Instruction::Dis { a } => self.op_dis(&a, out)?,
            Instruction::Fmt { addr } => self.op_fmt(&addr, out)?,
            Instruction::Set { src, dst } => self.op_set(&src, dst)?,
            Instruction::Add { a, b, dst } => self.op_binary(&a, &b, dst, i64::wrapping_add)?,
            Instruction::Sub { a, b, dst } => self.op_binary(&a, &b, dst, i64::wrapping_sub)?,
            Instruction::Mod { a, b, dst } => self.op_mod(&a, &b, dst)?,
            Instruction::Eql { a, b, dst } => {
                self.op_binary(&a, &b, dst, |x, y| i64::from(x == y))?
            }
            Instruction::Ifz { r } => self.skip_if(self.registers.get(r) == 0),
            Instruction::Ifnz { r } => self.skip_if(self.registers.get(r) != 0),
            Instruction::Push { a } => self.op_push(&a)?,
            Instruction::Pop { dst } => self.op_pop(dst)?,
            Instruction::Halt {} => return Ok(self.op_halt()),
            Instruction::Noop {} => {}
        }
        Ok(Step::Continue)
    }

    fn resolve(&self, operand: &Operand) -> Result<i64, VMError> {
        operand.resolve(&self.registers)
    }

    fn op_dis<O: Output>(&mut self, a: &Operand, out: &mut O) -> Result<(), VMError> {
        out.emit(&Value::Int(self.resolve(a)?));
        Ok(())
    }

    fn op_fmt<O: Output>(&mut self, addr: &Operand, out: &mut O) -> Result<(), VMError> {
        let address = self.resolve(addr)?;
        let index = self.memory.address(address)?;
        match self.memory.read(address)? {
            Some(Cell::Value(value)) => {
                out.emit(value);
                Ok(())
            }
            Some(cell @ Cell::Instruction(_)) => Err(VMError::WrongCellKind {
                address: index,
                expected: "value",
                actual: cell.kind(),
            }),
            None => Err(VMError::EmptyCell { address: index }),
        }
    }

    fn op_set(&mut self, src: &Operand, dst: Register) -> Result<(), VMError> {
        let v = self.resolve(src)?;
        self.registers.set(dst, v);
        Ok(())
    }

    fn op_binary(
        &mut self,
        a: &Operand,
        b: &Operand,
        dst: Register,
        f: impl FnOnce(i64, i64) -> i64,
    ) -> Result<(), VMError> {
        let (va, vb) = (self.resolve(a)?, self.resolve(b)?);
        self.registers.set(dst, f(va, vb));
        Ok(())
    }

    fn op_mod(&mut self, a: &Operand, b: &Operand, dst: Register) -> Result<(), VMError> {
        let (va, vb) = (self.resolve(a)?, self.resolve(b)?);
        if vb == 0 {
            return Err(VMError::DivisionByZero);
        }
        self.registers.set(dst, va.wrapping_rem(vb));
        Ok(())
    }

    /// Steps over the next instruction when the configured sense says so.
    fn skip_if(&mut self, cond: bool) {
        if self.config.skip_sense.skips(cond) {
            self.registers.update(Register::Pc, |pc| pc.wrapping_add(1));
        }
    }

    /// `SP` is only committed once the slot has been written.
    fn op_push(&mut self, a: &Operand) -> Result<(), VMError> {
        let sp = self.registers.get(Register::Sp).wrapping_add(1);
        let v = match a {
            Operand::Reg(Register::Sp) => sp,
            _ => self.resolve(a)?,
        };
        self.memory.write(sp, Cell::Value(Value::Int(v)))?;
        self.registers.set(Register::Sp, sp);
        Ok(())
    }

    fn op_pop(&mut self, dst: Register) -> Result<(), VMError> {
        let sp = self.registers.get(Register::Sp);
        if sp <= self.stack_base {
            return Err(VMError::StackUnderflow {
                sp,
                base: self.stack_base,
            });
        }
        let index = self.memory.address(sp)?;
        let v = match self.memory.read(sp)? {
            Some(Cell::Value(Value::Int(v))) => *v,
            Some(cell) => {
                return Err(VMError::WrongCellKind {
                    address: index,
                    expected: "integer",
                    actual: cell.kind(),
                });
            }
            None => return Err(VMError::EmptyCell { address: index }),
        };
        self.registers.set(dst, v);
        self.registers.set(Register::Sp, sp - 1);
        Ok(())
    }

    fn op_halt(&mut self) -> Step {
        self.registers.update(Register::Pc, |pc| pc.wrapping_sub(1));
        self.halted = true;
        Step::Halted
    }
}

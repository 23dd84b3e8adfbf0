//! Register/stack hybrid virtual machine.
//!
//! Programs are written as named procedures plus named static data, either
//! through [`builder::ProgramBuilder`] or as text via [`source`]. The
//! [`assembler`] lays them out into one flat memory image and resolves every
//! label to an absolute address; the [`vm`] then executes that image.
//!
//! # Architecture
//!
//! - **Memory**: one growable cell array shared by code, static data and the
//!   stack, in that order. A cell holds an instruction or a value.
//! - **Registers**: `PC`, `SP`, `R`, `A`, `B`, `C`, each a 64-bit integer
//! - **Operands**: immediates, registers, or labels (before assembly only)
//! - **Execution model**: fetch at `PC`, execute, then advance `PC` by one;
//!   jumps write `PC` directly and procedures start with a `noop` entry pad
//! - **Stack**: grows upward from the end of the image; `SP` names the top slot
//!
//! # Modules
//!
//! - [`assembler`]: Layout and label resolution
//! - [`builder`]: Program construction API and calling-convention helpers
//! - [`cell`]: Memory cell and static value types
//! - [`errors`]: Assembly and execution error types
//! - [`isa`]: Instruction set definition
//! - [`operand`]: Registers, operands and operand resolution
//! - [`output`]: Sinks for emitted values
//! - [`program`]: Symbolic program and assembled image
//! - [`source`]: Textual assembly front-end and diagnostics
//! - [`vm`]: Interpreter, memory and register file

pub mod assembler;
pub mod builder;
pub mod cell;
pub mod errors;
pub mod isa;
#[cfg(test)]
mod isa_static_check;
pub mod operand;
pub mod output;
pub mod program;
pub mod source;
pub mod vm;

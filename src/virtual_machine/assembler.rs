//! Two-pass assembler from a symbolic [`Program`] to a flat memory image.
//!
//! Pass 1 ([`layout`]) places every instruction, then every datum, at
//! consecutive addresses starting at 0 and records the first address of each
//! procedure and data item in a [`SymbolTable`]. When a name is declared more
//! than once, the last declaration wins.
//!
//! Pass 2 ([`resolve`]) rewrites every [`Operand::Label`] into an
//! [`Operand::Imm`] holding the bound address. Both passes are pure: the same
//! program always produces the same image.
//!
//! Resolution is a separate pass so that procedures may reference labels
//! declared after them.

use crate::virtual_machine::cell::Cell;
use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::operand::Operand;
use crate::virtual_machine::program::{AssembledProgram, Program, SymbolTable};
use crate::warn;

/// Lays the program out into cells and binds every name to its first address.
///
/// Duplicate names are laid out like any other entry; the last binding wins,
/// so a data item shadows a procedure of the same name.
pub fn layout(program: &Program) -> (Vec<Cell>, SymbolTable) {
    let mut image = Vec::with_capacity(program.image_len());
    let mut symbols = SymbolTable::new();

    for procedure in &program.procedures {
        if !symbols.define(&procedure.name, image.len()) {
            warn!(
                "duplicate label {} rebound to address {}",
                procedure.name,
                image.len()
            );
        }
        image.extend(procedure.instructions.iter().cloned().map(Cell::Instruction));
    }

    for item in &program.data {
        if !symbols.define(&item.name, image.len()) {
            warn!(
                "duplicate label {} rebound to address {}",
                item.name,
                image.len()
            );
        }
        image.push(Cell::Value(item.value.clone()));
    }

    (image, symbols)
}

/// Replaces every label operand in `image` with the address bound in `symbols`.
pub fn resolve(mut image: Vec<Cell>, symbols: &SymbolTable) -> Result<Vec<Cell>, VMError> {
    for (address, cell) in image.iter_mut().enumerate() {
        let Cell::Instruction(instr) = cell else {
            continue;
        };
        for operand in instr.operands_mut() {
            if let Operand::Label(name) = operand {
                let target = symbols
                    .lookup(name)
                    .ok_or_else(|| VMError::UndefinedLabel {
                        label: name.clone(),
                        address,
                    })?;
                *operand = Operand::Imm(target as i64);
            }
        }
    }
    Ok(image)
}

/// Assembles `program` into a resolved memory image.
pub fn assemble(program: &Program) -> Result<AssembledProgram, VMError> {
    let (image, symbols) = layout(program);
    let image = resolve(image, &symbols)?;
    Ok(AssembledProgram {
        image,
        symbols,
        code_len: program.code_len(),
    })
}

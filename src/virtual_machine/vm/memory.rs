use crate::virtual_machine::cell::Cell;
use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::Instruction;

/// Flat, growable cell array shared by code, static data and the stack.
///
/// Cells past the loaded image start out empty. Writes grow the array up to
/// `limit` cells.
#[derive(Clone, Debug)]
pub struct Memory {
    cells: Vec<Option<Cell>>,
    limit: usize,
}

impl Memory {
    /// Loads `image` at address 0.
    ///
    /// Returns [`VMError::MemoryLimitExceeded`] if the image alone is larger
    /// than `limit`.
    pub fn new(image: Vec<Cell>, limit: usize) -> Result<Self, VMError> {
        if image.len() > limit {
            return Err(VMError::MemoryLimitExceeded {
                address: image.len() - 1,
                limit,
            });
        }
        Ok(Self {
            cells: image.into_iter().map(Some).collect(),
            limit,
        })
    }

    /// Converts a register value into a cell index.
    pub fn address(&self, address: i64) -> Result<usize, VMError> {
        usize::try_from(address).map_err(|_| VMError::InvalidAddress { address })
    }

    /// Returns the cell at `address`, or `None` if it was never written.
    pub fn read(&self, address: i64) -> Result<Option<&Cell>, VMError> {
        let index = self.address(address)?;
        Ok(self.cells.get(index).and_then(Option::as_ref))
    }

    pub fn write(&mut self, address: i64, cell: Cell) -> Result<(), VMError> {
        let index = self.address(address)?;
        if index >= self.limit {
            return Err(VMError::MemoryLimitExceeded {
                address: index,
                limit: self.limit,
            });
        }
        if index >= self.cells.len() {
            self.cells.resize(index + 1, None);
        }
        self.cells[index] = Some(cell);
        Ok(())
    }

    /// Returns the instruction stored at `address`.
    pub fn fetch(&self, address: i64) -> Result<&Instruction, VMError> {
        match self.read(address) {
            Ok(Some(Cell::Instruction(instr))) => Ok(instr),
            _ => Err(VMError::NoInstruction { address }),
        }
    }

    /// Number of cells currently allocated, including empty ones.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

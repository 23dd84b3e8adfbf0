use hybrid_vm_derive::Error;

/// Errors that can occur during assembly or execution.
#[derive(Debug, Error)]
pub enum VMError {
    /// The program counter points at an address that holds no instruction.
    #[error("no instruction at address {address}")]
    NoInstruction { address: i64 },
    /// Unrecognized instruction mnemonic.
    #[error("invalid instruction name: {name}")]
    InvalidInstructionName { name: String },
    /// Wrong number of operands for an instruction.
    #[error("{instruction} expects {expected} operand(s), got {actual}")]
    ArityMismatch {
        instruction: String,
        expected: usize,
        actual: usize,
    },
    /// Expected a register name but got something else.
    #[error("expected register, got {0}")]
    ExpectedRegister(String),
    /// Token is neither an integer, a register, nor a label name.
    #[error("invalid operand {token}")]
    InvalidOperand { token: String },
    /// Label operand names a symbol that was never defined.
    #[error("undefined label {label} referenced at address {address}")]
    UndefinedLabel { label: String, address: usize },
    /// Label operand reached the interpreter without being resolved.
    #[error("unresolved label {0} at execution time")]
    UnresolvedLabel(String),
    /// Address is negative.
    #[error("invalid memory address {address}")]
    InvalidAddress { address: i64 },
    /// Write beyond the configured memory size.
    #[error("memory address {address} exceeds the limit of {limit} cells")]
    MemoryLimitExceeded { address: usize, limit: usize },
    /// Read of a cell that was never written.
    #[error("empty memory cell at address {address}")]
    EmptyCell { address: usize },
    /// Cell holds the wrong kind of content for the access.
    #[error("memory cell {address} holds {actual}, expected {expected}")]
    WrongCellKind {
        address: usize,
        expected: &'static str,
        actual: &'static str,
    },
    /// Pop with the stack pointer at or below the stack base.
    #[error("stack underflow: SP {sp} is at or below stack base {base}")]
    StackUnderflow { sp: i64, base: i64 },
    /// Modulo by zero.
    #[error("division by zero")]
    DivisionByZero,
    /// `run` exceeded the configured step limit.
    #[error("step limit of {limit} exceeded")]
    StepLimitExceeded { limit: u64 },
    /// Instruction line appears before any procedure label.
    #[error("instruction outside of a procedure")]
    InstructionOutsideProcedure,
    /// Malformed assembly source.
    #[error("line {line}:{offset}: {message}")]
    ParseError {
        line: usize,
        offset: usize,
        message: &'static str,
    },
    /// Assembly error with source location.
    #[error("line {line}:{offset}: {source}")]
    AssemblyError {
        line: usize,
        offset: usize,
        source: String,
    },
    /// File I/O error while reading assembly source.
    #[error("io error on {path}: {source}")]
    IoError { path: String, source: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_variant_display() {
        assert_eq!(VMError::DivisionByZero.to_string(), "division by zero");
    }

    #[test]
    fn tuple_variant_display() {
        assert_eq!(
            VMError::ExpectedRegister("42".into()).to_string(),
            "expected register, got 42"
        );
    }

    #[test]
    fn named_variant_display() {
        let err = VMError::WrongCellKind {
            address: 7,
            expected: "value",
            actual: "instruction",
        };
        assert_eq!(
            err.to_string(),
            "memory cell 7 holds instruction, expected value"
        );
        assert_eq!(
            VMError::NoInstruction { address: -1 }.to_string(),
            "no instruction at address -1"
        );
    }
}

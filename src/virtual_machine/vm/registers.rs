use crate::virtual_machine::operand::Register;
use std::fmt::{self, Display};

/// Register file indexed by [`Register`].
///
/// Every register holds a 64-bit signed integer and starts at zero.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Registers {
    values: [i64; Register::COUNT],
}

impl Registers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, r: Register) -> i64 {
        self.values[r.index()]
    }

    pub fn set(&mut self, r: Register, v: i64) {
        self.values[r.index()] = v;
    }

    /// Replaces the value of `r` with `f(old)` and returns the new value.
    pub fn update(&mut self, r: Register, f: impl FnOnce(i64) -> i64) -> i64 {
        let slot = &mut self.values[r.index()];
        *slot = f(*slot);
        *slot
    }

    /// Iterates `(register, value)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (Register, i64)> + '_ {
        Register::ALL.into_iter().map(|r| (r, self.get(r)))
    }
}

impl Display for Registers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (r, v)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{r}={v}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_start_at_zero() {
        let regs = Registers::new();
        assert!(regs.iter().all(|(_, v)| v == 0));
    }

    #[test]
    fn update_returns_new_value() {
        let mut regs = Registers::new();
        regs.set(Register::Pc, 41);
        assert_eq!(regs.update(Register::Pc, |pc| pc + 1), 42);
        assert_eq!(regs.get(Register::Pc), 42);
        assert_eq!(regs.get(Register::Sp), 0);
    }

    #[test]
    fn display_lists_every_register() {
        let mut regs = Registers::new();
        regs.set(Register::A, -5);
        assert_eq!(regs.to_string(), "PC=0 SP=0 R=0 A=-5 B=0 C=0");
    }
}

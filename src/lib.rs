//! Hybrid register/stack virtual machine library.
//!
//! Provides a symbolic two-pass assembler, a textual front-end, and the
//! interpreter that runs assembled images.

pub mod utils;
pub mod virtual_machine;

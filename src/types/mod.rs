//! Platform-agnostic types shared across the symbol cache.

pub mod module;
pub mod registers;
pub mod symbol;

pub use module::{Module, ServerInfo};
pub use registers::{Architecture, Arm64Registers, RegisterContext, X8664Registers};
pub use symbol::{ResolvedSymbol, Symbol};

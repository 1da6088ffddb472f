//! # Error Types
//!
//! General error handling for the symbol cache.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.
//!
//! Note that no error in this subsystem is fatal to a caller: the public
//! operations on [`crate::symbols::SymbolCache`] always degrade to a usable
//! fallback (raw address text, a mangled name, or a partial symbol set).
//! `SymbolCacheError` exists so that collaborator implementations — the live
//! debug agent, the static-analysis store, the demangler — can report what
//! went wrong; the cache logs the failure and keeps going.

use thiserror::Error;

/// Main error type for symbol-cache operations
///
/// Each variant corresponds to one of the external collaborators this
/// subsystem depends on, plus the usual catch-alls.
///
/// ## Error Categories
///
/// 1. **Agent errors**: the remote debug agent could not enumerate symbols
///    (network failure, agent detached, target exited)
/// 2. **Static-store errors**: the offline function database failed to answer
///    (absence of a module is *not* an error — that is `Ok(None)`)
/// 3. **Demangler errors**: a batch demangle request failed
/// 4. **Argument errors**: malformed input from a caller
#[derive(Error, Debug)]
pub enum SymbolCacheError
{
    /// The live debug agent failed to enumerate symbols for a module.
    ///
    /// This is a transient failure: the module is still marked loaded with
    /// whatever was obtained, and is never retried automatically (clearing
    /// the cache resets that).
    #[error("Debug agent error: {0}")]
    Agent(String),

    /// The static-analysis store failed while looking up a module.
    ///
    /// Absence of a module in the store is not an error; implementations
    /// return `Ok(None)` for that case.
    #[error("Static-analysis store error: {0}")]
    StaticStore(String),

    /// A batch demangle request failed.
    ///
    /// The affected batch degrades to raw (mangled) names.
    #[error("Demangler error: {0}")]
    Demangle(String),

    /// Invalid argument passed by a caller or a collaborator.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// I/O error (for collaborator implementations backed by files/sockets).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for `Result<T, SymbolCacheError>`
pub type Result<T> = std::result::Result<T, SymbolCacheError>;

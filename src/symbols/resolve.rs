//! Address and name matching helpers.
//!
//! Pure functions shared by the forward (address → symbol) and reverse
//! (name → address) resolvers. The caller supplies the module list on every
//! call; none of this is stateful.

use crate::types::{Module, ResolvedSymbol, Symbol};

/// Result of resolving an address against the module list and the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressResolution
{
    /// No loaded module's range contains the address. Not an error.
    NoModule,
    /// The address belongs to a module but no symbol covers it.
    ///
    /// When `pending` is true the module's symbols were not yet loaded when
    /// the lookup ran; a background load may have been triggered, and a
    /// re-query after it completes can upgrade this to [`AddressResolution::Function`].
    ModuleOnly
    {
        /// Short name of the owning module.
        module_name: String,
        /// Byte offset of the address from the module base.
        offset: u64,
        /// Whether the module's symbols were still unloaded.
        pending: bool,
    },
    /// A cached symbol covers the address.
    Function(ResolvedSymbol),
}

/// Find the module whose `[base, base + size)` range contains `address`.
pub(crate) fn module_containing(address: u64, modules: &[Module]) -> Option<&Module>
{
    modules.iter().find(|module| module.contains(address))
}

/// Find the first cached symbol covering `address`, in store order.
///
/// Ranges should not overlap after the merge; if they somehow do, the first
/// match in insertion order wins. That tie-break is deterministic but not
/// meaning-bearing — callers must not rely on which symbol it is.
pub(crate) fn find_in_symbols(address: u64, symbols: &[Symbol]) -> Option<ResolvedSymbol>
{
    symbols.iter().find(|symbol| symbol.contains(address)).map(|symbol| ResolvedSymbol {
        symbol: symbol.clone(),
        offset: symbol.offset_of(address),
    })
}

/// Whether a module matches a caller-supplied name, case-insensitively.
///
/// Accepts short-name equality (`"libfoo.so"`) or containment within the
/// full path (`"foo"` matching `/usr/lib/libfoo.so`).
pub(crate) fn module_matches(module: &Module, wanted: &str) -> bool
{
    let wanted = wanted.to_lowercase();
    module.short_name().to_lowercase() == wanted || module.name.to_lowercase().contains(&wanted)
}

/// Bidirectional case-insensitive substring match between symbol names.
///
/// Intentionally permissive: callers hand us partial names, and sources hand
/// us decorated ones, so either side containing the other counts.
pub(crate) fn names_match(candidate: &str, wanted: &str) -> bool
{
    let candidate = candidate.to_lowercase();
    let wanted = wanted.to_lowercase();
    candidate.contains(&wanted) || wanted.contains(&candidate)
}

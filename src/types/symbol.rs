//! Symbol types and their range invariant.

use std::fmt;

/// A named address range within a module, typically a function.
///
/// Symbols are immutable once constructed, which is what lets the store hand
/// out clones without worrying about callers mutating cached state. The only
/// invariant worth stating is the range one: `address < end_address`, always.
/// Sources that report a size of zero (common for exported thunks and agent
/// entries with unknown extents) get a one-byte marker range instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol
{
    address: u64,
    end_address: u64,
    name: String,
    module_name: String,
    module_base: u64,
}

impl Symbol
{
    /// Construct a symbol from a start address and a reported size.
    ///
    /// A reported size of 0 yields a one-byte range so the invariant
    /// `address < end_address` holds for every symbol in existence.
    pub fn new(address: u64, size: u64, name: impl Into<String>, module_name: impl Into<String>, module_base: u64) -> Self
    {
        Self {
            address,
            end_address: address.saturating_add(size.max(1)),
            name: name.into(),
            module_name: module_name.into(),
            module_base,
        }
    }

    /// Start address (absolute, in the target's address space).
    pub fn address(&self) -> u64
    {
        self.address
    }

    /// One past the last address covered by this symbol.
    pub fn end_address(&self) -> u64
    {
        self.end_address
    }

    /// Raw symbol name as reported by the source (possibly mangled).
    pub fn name(&self) -> &str
    {
        &self.name
    }

    /// Short name of the owning module (last path component).
    pub fn module_name(&self) -> &str
    {
        &self.module_name
    }

    /// Base address of the owning module.
    pub fn module_base(&self) -> u64
    {
        self.module_base
    }

    /// Whether `address` falls within `[self.address, self.end_address)`.
    pub fn contains(&self, address: u64) -> bool
    {
        address >= self.address && address < self.end_address
    }

    /// Distance in bytes from the symbol start to `address`.
    ///
    /// Only meaningful when [`Symbol::contains`] holds for `address`.
    pub fn offset_of(&self, address: u64) -> u64
    {
        address.saturating_sub(self.address)
    }
}

impl fmt::Display for Symbol
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}@{}", self.module_name, self.name)
    }
}

/// A successful forward lookup: the covering symbol plus the byte offset of
/// the queried address into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSymbol
{
    /// The symbol whose range covers the queried address.
    pub symbol: Symbol,
    /// `queried_address - symbol.address()`.
    pub offset: u64,
}

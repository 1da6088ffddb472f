//! Module and target-description types.
//!
//! A [`Module`] describes a loaded code/library region in the target. The
//! caller (whoever enumerated the target's memory map) supplies the module
//! list on every lookup; this subsystem never owns it and never refreshes it.

use crate::types::Architecture;

/// A loaded code/library region identified by base address, size, and name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module
{
    /// Load address of the module in the target's address space.
    pub base: u64,
    /// Size in bytes of the mapped region.
    pub size: u64,
    /// Full module name as reported by the target, usually a path.
    pub name: String,
}

impl Module
{
    /// Create a module description.
    pub fn new(base: u64, size: u64, name: impl Into<String>) -> Self
    {
        Self {
            base,
            size,
            name: name.into(),
        }
    }

    /// Whether `address` falls within `[base, base + size)`.
    pub fn contains(&self, address: u64) -> bool
    {
        address >= self.base && address < self.base.saturating_add(self.size)
    }

    /// Last path component of the full module name.
    ///
    /// Agents report both `/usr/lib/libfoo.so` and `C:\Windows\bar.dll`
    /// style paths, so both separators are honored.
    pub fn short_name(&self) -> &str
    {
        self.name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(self.name.as_str())
    }
}

/// Description of the attached target, pushed by the UI when a session opens.
///
/// `target_os` keys static-analysis lookups; lookups that miss are retried
/// under `"unknown"` before giving up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo
{
    /// Operating system of the target (e.g. `"ios"`, `"android"`, `"linux"`).
    pub target_os: String,
    /// Target CPU architecture.
    pub arch: Architecture,
}

impl ServerInfo
{
    /// Create a target description.
    pub fn new(target_os: impl Into<String>, arch: Architecture) -> Self
    {
        Self {
            target_os: target_os.into(),
            arch,
        }
    }
}

impl Default for ServerInfo
{
    fn default() -> Self
    {
        Self {
            target_os: "unknown".to_string(),
            arch: Architecture::Unknown,
        }
    }
}

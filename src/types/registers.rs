//! Target architecture and register-context types.
//!
//! Register dumps and exception contexts arrive from the debug agent as part
//! of stop/fault notifications. They are modeled here as a tagged variant per
//! target architecture rather than an open-ended untyped bag: a caller that
//! wants to symbolize a faulting program counter hands the whole context to
//! [`crate::symbols::SymbolCache::find_symbol_for_context`] and the context
//! itself knows where its PC lives.

/// Target CPU architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Architecture
{
    /// 64-bit ARM (AArch64). PC lives in the dedicated `pc` register.
    Arm64,
    /// x86-64. PC is the RIP register.
    X86_64,
    /// Architecture not reported, or not one we know about.
    Unknown,
}

impl std::fmt::Display for Architecture
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        let label = match self {
            Architecture::Arm64 => "arm64",
            Architecture::X86_64 => "x86_64",
            Architecture::Unknown => "unknown",
        };
        write!(f, "{label}")
    }
}

/// ARM64 register file as delivered in an exception context.
///
/// ## ARM64 Register Layout
///
/// - **X0-X28**: general-purpose registers
/// - **X29 (FP)**: frame pointer
/// - **X30 (LR)**: link register (return address)
/// - **SP/PC**: special registers outside the X file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Arm64Registers
{
    /// General-purpose registers X0-X30.
    pub x: [u64; 31],
    /// Stack pointer.
    pub sp: u64,
    /// Program counter.
    pub pc: u64,
    /// Current program status register (condition flags).
    pub cpsr: u64,
}

/// x86-64 register file as delivered in an exception context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct X8664Registers
{
    pub rax: u64,
    pub rbx: u64,
    pub rcx: u64,
    pub rdx: u64,
    pub rsi: u64,
    pub rdi: u64,
    /// Base pointer (frame pointer by convention).
    pub rbp: u64,
    /// Stack pointer.
    pub rsp: u64,
    pub r8: u64,
    pub r9: u64,
    pub r10: u64,
    pub r11: u64,
    pub r12: u64,
    pub r13: u64,
    pub r14: u64,
    pub r15: u64,
    /// Instruction pointer.
    pub rip: u64,
    /// Flags register (condition flags).
    pub rflags: u64,
}

/// A register dump tagged by target architecture.
///
/// The debug agent's exception/watchpoint notifications carry one of these;
/// the accessors below expose the handful of registers the symbol cache (and
/// its UI callers) care about without the caller having to match on the
/// architecture first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterContext
{
    /// ARM64 register set.
    Arm64(Arm64Registers),
    /// x86-64 register set.
    X8664(X8664Registers),
}

impl RegisterContext
{
    /// Architecture this context belongs to.
    pub fn architecture(&self) -> Architecture
    {
        match self {
            RegisterContext::Arm64(_) => Architecture::Arm64,
            RegisterContext::X8664(_) => Architecture::X86_64,
        }
    }

    /// Program counter (PC on ARM64, RIP on x86-64).
    pub fn pc(&self) -> u64
    {
        match self {
            RegisterContext::Arm64(regs) => regs.pc,
            RegisterContext::X8664(regs) => regs.rip,
        }
    }

    /// Stack pointer (SP on ARM64, RSP on x86-64).
    pub fn sp(&self) -> u64
    {
        match self {
            RegisterContext::Arm64(regs) => regs.sp,
            RegisterContext::X8664(regs) => regs.rsp,
        }
    }

    /// Frame pointer (X29 on ARM64, RBP on x86-64).
    pub fn fp(&self) -> u64
    {
        match self {
            RegisterContext::Arm64(regs) => regs.x[29],
            RegisterContext::X8664(regs) => regs.rbp,
        }
    }
}

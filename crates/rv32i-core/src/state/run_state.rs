//! Execution-state machine for a hart: running, or halted with a cause.

use thiserror::Error;

/// Reasons a hart latches the halted state.
///
/// The display strings are the exact reason texts surfaced in the driver's
/// termination report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum HaltCause {
    /// The program counter was not word-aligned at the start of a tick.
    #[error("PC alignment error")]
    PcAlignment,
    /// The fetched word did not decode to an implemented instruction.
    #[error("Illegal instruction")]
    IllegalInstruction,
    /// The program executed `ecall`.
    #[error("ECALL instruction")]
    Ecall,
    /// The program executed `ebreak`.
    #[error("EBREAK instruction")]
    Ebreak,
    /// A CSRRS named a CSR other than `mhartid`, or a source other than `x0`.
    #[error("Illegal CSR in CSRRS instruction")]
    IllegalCsr,
}

/// The hart's two-state execution machine.
///
/// `Halted` is terminal; the driver stops calling `tick` once it is
/// observed. `Halted(None)` is the driver-forced halt on instruction-budget
/// exhaustion, which carries no termination reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RunState {
    /// Ready to execute the next instruction.
    #[default]
    Running,
    /// No further progress; an optional cause explains why.
    Halted(Option<HaltCause>),
}

impl RunState {
    /// Returns true once the hart has stopped.
    #[must_use]
    pub const fn is_halted(self) -> bool {
        matches!(self, Self::Halted(_))
    }

    /// Returns the latched halt cause, if one was recorded.
    #[must_use]
    pub const fn cause(self) -> Option<HaltCause> {
        match self {
            Self::Halted(cause) => cause,
            Self::Running => None,
        }
    }
}

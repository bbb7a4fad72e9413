//! VM trace reconstruction.
//!
//! This module handles:
//! - Decoding opcode mnemonics from bytecode
//! - Flattening parity's nested VM traces
//! - Passing geth's flat struct logs through

pub mod opcode;
pub mod walker;

pub use walker::walk;

use crate::ethereum::geth::StructLogTrace;
use crate::ethereum::parity::VmTrace;
use crate::ethereum::types::VmState;
use crate::utils::error::TraceError;

/// Dialect-specific VM trace as returned by the node
#[derive(Debug, Clone)]
pub enum RawVmTrace {
    /// parity: a tree of frames, one per CALL/CREATE
    Nested(VmTrace),
    /// geth: struct logs already in execution order
    Flat(StructLogTrace),
}

impl RawVmTrace {
    /// Canonical, execution-ordered states
    pub fn into_states(self) -> Result<Vec<VmState>, TraceError> {
        match self {
            RawVmTrace::Nested(trace) => walk(&trace),
            RawVmTrace::Flat(trace) => trace.into_states(),
        }
    }
}

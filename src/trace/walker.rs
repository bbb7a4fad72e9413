//! Flattening of nested parity VM traces.
//!
//! A parity `vmTrace` is a tree: every CALL/CREATE instruction that entered
//! a new frame carries the frame's own trace in `sub`. The walker emits one
//! [`VmState`] per instruction in execution order, inlining each sub-trace
//! right after the instruction that spawned it.
//!
//! # Algorithm
//! 1. Decode the first instruction of a frame from the frame's bytecode
//! 2. Inherit the previous instruction's stack unless that instruction was
//!    call-type, in which case the inherited stack is dropped
//! 3. Decode the next instruction's mnemonic before emitting the current one
//! 4. Emit the instruction, then recursively emit its sub-trace and mark the
//!    sub-trace's last state terminal
//! 5. Mark the last state overall terminal
//!
//! The previous stack and the active bytecode are passed down explicitly,
//! so the input tree is never mutated.

use super::opcode::{is_call_type, mnemonic};
use crate::ethereum::parity::{VmOperation, VmTrace};
use crate::ethereum::types::{MemoryChunk, StorageChange, VmState};
use crate::utils::error::TraceError;
use alloy_primitives::U256;
use log::debug;

/// Flatten a nested VM trace into execution-ordered states
///
/// **Public** - main entry point for trace reconstruction
///
/// # Errors
/// * `TraceError::PcOutOfRange` - an instruction points outside its frame's bytecode
pub fn walk(trace: &VmTrace) -> Result<Vec<VmState>, TraceError> {
    let mut states = Vec::with_capacity(trace.ops.len());
    walk_frame(trace, 1, &mut states)?;

    if let Some(last) = states.last_mut() {
        last.terminal = true;
    }

    debug!(
        "Walked {} top-level instructions into {} states",
        trace.ops.len(),
        states.len()
    );

    Ok(states)
}

/// Decode the instruction at `pc` of the active bytecode
fn decode(code: &[u8], pc: u64) -> Result<&'static str, TraceError> {
    usize::try_from(pc)
        .ok()
        .and_then(|offset| code.get(offset))
        .map(|&byte| mnemonic(byte))
        .ok_or(TraceError::PcOutOfRange {
            pc,
            code_len: code.len(),
        })
}

fn walk_frame(trace: &VmTrace, depth: usize, out: &mut Vec<VmState>) -> Result<(), TraceError> {
    let code = trace.code.as_ref();
    let Some(first) = trace.ops.first() else {
        return Ok(());
    };

    // A single-instruction frame is decoded here and never needs lookahead
    let mut current_op = decode(code, first.pc)?;
    let mut previous: Option<(&'static str, Option<Vec<U256>>)> = None;

    for (i, step) in trace.ops.iter().enumerate() {
        let stack = match previous {
            Some((prev_op, _)) if is_call_type(prev_op) => step.stack.clone(),
            Some((_, prev_stack)) => step.stack.clone().or(prev_stack),
            None => step.stack.clone(),
        };

        let next_op = match trace.ops.get(i + 1) {
            Some(next) => Some(decode(code, next.pc)?),
            None => None,
        };

        let index = out.len();
        out.push(to_state(step, current_op, depth, stack.clone()));

        if let Some(sub) = &step.sub {
            let start = out.len();
            walk_frame(sub, depth + 1, out)?;

            out[index].inlined_steps = out.len() - start;
            if let Some(last) = out[start..].last_mut() {
                last.terminal = true;
            }
        }

        previous = Some((current_op, stack));
        if let Some(op) = next_op {
            current_op = op;
        }
    }

    Ok(())
}

fn to_state(step: &VmOperation, op: &'static str, depth: usize, stack: Option<Vec<U256>>) -> VmState {
    let ex = step.ex.as_ref();

    VmState {
        pc: step.pc,
        op: op.to_string(),
        gas: ex.map_or(0, |e| e.used),
        gas_cost: step.cost,
        depth,
        stack,
        pushed: ex.map(|e| e.push.clone()).unwrap_or_default(),
        memory: ex.and_then(|e| e.mem.as_ref()).map(|mem| MemoryChunk {
            offset: mem.off,
            data: mem.data.clone(),
        }),
        storage: ex.and_then(|e| e.store).map(|store| StorageChange {
            key: store.key,
            value: store.val,
        }),
        error: None,
        inlined_steps: 0,
        terminal: false,
    }
}

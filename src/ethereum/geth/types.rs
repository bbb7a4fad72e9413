//! Wire shapes returned by geth-family nodes.

use crate::ethereum::types::{
    Block as CanonicalBlock, BlockHeader, CallTrace, Log as CanonicalLog, MemoryChunk,
    StorageChange, Transaction as CanonicalTransaction, TransactionReceipt as CanonicalReceipt,
    VmState,
};
use crate::utils::error::TraceError;
use alloy_primitives::{Address, Bloom, Bytes, B256, U256, U64};
use serde::Deserialize;
use serde_json::Value;

/// Block as returned by `eth_getBlockBy*`
///
/// `TX` is [`Transaction`] for full blocks and [`Value`] when only hashes
/// were requested.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block<TX = Transaction> {
    pub number: Option<U64>,
    pub hash: Option<B256>,
    pub parent_hash: B256,
    pub timestamp: U256,
    #[serde(default)]
    pub difficulty: U256,
    pub gas_limit: U256,
    pub gas_used: U256,
    pub base_fee_per_gas: Option<U256>,
    /// Null while the block is pending
    pub miner: Option<Address>,
    #[serde(default = "Vec::new")]
    pub transactions: Vec<TX>,
}

impl<TX> Block<TX> {
    fn header(&self) -> BlockHeader {
        BlockHeader {
            number: self.number.map(|n| n.to()),
            hash: self.hash,
            parent_hash: self.parent_hash,
            timestamp: self.timestamp,
            difficulty: self.difficulty,
            gas_limit: self.gas_limit,
            gas_used: self.gas_used,
            gas_price: None,
            base_fee_per_gas: self.base_fee_per_gas,
            coinbase: self.miner,
        }
    }
}

impl From<Block<Transaction>> for CanonicalBlock {
    fn from(block: Block<Transaction>) -> Self {
        CanonicalBlock {
            header: block.header(),
            transactions: block.transactions.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<Block<Value>> for BlockHeader {
    fn from(block: Block<Value>) -> Self {
        block.header()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub hash: B256,
    pub nonce: U64,
    pub from: Address,
    pub to: Option<Address>,
    pub input: Bytes,
    pub value: U256,
    pub gas: U256,
    pub gas_price: Option<U256>,
    pub block_number: Option<U64>,
    pub block_hash: Option<B256>,
    pub transaction_index: Option<U64>,
}

impl From<Transaction> for CanonicalTransaction {
    fn from(tx: Transaction) -> Self {
        CanonicalTransaction {
            hash: tx.hash,
            nonce: tx.nonce.to(),
            from: tx.from,
            to: tx.to,
            input: tx.input,
            value: tx.value,
            gas: tx.gas,
            gas_price: tx.gas_price,
            block_number: tx.block_number.map(|n| n.to()),
            block_hash: tx.block_hash,
            transaction_index: tx.transaction_index.map(|n| n.to()),
            creates: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Log {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    #[serde(default)]
    pub removed: bool,
    pub block_number: Option<U64>,
    pub transaction_hash: Option<B256>,
    pub log_index: Option<U64>,
}

impl From<Log> for CanonicalLog {
    fn from(log: Log) -> Self {
        CanonicalLog {
            address: log.address,
            topics: log.topics,
            data: log.data,
            removed: log.removed,
            block_number: log.block_number.map(|n| n.to()),
            transaction_hash: log.transaction_hash,
            log_index: log.log_index.map(|n| n.to()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    pub transaction_index: U64,
    pub block_hash: B256,
    pub block_number: U64,
    pub gas_used: U256,
    pub cumulative_gas_used: U256,
    pub contract_address: Option<Address>,
    pub status: Option<U64>,
    pub logs: Vec<Log>,
    pub logs_bloom: Bloom,
    pub root: Option<B256>,
}

impl From<TransactionReceipt> for CanonicalReceipt {
    fn from(receipt: TransactionReceipt) -> Self {
        CanonicalReceipt {
            transaction_hash: receipt.transaction_hash,
            transaction_index: receipt.transaction_index.to(),
            block_hash: receipt.block_hash,
            block_number: receipt.block_number.to(),
            gas_used: receipt.gas_used,
            cumulative_gas_used: receipt.cumulative_gas_used,
            contract_address: receipt.contract_address,
            status: receipt.status.map(|s| s.to()),
            logs: receipt.logs.into_iter().map(Into::into).collect(),
            logs_bloom: receipt.logs_bloom,
            root: receipt.root,
        }
    }
}

/// Header carried by a `newHeads` notification
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationHeader {
    pub number: U64,
}

/// `params` of an `eth_subscription` notification
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionResult {
    pub subscription: String,
    pub result: NotificationHeader,
}

/// Result of `debug_traceTransaction` with the default struct logger
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructLogTrace {
    #[serde(default)]
    pub gas: u64,
    #[serde(default)]
    pub failed: bool,
    #[serde(default)]
    pub return_value: String,
    #[serde(default)]
    pub struct_logs: Vec<StructLog>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructLog {
    pub pc: u64,
    pub op: String,
    pub gas: u64,
    pub gas_cost: u64,
    pub depth: usize,
    pub stack: Option<Vec<String>>,
    pub memory: Option<Vec<String>>,
    pub error: Option<String>,
}

fn parse_word(word: &str) -> Option<U256> {
    let digits = word.strip_prefix("0x").unwrap_or(word);
    if digits.is_empty() {
        return Some(U256::ZERO);
    }
    U256::from_str_radix(digits, 16).ok()
}

fn parse_memory(words: &[String]) -> Result<Bytes, TraceError> {
    let mut data = Vec::with_capacity(words.len() * 32);
    for word in words {
        let digits = word.strip_prefix("0x").unwrap_or(word);
        let bytes = alloy_primitives::hex::decode(digits)
            .map_err(|_| TraceError::InvalidMemoryWord(word.clone()))?;
        data.extend_from_slice(&bytes);
    }
    Ok(Bytes::from(data))
}

impl StructLogTrace {
    /// Convert the flat struct logs into canonical states
    ///
    /// The logs are already in execution order with mnemonics and full
    /// stacks, so no walking is needed. A log is terminal when the next
    /// one returns to a shallower frame, or when it is the last one.
    pub fn into_states(self) -> Result<Vec<VmState>, TraceError> {
        let logs = self.struct_logs;
        let mut states = Vec::with_capacity(logs.len());

        for (i, log) in logs.iter().enumerate() {
            let stack = match &log.stack {
                Some(words) => Some(
                    words
                        .iter()
                        .map(|w| parse_word(w).ok_or_else(|| TraceError::InvalidStackWord(w.clone())))
                        .collect::<Result<Vec<_>, _>>()?,
                ),
                None => None,
            };

            let memory = match &log.memory {
                Some(words) if !words.is_empty() => Some(MemoryChunk {
                    offset: 0,
                    data: parse_memory(words)?,
                }),
                _ => None,
            };

            // SSTORE pops key then value from the top of the stack
            let storage = match (&stack, log.op.as_str()) {
                (Some(words), "SSTORE") if words.len() >= 2 => Some(StorageChange {
                    key: words[words.len() - 1],
                    value: words[words.len() - 2],
                }),
                _ => None,
            };

            let inlined_steps = logs[i + 1..]
                .iter()
                .take_while(|next| next.depth > log.depth)
                .count();

            let terminal = logs.get(i + 1).map_or(true, |next| next.depth < log.depth);

            states.push(VmState {
                pc: log.pc,
                op: log.op.clone(),
                gas: log.gas,
                gas_cost: log.gas_cost,
                depth: log.depth,
                stack,
                pushed: Vec::new(),
                memory,
                storage,
                error: log.error.clone(),
                inlined_steps,
                terminal,
            });
        }

        Ok(states)
    }
}

/// One frame of the `callTracer` output
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallFrame {
    #[serde(rename = "type")]
    pub call_type: String,
    pub from: Address,
    pub to: Option<Address>,
    #[serde(default)]
    pub input: Bytes,
    #[serde(default)]
    pub output: Bytes,
    #[serde(default)]
    pub gas: U64,
    #[serde(default)]
    pub gas_used: U64,
    pub value: Option<U256>,
    pub error: Option<String>,
    #[serde(default)]
    pub calls: Vec<CallFrame>,
}

impl CallFrame {
    /// Flatten the frame tree pre-order, computing each frame's trace address
    pub fn flatten(self) -> Vec<CallTrace> {
        let mut traces = Vec::new();
        self.flatten_into(Vec::new(), &mut traces);
        traces
    }

    fn flatten_into(self, trace_address: Vec<usize>, traces: &mut Vec<CallTrace>) {
        traces.push(CallTrace {
            call_type: self.call_type.to_lowercase(),
            from: self.from,
            to: self.to,
            input: self.input,
            output: self.output,
            gas: self.gas.to(),
            gas_used: self.gas_used.to(),
            value: self.value.unwrap_or_default(),
            trace_address: trace_address.clone(),
            subtraces: self.calls.len(),
            error: self.error,
        });

        for (index, child) in self.calls.into_iter().enumerate() {
            let mut child_address = trace_address.clone();
            child_address.push(index);
            child.flatten_into(child_address, traces);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_struct_logs_terminal_and_inlining() {
        let trace: StructLogTrace = serde_json::from_value(json!({
            "gas": 30000,
            "failed": false,
            "returnValue": "",
            "structLogs": [
                {"pc": 0, "op": "PUSH1", "gas": 100, "gasCost": 3, "depth": 1, "stack": []},
                {"pc": 2, "op": "CALL", "gas": 97, "gasCost": 40, "depth": 1, "stack": ["0x1"]},
                {"pc": 0, "op": "PUSH1", "gas": 50, "gasCost": 3, "depth": 2, "stack": []},
                {"pc": 2, "op": "STOP", "gas": 47, "gasCost": 0, "depth": 2, "stack": ["0x2"]},
                {"pc": 3, "op": "STOP", "gas": 40, "gasCost": 0, "depth": 1, "stack": ["0x1"]}
            ]
        }))
        .unwrap();

        let states = trace.into_states().unwrap();
        let terminals: Vec<bool> = states.iter().map(|s| s.terminal).collect();
        let inlined: Vec<usize> = states.iter().map(|s| s.inlined_steps).collect();

        assert_eq!(terminals, vec![false, false, false, true, true]);
        assert_eq!(inlined, vec![0, 2, 0, 0, 0]);
        assert_eq!(states[3].stack, Some(vec![U256::from(2)]));
    }

    #[test]
    fn test_struct_log_sstore() {
        let trace: StructLogTrace = serde_json::from_value(json!({
            "structLogs": [{
                "pc": 7, "op": "SSTORE", "gas": 20000, "gasCost": 20000, "depth": 1,
                "stack": [
                    "0000000000000000000000000000000000000000000000000000000000000005",
                    "0000000000000000000000000000000000000000000000000000000000000001"
                ]
            }]
        }))
        .unwrap();

        let states = trace.into_states().unwrap();
        assert_eq!(
            states[0].storage,
            Some(StorageChange {
                key: U256::from(1),
                value: U256::from(5)
            })
        );
    }

    #[test]
    fn test_call_frame_flatten() {
        let frame: CallFrame = serde_json::from_value(json!({
            "type": "CALL",
            "from": "0x00000000000000000000000000000000000000aa",
            "to": "0x00000000000000000000000000000000000000bb",
            "input": "0x",
            "gas": "0x100",
            "gasUsed": "0x80",
            "value": "0x0",
            "calls": [
                {
                    "type": "STATICCALL",
                    "from": "0x00000000000000000000000000000000000000bb",
                    "to": "0x00000000000000000000000000000000000000cc",
                    "input": "0x01",
                    "gas": "0x40",
                    "gasUsed": "0x10",
                    "calls": [{
                        "type": "CALL",
                        "from": "0x00000000000000000000000000000000000000cc",
                        "to": "0x00000000000000000000000000000000000000dd",
                        "input": "0x",
                        "gas": "0x20",
                        "gasUsed": "0x20",
                        "error": "out of gas"
                    }]
                },
                {
                    "type": "DELEGATECALL",
                    "from": "0x00000000000000000000000000000000000000bb",
                    "to": "0x00000000000000000000000000000000000000ee",
                    "input": "0x",
                    "gas": "0x30",
                    "gasUsed": "0x5"
                }
            ]
        }))
        .unwrap();

        let traces = frame.flatten();
        let addresses: Vec<Vec<usize>> = traces.iter().map(|t| t.trace_address.clone()).collect();

        assert_eq!(addresses, vec![vec![], vec![0], vec![0, 0], vec![1]]);
        assert_eq!(traces[0].subtraces, 2);
        assert_eq!(traces[1].call_type, "staticcall");
        assert!(traces[2].reverted());
        assert_eq!(traces[3].gas_used, 5);
    }
}

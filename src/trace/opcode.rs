//! EVM opcode mnemonics, taken from revm's instruction table.

use revm::interpreter::opcode::OpCode;

/// Mnemonic reported for bytes that are not a defined instruction
pub const UNKNOWN_MNEMONIC: &str = "UNKNOWN";

/// Mnemonic of a single opcode byte, or `None` if the byte is undefined
pub fn name(op: u8) -> Option<&'static str> {
    OpCode::new(op).map(|op| op.as_str())
}

/// Mnemonic of an opcode byte, falling back to [`UNKNOWN_MNEMONIC`]
pub fn mnemonic(op: u8) -> &'static str {
    name(op).unwrap_or(UNKNOWN_MNEMONIC)
}

/// True for instructions that open a new call frame
pub fn is_call_type(mnemonic: &str) -> bool {
    matches!(
        mnemonic,
        "CALL" | "CALLCODE" | "DELEGATECALL" | "STATICCALL" | "CREATE" | "CREATE2"
    )
}

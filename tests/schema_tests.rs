mod support;

use ethnode_trace::client::NodeClient;
use ethnode_trace::ethereum::{Dialect, Schema};
use serde_json::json;
use support::{fast_config, MockTransport};

#[test]
fn test_version_info_selects_parity() {
    let mock = MockTransport::new();
    mock.reply(
        "parity_versionInfo",
        json!({"hash": "0x2ae8b4c", "track": "stable", "version": {"major": 2, "minor": 7, "patch": 2}}),
    );

    let client = NodeClient::with_transport(mock.clone(), fast_config());
    assert_eq!(client.schema().dialect(), Dialect::Parity);
}

#[test]
fn test_unknown_method_selects_geth() {
    let mock = MockTransport::new();

    let client = NodeClient::with_transport(mock.clone(), fast_config());
    assert_eq!(client.schema(), Schema::GETH);
    assert_eq!(mock.calls("parity_versionInfo"), 1);
}

#[test]
fn test_other_node_error_selects_geth() {
    let mock = MockTransport::new();
    mock.reply_error("parity_versionInfo", -32000, "internal error");

    let client = NodeClient::with_transport(mock.clone(), fast_config());
    assert_eq!(client.schema(), Schema::GETH);
    assert_eq!(mock.calls("parity_versionInfo"), 1);
}

#[test]
fn test_broken_connection_selects_geth() {
    let mock = MockTransport::new();
    mock.break_method("parity_versionInfo");

    let client = NodeClient::with_transport(mock.clone(), fast_config());
    assert_eq!(client.schema().dialect(), Dialect::Geth);
}

#[test]
fn test_malformed_version_selects_geth() {
    let mock = MockTransport::new();
    mock.reply("parity_versionInfo", json!("Geth/v1.13.5"));

    let client = NodeClient::with_transport(mock.clone(), fast_config());
    assert_eq!(client.schema().dialect(), Dialect::Geth);
}

#[test]
fn test_dialect_is_detected_once() {
    let mock = MockTransport::new();
    mock.reply("eth_blockNumber", json!("0x10"));

    let client = NodeClient::with_transport(mock.clone(), fast_config());
    for _ in 0..3 {
        assert_eq!(client.current_block_number().unwrap(), 16);
    }

    // Later calls and clones never ask again
    let clone = client.clone();
    clone.current_block_number().unwrap();
    assert_eq!(mock.calls("parity_versionInfo"), 1);
}

#[test]
fn test_trace_requests_follow_dialect() {
    let hash = support::TX_HASH;

    let geth = Schema::GETH.trace().vm_trace(hash);
    assert_eq!(geth.method(), "debug_traceTransaction");
    assert_eq!(geth.request().params[0], json!(hash));

    let parity = Schema::PARITY.trace().vm_trace(hash);
    assert_eq!(parity.method(), "trace_replayTransaction");
    assert_eq!(parity.request().params[1], json!(["vmTrace"]));

    // Non-trace domains are shared
    assert_eq!(
        Schema::GETH.eth().get_transaction_receipt(hash).request(),
        Schema::PARITY.eth().get_transaction_receipt(hash).request()
    );
}

//! Types for JSON-RPC 2.0 communication with an Ethereum node.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A method call before it is assigned an id by the transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub method: String,
    pub params: Vec<Value>,
}

impl Request {
    pub fn new(method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC 2.0 request structure
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub method: &'a str,
    pub params: &'a [Value],
    pub id: u64,
}

impl<'a> JsonRpcRequest<'a> {
    /// Wrap a request in an envelope
    ///
    /// # Arguments
    /// * `request` - Method and parameters
    /// * `id` - Request ID (for response correlation)
    pub fn new(request: &'a Request, id: u64) -> Self {
        Self {
            jsonrpc: "2.0",
            method: &request.method,
            params: &request.params,
            id,
        }
    }
}

/// JSON-RPC 2.0 response structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    #[serde(default, deserialize_with = "present")]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: u64, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Value::from(id),
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: u64, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Value::from(id),
            result: None,
            error: Some(error),
        }
    }
}

/// Keep an explicit `null` as `Some(Value::Null)`; only a missing field is `None`
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// JSON-RPC error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Raw envelope used for dynamic call forwarding
///
/// Only `result` and `error` are rewritten when the call completes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// Server-initiated message delivered on a subscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl Notification {
    /// Subscription id the notification belongs to
    pub fn subscription(&self) -> Option<&str> {
        self.params.get("subscription").and_then(Value::as_str)
    }
}

/// Opaque handle the node assigns to an open subscription
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(pub String);

impl SubscriptionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_serialization() {
        let request = Request::new("eth_getBalance", vec![json!("0xabc"), json!("latest")]);
        let envelope = serde_json::to_value(JsonRpcRequest::new(&request, 7)).unwrap();

        assert_eq!(
            envelope,
            json!({
                "jsonrpc": "2.0",
                "method": "eth_getBalance",
                "params": ["0xabc", "latest"],
                "id": 7
            })
        );
    }

    #[test]
    fn test_notification_subscription_id() {
        let notification: Notification = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "method": "eth_subscription",
            "params": {"subscription": "0x9ce5", "result": {"number": "0x1b4"}}
        }))
        .unwrap();

        assert_eq!(notification.subscription(), Some("0x9ce5"));
    }

    #[test]
    fn test_error_response() {
        let response: JsonRpcResponse = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {"code": -32601, "message": "method not found"}
        }))
        .unwrap();

        assert!(response.result.is_none());
        assert_eq!(response.error.unwrap().code, -32601);
    }

    #[test]
    fn test_null_result_is_kept() {
        let response: JsonRpcResponse =
            serde_json::from_value(json!({"jsonrpc": "2.0", "id": 1, "result": null})).unwrap();
        assert_eq!(response.result, Some(Value::Null));

        let response: JsonRpcResponse =
            serde_json::from_value(json!({"jsonrpc": "2.0", "id": 1})).unwrap();
        assert_eq!(response.result, None);
    }

    #[test]
    fn test_message_null_result_round_trips() {
        let message: Message =
            serde_json::from_value(json!({"method": "eth_getBlockByHash", "result": null})).unwrap();
        assert_eq!(message.result, Some(Value::Null));

        let encoded = serde_json::to_value(&message).unwrap();
        assert_eq!(encoded, json!({"method": "eth_getBlockByHash", "result": null}));
    }
}

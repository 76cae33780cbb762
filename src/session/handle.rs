//! Stateful protocol session handle.
//!
//! A session is a long-lived JSON-RPC conversation. The handle serializes
//! message handling through a per-session lock so messages for one session
//! are observed strictly in arrival order, and exposes the gateway's lookup
//! operations as callable tools.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::api;
use crate::error::GatewayError;
use crate::upstream::SearchClient;

const PROTOCOL_VERSION: &str = "2025-03-26";

/// JSON-RPC error codes used on the protocol surface.
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_REQUEST: i64 = -32600;

pub struct ProtocolSession {
    id: String,
    search: Arc<SearchClient>,
    initialized: AtomicBool,
    closed: AtomicBool,
    messages_handled: AtomicU64,
    // tokio's Mutex queues waiters fairly, which is what gives one session's
    // messages their arrival-order guarantee.
    message_lock: Mutex<()>,
}

impl ProtocolSession {
    pub fn new(id: String, search: Arc<SearchClient>) -> Self {
        Self {
            id,
            search,
            initialized: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            messages_handled: AtomicU64::new(0),
            message_lock: Mutex::new(()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn messages_handled(&self) -> u64 {
        self.messages_handled.load(Ordering::Relaxed)
    }

    /// Handle one JSON-RPC message.
    ///
    /// Returns `Ok(None)` for notifications (no response expected).
    pub async fn handle_message(&self, message: Value) -> Result<Option<Value>, GatewayError> {
        let _ordered = self.message_lock.lock().await;

        if self.is_closed() {
            return Err(GatewayError::SessionNotFound(self.id.clone()));
        }

        let method = message
            .get("method")
            .and_then(Value::as_str)
            .ok_or_else(|| GatewayError::Validation("missing JSON-RPC method".to_string()))?
            .to_string();
        let msg_id = message.get("id").cloned();
        self.messages_handled.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(session_id = %self.id, method = %method, "protocol_message");

        let outcome = match method.as_str() {
            "initialize" => {
                self.initialized.store(true, Ordering::Release);
                Ok(json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "serverInfo": {
                        "name": "sukl-gateway",
                        "version": env!("CARGO_PKG_VERSION"),
                    },
                    "capabilities": { "tools": {} },
                }))
            }
            "notifications/initialized" => return Ok(None),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(tool_descriptors()),
            "tools/call" => self.call_tool(message.get("params")).await,
            _ => {
                return Ok(Some(rpc_error(
                    msg_id,
                    METHOD_NOT_FOUND,
                    &format!("method {method} not supported"),
                )))
            }
        };

        // Notifications carry no id and get no reply even on failure.
        let Some(msg_id) = msg_id else {
            return Ok(None);
        };

        Ok(Some(match outcome {
            Ok(result) => json!({ "jsonrpc": "2.0", "id": msg_id, "result": result }),
            Err(GatewayError::Validation(msg)) => rpc_error(Some(msg_id), INVALID_REQUEST, &msg),
            // Tool failures stay inside the protocol envelope so the caller
            // can distinguish them from transport-level errors.
            Err(err) => json!({
                "jsonrpc": "2.0",
                "id": msg_id,
                "result": {
                    "content": [{ "type": "text", "text": err.to_string() }],
                    "isError": true,
                },
            }),
        }))
    }

    async fn call_tool(&self, params: Option<&Value>) -> Result<Value, GatewayError> {
        let params = params.ok_or_else(|| {
            GatewayError::Validation("tools/call requires params".to_string())
        })?;
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| GatewayError::Validation("tools/call requires a tool name".to_string()))?;
        let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

        let result = match name {
            "search_drugs" => {
                let args: api::drugs::DrugSearchParams = serde_json::from_value(arguments)
                    .map_err(|e| GatewayError::Validation(format!("invalid arguments: {e}")))?;
                api::drugs::search_drugs(&self.search, &args).await?
            }
            "get_drug_detail" => {
                let kod = arguments
                    .get("kod")
                    .and_then(Value::as_str)
                    .ok_or_else(|| GatewayError::Validation("missing argument: kod".to_string()))?;
                api::drugs::drug_detail(&self.search, kod).await?
            }
            "search_documents" => {
                let args: api::documents::DocumentSearchParams = serde_json::from_value(arguments)
                    .map_err(|e| GatewayError::Validation(format!("invalid arguments: {e}")))?;
                api::documents::search_documents(&self.search, &args).await?
            }
            "search_pharmacies" => {
                let args: api::pharmacies::PharmacySearchParams = serde_json::from_value(arguments)
                    .map_err(|e| GatewayError::Validation(format!("invalid arguments: {e}")))?;
                api::pharmacies::search_pharmacies(&self.search, &args).await?
            }
            "get_pharmacy_detail" => {
                let kod = arguments
                    .get("kodPracoviste")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        GatewayError::Validation("missing argument: kodPracoviste".to_string())
                    })?;
                api::pharmacies::pharmacy_detail(&self.search, kod).await?
            }
            other => {
                return Err(GatewayError::Validation(format!("unknown tool: {other}")));
            }
        };

        Ok(json!({
            "content": [{ "type": "text", "text": result.to_string() }],
        }))
    }

    /// Close the session. Idempotent; an error here must not stop the
    /// registry from removing the entry.
    pub fn close(&self) -> Result<(), GatewayError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        tracing::info!(
            session_id = %self.id,
            messages = self.messages_handled.load(Ordering::Relaxed),
            "session_closed"
        );
        Ok(())
    }
}

fn rpc_error(id: Option<Value>, code: i64, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id.unwrap_or(Value::Null),
        "error": { "code": code, "message": message },
    })
}

fn tool_descriptors() -> Value {
    json!({
        "tools": [
            {
                "name": "search_drugs",
                "description": "Vyhledá léčivé přípravky v registru SÚKL podle názvu, účinné látky nebo indikace.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "q": { "type": "string", "description": "Dotaz — název léku, účinná látka, indikace." },
                        "atc": { "type": "string", "description": "Filtr podle ATC kódu (např. N02BE01)." },
                        "holder": { "type": "string", "description": "Filtr podle držitele registrace." },
                        "dispensing": { "type": "string", "enum": ["prescription", "otc", "restricted", "reserved", "otc-restricted"] },
                        "doping": { "type": "boolean" },
                        "available": { "type": "boolean", "description": "Jen přípravky s aktivními dodávkami." },
                        "form": { "type": "string", "description": "Léková forma (např. tableta)." },
                        "maxResults": { "type": "integer", "minimum": 1, "maximum": 50 }
                    },
                    "required": ["q"]
                }
            },
            {
                "name": "get_drug_detail",
                "description": "Vrátí úplný detail léčivého přípravku podle kódu SÚKL.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "kod": { "type": "string", "description": "Kód SÚKL (číselný, až 7 číslic)." }
                    },
                    "required": ["kod"]
                }
            },
            {
                "name": "search_documents",
                "description": "Fulltextové vyhledávání v SPC dokumentech — nežádoucí účinky, kontraindikace, dávkování.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "q": { "type": "string", "description": "Dotaz, alespoň 2 znaky." },
                        "maxResults": { "type": "integer", "minimum": 1, "maximum": 10 }
                    },
                    "required": ["q"]
                }
            },
            {
                "name": "search_pharmacies",
                "description": "Vyhledá lékárny podle názvu, města, PSČ nebo služeb (pohotovost, zásilkový prodej).",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "q": { "type": "string", "description": "Dotaz — název lékárny, adresa, lékárník." },
                        "city": { "type": "string", "description": "Filtr podle města." },
                        "emergency": { "type": "boolean", "description": "Jen lékárny s pohotovostní službou." },
                        "mailOrder": { "type": "boolean", "description": "Jen lékárny se zásilkovým prodejem." },
                        "type": { "type": "string", "enum": ["pharmacy", "hospital", "outlet"] },
                        "postalCode": { "type": "string", "description": "Filtr podle PSČ." },
                        "maxResults": { "type": "integer", "minimum": 1, "maximum": 50 }
                    }
                }
            },
            {
                "name": "get_pharmacy_detail",
                "description": "Vrátí úplný detail lékárny podle kódu pracoviště.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "kodPracoviste": { "type": "string", "description": "Kód pracoviště (číselný)." }
                    },
                    "required": ["kodPracoviste"]
                }
            }
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::UpstreamConfig;
    use crate::upstream::RateLimiter;
    use std::time::Duration;

    fn session() -> ProtocolSession {
        let config = UpstreamConfig {
            endpoint: "http://127.0.0.1:9".to_string(),
            api_key: String::new(),
        };
        let search =
            Arc::new(SearchClient::new(&config, RateLimiter::new(1, Duration::from_secs(1))).unwrap());
        ProtocolSession::new("test-session".to_string(), search)
    }

    #[tokio::test]
    async fn initialize_reports_server_info() {
        let session = session();
        let reply = session
            .handle_message(json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"}))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reply["id"], 1);
        assert_eq!(reply["result"]["serverInfo"]["name"], "sukl-gateway");
        assert_eq!(reply["result"]["protocolVersion"], PROTOCOL_VERSION);
    }

    #[tokio::test]
    async fn ping_echoes_message_id() {
        let session = session();
        for n in 1..=3 {
            let reply = session
                .handle_message(json!({"jsonrpc": "2.0", "id": n, "method": "ping"}))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(reply["id"], n);
        }
        assert_eq!(session.messages_handled(), 3);
    }

    #[tokio::test]
    async fn notification_gets_no_reply() {
        let session = session();
        let reply = session
            .handle_message(json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
            .await
            .unwrap();
        assert!(reply.is_none());
    }

    #[tokio::test]
    async fn unknown_method_yields_rpc_error() {
        let session = session();
        let reply = session
            .handle_message(json!({"jsonrpc": "2.0", "id": 7, "method": "resources/list"}))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reply["error"]["code"], METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn tools_list_names_every_tool() {
        let session = session();
        let reply = session
            .handle_message(json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}))
            .await
            .unwrap()
            .unwrap();
        let tools = reply["result"]["tools"].as_array().unwrap();
        let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
        assert_eq!(
            names,
            [
                "search_drugs",
                "get_drug_detail",
                "search_documents",
                "search_pharmacies",
                "get_pharmacy_detail"
            ]
        );
    }

    #[tokio::test]
    async fn unknown_tool_is_invalid_request() {
        let session = session();
        let reply = session
            .handle_message(json!({
                "jsonrpc": "2.0", "id": 2, "method": "tools/call",
                "params": {"name": "delete_everything", "arguments": {}},
            }))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reply["error"]["code"], INVALID_REQUEST);
    }

    #[tokio::test]
    async fn closed_session_rejects_messages() {
        let session = session();
        session.close().unwrap();
        let err = session
            .handle_message(json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let session = session();
        session.close().unwrap();
        session.close().unwrap();
        assert!(session.is_closed());
    }
}

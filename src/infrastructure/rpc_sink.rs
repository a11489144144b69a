//! JSON-RPC ledger adapter.
//!
//! Transfers go through the node's `eth_sendTransaction`, so the node holds
//! the sender's key and signs. Native transfers carry a `value`; token
//! transfers call `transfer(address,uint256)` on the token contract.

use crate::application::ports::{TransferError, TransferSink};
use crate::domain::claim::TransactionId;
use crate::domain::network::known_chain_id;
use crate::domain::payout::NATIVE_DECIMALS;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Function selector of ERC-20 `transfer(address,uint256)`.
pub const ERC20_TRANSFER_SELECTOR: &str = "a9059cbb";

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// Minimal JSON-RPC 2.0 client over HTTP.
#[derive(Debug)]
pub struct RpcClient {
    http: reqwest::Client,
    endpoint: String,
    next_id: AtomicU64,
}

impl RpcClient {
    /// Create a client for the node at `endpoint`.
    pub fn new(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Node URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Call `method` with `params` and decode the result.
    ///
    /// # Errors
    /// `TransferError::Rpc` when the node answers with an error object,
    /// `TransferError::Transport` for connection, status and decoding failures.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, TransferError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| TransferError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::Transport(format!(
                "{} answered HTTP {}",
                self.endpoint, status
            )));
        }

        let decoded: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| TransferError::Transport(e.to_string()))?;

        match (decoded.result, decoded.error) {
            (_, Some(err)) => Err(TransferError::Rpc {
                code: err.code,
                message: err.message,
            }),
            (Some(result), None) => Ok(result),
            (None, None) => Err(TransferError::Transport(format!(
                "{} returned neither result nor error for {}",
                self.endpoint, method
            ))),
        }
    }

    /// Chain id reported by the node.
    ///
    /// # Errors
    /// Returns `TransferError` if the call fails or the answer is not a hex quantity.
    pub async fn chain_id(&self) -> Result<u64, TransferError> {
        let raw: String = self.call("eth_chainId", json!([])).await?;
        parse_quantity(&raw)
            .ok_or_else(|| TransferError::Transport(format!("invalid chain id {:?}", raw)))
    }

    /// Check that the node is reachable and matches the configured network.
    ///
    /// A mismatch against a well-known network name is only a warning;
    /// custom network names are not checked.
    ///
    /// # Errors
    /// Returns `TransferError` if the node cannot be queried.
    pub async fn probe(&self, network: &str) -> Result<u64, TransferError> {
        let chain_id = self.chain_id().await?;
        match known_chain_id(network) {
            Some(expected) if expected != chain_id => warn!(
                network = %network,
                expected,
                chain_id,
                "node chain id does not match configured network"
            ),
            _ => info!(network = %network, chain_id, endpoint = %self.endpoint, "connected to ledger node"),
        }
        Ok(chain_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Asset {
    Native,
    Token { contract: String },
}

/// `TransferSink` backed by a JSON-RPC ledger node.
#[derive(Debug, Clone)]
pub struct JsonRpcSink {
    client: Arc<RpcClient>,
    sender: String,
    asset: Asset,
    decimals: u32,
}

impl JsonRpcSink {
    /// Sink for the native currency.
    ///
    /// # Errors
    /// Returns `TransferError::InvalidDestination` if `sender` is not an address.
    pub fn native(client: Arc<RpcClient>, sender: &str) -> Result<Self, TransferError> {
        Ok(Self {
            client,
            sender: normalize_address(sender)?,
            asset: Asset::Native,
            decimals: NATIVE_DECIMALS,
        })
    }

    /// Sink for the ERC-20 token at `contract`.
    ///
    /// # Errors
    /// Returns `TransferError::InvalidDestination` if `sender` or `contract`
    /// is not an address.
    pub fn token(
        client: Arc<RpcClient>,
        sender: &str,
        contract: &str,
        decimals: u32,
    ) -> Result<Self, TransferError> {
        Ok(Self {
            client,
            sender: normalize_address(sender)?,
            asset: Asset::Token {
                contract: normalize_address(contract)?,
            },
            decimals,
        })
    }

    /// Contract address for token sinks.
    pub fn contract(&self) -> Option<&str> {
        match &self.asset {
            Asset::Native => None,
            Asset::Token { contract } => Some(contract),
        }
    }

    fn transaction(&self, destination: &str, amount: u128) -> Value {
        match &self.asset {
            Asset::Native => json!({
                "from": self.sender,
                "to": destination,
                "value": format!("0x{:x}", amount),
            }),
            Asset::Token { contract } => json!({
                "from": self.sender,
                "to": contract,
                "value": "0x0",
                "data": erc20_transfer_data(destination, amount),
            }),
        }
    }
}

#[async_trait]
impl TransferSink for JsonRpcSink {
    fn sender(&self) -> &str {
        &self.sender
    }

    fn decimals(&self) -> u32 {
        self.decimals
    }

    async fn transfer(
        &self,
        destination: &str,
        amount: u128,
    ) -> Result<TransactionId, TransferError> {
        let destination = normalize_address(destination)?;
        let tx = self.transaction(&destination, amount);
        debug!(destination = %destination, amount = %amount, "submitting transaction");

        let hash: String = self.client.call("eth_sendTransaction", json!([tx])).await?;
        Ok(TransactionId::new(hash))
    }
}

/// Lowercase `0x`-prefixed form of a 20-byte hex address.
///
/// # Errors
/// Returns `TransferError::InvalidDestination` for anything else.
pub fn normalize_address(address: &str) -> Result<String, TransferError> {
    let trimmed = address.trim();
    let hex = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(TransferError::InvalidDestination(address.to_string()));
    }
    Ok(format!("0x{}", hex.to_ascii_lowercase()))
}

/// Call data for `transfer(destination, amount)`.
///
/// `destination` must already be normalized.
pub fn erc20_transfer_data(destination: &str, amount: u128) -> String {
    let address = destination.trim_start_matches("0x");
    format!(
        "0x{}{:0>64}{:064x}",
        ERC20_TRANSFER_SELECTOR, address, amount
    )
}

fn parse_quantity(raw: &str) -> Option<u64> {
    let hex = raw.strip_prefix("0x")?;
    u64::from_str_radix(hex, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Json, Router};
    use parking_lot::Mutex;

    const SENDER: &str = "0x00000000000000000000000000000000000000aa";
    const DEST: &str = "0x00000000000000000000000000000000000000BB";
    const TOKEN: &str = "0x00000000000000000000000000000000000000cc";

    /// Serve a fake node that answers every request with `reply` and records bodies.
    async fn fake_node(reply: Value) -> (String, Arc<Mutex<Vec<Value>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&seen);
        let app = Router::new().route(
            "/",
            post(move |Json(body): Json<Value>| {
                let reply = reply.clone();
                let recorded = Arc::clone(&recorded);
                async move {
                    let id = body["id"].clone();
                    recorded.lock().push(body);
                    let mut reply = reply;
                    reply["jsonrpc"] = json!("2.0");
                    reply["id"] = id;
                    Json(reply)
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}/", addr), seen)
    }

    #[test]
    fn test_normalize_address() {
        assert_eq!(
            normalize_address(DEST).unwrap(),
            "0x00000000000000000000000000000000000000bb"
        );
        assert!(matches!(
            normalize_address("0x1234"),
            Err(TransferError::InvalidDestination(_))
        ));
        assert!(normalize_address("0xzz000000000000000000000000000000000000bb").is_err());
    }

    #[test]
    fn test_erc20_call_data() {
        let data = erc20_transfer_data("0x00000000000000000000000000000000000000bb", 1_000_000);
        assert_eq!(data.len(), 2 + 8 + 64 + 64);
        assert!(data.starts_with("0xa9059cbb"));
        assert!(data.ends_with("00000000000f4240"));
        assert_eq!(
            &data[10..74],
            "00000000000000000000000000000000000000000000000000000000000000bb"
        );
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("0x5"), Some(5));
        assert_eq!(parse_quantity("0x212"), Some(530));
        assert_eq!(parse_quantity("5"), None);
    }

    #[tokio::test]
    async fn test_native_transfer_sends_value() {
        let (url, seen) = fake_node(json!({"result": "0xabc"})).await;
        let client = Arc::new(RpcClient::new(reqwest::Client::new(), url));
        let sink = JsonRpcSink::native(client, SENDER).unwrap();

        let tx = sink.transfer(DEST, 255).await.unwrap();

        assert_eq!(tx.as_str(), "0xabc");
        let bodies = seen.lock();
        assert_eq!(bodies[0]["method"], "eth_sendTransaction");
        let params = &bodies[0]["params"][0];
        assert_eq!(params["from"], SENDER);
        assert_eq!(params["to"], "0x00000000000000000000000000000000000000bb");
        assert_eq!(params["value"], "0xff");
    }

    #[tokio::test]
    async fn test_token_transfer_calls_contract() {
        let (url, seen) = fake_node(json!({"result": "0xdef"})).await;
        let client = Arc::new(RpcClient::new(reqwest::Client::new(), url));
        let sink = JsonRpcSink::token(client, SENDER, TOKEN, 6).unwrap();

        assert_eq!(sink.decimals(), 6);
        sink.transfer(DEST, 1).await.unwrap();

        let bodies = seen.lock();
        let params = &bodies[0]["params"][0];
        assert_eq!(params["to"], TOKEN);
        assert_eq!(params["value"], "0x0");
        assert!(params["data"].as_str().unwrap().starts_with("0xa9059cbb"));
    }

    #[tokio::test]
    async fn test_rpc_error_is_reported() {
        let (url, _) = fake_node(json!({"error": {"code": -32000, "message": "insufficient funds"}})).await;
        let client = Arc::new(RpcClient::new(reqwest::Client::new(), url));
        let sink = JsonRpcSink::native(client, SENDER).unwrap();

        let err = sink.transfer(DEST, 1).await.unwrap_err();
        assert_eq!(
            err,
            TransferError::Rpc {
                code: -32000,
                message: "insufficient funds".into()
            }
        );
    }

    #[tokio::test]
    async fn test_invalid_destination_skips_node() {
        let (url, seen) = fake_node(json!({"result": "0xabc"})).await;
        let client = Arc::new(RpcClient::new(reqwest::Client::new(), url));
        let sink = JsonRpcSink::native(client, SENDER).unwrap();

        assert!(matches!(
            sink.transfer("not-an-address", 1).await,
            Err(TransferError::InvalidDestination(_))
        ));
        assert!(seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_probe_reads_chain_id() {
        let (url, _) = fake_node(json!({"result": "0x5"})).await;
        let client = RpcClient::new(reqwest::Client::new(), url);
        assert_eq!(client.probe("goerli").await.unwrap(), 5);
        // Mismatch only warns.
        assert_eq!(client.probe("kovan").await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_unreachable_node_is_transport_error() {
        let client = RpcClient::new(reqwest::Client::new(), "http://127.0.0.1:1/");
        assert!(matches!(
            client.chain_id().await,
            Err(TransferError::Transport(_))
        ));
    }
}

//! # JSON-RPC Ledger Client
//!
//! [`LedgerClient`] over the cluster's public JSON-RPC 2.0 API.
//!
//! ## Method Index
//!
//! | Method                              | Used by                          |
//! |-------------------------------------|----------------------------------|
//! | `getBalance`                        | `get_balance`                    |
//! | `requestAirdrop`                    | `request_faucet_funds`           |
//! | `getSignatureStatuses`              | every confirmation wait          |
//! | `getLatestBlockhash`                | every submitted transaction      |
//! | `getMinimumBalanceForRentExemption` | `create_mint`                    |
//! | `sendTransaction`                   | `create_mint`, token account, `mint_to` |
//! | `getTokenSupply`                    | `get_mint_supply`                |
//! | `getTokenAccountBalance`            | `get_account_amount`             |
//! | `getAccountInfo`                    | `create_or_get_token_account`    |
//!
//! The client is stateless between calls apart from a request-id counter,
//! so one instance can serve any number of concurrent runs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use super::programs::{
    self, associated_token_address, ASSOCIATED_TOKEN_PROGRAM_ID, MINT_ACCOUNT_LEN, TOKEN_PROGRAM_ID,
};
use super::transaction::{Instruction, Message, Transaction};
use super::{Commitment, LedgerClient, LedgerError};
use crate::amount::Amount;
use crate::config::{
    Cluster, CONFIRMATION_MAX_ATTEMPTS, CONFIRMATION_POLL_INTERVAL, RPC_REQUEST_TIMEOUT,
};
use crate::identity::{Address, Identity};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Connection and confirmation settings for [`RpcLedgerClient`].
#[derive(Debug, Clone)]
pub struct RpcConfig {
    /// JSON-RPC endpoint.
    pub url: String,
    /// Commitment for reads, preflight, and confirmation.
    pub commitment: Commitment,
    /// HTTP timeout per request.
    pub request_timeout: Duration,
    /// Delay between signature status polls.
    pub poll_interval: Duration,
    /// Polls before giving up on a confirmation.
    pub max_confirmation_attempts: u32,
}

impl RpcConfig {
    /// Defaults pointed at `cluster`.
    pub fn for_cluster(cluster: Cluster) -> Self {
        Self {
            url: cluster.rpc_url().to_string(),
            ..Self::default()
        }
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: Cluster::Devnet.rpc_url().to_string(),
            commitment: Commitment::Confirmed,
            request_timeout: RPC_REQUEST_TIMEOUT,
            poll_interval: CONFIRMATION_POLL_INTERVAL,
            max_confirmation_attempts: CONFIRMATION_MAX_ATTEMPTS,
        }
    }
}

// ---------------------------------------------------------------------------
// Wire envelopes
// ---------------------------------------------------------------------------

/// A JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

/// A JSON-RPC 2.0 response. Exactly one of `result` or `error` is set by a
/// conforming node.
#[derive(Debug, Clone, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

/// JSON-RPC error object.
#[derive(Debug, Clone, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// Many results are wrapped as `{ "context": {...}, "value": ... }`.
#[derive(Debug, Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
struct LatestBlockhash {
    blockhash: String,
}

/// `getTokenSupply` / `getTokenAccountBalance` payload. `amount` is a
/// decimal string in base units.
#[derive(Debug, Deserialize)]
struct UiTokenAmount {
    amount: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignatureStatus {
    #[serde(default)]
    confirmation_status: Option<Commitment>,
    #[serde(default)]
    err: Option<Value>,
}

/// Where a submitted transaction stands.
#[derive(Debug, PartialEq, Eq)]
enum Confirmation {
    Pending,
    Confirmed,
    Failed(String),
}

fn parse_response<T: DeserializeOwned>(method: &str, response: RpcResponse) -> Result<T, LedgerError> {
    if let Some(err) = response.error {
        return Err(LedgerError::Rpc {
            code: err.code,
            message: err.message,
        });
    }
    let result = response
        .result
        .ok_or_else(|| LedgerError::InvalidResponse(format!("{method}: neither result nor error")))?;
    serde_json::from_value(result)
        .map_err(|e| LedgerError::InvalidResponse(format!("{method}: {e}")))
}

fn classify_status(status: Option<SignatureStatus>, required: Commitment) -> Confirmation {
    match status {
        None => Confirmation::Pending,
        Some(SignatureStatus { err: Some(err), .. }) => Confirmation::Failed(err.to_string()),
        Some(SignatureStatus {
            confirmation_status: Some(level),
            ..
        }) if required.is_satisfied_by(level) => Confirmation::Confirmed,
        Some(_) => Confirmation::Pending,
    }
}

fn parse_base_units(method: &str, amount: &str) -> Result<Amount, LedgerError> {
    amount
        .parse::<u64>()
        .map(Amount::from_smallest)
        .map_err(|_| LedgerError::InvalidResponse(format!("{method}: bad amount '{amount}'")))
}

fn decode_blockhash(blockhash: &str) -> Result<[u8; 32], LedgerError> {
    let bytes = bs58::decode(blockhash)
        .into_vec()
        .map_err(|_| LedgerError::InvalidResponse(format!("bad blockhash '{blockhash}'")))?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| LedgerError::InvalidResponse(format!("blockhash has {} bytes", bytes.len())))
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// JSON-RPC implementation of [`LedgerClient`].
pub struct RpcLedgerClient {
    http: reqwest::Client,
    config: RpcConfig,
    next_id: AtomicU64,
}

impl RpcLedgerClient {
    /// Builds a client. Fails only if the HTTP stack cannot be initialized.
    pub fn new(config: RpcConfig) -> Result<Self, LedgerError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            config,
            next_id: AtomicU64::new(1),
        })
    }

    /// The active configuration.
    pub fn config(&self) -> &RpcConfig {
        &self.config
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, LedgerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(method, id, "rpc call");
        let request = RpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };
        let response: RpcResponse = self
            .http
            .post(&self.config.url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        parse_response(method, response)
    }

    fn commitment_config(&self) -> Value {
        json!({ "commitment": self.config.commitment })
    }

    async fn latest_blockhash(&self) -> Result<[u8; 32], LedgerError> {
        let reply: WithContext<LatestBlockhash> =
            self.call("getLatestBlockhash", json!([self.commitment_config()])).await?;
        decode_blockhash(&reply.value.blockhash)
    }

    async fn minimum_rent(&self, len: u64) -> Result<u64, LedgerError> {
        self.call("getMinimumBalanceForRentExemption", json!([len])).await
    }

    async fn account_exists(&self, address: &Address) -> Result<bool, LedgerError> {
        let reply: WithContext<Option<Value>> = self
            .call(
                "getAccountInfo",
                json!([address.to_string(), { "encoding": "base64", "commitment": self.config.commitment }]),
            )
            .await?;
        Ok(reply.value.is_some())
    }

    /// Polls the signature until it reaches the configured commitment.
    async fn confirm(&self, signature: &str) -> Result<(), LedgerError> {
        let attempts = self.config.max_confirmation_attempts;
        for attempt in 1..=attempts {
            let reply: WithContext<Vec<Option<SignatureStatus>>> = self
                .call("getSignatureStatuses", json!([[signature]]))
                .await?;
            let status = reply.value.into_iter().next().flatten();
            match classify_status(status, self.config.commitment) {
                Confirmation::Confirmed => {
                    debug!(signature, attempt, "transaction confirmed");
                    return Ok(());
                }
                Confirmation::Failed(reason) => {
                    return Err(LedgerError::TransactionFailed {
                        signature: signature.to_string(),
                        reason,
                    });
                }
                Confirmation::Pending => tokio::time::sleep(self.config.poll_interval).await,
            }
        }
        Err(LedgerError::Unconfirmed {
            signature: signature.to_string(),
            attempts,
        })
    }

    /// Compiles, signs, submits and confirms one transaction.
    async fn submit(
        &self,
        payer: &Identity,
        instructions: &[Instruction],
        signers: &[&Identity],
    ) -> Result<String, LedgerError> {
        let blockhash = self.latest_blockhash().await?;
        let message = Message::compile(&payer.address(), instructions, blockhash)
            .map_err(|e| LedgerError::Signing(e.to_string()))?;
        let tx = Transaction::sign(message, signers).map_err(|e| LedgerError::Signing(e.to_string()))?;
        let expected = tx
            .id()
            .ok_or_else(|| LedgerError::Signing("transaction carries no signatures".into()))?;
        let wire = general_purpose::STANDARD.encode(tx.serialize());

        let signature: String = self
            .call(
                "sendTransaction",
                json!([wire, { "encoding": "base64", "preflightCommitment": self.config.commitment }]),
            )
            .await?;
        if signature != expected {
            return Err(LedgerError::InvalidResponse(format!(
                "sendTransaction returned {signature}, expected {expected}"
            )));
        }
        debug!(%signature, "transaction submitted");
        self.confirm(&signature).await?;
        Ok(signature)
    }
}

#[async_trait]
impl LedgerClient for RpcLedgerClient {
    async fn get_balance(&self, address: &Address) -> Result<Amount, LedgerError> {
        let reply: WithContext<u64> = self
            .call("getBalance", json!([address.to_string(), self.commitment_config()]))
            .await?;
        Ok(Amount::from_smallest(reply.value))
    }

    async fn request_faucet_funds(&self, address: &Address, amount: Amount) -> Result<(), LedgerError> {
        let signature: String = self
            .call("requestAirdrop", json!([address.to_string(), amount.smallest()]))
            .await?;
        info!(%address, lamports = amount.smallest(), %signature, "faucet request submitted");
        self.confirm(&signature).await
    }

    async fn create_mint(
        &self,
        payer: &Identity,
        mint_authority: &Address,
        freeze_authority: Option<&Address>,
        decimals: u8,
    ) -> Result<Address, LedgerError> {
        let mint = Identity::generate().map_err(|e| LedgerError::KeyGeneration(e.to_string()))?;
        let rent = self.minimum_rent(MINT_ACCOUNT_LEN).await?;
        let instructions = [
            programs::create_account(
                &payer.address(),
                &mint.address(),
                rent,
                MINT_ACCOUNT_LEN,
                &TOKEN_PROGRAM_ID,
            ),
            programs::initialize_mint2(&mint.address(), mint_authority, freeze_authority, decimals),
        ];
        self.submit(payer, &instructions, &[payer, &mint]).await?;
        Ok(mint.address())
    }

    async fn get_mint_supply(&self, mint: &Address) -> Result<Amount, LedgerError> {
        let reply: WithContext<UiTokenAmount> = self
            .call("getTokenSupply", json!([mint.to_string(), self.commitment_config()]))
            .await?;
        parse_base_units("getTokenSupply", &reply.value.amount)
    }

    async fn create_or_get_token_account(
        &self,
        payer: &Identity,
        mint: &Address,
    ) -> Result<Address, LedgerError> {
        let owner = payer.address();
        let associated = associated_token_address(&owner, mint).ok_or_else(|| {
            LedgerError::Rejected(format!(
                "no associated address for {owner} under {ASSOCIATED_TOKEN_PROGRAM_ID}"
            ))
        })?;
        if self.account_exists(&associated).await? {
            debug!(%associated, "token account already exists");
            return Ok(associated);
        }
        let instruction =
            programs::create_associated_token_account_idempotent(&owner, &associated, &owner, mint);
        self.submit(payer, &[instruction], &[payer]).await?;
        Ok(associated)
    }

    async fn get_account_amount(&self, account: &Address) -> Result<Amount, LedgerError> {
        let reply: WithContext<UiTokenAmount> = self
            .call(
                "getTokenAccountBalance",
                json!([account.to_string(), self.commitment_config()]),
            )
            .await?;
        parse_base_units("getTokenAccountBalance", &reply.value.amount)
    }

    async fn mint_to(
        &self,
        payer: &Identity,
        mint: &Address,
        destination: &Address,
        mint_authority: &Identity,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let instruction =
            programs::mint_to(mint, destination, &mint_authority.address(), amount.smallest());
        self.submit(payer, &[instruction], &[payer, mint_authority]).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(raw: Value) -> RpcResponse {
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn request_envelope_shape() {
        let req = RpcRequest {
            jsonrpc: "2.0",
            id: 7,
            method: "getBalance",
            params: json!(["abc", { "commitment": Commitment::Confirmed }]),
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["jsonrpc"], "2.0");
        assert_eq!(value["id"], 7);
        assert_eq!(value["method"], "getBalance");
        assert_eq!(value["params"][1]["commitment"], "confirmed");
    }

    #[test]
    fn contextual_result_is_unwrapped() {
        let raw = response(json!({
            "jsonrpc": "2.0", "id": 1,
            "result": { "context": { "slot": 12 }, "value": 2000000000u64 }
        }));
        let parsed: WithContext<u64> = parse_response("getBalance", raw).unwrap();
        assert_eq!(parsed.value, 2_000_000_000);
    }

    #[test]
    fn error_object_becomes_rpc_error() {
        let raw = response(json!({
            "jsonrpc": "2.0", "id": 1,
            "error": { "code": -32602, "message": "Invalid param: could not find account" }
        }));
        let err = parse_response::<WithContext<UiTokenAmount>>("getTokenAccountBalance", raw).unwrap_err();
        assert_eq!(
            err,
            LedgerError::Rpc {
                code: -32602,
                message: "Invalid param: could not find account".into()
            }
        );
    }

    #[test]
    fn empty_response_is_malformed() {
        let raw = response(json!({ "jsonrpc": "2.0", "id": 1 }));
        assert!(matches!(
            parse_response::<u64>("getBalance", raw),
            Err(LedgerError::InvalidResponse(_))
        ));
    }

    #[test]
    fn token_amount_parses_base_units() {
        let raw = response(json!({
            "jsonrpc": "2.0", "id": 1,
            "result": { "context": { "slot": 1 }, "value": {
                "amount": "100000000000", "decimals": 9, "uiAmount": 100.0, "uiAmountString": "100"
            }}
        }));
        let parsed: WithContext<UiTokenAmount> = parse_response("getTokenSupply", raw).unwrap();
        let amount = parse_base_units("getTokenSupply", &parsed.value.amount).unwrap();
        assert_eq!(amount.to_human(), "100");
        assert!(parse_base_units("getTokenSupply", "-1").is_err());
    }

    #[test]
    fn signature_status_classification() {
        let status = |raw: Value| -> Option<SignatureStatus> { serde_json::from_value(raw).unwrap() };

        assert_eq!(classify_status(None, Commitment::Confirmed), Confirmation::Pending);
        assert_eq!(
            classify_status(
                status(json!({ "slot": 5, "confirmations": 0, "err": null, "confirmationStatus": "processed" })),
                Commitment::Confirmed
            ),
            Confirmation::Pending
        );
        assert_eq!(
            classify_status(
                status(json!({ "slot": 5, "confirmations": null, "err": null, "confirmationStatus": "finalized" })),
                Commitment::Confirmed
            ),
            Confirmation::Confirmed
        );
        assert!(matches!(
            classify_status(
                status(json!({ "slot": 5, "err": { "InstructionError": [0, "Custom"] }, "confirmationStatus": "confirmed" })),
                Commitment::Confirmed
            ),
            Confirmation::Failed(_)
        ));
    }

    #[test]
    fn blockhash_must_be_32_bytes() {
        let good = bs58::encode([9u8; 32]).into_string();
        assert_eq!(decode_blockhash(&good).unwrap(), [9u8; 32]);
        assert!(decode_blockhash("3yZe7d").is_err());
        assert!(decode_blockhash("0OIl").is_err());
    }

    #[test]
    fn config_for_cluster_keeps_defaults() {
        let cfg = RpcConfig::for_cluster(Cluster::Localnet);
        assert_eq!(cfg.url, Cluster::Localnet.rpc_url());
        assert_eq!(cfg.commitment, Commitment::Confirmed);
        assert_eq!(cfg.max_confirmation_attempts, CONFIRMATION_MAX_ATTEMPTS);
    }

    #[test]
    fn client_builds_without_network() {
        let client = RpcLedgerClient::new(RpcConfig::default()).unwrap();
        assert_eq!(client.config().url, Cluster::Devnet.rpc_url());
    }

    // -----------------------------------------------------------------------
    // Local node
    // -----------------------------------------------------------------------

    use std::sync::Arc;

    use parking_lot::Mutex;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    type Handler = dyn Fn(&str, &Value, usize) -> Value + Send + Sync;
    type Requests = Arc<Mutex<Vec<(String, Value)>>>;

    /// A JSON-RPC endpoint on a loopback port. `handler` gets the method, its
    /// params, and how many earlier calls the method had, and returns the
    /// `result` to send back.
    struct LocalNode {
        url: String,
        requests: Requests,
    }

    impl LocalNode {
        async fn start(handler: impl Fn(&str, &Value, usize) -> Value + Send + Sync + 'static) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let url = format!("http://{}", listener.local_addr().unwrap());
            let requests: Requests = Arc::default();
            let handler: Arc<Handler> = Arc::new(handler);
            let log = Arc::clone(&requests);
            tokio::spawn(async move {
                while let Ok((socket, _)) = listener.accept().await {
                    tokio::spawn(serve(socket, Arc::clone(&handler), Arc::clone(&log)));
                }
            });
            Self { url, requests }
        }

        fn client(&self, max_confirmation_attempts: u32) -> RpcLedgerClient {
            RpcLedgerClient {
                http: reqwest::Client::builder().no_proxy().build().unwrap(),
                config: RpcConfig {
                    url: self.url.clone(),
                    poll_interval: Duration::from_millis(1),
                    max_confirmation_attempts,
                    ..RpcConfig::default()
                },
                next_id: AtomicU64::new(1),
            }
        }

        fn calls(&self, method: &str) -> usize {
            self.requests.lock().iter().filter(|(m, _)| m == method).count()
        }

        fn params(&self, method: &str) -> Option<Value> {
            self.requests
                .lock()
                .iter()
                .find(|(m, _)| m == method)
                .map(|(_, params)| params.clone())
        }
    }

    async fn serve(mut socket: TcpStream, handler: Arc<Handler>, requests: Requests) {
        let mut buf = Vec::new();
        loop {
            let Some((body_start, body_len)) = read_head(&mut socket, &mut buf).await else {
                return;
            };
            while buf.len() < body_start + body_len {
                if !read_more(&mut socket, &mut buf).await {
                    return;
                }
            }
            let request: Value = serde_json::from_slice(&buf[body_start..body_start + body_len]).unwrap();
            buf.drain(..body_start + body_len);

            let method = request["method"].as_str().unwrap_or_default().to_string();
            let params = request["params"].clone();
            let seen = {
                let mut log = requests.lock();
                let seen = log.iter().filter(|(m, _)| *m == method).count();
                log.push((method.clone(), params.clone()));
                seen
            };
            let body = json!({
                "jsonrpc": "2.0",
                "id": request["id"],
                "result": handler(&method, &params, seen),
            })
            .to_string();
            let reply = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\n\r\n{body}",
                body.len()
            );
            if socket.write_all(reply.as_bytes()).await.is_err() {
                return;
            }
        }
    }

    /// Reads up to the end of the request head. Returns where the body starts
    /// and its declared length.
    async fn read_head(socket: &mut TcpStream, buf: &mut Vec<u8>) -> Option<(usize, usize)> {
        loop {
            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
                let len = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or(0);
                return Some((end + 4, len));
            }
            if !read_more(socket, buf).await {
                return None;
            }
        }
    }

    async fn read_more(socket: &mut TcpStream, buf: &mut Vec<u8>) -> bool {
        let mut chunk = [0u8; 4096];
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => false,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                true
            }
        }
    }

    fn statuses(status: Value) -> Value {
        json!({ "context": { "slot": 1 }, "value": [status] })
    }

    fn confirmed() -> Value {
        statuses(json!({ "slot": 1, "confirmations": null, "err": null, "confirmationStatus": "confirmed" }))
    }

    /// The fee payer's signature, read back out of a submitted transaction.
    fn submitted_signature(params: &Value) -> String {
        let wire = general_purpose::STANDARD
            .decode(params[0].as_str().unwrap())
            .unwrap();
        bs58::encode(&wire[1..65]).into_string()
    }

    fn operator() -> Address {
        Identity::from_seed(&[1; 32]).address()
    }

    // -----------------------------------------------------------------------
    // Against the local node
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn balance_is_read_at_the_configured_commitment() {
        let node = LocalNode::start(|method, _, _| match method {
            "getBalance" => json!({ "context": { "slot": 1 }, "value": 1_500_000_000u64 }),
            other => panic!("unexpected {other}"),
        })
        .await;

        let balance = node.client(1).get_balance(&operator()).await.unwrap();
        assert_eq!(balance.to_human(), "1.5");
        let params = node.params("getBalance").unwrap();
        assert_eq!(params[0], operator().to_string());
        assert_eq!(params[1]["commitment"], "confirmed");
    }

    #[tokio::test]
    async fn faucet_request_returns_only_once_confirmed() {
        let node = LocalNode::start(|method, _, seen| match method {
            "requestAirdrop" => json!("airdrop-sig"),
            "getSignatureStatuses" if seen < 2 => statuses(json!({
                "slot": 1, "confirmations": 0, "err": null, "confirmationStatus": "processed"
            })),
            "getSignatureStatuses" => confirmed(),
            other => panic!("unexpected {other}"),
        })
        .await;

        let amount = Amount::from_units(1).unwrap();
        node.client(5).request_faucet_funds(&operator(), amount).await.unwrap();
        assert_eq!(node.calls("requestAirdrop"), 1);
        assert_eq!(node.calls("getSignatureStatuses"), 3);
        assert_eq!(node.params("requestAirdrop").unwrap()[1], 1_000_000_000u64);
        assert_eq!(node.params("getSignatureStatuses").unwrap()[0][0], "airdrop-sig");
    }

    #[tokio::test]
    async fn faucet_request_never_confirmed_is_an_error() {
        let node = LocalNode::start(|method, _, _| match method {
            "requestAirdrop" => json!("airdrop-sig"),
            "getSignatureStatuses" => statuses(Value::Null),
            other => panic!("unexpected {other}"),
        })
        .await;

        let amount = Amount::from_units(1).unwrap();
        let err = node
            .client(4)
            .request_faucet_funds(&operator(), amount)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::Unconfirmed {
                signature: "airdrop-sig".into(),
                attempts: 4
            }
        );
        assert_eq!(node.calls("getSignatureStatuses"), 4);
    }

    #[tokio::test]
    async fn failed_status_stops_polling() {
        let node = LocalNode::start(|method, _, _| match method {
            "requestAirdrop" => json!("airdrop-sig"),
            "getSignatureStatuses" => statuses(json!({
                "slot": 1, "err": { "InstructionError": [0, "Custom"] }, "confirmationStatus": "confirmed"
            })),
            other => panic!("unexpected {other}"),
        })
        .await;

        let amount = Amount::from_units(1).unwrap();
        let err = node
            .client(4)
            .request_faucet_funds(&operator(), amount)
            .await
            .unwrap_err();
        assert!(
            matches!(&err, LedgerError::TransactionFailed { signature, .. } if signature == "airdrop-sig"),
            "{err}"
        );
        assert_eq!(node.calls("getSignatureStatuses"), 1);
    }

    #[tokio::test]
    async fn mint_to_submits_a_transaction_signed_by_payer_and_authority() {
        let node = LocalNode::start(|method, params, _| match method {
            "getLatestBlockhash" => json!({
                "context": { "slot": 1 },
                "value": { "blockhash": bs58::encode([7u8; 32]).into_string(), "lastValidBlockHeight": 10 }
            }),
            "sendTransaction" => json!(submitted_signature(params)),
            "getSignatureStatuses" => confirmed(),
            other => panic!("unexpected {other}"),
        })
        .await;

        let payer = Identity::from_seed(&[1; 32]);
        let authority = Identity::from_seed(&[2; 32]);
        let mint = Address::new([3; 32]);
        let destination = Address::new([4; 32]);
        node.client(2)
            .mint_to(&payer, &mint, &destination, &authority, Amount::from_units(100).unwrap())
            .await
            .unwrap();

        let params = node.params("sendTransaction").unwrap();
        assert_eq!(params[1]["encoding"], "base64");
        let wire = general_purpose::STANDARD
            .decode(params[0].as_str().unwrap())
            .unwrap();
        assert_eq!(wire[0], 2, "payer and mint authority sign");
        assert_eq!(
            node.params("getSignatureStatuses").unwrap()[0][0],
            submitted_signature(&params)
        );
    }

    #[tokio::test]
    async fn unexpected_submission_signature_is_rejected() {
        let node = LocalNode::start(|method, _, _| match method {
            "getLatestBlockhash" => json!({
                "context": { "slot": 1 },
                "value": { "blockhash": bs58::encode([7u8; 32]).into_string(), "lastValidBlockHeight": 10 }
            }),
            "sendTransaction" => json!("someone-elses-sig"),
            other => panic!("unexpected {other}"),
        })
        .await;

        let payer = Identity::from_seed(&[1; 32]);
        let authority = Identity::from_seed(&[2; 32]);
        let err = node
            .client(2)
            .mint_to(
                &payer,
                &Address::new([3; 32]),
                &Address::new([4; 32]),
                &authority,
                Amount::from_units(1).unwrap(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidResponse(_)), "{err}");
        assert_eq!(node.calls("getSignatureStatuses"), 0);
    }

    #[tokio::test]
    async fn existing_token_account_is_not_recreated() {
        let node = LocalNode::start(|method, _, _| match method {
            "getAccountInfo" => json!({
                "context": { "slot": 1 },
                "value": { "lamports": 2_039_280u64, "owner": TOKEN_PROGRAM_ID.to_string(), "data": ["", "base64"] }
            }),
            other => panic!("unexpected {other}"),
        })
        .await;

        let payer = Identity::from_seed(&[1; 32]);
        let mint = Address::new([3; 32]);
        let account = node
            .client(2)
            .create_or_get_token_account(&payer, &mint)
            .await
            .unwrap();
        assert_eq!(Some(account), associated_token_address(&payer.address(), &mint));
        assert_eq!(node.calls("sendTransaction"), 0);
    }
}

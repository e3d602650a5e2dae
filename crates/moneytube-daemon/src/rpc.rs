//! JSON-RPC server over Unix socket.
//!
//! Listens on a Unix domain socket, accepts connections, and dispatches
//! line-delimited JSON-RPC 2.0 calls to the command handlers. A connection
//! that calls `subscribe_events` also receives matching events as
//! `event` notifications interleaved with its responses.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use moneytube_db::DbError;
use moneytube_economy::EconomyError;

use crate::commands;
use crate::events::EventFilter;
use crate::session;
use crate::storage::StorageError;
use crate::DaemonState;

/// JSON-RPC request.
#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    /// JSON-RPC version (must be "2.0").
    pub jsonrpc: String,
    /// Request ID.
    #[serde(default)]
    pub id: serde_json::Value,
    /// Method name.
    pub method: String,
    /// Parameters.
    #[serde(default)]
    pub params: serde_json::Value,
}

/// JSON-RPC response.
#[derive(Debug, Serialize)]
pub struct RpcResponse {
    /// JSON-RPC version.
    pub jsonrpc: String,
    /// Request ID.
    pub id: serde_json::Value,
    /// Result or error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// JSON-RPC error object.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RpcError {
    /// Error code.
    pub code: i32,
    /// Error name.
    pub message: String,
    /// Optional structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcResponse {
    /// Create a success response.
    pub fn success(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: serde_json::Value, error: RpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

impl RpcError {
    fn with_detail(code: i32, message: &str, detail: &str) -> Self {
        Self {
            code,
            message: message.to_string(),
            data: Some(serde_json::json!({"detail": detail})),
        }
    }

    // Standard JSON-RPC errors

    /// Parse error (-32700).
    pub fn parse_error() -> Self {
        Self {
            code: -32700,
            message: "PARSE_ERROR".to_string(),
            data: None,
        }
    }

    /// Invalid request (-32600).
    pub fn invalid_request() -> Self {
        Self {
            code: -32600,
            message: "INVALID_REQUEST".to_string(),
            data: None,
        }
    }

    /// Method not found (-32601).
    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: "METHOD_NOT_FOUND".to_string(),
            data: Some(serde_json::json!({"method": method})),
        }
    }

    /// Request line longer than the configured cap (-32600).
    pub fn request_too_large(max_bytes: u64) -> Self {
        Self::with_detail(
            -32600,
            "INVALID_REQUEST",
            &format!("request exceeds {max_bytes} bytes"),
        )
    }

    /// Invalid params (-32602).
    pub fn invalid_params(detail: &str) -> Self {
        Self::with_detail(-32602, "INVALID_PARAMS", detail)
    }

    /// Internal error (-32603).
    pub fn internal_error(detail: &str) -> Self {
        Self::with_detail(-32603, "INTERNAL_ERROR", detail)
    }

    // Application errors

    /// Not found (-32004).
    pub fn not_found(detail: &str) -> Self {
        Self::with_detail(-32004, "NOT_FOUND", detail)
    }

    /// Missing, unknown or expired session (-32010).
    pub fn session_required() -> Self {
        Self {
            code: -32010,
            message: "SESSION_REQUIRED".to_string(),
            data: None,
        }
    }

    /// Wrong email or password (-32011).
    pub fn wrong_credentials() -> Self {
        Self {
            code: -32011,
            message: "WRONG_CREDENTIALS".to_string(),
            data: None,
        }
    }

    /// Validation failure (-32020).
    pub fn validation(detail: &str) -> Self {
        Self::with_detail(-32020, "VALIDATION", detail)
    }

    /// Not permitted (-32030).
    pub fn forbidden(detail: &str) -> Self {
        Self::with_detail(-32030, "FORBIDDEN", detail)
    }

    /// Admin session required (-32031).
    pub fn admin_required() -> Self {
        Self {
            code: -32031,
            message: "ADMIN_REQUIRED".to_string(),
            data: None,
        }
    }

    /// Quota or threshold not met (-32040).
    pub fn quota_exceeded(detail: &str) -> Self {
        Self::with_detail(-32040, "QUOTA_EXCEEDED", detail)
    }

    /// Exactly-once action repeated (-32050).
    pub fn duplicate(detail: &str) -> Self {
        Self::with_detail(-32050, "DUPLICATE", detail)
    }

    /// Storage, auth or notification backend failed (-32060).
    pub fn external_service(detail: &str) -> Self {
        Self::with_detail(-32060, "EXTERNAL_SERVICE", detail)
    }
}

impl From<EconomyError> for RpcError {
    fn from(e: EconomyError) -> Self {
        match e {
            EconomyError::Validation(m) => Self::validation(&m),
            EconomyError::Authorization(m) => Self::forbidden(&m),
            EconomyError::QuotaExceeded(m) => Self::quota_exceeded(&m),
            EconomyError::Duplicate(m) => Self::duplicate(&m),
            EconomyError::NotFound(m) => Self::not_found(&m),
            EconomyError::Storage(db) => {
                error!(error = %db, "storage failure");
                Self::internal_error(&format!("db error: {db}"))
            }
        }
    }
}

impl From<DbError> for RpcError {
    fn from(e: DbError) -> Self {
        EconomyError::from(e).into()
    }
}

impl From<StorageError> for RpcError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::InvalidKey(k) => Self::invalid_params(&format!("invalid object key {k}")),
            StorageError::Io(io) => Self::external_service(&format!("object storage: {io}")),
        }
    }
}

/// The RPC server.
pub struct RpcServer {
    state: Arc<DaemonState>,
    socket_path: PathBuf,
}

impl RpcServer {
    /// Create a new RPC server.
    pub fn new(state: Arc<DaemonState>, socket_path: PathBuf) -> Self {
        Self { state, socket_path }
    }

    /// Run the server, accepting connections.
    pub async fn run(&self) -> anyhow::Result<()> {
        // Remove stale socket file
        let _ = std::fs::remove_file(&self.socket_path);

        let listener = UnixListener::bind(&self.socket_path)?;
        info!("IPC server listening on {:?}", self.socket_path);

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    let state = self.state.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(state, stream).await {
                            warn!("Connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

/// Handle a single client connection.
///
/// All output goes through one writer task so event notifications and
/// responses never interleave mid-line.
async fn handle_connection(
    state: Arc<DaemonState>,
    stream: tokio::net::UnixStream,
) -> anyhow::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let (out_tx, mut out_rx) = mpsc::channel::<String>(256);

    let writer_task: JoinHandle<std::io::Result<()>> = tokio::spawn(async move {
        while let Some(line) = out_rx.recv().await {
            writer.write_all(line.as_bytes()).await?;
            writer.flush().await?;
        }
        Ok(())
    });

    let mut forwarder: Option<JoinHandle<()>> = None;
    let mut line = String::new();
    let max_request = state.config.advanced.max_request_bytes;

    loop {
        line.clear();
        match read_request_line(&mut reader, &mut line, max_request).await? {
            LineRead::Eof => break,
            LineRead::TooLong => {
                // The rest of the line is still unread, so the stream cannot
                // be resynchronised.
                warn!(max_request, "closing connection after oversized request");
                let response = RpcResponse::error(
                    serde_json::Value::Null,
                    RpcError::request_too_large(max_request),
                );
                let mut response_json = serde_json::to_string(&response)?;
                response_json.push('\n');
                let _ = out_tx.send(response_json).await;
                break;
            }
            LineRead::Line => {}
        }
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<RpcRequest>(&line) {
            Ok(request) if request.jsonrpc != "2.0" => {
                RpcResponse::error(request.id, RpcError::invalid_request())
            }
            Ok(request) if request.method == "subscribe_events" => {
                let id = request.id.clone();
                match subscribe(&state, &request.params, out_tx.clone()).await {
                    Ok(task) => {
                        if let Some(old) = forwarder.replace(task) {
                            old.abort();
                        }
                        RpcResponse::success(id, serde_json::json!({"subscribed": true}))
                    }
                    Err(e) => RpcResponse::error(id, e),
                }
            }
            Ok(request) if request.method == "unsubscribe_events" => {
                let was_subscribed = forwarder.take().map(|t| t.abort()).is_some();
                RpcResponse::success(
                    request.id,
                    serde_json::json!({"unsubscribed": was_subscribed}),
                )
            }
            Ok(request) => dispatch_request(state.clone(), request).await,
            Err(_) => RpcResponse::error(serde_json::Value::Null, RpcError::parse_error()),
        };

        let mut response_json = serde_json::to_string(&response)?;
        response_json.push('\n');
        if out_tx.send(response_json).await.is_err() {
            break;
        }
    }

    if let Some(task) = forwarder.take() {
        task.abort();
    }
    drop(out_tx);
    writer_task.await??;
    Ok(())
}

/// Result of reading one request line.
#[derive(Debug, PartialEq, Eq)]
enum LineRead {
    Line,
    Eof,
    TooLong,
}

/// Read one newline-terminated request into `line`, buffering at most
/// `max_bytes` plus the terminator.
async fn read_request_line<R>(
    reader: &mut R,
    line: &mut String,
    max_bytes: u64,
) -> std::io::Result<LineRead>
where
    R: AsyncBufRead + Unpin,
{
    let mut limited = reader.take(max_bytes.saturating_add(1));
    let bytes_read = limited.read_line(line).await?;
    if bytes_read == 0 {
        Ok(LineRead::Eof)
    } else if !line.ends_with('\n') && bytes_read as u64 > max_bytes {
        Ok(LineRead::TooLong)
    } else {
        Ok(LineRead::Line)
    }
}

/// Start forwarding matching events to this connection.
///
/// Non-admin sessions only ever see events about themselves.
async fn subscribe(
    state: &Arc<DaemonState>,
    params: &serde_json::Value,
    out_tx: mpsc::Sender<String>,
) -> Result<JoinHandle<()>, RpcError> {
    let session = session::require(state, params).await?;

    let mut filter: EventFilter = match params.get("filter") {
        Some(f) if !f.is_null() => serde_json::from_value(f.clone())
            .map_err(|e| RpcError::invalid_params(&format!("invalid filter: {e}")))?,
        _ => EventFilter::default(),
    };
    if !session.is_admin {
        filter.user_ids = Some(vec![session.user_id.clone()]);
    }

    let mut rx = state.event_bus.subscribe();
    Ok(tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if !filter.matches(&event) {
                        continue;
                    }
                    let note = serde_json::json!({
                        "jsonrpc": "2.0",
                        "method": "event",
                        "params": event,
                    });
                    if out_tx.send(format!("{note}\n")).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "event subscriber lagging");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }))
}

/// Dispatch a JSON-RPC request to the appropriate command handler.
pub async fn dispatch_request(state: Arc<DaemonState>, request: RpcRequest) -> RpcResponse {
    let id = request.id.clone();
    let method = request.method.as_str();
    let params = &request.params;

    debug!("Dispatching RPC method: {}", method);

    let result = match method {
        // Auth
        "sign_up" => commands::auth::sign_up(&state, params).await,
        "sign_in" => commands::auth::sign_in(&state, params).await,
        "sign_out" => commands::auth::sign_out(&state, params).await,
        "get_session" => commands::auth::get_session(&state, params).await,

        // Profile
        "get_profile" => commands::profile::get_profile(&state, params).await,
        "update_profile" => commands::profile::update_profile(&state, params).await,
        "get_creator_stats" => commands::profile::get_creator_stats(&state, params).await,

        // Videos
        "list_videos" => commands::videos::list_videos(&state, params).await,
        "get_video" => commands::videos::get_video(&state, params).await,
        "my_videos" => commands::videos::my_videos(&state, params).await,
        "open_video" => commands::videos::open_video(&state, params).await,
        "upload_video" => commands::videos::upload_video(&state, params).await,
        "delete_video" => commands::videos::delete_video(&state, params).await,

        // Ads
        "start_ad" => commands::ads::start_ad(&state, params).await,
        "complete_ad" => commands::ads::complete_ad(&state, params).await,
        "cancel_ad" => commands::ads::cancel_ad(&state, params).await,

        // Rewards
        "claim_milestones" => commands::rewards::claim_milestones(&state, params).await,
        "get_reward_history" => commands::rewards::get_reward_history(&state, params).await,

        // Referrals
        "get_referral_code" => commands::referral::get_referral_code(&state, params).await,
        "redeem_referral" => commands::referral::redeem_referral(&state, params).await,

        // Withdrawals
        "get_withdraw_eligibility" => {
            commands::withdraw::get_withdraw_eligibility(&state, params).await
        }
        "request_withdrawal" => commands::withdraw::request_withdrawal(&state, params).await,
        "my_withdrawals" => commands::withdraw::my_withdrawals(&state, params).await,

        // Admin
        "list_withdrawals" => commands::admin::list_withdrawals(&state, params).await,
        "confirm_withdrawal" => commands::admin::confirm_withdrawal(&state, params).await,

        // Comments
        "list_comments" => commands::comments::list_comments(&state, params).await,
        "add_comment" => commands::comments::add_comment(&state, params).await,
        "toggle_comment_like" => commands::comments::toggle_comment_like(&state, params).await,
        "delete_comment" => commands::comments::delete_comment(&state, params).await,

        // Diagnostics
        "get_daemon_info" => commands::diagnostics::get_daemon_info(&state).await,

        _ => Err(RpcError::method_not_found(method)),
    };

    match result {
        Ok(value) => RpcResponse::success(id, value),
        Err(err) => RpcResponse::error(id, err),
    }
}

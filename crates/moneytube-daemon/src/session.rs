//! Session tokens.
//!
//! `sign_in` and `sign_up` issue a random bearer token. Every authenticated
//! RPC call passes it as the `session` param; each use refreshes the idle
//! timer. Tokens live only in memory and do not survive a restart.

use std::collections::HashMap;
use std::sync::Arc;

use rand::RngCore;
use serde_json::Value;

use moneytube_types::{now_secs, UserId};

use crate::rpc::RpcError;
use crate::DaemonState;

/// An authenticated session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user_id: UserId,
    pub email: String,
    pub is_admin: bool,
    pub last_seen: u64,
}

/// In-memory session table with idle expiry.
#[derive(Debug)]
pub struct SessionStore {
    sessions: HashMap<String, Session>,
    timeout_secs: u64,
}

impl SessionStore {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            sessions: HashMap::new(),
            timeout_secs,
        }
    }

    /// Issue a new token for `user_id`.
    pub fn create(&mut self, user_id: &str, email: &str, is_admin: bool, now: u64) -> Session {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let session = Session {
            token: hex::encode(bytes),
            user_id: user_id.to_string(),
            email: email.to_string(),
            is_admin,
            last_seen: now,
        };
        self.sessions.insert(session.token.clone(), session.clone());
        session
    }

    /// Look up a token and refresh its idle timer. An expired token is
    /// removed and yields `None`.
    pub fn touch(&mut self, token: &str, now: u64) -> Option<Session> {
        let expired = match self.sessions.get_mut(token) {
            None => return None,
            Some(s) if now.saturating_sub(s.last_seen) > self.timeout_secs => true,
            Some(s) => {
                s.last_seen = now;
                return Some(s.clone());
            }
        };
        if expired {
            self.sessions.remove(token);
        }
        None
    }

    /// Drop a token. Returns `false` if it was not live.
    pub fn remove(&mut self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }

    /// Drop every idle-expired token.
    pub fn purge_expired(&mut self, now: u64) -> usize {
        let before = self.sessions.len();
        let timeout = self.timeout_secs;
        self.sessions
            .retain(|_, s| now.saturating_sub(s.last_seen) <= timeout);
        before - self.sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }
}

/// Extract the `session` param, if any.
pub fn token_param(params: &Value) -> Option<&str> {
    params.get("session").and_then(|v| v.as_str())
}

/// Resolve the caller's session.
///
/// Fails with `SESSION_REQUIRED` when the token is missing, unknown or
/// expired.
pub async fn require(state: &Arc<DaemonState>, params: &Value) -> Result<Session, RpcError> {
    let token = token_param(params).ok_or_else(RpcError::session_required)?;
    state
        .sessions
        .lock()
        .await
        .touch(token, now_secs())
        .ok_or_else(RpcError::session_required)
}

/// Resolve the caller's session if one was supplied.
///
/// A supplied but invalid token is an error rather than silently anonymous.
pub async fn optional(
    state: &Arc<DaemonState>,
    params: &Value,
) -> Result<Option<Session>, RpcError> {
    if token_param(params).is_none() {
        return Ok(None);
    }
    require(state, params).await.map(Some)
}

/// Resolve the caller's session and require the admin identity.
pub async fn require_admin(state: &Arc<DaemonState>, params: &Value) -> Result<Session, RpcError> {
    let session = require(state, params).await?;
    if !session.is_admin {
        return Err(RpcError::admin_required());
    }
    Ok(session)
}

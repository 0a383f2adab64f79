//! Voice transport provider port
//!
//! The engine never touches telephony signaling or audio; it asks the
//! provider to open a room for a call and receives asynchronous status
//! events that map 1:1 onto call transitions.

pub mod simulated;

pub use simulated::{DialScript, SimulatedTransport};

use crate::domain::call::aggregate::OutboundCall;
use crate::domain::shared::value_objects::SessionId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Transport-level failure
///
/// These are environment failures, not domain errors: the call service
/// funnels them into `fail(reason)` so the retry policy applies.
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    #[error("Provider unreachable: {0}")]
    Unreachable(String),

    #[error("Room setup failed: {0}")]
    RoomSetupFailed(String),
}

/// Handle to the provider's real-time room servicing a call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomHandle {
    pub room_name: String,
    pub access_token: Option<String>,
}

/// Why the provider reported the call over
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallEndReason {
    /// Remote party (or provider) hung up
    Hangup,
    NoAnswer,
    Busy,
    ProviderError(String),
}

/// Asynchronous status event pushed by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportEvent {
    Ringing,
    Connected,
    VoicemailDetected,
    Ended { reason: CallEndReason },
}

/// Voice transport provider interface
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VoiceTransport: Send + Sync {
    /// Ask the provider to dial the call's recipient into a new room
    async fn start_call(
        &self,
        call: &OutboundCall,
        session_id: SessionId,
    ) -> std::result::Result<RoomHandle, TransportError>;

    /// Tear the room down
    async fn end_call(&self, room_name: &str) -> std::result::Result<(), TransportError>;
}

//! In-process transport provider
//!
//! Drives the engine without real telephony: each dial plays back a
//! scripted sequence of status events through the same channel a real
//! provider callback would use. The binary's demo path and the
//! integration tests run against this adapter.

use super::{CallEndReason, RoomHandle, TransportError, TransportEvent, VoiceTransport};
use crate::domain::call::aggregate::OutboundCall;
use crate::domain::shared::value_objects::{CallId, SessionId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

/// What the simulated remote party does when dialed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialScript {
    /// Ring, answer, then hang up after the talk delay
    Answer,
    /// Ring, answer, and stay on the line (the pipeline completes the call)
    AnswerAndHold,
    NoAnswer,
    Busy,
    Voicemail,
    /// Room setup fails outright
    SetupFailure,
}

/// Scripted in-process voice transport
pub struct SimulatedTransport {
    events: mpsc::Sender<(CallId, TransportEvent)>,
    scripts: Mutex<HashMap<String, DialScript>>,
    default_script: DialScript,
    pace: Duration,
}

impl SimulatedTransport {
    pub fn new(events: mpsc::Sender<(CallId, TransportEvent)>) -> Self {
        Self {
            events,
            scripts: Mutex::new(HashMap::new()),
            default_script: DialScript::AnswerAndHold,
            pace: Duration::from_millis(10),
        }
    }

    pub fn with_default_script(mut self, script: DialScript) -> Self {
        self.default_script = script;
        self
    }

    /// Event pacing between scripted steps
    pub fn with_pace(mut self, pace: Duration) -> Self {
        self.pace = pace;
        self
    }

    /// Script the behavior for one phone number
    pub fn script_number(&self, phone: &str, script: DialScript) {
        self.scripts
            .lock()
            .expect("script table lock")
            .insert(phone.to_string(), script);
    }

    fn script_for(&self, phone: &str) -> DialScript {
        self.scripts
            .lock()
            .expect("script table lock")
            .get(phone)
            .copied()
            .unwrap_or(self.default_script)
    }
}

#[async_trait]
impl VoiceTransport for SimulatedTransport {
    async fn start_call(
        &self,
        call: &OutboundCall,
        session_id: SessionId,
    ) -> std::result::Result<RoomHandle, TransportError> {
        let script = self.script_for(call.recipient().phone().as_str());
        debug!(call_id = %call.id(), ?script, "simulated dial");

        if script == DialScript::SetupFailure {
            return Err(TransportError::RoomSetupFailed(
                "simulated room setup failure".to_string(),
            ));
        }

        let room = RoomHandle {
            room_name: format!("call-{}", session_id),
            access_token: None,
        };

        let events = self.events.clone();
        let call_id = *call.id();
        let pace = self.pace;

        tokio::spawn(async move {
            tokio::time::sleep(pace).await;
            let _ = events.send((call_id, TransportEvent::Ringing)).await;
            tokio::time::sleep(pace).await;

            match script {
                DialScript::Answer => {
                    let _ = events.send((call_id, TransportEvent::Connected)).await;
                    tokio::time::sleep(pace).await;
                    let _ = events
                        .send((
                            call_id,
                            TransportEvent::Ended {
                                reason: CallEndReason::Hangup,
                            },
                        ))
                        .await;
                }
                DialScript::AnswerAndHold => {
                    let _ = events.send((call_id, TransportEvent::Connected)).await;
                }
                DialScript::NoAnswer => {
                    let _ = events
                        .send((
                            call_id,
                            TransportEvent::Ended {
                                reason: CallEndReason::NoAnswer,
                            },
                        ))
                        .await;
                }
                DialScript::Busy => {
                    let _ = events
                        .send((
                            call_id,
                            TransportEvent::Ended {
                                reason: CallEndReason::Busy,
                            },
                        ))
                        .await;
                }
                DialScript::Voicemail => {
                    let _ = events.send((call_id, TransportEvent::VoicemailDetected)).await;
                }
                DialScript::SetupFailure => unreachable!("handled before spawning"),
            }
        });

        Ok(room)
    }

    async fn end_call(&self, room_name: &str) -> std::result::Result<(), TransportError> {
        debug!(room = room_name, "simulated room teardown");
        Ok(())
    }
}

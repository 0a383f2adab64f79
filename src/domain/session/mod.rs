//! Voice session bounded context - live conversation lifecycle

pub mod aggregate;
pub mod repository;
pub mod value_object;

pub use aggregate::{VoiceSession, DEFAULT_TIMEOUT_MINUTES, EMERGENCY_TIMEOUT_MINUTES};
pub use repository::SessionRepository;
pub use value_object::{
    SessionAnalytics, SessionContext, SessionKind, SessionStatus, TranscriptEntry,
};

//! Dialcast - an outbound call campaign engine
//!
//! Schedules, dials, retries and tracks automated voice calls placed on
//! behalf of a business, and manages the voice session bound to each
//! live conversation. Telephony transport and the speech pipeline are
//! external collaborators behind ports.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interface;

// Re-export commonly used types
pub use domain::shared::error::DomainError;
pub use domain::shared::result::Result;

//! Domain layer - Core business logic and rules
//!
//! This layer contains:
//! - Aggregates: Consistency boundaries
//! - Entities: Objects with identity
//! - Value Objects: Immutable objects without identity
//! - Repository Interfaces: Ports for persistence
//! - Domain Events: Things that happened in the domain

pub mod call;
pub mod campaign;
pub mod dnc;
pub mod session;
pub mod shared;

// Re-export commonly used types
pub use shared::{DomainError, Result};

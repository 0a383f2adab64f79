//! Infrastructure layer - adapters for ports defined in the domain

pub mod persistence;
pub mod transport;

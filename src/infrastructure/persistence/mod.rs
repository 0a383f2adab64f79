//! Persistence implementations

pub mod memory;
#[cfg(feature = "postgres")]
pub mod database;
#[cfg(feature = "postgres")]
pub mod call_repository;
#[cfg(feature = "postgres")]
pub mod session_repository;
#[cfg(feature = "postgres")]
pub mod campaign_repository;
#[cfg(feature = "postgres")]
pub mod dnc_repository;

pub use memory::{
    InMemoryCallRepository, InMemoryCampaignRepository, InMemoryDncRepository,
    InMemorySessionRepository,
};

#[cfg(feature = "postgres")]
pub use database::{create_pool, run_migrations, DatabaseConfig};
#[cfg(feature = "postgres")]
pub use call_repository::PgCallRepository;
#[cfg(feature = "postgres")]
pub use session_repository::PgSessionRepository;
#[cfg(feature = "postgres")]
pub use campaign_repository::PgCampaignRepository;
#[cfg(feature = "postgres")]
pub use dnc_repository::PgDncRepository;

//! Application layer - Use cases and worker loops
//!
//! This layer orchestrates domain objects to fulfill use cases:
//! creation and cancellation flows, the dial scheduler, the follow-up
//! materializer, the session sweep, and campaign management.

pub mod call;
pub mod campaign;
pub mod followup;
pub mod scheduler;
pub mod sweeper;

pub use call::CallService;
pub use campaign::{CampaignService, SuccessCriteriaConfig};
pub use followup::FollowUpJob;
pub use scheduler::{CallScheduler, PassSummary, SchedulerConfig};
pub use sweeper::SessionSweeper;

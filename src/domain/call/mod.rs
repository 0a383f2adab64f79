//! Outbound call bounded context - scheduling, dialing, retry and outcome

pub mod aggregate;
pub mod event;
pub mod policy;
pub mod repository;
pub mod value_object;

pub use aggregate::OutboundCall;
pub use event::CallEvent;
pub use policy::{follow_up_delay, ExponentialBackoffRetry, FixedIntervalRetry, RetryPolicy};
pub use repository::CallRepository;
pub use value_object::{
    CallAnalytics, CallOutcome, CallPriority, CallPurpose, CallRecipient, CallScript, CallStatus,
    PreferredContactTime,
};

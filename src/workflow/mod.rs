//! Pure booking/payment business rules.
//!
//! Everything in here is synchronous and side-effect free: functions take
//! snapshots of rows plus whatever context the decision needs (actor, today's
//! date, duplicate flags) and return `Result<_, WorkflowError>`. The store
//! layer is responsible for loading those snapshots inside a transaction and
//! applying the outcome.

pub mod actor;
pub mod booking;
pub mod error;
pub mod payment;

pub use actor::Actor;
pub use error::WorkflowError;

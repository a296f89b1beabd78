pub mod activity;
pub mod booking;
pub mod payment;
pub mod plan;
pub mod tour;
pub mod user;

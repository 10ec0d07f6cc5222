//! Domain rules for the detective quiz game.
//!
//! Everything in this crate is pure: hit-test geometry, the case/question
//! graph, progress and unlock rules, coin policy, payment verification and
//! the anonymous-account merge. Persistence and the payment gateway are
//! reached only through the traits in [`store`] and [`payment`].

pub mod account;
pub mod catalog;
pub mod coins;
pub mod error;
pub mod geometry;
pub mod payment;
pub mod products;
pub mod progress;
pub mod store;
pub mod types;

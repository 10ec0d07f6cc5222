//! Payment gateway integration.
//!
//! [`PortOneApi`] fetches payments from the gateway's REST API and
//! implements [`sleuth_core::payment::PaymentGateway`] so the engine can
//! verify purchases server-side.

pub mod api;

pub use api::{PaymentApiError, PortOneApi, DEFAULT_API_URL};

pub mod cases;
pub mod coins;
pub mod payment;
pub mod progress;
pub mod session;

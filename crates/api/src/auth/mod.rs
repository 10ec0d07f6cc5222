//! Access-token verification for auth-provider issued JWTs.

pub mod jwt;

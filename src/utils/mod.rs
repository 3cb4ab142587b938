//! Shared utilities: crypto, cookies, and response helpers

pub mod cookies;
pub mod crypto;
pub mod responses;

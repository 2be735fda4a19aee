//! Middleware

pub mod wallet;

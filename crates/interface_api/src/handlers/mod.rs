//! HTTP request handlers

pub mod claims;
pub mod governance;
pub mod health;

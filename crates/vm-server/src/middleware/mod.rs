//! HTTP middleware layers.

pub mod auth;
pub mod request_id;

//! Route handlers for the HTTP API.

pub mod events;
pub mod health;
pub mod items;
pub mod merge;

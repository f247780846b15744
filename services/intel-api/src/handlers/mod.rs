//! HTTP request handlers for the intel API.

pub mod health;
pub mod update;

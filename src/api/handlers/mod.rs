//! HTTP request handlers.

pub mod auth;
pub mod catalog;
pub mod health;
pub mod notes;
pub mod payments;
pub mod users;

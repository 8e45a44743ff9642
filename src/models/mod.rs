//! Database entity models.

pub mod catalog;
pub mod download;
pub mod note;
pub mod notification;
pub mod order;
pub mod user;

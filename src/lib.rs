//! NoteVault - Backend Library
//!
//! Backend API for a student academic-resources platform: course/subject
//! browsing, note uploads and downloads, premium access control, and
//! payment-gateway integration.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;

pub use config::Config;
pub use error::{AppError, Result};

//! Business logic services.

pub mod access;
pub mod audit_service;
pub mod auth_service;
pub mod note_service;
pub mod notification_service;
pub mod payment_service;

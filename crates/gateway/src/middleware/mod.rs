//! Request middleware

pub mod admin_key;
pub mod request_metrics;

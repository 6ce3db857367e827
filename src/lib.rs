//! contact-blast — contact ingestion and throttled bulk dispatch.

pub mod classify;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod ingest;
pub mod report;
pub mod validate;

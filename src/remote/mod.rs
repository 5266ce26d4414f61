// ABOUTME: HTTP boundary to the product API
// ABOUTME: Typed client and payload models for auth, lookups, and ETL control

pub mod client;
pub mod models;

pub use client::ApiClient;
pub use models::{
    EtlLogs, EtlStartAck, EtlStartRequest, EtlStatus, EtlValidation, JobState, TokenResponse, User,
};

// ABOUTME: Library surface of the CNPJ ETL console
// ABOUTME: Exposes the API client, confirmation gate, and status poller to the binary and tests

pub mod config;
pub mod control;
pub mod error;
pub mod remote;
pub mod session;

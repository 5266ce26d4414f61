// ABOUTME: Control flow around the ETL job lifecycle
// ABOUTME: Pre-start confirmation gate and the recurring status poller

pub mod gate;
pub mod poller;

pub use gate::{authorize, decide, StartDecision};
pub use poller::{PollSnapshot, StatusPoller, DEFAULT_POLL_INTERVAL};

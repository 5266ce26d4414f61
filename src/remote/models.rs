// ABOUTME: Data structures for the product API's JSON payloads
// ABOUTME: Covers auth, company lookup, and the ETL control endpoints

use std::fmt;

use serde::{Deserialize, Serialize};

/// Job states reported by `GET /etl/status`.
///
/// The wire value is an open string. Anything unrecognized lands in
/// `Unknown` so a new server-side state degrades to a display-only value
/// instead of breaking the client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum JobState {
    Idle,
    Running,
    Completed,
    Failed,
    Unknown(String),
}

impl From<String> for JobState {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "idle" => JobState::Idle,
            "running" => JobState::Running,
            "completed" => JobState::Completed,
            // The backend historically reports "error" rather than "failed".
            "failed" | "error" => JobState::Failed,
            _ => JobState::Unknown(raw),
        }
    }
}

impl JobState {
    /// True while status polling should stay armed.
    pub fn is_active(&self) -> bool {
        matches!(self, JobState::Running)
    }

    /// Terminal states require a fresh start request to make progress again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }

    pub fn label(&self) -> &str {
        match self {
            JobState::Idle => "idle",
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of the pre-start checks. Produced fresh on every call, never
/// merged with a previous result.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EtlValidation {
    pub can_proceed: bool,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub disk_free_gb: f64,
    #[serde(default)]
    pub disk_used_gb: f64,
    #[serde(default)]
    pub postgres_running: bool,
    #[serde(default)]
    pub tables_exist: bool,
}

/// Snapshot of the current import job, fetched whole from `GET /etl/status`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EtlStatus {
    pub job_id: String,
    #[serde(rename = "status")]
    pub state: JobState,
    #[serde(default)]
    pub current_step: Option<String>,
    #[serde(default)]
    pub current_file: Option<String>,
    #[serde(default)]
    pub current_table: Option<String>,
    #[serde(default)]
    pub progress_percent: f64,
    #[serde(default)]
    pub files_processed: u64,
    #[serde(default)]
    pub files_total: u64,
    #[serde(default)]
    pub records_imported: u64,
    #[serde(default)]
    pub disk_free_gb: Option<f64>,
    #[serde(default)]
    pub disk_used_gb: Option<f64>,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub elapsed_seconds: u64,
    #[serde(default)]
    pub estimated_remaining_seconds: Option<u64>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl EtlStatus {
    /// Sentinel `job_id` the server returns when no import has ever run.
    pub const NO_JOB: &'static str = "none";

    pub fn has_job(&self) -> bool {
        self.job_id != Self::NO_JOB
    }
}

/// Body of `POST /etl/start`.
#[derive(Debug, Clone, Serialize)]
pub struct EtlStartRequest {
    pub force: bool,
    pub skip_download: bool,
    pub tables: Vec<String>,
}

impl Default for EtlStartRequest {
    fn default() -> Self {
        Self {
            force: false,
            skip_download: false,
            tables: vec!["all".to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EtlStartAck {
    pub status: String,
    pub job_id: String,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EtlLogs {
    pub logs: Vec<String>,
    pub total_lines: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    pub is_active: bool,
    pub is_superuser: bool,
    pub is_verified: bool,
}

//! Failure taxonomy for a planning run.
//!
//! Every failure surfaces as one [`PlanError`]; no path returns a partial
//! plan. Callers map variants to transport concerns (HTTP status, exit
//! code) without inspecting message text.

use thiserror::Error;
use uuid::Uuid;

use crate::generator::normalize::NormalizeError;
use crate::generator::schema::SchemaError;
use crate::pantry::PantryArithmeticError;

/// Errors that can abort a planning run.
#[derive(Debug, Error)]
pub enum PlanError {
    /// No parse strategy recovered a JSON object from the generator output.
    #[error("generator returned malformed output: {preview:?}")]
    MalformedResponse { preview: String },

    /// Output parsed but does not describe a valid day.
    #[error("generated day failed validation: {0}")]
    InvalidPlanSchema(#[from] SchemaError),

    /// The backend failed with a non-transient error, or transient retries
    /// were exhausted.
    #[error("generator backend failed after {attempts} attempt(s){}: {message}", status_suffix(.status))]
    UpstreamGeneration {
        status: Option<u16>,
        message: String,
        attempts: u32,
    },

    #[error(transparent)]
    PantryArithmetic(#[from] PantryArithmeticError),

    #[error("invalid plan request: {0}")]
    InvalidRequest(String),

    #[error("user {0} not found")]
    UserNotFound(Uuid),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (status {code})"),
        None => String::new(),
    }
}

impl From<NormalizeError> for PlanError {
    fn from(err: NormalizeError) -> Self {
        Self::MalformedResponse {
            preview: err.preview,
        }
    }
}

impl PlanError {
    /// Upstream status code for [`PlanError::UpstreamGeneration`], if any.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::UpstreamGeneration { status, .. } => *status,
            _ => None,
        }
    }
}

//! Workflow failure taxonomy.
//!
//! Every transition failure is one of these, surfaced to the caller as a
//! distinct JSON error. The only swallowed failure in the whole workflow is
//! outbound document delivery, which is logged in the bridge instead.

use crate::orm::appeals::AppealStatus;
use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use sea_orm::DbErr;

#[derive(Debug)]
pub enum WorkflowError {
    /// Actor may not act on this appeal
    Forbidden,
    /// Referenced entity does not exist
    NotFound(&'static str),
    /// Target status is not reachable from the current status for this actor
    InvalidTransition {
        from: AppealStatus,
        to: AppealStatus,
    },
    /// Required field missing or malformed
    Validation(String),
    /// Concurrent change or duplicate linkage
    Conflict(String),
    /// Underlying storage failure
    Database(DbErr),
}

impl std::fmt::Display for WorkflowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkflowError::Forbidden => write!(f, "Not permitted for this account"),
            WorkflowError::NotFound(what) => write!(f, "{} not found", what),
            WorkflowError::InvalidTransition { from, to } => {
                write!(f, "Status change from {} to {} is not permitted", from, to)
            }
            WorkflowError::Validation(msg) => write!(f, "{}", msg),
            WorkflowError::Conflict(msg) => write!(f, "{}", msg),
            WorkflowError::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for WorkflowError {}

impl From<DbErr> for WorkflowError {
    fn from(e: DbErr) -> Self {
        WorkflowError::Database(e)
    }
}

impl actix_web::ResponseError for WorkflowError {
    fn status_code(&self) -> StatusCode {
        match self {
            WorkflowError::Forbidden => StatusCode::FORBIDDEN,
            WorkflowError::NotFound(_) => StatusCode::NOT_FOUND,
            WorkflowError::InvalidTransition { .. } => StatusCode::BAD_REQUEST,
            WorkflowError::Validation(_) => StatusCode::BAD_REQUEST,
            WorkflowError::Conflict(_) => StatusCode::CONFLICT,
            WorkflowError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let WorkflowError::Database(e) = self {
            log::error!("Workflow database error: {}", e);
        }

        HttpResponse::build(self.status_code())
            .json(serde_json::json!({ "error": self.to_string() }))
    }
}

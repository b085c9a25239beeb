//! Appeal audit history recorder.
//!
//! Append-only: entries are inserted inside the same transaction as the
//! change they record and are never updated or deleted.

use crate::orm::appeal_history;
use crate::orm::appeals::AppealStatus;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ConnectionTrait, DbErr};

/// One audit entry to be appended.
#[derive(Debug, Default, Clone)]
pub struct NewHistoryEntry {
    pub appeal_id: i32,
    pub user_id: i32,
    /// Resulting status; `None` for free-text annotations
    pub status: Option<AppealStatus>,
    pub text: Option<String>,
    pub time_file: Option<String>,
    pub report_citizen: Option<String>,
    pub report_government: Option<String>,
    pub report_photo: Option<String>,
}

impl NewHistoryEntry {
    /// Entry recording a status change.
    pub fn status_change(appeal_id: i32, user_id: i32, status: AppealStatus) -> Self {
        Self {
            appeal_id,
            user_id,
            status: Some(status),
            ..Default::default()
        }
    }

    /// Free-text annotation with no status.
    pub fn annotation(appeal_id: i32, user_id: i32, text: String) -> Self {
        Self {
            appeal_id,
            user_id,
            text: Some(text),
            ..Default::default()
        }
    }

    pub fn with_text(mut self, text: Option<String>) -> Self {
        self.text = text;
        self
    }
}

/// Append one entry. Must be called with the transaction of the change it
/// records, so neither can commit without the other.
pub async fn append<C: ConnectionTrait>(
    conn: &C,
    entry: NewHistoryEntry,
) -> Result<appeal_history::Model, DbErr> {
    appeal_history::ActiveModel {
        appeal_id: Set(entry.appeal_id),
        user_id: Set(entry.user_id),
        status: Set(entry.status.map(|s| s.as_str().to_string())),
        text: Set(entry.text),
        time_file: Set(entry.time_file),
        report_citizen: Set(entry.report_citizen),
        report_government: Set(entry.report_government),
        report_photo: Set(entry.report_photo),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(conn)
    .await
}

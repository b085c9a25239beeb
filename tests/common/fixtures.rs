//! Test fixtures for creating test data
#![allow(dead_code)]
#![allow(clippy::needless_update)]

use async_trait::async_trait;
use chrono::{Timelike, Utc};
use murajaat::notifier::{Notifier, NotifyError};
use murajaat::orm::appeals::{AppealStatus, Gender};
use murajaat::orm::intake_appeals::IntakeStatus;
use murajaat::orm::users::UserRole;
use murajaat::orm::{
    appeal_answers, appeals, intake_appeals, intake_users, organizations, users,
};
use murajaat::storage::{StorageBackend, StorageError};
use murajaat::user::Actor;
use sea_orm::{entity::*, ActiveValue::Set, DatabaseConnection, DbErr};
use std::collections::HashMap;
use std::sync::Mutex;

pub async fn create_test_organization(
    db: &DatabaseConnection,
    name: &str,
) -> Result<organizations::Model, DbErr> {
    organizations::ActiveModel {
        name: Set(name.to_string()),
        address: Set("1 Test Street".to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn create_test_user(
    db: &DatabaseConnection,
    login: &str,
    role: UserRole,
    organization_id: Option<i32>,
) -> Result<users::Model, DbErr> {
    users::ActiveModel {
        full_name: Set(format!("Test {}", login)),
        login: Set(login.to_string()),
        phone: Set(None),
        role: Set(role),
        is_active: Set(true),
        organization_id: Set(organization_id),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub fn actor_of(user: &users::Model) -> Actor {
    Actor::from(user.clone())
}

pub async fn create_test_appeal(
    db: &DatabaseConnection,
    status: AppealStatus,
    organization_id: Option<i32>,
    intake_appeal_id: Option<i32>,
) -> Result<appeals::Model, DbErr> {
    appeals::ActiveModel {
        full_name: Set("Aygul Testova".to_string()),
        gender: Set(Gender::Female),
        phone: Set(Some("998901234567".to_string())),
        doc_series: Set(Some("AA".to_string())),
        doc_number: Set(Some("1234567".to_string())),
        address: Set(Some("5 Canal Street".to_string())),
        birthday: Set(None),
        file_path: Set(None),
        text: Set(Some("The street lighting has been out for a month".to_string())),
        status: Set(status),
        // Second precision so values survive the database roundtrip intact
        deadline: Set(Some(
            (Utc::now().naive_utc() + chrono::Duration::days(15))
                .with_nanosecond(0)
                .unwrap(),
        )),
        viewed: Set(false),
        intake_appeal_id: Set(intake_appeal_id),
        mahalla_id: Set(None),
        organization_id: Set(organization_id),
        created_at: Set(Utc::now().naive_utc()),
        updated_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn create_test_intake_user(
    db: &DatabaseConnection,
    chat_id: i64,
) -> Result<intake_users::Model, DbErr> {
    intake_users::ActiveModel {
        chat_id: Set(chat_id),
        phone: Set(Some("998907654321".to_string())),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn create_test_intake_appeal(
    db: &DatabaseConnection,
    chat_id: i64,
    status: IntakeStatus,
) -> Result<intake_appeals::Model, DbErr> {
    intake_appeals::ActiveModel {
        chat_id: Set(chat_id),
        full_name: Set("Aygul Testova".to_string()),
        phone: Set(Some("998907654321".to_string())),
        document: Set(Some("AA 1234567".to_string())),
        birthday: Set(Some("01.01.1990".to_string())),
        address: Set(Some("5 Canal Street".to_string())),
        mahalla: Set(Some("Center".to_string())),
        text: Set(Some("No running water this week".to_string())),
        file_path: Set(None),
        status: Set(status),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn create_test_answer(
    db: &DatabaseConnection,
    appeal_id: i32,
    report_citizen: Option<&str>,
) -> Result<appeal_answers::Model, DbErr> {
    appeal_answers::ActiveModel {
        appeal_id: Set(appeal_id),
        text: Set(Some("Work completed, see the attached report".to_string())),
        time_file: Set(None),
        report_citizen: Set(report_citizen.map(str::to_string)),
        report_government: Set(None),
        report_photo: Set(None),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// One recorded delivery attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryAttempt {
    pub chat_id: i64,
    pub filename: String,
    pub caption: String,
}

/// Notifier that records every attempt and optionally fails them all.
#[derive(Default)]
pub struct RecordingNotifier {
    pub fail: bool,
    pub attempts: Mutex<Vec<DeliveryAttempt>>,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_document(
        &self,
        chat_id: i64,
        filename: &str,
        _data: Vec<u8>,
        caption: &str,
    ) -> Result<(), NotifyError> {
        self.attempts.lock().unwrap().push(DeliveryAttempt {
            chat_id,
            filename: filename.to_string(),
            caption: caption.to_string(),
        });

        if self.fail {
            Err(NotifyError::Rejected("test failure".to_string()))
        } else {
            Ok(())
        }
    }
}

/// In-memory storage backend for delivery tests.
#[derive(Default)]
pub struct MemoryStorage {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn with_object(reference: &str, data: &[u8]) -> Self {
        let storage = Self::default();
        storage
            .objects
            .lock()
            .unwrap()
            .insert(reference.to_string(), data.to_vec());
        storage
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn put_object(&self, data: Vec<u8>, filename: &str) -> Result<String, StorageError> {
        self.objects
            .lock()
            .unwrap()
            .insert(filename.to_string(), data);
        Ok(filename.to_string())
    }

    async fn read_object(&self, reference: &str) -> Result<Vec<u8>, StorageError> {
        self.objects
            .lock()
            .unwrap()
            .get(reference)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(reference.to_string()))
    }

    async fn exists(&self, reference: &str) -> Result<bool, StorageError> {
        Ok(self.objects.lock().unwrap().contains_key(reference))
    }
}

//! Bot intake channel endpoints.
//!
//! The messaging bot registers citizens and their submissions here; the
//! authority sorts intake records and promotes them into formal appeals
//! through the appeal endpoints.

use crate::db::get_db_pool;
use crate::middleware::ClientCtx;
use crate::notifier::Notifier;
use crate::orm::appeals::AppealStatus;
use crate::orm::intake_appeals::IntakeStatus;
use crate::orm::{appeal_answers, appeals, intake_appeals, intake_history, intake_users, users};
use crate::sanitize::strip_html_tags;
use crate::storage::StorageBackend;
use crate::workflow::bridge::{deliver_answer_document, DocumentDelivery};
use actix_multipart::Multipart;
use actix_web::{error, get, patch, post, web, Error, HttpResponse};
use chrono::Utc;
use futures_util::TryStreamExt;
use sea_orm::{
    entity::*, query::*, ActiveValue::Set, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};
use serde::{Deserialize, Serialize};

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(register_intake_user)
        .service(list_citizen_appeals)
        .service(create_intake_appeal)
        .service(list_intake_appeals)
        .service(view_intake_history)
        .service(sort_intake_appeal)
        .service(view_intake_appeal);
}

#[derive(Deserialize)]
struct RegisterIntakeUserForm {
    chat_id: i64,
    phone: Option<String>,
}

/// Register a bot-channel citizen. Conflict when the chat id is known.
#[post("/intake/users")]
async fn register_intake_user(
    form: web::Json<RegisterIntakeUserForm>,
) -> Result<HttpResponse, Error> {
    let db = get_db_pool();

    let existing = intake_users::Entity::find()
        .filter(intake_users::Column::ChatId.eq(form.chat_id))
        .one(db)
        .await
        .map_err(error::ErrorInternalServerError)?;

    if existing.is_some() {
        return Err(error::ErrorConflict(format!(
            "Citizen with chat id {} is already registered",
            form.chat_id
        )));
    }

    let user = intake_users::ActiveModel {
        chat_id: Set(form.chat_id),
        phone: Set(form.phone.clone()),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(error::ErrorInternalServerError)?;

    Ok(HttpResponse::Created().json(user))
}

#[derive(Deserialize)]
struct CitizenAppealsQuery {
    /// When set, re-send the final answer document of this appeal
    appeal_id: Option<i32>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum CitizenAppealEntry {
    Intake {
        id: i32,
        full_name: String,
        phone: Option<String>,
        document: Option<String>,
        birthday: Option<String>,
        mahalla: Option<String>,
        text: Option<String>,
        status: IntakeStatus,
        created_at: String,
    },
    Promoted {
        id: i32,
        full_name: String,
        phone: Option<String>,
        document: Option<String>,
        text: Option<String>,
        status: AppealStatus,
        created_at: String,
    },
}

/// Everything a citizen has submitted: intake records still waiting to be
/// promoted, plus the formal appeals made from the rest. On request,
/// re-sends the final answer document of a completed appeal.
#[get("/intake/users/{chat_id}/appeals")]
async fn list_citizen_appeals(
    path: web::Path<i64>,
    query: web::Query<CitizenAppealsQuery>,
    notifier: web::Data<dyn Notifier>,
    storage: web::Data<dyn StorageBackend>,
) -> Result<HttpResponse, Error> {
    let db = get_db_pool();
    let chat_id = path.into_inner();

    let intake_records = intake_appeals::Entity::find()
        .filter(intake_appeals::Column::ChatId.eq(chat_id))
        .order_by_desc(intake_appeals::Column::Id)
        .all(db)
        .await
        .map_err(error::ErrorInternalServerError)?;

    let intake_ids: Vec<i32> = intake_records.iter().map(|r| r.id).collect();

    let promoted = if intake_ids.is_empty() {
        Vec::new()
    } else {
        appeals::Entity::find()
            .filter(appeals::Column::IntakeAppealId.is_in(intake_ids.clone()))
            .order_by_desc(appeals::Column::Id)
            .all(db)
            .await
            .map_err(error::ErrorInternalServerError)?
    };

    if let Some(appeal_id) = query.appeal_id {
        let appeal = promoted
            .iter()
            .find(|a| a.id == appeal_id)
            .ok_or_else(|| error::ErrorForbidden("This appeal belongs to another citizen"))?;

        if matches!(
            appeal.status,
            AppealStatus::SuccessDone | AppealStatus::TextDone
        ) {
            let last_answer = appeal_answers::Entity::find()
                .filter(appeal_answers::Column::AppealId.eq(appeal.id))
                .order_by_desc(appeal_answers::Column::CreatedAt)
                .one(db)
                .await
                .map_err(error::ErrorInternalServerError)?;

            if let Some(reference) = last_answer.and_then(|a| a.report_citizen) {
                deliver_answer_document(
                    notifier.get_ref(),
                    storage.get_ref(),
                    &DocumentDelivery {
                        chat_id,
                        reference,
                        caption: format!(
                            "The authority's answer to your appeal #{}",
                            appeal.id
                        ),
                    },
                )
                .await;
            }
        }
    }

    // Intake records already backing an appeal are represented by that
    // appeal alone.
    let promoted_intake_ids: Vec<i32> =
        promoted.iter().filter_map(|a| a.intake_appeal_id).collect();

    let mut entries: Vec<CitizenAppealEntry> = intake_records
        .into_iter()
        .filter(|r| !promoted_intake_ids.contains(&r.id))
        .map(|r| CitizenAppealEntry::Intake {
            id: r.id,
            full_name: r.full_name,
            phone: r.phone,
            document: r.document,
            birthday: r.birthday,
            mahalla: r.mahalla,
            text: r.text.as_deref().map(strip_html_tags),
            status: r.status,
            created_at: r.created_at.format("%d.%m.%Y %H:%M").to_string(),
        })
        .collect();

    entries.extend(promoted.into_iter().map(|a| CitizenAppealEntry::Promoted {
        id: a.id,
        full_name: a.full_name,
        phone: a.phone,
        document: match (a.doc_series, a.doc_number) {
            (Some(series), Some(number)) => Some(format!("{} {}", series, number)),
            (series, number) => series.or(number),
        },
        text: a.text,
        status: a.status,
        created_at: a.created_at.format("%d.%m.%Y %H:%M").to_string(),
    }));

    Ok(HttpResponse::Ok().json(entries))
}

/// Multipart submission from the bot: text fields plus an optional file.
#[post("/intake/appeals")]
async fn create_intake_appeal(
    storage: web::Data<dyn StorageBackend>,
    mut payload: Multipart,
) -> Result<HttpResponse, Error> {
    let db = get_db_pool();
    let max_bytes = crate::app_config::limits().max_upload_size_mb as usize * 1024 * 1024;

    let mut chat_id: Option<i64> = None;
    let mut full_name: Option<String> = None;
    let mut phone = None;
    let mut document = None;
    let mut birthday = None;
    let mut address = None;
    let mut mahalla = None;
    let mut text = None;
    let mut file_path: Option<String> = None;

    while let Some(mut field) = payload.try_next().await? {
        let name = field.name().to_string();
        match name.as_str() {
            "chat_id" => {
                let raw = super::read_field_text(&mut field).await?;
                chat_id = Some(
                    raw.trim()
                        .parse()
                        .map_err(|_| error::ErrorBadRequest("chat_id must be an integer"))?,
                );
            }
            "full_name" => full_name = Some(super::read_field_text(&mut field).await?),
            "phone" => phone = Some(super::read_field_text(&mut field).await?),
            "document" => document = Some(super::read_field_text(&mut field).await?),
            "birthday" => birthday = Some(super::read_field_text(&mut field).await?),
            "address" => address = Some(super::read_field_text(&mut field).await?),
            "mahalla" => mahalla = Some(super::read_field_text(&mut field).await?),
            "text" => text = Some(super::read_field_text(&mut field).await?),
            "file" => {
                let original_name = field
                    .content_disposition()
                    .get_filename()
                    .map(str::to_string)
                    .unwrap_or_default();
                let data = super::read_field_bytes(&mut field, max_bytes).await?;
                if data.is_empty() {
                    continue;
                }

                let stored_name = match original_name.rsplit_once('.') {
                    Some((_, ext)) => format!("{}.{}", uuid::Uuid::new_v4(), ext),
                    None => uuid::Uuid::new_v4().to_string(),
                };
                file_path = Some(
                    storage
                        .put_object(data, &stored_name)
                        .await
                        .map_err(error::ErrorInternalServerError)?,
                );
            }
            _ => {}
        }
    }

    let chat_id = chat_id.ok_or_else(|| error::ErrorBadRequest("chat_id is required"))?;
    let full_name = full_name.ok_or_else(|| error::ErrorBadRequest("full_name is required"))?;

    let citizen = intake_users::Entity::find()
        .filter(intake_users::Column::ChatId.eq(chat_id))
        .one(db)
        .await
        .map_err(error::ErrorInternalServerError)?;

    if citizen.is_none() {
        return Err(error::ErrorNotFound(format!(
            "Citizen with chat id {} is not registered",
            chat_id
        )));
    }

    let record = intake_appeals::ActiveModel {
        chat_id: Set(chat_id),
        full_name: Set(full_name),
        phone: Set(phone),
        document: Set(document),
        birthday: Set(birthday),
        address: Set(address),
        mahalla: Set(mahalla),
        text: Set(text),
        file_path: Set(file_path),
        status: Set(IntakeStatus::New),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(error::ErrorInternalServerError)?;

    intake_history::ActiveModel {
        intake_appeal_id: Set(record.id),
        user_id: Set(None),
        text: Set(Some("New submission from the bot channel".to_string())),
        status: Set(IntakeStatus::New),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(error::ErrorInternalServerError)?;

    Ok(HttpResponse::Created().json(record))
}

#[derive(Deserialize)]
struct IntakeListQuery {
    status: Option<IntakeStatus>,
    from_date: Option<String>,
    to_date: Option<String>,
    page: Option<u64>,
    limit: Option<u64>,
}

#[derive(Serialize)]
struct IntakeListItem {
    id: i32,
    full_name: String,
    phone: Option<String>,
    text: Option<String>,
    status: IntakeStatus,
    created_at: String,
}

/// Authority-side intake listing.
#[get("/intake/appeals")]
async fn list_intake_appeals(
    client: ClientCtx,
    query: web::Query<IntakeListQuery>,
) -> Result<HttpResponse, Error> {
    client.require_authority()?;
    let db = get_db_pool();

    let mut finder = intake_appeals::Entity::find();

    if let Some(status) = query.status {
        finder = finder.filter(intake_appeals::Column::Status.eq(status));
    }
    if let Some(from) = query.from_date.as_deref() {
        finder =
            finder.filter(intake_appeals::Column::CreatedAt.gte(super::parse_date_param(from)?));
    }
    if let Some(to) = query.to_date.as_deref() {
        let to = super::end_of_day(super::parse_date_param(to)?);
        finder = finder.filter(intake_appeals::Column::CreatedAt.lte(to));
    }

    let limit = query
        .limit
        .unwrap_or(crate::app_config::limits().per_page as u64)
        .max(1);
    let page = query.page.unwrap_or(1).max(1);

    let paginator = finder
        .order_by_desc(intake_appeals::Column::Id)
        .paginate(db, limit);
    let total = paginator
        .num_items()
        .await
        .map_err(error::ErrorInternalServerError)?;
    let records = paginator
        .fetch_page(page - 1)
        .await
        .map_err(error::ErrorInternalServerError)?;

    let data: Vec<IntakeListItem> = records
        .into_iter()
        .map(|r| IntakeListItem {
            id: r.id,
            full_name: r.full_name,
            phone: r.phone,
            text: r.text,
            status: r.status,
            created_at: r.created_at.format("%d.%m.%Y %H:%M").to_string(),
        })
        .collect();

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "data": data,
        "pagination": { "page": page, "limit": limit, "total": total },
    })))
}

/// Authority-side intake detail, with the promoted appeal id when one
/// exists.
#[get("/intake/appeals/{id}")]
async fn view_intake_appeal(client: ClientCtx, path: web::Path<i32>) -> Result<HttpResponse, Error> {
    client.require_authority()?;
    let db = get_db_pool();
    let intake_id = path.into_inner();

    let record = intake_appeals::Entity::find_by_id(intake_id)
        .one(db)
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Intake record not found"))?;

    let promoted = appeals::Entity::find()
        .filter(appeals::Column::IntakeAppealId.eq(record.id))
        .one(db)
        .await
        .map_err(error::ErrorInternalServerError)?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "id": record.id,
        "chat_id": record.chat_id,
        "full_name": record.full_name,
        "phone": record.phone,
        "document": record.document,
        "birthday": record.birthday,
        "address": record.address,
        "mahalla": record.mahalla,
        "text": record.text,
        "file_path": record.file_path,
        "status": record.status,
        "created_at": record.created_at,
        "appeal_id": promoted.map(|a| a.id),
    })))
}

#[derive(Deserialize)]
struct SortIntakeForm {
    status: IntakeStatus,
    text: Option<String>,
}

/// Manual sorting of an intake record by the authority (e.g. marking it
/// canceled before promotion).
#[patch("/intake/appeals/{id}/sort")]
async fn sort_intake_appeal(
    client: ClientCtx,
    path: web::Path<i32>,
    form: web::Json<SortIntakeForm>,
) -> Result<HttpResponse, Error> {
    let actor = client.require_authority()?;
    let db = get_db_pool();
    let intake_id = path.into_inner();

    let record = intake_appeals::Entity::find_by_id(intake_id)
        .one(db)
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Intake record not found"))?;

    // Once promoted, the record's lifecycle is driven by the appeal
    // workflow and manual sorting would fight it.
    let promoted = appeals::Entity::find()
        .filter(appeals::Column::IntakeAppealId.eq(record.id))
        .one(db)
        .await
        .map_err(error::ErrorInternalServerError)?;
    if promoted.is_some() {
        return Err(error::ErrorConflict(
            "This record is already linked to an appeal",
        ));
    }

    let mut active: intake_appeals::ActiveModel = record.into();
    active.status = Set(form.status);
    let record = active
        .update(db)
        .await
        .map_err(error::ErrorInternalServerError)?;

    intake_history::ActiveModel {
        intake_appeal_id: Set(record.id),
        user_id: Set(Some(actor.id)),
        text: Set(form.text.clone()),
        status: Set(form.status),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(error::ErrorInternalServerError)?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "id": record.id,
        "status": record.status,
    })))
}

#[derive(Serialize)]
struct IntakeHistoryView {
    id: i32,
    intake_appeal_id: i32,
    user: Option<String>,
    text: Option<String>,
    status: IntakeStatus,
    date: String,
}

/// Authority-side intake audit trail.
#[get("/intake/appeals/{id}/history")]
async fn view_intake_history(
    client: ClientCtx,
    path: web::Path<i32>,
) -> Result<HttpResponse, Error> {
    client.require_authority()?;
    let db = get_db_pool();
    let intake_id = path.into_inner();

    let entries = intake_history::Entity::find()
        .filter(intake_history::Column::IntakeAppealId.eq(intake_id))
        .order_by_desc(intake_history::Column::Id)
        .all(db)
        .await
        .map_err(error::ErrorInternalServerError)?;

    if entries.is_empty() {
        return Err(error::ErrorNotFound("No history for this intake record"));
    }

    let mut data = Vec::with_capacity(entries.len());
    for entry in entries {
        let user = match entry.user_id {
            Some(user_id) => users::Entity::find_by_id(user_id)
                .one(db)
                .await
                .map_err(error::ErrorInternalServerError)?
                .map(|u| u.full_name),
            None => None,
        };

        data.push(IntakeHistoryView {
            id: entry.id,
            intake_appeal_id: entry.intake_appeal_id,
            user,
            text: entry.text,
            status: entry.status,
            date: entry.created_at.format("%d.%m.%Y %H:%M").to_string(),
        });
    }

    Ok(HttpResponse::Ok().json(data))
}

//! Appeal endpoints: listing, detail, registration, administrative edits,
//! history, and the two workflow transition entry points.

use crate::create_appeal::{self, NewAppeal};
use crate::db::get_db_pool;
use crate::middleware::ClientCtx;
use crate::notifier::Notifier;
use crate::orm::appeals::{AppealStatus, Gender};
use crate::orm::{
    appeal_history, appeal_views, appeals, mahallas, organizations, sectors, users,
};
use crate::storage::StorageBackend;
use crate::workflow::{self, AuthorityDecision, OrganizationAnswer};
use actix_web::{error, get, patch, post, web, Error, HttpResponse};
use chrono::{NaiveDateTime, Utc};
use sea_orm::{
    entity::*, query::*, ActiveValue::Set, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(list_appeals)
        .service(create_appeal_endpoint)
        .service(view_appeal_history)
        .service(post_answer)
        .service(post_decision)
        .service(view_appeal)
        .service(update_appeal);
}

#[derive(Deserialize)]
struct AppealsQuery {
    page: Option<u64>,
    limit: Option<u64>,
    organization_id: Option<i32>,
    from_date: Option<String>,
    to_date: Option<String>,
    status: Option<String>,
    /// Appeal id or citizen name fragment
    search: Option<String>,
}

#[derive(Serialize)]
struct AppealListItem {
    id: i32,
    full_name: String,
    phone: Option<String>,
    text: Option<String>,
    status: AppealStatus,
    deadline: Option<NaiveDateTime>,
    created_at: String,
    intake_appeal_id: Option<i32>,
}

#[derive(Serialize)]
struct Pagination {
    page: u64,
    limit: u64,
    total: u64,
}

#[derive(Serialize)]
struct AppealListResponse {
    data: Vec<AppealListItem>,
    pagination: Pagination,
}

/// Statuses a filter value names. `done` is an umbrella over both terminal
/// variants.
fn status_filter(value: &str) -> Result<Vec<AppealStatus>, Error> {
    if value == "done" {
        return Ok(vec![AppealStatus::SuccessDone, AppealStatus::TextDone]);
    }

    value
        .parse::<AppealStatus>()
        .map(|status| vec![status])
        .map_err(|_| error::ErrorBadRequest(format!("Unknown appeal status: {}", value)))
}

/// List appeals. Organization staff only see their own organization's
/// appeals; the authority sees everything.
#[get("/appeals")]
async fn list_appeals(
    client: ClientCtx,
    query: web::Query<AppealsQuery>,
) -> Result<HttpResponse, Error> {
    let actor = client.require_actor()?;
    let db = get_db_pool();

    let mut finder = appeals::Entity::find();

    if !actor.is_authority() {
        finder = finder.filter(appeals::Column::OrganizationId.eq(actor.organization_id));
    }

    if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
        finder = match search.parse::<i32>() {
            Ok(id) => finder.filter(appeals::Column::Id.eq(id)),
            Err(_) => finder.filter(appeals::Column::FullName.contains(search)),
        };
    }

    if let Some(organization_id) = query.organization_id {
        finder = finder.filter(appeals::Column::OrganizationId.eq(organization_id));
    }

    if let Some(from) = query.from_date.as_deref() {
        finder = finder.filter(appeals::Column::CreatedAt.gte(super::parse_date_param(from)?));
    }

    if let Some(to) = query.to_date.as_deref() {
        let to = super::end_of_day(super::parse_date_param(to)?);
        finder = finder.filter(appeals::Column::CreatedAt.lte(to));
    }

    if let Some(status) = query.status.as_deref() {
        finder = finder.filter(appeals::Column::Status.is_in(status_filter(status)?));
    }

    let limit = query
        .limit
        .unwrap_or(crate::app_config::limits().per_page as u64)
        .max(1);
    let page = query.page.unwrap_or(1).max(1);

    let paginator = finder
        .order_by_desc(appeals::Column::Id)
        .paginate(db, limit);
    let total = paginator
        .num_items()
        .await
        .map_err(error::ErrorInternalServerError)?;
    let models = paginator
        .fetch_page(page - 1)
        .await
        .map_err(error::ErrorInternalServerError)?;

    let data = models
        .into_iter()
        .map(|appeal| AppealListItem {
            id: appeal.id,
            full_name: appeal.full_name,
            phone: appeal.phone,
            text: appeal.text,
            status: appeal.status,
            deadline: appeal.deadline,
            created_at: appeal.created_at.format("%d.%m.%Y %H:%M").to_string(),
            intake_appeal_id: appeal.intake_appeal_id,
        })
        .collect();

    Ok(HttpResponse::Ok().json(AppealListResponse {
        data,
        pagination: Pagination { page, limit, total },
    }))
}

#[derive(Serialize)]
struct ViewerEntry {
    user_id: i32,
    user: String,
    time: String,
}

#[derive(Serialize)]
struct AppealDetail {
    id: i32,
    full_name: String,
    gender: Gender,
    phone: Option<String>,
    doc_series: Option<String>,
    doc_number: Option<String>,
    address: Option<String>,
    birthday: Option<NaiveDateTime>,
    file_path: Option<String>,
    text: Option<String>,
    status: AppealStatus,
    deadline: Option<NaiveDateTime>,
    viewed: bool,
    mahalla_id: Option<i32>,
    mahalla: Option<String>,
    sector: Option<String>,
    organization_id: Option<i32>,
    organization: Option<String>,
    intake_appeal_id: Option<i32>,
    created_at: NaiveDateTime,
    updated_at: Option<NaiveDateTime>,
}

#[derive(Serialize)]
struct AppealDetailResponse {
    data: AppealDetail,
    viewers: Vec<ViewerEntry>,
}

/// Appeal detail. The first visit by each staff member is recorded as a
/// view.
#[get("/appeals/{id}")]
async fn view_appeal(client: ClientCtx, path: web::Path<i32>) -> Result<HttpResponse, Error> {
    let actor = client.require_actor()?;
    let db = get_db_pool();
    let appeal_id = path.into_inner();

    let appeal = appeals::Entity::find_by_id(appeal_id)
        .one(db)
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Appeal not found"))?;

    if !actor.is_authority() && !workflow::owns_appeal(actor, &appeal) {
        return Err(error::ErrorForbidden("This appeal belongs to another organization"));
    }

    let seen = appeal_views::Entity::find()
        .filter(appeal_views::Column::AppealId.eq(appeal.id))
        .filter(appeal_views::Column::UserId.eq(actor.id))
        .one(db)
        .await
        .map_err(error::ErrorInternalServerError)?;

    if seen.is_none() {
        appeal_views::ActiveModel {
            appeal_id: Set(appeal.id),
            user_id: Set(actor.id),
            viewed_at: Set(Utc::now().naive_utc()),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(error::ErrorInternalServerError)?;

        if !appeal.viewed {
            let mut active: appeals::ActiveModel = appeal.clone().into();
            active.viewed = Set(true);
            active
                .update(db)
                .await
                .map_err(error::ErrorInternalServerError)?;
        }
    }

    let views = appeal_views::Entity::find()
        .filter(appeal_views::Column::AppealId.eq(appeal.id))
        .order_by_asc(appeal_views::Column::Id)
        .all(db)
        .await
        .map_err(error::ErrorInternalServerError)?;

    let mut viewers = Vec::with_capacity(views.len());
    for view in views {
        let name = users::Entity::find_by_id(view.user_id)
            .one(db)
            .await
            .map_err(error::ErrorInternalServerError)?
            .map(|u| u.full_name)
            .unwrap_or_else(|| "Unknown".to_string());

        viewers.push(ViewerEntry {
            user_id: view.user_id,
            user: name,
            time: view.viewed_at.format("%d.%m.%Y %H:%M").to_string(),
        });
    }

    let mahalla = match appeal.mahalla_id {
        Some(id) => mahallas::Entity::find_by_id(id)
            .one(db)
            .await
            .map_err(error::ErrorInternalServerError)?,
        None => None,
    };

    let sector = match mahalla.as_ref().and_then(|m| m.sector_id) {
        Some(id) => sectors::Entity::find_by_id(id)
            .one(db)
            .await
            .map_err(error::ErrorInternalServerError)?
            .map(|s| s.name),
        None => None,
    };

    let organization = match appeal.organization_id {
        Some(id) => organizations::Entity::find_by_id(id)
            .one(db)
            .await
            .map_err(error::ErrorInternalServerError)?
            .map(|o| o.name),
        None => None,
    };

    Ok(HttpResponse::Ok().json(AppealDetailResponse {
        data: AppealDetail {
            id: appeal.id,
            full_name: appeal.full_name,
            gender: appeal.gender,
            phone: appeal.phone,
            doc_series: appeal.doc_series,
            doc_number: appeal.doc_number,
            address: appeal.address,
            birthday: appeal.birthday,
            file_path: appeal.file_path,
            text: appeal.text,
            status: appeal.status,
            deadline: appeal.deadline,
            viewed: true,
            mahalla_id: appeal.mahalla_id,
            mahalla: mahalla.map(|m| m.name),
            sector,
            organization_id: appeal.organization_id,
            organization,
            intake_appeal_id: appeal.intake_appeal_id,
            created_at: appeal.created_at,
            updated_at: appeal.updated_at,
        },
        viewers,
    }))
}

#[derive(Deserialize, Validate)]
struct CreateAppealForm {
    #[validate(length(min = 1, max = 255))]
    full_name: String,
    gender: Gender,
    #[validate(length(min = 5, max = 20))]
    phone: Option<String>,
    doc_series: Option<String>,
    doc_number: Option<String>,
    address: Option<String>,
    birthday: Option<NaiveDateTime>,
    text: Option<String>,
    file_path: Option<String>,
    mahalla_id: Option<i32>,
    organization_id: Option<i32>,
    intake_appeal_id: Option<i32>,
    deadline: Option<NaiveDateTime>,
}

/// Register a new appeal (authority staff), optionally promoting an intake
/// record.
#[post("/appeals")]
async fn create_appeal_endpoint(
    client: ClientCtx,
    form: web::Json<CreateAppealForm>,
) -> Result<HttpResponse, Error> {
    let actor = client.require_actor()?;
    form.validate().map_err(error::ErrorBadRequest)?;
    let form = form.into_inner();

    let appeal = create_appeal::create_appeal(
        get_db_pool(),
        actor,
        NewAppeal {
            full_name: form.full_name,
            gender: form.gender,
            phone: form.phone,
            doc_series: form.doc_series,
            doc_number: form.doc_number,
            address: form.address,
            birthday: form.birthday,
            text: form.text,
            file_path: form.file_path,
            mahalla_id: form.mahalla_id,
            organization_id: form.organization_id,
            intake_appeal_id: form.intake_appeal_id,
            deadline: form.deadline,
        },
    )
    .await?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "id": appeal.id,
        "status": appeal.status,
        "deadline": appeal.deadline,
    })))
}

#[derive(Deserialize)]
struct UpdateAppealForm {
    full_name: Option<String>,
    gender: Option<Gender>,
    phone: Option<String>,
    doc_series: Option<String>,
    doc_number: Option<String>,
    address: Option<String>,
    birthday: Option<NaiveDateTime>,
    text: Option<String>,
    file_path: Option<String>,
    mahalla_id: Option<i32>,
    organization_id: Option<i32>,
}

/// Administrative field edit. Deliberately has no way to touch `status`;
/// status only moves through the workflow endpoints.
#[patch("/appeals/{id}")]
async fn update_appeal(
    client: ClientCtx,
    path: web::Path<i32>,
    form: web::Json<UpdateAppealForm>,
) -> Result<HttpResponse, Error> {
    let actor = client.require_authority()?;
    let db = get_db_pool();
    let appeal_id = path.into_inner();

    let appeal = appeals::Entity::find_by_id(appeal_id)
        .one(db)
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Appeal not found"))?;

    let form = form.into_inner();
    let mut active: appeals::ActiveModel = appeal.into();

    if let Some(full_name) = form.full_name {
        active.full_name = Set(full_name);
    }
    if let Some(gender) = form.gender {
        active.gender = Set(gender);
    }
    if form.phone.is_some() {
        active.phone = Set(form.phone);
    }
    if form.doc_series.is_some() {
        active.doc_series = Set(form.doc_series);
    }
    if form.doc_number.is_some() {
        active.doc_number = Set(form.doc_number);
    }
    if form.address.is_some() {
        active.address = Set(form.address);
    }
    if form.birthday.is_some() {
        active.birthday = Set(form.birthday);
    }
    if form.text.is_some() {
        active.text = Set(form.text);
    }
    if form.file_path.is_some() {
        active.file_path = Set(form.file_path);
    }
    if form.mahalla_id.is_some() {
        active.mahalla_id = Set(form.mahalla_id);
    }
    if form.organization_id.is_some() {
        active.organization_id = Set(form.organization_id);
    }
    active.updated_at = Set(Some(Utc::now().naive_utc()));

    let appeal = active
        .update(db)
        .await
        .map_err(error::ErrorInternalServerError)?;

    crate::workflow::history::append(
        db,
        crate::workflow::history::NewHistoryEntry::annotation(
            appeal.id,
            actor.id,
            format!("Edited by {}", actor.name),
        ),
    )
    .await
    .map_err(error::ErrorInternalServerError)?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "id": appeal.id })))
}

#[derive(Serialize)]
struct HistoryEntryView {
    id: i32,
    text: Option<String>,
    status: Option<String>,
    user: String,
    user_id: i32,
    time_file: Option<String>,
    report_citizen: Option<String>,
    report_government: Option<String>,
    report_photo: Option<String>,
    created: String,
}

/// Newest-first audit history of an appeal.
#[get("/appeals/{id}/history")]
async fn view_appeal_history(
    client: ClientCtx,
    path: web::Path<i32>,
) -> Result<HttpResponse, Error> {
    let actor = client.require_actor()?;
    let db = get_db_pool();
    let appeal_id = path.into_inner();

    let appeal = appeals::Entity::find_by_id(appeal_id)
        .one(db)
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Appeal not found"))?;

    if !actor.is_authority() && !workflow::owns_appeal(actor, &appeal) {
        return Err(error::ErrorForbidden("This appeal belongs to another organization"));
    }

    let entries = appeal_history::Entity::find()
        .filter(appeal_history::Column::AppealId.eq(appeal.id))
        .order_by_desc(appeal_history::Column::Id)
        .all(db)
        .await
        .map_err(error::ErrorInternalServerError)?;

    let mut data = Vec::with_capacity(entries.len());
    for entry in entries {
        let user = users::Entity::find_by_id(entry.user_id)
            .one(db)
            .await
            .map_err(error::ErrorInternalServerError)?;

        let user_label = match user {
            Some(user) => match user.organization_id {
                Some(org_id) => {
                    let org_name = organizations::Entity::find_by_id(org_id)
                        .one(db)
                        .await
                        .map_err(error::ErrorInternalServerError)?
                        .map(|o| o.name)
                        .unwrap_or_else(|| "Unknown".to_string());
                    format!("{} - {}", org_name, user.full_name)
                }
                None => user.full_name,
            },
            None => "Unknown".to_string(),
        };

        data.push(HistoryEntryView {
            id: entry.id,
            text: entry.text,
            status: entry.status,
            user: user_label,
            user_id: entry.user_id,
            time_file: entry.time_file,
            report_citizen: entry.report_citizen,
            report_government: entry.report_government,
            report_photo: entry.report_photo,
            created: entry.created_at.format("%d.%m.%Y %H:%M").to_string(),
        });
    }

    Ok(HttpResponse::Ok().json(data))
}

#[derive(Deserialize, Validate)]
struct AnswerForm {
    /// Proposed target status
    status: AppealStatus,
    #[validate(length(max = 50000))]
    text: Option<String>,
    time_file: Option<String>,
    report_citizen: Option<String>,
    report_government: Option<String>,
    report_photo: Option<String>,
}

/// Organization-side workflow transition with its answer record.
#[post("/appeals/{id}/answer")]
async fn post_answer(
    client: ClientCtx,
    path: web::Path<i32>,
    form: web::Json<AnswerForm>,
) -> Result<HttpResponse, Error> {
    let actor = client.require_actor()?;
    form.validate().map_err(error::ErrorBadRequest)?;
    let form = form.into_inner();

    let answer = workflow::organization_transition(
        get_db_pool(),
        actor,
        path.into_inner(),
        OrganizationAnswer {
            target: form.status,
            text: form.text,
            time_file: form.time_file,
            report_citizen: form.report_citizen,
            report_government: form.report_government,
            report_photo: form.report_photo,
        },
    )
    .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "id": answer.id,
        "appeal_id": answer.appeal_id,
        "created_at": answer.created_at,
    })))
}

#[derive(Deserialize, Validate)]
struct DecisionForm {
    /// Proposed target status
    status: AppealStatus,
    #[validate(length(max = 50000))]
    text: Option<String>,
    /// New deadline; required when granting an extension
    new_deadline: Option<NaiveDateTime>,
}

/// Authority-side workflow transition with its comment record.
#[post("/appeals/{id}/decision")]
async fn post_decision(
    client: ClientCtx,
    path: web::Path<i32>,
    form: web::Json<DecisionForm>,
    notifier: web::Data<dyn Notifier>,
    storage: web::Data<dyn StorageBackend>,
) -> Result<HttpResponse, Error> {
    let actor = client.require_actor()?;
    form.validate().map_err(error::ErrorBadRequest)?;
    let form = form.into_inner();

    let comment = workflow::authority_transition(
        get_db_pool(),
        notifier.get_ref(),
        storage.get_ref(),
        actor,
        path.into_inner(),
        AuthorityDecision {
            target: form.status,
            text: form.text,
            new_deadline: form.new_deadline,
        },
    )
    .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "id": comment.id,
        "appeal_id": comment.appeal_id,
        "created_at": comment.created_at,
    })))
}

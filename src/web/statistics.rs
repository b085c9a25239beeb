//! Dashboard statistics: status buckets, created-at windows, and the most
//! loaded organizations.

use crate::db::get_db_pool;
use crate::middleware::ClientCtx;
use crate::orm::appeals::AppealStatus;
use crate::orm::{appeals, intake_appeals, organizations};
use crate::user::Actor;
use actix_web::{error, get, Error, HttpResponse};
use chrono::{Datelike, Duration, NaiveDate, Utc};
use sea_orm::{
    entity::*, query::*, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Select,
};
use serde::Serialize;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_statistics).service(view_organization_load);
}

/// Appeals visible to this actor: everything for the authority, their own
/// organization's otherwise.
fn scoped_appeals(actor: &Actor) -> Select<appeals::Entity> {
    let finder = appeals::Entity::find();
    if actor.is_authority() {
        finder
    } else {
        finder.filter(appeals::Column::OrganizationId.eq(actor.organization_id))
    }
}

async fn count_between(
    actor: &Actor,
    from: NaiveDate,
    to_exclusive: NaiveDate,
) -> Result<u64, sea_orm::DbErr> {
    let db = get_db_pool();
    scoped_appeals(actor)
        .filter(appeals::Column::CreatedAt.gte(from.and_hms_opt(0, 0, 0).unwrap()))
        .filter(appeals::Column::CreatedAt.lt(to_exclusive.and_hms_opt(0, 0, 0).unwrap()))
        .count(db)
        .await
}

#[derive(Serialize)]
struct StatisticsResponse {
    all_appeals: u64,
    done_appeals: u64,
    waiting_appeals: u64,
    rejected_appeals: u64,
    time_requests: u64,
    archive_appeals: u64,
    confirm_appeals: u64,
    today_appeals: u64,
    yesterday_appeals: u64,
    month_appeals: u64,
    year_appeals: u64,
    /// Only reported to authority staff
    #[serde(skip_serializing_if = "Option::is_none")]
    intake_appeals: Option<u64>,
}

#[get("/statistics")]
async fn view_statistics(client: ClientCtx) -> Result<HttpResponse, Error> {
    let actor = client.require_actor()?;
    let db = get_db_pool();

    let count_status = |statuses: Vec<AppealStatus>| {
        scoped_appeals(actor)
            .filter(appeals::Column::Status.is_in(statuses))
            .count(db)
    };

    let all_appeals = scoped_appeals(actor)
        .count(db)
        .await
        .map_err(error::ErrorInternalServerError)?;
    let done_appeals = count_status(vec![AppealStatus::SuccessDone, AppealStatus::TextDone])
        .await
        .map_err(error::ErrorInternalServerError)?;
    let waiting_appeals = count_status(vec![AppealStatus::Waiting])
        .await
        .map_err(error::ErrorInternalServerError)?;
    let rejected_appeals = count_status(vec![AppealStatus::Rejected])
        .await
        .map_err(error::ErrorInternalServerError)?;
    let time_requests = count_status(vec![AppealStatus::TimeRequest])
        .await
        .map_err(error::ErrorInternalServerError)?;
    let archive_appeals = count_status(vec![AppealStatus::Archive])
        .await
        .map_err(error::ErrorInternalServerError)?;
    let confirm_appeals = count_status(vec![AppealStatus::Confirm, AppealStatus::Confirm50])
        .await
        .map_err(error::ErrorInternalServerError)?;

    let today = Utc::now().date_naive();
    let tomorrow = today + Duration::days(1);
    let yesterday = today - Duration::days(1);
    let month_start = today.with_day(1).unwrap_or(today);
    let year_start = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);

    let today_appeals = count_between(actor, today, tomorrow)
        .await
        .map_err(error::ErrorInternalServerError)?;
    let yesterday_appeals = count_between(actor, yesterday, today)
        .await
        .map_err(error::ErrorInternalServerError)?;
    let month_appeals = count_between(actor, month_start, tomorrow)
        .await
        .map_err(error::ErrorInternalServerError)?;
    let year_appeals = count_between(actor, year_start, tomorrow)
        .await
        .map_err(error::ErrorInternalServerError)?;

    let intake_appeals = if actor.is_authority() {
        Some(
            intake_appeals::Entity::find()
                .count(db)
                .await
                .map_err(error::ErrorInternalServerError)?,
        )
    } else {
        None
    };

    Ok(HttpResponse::Ok().json(StatisticsResponse {
        all_appeals,
        done_appeals,
        waiting_appeals,
        rejected_appeals,
        time_requests,
        archive_appeals,
        confirm_appeals,
        today_appeals,
        yesterday_appeals,
        month_appeals,
        year_appeals,
        intake_appeals,
    }))
}

#[derive(Serialize)]
struct OrganizationLoad {
    organization_id: i32,
    organization_name: String,
    total_appeals: u64,
}

/// Top five organizations by appeal count.
#[get("/statistics/organizations")]
async fn view_organization_load(client: ClientCtx) -> Result<HttpResponse, Error> {
    client.require_authority()?;
    let db = get_db_pool();

    let all_organizations = organizations::Entity::find()
        .all(db)
        .await
        .map_err(error::ErrorInternalServerError)?;

    let mut load = Vec::with_capacity(all_organizations.len());
    for organization in all_organizations {
        let total = appeals::Entity::find()
            .filter(appeals::Column::OrganizationId.eq(organization.id))
            .count(db)
            .await
            .map_err(error::ErrorInternalServerError)?;

        if total > 0 {
            load.push(OrganizationLoad {
                organization_id: organization.id,
                organization_name: organization.name,
                total_appeals: total,
            });
        }
    }

    load.sort_by(|a, b| b.total_appeals.cmp(&a.total_appeals));
    load.truncate(5);

    Ok(HttpResponse::Ok().json(load))
}

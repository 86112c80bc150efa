use crate::AppState;
use crate::api::attendance::{HistoryQuery, WeeklyQuery};
use crate::auth::auth::AuthUser;
use crate::error::ServiceError;
use crate::model::attendance::AttendanceRecord;
use crate::model::user::UserResponse;
use crate::service::admin::{AssignSchedule, EditPunch};
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use utoipa::IntoParams;

#[derive(Deserialize, IntoParams)]
pub struct ReportDateQuery {
    /// Defaults to today's UTC date.
    #[param(example = "2024-01-15")]
    pub date: Option<NaiveDate>,
}

/// Any employee's punch history
#[utoipa::path(
    get,
    path = "/admin/punches/{uid}",
    params(("uid", description = "Employee uid"), HistoryQuery),
    responses(
        (status = 200, description = "Records, newest first", body = [AttendanceRecord]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn employee_punches(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse, ServiceError> {
    auth.require_admin()?;

    let records = state
        .reports
        .employee_punches(&path.into_inner(), query.start_date, query.end_date)
        .await?;
    Ok(HttpResponse::Ok().json(records))
}

/// Correct a punch pair
#[utoipa::path(
    put,
    path = "/admin/punches/{punchId}",
    params(("punchId", description = "Attendance record id")),
    request_body = EditPunch,
    responses(
        (status = 200, description = "Updated record", body = AttendanceRecord),
        (status = 400, description = "Neither side supplied"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Record not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn edit_punch(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<EditPunch>,
) -> Result<HttpResponse, ServiceError> {
    auth.require_admin()?;

    let record = state
        .admin
        .edit_punch(&path.into_inner(), body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(record))
}

/// Remove a punch record entirely
#[utoipa::path(
    delete,
    path = "/admin/punches/{punchId}",
    params(("punchId", description = "Attendance record id")),
    responses(
        (status = 200, description = "Deleted", body = Object, example = json!({
            "id": "a1b2", "deleted": true
        })),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Record not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_punch(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    auth.require_admin()?;

    let punch_id = path.into_inner();
    state.admin.delete_punch(&punch_id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "id": punch_id,
        "deleted": true,
    })))
}

/// Assign a work schedule and/or timezone
#[utoipa::path(
    put,
    path = "/admin/schedule/{uid}",
    params(("uid", description = "Employee uid")),
    request_body = AssignSchedule,
    responses(
        (status = 200, description = "Updated user", body = UserResponse),
        (status = 400, description = "Nothing to change or malformed schedule"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn assign_schedule(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<AssignSchedule>,
) -> Result<HttpResponse, ServiceError> {
    auth.require_admin()?;

    let user = state
        .admin
        .assign_schedule(&path.into_inner(), body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

/// All-employee report for one work date
#[utoipa::path(
    get,
    path = "/admin/reports/daily",
    params(ReportDateQuery),
    responses(
        (status = 200, description = "Per-employee daily rollups"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn daily_reports(
    auth: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<ReportDateQuery>,
) -> Result<HttpResponse, ServiceError> {
    auth.require_admin()?;

    let date = query.date.unwrap_or_else(|| state.clock.now().date_naive());
    let data = state.reports.all_daily_reports(date).await?;
    Ok(HttpResponse::Ok().json(json!({
        "date": date,
        "count": data.len(),
        "data": data,
    })))
}

/// All-employee weekly report
#[utoipa::path(
    get,
    path = "/admin/reports/weekly",
    params(WeeklyQuery),
    responses(
        (status = 200, description = "Per-employee weekly rollups"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn weekly_reports(
    auth: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<WeeklyQuery>,
) -> Result<HttpResponse, ServiceError> {
    auth.require_admin()?;

    let (start, end) = query.resolve(state.clock.now().date_naive());
    let data = state.reports.all_weekly_reports(start, end).await?;
    Ok(HttpResponse::Ok().json(json!({
        "startDate": start,
        "endDate": end,
        "count": data.len(),
        "data": data,
    })))
}

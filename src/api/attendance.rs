use crate::AppState;
use crate::auth::auth::AuthUser;
use crate::error::ServiceError;
use crate::model::summary::DailySummary;
use crate::service::punch::{PunchOutResult, PunchStatus};
use crate::service::reports::{WeeklySummary, default_week};
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use utoipa::IntoParams;

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    #[param(example = "2024-01-15")]
    pub start_date: NaiveDate,
    #[param(example = "2024-01-21")]
    pub end_date: NaiveDate,
}

#[derive(Deserialize, IntoParams)]
pub struct DailyQuery {
    /// Defaults to today's UTC date.
    #[param(example = "2024-01-15")]
    pub date: Option<NaiveDate>,
}

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl WeeklyQuery {
    /// Explicit range, or the Monday-Sunday week enclosing today (UTC).
    pub fn resolve(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        match self.start_date {
            Some(start) => {
                let end = self.end_date.unwrap_or(start + chrono::Duration::days(6));
                (start, end)
            }
            None => default_week(today),
        }
    }
}

/// Current punch state
#[utoipa::path(
    get,
    path = "/attendance/status",
    responses(
        (status = 200, description = "Punch state and today's rollup", body = PunchStatus),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn status(
    auth: AuthUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ServiceError> {
    let status = state.punch.status(&auth.uid).await?;
    Ok(HttpResponse::Ok().json(status))
}

/// Open a punch
#[utoipa::path(
    post,
    path = "/attendance/punch-in",
    responses(
        (status = 201, description = "Punch opened", body = Object, example = json!({
            "id": "a1b2", "punchIn": "2024-01-15T01:00:00Z"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "An open punch already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn punch_in(
    auth: AuthUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ServiceError> {
    let record = state.punch.punch_in(&auth.uid).await?;
    Ok(HttpResponse::Created().json(json!({
        "id": record.id,
        "punchIn": record.punch_in,
    })))
}

/// Close the open punch
#[utoipa::path(
    post,
    path = "/attendance/punch-out",
    responses(
        (status = 200, description = "Punch closed with metrics", body = PunchOutResult),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No open punch")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn punch_out(
    auth: AuthUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ServiceError> {
    let result = state.punch.punch_out(&auth.uid).await?;
    Ok(HttpResponse::Ok().json(result))
}

/// Cancel an open punch
#[utoipa::path(
    delete,
    path = "/attendance/cancel-punch/{attendanceId}",
    params(("attendanceId", description = "Attendance record id")),
    responses(
        (status = 200, description = "Punch voided", body = Object, example = json!({
            "id": "a1b2", "voided": true
        })),
        (status = 403, description = "Not the caller's punch"),
        (status = 404, description = "Record not found"),
        (status = 409, description = "Already completed")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn cancel_punch(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let attendance_id = path.into_inner();
    state.punch.cancel_open_punch(&auth.uid, &attendance_id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "id": attendance_id,
        "voided": true,
    })))
}

/// Punch history over a date range
#[utoipa::path(
    get,
    path = "/attendance/history",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Records, newest first"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn history(
    auth: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse, ServiceError> {
    let records = state
        .reports
        .employee_punches(&auth.uid, query.start_date, query.end_date)
        .await?;
    Ok(HttpResponse::Ok().json(records))
}

/// Daily rollup
#[utoipa::path(
    get,
    path = "/attendance/summary/daily",
    params(DailyQuery),
    responses(
        (status = 200, description = "Daily summary", body = DailySummary),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No summary for that date")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn daily_summary(
    auth: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<DailyQuery>,
) -> Result<HttpResponse, ServiceError> {
    let date = query.date.unwrap_or_else(|| state.clock.now().date_naive());
    let summary = state
        .reports
        .daily_summary(&auth.uid, date)
        .await?
        .ok_or_else(|| ServiceError::NotFound("No summary for this date".into()))?;
    Ok(HttpResponse::Ok().json(summary))
}

/// Weekly rollup
#[utoipa::path(
    get,
    path = "/attendance/summary/weekly",
    params(WeeklyQuery),
    responses(
        (status = 200, description = "Totals plus days", body = WeeklySummary),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn weekly_summary(
    auth: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<WeeklyQuery>,
) -> Result<HttpResponse, ServiceError> {
    let (start, end) = query.resolve(state.clock.now().date_naive());
    let week = state.reports.weekly_summary(&auth.uid, start, end).await?;
    Ok(HttpResponse::Ok().json(week))
}

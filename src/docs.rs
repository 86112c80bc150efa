use crate::model::attendance::{AttendanceRecord, Metrics};
use crate::model::summary::{DailySummary, PunchEntry, SummaryTotals};
use crate::model::user::{Schedule, UserResponse};
use crate::models::{LoginReqDto, RegisterReq};
use crate::service::admin::{AssignSchedule, EditPunch};
use crate::service::punch::{PunchOutResult, PunchStatus};
use crate::service::reports::{
    DailyReportRow, DailySummaryFields, EmployeeInfo, WeeklyReportRow, WeeklySummary,
};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Punchclock API",
        version = "1.0.0",
        description = r#"
## Employee punch-clock service

Tracks work attendance for a single organization. Employees punch in and
out; every completed pair is scored into payroll-grade labor metrics and
rolled into daily and weekly summaries.

### Key Features
- **Punch lifecycle**: punch-in / punch-out / cancel, one open punch per employee
- **Labor metrics**: regular, overtime and night-differential hours plus
  tardiness and undertime, computed per punch pair
- **Rollups**: per-day summaries with weekly aggregation
- **Admin tools**: punch corrections, schedule assignment, organization-wide reports

### Security
Endpoints under `/attendance` and `/admin` require a **JWT Bearer token**
from `/auth/login`; the `/admin` scope additionally requires the Admin role.
"#,
    ),
    paths(
        crate::auth::handlers::register,
        crate::auth::handlers::login,
        crate::auth::handlers::me,

        crate::api::attendance::status,
        crate::api::attendance::punch_in,
        crate::api::attendance::punch_out,
        crate::api::attendance::cancel_punch,
        crate::api::attendance::history,
        crate::api::attendance::daily_summary,
        crate::api::attendance::weekly_summary,

        crate::api::admin::employee_punches,
        crate::api::admin::edit_punch,
        crate::api::admin::delete_punch,
        crate::api::admin::assign_schedule,
        crate::api::admin::daily_reports,
        crate::api::admin::weekly_reports,
    ),
    components(
        schemas(
            RegisterReq,
            LoginReqDto,
            UserResponse,
            Schedule,
            AttendanceRecord,
            Metrics,
            DailySummary,
            PunchEntry,
            SummaryTotals,
            PunchStatus,
            PunchOutResult,
            EditPunch,
            AssignSchedule,
            WeeklySummary,
            EmployeeInfo,
            DailySummaryFields,
            DailyReportRow,
            WeeklyReportRow,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration and login"),
        (name = "Attendance", description = "Employee punch APIs"),
        (name = "Admin", description = "Punch corrections and reports"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

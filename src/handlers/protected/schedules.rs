// handlers/protected/schedules.rs - /api/schedules CRUD
//
// A schedule carries exactly one cadence: a cron expression or an hour
// interval. `next_run` is recomputed on every write.

use axum::extract::State;
use chrono::Utc;
use serde::Deserialize;

use crate::database::models::{NewSchedule, Schedule, ScheduleChanges};
use crate::error::ApiError;
use crate::handlers::extract::{JsonBody, PathParam, QueryParams};
use crate::handlers::protected::settings::effective_retention_days;
use crate::handlers::validate;
use crate::middleware::{ApiResponse, ApiResult};
use crate::scheduling::{derive_next_run, Cadence, CronExpr};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ScheduleListParams {
    pub device_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSchedule {
    pub device_id: i32,
    pub name: String,
    pub cron_expression: Option<String>,
    pub interval_hours: Option<i32>,
    pub retention_days: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateSchedule {
    pub name: Option<String>,
    pub cron_expression: Option<String>,
    pub interval_hours: Option<i32>,
    pub retention_days: Option<i32>,
    pub is_enabled: Option<bool>,
}

const CRON_MAX: usize = 100;

fn not_found() -> ApiError {
    ApiError::not_found("Schedule not found")
}

/// Blank cron strings count as absent.
fn cron_field(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Validate the pair and return the normalized columns with their cadence.
fn resolve_cadence(
    cron_expression: Option<String>,
    interval_hours: Option<i32>,
) -> Result<(Option<String>, Option<i32>, Cadence), ApiError> {
    match (cron_expression, interval_hours) {
        (None, None) => Err(ApiError::validation_error(
            "Either cron_expression or interval_hours must be provided",
            None,
        )),
        (Some(_), Some(_)) => Err(ApiError::validation_error(
            "Only one of cron_expression or interval_hours should be provided",
            None,
        )),
        (Some(expr), None) => {
            let parsed = CronExpr::parse(&expr)?;
            let normalized = parsed.to_string();
            validate::length("cron_expression", &normalized, 1, CRON_MAX)?;
            Ok((Some(normalized), None, Cadence::Cron(parsed)))
        }
        (None, Some(hours)) => {
            validate::range("interval_hours", hours, 1, 720)?;
            Ok((None, Some(hours), Cadence::Interval { hours }))
        }
    }
}

pub async fn schedule_list(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<ScheduleListParams>,
) -> ApiResult<Vec<Schedule>> {
    Ok(ApiResponse::success(state.store.list_schedules(params.device_id).await?))
}

pub async fn schedule_create(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<CreateSchedule>,
) -> ApiResult<Schedule> {
    validate::length("name", &body.name, 1, 100)?;
    let (cron_expression, interval_hours, cadence) =
        resolve_cadence(cron_field(body.cron_expression), body.interval_hours)?;
    let retention_days = match body.retention_days {
        Some(days) => {
            validate::range("retention_days", days, 1, 365)?;
            days
        }
        None => effective_retention_days(&state).await?,
    };

    if state.store.get_device(body.device_id).await?.is_none() {
        return Err(ApiError::not_found("Device not found"));
    }

    let schedule = state
        .store
        .create_schedule(NewSchedule {
            device_id: body.device_id,
            name: body.name,
            cron_expression,
            interval_hours,
            retention_days,
            next_run: derive_next_run(true, Some(&cadence), None, Utc::now()),
        })
        .await?;

    tracing::info!("Schedule {} '{}' created for device {}", schedule.id, schedule.name, schedule.device_id);
    Ok(ApiResponse::created(schedule))
}

pub async fn schedule_get(State(state): State<AppState>, PathParam(id): PathParam<i32>) -> ApiResult<Schedule> {
    let schedule = state.store.get_schedule(id).await?.ok_or_else(not_found)?;
    Ok(ApiResponse::success(schedule))
}

pub async fn schedule_update(
    State(state): State<AppState>,
    PathParam(id): PathParam<i32>,
    JsonBody(body): JsonBody<UpdateSchedule>,
) -> ApiResult<Schedule> {
    if let Some(name) = &body.name {
        validate::length("name", name, 1, 100)?;
    }
    if let Some(days) = body.retention_days {
        validate::range("retention_days", days, 1, 365)?;
    }

    let current = state.store.get_schedule(id).await?.ok_or_else(not_found)?;

    // Supplying one cadence replaces the other.
    let requested_cron = cron_field(body.cron_expression);
    let (cron, interval) = match (requested_cron, body.interval_hours) {
        (None, None) => (current.cron_expression.clone(), current.interval_hours),
        (cron, interval) => (cron, interval),
    };
    let (cron_expression, interval_hours, cadence) = resolve_cadence(cron, interval)?;

    let is_enabled = body.is_enabled.unwrap_or(current.is_enabled);
    let changes = ScheduleChanges {
        name: body.name.unwrap_or(current.name),
        cron_expression,
        interval_hours,
        retention_days: body.retention_days.unwrap_or(current.retention_days),
        is_enabled,
        next_run: derive_next_run(is_enabled, Some(&cadence), current.last_run, Utc::now()),
    };

    let schedule = state.store.update_schedule(id, changes).await?.ok_or_else(not_found)?;
    Ok(ApiResponse::success(schedule))
}

pub async fn schedule_delete(State(state): State<AppState>, PathParam(id): PathParam<i32>) -> ApiResult<()> {
    if !state.store.delete_schedule(id).await? {
        return Err(not_found());
    }
    tracing::info!("Schedule {} deleted", id);
    Ok(ApiResponse::no_content())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cadence_requires_exactly_one() {
        assert!(resolve_cadence(None, None).is_err());
        assert!(resolve_cadence(Some("0 3 * * *".into()), Some(6)).is_err());
        assert!(resolve_cadence(None, Some(0)).is_err());
        assert!(resolve_cadence(None, Some(721)).is_err());
        assert!(resolve_cadence(Some("61 * * * *".into()), None).is_err());
    }

    #[test]
    fn cron_is_normalized() {
        let (cron, interval, _) = resolve_cadence(Some("0  3 * *  *".into()), None).unwrap();
        assert_eq!(cron.as_deref(), Some("0 3 * * *"));
        assert_eq!(interval, None);
    }

    #[test]
    fn overlong_cron_is_rejected() {
        let minutes: Vec<String> = (0..60).map(|m| m.to_string()).collect();
        let expr = format!("{} * * * *", minutes.join(","));
        assert!(CronExpr::parse(&expr).is_ok());
        assert!(resolve_cadence(Some(expr), None).is_err());
    }

    #[test]
    fn blank_cron_counts_as_missing() {
        assert_eq!(cron_field(Some("   ".into())), None);
        assert_eq!(cron_field(Some(" */5 * * * * ".into())).as_deref(), Some("*/5 * * * *"));
    }
}

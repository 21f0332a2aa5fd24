//! Tally endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::{ApiResult, ValidatedJson};
use crate::db::HISTORY_LIMIT;
use crate::errors::AppError;
use crate::models::{MemberStats, SaveTallyRequest, TallyMode, TallyRecord, TallyResponse};
use crate::AppState;

/// POST /api/zikr/save - Record a completed counting session.
pub async fn save_tally(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<SaveTallyRequest>,
) -> ApiResult<(StatusCode, Json<TallyResponse>)> {
    if request.mode == TallyMode::Fixed && request.target < 1 {
        return Err(AppError::Validation(
            "Fixed mode requires a positive target".to_string(),
        ));
    }

    let record = match state.repo.record_tally(&request).await {
        Ok(record) => record,
        Err(e) => {
            tracing::warn!(
                group_id = %request.group_id,
                user_id = %request.user_id,
                "Tally rejected: {}",
                e
            );
            return Err(e);
        }
    };

    tracing::info!(
        group_id = %record.group_id,
        user_id = %record.user_id,
        count = record.count,
        "Tally recorded"
    );

    Ok((
        StatusCode::CREATED,
        Json(TallyResponse {
            message: "Tally saved".to_string(),
            zikr: record,
        }),
    ))
}

/// GET /api/zikr/history/:groupId - Latest records, newest first.
pub async fn group_history(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
) -> ApiResult<Json<Vec<TallyRecord>>> {
    let records = state.repo.group_history(&group_id, HISTORY_LIMIT).await?;
    Ok(Json(records))
}

/// GET /api/zikr/stats/:groupId - Per-user totals, highest first.
pub async fn group_stats(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
) -> ApiResult<Json<Vec<MemberStats>>> {
    let stats = state.repo.group_stats(&group_id).await?;
    Ok(Json(stats))
}

/// GET /api/zikr/record/:recordId - One record by id.
pub async fn get_tally(
    State(state): State<AppState>,
    Path(record_id): Path<String>,
) -> ApiResult<Json<TallyRecord>> {
    match state.repo.get_tally(&record_id).await? {
        Some(record) => Ok(Json(record)),
        None => Err(AppError::NotFound("Tally record not found".to_string())),
    }
}

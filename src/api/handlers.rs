use crate::db::{export, LedgerStore};
use crate::error::ReconcileError;
use crate::models::{DateRange, Match, MatchSummary};
use crate::service::normalize::decimal_from_f64;
use crate::service::{AutoReconcileRequest, ReconcileService};
use axum::{
    extract::{Json, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 通用响应体
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl IntoResponse for ReconcileError {
    fn into_response(self) -> Response {
        let status = match &self {
            ReconcileError::NotFound(_) => StatusCode::NOT_FOUND,
            ReconcileError::Validation(_) => StatusCode::BAD_REQUEST,
            ReconcileError::Store(_) | ReconcileError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let response = MessageResponse {
            success: false,
            message: format!("Error: {}", self),
        };
        (status, Json(response)).into_response()
    }
}

/// 请求体: 自动对账
#[derive(Debug, Deserialize)]
pub struct AutoReconcileBody {
    pub bank_account_id: Option<i64>,
    pub date_range: Option<DateRange>,
    pub tolerance_days: Option<i64>,
    pub amount_tolerance: Option<f64>,
}

/// 自动对账响应 (含统计信息)
#[derive(Debug, Serialize)]
pub struct AutoReconcileResponse {
    pub success: bool,
    pub message: String,
    pub summary: MatchSummary,
    pub matches: Vec<Match>,
}

#[derive(Debug, Deserialize)]
pub struct ManualMatchBody {
    pub transaction_id: i64,
    pub entry_id: i64,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PreviewBody {
    pub transaction_id: i64,
    pub entry_id: i64,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub transaction_id: i64,
    pub entry_id: i64,
    pub score: i32,
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

/// 自动对账接口
pub async fn auto_reconcile<S: LedgerStore + 'static>(
    State(service): State<Arc<ReconcileService<S>>>,
    Json(body): Json<AutoReconcileBody>,
) -> Result<Response, ReconcileError> {
    let amount_tolerance = match body.amount_tolerance {
        Some(value) => Some(decimal_from_f64(value).ok_or_else(|| {
            ReconcileError::Validation(format!("invalid amount_tolerance: {}", value))
        })?),
        None => None,
    };

    let request = AutoReconcileRequest {
        bank_account_id: body.bank_account_id,
        date_range: body.date_range,
        tolerance_days: body.tolerance_days,
        amount_tolerance,
    };

    let matches = service.auto_reconcile(request).await?;
    let summary = MatchSummary::from_matches(&matches);
    let response = AutoReconcileResponse {
        success: true,
        message: format!("Successfully created {} matches", summary.total),
        summary,
        matches,
    };
    Ok((StatusCode::OK, Json(response)).into_response())
}

/// 人工匹配接口
pub async fn create_manual_match<S: LedgerStore + 'static>(
    State(service): State<Arc<ReconcileService<S>>>,
    Json(body): Json<ManualMatchBody>,
) -> Result<Response, ReconcileError> {
    let created = service
        .create_manual_match(body.transaction_id, body.entry_id, body.notes)
        .await?;
    Ok((StatusCode::CREATED, Json(created)).into_response())
}

/// 撤销匹配接口
pub async fn undo_match<S: LedgerStore + 'static>(
    State(service): State<Arc<ReconcileService<S>>>,
    Path(match_id): Path<i64>,
) -> Result<Response, ReconcileError> {
    service.undo_match(match_id).await?;
    let response = MessageResponse {
        success: true,
        message: format!("Match {} removed", match_id),
    };
    Ok((StatusCode::OK, Json(response)).into_response())
}

/// 评分预览接口
pub async fn preview_score<S: LedgerStore + 'static>(
    State(service): State<Arc<ReconcileService<S>>>,
    Json(body): Json<PreviewBody>,
) -> Result<Json<PreviewResponse>, ReconcileError> {
    let score = service.preview_score(body.transaction_id, body.entry_id).await?;
    Ok(Json(PreviewResponse {
        transaction_id: body.transaction_id,
        entry_id: body.entry_id,
        score,
    }))
}

/// 账户匹配列表
pub async fn list_matches<S: LedgerStore + 'static>(
    State(service): State<Arc<ReconcileService<S>>>,
    Path(bank_account_id): Path<i64>,
) -> Result<Json<Vec<Match>>, ReconcileError> {
    Ok(Json(service.list_matches(bank_account_id).await?))
}

/// 账户匹配导出 (CSV)
pub async fn export_matches<S: LedgerStore + 'static>(
    State(service): State<Arc<ReconcileService<S>>>,
    Path(bank_account_id): Path<i64>,
) -> Result<Response, ReconcileError> {
    let matches = service.list_matches(bank_account_id).await?;
    match export::to_csv_bytes(&matches) {
        Ok(body) => Ok((
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
            body,
        )
            .into_response()),
        Err(e) => {
            tracing::error!("导出账户 {} 匹配失败: {}", bank_account_id, e);
            let response = MessageResponse {
                success: false,
                message: format!("Error: {}", e),
            };
            Ok((StatusCode::INTERNAL_SERVER_ERROR, Json(response)).into_response())
        }
    }
}

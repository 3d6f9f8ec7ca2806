use crate::config::SharedConfig;
use crate::data_structures::{
    AnalyzeRequest, ChartQuery, FetchRequest, HealthResponse, IndicatorInfo, SharedDashboard, SharedSession,
};
use axum::{
    extract::{Json, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use axum_extra::extract::Query;
use chartanalyst::{
    api::{ChartView, FetchSummary},
    ask_ai::AnalysisResponse,
    error::AnalystError,
    indicators::{IndicatorKind, parse_selection},
    models::DateRange,
    session::Session,
};
use serde_json::json;
use tracing::{debug, error, info, instrument, warn};

/// HTTP face of [`AnalystError`].
#[derive(Debug)]
pub struct ApiError(pub AnalystError);

impl From<AnalystError> for ApiError {
    fn from(err: AnalystError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            AnalystError::NoData { .. } => StatusCode::NOT_FOUND,
            AnalystError::InsufficientData { .. } | AnalystError::UndefinedValue { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AnalystError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AnalystError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AnalystError::ModelUnavailable(_) | AnalystError::MarketData(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(kind = self.0.kind(), error = %self.0, "Action failed");
        } else {
            warn!(kind = self.0.kind(), error = %self.0, "Action rejected");
        }

        let body = json!({
            "error": self.0.kind(),
            "message": self.0.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

/// Resolve the requested indicators; with none requested the session's
/// current selection is used. The session is not touched here.
fn resolve_selection(session: &Session, requested: &[String]) -> Result<Vec<IndicatorKind>, ApiError> {
    if requested.is_empty() {
        return Ok(session.selection().to_vec());
    }
    Ok(parse_selection(&requested.join(","))?)
}

#[instrument(skip(config, session, dashboard))]
pub async fn health_handler(
    State(config): State<SharedConfig>,
    State(session): State<SharedSession>,
    State(dashboard): State<SharedDashboard>,
) -> impl IntoResponse {
    let loaded_symbol = session.lock().await.series().map(|s| s.symbol().to_string());

    Json(HealthResponse {
        status: "ok",
        node: config.node_name.clone(),
        environment: config.environment.clone(),
        data_source: dashboard.source_name().to_string(),
        model: dashboard.model_name().to_string(),
        loaded_symbol,
    })
}

#[instrument(skip(session))]
pub async fn list_indicators_handler(State(session): State<SharedSession>) -> impl IntoResponse {
    let session = session.lock().await;
    let indicators: Vec<IndicatorInfo> = IndicatorKind::ALL
        .iter()
        .map(|&kind| IndicatorInfo::describe(kind, session.selection()))
        .collect();

    debug!(count = indicators.len(), "Returning indicator catalogue");
    Json(indicators)
}

#[instrument(skip(session, dashboard), fields(symbol = %payload.symbol))]
pub async fn fetch_handler(
    State(session): State<SharedSession>,
    State(dashboard): State<SharedDashboard>,
    Json(payload): Json<FetchRequest>,
) -> Result<Json<FetchSummary>, ApiError> {
    let defaults = DateRange::default();
    let range = DateRange::new(
        payload.start.unwrap_or(defaults.start),
        payload.end.unwrap_or(defaults.end),
    )?;

    let mut session = session.lock().await;
    let summary = dashboard.fetch(&mut session, &payload.symbol, range).await?;

    info!(
        symbol = %summary.symbol,
        observations = summary.observations,
        "Series loaded"
    );
    Ok(Json(summary))
}

#[instrument(skip(session, dashboard))]
pub async fn chart_handler(
    State(session): State<SharedSession>,
    State(dashboard): State<SharedDashboard>,
    Query(query): Query<ChartQuery>,
) -> Result<Json<ChartView>, ApiError> {
    let mut session = session.lock().await;
    let kinds = resolve_selection(&session, &query.indicators)?;
    let view = dashboard.render(&session, &kinds)?;
    session.set_selection(kinds);

    debug!(layers = view.chart.layers().len(), notices = view.notices.len(), "Chart built");
    Ok(Json(view))
}

#[instrument(skip(session, dashboard))]
pub async fn chart_png_handler(
    State(session): State<SharedSession>,
    State(dashboard): State<SharedDashboard>,
    Query(query): Query<ChartQuery>,
) -> Result<Response, ApiError> {
    let mut session = session.lock().await;
    let kinds = resolve_selection(&session, &query.indicators)?;
    let png = dashboard.snapshot(&session, &kinds)?;
    session.set_selection(kinds);

    debug!(bytes = png.len(), "Chart snapshot ready");
    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}

#[instrument(skip(session, dashboard, payload))]
pub async fn analyze_handler(
    State(session): State<SharedSession>,
    State(dashboard): State<SharedDashboard>,
    Json(payload): Json<AnalyzeRequest>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let mut session = session.lock().await;
    let kinds = resolve_selection(&session, &payload.indicators)?;
    let response = dashboard.analyze(&session, &kinds).await?;
    session.set_selection(kinds);

    info!(
        id = %response.id,
        model = %response.model,
        elapsed_ms = response.elapsed_ms,
        "Analysis returned"
    );
    Ok(Json(response))
}

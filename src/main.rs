pub mod api;
pub mod config;
pub mod data_structures;

use crate::config::{AppConfig, SharedConfig};
use crate::data_structures::{SharedDashboard, SharedSession};
use anyhow::Context;
use axum::{
    Router,
    extract::FromRef,
    http::Method,
    routing::{MethodRouter, get, post},
};
use chartanalyst::session::Session;
use std::{net::SocketAddr, sync::Arc};
use tokio::sync::Mutex;
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
struct AppState {
    config: SharedConfig,
    session: SharedSession,
    dashboard: SharedDashboard,
}

impl FromRef<AppState> for SharedConfig {
    fn from_ref(app_state: &AppState) -> SharedConfig {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for SharedSession {
    fn from_ref(app_state: &AppState) -> SharedSession {
        app_state.session.clone()
    }
}

impl FromRef<AppState> for SharedDashboard {
    fn from_ref(app_state: &AppState) -> SharedDashboard {
        app_state.dashboard.clone()
    }
}

/// Routes; `/analyze` is rate limited per client IP when a limit is given.
fn router(state: AppState, analyze_per_minute: Option<u32>) -> anyhow::Result<Router> {
    let mut analyze: MethodRouter<AppState> = post(api::analyze_handler);
    if let Some(per_minute) = analyze_per_minute {
        let per_minute = per_minute.max(1);
        let governor_conf = Arc::new(
            GovernorConfigBuilder::default()
                .per_second((60 / u64::from(per_minute)).max(1))
                .burst_size(per_minute)
                .finish()
                .context("invalid /analyze rate limit")?,
        );
        analyze = analyze.layer(GovernorLayer::new(governor_conf));
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Ok(Router::new()
        .route("/health", get(api::health_handler))
        .route("/indicators", get(api::list_indicators_handler))
        .route("/fetch", post(api::fetch_handler))
        .route("/chart", get(api::chart_handler))
        .route("/chart.png", get(api::chart_png_handler))
        .route("/analyze", analyze)
        .layer(cors)
        .with_state(state))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_config = AppConfig::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chartanalyst=info,chartanalyst_dashboard=info".into()),
        )
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("cannot install log subscriber: {}", e))?;

    // Set a global span with node_name for all subsequent logs
    let _span = tracing::info_span!("node", name = %app_config.node_name).entered();

    tracing::info!("Starting chartanalyst-dashboard");
    tracing::info!(
        ?app_config.environment,
        port = app_config.port,
        data_source = ?app_config.data_source,
        model = %app_config.ollama_model,
        "Loaded configuration"
    );

    let dashboard = app_config.dashboard_builder().build()?;
    let app_state = AppState {
        config: Arc::new(app_config.clone()),
        session: Arc::new(Mutex::new(Session::new())),
        dashboard: Arc::new(dashboard),
    };

    let app = router(app_state, Some(app_config.analyze_per_minute))?;

    let addr = SocketAddr::from(([0, 0, 0, 0], app_config.port));
    tracing::info!(%addr, "Server listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot bind {}", addr))?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use chartanalyst::api::{DashboardBuilder, DataSourceKind};
    use std::time::Duration;
    use tower::ServiceExt;

    fn write_prices(dir: &std::path::Path, symbol: &str, days: usize) {
        let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut csv = String::from("date,open,high,low,close,volume\n");
        for i in 0..days {
            let close = 150.0 + (i as f64 * 0.4).sin() * 6.0;
            csv.push_str(&format!(
                "{},{:.2},{:.2},{:.2},{:.2},{}\n",
                start + chrono::Duration::days(i as i64),
                close - 0.8,
                close + 1.2,
                close - 1.6,
                close,
                2_000_000 + i * 1_000
            ));
        }
        std::fs::write(dir.join(format!("{}.csv", symbol)), csv).unwrap();
    }

    fn test_app(dir: &std::path::Path) -> Router {
        let dashboard = DashboardBuilder::new()
            .with_data_source(DataSourceKind::Csv)
            .with_csv_dir(dir)
            .with_ollama_url("http://127.0.0.1:9")
            .with_model_timeout(Duration::from_secs(2))
            .with_chart_size(400, 240)
            .with_work_dir(dir)
            .build()
            .unwrap();

        let state = AppState {
            config: Arc::new(AppConfig::default()),
            session: Arc::new(Mutex::new(Session::new())),
            dashboard: Arc::new(dashboard),
        };
        router(state, None).unwrap()
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_then_chart() {
        let dir = tempfile::tempdir().unwrap();
        write_prices(dir.path(), "AAPL", 45);
        let app = test_app(dir.path());

        let response = app
            .clone()
            .oneshot(post_json("/fetch", r#"{"symbol":"aapl","start":"2024-01-01","end":"2024-03-31"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let summary = json_body(response).await;
        assert_eq!(summary["symbol"], "AAPL");
        assert_eq!(summary["observations"], 45);

        let response = app
            .clone()
            .oneshot(get_req("/chart?indicators=sma20&indicators=bb"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let view = json_body(response).await;
        assert_eq!(view["chart"]["layers"].as_array().unwrap().len(), 4);
        assert_eq!(view["chart"]["range_slider"], false);
        assert!(view["notices"].as_array().unwrap().is_empty());

        // selection is remembered for the next render
        let response = app.clone().oneshot(get_req("/chart.png")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
        let png = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(png.starts_with(&[0x89, b'P', b'N', b'G']));
    }

    #[tokio::test]
    async fn test_chart_before_fetch_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(dir.path());

        let response = app.oneshot(get_req("/chart")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "invalid_input");
    }

    #[tokio::test]
    async fn test_unknown_symbol_is_not_found_and_keeps_series() {
        let dir = tempfile::tempdir().unwrap();
        write_prices(dir.path(), "AAPL", 30);
        let app = test_app(dir.path());

        let ok = app
            .clone()
            .oneshot(post_json("/fetch", r#"{"symbol":"AAPL","start":"2024-01-01","end":"2024-03-31"}"#))
            .await
            .unwrap();
        assert_eq!(ok.status(), StatusCode::OK);

        let missing = app.clone().oneshot(post_json("/fetch", r#"{"symbol":"ZZZZ"}"#)).await.unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(missing).await["error"], "no_data");

        let health = json_body(app.oneshot(get_req("/health")).await.unwrap()).await;
        assert_eq!(health["loaded_symbol"], "AAPL");
        assert_eq!(health["data_source"], "csv");
    }

    #[tokio::test]
    async fn test_short_series_reports_notice() {
        let dir = tempfile::tempdir().unwrap();
        write_prices(dir.path(), "NEW", 8);
        let app = test_app(dir.path());

        app.clone()
            .oneshot(post_json("/fetch", r#"{"symbol":"NEW","start":"2024-01-01","end":"2024-01-31"}"#))
            .await
            .unwrap();
        let view = json_body(app.oneshot(get_req("/chart?indicators=sma20,vwap")).await.unwrap()).await;
        assert_eq!(view["chart"]["layers"].as_array().unwrap().len(), 2);
        assert_eq!(view["notices"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_analyze_without_model_is_bad_gateway() {
        let dir = tempfile::tempdir().unwrap();
        write_prices(dir.path(), "AAPL", 30);
        let app = test_app(dir.path());

        app.clone()
            .oneshot(post_json("/fetch", r#"{"symbol":"AAPL","start":"2024-01-01","end":"2024-03-31"}"#))
            .await
            .unwrap();
        let response = app.oneshot(post_json("/analyze", r#"{"indicators":["ema20"]}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(json_body(response).await["error"], "model_unavailable");
    }

    async fn selected_ids(app: &Router) -> Vec<String> {
        let list = json_body(app.clone().oneshot(get_req("/indicators")).await.unwrap()).await;
        list.as_array()
            .unwrap()
            .iter()
            .filter(|i| i["selected"] == true)
            .map(|i| i["id"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_failed_actions_keep_selection() {
        let dir = tempfile::tempdir().unwrap();
        write_prices(dir.path(), "AAPL", 30);
        let app = test_app(dir.path());

        // no series yet: the chart fails and the selection stays put
        let response = app.clone().oneshot(get_req("/chart?indicators=vwap")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(selected_ids(&app).await, vec!["sma20"]);

        app.clone()
            .oneshot(post_json("/fetch", r#"{"symbol":"AAPL","start":"2024-01-01","end":"2024-03-31"}"#))
            .await
            .unwrap();
        let response = app
            .clone()
            .oneshot(post_json("/analyze", r#"{"indicators":["vwap","ema20"]}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(selected_ids(&app).await, vec!["sma20"]);

        // a successful render does remember the choice
        let response = app.clone().oneshot(get_req("/chart?indicators=vwap,ema20")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(selected_ids(&app).await, vec!["ema20", "vwap"]);
    }

    #[tokio::test]
    async fn test_indicator_catalogue() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(dir.path());

        let list = json_body(app.oneshot(get_req("/indicators")).await.unwrap()).await;
        let list = list.as_array().unwrap();
        assert_eq!(list.len(), 4);
        assert_eq!(list[0]["name"], "SMA(20)");
        assert_eq!(list[0]["selected"], true);
        assert_eq!(list[3]["id"], "vwap");
    }
}

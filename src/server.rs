//! # HTTP Server
//!
//! 每次交互都是一次 GET 请求：页面用当前筛选条件整体重新渲染。

use std::sync::Arc;

use anyhow::anyhow;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::DashboardConfig;
use crate::error::QueryError;
use crate::page::Dashboard;
use crate::{DataSet, Filter};

/// 所有请求共享的只读状态，数据集只在启动时加载一次
#[derive(Debug)]
pub struct AppState {
    pub config: DashboardConfig,
    pub data: DataSet,
}

/// 页面和下载共用的查询参数：`country` 可以重复，日期为 `YYYY-MM-DD`
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DashboardQuery {
    pub countries: Vec<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// 由侧边栏表单提交：此时没有 `country` 表示用户清空了选择，不再回退到默认国家
    pub applied: bool,
}

impl DashboardQuery {
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Result<Self, QueryError> {
        let mut query = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "country" if !value.is_empty() => query.countries.push(value),
                "start" => query.start = parse_param("start", &value)?,
                "end" => query.end = parse_param("end", &value)?,
                "applied" => query.applied = true,
                _ => {}
            }
        }
        Ok(query)
    }

    /// 结合数据集和默认配置得到最终的筛选条件
    pub fn resolve(&self, state: &AppState) -> anyhow::Result<Filter> {
        let mut filter = Filter::resolve(
            &state.data,
            &self.countries,
            self.start,
            self.end,
            &state.config.default_countries,
        )?;
        if self.applied && self.countries.is_empty() {
            filter.countries.clear();
        }
        Ok(filter)
    }
}

fn parse_param(field: &'static str, value: &str) -> Result<Option<NaiveDate>, QueryError> {
    if value.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| QueryError::InvalidDate {
            field,
            value: value.to_string(),
        })
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    BadRequest(#[from] QueryError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(e) => (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
            ApiError::Internal(e) => {
                error!("request failed: {:#}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub rows: usize,
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(dashboard_handler))
        .route("/download", get(download_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn dashboard_handler(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Html<String>, ApiError> {
    let query = DashboardQuery::from_pairs(pairs)?;
    // 画图比较耗 CPU，放到阻塞线程池里
    let page = tokio::task::spawn_blocking(move || -> anyhow::Result<String> {
        let filter = query.resolve(&state)?;
        Ok(Dashboard::build(&state.data, filter, &state.config)?.render())
    })
    .await
    .map_err(|e| anyhow!(e))??;
    Ok(Html(page))
}

async fn download_handler(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, ApiError> {
    let query = DashboardQuery::from_pairs(pairs)?;
    let file_name = state.config.export_file_name.clone();
    let csv = tokio::task::spawn_blocking(move || -> anyhow::Result<String> {
        let view = query.resolve(&state)?.apply(&state.data)?;
        info!("exporting {} rows", view.height());
        view.to_csv()
    })
    .await
    .map_err(|e| anyhow!(e))??;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        file_name
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response())
}

async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        rows: state.data.height(),
    };

    (StatusCode::OK, Json(response))
}

pub struct DashboardServer {
    config: DashboardConfig,
    router: Router,
}

impl DashboardServer {
    pub fn new(config: DashboardConfig, data: DataSet) -> Self {
        let state = Arc::new(AppState {
            config: config.clone(),
            data,
        });
        Self {
            config,
            router: routes(state),
        }
    }

    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// 测试用
    pub fn router(self) -> Router {
        self.router
    }

    pub async fn start(self) -> anyhow::Result<()> {
        let addr = self.socket_addr();
        let listener = TcpListener::bind(&addr).await?;
        info!("dashboard available at http://{}", listener.local_addr()?);
        axum::serve(listener, self.router).await?;
        Ok(())
    }
}

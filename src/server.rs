//! Dashboard HTTP API over the shared topology.

use std::sync::Arc;
use std::time::Duration;

use actix_web::error::{InternalError, QueryPayloadError};
use actix_web::{dev::Server, get, middleware, web, App, HttpRequest, HttpResponse, HttpServer, Responder};
use serde::Deserialize;

use crate::config::window_from_secs;
use crate::models::dto::HealthDTO;
use crate::topology::{epoch_now, Topology};

/// Shared handler state: the aggregate and the default staleness window.
#[derive(Clone)]
pub struct AppState {
    pub topology: Arc<Topology>,
    pub stale_threshold: Duration,
}

#[derive(Debug, Deserialize)]
pub struct WindowQuery {
    /// Staleness window override, in seconds.
    window: Option<f64>,
}

fn bad_request(message: String) -> HttpResponse {
    HttpResponse::BadRequest().json(serde_json::json!({ "error": message }))
}

impl WindowQuery {
    fn resolve(&self, default: Duration) -> Result<Duration, HttpResponse> {
        match self.window {
            None => Ok(default),
            Some(secs) => window_from_secs(secs).ok_or_else(|| {
                bad_request(format!("window must be a positive number of seconds, got {secs}"))
            }),
        }
    }
}

// Unparseable query strings get the same JSON error shape as out-of-range windows.
fn query_error(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let response = bad_request(format!("invalid query: {err}"));
    InternalError::from_response(err, response).into()
}

#[get("/api/topology")]
async fn api_topology(state: web::Data<AppState>, query: web::Query<WindowQuery>) -> impl Responder {
    match query.resolve(state.stale_threshold) {
        Ok(window) => HttpResponse::Ok().json(state.topology.snapshot(epoch_now(), window)),
        Err(response) => response,
    }
}

#[get("/api/stats")]
async fn api_stats(state: web::Data<AppState>, query: web::Query<WindowQuery>) -> impl Responder {
    match query.resolve(state.stale_threshold) {
        Ok(window) => HttpResponse::Ok().json(state.topology.stats(epoch_now(), window)),
        Err(response) => response,
    }
}

#[get("/api/health")]
async fn api_health() -> impl Responder {
    HttpResponse::Ok().json(HealthDTO {
        status: "ok".to_string(),
        timestamp: epoch_now(),
    })
}

/// Registers the dashboard routes; shared by the server and the handler tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::QueryConfig::default().error_handler(query_error))
        .service(api_topology)
        .service(api_stats)
        .service(api_health);
}

/// Lets the browser dashboard poll from any origin.
pub fn cors_headers() -> middleware::DefaultHeaders {
    middleware::DefaultHeaders::new().add(("Access-Control-Allow-Origin", "*"))
}

/// Binds the dashboard API. Signal handling is left to the caller, which stops
/// the returned server through its handle.
pub fn build_server(state: AppState, host: &str, port: u16) -> std::io::Result<Server> {
    let data = web::Data::new(state);
    let server = HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .wrap(cors_headers())
            .configure(configure)
    })
    .disable_signals()
    .bind((host, port))?
    .run();

    tracing::info!(host, port, "dashboard API listening");
    Ok(server)
}

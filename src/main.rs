#![warn(clippy::pedantic, clippy::all, clippy::nursery)]
#![allow(clippy::single_match_else)]

use crate::{
    auth::{
        backend::GateAuthBackend, postgres_store::PostgresSessionStore,
        verifier::SharedPhraseVerifier,
    },
    config::{RuntimeConfiguration, var_or},
    routes::{
        dashboard::get_dashboard,
        devices::{delete_device, get_devices, internal_get_devices},
        emergency::post_emergency,
        gate::internal_get_gate,
        index::get_index_route,
        login::{get_login, post_login, post_logout},
        requests::{
            internal_get_requests, internal_get_stats, internal_get_teacher_queue, post_approve,
            post_confirm_exit, post_confirm_return, post_insights, post_reject,
        },
        sse::sse_feed,
        student_portal::{get_apply, get_student_portal, internal_get_student, post_apply},
    },
    state::GateState,
};
use axum::{
    Router,
    routing::{delete, get, post},
};
use axum_login::{
    AuthManagerLayerBuilder,
    tower_sessions::{ExpiredDeletion, Expiry, SessionManagerLayer, cookie::time::Duration},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::{net::TcpListener, signal};
use tower_http::{
    compression::CompressionLayer, limit::RequestBodyLimitLayer, trace::TraceLayer,
};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[macro_use]
extern crate tracing;

mod auth;
mod config;
mod data;
mod error;
mod gatehouse;
mod insights;
mod maud_conveniences;
mod routes;
mod state;
mod store;

const BODY_LIMIT: usize = 64 * 1024;
const EXPIRED_SESSION_SWEEP: std::time::Duration = std::time::Duration::from_secs(60 * 60);

async fn shutdown_signal(state: GateState) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    warn!("signal received, starting graceful shutdown");
    state.sensible_shutdown().await;
}

#[tokio::main]
async fn main() {
    let dotenv = dotenvy::dotenv();

    tracing::subscriber::set_global_default(
        FmtSubscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .finish(),
    )
    .expect("unable to set tracing subscriber");

    info!("`tracing` online");
    if let Err(e) = dotenv {
        warn!(?e, "no .env file loaded, relying on the environment");
    }

    let options = PgPoolOptions::new().max_connections(15);
    let config = RuntimeConfiguration::new().expect("unable to create config");
    let state = GateState::new(options, config.clone())
        .await
        .expect("unable to create state");

    let session_store = PostgresSessionStore::new(state.pool());
    {
        let session_store = session_store.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(EXPIRED_SESSION_SWEEP);
            loop {
                interval.tick().await;
                if let Err(e) = session_store.delete_expired().await {
                    warn!(?e, "unable to delete expired sessions");
                }
            }
        });
    }
    let session_layer = SessionManagerLayer::new(session_store)
        .with_expiry(Expiry::OnInactivity(Duration::days(90)));

    let verifier = SharedPhraseVerifier::new(&config.phrase_config())
        .expect("unable to hash role phrases");
    let auth_backend = GateAuthBackend::new(Arc::new(verifier));
    let auth_layer = AuthManagerLayerBuilder::new(auth_backend, session_layer).build();

    let trace_layer = TraceLayer::new_for_http();

    let app = Router::new()
        .route("/", get(get_index_route))
        .route("/login", get(get_login).post(post_login))
        .route("/logout", post(post_logout))
        .route("/dashboard", get(get_dashboard))
        .route("/s", get(get_student_portal))
        .route("/s/apply", get(get_apply).post(post_apply))
        .route("/requests/{id}/approve", post(post_approve))
        .route("/requests/{id}/reject", post(post_reject))
        .route("/requests/{id}/exit", post(post_confirm_exit))
        .route("/requests/{id}/return", post(post_confirm_return))
        .route("/emergency", post(post_emergency))
        .route("/devices", get(get_devices))
        .route("/devices/{adm_no}", delete(delete_device))
        .route("/insights", post(post_insights))
        .route("/internal/requests", get(internal_get_requests))
        .route("/internal/stats", get(internal_get_stats))
        .route("/internal/teacher_queue", get(internal_get_teacher_queue))
        .route("/internal/gate", get(internal_get_gate))
        .route("/internal/devices", get(internal_get_devices))
        .route("/internal/student", get(internal_get_student))
        .route("/sse_feed", get(sse_feed))
        .layer(auth_layer)
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(CompressionLayer::new())
        .layer(trace_layer)
        .with_state(state.clone());

    let server_ip = var_or("SECURELEAVE_SERVER_IP", "127.0.0.1:8080");
    let listener = TcpListener::bind(&server_ip)
        .await
        .expect("unable to listen on server ip");

    info!(?server_ip, "Listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await
        .expect("unable to serve app");
}

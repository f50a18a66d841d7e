use crate::cafes::{self, CafeGroup};
use crate::catalog::Catalog;
use crate::cli::CommonArgs;
use crate::guide;
use crate::session::{Role, SessionError};
use crate::AppState;
use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect},
    routing::{get, post},
    Form, Json, Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_with_macros::skip_serializing_none;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::OnceLock;
use std::time::Duration;
use tera::{Context as TeraContext, Tera};
use tower_http::compression::predicate::{
    NotForContentType, Predicate, SizeAbove,
};
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{prelude::*, Registry};
use tracing_tree::HierarchicalLayer;

// Add build-time information
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

#[skip_serializing_none]
#[derive(Debug, Serialize)]
struct StatusResponse {
    catalog_rows: usize,
    active_sessions: usize,
    openai_model: Option<String>,
    stats: StatusStats,
}

#[derive(Debug, Serialize)]
struct StatusStats {
    processed_count: u64,
    error_count: u64,
    total_processing_time_ms: u64,
    average_processing_time_ms: f64,
}

// Health check endpoint
#[instrument]
pub async fn health_check() -> &'static str {
    debug!("Health check requested");
    "OK"
}

fn get_build_info() -> String {
    let mut parts = vec![format!("Version {}", built_info::PKG_VERSION)];
    if let Some(commit) = built_info::GIT_COMMIT_HASH_SHORT {
        parts.push(format!("Commit {}", commit));
    }
    parts.push(format!("Built {}", built_info::BUILT_TIME_UTC));
    parts.join(" • ")
}

static TEMPLATES: OnceLock<Tera> = OnceLock::new();

fn init_templates() -> Tera {
    let mut tera = Tera::default();
    tera.add_raw_template("base.html", include_str!("templates/base.html"))
        .unwrap();
    tera.add_raw_template("chat.html", include_str!("templates/chat.html"))
        .unwrap();
    tera
}

pub fn ensure_templates() {
    TEMPLATES.get_or_init(init_templates);
}

#[derive(Debug, Serialize)]
struct RenderedMessage {
    role: &'static str,
    html: String,
}

#[derive(Debug, Deserialize)]
struct ChatPageQuery {
    session: Option<String>,
}

#[axum::debug_handler]
async fn chat_page(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ChatPageQuery>,
) -> Html<String> {
    let mut messages = Vec::new();
    let mut session_id = None;
    if let Some(id) = query.session.as_deref() {
        if let Ok(history) = state.sessions.history(id).await {
            messages = history
                .iter()
                .map(|msg| match msg.role {
                    // Assistant replies are markdown; user input is
                    // escaped verbatim.
                    Role::Assistant => RenderedMessage {
                        role: "assistant",
                        html: markdown::to_html(&msg.content),
                    },
                    Role::User => RenderedMessage {
                        role: "user",
                        html: tera::escape_html(&msg.content),
                    },
                })
                .collect();
            session_id = Some(id.to_string());
        }
    }

    let mut context = TeraContext::new();
    context.insert("messages", &messages);
    context.insert("session_id", &session_id);
    context.insert("build_info", &get_build_info());

    let rendered = TEMPLATES
        .get()
        .unwrap()
        .render("chat.html", &context)
        .unwrap_or_else(|e| format!("Template error: {}", e));

    Html(rendered)
}

/// Run one submission through the assembler and record it in the
/// session, updating the service counters.
async fn process_chat(
    state: &Arc<AppState>,
    session_id: Option<&str>,
    message: &str,
) -> Result<(String, String), (StatusCode, String)> {
    let started = std::time::Instant::now();

    let session_id = state.sessions.get_or_create(session_id).await;
    append_message(state, &session_id, Role::User, message.to_string())
        .await?;

    let reply = guide::respond(state, message).await;

    append_message(state, &session_id, Role::Assistant, reply.clone())
        .await?;

    state.stats.processed_count.fetch_add(1, Ordering::Relaxed);
    state.stats.total_processing_time_ms.fetch_add(
        started.elapsed().as_millis() as u64,
        Ordering::Relaxed,
    );

    Ok((session_id, reply))
}

async fn append_message(
    state: &Arc<AppState>,
    session_id: &str,
    role: Role,
    content: String,
) -> Result<(), (StatusCode, String)> {
    state
        .sessions
        .append(session_id, role, content)
        .await
        .map_err(|e: SessionError| {
            state.stats.error_count.fetch_add(1, Ordering::Relaxed);
            error!("Failed to record chat message: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })
}

#[derive(Debug, Deserialize)]
struct ChatForm {
    session_id: Option<String>,
    message: String,
}

#[axum::debug_handler]
async fn post_chat_form(
    State(state): State<Arc<AppState>>,
    Form(form): Form<ChatForm>,
) -> Result<Redirect, (StatusCode, String)> {
    let (session_id, _reply) =
        process_chat(&state, form.session_id.as_deref(), &form.message)
            .await?;
    Ok(Redirect::to(&format!("/?session={}", session_id)))
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    session_id: Option<String>,
    message: String,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    session_id: String,
    reply: String,
}

#[axum::debug_handler]
async fn post_chat_api(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, String)> {
    let (session_id, reply) =
        process_chat(&state, request.session_id.as_deref(), &request.message)
            .await?;
    Ok(Json(ChatResponse { session_id, reply }))
}

#[axum::debug_handler]
async fn get_history(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let messages = state
        .sessions
        .history(&session_id)
        .await
        .map_err(|e| (StatusCode::NOT_FOUND, e.to_string()))?;
    Ok(Json(messages))
}

#[axum::debug_handler]
async fn get_sites(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let sites: Vec<String> = state
        .catalog
        .site_names()
        .into_iter()
        .map(String::from)
        .collect();
    Json(sites)
}

#[derive(Debug, Deserialize)]
struct CafeQuery {
    place: String,
}

#[derive(Debug, Serialize)]
struct CafeResponse {
    place: String,
    cafes: Vec<CafeGroup>,
}

#[axum::debug_handler]
async fn get_cafes(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CafeQuery>,
) -> impl IntoResponse {
    let rows = state.catalog.matches(&query.place);
    let cafes = cafes::group_cafes(&rows, &state.placeholder_reviews);
    Json(CafeResponse {
        place: query.place,
        cafes,
    })
}

#[axum::debug_handler]
async fn get_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let processed_count = state.stats.processed_count.load(Ordering::Relaxed);
    let total_time =
        state.stats.total_processing_time_ms.load(Ordering::Relaxed);
    let average_time = if processed_count > 0 {
        total_time as f64 / processed_count as f64
    } else {
        0.0
    };

    let status = StatusResponse {
        catalog_rows: state.catalog.len(),
        active_sessions: state.sessions.len().await,
        openai_model: state
            .openai_client
            .as_ref()
            .map(|_| state.chat_model.clone()),
        stats: StatusStats {
            processed_count,
            error_count: state.stats.error_count.load(Ordering::Relaxed),
            total_processing_time_ms: total_time,
            average_processing_time_ms: average_time,
        },
    };

    Json(status).into_response()
}

pub fn routes(state: Arc<AppState>) -> Router {
    ensure_templates();

    let predicate = SizeAbove::new(32)
        .and(NotForContentType::GRPC)
        .and(NotForContentType::IMAGES);

    let compression_layer = CompressionLayer::new()
        .br(true)
        .deflate(true)
        .gzip(true)
        .zstd(true)
        .compress_when(predicate);

    Router::new()
        .route("/", get(chat_page))
        .route("/chat", post(post_chat_form))
        .route("/health", get(health_check))
        .route("/api/chat", post(post_chat_api))
        .route("/api/history/{session_id}", get(get_history))
        .route("/api/sites", get(get_sites))
        .route("/api/cafes", get(get_cafes))
        .route("/api/status", get(get_status))
        .layer(compression_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Command line arguments for the chatbot server
#[derive(Parser, Debug)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// Port to listen on
    #[arg(long, default_value_t = 3010)]
    port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Seconds between expired-session sweeps
    #[arg(long, default_value_t = 300)]
    session_gc_interval_secs: u64,
}

pub async fn serve() -> Result<()> {
    // Initialize logging with tracing
    let subscriber = Registry::default()
        .with(
            HierarchicalLayer::new(2)
                .with_targets(true)
                .with_bracketed_fields(true),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        );

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    // Parse command line arguments
    let args = Args::parse();

    info!("Starting chatju service");

    // The catalog is the one hard startup requirement: without it the
    // service cannot answer café questions at all.
    let catalog = Catalog::load(&args.common.catalog)?;
    if catalog.is_empty() {
        warn!("Catalog is empty; every place lookup will miss");
    }

    let state = crate::create_app_state(crate::AppConfig {
        catalog,
        openai_api_key: args.common.openai_api_key,
        openai_api_base: args.common.openai_api_base,
        chat_model: args.common.chat_model,
        weather_url: args.common.weather_url,
        weather_location: args.common.weather_location,
        no_review_tokens: args.common.no_review_tokens,
        session_ttl_secs: args.common.session_ttl_secs,
        timezone_str: args.common.timezone,
    })?;

    // Create a channel for shutdown coordination
    let (shutdown_tx, mut shutdown_rx) =
        tokio::sync::broadcast::channel::<()>(1);

    // Set up ctrl-c handler
    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        if let Ok(()) = tokio::signal::ctrl_c().await {
            info!("Received CTRL-C, initiating shutdown");
            let _ = shutdown_tx_clone.send(());
        }
    });

    // Sweep expired sessions in the background
    let gc_state = state.clone();
    let gc_interval = Duration::from_secs(args.session_gc_interval_secs);
    let mut gc_shutdown_rx = shutdown_tx.subscribe();
    let gc_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(gc_interval);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let removed = gc_state.sessions.garbage_collect().await;
                    if removed > 0 {
                        debug!("Garbage collected {} expired sessions", removed);
                    }
                }
                _ = gc_shutdown_rx.recv() => {
                    break;
                }
            }
        }
    });

    // Start web server
    let app = routes(state);
    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server running on http://{}", addr);

    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                error!("Server error: {}", e);
            }
        }
        _ = shutdown_rx.recv() => {
            info!("Shutdown signal received, waiting for background tasks to complete...");
        }
    }

    match tokio::time::timeout(Duration::from_secs(30), gc_handle).await {
        Ok(_) => info!("Session sweeper completed gracefully"),
        Err(_) => warn!("Session sweeper timed out during shutdown"),
    }

    info!("Server shutdown complete");
    Ok(())
}

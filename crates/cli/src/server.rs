use anyhow::Result;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chatmap_graph::{run_pipeline, FilterCriteria, Projector, RecordStore};
use chatmap_protocol::{ApiStatus, FavoritesDoc, TagsDoc, VocabularyDoc};
use chatmap_store::{
    AnnotationService, DatasetSource, JsonFileStore, StoreError, CHATS_ENDPOINT,
    FAVORITES_ENDPOINT, TAGS_ENDPOINT, VOCABULARY_ENDPOINT,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;

pub const VIEW_ENDPOINT: &str = "/api/view";

/// Shared state of the annotation service.
pub struct AppState {
    pub store: JsonFileStore,
    pub projector: Projector,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(CHATS_ENDPOINT, get(get_chats))
        .route(FAVORITES_ENDPOINT, get(get_favorites).post(post_favorites))
        .route(TAGS_ENDPOINT, get(get_tags).post(post_tags))
        .route(VOCABULARY_ENDPOINT, get(get_vocabulary).post(post_vocabulary))
        .route(VIEW_ENDPOINT, post(post_view))
        .with_state(state)
}

pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<()> {
    let addr = listener.local_addr()?;
    log::info!(
        "Serving chat data from {} on http://{addr}/api",
        state.store.layout().dir.display()
    );
    axum::serve(listener, router(state)).await?;
    Ok(())
}

fn error_reply(message: String) -> Response {
    log::warn!("Request failed: {message}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiStatus::error(message)),
    )
        .into_response()
}

fn json_reply<T: Serialize>(result: chatmap_store::Result<T>) -> Response {
    match result {
        Ok(value) => Json(value).into_response(),
        Err(err) => error_reply(err.to_string()),
    }
}

fn status_reply(result: chatmap_store::Result<()>) -> Response {
    match result {
        Ok(()) => Json(ApiStatus::success()).into_response(),
        Err(err) => error_reply(err.to_string()),
    }
}

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, Response> {
    serde_json::from_slice(body).map_err(|err| error_reply(format!("Invalid request body: {err}")))
}

async fn get_chats(State(state): State<Arc<AppState>>) -> Response {
    json_reply(state.store.load_dataset().await)
}

async fn get_favorites(State(state): State<Arc<AppState>>) -> Response {
    json_reply(state.store.load_favorites().await)
}

async fn get_tags(State(state): State<Arc<AppState>>) -> Response {
    json_reply(state.store.load_tags().await)
}

async fn get_vocabulary(State(state): State<Arc<AppState>>) -> Response {
    json_reply(state.store.load_vocabulary().await)
}

async fn post_favorites(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    match parse_body::<FavoritesDoc>(&body) {
        Ok(doc) => status_reply(state.store.save_favorites(&doc).await),
        Err(reply) => reply,
    }
}

async fn post_tags(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    match parse_body::<TagsDoc>(&body) {
        Ok(doc) => status_reply(state.store.save_tags(&doc).await),
        Err(reply) => reply,
    }
}

async fn post_vocabulary(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    match parse_body::<VocabularyDoc>(&body) {
        Ok(doc) => status_reply(state.store.save_vocabulary(&doc).await),
        Err(reply) => reply,
    }
}

/// Criteria in, projected frame out, computed from the current files.
async fn post_view(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let criteria = if body.iter().all(u8::is_ascii_whitespace) {
        FilterCriteria::default()
    } else {
        match parse_body::<FilterCriteria>(&body) {
            Ok(criteria) => criteria,
            Err(reply) => return reply,
        }
    };
    json_reply(project_view(&state, &criteria).await)
}

async fn project_view(
    state: &AppState,
    criteria: &FilterCriteria,
) -> Result<chatmap_protocol::ViewFrame, StoreError> {
    let (dataset, favorites, tags, vocabulary) = tokio::try_join!(
        state.store.load_dataset(),
        state.store.load_favorites(),
        state.store.load_tags(),
        state.store.load_vocabulary(),
    )?;
    let store = RecordStore::load(&dataset, favorites, tags, vocabulary);
    let (_, frame) = run_pipeline(&store, criteria, &state.projector);
    Ok(frame)
}

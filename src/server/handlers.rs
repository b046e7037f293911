use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde_json::{Value, json};

use super::AppState;
use super::error::ApiError;
use super::form::FormFields;
use crate::models::parse_history;
use crate::services::{ChatRequest, ProviderKind, TRAIN_SUCCESS};

type ApiResult = Result<Json<Value>, ApiError>;

pub async fn upload_dataset(State(state): State<AppState>, form: FormFields) -> ApiResult {
    let dataset = form.require("dataset_name")?;
    let message = state
        .upload(dataset, form.files(), form.get("urls"))
        .await?;
    Ok(Json(json!({ "message": message })))
}

pub async fn train_dataset(State(state): State<AppState>, form: FormFields) -> ApiResult {
    let dataset = form.require("dataset_name")?;
    state.train(dataset).await?;
    Ok(Json(json!({ "message": TRAIN_SUCCESS })))
}

pub async fn query(State(state): State<AppState>, form: FormFields) -> ApiResult {
    let dataset = form.require("dataset_name")?;
    let query = form.require("query")?;
    let top_k = form.parse::<u64>("top_k")?;

    let results = state.query(dataset, query, top_k).await?;
    Ok(Json(json!({ "results": results })))
}

pub async fn chat_llm(State(state): State<AppState>, form: FormFields) -> ApiResult {
    let request = ChatRequest {
        dataset: form.require("dataset_name")?.to_string(),
        query: form.require("query")?.to_string(),
        llm: form.require("llm")?.to_string(),
        model: form.get("model").map(str::to_string),
        top_k: form.parse::<u64>("top_k")?,
        history: parse_history(form.get("history")),
    };

    let result = state.chat(&request).await?;
    Ok(Json(json!({ "result": result })))
}

pub async fn summarize_content(State(state): State<AppState>, form: FormFields) -> ApiResult {
    let content = form.require("content")?;
    let llm = form.require("llm")?;

    let result = state.summarize(content, llm, form.get("model")).await;
    Ok(Json(json!({ "result": result })))
}

pub async fn list_datasets(State(state): State<AppState>) -> ApiResult {
    let datasets = state.list_datasets().await?;
    Ok(Json(json!({ "datasets": datasets })))
}

pub async fn list_groq_models(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "models": state.list_models(ProviderKind::Groq).await }))
}

pub async fn list_gemini_models(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "models": state.list_models(ProviderKind::Gemini).await }))
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.health().await {
        Ok(true) => (StatusCode::OK, Json(json!({ "status": "ok" }))),
        Ok(false) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unavailable" })),
        ),
        Err(e) => {
            tracing::warn!("health check failed: {e}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable", "detail": e.to_string() })),
            )
        }
    }
}

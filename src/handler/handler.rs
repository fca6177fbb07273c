use crate::{
    app::AppState,
    speech::{SpeechError, AUDIO_CONTENT_TYPE},
};
use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tokio_util::io::ReaderStream;
use tracing::error;

use super::{
    DeleteResponse, ErrorResponse, GenerateRequest, GenerateResponse, HealthResponse,
    StorageInfoResponse,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/generate", post(generate))
        .route("/audio/{filename}", get(get_audio).delete(delete_audio))
        .route("/storage/url", get(storage_info))
}

impl IntoResponse for SpeechError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            SpeechError::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            SpeechError::Synthesis(_) | SpeechError::LocalWrite(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("TTS generation failed: {}", self),
            ),
        };
        (status, Json(ErrorResponse { detail })).into_response()
    }
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "tts".to_string(),
    })
}

/// Body rejections carry axum's status with a `{detail}` body.
fn rejection_response(rejection: JsonRejection) -> Response {
    (
        rejection.status(),
        Json(ErrorResponse {
            detail: rejection.body_text(),
        }),
    )
        .into_response()
}

async fn generate(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return rejection_response(rejection),
    };
    match state.speech.generate(&request.text, &request.lang).await {
        Ok(generated) => Json(GenerateResponse {
            success: true,
            file_id: generated.file_id,
            filename: generated.filename,
            url: generated.url,
        })
        .into_response(),
        Err(e) => {
            error!(lang = %request.lang, "TTS generation failed: {}", e);
            e.into_response()
        }
    }
}

async fn get_audio(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, SpeechError> {
    let audio = state.speech.fetch(&filename).await?;
    let headers = [
        (header::CONTENT_TYPE, AUDIO_CONTENT_TYPE.to_string()),
        (header::CONTENT_LENGTH, audio.len.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ),
    ];
    let body = Body::from_stream(ReaderStream::new(audio.file));
    Ok((headers, body).into_response())
}

async fn delete_audio(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Json<DeleteResponse> {
    state.speech.delete(&filename).await;
    Json(DeleteResponse {
        success: true,
        message: "File deleted".to_string(),
    })
}

async fn storage_info(State(state): State<AppState>) -> Json<StorageInfoResponse> {
    let storage_url = state.speech.public_base_url().to_string();
    let audio_bucket = state.speech.bucket().to_string();
    Json(StorageInfoResponse {
        success: true,
        audio_url: format!("{}/{}", storage_url, audio_bucket),
        storage_url,
        audio_bucket,
    })
}

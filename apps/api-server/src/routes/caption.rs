use crate::{ctx::Ctx, error::ApiError};
use axum::{
    extract::{rejection::JsonRejection, Multipart, Path, State},
    routing::{post, put},
    Json, Router,
};
use caption_base::{Backend, CaptionError, CaptionRequest, Length, Platform, Tone};
use caption_history::CaptionRecord;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub fn get_routes() -> Router<Ctx> {
    Router::new()
        .route("/generate", post(generate))
        .route("/user_captions/:user_id", axum::routing::get(list_user_captions))
        .route(
            "/caption/:caption_id",
            put(update_caption).delete(delete_caption),
        )
}

/// Raw multipart fields, parsed into a `CaptionRequest` once all are read.
#[derive(Default)]
struct GenerateForm {
    image: Option<Vec<u8>>,
    tone: Option<String>,
    length: Option<String>,
    platform: Option<String>,
    ai_model: Option<String>,
    user_id: Option<String>,
    include_hashtags: Option<String>,
}

impl GenerateForm {
    async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            match name.as_str() {
                "image" => form.image = Some(field.bytes().await?.to_vec()),
                "tone" => form.tone = Some(field.text().await?),
                "length" => form.length = Some(field.text().await?),
                "platform" => form.platform = Some(field.text().await?),
                "ai_model" => form.ai_model = Some(field.text().await?),
                "user_id" => form.user_id = Some(field.text().await?),
                "includeHashtags" => form.include_hashtags = Some(field.text().await?),
                _ => tracing::debug!("ignoring unknown form field {}", name),
            }
        }
        Ok(form)
    }

    fn into_request(self) -> Result<CaptionRequest, CaptionError> {
        let image = match self.image {
            Some(image) if !image.is_empty() => image,
            _ => return Err(CaptionError::Validation("No image file provided".into())),
        };

        let backend_choice = match non_empty(self.ai_model) {
            Some(v) => Some(
                Backend::from_str(&v)
                    .map_err(|_| CaptionError::Validation("Invalid AI model choice.".into()))?,
            ),
            None => None,
        };

        Ok(CaptionRequest {
            tone: Tone::parse(non_empty(self.tone).as_deref().unwrap_or("casual")),
            // the web client asks for short captions unless told otherwise
            length: Length::parse(non_empty(self.length).as_deref().unwrap_or("short")),
            platform: Platform::parse(non_empty(self.platform).as_deref().unwrap_or("general")),
            backend_choice,
            include_hashtags: self
                .include_hashtags
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("true")),
            user_id: non_empty(self.user_id),
            ..CaptionRequest::new(image)
        })
    }
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[derive(Serialize)]
struct GenerateResponse {
    status: &'static str,
    caption: String,
    platform: String,
    model: String,
    image_url: String,
}

async fn generate(
    State(ctx): State<Ctx>,
    multipart: Multipart,
) -> Result<Json<GenerateResponse>, ApiError> {
    let request = GenerateForm::read(multipart).await?.into_request()?;
    let result = ctx.generator.generate(request).await?;

    Ok(Json(GenerateResponse {
        status: "success",
        caption: result.text,
        platform: result.platform,
        model: result.model_used.to_string(),
        image_url: result.image_reference,
    }))
}

#[derive(Serialize)]
struct CaptionListResponse {
    status: &'static str,
    captions: Vec<CaptionRecord>,
}

async fn list_user_captions(
    State(ctx): State<Ctx>,
    Path(user_id): Path<String>,
) -> Result<Json<CaptionListResponse>, ApiError> {
    let captions = ctx.store.list_by_user(&user_id).await?;
    Ok(Json(CaptionListResponse {
        status: "success",
        captions,
    }))
}

#[derive(Deserialize)]
struct UpdateCaptionPayload {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
struct UpdateCaptionResponse {
    status: &'static str,
    message: &'static str,
    caption: CaptionRecord,
}

async fn update_caption(
    State(ctx): State<Ctx>,
    Path(caption_id): Path<String>,
    payload: Result<Json<UpdateCaptionPayload>, JsonRejection>,
) -> Result<Json<UpdateCaptionResponse>, ApiError> {
    let Json(payload) = payload?;
    let caption = ctx.store.update(&caption_id, &payload.text).await?;
    tracing::info!(caption_id = %caption_id, "caption updated");
    Ok(Json(UpdateCaptionResponse {
        status: "success",
        message: "Caption updated successfully",
        caption,
    }))
}

#[derive(Serialize)]
struct DeleteCaptionResponse {
    status: &'static str,
    message: &'static str,
}

async fn delete_caption(
    State(ctx): State<Ctx>,
    Path(caption_id): Path<String>,
) -> Result<Json<DeleteCaptionResponse>, ApiError> {
    ctx.store.delete(&caption_id).await?;
    tracing::info!(caption_id = %caption_id, "caption deleted");
    Ok(Json(DeleteCaptionResponse {
        status: "success",
        message: "Caption deleted successfully",
    }))
}

mod caption;
mod health;

use crate::ctx::Ctx;
use axum::{extract::DefaultBodyLimit, Router};
use tower_http::cors::{Any, CorsLayer};

pub fn get_routes(ctx: Ctx, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .allow_origin(Any);

    Router::new()
        .nest(
            "/api",
            Router::new()
                .nest("/caption", caption::get_routes())
                .merge(health::get_routes()),
        )
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(cors)
        .with_state(ctx)
}

#[cfg(test)]
mod test {
    use super::get_routes;
    use crate::ctx::Ctx;
    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        Router,
    };
    use caption_base::{
        BackendError, BackendResult, CaptionGenerator, LocalCaptioner, LocalPrompt,
        RemoteCaptioner, RemoteInstruction,
    };
    use caption_history::{CaptionStore, MemoryStore, NewCaptionRecord};
    use serde_json::{json, Value};
    use std::{sync::Arc, time::Duration};
    use tower::ServiceExt;

    const BOUNDARY: &str = "caption-test-boundary";

    struct EchoLocal;

    #[async_trait]
    impl LocalCaptioner for EchoLocal {
        async fn caption(&self, _image: Arc<[u8]>, prompt: &LocalPrompt) -> BackendResult<String> {
            Ok(format!("local {}-{}", prompt.min_tokens, prompt.max_tokens))
        }
    }

    struct FailingRemote;

    #[async_trait]
    impl RemoteCaptioner for FailingRemote {
        async fn caption(
            &self,
            _image: &[u8],
            _mime_type: &str,
            _instruction: &RemoteInstruction,
        ) -> BackendResult<String> {
            Err(BackendError::Timeout)
        }
    }

    fn app(store: Arc<MemoryStore>) -> Router {
        let generator = CaptionGenerator::new(Arc::new(EchoLocal))
            .with_remote(Arc::new(FailingRemote))
            .with_store(store.clone());
        get_routes(Ctx::new(generator, store), 1024 * 1024)
    }

    fn multipart(fields: &[(&str, &str)], image: Option<&[u8]>) -> Request<Body> {
        let mut body: Vec<u8> = vec![];
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some(image) = image {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"photo.png\"\r\nContent-Type: image/png\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(image);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method(Method::POST)
            .uri("/api/caption/generate")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn saved_record(store: &MemoryStore, caption: &str) -> String {
        let record: caption_history::CaptionRecord = NewCaptionRecord {
            user_id: "u1".into(),
            caption: caption.into(),
            platform: "general".into(),
            tone: "casual".into(),
            length: "short".into(),
            image_url: "data:image/png;base64,AQID".into(),
            model_used: "local".into(),
        }
        .into();
        let id = record.id.clone();
        store.insert(record).await.unwrap();
        id
    }

    #[test_log::test(tokio::test)]
    async fn test_health() {
        let request = Request::get("/api/health").body(Body::empty()).unwrap();
        let (status, body) = send(app(Arc::new(MemoryStore::new())), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok" }));
    }

    #[test_log::test(tokio::test)]
    async fn test_generate_general_caption() {
        let store = Arc::new(MemoryStore::new());
        let request = multipart(&[("user_id", "u1")], Some(b"\x89PNG\r\n\x1a\n0000".as_slice()));
        let (status, body) = send(app(store.clone()), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["caption"], "local 10-20");
        assert_eq!(body["platform"], "general");
        assert_eq!(body["model"], "local");
        assert!(body["image_url"]
            .as_str()
            .unwrap()
            .starts_with("data:image/png;base64,"));

        let records = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                let records = store.list_by_user("u1").await.unwrap();
                if !records.is_empty() {
                    break records;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(records[0].caption, "local 10-20");
    }

    #[test_log::test(tokio::test)]
    async fn test_generate_falls_back_when_remote_fails() {
        let request = multipart(
            &[
                ("platform", "instagram"),
                ("length", "long"),
                ("includeHashtags", "true"),
            ],
            Some(b"image bytes".as_slice()),
        );
        let (status, body) = send(app(Arc::new(MemoryStore::new())), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["model"], "remote_then_local_fallback");
        assert_eq!(body["caption"], "local 30-55");
    }

    #[test_log::test(tokio::test)]
    async fn test_generate_rejects_bad_input() {
        let cases = [
            multipart(&[("platform", "general")], None),
            multipart(&[("ai_model", "dalle")], Some(b"image bytes".as_slice())),
            multipart(
                &[("ai_model", "blip"), ("platform", "linkedin")],
                Some(b"image bytes".as_slice()),
            ),
        ];
        let mut bodies = vec![];
        for request in cases {
            let (status, body) = send(app(Arc::new(MemoryStore::new())), request).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["status"], "error");
            assert!(body["message"].as_str().is_some());
            bodies.push(body);
        }
        assert!(bodies[0].get("model").is_none());
        assert_eq!(bodies[2]["model"], "local");
    }

    #[test_log::test(tokio::test)]
    async fn test_caption_history_routes() {
        let store = Arc::new(MemoryStore::new());
        let id = saved_record(&store, "before").await;

        let request = Request::get("/api/caption/user_captions/u1")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app(store.clone()), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["captions"][0]["caption"], "before");

        let uri = format!("/api/caption/caption/{}", id);
        let (status, body) = send(
            app(store.clone()),
            json_request(Method::PUT, &uri, json!({ "text": "after" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["caption"]["caption"], "after");

        let (status, _) = send(
            app(store.clone()),
            json_request(Method::PUT, &uri, json!({ "text": "  " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let delete = || Request::delete(uri.as_str()).body(Body::empty()).unwrap();
        let (status, _) = send(app(store.clone()), delete()).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = send(app(store.clone()), delete()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], "error");

        let request = Request::delete("/api/caption/caption/not-a-uuid")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(app(store), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test_log::test(tokio::test)]
    async fn test_update_rejects_malformed_json() {
        let store = Arc::new(MemoryStore::new());
        let id = saved_record(&store, "kept").await;
        let uri = format!("/api/caption/caption/{}", id);

        let cases = [
            Request::put(uri.as_str())
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{\"text\": "))
                .unwrap(),
            json_request(Method::PUT, &uri, json!({ "text": 5 })),
            Request::put(uri.as_str())
                .body(Body::from("{\"text\": \"after\"}"))
                .unwrap(),
        ];
        let expected = [
            StatusCode::BAD_REQUEST,
            StatusCode::UNPROCESSABLE_ENTITY,
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
        ];
        for (request, expected) in cases.into_iter().zip(expected) {
            let (status, body) = send(app(store.clone()), request).await;
            assert_eq!(status, expected);
            assert_eq!(body["status"], "error");
            assert!(body["message"].as_str().unwrap().starts_with("invalid json body"));
        }
        assert_eq!(store.list_by_user("u1").await.unwrap()[0].caption, "kept");
    }
}

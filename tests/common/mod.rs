use std::io::{Cursor, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use axum::body::Body;
use axum::http::{Method, Request};
use axum::Router;
use doctrail::config::AppConfig;
use doctrail::models::{NewUser, Role, User};
use doctrail::render::RenderPipeline;
use doctrail::routes;
use doctrail::state::AppState;
use doctrail::storage::{FileStore, LocalFileStore};
use doctrail::store::EntityStore;
use http_body_util::BodyExt;
use serde::Serialize;
use tempfile::TempDir;
use tower::util::ServiceExt;
use uuid::Uuid;
use zip::write::SimpleFileOptions;

pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

pub struct TestApp {
    pub state: AppState,
    router: Router,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let config = AppConfig {
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            data_dir: dir.path().join("data"),
            uploads_dir: dir.path().join("uploads"),
            pdf_dir: dir.path().join("pdfs"),
            render_timeout_secs: 10,
            cors_allowed_origin: None,
            seed_demo_data: false,
        };

        let store = Arc::new(EntityStore::open(&config.data_dir).await?);
        let uploads: Arc<dyn FileStore> =
            Arc::new(LocalFileStore::new(&config.uploads_dir).await?);
        let artifacts: Arc<dyn FileStore> = Arc::new(LocalFileStore::new(&config.pdf_dir).await?);
        let renderer = Arc::new(RenderPipeline::new(Duration::from_secs(
            config.render_timeout_secs,
        )));

        let state = AppState::new(store, uploads, artifacts, renderer, config);
        let router = routes::create_router(state.clone());

        Ok(Self {
            state,
            router,
            _dir: dir,
        })
    }

    pub async fn insert_user(&self, username: &str, role: Role) -> Result<User> {
        self.insert_user_with_access(username, role, false).await
    }

    #[allow(dead_code)]
    pub async fn insert_user_with_access(
        &self,
        username: &str,
        role: Role,
        master_copy_access: bool,
    ) -> Result<User> {
        let full_name = username
            .split('@')
            .next()
            .unwrap_or(username)
            .replace('.', " ");
        let user = self
            .state
            .store
            .create_user(NewUser {
                username: username.to_string(),
                password: "password".to_string(),
                role,
                full_name,
                master_copy_access,
            })
            .await
            .map_err(|err| anyhow!("failed to insert user: {err}"))?;
        Ok(user)
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
    ) -> Result<hyper::Response<Body>> {
        let body = serde_json::to_vec(payload)?;
        let request = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(body))?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    pub async fn get(&self, path: &str) -> Result<hyper::Response<Body>> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(path)
            .body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    #[allow(dead_code)]
    pub async fn delete(&self, path: &str) -> Result<hyper::Response<Body>> {
        let request = Request::builder()
            .method(Method::DELETE)
            .uri(path)
            .body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    /// Multipart upload with the document metadata fields the create and
    /// resubmit endpoints expect.
    pub async fn upload(
        &self,
        path: &str,
        filename: &str,
        content_type: &str,
        data: &[u8],
        fields: &[(&str, String)],
    ) -> Result<hyper::Response<Body>> {
        let boundary = format!("boundary-{}", Uuid::new_v4());
        let mut body = Vec::new();
        body.extend(format!("--{boundary}\r\n").as_bytes());
        body.extend(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n"
            )
            .as_bytes(),
        );
        body.extend(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
        body.extend(data);
        body.extend(b"\r\n");

        for (name, value) in fields {
            body.extend(format!("--{boundary}\r\n").as_bytes());
            body.extend(
                format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
            );
            body.extend(value.as_bytes());
            body.extend(b"\r\n");
        }

        body.extend(format!("--{boundary}--\r\n").as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }
}

#[allow(dead_code)]
pub async fn body_to_vec(body: Body) -> Result<Vec<u8>> {
    let collected = body
        .collect()
        .await
        .map_err(|err| anyhow!("failed to read response body: {err}"))?;
    Ok(collected.to_bytes().to_vec())
}

pub async fn body_to_json(body: Body) -> Result<serde_json::Value> {
    let bytes = body_to_vec(body).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Builds a minimal but valid `.docx` archive holding the given paragraphs.
pub fn sample_docx(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t>{p}</w:t></w:r></w:p>"))
        .collect();
    let xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
         <w:body>{body}</w:body></w:document>"
    );

    let mut cursor = Cursor::new(Vec::new());
    let mut writer = zip::ZipWriter::new(&mut cursor);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    writer
        .start_file("word/document.xml", options)
        .expect("start docx entry");
    writer.write_all(xml.as_bytes()).expect("write docx body");
    writer.finish().expect("finish docx archive");
    cursor.into_inner()
}

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Uploads larger than this are rejected at the boundary.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_host: String,
    pub server_port: u16,
    pub data_dir: PathBuf,
    pub uploads_dir: PathBuf,
    pub pdf_dir: PathBuf,
    pub render_timeout_secs: u64,
    pub cors_allowed_origin: Option<String>,
    pub seed_demo_data: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("SERVER_PORT must be a valid u16")?;
        let data_dir = env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));
        let uploads_dir = env::var("UPLOADS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("uploads"));
        let pdf_dir = env::var("PDF_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("pdfs"));
        let render_timeout_secs = env::var("RENDER_TIMEOUT_SECS")
            .unwrap_or_else(|_| "45".to_string())
            .parse()
            .context("RENDER_TIMEOUT_SECS must be an integer")?;
        let cors_allowed_origin = env::var("CORS_ALLOWED_ORIGIN").ok();
        let seed_demo_data = env::var("SEED_DEMO_DATA")
            .map(|v| bool_flag(&v))
            .unwrap_or(true);

        Ok(Self {
            server_host,
            server_port,
            data_dir,
            uploads_dir,
            pdf_dir,
            render_timeout_secs,
            cors_allowed_origin,
            seed_demo_data,
        })
    }
}

fn bool_flag(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

use std::env;
use std::time::Duration;

const DEFAULT_PORT: &str = "8081";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_INFERENCE_TIMEOUT_SECS: u64 = 30;

/// Runtime configuration, read once at startup from the environment
/// (with `.env` support via dotenv).
#[derive(Debug, Clone)]
pub struct Config {
    pub model_path: String,
    pub advice_path: String,
    pub static_dir: String,
    pub bind_address: String,
    pub max_upload_bytes: usize,
    pub inference_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        let model_path =
            env::var("MODEL_PATH").unwrap_or_else(|_| "models/tomato_disease.pt".to_string());

        let advice_path = env::var("ADVICE_PATH").unwrap_or_else(|_| {
            if let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") {
                format!("{}/../config/advice.yaml", manifest_dir)
            } else {
                "/usr/src/app/config/advice.yaml".to_string()
            }
        });

        let static_dir = env::var("STATIC_DIR").unwrap_or_else(|_| {
            if let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") {
                format!("{}/../static", manifest_dir)
            } else {
                "/usr/src/app/static".to_string()
            }
        });

        let port = env::var("PORT").unwrap_or_else(|_| DEFAULT_PORT.to_string());
        let bind_address = format!("0.0.0.0:{}", port);

        let max_upload_bytes = env::var("MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

        let timeout_secs = env::var("INFERENCE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_INFERENCE_TIMEOUT_SECS);

        Self {
            model_path,
            advice_path,
            static_dir,
            bind_address,
            max_upload_bytes,
            inference_timeout: Duration::from_secs(timeout_secs),
        }
    }
}

use std::env;
use std::path::PathBuf;

/// TorchScript artifact produced by the training pipeline. Treated as an
/// opaque immutable blob; fetched once and held for the process lifetime.
pub const DEFAULT_MODEL_PATH: &str = "dogs_vs_cats_production_model.pt";

pub const DEFAULT_MODEL_REMOTE_URL: &str =
    "https://drive.google.com/uc?id=1NUmowM-IX9yRhsNad1G42042YAEzYVig&export=download";

#[derive(Clone)]
pub struct AppConfig {
    pub model_path: PathBuf,
    pub model_remote_url: String,
    pub port: String,
    pub frontend_dir: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let model_path = env::var("MODEL_PATH")
            .unwrap_or_else(|_| DEFAULT_MODEL_PATH.to_string())
            .into();
        let model_remote_url =
            env::var("MODEL_REMOTE_URL").unwrap_or_else(|_| DEFAULT_MODEL_REMOTE_URL.to_string());
        let port = env::var("PORT").unwrap_or_else(|_| "8000".to_string());

        let frontend_dir = if let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") {
            format!("{}/../frontend/dist", manifest_dir)
        } else {
            "/usr/src/app/frontend/dist".to_string()
        };

        Self {
            model_path,
            model_remote_url,
            port,
            frontend_dir,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_address_uses_configured_port() {
        let config = AppConfig {
            model_path: DEFAULT_MODEL_PATH.into(),
            model_remote_url: DEFAULT_MODEL_REMOTE_URL.to_string(),
            port: "9001".to_string(),
            frontend_dir: String::new(),
        };
        assert_eq!(config.bind_address(), "0.0.0.0:9001");
    }
}

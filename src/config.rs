//! Service configuration

use crate::preprocessing::EncoderConfig;
use crate::training::Hyperparameters;

/// Locations and defaults shared by the CLI and the HTTP server.
///
/// `Default` reads the environment; CLI flags override individual fields.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Training data source id
    pub train_data: String,
    /// Evaluation data source id
    pub eval_data: String,
    /// Blob key of the model artifact
    pub model_path: String,
    /// Label column
    pub target: String,
    pub host: String,
    pub port: u16,
    pub encoder: EncoderConfig,
    pub hyperparameters: Hyperparameters,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            train_data: env_or("CHURN_TRAIN_DATA", "churn-bigml-80.csv"),
            eval_data: env_or("CHURN_EVAL_DATA", "churn-bigml-20.csv"),
            model_path: env_or("CHURN_MODEL_PATH", "model.bin"),
            target: env_or("CHURN_TARGET", "Churn"),
            host: env_or("API_HOST", "0.0.0.0"),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            encoder: EncoderConfig::default(),
            hyperparameters: Hyperparameters::default(),
        }
    }
}

impl ServiceConfig {
    pub fn with_train_data(mut self, id: impl Into<String>) -> Self {
        self.train_data = id.into();
        self
    }

    pub fn with_eval_data(mut self, id: impl Into<String>) -> Self {
        self.eval_data = id.into();
        self
    }

    pub fn with_model_path(mut self, key: impl Into<String>) -> Self {
        self.model_path = key.into();
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub fn with_hyperparameters(mut self, params: Hyperparameters) -> Self {
        self.hyperparameters = params;
        self
    }

    pub fn with_encoder(mut self, encoder: EncoderConfig) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

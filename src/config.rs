//! Environment-driven configuration.
//!
//! All credentials are validated at process start; a missing variable is
//! fatal and every missing name is reported in one pass.

use std::env;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variables: {}", .0.join(", "))]
    MissingVars(Vec<String>),
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },
}

/// Which generation provider answers queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationBackend {
    Groq,
    Gemini,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub pinecone_api_key: String,
    pub pinecone_environment: String,
    pub pinecone_index: String,
    pub groq_api_key: Option<String>,
    pub generation_backend: GenerationBackend,
    /// Deploy environment label, reported by `/health`.
    pub environment: String,
    pub frontend_url: String,
    pub port: u16,
    pub scraped_data_path: PathBuf,
    pub log_dir: PathBuf,
}

impl Config {
    /// Reads configuration from the environment (after `dotenvy` has loaded
    /// any `.env` file). Fails fast listing all missing credentials.
    pub fn from_env() -> Result<Self, ConfigError> {
        let generation_backend = match env::var("LLM_PROVIDER").ok().as_deref() {
            None | Some("groq") => GenerationBackend::Groq,
            Some("gemini") => GenerationBackend::Gemini,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    name: "LLM_PROVIDER".into(),
                    value: other.into(),
                })
            }
        };

        let mut missing = Vec::new();
        let gemini_api_key = require("GEMINI_API_KEY", &mut missing);
        let pinecone_api_key = require("PINECONE_API_KEY", &mut missing);
        let pinecone_environment = require("PINECONE_ENVIRONMENT", &mut missing);
        let pinecone_index = require("PINECONE_INDEX", &mut missing);

        let groq_api_key = non_empty(env::var("GROQ_API_KEY").ok());
        if generation_backend == GenerationBackend::Groq && groq_api_key.is_none() {
            missing.push("GROQ_API_KEY".to_string());
        }

        if !missing.is_empty() {
            return Err(ConfigError::MissingVars(missing));
        }

        let port = match env::var("PORT") {
            Ok(raw) => raw.parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                name: "PORT".into(),
                value: raw,
            })?,
            Err(_) => 8000,
        };

        Ok(Self {
            gemini_api_key: gemini_api_key.unwrap_or_default(),
            pinecone_api_key: pinecone_api_key.unwrap_or_default(),
            pinecone_environment: pinecone_environment.unwrap_or_default(),
            pinecone_index: pinecone_index.unwrap_or_default(),
            groq_api_key,
            generation_backend,
            environment: env::var("ENV").unwrap_or_else(|_| "development".to_string()),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            port,
            scraped_data_path: env::var("SCRAPED_DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("scrapers/data/scraped_pages.json")),
            log_dir: env::var("LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("logs")),
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

fn require(name: &str, missing: &mut Vec<String>) -> Option<String> {
    match non_empty(env::var(name).ok()) {
        Some(value) => Some(value),
        None => {
            missing.push(name.to_string());
            None
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

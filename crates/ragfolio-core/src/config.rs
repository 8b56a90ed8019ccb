use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::language::Language;
use crate::policy::RetrievalPolicy;
use crate::types::Category;

pub struct Config {
    figment: Figment,
    base_dir: PathBuf,
    env_name: String,
}

impl Config {
    /// Load from the current directory using `RUST_ENV` (default `dev`).
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Path::new("."))
    }

    pub fn load_from(base_dir: &Path) -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_for_env(base_dir, &env_name)
    }

    /// Layering: defaults, `config.toml`, `config.<env>.toml`, `HF_TOKEN`, `APP_*`.
    pub fn load_for_env(base_dir: &Path, env_name: &str) -> anyhow::Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(base_dir.join("config.toml")));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file(base_dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(base_dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(base_dir.join("config.test.toml"))),
            _ => {}
        }
        if let Ok(token) = env::var("HF_TOKEN") {
            figment = figment.merge(Serialized::default("providers.hf_token", token));
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment, base_dir: base_dir.to_path_buf(), env_name: env_name.to_string() };
        config.validate_for_env(&config.settings()?)?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Fully resolved settings: policy validated, index uri made absolute-or-based.
    pub fn settings(&self) -> Result<Settings> {
        let mut settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.retrieval.validate()?;
        settings.index.uri = resolve_with_base(&self.base_dir, &settings.index.uri)
            .to_string_lossy()
            .into_owned();
        Ok(settings)
    }

    pub fn env_name(&self) -> &str {
        &self.env_name
    }

    fn validate_for_env(&self, settings: &Settings) -> Result<()> {
        match self.env_name.as_str() {
            "prod" | "production" => {
                let needs_token = settings.providers.embedding_backend == EmbeddingBackend::Hf;
                if needs_token && settings.providers.hf_token.as_deref().map_or(true, str::is_empty) {
                    return Err(Error::InvalidConfig("providers.hf_token (or HF_TOKEN) is required in production".into()));
                }
            }
            "dev" | "development" | "test" | "testing" => {}
            _ => {}
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub retrieval: RetrievalPolicy,
    pub providers: ProviderSettings,
    pub index: IndexSettings,
    pub knowledge: KnowledgeSettings,
    pub service: ServiceSettings,
    pub classifier: ClassifierSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    Hf,
    Local,
    Hash,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub hf_token: Option<String>,
    pub hf_base_url: String,
    pub embedding_backend: EmbeddingBackend,
    pub embedding_model: String,
    pub embedding_dim: usize,
    pub local_model_dir: Option<String>,
    pub translation_model: String,
    pub canonical_language: Language,
    pub request_timeout_ms: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            hf_token: None,
            hf_base_url: "https://router.huggingface.co/hf-inference".to_string(),
            embedding_backend: EmbeddingBackend::Hf,
            embedding_model: "sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2".to_string(),
            embedding_dim: 384,
            local_model_dir: None,
            translation_model: "facebook/nllb-200-distilled-600M".to_string(),
            canonical_language: Language::English,
            request_timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    pub uri: String,
    pub table: String,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self { uri: "data/lancedb".to_string(), table: "portfolio_chunks".to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeSettings {
    /// Hugging Face dataset holding the static knowledge base; unset means fallback text only.
    pub dataset_id: Option<String>,
    pub datasets_base_url: String,
    pub ttl_secs: u64,
    pub fallback_text: String,
}

impl Default for KnowledgeSettings {
    fn default() -> Self {
        Self {
            dataset_id: None,
            datasets_base_url: "https://datasets-server.huggingface.co".to_string(),
            ttl_secs: 30 * 60,
            fallback_text: "No relevant information found.".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    pub retrieve_timeout_ms: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self { retrieve_timeout_ms: 4_000 }
    }
}

/// Per-category keyword lists that replace the built-in vocabulary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierSettings {
    pub keywords: BTreeMap<Category, Vec<String>>,
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}

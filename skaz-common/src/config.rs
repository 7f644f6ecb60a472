//! Service configuration and its resolution
//!
//! Resolution priority (highest first):
//! 1. Command-line arguments (applied by the binary after loading)
//! 2. Environment variables
//! 3. TOML config file
//! 4. Compiled defaults
//!
//! A missing TOML file is not an error: a warning is logged and defaults are
//! used. A TOML file that exists but cannot be parsed is a configuration error.

use crate::{Error, Language, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

/// Environment variable naming an explicit TOML config path
pub const CONFIG_PATH_ENV: &str = "SKAZ_CONFIG";

/// Complete service configuration, passed into the pipeline at construction
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoryConfig {
    /// Directory receiving `{id}.md` / `{id}.wav` artifact pairs
    pub output_dir: PathBuf,
    /// Language used when none is requested and detection is inconclusive
    pub default_lang: Language,
    /// How a translation is combined with the generated story
    pub translation_mode: TranslationMode,
    /// HTTP status used for pipeline failures
    pub error_status: ErrorStatusPolicy,
    /// Echo plan and facts excerpts in successful responses
    pub include_excerpts: bool,
    /// Maximum characters of plan / facts echoed back
    pub excerpt_chars: usize,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub sources: SourcesConfig,
    pub llm: LlmConfig,
    pub translation: TranslationConfig,
    pub tts: TtsConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset
    pub level: String,
}

/// Knowledge source endpoints
///
/// `{lang}` in a URL is replaced with the two-letter language code.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub wikipedia_url: String,
    pub wikivoyage_url: String,
    pub nominatim_url: String,
    pub geocoding_enabled: bool,
    pub user_agent: String,
    pub request_timeout_secs: u64,
}

/// Language-model backend configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    /// Ollama server
    pub base_url: String,
    /// Ollama model tag
    pub model: String,
    pub timeout_secs: u64,
    /// OpenAI-compatible API root, up to and including `/v1`
    pub openai_url: String,
    pub openai_model: String,
    /// Bearer token for the hosted backend (`OPENAI_API_KEY`)
    pub api_key: Option<String>,
}

/// Translation service endpoint (LibreTranslate-compatible)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

/// Speech synthesis backend configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    pub backend: TtsBackend,
    /// Piper executable (name on PATH or absolute path)
    pub piper_bin: PathBuf,
    /// Voice data root; relative voice paths are resolved against it
    pub voice_dir: PathBuf,
    pub voice_en: PathBuf,
    pub voice_ru: PathBuf,
    pub timeout_secs: u64,
    /// Base URL of the networked TTS server (remote backend only)
    pub remote_url: String,
}

/// Translation policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationMode {
    /// The translation replaces the generated story
    Replace,
    /// The translation is appended after a `---` separator
    Append,
}

/// HTTP status policy for pipeline failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorStatusPolicy {
    /// Always 200, failure reported in body (existing clients rely on this)
    Legacy,
    /// 5xx status per failure kind, same body
    Mapped,
}

/// Language-model backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackend {
    /// Local Ollama server, streamed NDJSON
    Ollama,
    /// Hosted chat-completions API
    OpenAi,
}

/// Speech synthesis backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TtsBackend {
    /// Local Piper executable, WAV output
    Piper,
    /// Networked TTS API, MP3 output
    Remote,
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("data/output"),
            default_lang: Language::En,
            translation_mode: TranslationMode::Replace,
            error_status: ErrorStatusPolicy::Legacy,
            include_excerpts: true,
            excerpt_chars: 500,
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            sources: SourcesConfig::default(),
            llm: LlmConfig::default(),
            translation: TranslationConfig::default(),
            tts: TtsConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "skaz_gen=info,skaz_common=info,tower_http=info".to_string(),
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            wikipedia_url: "https://{lang}.wikipedia.org/w/api.php".to_string(),
            wikivoyage_url: "https://{lang}.wikivoyage.org/wiki".to_string(),
            nominatim_url: "https://nominatim.openstreetmap.org/search".to_string(),
            geocoding_enabled: true,
            user_agent: format!("skaz/{} (story generator)", env!("CARGO_PKG_VERSION")),
            request_timeout_secs: 15,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: LlmBackend::Ollama,
            base_url: "http://ollama:11434".to_string(),
            model: "llama3:8b".to_string(),
            timeout_secs: 600,
            openai_url: "https://api.openai.com/v1".to_string(),
            openai_model: "gpt-4o".to_string(),
            api_key: None,
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            url: "http://libretranslate:5000".to_string(),
            api_key: None,
            timeout_secs: 60,
        }
    }
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            backend: TtsBackend::Piper,
            piper_bin: PathBuf::from("piper"),
            voice_dir: PathBuf::from("/usr/share/piper-voices"),
            voice_en: PathBuf::from("en_US-lessac-medium.onnx"),
            voice_ru: PathBuf::from("ru_RU-irina-medium.onnx"),
            timeout_secs: 300,
            remote_url: "http://tts:5002".to_string(),
        }
    }
}

impl StoryConfig {
    /// Load configuration: TOML (if present) overlaid with environment variables
    ///
    /// `path` takes precedence over `SKAZ_CONFIG`, which takes precedence over
    /// the per-user default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let resolved = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from))
            .or_else(default_config_path);

        let mut config = match resolved {
            Some(p) if p.exists() => {
                let content = std::fs::read_to_string(&p)
                    .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
                info!("Loaded configuration from {}", p.display());
                Self::from_toml_str(&content)?
            }
            Some(p) => {
                warn!("Config file {} not found; using defaults", p.display());
                Self::default()
            }
            None => {
                warn!("No config file location available; using defaults");
                Self::default()
            }
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a TOML document; absent keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Overlay environment overrides using `lookup` (usually `std::env::var`)
    ///
    /// Empty values are ignored. Unparseable values are configuration errors.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("SKAZ_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(v);
        }
        if let Some(v) = get("SKAZ_DEFAULT_LANG") {
            self.default_lang = Language::from_str(&v)
                .map_err(|e| Error::Config(format!("SKAZ_DEFAULT_LANG: {}", e)))?;
        }
        if let Some(v) = get("SKAZ_TRANSLATION_MODE") {
            self.translation_mode = parse_env("SKAZ_TRANSLATION_MODE", &v)?;
        }
        if let Some(v) = get("SKAZ_ERROR_STATUS") {
            self.error_status = parse_env("SKAZ_ERROR_STATUS", &v)?;
        }
        if let Some(v) = get("SKAZ_LLM_BACKEND") {
            self.llm.backend = parse_env("SKAZ_LLM_BACKEND", &v)?;
        }
        if let Some(v) = get("OLLAMA_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Some(v) = get("OLLAMA_MODEL") {
            self.llm.model = v;
        }
        if let Some(v) = get("OPENAI_BASE_URL") {
            self.llm.openai_url = v;
        }
        if let Some(v) = get("OPENAI_MODEL") {
            self.llm.openai_model = v;
        }
        if let Some(v) = get("OPENAI_API_KEY") {
            self.llm.api_key = Some(v);
        }
        if let Some(v) = get("TRANSLATE_URL") {
            self.translation.url = v;
        }
        if let Some(v) = get("TRANSLATE_API_KEY") {
            self.translation.api_key = Some(v);
        }
        if let Some(v) = get("SKAZ_TTS_BACKEND") {
            self.tts.backend = parse_env("SKAZ_TTS_BACKEND", &v)?;
        }
        if let Some(v) = get("PIPER_BIN") {
            self.tts.piper_bin = PathBuf::from(v);
        }
        if let Some(v) = get("PIPER_DATA_DIR") {
            self.tts.voice_dir = PathBuf::from(v);
        }
        if let Some(v) = get("PIPER_VOICE_EN") {
            self.tts.voice_en = PathBuf::from(v);
        }
        if let Some(v) = get("PIPER_VOICE_RU") {
            self.tts.voice_ru = PathBuf::from(v);
        }
        if let Some(v) = get("TTS_URL") {
            self.tts.remote_url = v;
        }
        Ok(())
    }
}

impl TtsConfig {
    /// Configured default voice for `lang`, before resolution against the voice root
    pub fn default_voice(&self, lang: Language) -> &Path {
        match lang {
            Language::En => &self.voice_en,
            Language::Ru => &self.voice_ru,
        }
    }
}

/// `~/.config/skaz/config.toml` on Linux, the platform equivalent elsewhere
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("skaz").join("config.toml"))
}

/// Parse a lowercase enum keyword from an environment value
fn parse_env<T: serde::de::DeserializeOwned>(key: &str, value: &str) -> Result<T> {
    let normalized = value.trim().to_ascii_lowercase();
    T::deserialize(serde::de::value::StrDeserializer::<serde::de::value::Error>::new(
        &normalized,
    ))
    .map_err(|e| Error::Config(format!("{}: {}", key, e)))
}

/// Substitute `{lang}` in an endpoint template
pub fn expand_lang(template: &str, lang: Language) -> String {
    template.replace("{lang}", lang.as_str())
}

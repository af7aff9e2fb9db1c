//! # embedding-cache
//!
//! Stable on-disk locations for cached text embeddings, derived from the
//! dataset and embedding model named in an experiment config.
//!
//! ```rust
//! use embedding_cache::{cache_filename, DatasetConfig, EmbeddingCacheConfig, EmbeddingConfig};
//!
//! let cfg = EmbeddingCacheConfig {
//!     dataset: DatasetConfig { name: "reviews".into(), ..Default::default() },
//!     embedding: EmbeddingConfig { name: "org/model".into(), ..Default::default() },
//!     ..Default::default()
//! };
//! assert_eq!(cache_filename(&cfg), "reviews__org__model.npz");
//! ```

mod layout;

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

pub use layout::CacheLayout;

/// Environment variable overriding the cache directory.
pub const CACHE_DIR_ENV: &str = "CEBRA_EMBEDDING_CACHE_DIR";

/// Environment variable selecting the cache layout.
pub const CACHE_LAYOUT_ENV: &str = "CEBRA_EMBEDDING_CACHE_LAYOUT";

/// The parts of an experiment config that determine the cache location.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmbeddingCacheConfig {
    #[serde(default)]
    pub paths: PathsConfig,
    pub dataset: DatasetConfig,
    pub embedding: EmbeddingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_cache_dir")]
    pub embedding_cache_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            embedding_cache_dir: default_cache_dir(),
        }
    }
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("embedding_cache")
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatasetConfig {
    pub name: String,
    #[serde(default)]
    pub shuffle: bool,
    #[serde(default)]
    pub shuffle_seed: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmbeddingConfig {
    pub name: String,
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl EmbeddingConfig {
    /// `model_name` when set and non-empty, else `name`.
    pub fn model(&self) -> &str {
        self.model_name
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(&self.name)
    }

    /// Directory grouping for the hierarchical layout.
    pub fn family(&self) -> &str {
        match self.kind.as_deref() {
            Some("hf_transformer" | "sentence_transformer") => "lm",
            Some(kind) if !kind.is_empty() => kind,
            _ => "unknown",
        }
    }
}

// ---------------------------------------------------------------------------
// Path building
// ---------------------------------------------------------------------------

/// Cache directory, honouring [`CACHE_DIR_ENV`].
pub fn resolve_cache_dir(cfg: &EmbeddingCacheConfig) -> PathBuf {
    cache_dir_with(cfg, std::env::var(CACHE_DIR_ENV).ok().as_deref(), home_dir().as_deref())
}

/// Stable file name built from the dataset and model identifiers.
pub fn cache_filename(cfg: &EmbeddingCacheConfig) -> String {
    let safe_model = cfg.embedding.model().replace('/', "__");
    let mut filename = format!("{}__{safe_model}", cfg.dataset.name);
    if cfg.dataset.shuffle {
        match cfg.dataset.shuffle_seed {
            Some(seed) => filename.push_str(&format!("__seed{seed}")),
            None => filename.push_str("__shuffle"),
        }
    }
    filename.push_str(".npz");
    filename
}

/// Full path of the cached embedding file.
pub fn cache_path(cfg: &EmbeddingCacheConfig) -> PathBuf {
    let layout = CacheLayout::from_env_value(std::env::var(CACHE_LAYOUT_ENV).ok().as_deref());
    cache_path_with(&resolve_cache_dir(cfg), cfg, layout)
}

/// [`resolve_cache_dir`] with the environment passed in.
pub fn cache_dir_with(
    cfg: &EmbeddingCacheConfig,
    env_dir: Option<&str>,
    home: Option<&Path>,
) -> PathBuf {
    let base = match env_dir.filter(|d| !d.is_empty()) {
        Some(dir) => PathBuf::from(dir),
        None => cfg.paths.embedding_cache_dir.clone(),
    };
    expand_home(&base, home)
}

/// [`cache_path`] with the directory and layout already resolved.
pub fn cache_path_with(dir: &Path, cfg: &EmbeddingCacheConfig, layout: CacheLayout) -> PathBuf {
    let filename = cache_filename(cfg);
    let path = match layout {
        CacheLayout::Flat => dir.join(filename),
        CacheLayout::Hierarchical => dir
            .join(cfg.embedding.family())
            .join(cfg.embedding.model())
            .join(filename),
    };
    debug!(path = %path.display(), ?layout, "resolved embedding cache path");
    path
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

/// Replace a leading `~` component with `home`.
fn expand_home(path: &Path, home: Option<&Path>) -> PathBuf {
    match (path.strip_prefix("~"), home) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(yaml: &str) -> EmbeddingCacheConfig {
        serde_yml::from_str(yaml).expect("test config should parse")
    }

    #[test]
    fn filename_replaces_model_slashes() {
        let cfg = config(
            r#"
dataset: {name: imdb}
embedding: {name: sbert, model_name: sentence-transformers/all-MiniLM-L6-v2}
"#,
        );
        assert_eq!(
            cache_filename(&cfg),
            "imdb__sentence-transformers__all-MiniLM-L6-v2.npz"
        );
    }

    #[test]
    fn filename_falls_back_to_embedding_name() {
        let cfg = config(
            r#"
dataset: {name: imdb}
embedding: {name: tfidf, model_name: ""}
"#,
        );
        assert_eq!(cache_filename(&cfg), "imdb__tfidf.npz");
    }

    #[test]
    fn filename_records_shuffle() {
        let seeded = config(
            r#"
dataset: {name: imdb, shuffle: true, shuffle_seed: 7}
embedding: {name: tfidf}
"#,
        );
        assert_eq!(cache_filename(&seeded), "imdb__tfidf__seed7.npz");

        let unseeded = config(
            r#"
dataset: {name: imdb, shuffle: true}
embedding: {name: tfidf}
"#,
        );
        assert_eq!(cache_filename(&unseeded), "imdb__tfidf__shuffle.npz");

        let seed_without_shuffle = config(
            r#"
dataset: {name: imdb, shuffle_seed: 7}
embedding: {name: tfidf}
"#,
        );
        assert_eq!(cache_filename(&seed_without_shuffle), "imdb__tfidf.npz");
    }

    #[test]
    fn cache_dir_prefers_environment() {
        let cfg = config(
            r#"
paths: {embedding_cache_dir: /data/cache}
dataset: {name: d}
embedding: {name: e}
"#,
        );
        assert_eq!(cache_dir_with(&cfg, None, None), PathBuf::from("/data/cache"));
        assert_eq!(
            cache_dir_with(&cfg, Some("/scratch"), None),
            PathBuf::from("/scratch")
        );
        assert_eq!(cache_dir_with(&cfg, Some(""), None), PathBuf::from("/data/cache"));
    }

    #[test]
    fn cache_dir_defaults_and_expands_home() {
        let cfg = config("dataset: {name: d}\nembedding: {name: e}");
        assert_eq!(cache_dir_with(&cfg, None, None), PathBuf::from("embedding_cache"));
        assert_eq!(
            cache_dir_with(&cfg, Some("~/cache"), Some(Path::new("/home/ana"))),
            PathBuf::from("/home/ana/cache")
        );
    }

    #[test]
    fn flat_and_hierarchical_paths() {
        let cfg = config(
            r#"
dataset: {name: imdb}
embedding: {name: e5, model_name: intfloat/e5-base, type: hf_transformer}
"#,
        );
        let dir = Path::new("/cache");
        assert_eq!(
            cache_path_with(dir, &cfg, CacheLayout::Flat),
            PathBuf::from("/cache/imdb__intfloat__e5-base.npz")
        );
        assert_eq!(
            cache_path_with(dir, &cfg, CacheLayout::Hierarchical),
            PathBuf::from("/cache/lm/intfloat/e5-base/imdb__intfloat__e5-base.npz")
        );
    }

    #[test]
    fn embedding_family() {
        let mut embedding = EmbeddingConfig {
            name: "x".into(),
            ..Default::default()
        };
        assert_eq!(embedding.family(), "unknown");
        embedding.kind = Some("sentence_transformer".into());
        assert_eq!(embedding.family(), "lm");
        embedding.kind = Some("tfidf".into());
        assert_eq!(embedding.family(), "tfidf");
    }
}

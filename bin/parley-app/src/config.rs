//! App configuration, loaded from environment variables at startup.

/// Runtime configuration for parley-app.
///
/// Every field has a sensible default so the app works out-of-the-box
/// without any environment variables set.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `tracing` filter string, e.g. `"info"` or `"debug,parley_engine=trace"`.
    pub log_level: String,

    /// Hub repository the GGUF weight files are fetched from.
    pub weights_repo: String,

    /// Hub repository the sentence-embedding model is fetched from.
    pub embedding_repo: String,

    /// Initial retrieval-data directory shown in the sidebar.
    pub rag_dir: String,
}

impl AppConfig {
    /// Build [`AppConfig`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            log_level: env_or("PARLEY_LOG", "info"),
            weights_repo: env_or("PARLEY_MODEL_REPO", parley_hub::DEFAULT_WEIGHTS_REPO),
            embedding_repo: env_or("PARLEY_EMBED_REPO", parley_hub::DEFAULT_EMBEDDING_REPO),
            rag_dir: env_or("PARLEY_RAG_DIR", "./ragdata"),
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_environment() {
        let cfg = AppConfig::from_env();
        assert!(!cfg.log_level.is_empty());
        assert_eq!(cfg.weights_repo, parley_hub::DEFAULT_WEIGHTS_REPO);
    }
}

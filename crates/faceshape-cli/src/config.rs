use anyhow::{Context, Result};
use faceshape_core::ShapeConfig;
use std::path::{Path, PathBuf};

/// Resolve the effective classifier configuration.
///
/// Order: `--config` path, else `FACESHAPE_CONFIG`, else built-in defaults;
/// then `FACESHAPE_*` scalar overrides; then validation.
pub fn resolve(path: Option<&Path>) -> Result<ShapeConfig> {
    resolve_with(path, |key| std::env::var(key).ok())
}

fn resolve_with(path: Option<&Path>, lookup: impl Fn(&str) -> Option<String>) -> Result<ShapeConfig> {
    let path: Option<PathBuf> = path
        .map(Path::to_path_buf)
        .or_else(|| lookup("FACESHAPE_CONFIG").map(PathBuf::from));

    let mut config = match &path {
        Some(p) => ShapeConfig::load(p).with_context(|| format!("loading {}", p.display()))?,
        None => ShapeConfig::default(),
    };

    apply_env_overrides(&mut config, &lookup);
    config.validate().context("invalid face-shape configuration")?;
    Ok(config)
}

/// Override individual scalars from `FACESHAPE_*` variables.
fn apply_env_overrides(config: &mut ShapeConfig, lookup: &impl Fn(&str) -> Option<String>) {
    config.ema_alpha = env_f64(lookup, "FACESHAPE_EMA_ALPHA", config.ema_alpha);
    config.sigma = env_f64(lookup, "FACESHAPE_SIGMA", config.sigma);
    config.min_confidence = env_f64(lookup, "FACESHAPE_MIN_CONFIDENCE", config.min_confidence);
    config.softmax_eps = env_f64(lookup, "FACESHAPE_SOFTMAX_EPS", config.softmax_eps);
    config.last_result_decay = env_f64(lookup, "FACESHAPE_LAST_RESULT_DECAY", config.last_result_decay);
}

fn env_f64(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: f64) -> f64 {
    match lookup(key) {
        None => default,
        Some(v) => v.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %v, "ignoring unparsable override");
            default
        }),
    }
}

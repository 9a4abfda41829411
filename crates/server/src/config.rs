use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::Deserialize;
use tracing::warn;

const DEFAULT_CONFIG_PATH: &str = "server.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendMode {
    /// Fabricated payloads with random failure injection.
    Simulated,
    /// Relay JSON emitted by the placeholder scripts.
    Scripts,
}

impl BackendMode {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "simulated" | "simulation" => Some(Self::Simulated),
            "scripts" | "script" => Some(Self::Scripts),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_bind: String,
    pub upload_dir: PathBuf,
    pub backend_mode: BackendMode,
    pub scripts_dir: PathBuf,
    pub script_interpreter: Option<String>,
    pub simulated_failure_rate: f64,
    pub max_upload_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:5000".into(),
            upload_dir: PathBuf::from("uploads"),
            backend_mode: BackendMode::Simulated,
            scripts_dir: PathBuf::from("scripts"),
            script_interpreter: Some("python3".into()),
            simulated_failure_rate: 0.3,
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    let config_path =
        std::env::var("SERVER_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    if let Ok(raw) = fs::read_to_string(&config_path) {
        apply_file_overrides(&mut settings, &raw);
    }

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    settings
}

pub(crate) fn apply_file_overrides(settings: &mut Settings, raw: &str) {
    let file_cfg = match toml::from_str::<HashMap<String, String>>(raw) {
        Ok(file_cfg) => file_cfg,
        Err(error) => {
            warn!(%error, "ignoring unreadable server config file");
            return;
        }
    };

    if let Some(v) = file_cfg.get("bind_addr") {
        settings.server_bind = v.clone();
    }
    if let Some(v) = file_cfg.get("upload_dir") {
        settings.upload_dir = PathBuf::from(v);
    }
    if let Some(v) = file_cfg.get("backend_mode") {
        set_backend_mode(settings, v);
    }
    if let Some(v) = file_cfg.get("scripts_dir") {
        settings.scripts_dir = PathBuf::from(v);
    }
    if let Some(v) = file_cfg.get("script_interpreter") {
        set_interpreter(settings, v);
    }
    if let Some(v) = file_cfg.get("simulated_failure_rate") {
        set_failure_rate(settings, v);
    }
    if let Some(v) = file_cfg.get("max_upload_bytes") {
        set_max_upload_bytes(settings, v);
    }
}

pub(crate) fn apply_env_overrides<F>(settings: &mut Settings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Some(v) = lookup("APP__BIND_ADDR") {
        settings.server_bind = v;
    }

    if let Some(v) = lookup("UPLOAD_DIR") {
        settings.upload_dir = PathBuf::from(v);
    }
    if let Some(v) = lookup("APP__UPLOAD_DIR") {
        settings.upload_dir = PathBuf::from(v);
    }

    if let Some(v) = lookup("APP__BACKEND_MODE") {
        set_backend_mode(settings, &v);
    }
    if let Some(v) = lookup("APP__SCRIPTS_DIR") {
        settings.scripts_dir = PathBuf::from(v);
    }
    if let Some(v) = lookup("APP__SCRIPT_INTERPRETER") {
        set_interpreter(settings, &v);
    }
    if let Some(v) = lookup("APP__SIMULATED_FAILURE_RATE") {
        set_failure_rate(settings, &v);
    }
    if let Some(v) = lookup("APP__MAX_UPLOAD_BYTES") {
        set_max_upload_bytes(settings, &v);
    }
}

fn set_backend_mode(settings: &mut Settings, raw: &str) {
    match BackendMode::parse(raw) {
        Some(mode) => settings.backend_mode = mode,
        None => warn!(value = raw, "unknown backend mode; keeping {:?}", settings.backend_mode),
    }
}

/// An empty interpreter means the scripts are executed directly.
fn set_interpreter(settings: &mut Settings, raw: &str) {
    let raw = raw.trim();
    settings.script_interpreter = (!raw.is_empty()).then(|| raw.to_string());
}

fn set_failure_rate(settings: &mut Settings, raw: &str) {
    match raw.trim().parse::<f64>() {
        Ok(rate) if rate.is_finite() => settings.simulated_failure_rate = rate.clamp(0.0, 1.0),
        _ => warn!(value = raw, "invalid simulated failure rate; ignoring"),
    }
}

fn set_max_upload_bytes(settings: &mut Settings, raw: &str) {
    match raw.trim().parse::<usize>() {
        Ok(limit) if limit > 0 => settings.max_upload_bytes = limit,
        _ => warn!(value = raw, "invalid upload size limit; ignoring"),
    }
}

pub fn prepare_upload_dir(upload_dir: &Path) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(upload_dir).with_context(|| {
        format!(
            "failed to create upload directory '{}'",
            upload_dir.display()
        )
    })?;
    Ok(upload_dir.to_path_buf())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;

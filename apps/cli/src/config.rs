use std::{collections::HashMap, fs, io, path::PathBuf};

use anyhow::{anyhow, Context};
use client_core::RecordUpdateMode;
use serde::Deserialize;
use url::Url;

pub const SETTINGS_FILE: &str = "billed.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub api_url: String,
    pub origin: String,
    pub session_file: PathBuf,
    pub record_update_mode: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:5678".into(),
            origin: "http://localhost:8080".into(),
            session_file: default_session_file(),
            // A one-shot command reports record failures directly.
            record_update_mode: "awaited".into(),
        }
    }
}

impl Settings {
    pub fn api_url(&self) -> anyhow::Result<Url> {
        Url::parse(&self.api_url).with_context(|| format!("invalid api url '{}'", self.api_url))
    }

    pub fn origin(&self) -> anyhow::Result<Url> {
        Url::parse(&self.origin).with_context(|| format!("invalid origin '{}'", self.origin))
    }

    pub fn record_update_mode(&self) -> anyhow::Result<RecordUpdateMode> {
        self.record_update_mode
            .parse()
            .map_err(|err: String| anyhow!(err))
    }
}

fn default_session_file() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("billed")
        .join("session.json")
}

pub fn load_settings() -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    match fs::read_to_string(SETTINGS_FILE) {
        Ok(raw) => apply_file(&mut settings, &raw)
            .with_context(|| format!("failed to parse {SETTINGS_FILE}"))?,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {SETTINGS_FILE}"));
        }
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg = toml::from_str::<HashMap<String, String>>(raw)?;
    if let Some(v) = file_cfg.get("api_url") {
        settings.api_url = v.clone();
    }
    if let Some(v) = file_cfg.get("origin") {
        settings.origin = v.clone();
    }
    if let Some(v) = file_cfg.get("session_file") {
        settings.session_file = PathBuf::from(v);
    }
    if let Some(v) = file_cfg.get("record_update_mode") {
        settings.record_update_mode = v.clone();
    }
    Ok(())
}

/// Later keys win: `APP__*` overrides the `BILLED_*` spelling.
fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("BILLED_API_URL") {
        settings.api_url = v;
    }
    if let Some(v) = var("APP__API_URL") {
        settings.api_url = v;
    }

    if let Some(v) = var("BILLED_ORIGIN") {
        settings.origin = v;
    }
    if let Some(v) = var("APP__ORIGIN") {
        settings.origin = v;
    }

    if let Some(v) = var("BILLED_SESSION_FILE") {
        settings.session_file = PathBuf::from(v);
    }
    if let Some(v) = var("APP__SESSION_FILE") {
        settings.session_file = PathBuf::from(v);
    }

    if let Some(v) = var("APP__RECORD_UPDATE_MODE") {
        settings.record_update_mode = v;
    }
}

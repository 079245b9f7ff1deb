//! Persisted user preferences.
//!
//! A small key-value store over the `app_settings` table: theme, default
//! device size, preferred AI provider and the model-enablement map, each
//! under its own key with a JSON value. The dispatcher never reads these
//! directly; the IPC layer resolves the preference and passes it in
//! explicitly.

use std::collections::BTreeMap;

use anyhow::Result;
use r2d2_sqlite::rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use crate::logging::log_event;
use crate::providers::ProviderKind;

pub const KEY_THEME: &str = "ui.theme";
pub const KEY_DEVICE_SIZE: &str = "ui.device_size";
pub const KEY_PREFERRED_PROVIDER: &str = "ai.preferred_provider";
pub const KEY_ENABLED_MODELS: &str = "ai.enabled_models";

const DEFAULT_THEME: &str = "light";
const DEFAULT_DEVICE_SIZE: &str = "full";

#[derive(Debug, Clone, Serialize)]
pub struct SettingsSnapshot {
    pub theme: String,
    pub device_size: String,
    pub preferred_provider: ProviderKind,
    pub enabled_models: BTreeMap<String, bool>,
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Clone, Deserialize)]
pub struct SettingsUpdate {
    pub theme: Option<String>,
    pub device_size: Option<String>,
    pub preferred_provider: Option<ProviderKind>,
    pub enabled_models: Option<BTreeMap<String, bool>>,
}

pub fn seed_defaults(conn: &Connection) -> Result<()> {
    write_if_missing(conn, KEY_THEME, &Value::from(DEFAULT_THEME))?;
    write_if_missing(conn, KEY_DEVICE_SIZE, &Value::from(DEFAULT_DEVICE_SIZE))?;
    write_if_missing(
        conn,
        KEY_PREFERRED_PROVIDER,
        &Value::from(ProviderKind::Pollinations.as_str()),
    )?;
    write_if_missing(conn, KEY_ENABLED_MODELS, &Value::Object(Default::default()))?;
    Ok(())
}

pub fn get_settings(conn: &Connection) -> Result<SettingsSnapshot> {
    let theme = read_string(conn, KEY_THEME)?.unwrap_or_else(|| DEFAULT_THEME.to_string());
    let device_size =
        read_string(conn, KEY_DEVICE_SIZE)?.unwrap_or_else(|| DEFAULT_DEVICE_SIZE.to_string());
    let preferred_provider = preferred_provider(conn)?;
    let enabled_models = read_value(conn, KEY_ENABLED_MODELS)?
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default();
    Ok(SettingsSnapshot { theme, device_size, preferred_provider, enabled_models })
}

pub fn update_settings(conn: &Connection, update: SettingsUpdate) -> Result<SettingsSnapshot> {
    if let Some(theme) = update.theme {
        write_value(conn, KEY_THEME, &Value::from(theme))?;
    }
    if let Some(device_size) = update.device_size {
        write_value(conn, KEY_DEVICE_SIZE, &Value::from(device_size))?;
    }
    if let Some(provider) = update.preferred_provider {
        write_value(conn, KEY_PREFERRED_PROVIDER, &Value::from(provider.as_str()))?;
    }
    if let Some(models) = update.enabled_models {
        write_value(conn, KEY_ENABLED_MODELS, &serde_json::to_value(models)?)?;
    }
    audit_settings_change(conn, "settings updated");
    get_settings(conn)
}

/// Resolve the provider the dispatcher should try first.
pub fn preferred_provider(conn: &Connection) -> Result<ProviderKind> {
    let stored = read_string(conn, KEY_PREFERRED_PROVIDER)?;
    Ok(stored
        .as_deref()
        .and_then(ProviderKind::parse)
        .unwrap_or(ProviderKind::Pollinations))
}

fn audit_settings_change(conn: &Connection, message: &str) {
    let _ = log_event(conn, "info", Some("SET-0001"), "ai.settings", message, None);
}

fn read_value(conn: &Connection, key: &str) -> Result<Option<Value>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value FROM app_settings WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(raw.and_then(|s| serde_json::from_str(&s).ok()))
}

fn read_string(conn: &Connection, key: &str) -> Result<Option<String>> {
    Ok(read_value(conn, key)?.and_then(|v| v.as_str().map(|s| s.to_string())))
}

fn write_value(conn: &Connection, key: &str, value: &Value) -> Result<()> {
    let now = OffsetDateTime::now_utc().unix_timestamp();
    conn.execute(
        "INSERT INTO app_settings (key, value, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![key, value.to_string(), now],
    )?;
    Ok(())
}

fn write_if_missing(conn: &Connection, key: &str, value: &Value) -> Result<()> {
    let now = OffsetDateTime::now_utc().unix_timestamp();
    conn.execute(
        "INSERT INTO app_settings (key, value, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO NOTHING",
        params![key, value.to_string(), now],
    )?;
    Ok(())
}

// SPDX-FileCopyrightText: 2026 Nestchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading with Figment.
//!
//! Merge order (later overrides earlier):
//! 1. Compiled defaults
//! 2. `/etc/nestchat/nestchat.toml`
//! 3. `~/.config/nestchat/nestchat.toml`
//! 4. `./nestchat.toml`
//! 5. `NESTCHAT_*` environment variables

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use tracing::{debug, warn};

use crate::model::NestchatConfig;

pub const SYSTEM_CONFIG_PATH: &str = "/etc/nestchat/nestchat.toml";
pub const LOCAL_CONFIG_PATH: &str = "nestchat.toml";

/// Sections whose keys may be overridden from the environment.
const ENV_SECTIONS: &[&str] = &[
    "service",
    "gateway",
    "pagination",
    "policy",
    "notifications",
    "translations",
];

/// Candidate config files, lowest precedence first.
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(SYSTEM_CONFIG_PATH)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("nestchat").join("nestchat.toml"));
    }
    paths.push(PathBuf::from(LOCAL_CONFIG_PATH));
    paths
}

/// Build the full Figment (defaults, XDG files, env) without extracting.
pub fn build_figment() -> Figment {
    config_paths()
        .into_iter()
        .fold(
            Figment::new().merge(Serialized::defaults(NestchatConfig::default())),
            |figment, path| {
                if path.is_file() {
                    debug!(path = %path.display(), "merging config file");
                }
                figment.merge(Toml::file(path))
            },
        )
        .merge(env_provider())
}

/// Load configuration from the standard hierarchy with env var overrides.
pub fn load_config() -> Result<NestchatConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from an explicit file, still honoring env overrides.
///
/// A missing file is not an error: defaults and env still apply.
pub fn load_config_from_path(path: &Path) -> Result<NestchatConfig, figment::Error> {
    if !path.is_file() {
        warn!(path = %path.display(), "config file not found, using defaults and env only");
    }
    Figment::new()
        .merge(Serialized::defaults(NestchatConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<NestchatConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(NestchatConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// `NESTCHAT_GATEWAY_BEARER_TOKEN` -> `gateway.bearer_token`.
///
/// Only the first underscore after a known section name becomes a dot, so
/// keys that themselves contain underscores survive intact.
fn env_provider() -> Env {
    Env::prefixed("NESTCHAT_").map(|key| {
        let key_str = key.as_str();
        ENV_SECTIONS
            .iter()
            .find_map(|section| {
                key_str
                    .strip_prefix(section)
                    .and_then(|rest| rest.strip_prefix('_'))
                    .map(|rest| format!("{section}.{rest}"))
            })
            .unwrap_or_else(|| key_str.to_string())
            .into()
    })
}

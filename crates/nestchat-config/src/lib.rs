// SPDX-FileCopyrightText: 2026 Nestchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Nestchat conversation engine.
//!
//! TOML files layered with Figment (`deny_unknown_fields` everywhere), `NESTCHAT_*`
//! environment overrides, semantic validation, and miette diagnostics.
//!
//! ```no_run
//! let config = nestchat_config::load_and_validate().expect("config errors");
//! println!("listening on {}:{}", config.gateway.host, config.gateway.port);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

use std::path::Path;

pub use diagnostic::{render_errors, ConfigError};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::NestchatConfig;

/// Load from the standard hierarchy and validate.
pub fn load_and_validate() -> Result<NestchatConfig, Vec<ConfigError>> {
    finish(loader::load_config(), read_sources(&loader::config_paths()))
}

/// Load from an explicit file (plus env overrides) and validate.
pub fn load_and_validate_path(path: &Path) -> Result<NestchatConfig, Vec<ConfigError>> {
    finish(
        loader::load_config_from_path(path),
        read_sources(&[path.to_path_buf()]),
    )
}

/// Load from a TOML string and validate. Used by tests.
pub fn load_and_validate_str(toml_content: &str) -> Result<NestchatConfig, Vec<ConfigError>> {
    finish(
        loader::load_config_from_str(toml_content),
        vec![("<inline>".to_string(), toml_content.to_string())],
    )
}

#[allow(clippy::result_large_err)]
fn finish(
    loaded: Result<NestchatConfig, figment::Error>,
    sources: Vec<(String, String)>,
) -> Result<NestchatConfig, Vec<ConfigError>> {
    match loaded {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(err, &sources)),
    }
}

/// Contents of the config files that exist, for diagnostic spans.
fn read_sources(paths: &[std::path::PathBuf]) -> Vec<(String, String)> {
    paths
        .iter()
        .filter_map(|path| {
            let content = std::fs::read_to_string(path).ok()?;
            let display = std::fs::canonicalize(path)
                .unwrap_or_else(|_| path.clone())
                .display()
                .to_string();
            Some((display, content))
        })
        .collect()
}

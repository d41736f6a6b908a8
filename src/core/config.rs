//! Configuration file model.

use crate::core::live_link::LiveLinkConfig;
use crate::core::material::MaterialConfig;
use crate::core::project::SessionConfig;
use crate::core::turntable::TurntableConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RamenConfig {
    pub live_link: LiveLinkConfig,
    pub session: SessionConfig,
    pub turntable: TurntableConfig,
    pub material: MaterialConfig,
}

impl RamenConfig {
    /// Loads a `.toml` or `.json` file; a path that does not exist yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("no config at {}; using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents, path)
    }

    fn parse(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string())),
            Some("json") => {
                serde_json::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

// ----------------------------------------------------------------------------
// unittest
// ----------------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::material::BindingPolicy;
    use crate::core::turntable::Optics;

    #[test]
    fn test_defaults() {
        let config = RamenConfig::default();
        assert_eq!(config.live_link.address, "127.0.0.1:8080");
        assert_eq!(config.turntable.fixed_optics, Some(Optics::new(35.0, 36.0)));
        assert_eq!(config.material.library, "materiallibrary");
        assert_eq!(config.material.binding, BindingPolicy::BindIfPresent);
        assert_eq!(config.session.stage_expr, "hou.pwd().editableStage()");
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let text = r#"
[live_link]
address = "10.0.0.5:9000"

[material]
binding = "bind_always"

[turntable.fixed_optics]
focal_length = 50.0
aperture = 24.0
"#;
        let config = RamenConfig::parse(text, Path::new("ramen.toml")).unwrap();
        assert_eq!(config.live_link.address, "10.0.0.5:9000");
        assert_eq!(config.live_link.timeout_ms, 2000);
        assert_eq!(config.material.binding, BindingPolicy::BindAlways);
        assert_eq!(config.material.library, "materiallibrary");
        assert_eq!(config.turntable.fixed_optics, Some(Optics::new(50.0, 24.0)));
        assert_eq!(config.turntable.padding, 1.2);
    }

    #[test]
    fn test_json_and_unknown_extension() {
        let config = RamenConfig::parse(
            r#"{"turntable": {"fixed_optics": null, "padding": 1.5}}"#,
            Path::new("ramen.json"),
        )
        .unwrap();
        assert_eq!(config.turntable.fixed_optics, None);
        assert_eq!(config.turntable.padding, 1.5);

        assert!(matches!(
            RamenConfig::parse("", Path::new("ramen.yaml")),
            Err(ConfigError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            RamenConfig::parse("[broken", Path::new("ramen.toml")),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = RamenConfig::load("/definitely/not/here/ramen.toml").unwrap();
        assert_eq!(config, RamenConfig::default());
    }
}

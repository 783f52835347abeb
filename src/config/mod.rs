use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::tools::TransformOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConfigPathError {
    MissingHomeDirectory,
}

const APP_DIR: &str = "transform-tool";
const APP_CONFIG_FILE: &str = "config.json";

/// Settings read from `config.json`.
#[derive(Debug, Clone, Default, Deserialize)]
struct AppConfig {
    #[serde(default)]
    transform: TransformOptions,
}

/// Tool options from the user config, or defaults when the file is absent
/// or unreadable.
pub fn load_transform_options() -> TransformOptions {
    let (xdg_config_home, home) = config_env_dirs();
    load_transform_options_with(xdg_config_home.as_deref(), home.as_deref())
}

fn load_transform_options_with(
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> TransformOptions {
    let path = match app_config_path(APP_DIR, APP_CONFIG_FILE, xdg_config_home, home) {
        Ok(p) => p,
        Err(err) => {
            tracing::debug!(?err, "no config directory; using default options");
            return TransformOptions::default();
        }
    };
    if !path.exists() {
        return TransformOptions::default();
    }
    match std::fs::read_to_string(&path) {
        Ok(contents) => parse_transform_options(&contents).unwrap_or_else(|err| {
            tracing::warn!(?err, ?path, "failed to parse config.json; using defaults");
            TransformOptions::default()
        }),
        Err(err) => {
            tracing::warn!(?err, ?path, "failed to read config.json; using defaults");
            TransformOptions::default()
        }
    }
}

fn parse_transform_options(contents: &str) -> serde_json::Result<TransformOptions> {
    serde_json::from_str::<AppConfig>(contents).map(|config| config.transform)
}

pub(crate) fn config_env_dirs() -> (Option<PathBuf>, Option<PathBuf>) {
    (
        std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
    )
}

pub(crate) fn app_config_path(
    app_dir: &str,
    file_name: &str,
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigPathError> {
    let mut path = config_root(xdg_config_home, home)?;
    path.push(app_dir);
    path.push(file_name);
    Ok(path)
}

fn config_root(
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigPathError> {
    if let Some(xdg) = xdg_config_home.filter(|path| !path.as_os_str().is_empty()) {
        return Ok(xdg.to_path_buf());
    }

    let home = home.ok_or(ConfigPathError::MissingHomeDirectory)?;
    Ok(home.join(".config"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::GuideKind;
    use crate::store::{ClipPolicy, Interpolation, TransformDirection, TransformType};

    #[test]
    fn app_config_path_prefers_xdg_config_home() {
        let path = app_config_path(
            APP_DIR,
            APP_CONFIG_FILE,
            Some(Path::new("/tmp/config-root")),
            Some(Path::new("/tmp/home")),
        )
        .expect("path should resolve");

        assert_eq!(path, PathBuf::from("/tmp/config-root/transform-tool/config.json"));
    }

    #[test]
    fn app_config_path_falls_back_to_home_dot_config() {
        let path = app_config_path(APP_DIR, APP_CONFIG_FILE, Some(Path::new("")), Some(Path::new("/tmp/home")))
            .expect("path should resolve");

        assert_eq!(path, PathBuf::from("/tmp/home/.config/transform-tool/config.json"));
    }

    #[test]
    fn app_config_path_errors_when_home_missing_and_xdg_unset() {
        let error = app_config_path(APP_DIR, APP_CONFIG_FILE, None, None)
            .expect_err("no root should fail");
        assert_eq!(error, ConfigPathError::MissingHomeDirectory);
        assert_eq!(load_transform_options_with(None, None), TransformOptions::default());
    }

    #[test]
    fn transform_section_overrides_only_given_fields() {
        let options = parse_transform_options(
            r#"{
                "transform": {
                    "target": "selection",
                    "direction": "backward",
                    "interpolation": "linear",
                    "clip": "crop",
                    "guides": { "grid": 4 },
                    "constrain": { "move": true }
                }
            }"#,
        )
        .expect("config should parse");

        assert_eq!(options.target, TransformType::Selection);
        assert_eq!(options.direction, TransformDirection::Backward);
        assert_eq!(options.interpolation, Interpolation::Linear);
        assert_eq!(options.clip, ClipPolicy::Crop);
        assert_eq!(options.guides, GuideKind::Grid(4));
        assert!(options.constrain.move_);
        assert!(!options.constrain.scale);
        assert!(options.show_preview);
    }

    #[test]
    fn missing_transform_section_uses_defaults() {
        let options = parse_transform_options("{}").expect("empty config should parse");
        assert_eq!(options, TransformOptions::default());
        assert!(parse_transform_options("{ not json").is_err());
    }

    #[test]
    fn config_file_on_disk_is_loaded_from_xdg_root() {
        let root = std::env::temp_dir().join(format!("transform-tool-config-{}", std::process::id()));
        let dir = root.join(APP_DIR);
        std::fs::create_dir_all(&dir).expect("config dir");
        std::fs::write(dir.join(APP_CONFIG_FILE), r#"{"transform":{"recursion_level":1}}"#)
            .expect("config file");

        let options = load_transform_options_with(Some(root.as_path()), None);
        assert_eq!(options.recursion_level, 1);

        std::fs::write(dir.join(APP_CONFIG_FILE), "garbage").expect("config file");
        assert_eq!(load_transform_options_with(Some(root.as_path()), None), TransformOptions::default());

        let _ = std::fs::remove_dir_all(&root);
    }
}

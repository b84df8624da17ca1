//! Sync targets configuration.
//!
//! Looked up in `stylesync.toml`, then in the `"stylesync"` key of `package.json`.
//! Without either, the defaults describe a Svelte package next to the shared css package:
//!
//! ```toml
//! stylesheet = "../littlebutton-css/css/button.css"
//!
//! [[targets]]
//! component = "./src/Button.svelte"
//! ```
//!
//! Relative paths are resolved from the directory that holds the config.

use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use stylesync_core::StyleMarker;

use crate::{Error, Result};

pub const CONFIG_FILE: &str = "stylesync.toml";
pub const PACKAGE_JSON: &str = "package.json";
pub const PACKAGE_JSON_KEY: &str = "stylesync";

pub const DEFAULT_STYLESHEET: &str = "../littlebutton-css/css/button.css";
pub const DEFAULT_COMPONENT: &str = "./src/Button.svelte";

fn default_stylesheet() -> PathBuf {
    DEFAULT_STYLESHEET.into()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    #[serde(default = "default_stylesheet")]
    pub stylesheet: PathBuf,
    #[serde(default)]
    pub targets: Vec<TargetConfig>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            stylesheet: default_stylesheet(),
            targets: vec![TargetConfig {
                component: DEFAULT_COMPONENT.to_string(),
                attribute: None,
                stylesheet: None,
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    /// Path or glob pattern.
    pub component: String,
    /// Attribute of the start marker, `module` for `<style module>`.
    #[serde(default)]
    pub attribute: Option<String>,
    /// Overrides top level stylesheet.
    #[serde(default)]
    pub stylesheet: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    PackageJson(PathBuf),
    Default,
}

impl ConfigSource {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigSource::File(path) | ConfigSource::PackageJson(path) => Some(path),
            ConfigSource::Default => None,
        }
    }
}

/// Command line replacements for config values.
/// Relative paths are resolved from `base`.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base: PathBuf,
    pub stylesheet: Option<PathBuf>,
    pub component: Option<String>,
    pub attribute: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub stylesheet: PathBuf,
    pub component: PathBuf,
    pub marker: StyleMarker,
}

#[derive(Debug, Clone, Default)]
pub struct ResolvedConfig {
    pub targets: Vec<ResolvedTarget>,
    /// Config file and stylesheets, inputs a build script should rerun on.
    pub watched: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: SyncConfig,
    pub root: PathBuf,
    pub source: ConfigSource,
}

impl LoadedConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&content).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(Self {
            config,
            root: path.parent().map(Path::to_path_buf).unwrap_or_default(),
            source: ConfigSource::File(path.to_path_buf()),
        })
    }

    pub fn discover(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let config_file = dir.join(CONFIG_FILE);
        if config_file.is_file() {
            return Self::from_file(config_file);
        }

        let package_json = dir.join(PACKAGE_JSON);
        if package_json.is_file() {
            if let Some(config) = read_package_json(&package_json)? {
                tracing::debug!(path = %package_json.display(), "loaded config");
                return Ok(Self {
                    config,
                    root: dir.to_path_buf(),
                    source: ConfigSource::PackageJson(package_json),
                });
            }
        }

        tracing::debug!(dir = %dir.display(), "no config found, using defaults");
        Ok(Self {
            config: SyncConfig::default(),
            root: dir.to_path_buf(),
            source: ConfigSource::Default,
        })
    }

    pub fn resolve(&self) -> Result<ResolvedConfig> {
        self.resolve_with(&Overrides::default())
    }

    /// Turn config entries into concrete files, expanding component patterns.
    pub fn resolve_with(&self, overrides: &Overrides) -> Result<ResolvedConfig> {
        let main_stylesheet = match &overrides.stylesheet {
            Some(path) => overrides.base.join(path),
            None => self.root.join(&self.config.stylesheet),
        };
        let attribute = overrides.attribute.as_deref();

        let mut targets = vec![];
        if let Some(component) = &overrides.component {
            let marker = StyleMarker::from_attribute(attribute)?;
            for component in expand_component(&overrides.base, component)? {
                targets.push(ResolvedTarget {
                    stylesheet: main_stylesheet.clone(),
                    component,
                    marker: marker.clone(),
                });
            }
        } else {
            if self.config.targets.is_empty() {
                return Err(Error::NoTargets);
            }
            for target in &self.config.targets {
                let stylesheet = match (&overrides.stylesheet, &target.stylesheet) {
                    (None, Some(own)) => self.root.join(own),
                    _ => main_stylesheet.clone(),
                };
                let marker = StyleMarker::from_attribute(attribute.or(target.attribute.as_deref()))?;
                for component in expand_component(&self.root, &target.component)? {
                    targets.push(ResolvedTarget {
                        stylesheet: stylesheet.clone(),
                        component,
                        marker: marker.clone(),
                    });
                }
            }
        }

        let mut seen = BTreeSet::new();
        let watched = self
            .source
            .path()
            .map(Path::to_path_buf)
            .into_iter()
            .chain(targets.iter().map(|t| t.stylesheet.clone()))
            .filter(|path| seen.insert(path.clone()))
            .collect();

        Ok(ResolvedConfig { targets, watched })
    }
}

// Returns None if package.json has no stylesync entry.
fn read_package_json(path: &Path) -> Result<Option<SyncConfig>> {
    let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    let package: serde_json::Value =
        serde_json::from_str(&content).map_err(|source| Error::PackageJson {
            path: path.to_path_buf(),
            source,
        })?;
    let Some(entry) = package.get(PACKAGE_JSON_KEY) else {
        return Ok(None);
    };
    serde_json::from_value(entry.clone())
        .map(Some)
        .map_err(|source| Error::PackageJson {
            path: path.to_path_buf(),
            source,
        })
}

fn is_pattern(component: &str) -> bool {
    component.contains(['*', '?', '['])
}

fn expand_component(root: &Path, component: &str) -> Result<Vec<PathBuf>> {
    if !is_pattern(component) {
        return Ok(vec![root.join(component)]);
    }

    let pattern = if Path::new(component).is_absolute() || root.as_os_str().is_empty() {
        component.to_string()
    } else {
        format!(
            "{}/{component}",
            glob::Pattern::escape(&root.to_string_lossy())
        )
    };
    let entries = glob::glob(&pattern).map_err(|source| Error::Pattern {
        pattern: component.to_string(),
        source,
    })?;

    let mut matched = vec![];
    for entry in entries {
        let path = entry.map_err(|e| {
            let path = e.path().to_path_buf();
            stylesync_core::Error::from_io(&path, e.into_error())
        })?;
        if path.is_file() {
            matched.push(path);
        }
    }
    if matched.is_empty() {
        return Err(Error::NoComponentMatched {
            pattern: component.to_string(),
        });
    }
    matched.sort();
    tracing::debug!(pattern = component, count = matched.len(), "expanded component pattern");
    Ok(matched)
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_toml() {
        let config: SyncConfig = toml::from_str(
            r#"
            stylesheet = "../littlebutton-css/css/button.css"

            [[targets]]
            component = "src/Button.svelte"

            [[targets]]
            component = "src/components/*.vue"
            attribute = "module"
            stylesheet = "../vue.css"
            "#,
        )
        .unwrap();
        assert_eq!(
            config,
            SyncConfig {
                stylesheet: "../littlebutton-css/css/button.css".into(),
                targets: vec![
                    TargetConfig {
                        component: "src/Button.svelte".into(),
                        attribute: None,
                        stylesheet: None,
                    },
                    TargetConfig {
                        component: "src/components/*.vue".into(),
                        attribute: Some("module".into()),
                        stylesheet: Some("../vue.css".into()),
                    },
                ],
            }
        );
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = toml::from_str::<SyncConfig>("[[targets]]\ncomponent = \"a\"\nmarker = \"x\"\n");
        assert!(err.is_err());
    }

    #[test]
    fn test_default_stylesheet() {
        let config: SyncConfig = toml::from_str("[[targets]]\ncomponent = \"a.svelte\"\n").unwrap();
        assert_eq!(config.stylesheet, PathBuf::from(DEFAULT_STYLESHEET));
    }

    #[test]
    fn test_resolve_relative_to_root() {
        let loaded = LoadedConfig {
            config: SyncConfig::default(),
            root: "packages/littlebutton-svelte".into(),
            source: ConfigSource::Default,
        };
        let resolved = loaded.resolve().unwrap();
        assert_eq!(
            resolved.targets,
            vec![ResolvedTarget {
                stylesheet: "packages/littlebutton-svelte/../littlebutton-css/css/button.css".into(),
                component: "packages/littlebutton-svelte/./src/Button.svelte".into(),
                marker: StyleMarker::plain(),
            }]
        );
        assert_eq!(
            resolved.watched,
            vec![PathBuf::from(
                "packages/littlebutton-svelte/../littlebutton-css/css/button.css"
            )]
        );
    }

    #[test]
    fn test_overrides() {
        let loaded = LoadedConfig {
            config: SyncConfig::default(),
            root: "svelte".into(),
            source: ConfigSource::File("svelte/stylesync.toml".into()),
        };
        let resolved = loaded
            .resolve_with(&Overrides {
                base: "cwd".into(),
                stylesheet: Some("shared.css".into()),
                component: Some("src/components/Button.vue".into()),
                attribute: Some("module".into()),
            })
            .unwrap();
        assert_eq!(
            resolved.targets,
            vec![ResolvedTarget {
                stylesheet: "cwd/shared.css".into(),
                component: "cwd/src/components/Button.vue".into(),
                marker: StyleMarker::with_attribute("module").unwrap(),
            }]
        );
        assert_eq!(
            resolved.watched,
            vec![
                PathBuf::from("svelte/stylesync.toml"),
                PathBuf::from("cwd/shared.css")
            ]
        );
    }

    #[test]
    fn test_no_targets() {
        let loaded = LoadedConfig {
            config: SyncConfig {
                stylesheet: "a.css".into(),
                targets: vec![],
            },
            root: PathBuf::new(),
            source: ConfigSource::Default,
        };
        assert!(matches!(loaded.resolve(), Err(Error::NoTargets)));
    }

    #[test]
    fn test_expand_pattern() {
        let dir = tempfile::tempdir().unwrap();
        let components = dir.path().join("src/components");
        std::fs::create_dir_all(&components).unwrap();
        for name in ["Card.vue", "Button.vue", "Button.css"] {
            std::fs::write(components.join(name), "").unwrap();
        }

        let matched = expand_component(dir.path(), "src/components/*.vue").unwrap();
        assert_eq!(
            matched,
            vec![components.join("Button.vue"), components.join("Card.vue")]
        );

        let err = expand_component(dir.path(), "src/**/*.svelte").unwrap_err();
        assert!(matches!(err, Error::NoComponentMatched { .. }));

        let err = expand_component(dir.path(), "src/[*.vue").unwrap_err();
        assert!(matches!(err, Error::Pattern { .. }));
    }
}

//! Dialog presets
//!
//! Named [`DialogOptions`] declared in a JSON or YAML file, e.g.
//!
//! ```yaml
//! dialogs:
//!   confirm:
//!     templateId: confirm-template
//!     closeMethod: [button, escape]
//!     cssClass: [narrow]
//!     footer: true
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dialog::DialogOptions;

/// Serialization format, picked from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresetFormat {
    Json,
    Yaml,
}

impl PresetFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Self::Json),
            Some("yaml") | Some("yml") => Ok(Self::Yaml),
            _ => Err(anyhow::anyhow!(
                "Unsupported preset file extension: {}",
                path.display()
            )),
        }
    }
}

/// A set of named dialog configurations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogPresets {
    pub dialogs: BTreeMap<String, DialogOptions>,
}

impl DialogPresets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(content: &str, format: PresetFormat) -> Result<Self> {
        let presets = match format {
            PresetFormat::Json => serde_json::from_str(content).context("Failed to parse JSON presets")?,
            PresetFormat::Yaml => serde_yaml::from_str(content).context("Failed to parse YAML presets")?,
        };
        Ok(presets)
    }

    pub fn render(&self, format: PresetFormat) -> Result<String> {
        let content = match format {
            PresetFormat::Json => {
                serde_json::to_string_pretty(self).context("Failed to serialize presets")?
            }
            PresetFormat::Yaml => serde_yaml::to_string(self).context("Failed to serialize presets")?,
        };
        Ok(content)
    }

    /// Load and validate presets from a `.json`, `.yaml` or `.yml` file
    #[cfg(not(target_arch = "wasm32"))]
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = PresetFormat::from_path(path)?;
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read preset file {}", path.display()))?;

        let presets = Self::parse(&content, format)?;
        presets.validate()?;
        debug!("Loaded {} dialog presets from {:?}", presets.dialogs.len(), path);
        Ok(presets)
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = self.render(PresetFormat::from_path(path)?)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create preset directory")?;
        }
        tokio::fs::write(path, content)
            .await
            .context("Failed to write preset file")?;

        debug!("Saved dialog presets to {:?}", path);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&DialogOptions> {
        self.dialogs.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, options: DialogOptions) {
        self.dialogs.insert(name.into(), options);
    }

    pub fn validate(&self) -> Result<()> {
        for (name, options) in &self.dialogs {
            if options.content.is_none() && options.template_id.is_none() {
                return Err(anyhow::anyhow!(
                    "Preset '{}' needs one of 'content' or 'templateId'",
                    name
                ));
            }

            for class_name in &options.css_class {
                if class_name.is_empty() || class_name.chars().any(char::is_whitespace) {
                    return Err(anyhow::anyhow!(
                        "Preset '{}' has an invalid css class: {:?}",
                        name,
                        class_name
                    ));
                }
            }

            let mut seen = HashSet::new();
            if let Some(method) = options.close_method.iter().find(|m| !seen.insert(**m)) {
                return Err(anyhow::anyhow!(
                    "Preset '{}' lists close method {:?} more than once",
                    name,
                    method
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialog::CloseMethod;
    use tempfile::TempDir;

    const YAML: &str = r#"
dialogs:
  confirm:
    templateId: confirm-template
    closeMethod: [button, escape]
    cssClass: [narrow]
    footer: true
  notice:
    content: "<p>Saved</p>"
    destroyZodal: false
    enableScrollLock: false
"#;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(PresetFormat::from_path(Path::new("a.json")).unwrap(), PresetFormat::Json);
        assert_eq!(PresetFormat::from_path(Path::new("a.yml")).unwrap(), PresetFormat::Yaml);
        assert_eq!(PresetFormat::from_path(Path::new("a.yaml")).unwrap(), PresetFormat::Yaml);
        assert!(PresetFormat::from_path(Path::new("a.toml")).is_err());
    }

    #[test]
    fn test_parse_yaml_fills_defaults() {
        let presets = DialogPresets::parse(YAML, PresetFormat::Yaml).unwrap();

        let confirm = presets.get("confirm").unwrap();
        assert_eq!(confirm.template_id.as_deref(), Some("confirm-template"));
        assert_eq!(confirm.close_method, vec![CloseMethod::Button, CloseMethod::Escape]);
        assert!(confirm.footer);
        assert!(confirm.destroy_on_close);
        assert!(confirm.enable_scroll_lock);

        let notice = presets.get("notice").unwrap();
        assert!(!notice.destroy_on_close);
        assert!(!notice.enable_scroll_lock);
        assert_eq!(notice.close_method, CloseMethod::ALL.to_vec());
        assert!(presets.get("missing").is_none());
        presets.validate().unwrap();
    }

    #[test]
    fn test_parse_json() {
        let json = r#"{"dialogs": {"hello": {"content": "<p>Hi</p>", "cssClass": ["a", "b"]}}}"#;
        let presets = DialogPresets::parse(json, PresetFormat::Json).unwrap();
        assert_eq!(presets.get("hello").unwrap().css_class, vec!["a", "b"]);
    }

    #[test]
    fn test_validate_rejects_bad_presets() {
        let mut presets = DialogPresets::new();
        presets.insert("empty", DialogOptions::new());
        assert!(presets.validate().is_err());

        let mut presets = DialogPresets::new();
        presets.insert("spaced", DialogOptions::new().with_content("x").with_css_class("two words"));
        assert!(presets.validate().is_err());

        let mut presets = DialogPresets::new();
        presets.insert(
            "twice",
            DialogOptions::new()
                .with_content("x")
                .with_close_methods(&[CloseMethod::Escape, CloseMethod::Escape]),
        );
        let err = presets.validate().unwrap_err();
        assert!(err.to_string().contains("twice"));
    }

    #[tokio::test]
    async fn test_save_and_load_both_formats() {
        let dir = TempDir::new().unwrap();
        let presets = DialogPresets::parse(YAML, PresetFormat::Yaml).unwrap();

        for file in ["nested/presets.json", "presets.yml"] {
            let path = dir.path().join(file);
            presets.save(&path).await.unwrap();
            let loaded = DialogPresets::load(&path).await.unwrap();
            assert_eq!(loaded.dialogs.len(), 2);
            assert_eq!(
                loaded.get("notice").unwrap().content.as_deref(),
                Some("<p>Saved</p>")
            );
        }
    }

    #[tokio::test]
    async fn test_load_missing_file_fails_with_context() {
        let dir = TempDir::new().unwrap();
        let err = DialogPresets::load(dir.path().join("absent.json")).await.unwrap_err();
        assert!(err.to_string().contains("Failed to read preset file"));
    }

    #[tokio::test]
    async fn test_load_rejects_invalid_presets() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        tokio::fs::write(&path, r#"{"dialogs": {"x": {}}}"#).await.unwrap();
        assert!(DialogPresets::load(&path).await.is_err());
    }
}

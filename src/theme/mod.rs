//! Theme engine
//!
//! This module provides template rendering using Tera.
//! Features:
//! - Theme loading and switching with fallback to the default theme
//! - A default theme embedded in the binary, written out on first run
//! - Theme metadata from theme.json or theme.toml
//! - Standard template variables supplied by the rendering path

use anyhow::{Context, Result};
use rust_embed::RustEmbed;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tera::{Context as TeraContext, Tera};

mod error;

pub use error::ThemeError;

/// The default theme shipped inside the binary
#[derive(RustEmbed)]
#[folder = "templates/default/"]
struct EmbeddedDefaultTheme;

/// Name of the built-in theme
pub const DEFAULT_THEME: &str = "default";

/// Theme engine for rendering templates
pub struct ThemeEngine {
    /// Tera template engine instance for the active theme
    tera: Tera,
    /// Path to themes directory
    themes_path: PathBuf,
    /// Currently active theme name
    current_theme: String,
    /// Default theme name (fallback)
    default_theme: String,
    /// Cached theme metadata
    theme_cache: HashMap<String, ThemeInfo>,
}

/// Result of a theme switch operation with fallback support
#[derive(Debug, Clone, Serialize)]
pub struct ThemeSwitchResult {
    /// Whether the switch ended with a working theme (directly or via fallback)
    pub success: bool,
    /// Whether the fallback theme was used instead of the requested one
    pub used_fallback: bool,
    /// Error message when the requested theme failed to load
    pub error: Option<String>,
}

/// Theme metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeInfo {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub description: String,
}

/// Shape of a theme.json / theme.toml file
#[derive(Debug, Deserialize)]
struct ThemeMetadataFile {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

impl ThemeEngine {
    /// Create a new theme engine
    ///
    /// Ensures the themes directory exists, materializes the embedded
    /// default theme on first run, and loads the requested theme's
    /// templates (falling back to the default theme when that fails).
    pub fn new(themes_path: &Path, active_theme: &str) -> Result<Self> {
        let themes_path = themes_path.to_path_buf();

        if !themes_path.exists() {
            fs::create_dir_all(&themes_path)
                .with_context(|| format!("Failed to create themes directory: {:?}", themes_path))?;
        }

        materialize_default_theme(&themes_path)?;

        let mut engine = Self {
            tera: Tera::default(),
            themes_path,
            current_theme: DEFAULT_THEME.to_string(),
            default_theme: DEFAULT_THEME.to_string(),
            theme_cache: HashMap::new(),
        };

        engine.refresh_theme_cache()?;

        if active_theme != DEFAULT_THEME {
            let result = engine.switch_theme(active_theme);
            if result.used_fallback {
                tracing::warn!(
                    "Theme '{}' failed to load, using '{}': {}",
                    active_theme,
                    engine.default_theme,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
        } else {
            engine
                .load_theme_templates(DEFAULT_THEME)
                .context("Failed to load default theme templates")?;
        }

        Ok(engine)
    }

    /// Name of the currently active theme
    pub fn current_theme(&self) -> &str {
        &self.current_theme
    }

    /// Render a template of the active theme
    pub fn render(&self, template: &str, context: &TeraContext) -> Result<String> {
        self.tera
            .render(template, context)
            .map_err(|e| ThemeError::TemplateError(format_tera_error(&e)).into())
    }

    /// Check whether the active theme provides a template
    pub fn has_template(&self, template: &str) -> bool {
        self.tera.get_template_names().any(|n| n == template)
    }

    /// Switch to another theme, falling back to the default on failure
    pub fn switch_theme(&mut self, theme_name: &str) -> ThemeSwitchResult {
        match self.load_theme_templates(theme_name) {
            Ok(()) => {
                self.current_theme = theme_name.to_string();
                ThemeSwitchResult {
                    success: true,
                    used_fallback: false,
                    error: None,
                }
            }
            Err(e) => {
                let error = e.to_string();
                let fallback = self.default_theme.clone();
                match self.load_theme_templates(&fallback) {
                    Ok(()) => {
                        self.current_theme = fallback;
                        ThemeSwitchResult {
                            success: true,
                            used_fallback: true,
                            error: Some(error),
                        }
                    }
                    Err(fallback_err) => ThemeSwitchResult {
                        success: false,
                        used_fallback: true,
                        error: Some(format!("{}; fallback also failed: {}", error, fallback_err)),
                    },
                }
            }
        }
    }

    /// List all installed themes
    pub fn list_themes(&self) -> Vec<ThemeInfo> {
        let mut themes: Vec<ThemeInfo> = self.theme_cache.values().cloned().collect();
        themes.sort_by(|a, b| a.name.cmp(&b.name));
        themes
    }

    /// Load templates for a specific theme into a fresh Tera instance
    fn load_theme_templates(&mut self, theme_name: &str) -> Result<()> {
        let theme_path = self.themes_path.join(theme_name);

        if !theme_path.exists() {
            return Err(ThemeError::NotFound(theme_name.to_string()).into());
        }

        let mut templates: Vec<(String, String)> = Vec::new();
        collect_templates_from_dir(&theme_path, &theme_path, &mut templates)?;

        if templates.is_empty() {
            return Err(ThemeError::TemplateError(format!(
                "Theme '{}' contains no templates",
                theme_name
            ))
            .into());
        }

        // Base templates must be registered before the templates that
        // extend them
        templates.sort_by(|a, b| {
            let a_is_base = a.0 == "base.html" || a.0.ends_with("/base.html");
            let b_is_base = b.0 == "base.html" || b.0.ends_with("/base.html");
            b_is_base.cmp(&a_is_base)
        });

        let mut tera = Tera::default();
        for (name, content) in templates {
            tera.add_raw_template(&name, &content).map_err(|e| {
                ThemeError::TemplateError(format!("Failed to add template {}: {}", name, e))
            })?;
        }

        tera.build_inheritance_chains().map_err(|e| {
            ThemeError::TemplateError(format!("Failed to build template inheritance: {}", e))
        })?;

        self.tera = tera;
        Ok(())
    }

    /// Refresh the theme metadata cache
    fn refresh_theme_cache(&mut self) -> Result<()> {
        self.theme_cache.clear();

        if !self.themes_path.exists() {
            return Ok(());
        }

        for entry in fs::read_dir(&self.themes_path)? {
            let entry = entry?;
            let path = entry.path();

            if path.is_dir() {
                if let Some(theme_name) = path.file_name().and_then(|n| n.to_str()) {
                    match self.load_theme_metadata(theme_name) {
                        Ok(info) => {
                            self.theme_cache.insert(theme_name.to_string(), info);
                        }
                        Err(e) => {
                            tracing::warn!(
                                "Failed to load theme metadata for '{}': {}",
                                theme_name,
                                e
                            );
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Load theme metadata from theme.json or theme.toml
    fn load_theme_metadata(&self, theme_name: &str) -> Result<ThemeInfo> {
        let json_path = self.themes_path.join(theme_name).join("theme.json");
        let toml_path = self.themes_path.join(theme_name).join("theme.toml");

        let metadata: Option<ThemeMetadataFile> = if json_path.exists() {
            let content = fs::read_to_string(&json_path)
                .with_context(|| format!("Failed to read theme.json: {:?}", json_path))?;
            Some(serde_json::from_str(&content).map_err(|e| {
                ThemeError::InvalidMetadata(format!("theme '{}': {}", theme_name, e))
            })?)
        } else if toml_path.exists() {
            let content = fs::read_to_string(&toml_path)
                .with_context(|| format!("Failed to read theme.toml: {:?}", toml_path))?;
            Some(toml::from_str(&content).map_err(|e| {
                ThemeError::InvalidMetadata(format!("theme '{}': {}", theme_name, e))
            })?)
        } else {
            None
        };

        let metadata = metadata.unwrap_or(ThemeMetadataFile {
            display_name: None,
            version: None,
            author: None,
            description: None,
        });

        Ok(ThemeInfo {
            name: theme_name.to_string(),
            display_name: metadata
                .display_name
                .unwrap_or_else(|| theme_name.to_string()),
            version: metadata.version.unwrap_or_default(),
            author: metadata.author.unwrap_or_default(),
            description: metadata.description.unwrap_or_default(),
        })
    }
}

/// Write the embedded default theme into the themes directory when its
/// files are not present yet. Existing files are left untouched so local
/// modifications survive restarts.
fn materialize_default_theme(themes_path: &Path) -> Result<()> {
    let default_path = themes_path.join(DEFAULT_THEME);
    if !default_path.exists() {
        fs::create_dir_all(&default_path)
            .with_context(|| format!("Failed to create default theme dir: {:?}", default_path))?;
    }

    for file in EmbeddedDefaultTheme::iter() {
        let target = default_path.join(file.as_ref());
        if target.exists() {
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let content =
            EmbeddedDefaultTheme::get(&file).expect("embedded file listed but not found");
        fs::write(&target, content.data.as_ref())
            .with_context(|| format!("Failed to write embedded template: {:?}", target))?;
    }

    Ok(())
}

/// Recursively collect .html templates with theme-relative names
fn collect_templates_from_dir(
    base_path: &Path,
    current_path: &Path,
    templates: &mut Vec<(String, String)>,
) -> Result<()> {
    if !current_path.exists() {
        return Ok(());
    }

    for entry in fs::read_dir(current_path)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            collect_templates_from_dir(base_path, &path, templates)?;
        } else if path.extension().map_or(false, |ext| ext == "html") {
            let relative_path = path
                .strip_prefix(base_path)
                .map_err(|_| ThemeError::TemplateError("Failed to get relative path".to_string()))?;

            let template_name = relative_path.to_string_lossy().replace('\\', "/");

            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read template: {:?}", path))?;

            templates.push((template_name, content));
        }
    }

    Ok(())
}

/// Flatten a Tera error chain into one message
fn format_tera_error(e: &tera::Error) -> String {
    use std::error::Error as StdError;
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(err) = source {
        message.push_str(": ");
        message.push_str(&err.to_string());
        source = err.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_in(dir: &Path) -> ThemeEngine {
        ThemeEngine::new(dir, DEFAULT_THEME).expect("Failed to create theme engine")
    }

    #[test]
    fn test_materializes_default_theme() {
        let dir = tempfile::tempdir().unwrap();
        let _engine = engine_in(dir.path());

        assert!(dir.path().join("default/base.html").exists());
        assert!(dir.path().join("default/index.html").exists());
        assert!(dir.path().join("default/post.html").exists());
    }

    #[test]
    fn test_renders_index() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_in(dir.path());

        let mut context = TeraContext::new();
        context.insert("site", &serde_json::json!({"site_name": "Test Blog", "site_description": "", "site_subtitle": "", "site_footer": "", "posts_per_page": 10}));
        context.insert("menu", &Vec::<serde_json::Value>::new());
        context.insert("sidebar_widgets", &Vec::<serde_json::Value>::new());
        context.insert("footer_widgets", &Vec::<serde_json::Value>::new());
        context.insert("appearance", &serde_json::json!({"active_theme": "", "custom_css": "", "custom_js": ""}));
        context.insert("posts", &Vec::<serde_json::Value>::new());
        context.insert("page_num", &1u32);
        context.insert("total_pages", &0u32);

        let html = engine.render("index.html", &context).expect("Render failed");
        assert!(html.contains("Test Blog"));
    }

    #[test]
    fn test_missing_template_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_in(dir.path());

        let result = engine.render("nonexistent.html", &TeraContext::new());
        assert!(result.is_err());
    }

    #[test]
    fn test_switch_to_missing_theme_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine_in(dir.path());

        let result = engine.switch_theme("nonexistent");

        assert!(result.success);
        assert!(result.used_fallback);
        assert!(result.error.is_some());
        assert_eq!(engine.current_theme(), DEFAULT_THEME);
    }

    #[test]
    fn test_switch_to_valid_theme() {
        let dir = tempfile::tempdir().unwrap();

        // A minimal custom theme
        let custom = dir.path().join("custom");
        fs::create_dir_all(&custom).unwrap();
        fs::write(custom.join("index.html"), "<html>custom</html>").unwrap();
        fs::write(
            custom.join("theme.json"),
            r#"{"display_name": "Custom", "version": "1.0", "author": "tester"}"#,
        )
        .unwrap();

        let mut engine = engine_in(dir.path());
        let result = engine.switch_theme("custom");

        assert!(result.success);
        assert!(!result.used_fallback);
        assert_eq!(engine.current_theme(), "custom");
        assert!(engine.has_template("index.html"));
    }

    #[test]
    fn test_theme_without_templates_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("empty")).unwrap();

        let mut engine = engine_in(dir.path());
        let result = engine.switch_theme("empty");

        assert!(result.used_fallback);
    }

    #[test]
    fn test_list_themes_includes_metadata() {
        let dir = tempfile::tempdir().unwrap();

        let custom = dir.path().join("custom");
        fs::create_dir_all(&custom).unwrap();
        fs::write(custom.join("index.html"), "x").unwrap();
        fs::write(
            custom.join("theme.json"),
            r#"{"display_name": "My Custom Theme"}"#,
        )
        .unwrap();

        let engine = engine_in(dir.path());
        let themes = engine.list_themes();

        assert!(themes.iter().any(|t| t.name == "default"));
        let custom = themes.iter().find(|t| t.name == "custom").unwrap();
        assert_eq!(custom.display_name, "My Custom Theme");
    }

    #[test]
    fn test_materialize_preserves_local_edits() {
        let dir = tempfile::tempdir().unwrap();
        let _engine = engine_in(dir.path());

        let index = dir.path().join("default/index.html");
        fs::write(&index, "edited").unwrap();

        // A second engine start must not overwrite the edit
        let _engine2 = engine_in(dir.path());
        assert_eq!(fs::read_to_string(&index).unwrap(), "edited");
    }
}

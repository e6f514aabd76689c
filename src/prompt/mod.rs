//! Versioned prompt definitions.
//!
//! A definition lives at `<base>/<name>/<version>.yaml` with a `system` string and a `user`
//! template. Rendering fills `{{key}}` placeholders in the user template and prefixes the
//! system text.

pub mod error;

pub use error::{PromptError, PromptResult};

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// One prompt version as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptDefinition {
    pub system: String,
    /// User template with `{{key}}` placeholders.
    #[serde(rename = "user")]
    pub user_template: String,
}

/// Source of prompt definitions.
pub trait PromptResolver: Send + Sync {
    /// Loads `name` at `version`; fails if no such definition exists.
    fn load(&self, name: &str, version: &str) -> PromptResult<PromptDefinition>;

    /// Renders `definition` as `system + "\n\n" + user`, placeholders substituted.
    fn render(&self, definition: &PromptDefinition, variables: &HashMap<String, String>) -> String {
        let rendered = render_template(&definition.user_template, variables);
        info!(
            rendered_len = rendered.len(),
            variables = ?variables.keys().collect::<Vec<_>>(),
            "prompt_render_success"
        );
        format!("{}\n\n{}", definition.system, rendered)
    }
}

/// Substitutes every `{{key}}` whose key is in `variables`, in a single left-to-right pass.
///
/// Substituted text is never re-scanned, so values containing `{{...}}` come through
/// verbatim. Placeholders without a matching variable are left as written.
pub fn render_template(template: &str, variables: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };

        match variables.get(&after[..end]) {
            Some(value) => {
                out.push_str(value);
                rest = &after[end + 2..];
            }
            None => {
                // Step one brace so "{{{name}}" still matches "{{name}}".
                out.push('{');
                rest = &rest[start + 1..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// Reads definitions from a directory tree of YAML files.
#[derive(Debug, Clone)]
pub struct FilePromptLoader {
    base_path: PathBuf,
}

impl FilePromptLoader {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Location of `name` at `version`.
    pub fn path_for(&self, name: &str, version: &str) -> PathBuf {
        self.base_path.join(name).join(format!("{version}.yaml"))
    }

    fn read(path: &Path) -> PromptResult<PromptDefinition> {
        let raw = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                PromptError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                PromptError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        serde_yaml::from_str(&raw).map_err(|source| PromptError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl PromptResolver for FilePromptLoader {
    fn load(&self, name: &str, version: &str) -> PromptResult<PromptDefinition> {
        let path = self.path_for(name, version);
        match Self::read(&path) {
            Ok(definition) => {
                info!(name, version, path = %path.display(), "prompt_load_success");
                Ok(definition)
            }
            Err(e) => {
                error!(name, version, error = %e, "prompt_load_failed");
                Err(e)
            }
        }
    }
}

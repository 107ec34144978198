//! Artifact descriptors and the names derived from them.

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::config::LegacyOverride;
use crate::error::PipelineError;

/// The parameters that fully determine one compiled stylesheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDescriptor {
    pub domain: String,
    pub model: String,
    #[serde(deserialize_with = "string_or_number")]
    pub model_id: String,
    pub color: String,
    pub card: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

/// Lowercase the domain and replace every `.` with `_`.
pub fn normalize_domain(domain: &str) -> String {
    domain.replace('.', "_").to_lowercase()
}

impl ArtifactDescriptor {
    /// `{domain}-{model}-{model_id}.css`, domain normalized, model lowercased.
    pub fn derived_file_name(&self) -> String {
        format!(
            "{}-{}-{}.css",
            normalize_domain(&self.domain),
            self.model.to_lowercase(),
            self.model_id
        )
    }

    /// Name of the compiled artifact: legacy override, then the explicit
    /// `file_name`, then the derived name.
    pub fn artifact_file_name(&self, legacy: Option<&LegacyOverride>) -> String {
        if let Some(legacy) = legacy.filter(|l| l.domain == self.domain) {
            return legacy.file_name.clone();
        }
        match self.file_name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self.derived_file_name(),
        }
    }
}

/// Check that `name` is one plain file name, so joining it onto the output
/// directory or the artifact prefix cannot leave them.
pub fn check_file_name(name: &str) -> Result<(), PipelineError> {
    let reason = if name.is_empty() {
        Some("empty")
    } else if name.contains('/') || name.contains('\\') {
        Some("contains a path separator")
    } else if name == "." || name == ".." || name.contains("..") {
        Some("contains '..'")
    } else if Path::new(name).is_absolute() {
        Some("absolute path")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(PipelineError::InvalidArtifactName {
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Model ids arrive as JSON strings or numbers; store them as strings.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Str(s) => s,
        Raw::Int(i) => i.to_string(),
        Raw::Float(f) => f.to_string(),
    })
}

//! The config manifest: every descriptor ever published, nested by
//! domain → model → model id.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::descriptor::ArtifactDescriptor;
use crate::error::{PipelineError, PipelineResult};

type ModelIds = BTreeMap<String, ArtifactDescriptor>;
type Models = BTreeMap<String, ModelIds>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    domains: BTreeMap<String, Models>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `descriptor`, replacing whatever was stored for its
    /// (domain, model, model id) triple.
    pub fn insert(&mut self, descriptor: ArtifactDescriptor) {
        self.domains
            .entry(descriptor.domain.clone())
            .or_default()
            .entry(descriptor.model.clone())
            .or_default()
            .insert(descriptor.model_id.clone(), descriptor);
    }

    pub fn get(&self, domain: &str, model: &str, model_id: &str) -> Option<&ArtifactDescriptor> {
        self.domains.get(domain)?.get(model)?.get(model_id)
    }

    /// Leaf descriptors in domain, model, model id order.
    pub fn descriptors(&self) -> impl Iterator<Item = &ArtifactDescriptor> {
        self.domains
            .values()
            .flat_map(|models| models.values())
            .flat_map(|ids| ids.values())
    }

    pub fn len(&self) -> usize {
        self.descriptors().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Parse a manifest. `location` only labels the error.
    pub fn from_slice(bytes: &[u8], location: &str) -> PipelineResult<Self> {
        serde_json::from_slice(bytes).map_err(|source| PipelineError::MalformedManifest {
            location: location.to_string(),
            source,
        })
    }

    pub fn to_vec(&self) -> Vec<u8> {
        // String keys and string fields only; serialization cannot fail.
        serde_json::to_vec(self).unwrap_or_else(|_| b"{}".to_vec())
    }

    /// Read the manifest at `path`; a missing file is an empty manifest.
    pub async fn load(path: &Path) -> PipelineResult<Self> {
        match tokio::fs::read(path).await {
            Ok(bytes) => {
                let manifest = Self::from_slice(&bytes, &path.display().to_string())?;
                debug!(path = %path.display(), entries = manifest.len(), "Loaded manifest");
                Ok(manifest)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No manifest yet, starting empty");
                Ok(Self::new())
            }
            Err(e) => Err(PipelineError::io(path, e)),
        }
    }

    /// Write the whole manifest to `path`, creating parent directories.
    pub async fn save(&self, path: &Path) -> PipelineResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PipelineError::io(parent, e))?;
        }
        tokio::fs::write(path, self.to_vec())
            .await
            .map_err(|e| PipelineError::io(path, e))
    }
}

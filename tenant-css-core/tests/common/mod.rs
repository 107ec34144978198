#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use tenant_css_core::config::{PipelineConfig, StorageMode};
use tenant_css_core::contract::{BlobStore, SourceControl, StyleCompiler};
use tenant_css_core::{ArtifactDescriptor, PipelineContext};

/// Local-mode config rooted at `work_dir`.
pub fn local_config(work_dir: &Path) -> PipelineConfig {
    PipelineConfig {
        storage_mode: StorageMode::Local,
        work_dir: work_dir.to_path_buf(),
        ..PipelineConfig::default()
    }
}

pub fn context(
    config: PipelineConfig,
    store: impl BlobStore + 'static,
    compiler: impl StyleCompiler + 'static,
    source_control: impl SourceControl + 'static,
) -> PipelineContext {
    PipelineContext::new(
        config,
        Arc::new(store),
        Arc::new(compiler),
        Arc::new(source_control),
    )
}

pub fn descriptor(domain: &str, model: &str, model_id: &str, color: &str, card: &str) -> ArtifactDescriptor {
    ArtifactDescriptor {
        domain: domain.to_string(),
        model: model.to_string(),
        model_id: model_id.to_string(),
        color: color.to_string(),
        card: card.to_string(),
        file_name: None,
    }
}

/// The descriptor used across the publish/resolve scenarios.
pub fn program_four() -> ArtifactDescriptor {
    descriptor("app.practera.com", "Program", "4", "#ffe600", "memphis-light.png")
}

/// Minimal SASS tree: an entry importing the variables file.
pub fn write_scss_tree(scss_dir: &Path) {
    std::fs::create_dir_all(scss_dir).unwrap();
    std::fs::write(
        scss_dir.join("practera.scss"),
        "/*! vendor banner */\n@import 'custom-variables';\n.card { color: $primary; background-image: $cardImage; }\n",
    )
    .unwrap();
}

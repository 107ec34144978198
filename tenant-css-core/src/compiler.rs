//! SASS compilation with the pure-Rust `grass` compiler.

use std::path::PathBuf;
use std::sync::OnceLock;

use async_trait::async_trait;
use grass::{Options, OutputStyle};
use regex::Regex;
use tracing::{debug, error};

use crate::contract::{CompileRequest, StyleCompiler};
use crate::error::CompileError;

/// Compiles the entry stylesheet of a local SASS tree to compressed CSS.
///
/// `grass` is synchronous and CPU-bound, so each compile runs on the
/// blocking pool.
#[derive(Debug, Clone, Default)]
pub struct GrassCompiler {
    /// Extra directories searched by `@import`/`@use`, after the tree itself.
    pub extra_load_paths: Vec<PathBuf>,
}

impl GrassCompiler {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StyleCompiler for GrassCompiler {
    async fn compile<'a>(&self, req: CompileRequest<'a>) -> Result<String, CompileError> {
        let entry = req.source_dir.join(req.entry);
        let mut load_paths = vec![req.source_dir.to_path_buf()];
        load_paths.extend(self.extra_load_paths.iter().cloned());
        debug!(entry = %entry.display(), "Compiling stylesheet");

        let task_entry = entry.clone();
        let compiled = tokio::task::spawn_blocking(move || {
            let options = Options::default()
                .load_paths(load_paths.as_slice())
                .style(OutputStyle::Compressed);
            grass::from_path(&task_entry, &options)
        })
        .await
        .map_err(|e| CompileError::Aborted(e.to_string()))?;

        compiled.map_err(|e| {
            error!(entry = %entry.display(), error = %e, "SASS compilation failed");
            CompileError::Sass {
                entry,
                message: e.to_string(),
            }
        })
    }
}

fn special_comment() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)/\*!.*?\*/").expect("static regex"))
}

/// Remove `/*! ... */` comments, which survive compressed output.
pub fn strip_special_comments(css: &str) -> String {
    special_comment().replace_all(css, "").trim().to_string()
}

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::models::options::TranspileOptions;
use crate::tpl::diagnostic::Diagnostic;
use crate::tpl::engine;

/// A template written to disk.
#[derive(Debug, Clone)]
pub struct ConvertedFile {
    pub source: PathBuf,
    pub target: PathBuf,
    pub diagnostics: Vec<Diagnostic>,
}

/// Converts a single template, or every template below a directory.
pub fn convert_path(path: &Path, options: &TranspileOptions) -> Result<Vec<ConvertedFile>> {
    if path.is_file() {
        return Ok(vec![convert_file(path, path.parent(), options)?]);
    }

    let mut converted = Vec::new();
    for file in template_files(path, options)? {
        converted.push(convert_file(&file, Some(path), options)?);
    }
    info!(
        root = %path.display(),
        files = converted.len(),
        "converted templates"
    );
    Ok(converted)
}

/// `path` itself when it is a file, otherwise every template below it in file name order.
pub fn template_files(path: &Path, options: &TranspileOptions) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", path.display()))?;
        let file = entry.path();
        if file.is_file() && has_extension(file, &options.source_extension) {
            files.push(file.to_path_buf());
        }
    }
    Ok(files)
}

/// Converts `path` and writes the result. `root` is the directory the output
/// layout is relative to when an output directory is configured.
pub fn convert_file(
    path: &Path,
    root: Option<&Path>,
    options: &TranspileOptions,
) -> Result<ConvertedFile> {
    let source =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let (output, diagnostics) = convert_source(&path.display().to_string(), &source, options)
        .with_context(|| format!("Failed to transpile {}", path.display()))?;

    let target = target_path(path, root, options);
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(&target, &output)
        .with_context(|| format!("Failed to write {}", target.display()))?;
    debug!(source = %path.display(), output = %target.display(), "wrote template");

    Ok(ConvertedFile {
        source: path.to_path_buf(),
        target,
        diagnostics,
    })
}

/// Transpiles `source` and applies the output conventions of `options`.
pub fn convert_source(
    name: &str,
    source: &str,
    options: &TranspileOptions,
) -> Result<(String, Vec<Diagnostic>)> {
    let transpiled = engine::transpile_template(name, source, options)?;
    let output = if options.source_comment {
        engine::with_source_comment(&transpiled.output, source)
    } else {
        transpiled.output
    };
    Ok((output, transpiled.diagnostics))
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().is_some_and(|ext| ext == extension)
}

/// `dir/card.hbs` becomes `dir/card.html`, or `<out_dir>/<relative>/card.html`.
pub fn target_path(path: &Path, root: Option<&Path>, options: &TranspileOptions) -> PathBuf {
    let renamed = path.with_extension(&options.target_extension);
    match (&options.out_dir, root) {
        (Some(out_dir), Some(root)) => match renamed.strip_prefix(root) {
            Ok(relative) => out_dir.join(relative),
            Err(_) => out_dir.join(renamed.file_name().unwrap_or_default()),
        },
        (Some(out_dir), None) => out_dir.join(renamed.file_name().unwrap_or_default()),
        (None, _) => renamed,
    }
}

use std::{
    collections::HashMap,
    fs,
    io::{Cursor, Read, Write},
    path::{Path, PathBuf},
};

use anyhow::Context;
use classremap::{
    rewriter::{ClassInput, ClassOutput},
    table::{JsonFileTable, RenameTable, TableProvider},
};

/// What kind of input was given on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    ClassFile,
    Directory,
    Archive,
}

/// Class files collected from an input path.
///
/// Class names are relative to the input, `/`-separated, and double as archive entry names.
pub struct LoadedInput {
    pub kind: InputKind,
    pub classes: Vec<ClassInput>,
    /// Non-class files of a directory, relative to it
    pub resources: Vec<PathBuf>,
    /// The whole archive, kept so it can be copied entry by entry on write
    archive: Option<Vec<u8>>,
}

/// Returns true if the path has a `.jar` or `.zip` extension.
pub fn is_archive(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("jar" | "zip")
    )
}

fn is_class_name(name: &str) -> bool {
    name.ends_with(".class")
}

/// Load every class file under `path`.
pub fn load_input(path: &Path) -> anyhow::Result<LoadedInput> {
    if path.is_dir() {
        let mut classes = Vec::new();
        let mut resources = Vec::new();
        collect_directory(path, path, &mut classes, &mut resources)?;
        classes.sort_by(|a, b| a.name.cmp(&b.name));
        return Ok(LoadedInput {
            kind: InputKind::Directory,
            classes,
            resources,
            archive: None,
        });
    }

    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    if is_archive(path) {
        let classes = read_archive_classes(&bytes)
            .with_context(|| format!("failed to read archive: {}", path.display()))?;
        return Ok(LoadedInput {
            kind: InputKind::Archive,
            classes,
            resources: Vec::new(),
            archive: Some(bytes),
        });
    }

    Ok(LoadedInput {
        kind: InputKind::ClassFile,
        classes: vec![ClassInput::new(file_display_name(path), bytes)],
        resources: Vec::new(),
        archive: None,
    })
}

fn collect_directory(
    root: &Path,
    dir: &Path,
    classes: &mut Vec<ClassInput>,
    resources: &mut Vec<PathBuf>,
) -> anyhow::Result<()> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("failed to read directory: {}", dir.display()))?;

    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            collect_directory(root, &path, classes, resources)?;
            continue;
        }
        let relative = path.strip_prefix(root)?.to_path_buf();
        if path.extension().is_some_and(|e| e == "class") {
            let bytes =
                fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
            classes.push(ClassInput::new(entry_name(&relative), bytes));
        } else {
            resources.push(relative);
        }
    }
    Ok(())
}

fn entry_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn read_archive_classes(bytes: &[u8]) -> anyhow::Result<Vec<ClassInput>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut classes = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() || !is_class_name(entry.name()) {
            continue;
        }
        let name = entry.name().to_string();
        let mut data = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut data)
            .with_context(|| format!("failed to read entry {name}"))?;
        classes.push(ClassInput::new(name, data));
    }
    Ok(classes)
}

impl LoadedInput {
    /// Write `outputs` to `target`, keeping everything that is not a class as it was.
    ///
    /// When writing back over the input only changed classes are touched. Returns the
    /// number of class files written (for archives, the number of replaced entries).
    pub fn write(
        &self,
        source: &Path,
        target: &Path,
        outputs: &[ClassOutput],
    ) -> anyhow::Result<usize> {
        let in_place = source == target;
        match self.kind {
            InputKind::ClassFile => {
                let Some(output) = outputs.first() else {
                    return Ok(0);
                };
                if in_place && !output.outcome.is_rewritten() {
                    return Ok(0);
                }
                write_file(target, output.outcome.class())?;
                Ok(1)
            }
            InputKind::Directory => {
                let mut written = 0;
                for output in outputs {
                    if in_place && !output.outcome.is_rewritten() {
                        continue;
                    }
                    write_file(&target.join(&output.name), output.outcome.class())?;
                    written += 1;
                }
                if !in_place {
                    for resource in &self.resources {
                        let destination = target.join(resource);
                        if let Some(parent) = destination.parent() {
                            fs::create_dir_all(parent)?;
                        }
                        fs::copy(source.join(resource), &destination).with_context(|| {
                            format!("failed to copy {}", destination.display())
                        })?;
                    }
                }
                Ok(written)
            }
            InputKind::Archive => {
                if in_place && !outputs.iter().any(|output| output.outcome.is_rewritten()) {
                    return Ok(0);
                }
                let archive = self.archive.as_deref().unwrap_or_default();
                let bytes = rewrite_archive(archive, outputs)?;
                write_file(target, &bytes)?;
                Ok(outputs
                    .iter()
                    .filter(|output| output.outcome.is_rewritten())
                    .count())
            }
        }
    }
}

/// Copy `archive` entry by entry, replacing class entries with their rewritten bytes.
fn rewrite_archive(archive: &[u8], outputs: &[ClassOutput]) -> anyhow::Result<Vec<u8>> {
    let replacements: HashMap<&str, &ClassOutput> = outputs
        .iter()
        .map(|output| (output.name.as_str(), output))
        .collect();

    let mut reader = zip::ZipArchive::new(Cursor::new(archive))?;
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for i in 0..reader.len() {
        let entry = reader.by_index_raw(i)?;
        match replacements.get(entry.name()) {
            Some(output) if output.outcome.is_rewritten() => {
                let options = zip::write::FileOptions::default()
                    .compression_method(entry.compression())
                    .last_modified_time(entry.last_modified());
                writer.start_file(entry.name(), options)?;
                writer.write_all(output.outcome.class())?;
            }
            _ => writer.raw_copy_file(entry)?,
        }
    }
    Ok(writer.finish()?.into_inner())
}

fn write_file(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }
    fs::write(path, bytes).with_context(|| format!("failed to write output: {}", path.display()))
}

/// Resolve a rename table file.
pub fn load_table(path: &Path) -> anyhow::Result<RenameTable> {
    JsonFileTable::new(path)
        .resolve()
        .with_context(|| format!("failed to load rename table: {}", path.display()))
}

/// Extract a display-friendly filename from a path.
pub fn file_display_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    )
}

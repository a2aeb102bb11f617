use crate::index::memory::MemoryIndex;
use crate::index::types::Record;
use crate::utils::is_binary;
use crate::utils::progress;
use anyhow::{Context, Result};
use ignore::WalkBuilder;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Files larger than this are listed but their lines are not indexed
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Records produced for a single file (computed in parallel)
struct ProcessedFile {
    file: Record,
    lines: Vec<Record>,
}

/// Turn one file's content into a file record and its line records
fn process_file_content(rel_path: &str, content: &[u8]) -> ProcessedFile {
    let mut file = Record::file(rel_path);

    if is_binary(content) {
        file.is_binary = true;
        return ProcessedFile {
            file,
            lines: Vec::new(),
        };
    }

    let text = String::from_utf8_lossy(content);
    let lines = text
        .split_inclusive('\n')
        .enumerate()
        .map(|(i, line)| Record::line(rel_path, (i + 1) as u32, line))
        .collect();

    ProcessedFile { file, lines }
}

/// Slash-separated path relative to the walk root
fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Walk a source tree into folder, file and line records
pub fn load_tree(root_path: &Path, silent: bool) -> Result<Vec<Record>> {
    let root = root_path.canonicalize().context("Invalid path")?;

    let spinner = (!silent).then(|| progress::spinner("Discovering files..."));

    let walker = WalkBuilder::new(&root)
        .hidden(true)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .filter_entry(|entry| {
            let name = entry.file_name().to_string_lossy();
            !matches!(
                name.as_ref(),
                ".git" | ".hg" | ".svn" | "node_modules" | "target" | "__pycache__" | ".venv"
            )
        })
        .build();

    let mut folders = Vec::new();
    let mut files: Vec<(PathBuf, String)> = Vec::new();
    for entry in walker.filter_map(|entry| entry.ok()) {
        let Some(rel_path) = relative_path(&root, entry.path()) else {
            continue;
        };
        match entry.file_type() {
            Some(ft) if ft.is_dir() => folders.push(Record::folder(&rel_path)),
            Some(ft) if ft.is_file() => files.push((entry.path().to_path_buf(), rel_path)),
            _ => {}
        }
    }

    if let Some(spinner) = spinner {
        spinner.finish_with_message(format!("Found {} files", files.len()));
    }

    let progress_bar = (!silent).then(|| progress::counter(files.len() as u64, "Reading files..."));

    let error_count = AtomicUsize::new(0);
    let processed: Vec<ProcessedFile> = files
        .par_iter()
        .map(|(full_path, rel_path)| {
            let content = match full_path.metadata() {
                Ok(meta) if meta.len() > MAX_FILE_SIZE => None,
                _ => match fs::read(full_path) {
                    Ok(c) => Some(c),
                    Err(err) => {
                        tracing::debug!(path = %full_path.display(), %err, "unreadable file");
                        error_count.fetch_add(1, Ordering::Relaxed);
                        None
                    }
                },
            };
            if let Some(ref pb) = progress_bar {
                pb.inc(1);
            }
            match content {
                Some(content) => process_file_content(rel_path, &content),
                None => ProcessedFile {
                    file: Record::file(rel_path),
                    lines: Vec::new(),
                },
            }
        })
        .collect();

    let mut records = folders;
    let mut line_records = Vec::new();
    for ProcessedFile { file, lines } in processed {
        records.push(file);
        line_records.extend(lines);
    }
    let file_count = records.len();
    records.extend(line_records);

    if let Some(pb) = progress_bar {
        pb.finish_with_message(format!("Loaded {} lines", records.len() - file_count));
    }

    let errors = error_count.load(Ordering::Relaxed);
    if errors > 0 && !silent {
        eprintln!("({} files could not be read)", errors);
    }

    Ok(records)
}

/// Walk a source tree straight into a [`MemoryIndex`]
pub fn index_tree(root_path: &Path, silent: bool) -> Result<MemoryIndex> {
    Ok(MemoryIndex::from_records(load_tree(root_path, silent)?))
}

//! Dictionary detection for content, files and whole packages

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;

use crate::dictionary::DictionaryId;
use crate::rules::{lookup_extension, RULES};

/// Bytes of a file looked at by the content rules
pub const SAMPLE_LIMIT: usize = 64 * 1024;

/// Files sampled per package before giving up on the rest
const MAX_PACKAGE_FILES: usize = 512;

/// Classify a content sample. Never fails; unknown content is `generic`.
pub fn detect(content: &str) -> DictionaryId {
    let sample = truncate(content, SAMPLE_LIMIT);
    if sample.trim().is_empty() {
        return DictionaryId::Generic;
    }

    RULES
        .iter()
        .find(|rule| rule.matches(sample))
        .map(|rule| rule.id)
        .unwrap_or(DictionaryId::Generic)
}

/// Classify a file: extension table first, then a content sample
pub fn detect_path(path: &Path) -> DictionaryId {
    if let Some(id) = path.file_name().and_then(|n| n.to_str()).and_then(lookup_extension) {
        return id;
    }

    match read_sample(path) {
        Some(sample) => detect(&sample),
        None => DictionaryId::Generic,
    }
}

/// Classify content whose file name is known
pub fn detect_named(file_name: &str, content: &str) -> DictionaryId {
    lookup_extension(file_name).unwrap_or_else(|| detect(content))
}

/// The dictionary covering most bytes of an extracted package.
///
/// `package.json` is ignored since every package has one; ties go to the
/// dictionary listed first.
pub fn detect_package(dir: &Path) -> DictionaryId {
    let mut bytes: HashMap<DictionaryId, u64> = HashMap::new();

    let files = WalkDir::new(dir)
        .into_iter()
        .filter_entry(|e| e.file_name() != "node_modules")
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && e.file_name() != "package.json")
        .take(MAX_PACKAGE_FILES);

    for entry in files {
        let id = entry
            .file_name()
            .to_str()
            .and_then(lookup_extension)
            .unwrap_or(DictionaryId::Generic);
        if id == DictionaryId::Generic {
            continue;
        }
        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        *bytes.entry(id).or_default() += size.max(1);
    }

    let dominant = DictionaryId::ALL
        .into_iter()
        .filter_map(|id| bytes.get(&id).map(|size| (id, *size)))
        .fold(None::<(DictionaryId, u64)>, |best, (id, size)| match best {
            Some((_, best_size)) if best_size >= size => best,
            _ => Some((id, size)),
        })
        .map(|(id, _)| id)
        .unwrap_or(DictionaryId::Generic);

    debug!("package at {} detected as {}", dir.display(), dominant);
    dominant
}

fn read_sample(path: &Path) -> Option<String> {
    let file = File::open(path).ok()?;
    let mut buffer = Vec::with_capacity(4096);
    file.take(SAMPLE_LIMIT as u64).read_to_end(&mut buffer).ok()?;
    Some(String::from_utf8_lossy(&buffer).into_owned())
}

fn truncate(content: &str, limit: usize) -> &str {
    if content.len() <= limit {
        return content;
    }
    let mut end = limit;
    while !content.is_char_boundary(end) {
        end -= 1;
    }
    &content[..end]
}

#[cfg(test)]
mod tests;

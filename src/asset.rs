//! Asset requests and archive entry naming.
//!
//! Media records arrive as [`AssetDescriptor`]s (URL, title, original
//! filename, format). Each becomes an [`AssetRequest`] whose entry name is
//! derived from the title with every non-alphanumeric character replaced by
//! `_`. Titles such as `"Beach!1"` and `"Beach 1"` therefore collide, which
//! [`disambiguate`] resolves by suffixing in input order.

use std::collections::HashSet;

use serde::Deserialize;

use crate::error::ArchiveError;

/// Longest name the 16-bit ZIP name length field can describe.
pub const MAX_ENTRY_NAME_LEN: usize = u16::MAX as usize;

/// Extension used when neither the filename nor the format provides one.
const FALLBACK_EXTENSION: &str = "jpg";

/// One remote resource to place in the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRequest {
    pub source_url: String,
    pub entry_name: String,
}

impl AssetRequest {
    pub fn new(source_url: impl Into<String>, entry_name: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            entry_name: entry_name.into(),
        }
    }
}

/// A media record as handed over by the gallery backend.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssetDescriptor {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
}

impl AssetDescriptor {
    /// Archive entry name for the descriptor at position `index` of a batch.
    pub fn entry_name(&self, index: usize) -> String {
        if let Some(title) = self.title.as_deref().filter(|t| !t.is_empty()) {
            let stem: String = title
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
                .collect();
            return format!("{}.{}", stem, self.extension());
        }

        match self.filename.as_deref().filter(|f| !f.is_empty()) {
            Some(filename) => filename.to_string(),
            None => format!("image-{}.{}", index + 1, self.extension()),
        }
    }

    fn extension(&self) -> &str {
        self.filename
            .as_deref()
            .and_then(|f| f.rsplit_once('.'))
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty())
            .or_else(|| self.format.as_deref().filter(|f| !f.is_empty()))
            .unwrap_or(FALLBACK_EXTENSION)
    }

    pub fn into_request(self, index: usize) -> AssetRequest {
        let entry_name = self.entry_name(index);
        AssetRequest {
            source_url: self.url,
            entry_name,
        }
    }
}

/// Convert a batch of descriptors into requests with unique names.
pub fn requests_from_descriptors(descriptors: Vec<AssetDescriptor>) -> Vec<AssetRequest> {
    let requests = descriptors
        .into_iter()
        .enumerate()
        .map(|(i, d)| d.into_request(i))
        .collect();
    disambiguate(requests)
}

/// Check that `name` can be written as an archive entry without escaping
/// the extraction directory.
pub fn validate_entry_name(name: &str) -> Result<(), ArchiveError> {
    let reject = |reason| {
        Err(ArchiveError::InvalidEntryName {
            name: name.to_string(),
            reason,
        })
    };

    if name.is_empty() {
        return reject("name is empty");
    }
    if name.len() > MAX_ENTRY_NAME_LEN {
        return reject("name is longer than 65535 bytes");
    }
    if name.contains('\0') {
        return reject("name contains a NUL byte");
    }
    if name.contains('\\') {
        return reject("name contains a backslash");
    }
    if name.starts_with('/') {
        return reject("name is an absolute path");
    }
    if name.ends_with('/') {
        return reject("name denotes a directory");
    }
    // Windows drive prefix such as `C:`
    if name.len() >= 2 && name.as_bytes()[1] == b':' && name.as_bytes()[0].is_ascii_alphabetic() {
        return reject("name has a drive prefix");
    }
    for segment in name.split('/') {
        match segment {
            "" => return reject("name has an empty path segment"),
            "." | ".." => return reject("name has a relative path segment"),
            _ => {}
        }
    }

    Ok(())
}

/// Give every request a unique entry name.
///
/// The first request with a given name keeps it; later ones become
/// `stem-2.ext`, `stem-3.ext`, and so on, skipping names already in use.
pub fn disambiguate(mut requests: Vec<AssetRequest>) -> Vec<AssetRequest> {
    let mut taken: HashSet<String> = HashSet::with_capacity(requests.len());
    let originals: HashSet<String> = requests.iter().map(|r| r.entry_name.clone()).collect();

    for request in &mut requests {
        if taken.insert(request.entry_name.clone()) {
            continue;
        }

        let (stem, ext) = split_extension(&request.entry_name);
        let mut n = 2usize;
        let unique = loop {
            let candidate = match ext {
                Some(ext) => format!("{stem}-{n}.{ext}"),
                None => format!("{stem}-{n}"),
            };
            if !taken.contains(&candidate) && !originals.contains(&candidate) {
                break candidate;
            }
            n += 1;
        };

        taken.insert(unique.clone());
        request.entry_name = unique;
    }

    requests
}

/// Split `name` into stem and extension. A leading dot is part of the stem.
fn split_extension(name: &str) -> (&str, Option<&str>) {
    let base_start = name.rfind('/').map_or(0, |i| i + 1);
    match name[base_start..].rfind('.') {
        Some(0) | None => (name, None),
        Some(dot) => {
            let dot = base_start + dot;
            (&name[..dot], Some(&name[dot + 1..]))
        }
    }
}

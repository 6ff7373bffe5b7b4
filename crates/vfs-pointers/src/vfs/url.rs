//! URL and path helpers shared by the trie and the namespaces.
//!
//! Urls have the shape `protocol://path`. Paths are absolute and `/`
//! separated; archive urls carry the host path and the entry path joined by
//! `!/`, e.g. `jar:///lib/rt.jar!/java/lang/Object.class`.

use std::cmp::Ordering;

use crate::error::{PointerError, Result};

pub const PROTOCOL_SEPARATOR: &str = "://";
pub const ARCHIVE_SEPARATOR: &str = "!/";
/// Name of the trie segment that stands for a namespace root.
pub const ROOT_SEGMENT: &str = "/";
/// Protocol assumed for urls given as bare paths.
pub const DEFAULT_PROTOCOL: &str = "file";

/// A url split into protocol and normalized path parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUrl {
    pub protocol: String,
    /// Absolute path inside the host namespace.
    pub host_path: String,
    /// Path inside the archive mounted on `host_path`, without leading slash.
    pub entry_path: Option<String>,
}

impl ParsedUrl {
    /// Parses `url`, treating `!/` as an archive boundary when `archive` is set.
    pub fn parse(url: &str, archive: bool) -> Result<Self> {
        let (protocol, path) = split_url(url);
        if archive {
            let Some(split) = path.find(ARCHIVE_SEPARATOR) else {
                return Err(PointerError::MalformedUrl(format!(
                    "{url}: archive url without {ARCHIVE_SEPARATOR}"
                )));
            };
            let host_path = normalize_path(&path[..split], url)?;
            let entry = normalize_path(&format!("/{}", &path[split + ARCHIVE_SEPARATOR.len()..]), url)?;
            Ok(Self {
                protocol: protocol.to_string(),
                host_path,
                entry_path: Some(entry.trim_start_matches('/').to_string()),
            })
        } else {
            Ok(Self {
                protocol: protocol.to_string(),
                host_path: normalize_path(path, url)?,
                entry_path: None,
            })
        }
    }

    /// Segment names below the namespace root, archive separator included.
    pub fn segments(&self) -> Vec<&str> {
        let mut segments: Vec<&str> = path_segments(&self.host_path).collect();
        if let Some(entry) = &self.entry_path {
            segments.push(ARCHIVE_SEPARATOR);
            segments.extend(path_segments(entry));
        }
        segments
    }

    /// Number of leading segments that belong to the host namespace.
    pub fn host_segment_count(&self) -> usize {
        path_segments(&self.host_path).count()
    }

    pub fn to_url(&self) -> String {
        let mut path = self.host_path.clone();
        if let Some(entry) = &self.entry_path {
            path.push_str(ARCHIVE_SEPARATOR);
            path.push_str(entry);
        }
        to_url(&self.protocol, &path)
    }
}

/// Splits a url into protocol and path; bare paths get the default protocol.
pub fn split_url(url: &str) -> (&str, &str) {
    match url.find(PROTOCOL_SEPARATOR) {
        Some(pos) => (&url[..pos], &url[pos + PROTOCOL_SEPARATOR.len()..]),
        None => (DEFAULT_PROTOCOL, url),
    }
}

pub fn protocol_of(url: &str) -> &str {
    split_url(url).0
}

pub fn to_url(protocol: &str, path: &str) -> String {
    let mut url = String::with_capacity(protocol.len() + PROTOCOL_SEPARATOR.len() + path.len());
    url.push_str(protocol);
    url.push_str(PROTOCOL_SEPARATOR);
    url.push_str(path);
    url
}

/// Normalizes an absolute path: `\` becomes `/`, `.`/`..` and repeated
/// separators are resolved, trailing separators dropped.
pub fn normalize_path(path: &str, url: &str) -> Result<String> {
    let path = path.replace('\\', "/");
    if !path.starts_with('/') {
        return Err(PointerError::MalformedUrl(format!(
            "{url}: path must be absolute"
        )));
    }
    let cleaned = path_clean::clean(&path);
    let cleaned = cleaned.to_string_lossy().replace('\\', "/");
    if cleaned.starts_with('/') {
        Ok(cleaned)
    } else {
        Ok(format!("/{cleaned}"))
    }
}

fn path_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

/// Appends one trie segment to a path under construction.
pub fn push_segment(path: &mut String, name: &str) {
    if path.is_empty() || path.ends_with('/') || name == ARCHIVE_SEPARATOR {
        path.push_str(name);
    } else {
        path.push('/');
        path.push_str(name);
    }
}

/// Last path component of a url, `/` for namespace roots.
pub fn file_name_of(url: &str) -> &str {
    let (_, path) = split_url(url);
    let trimmed = path.trim_end_matches('/').trim_end_matches('!');
    match trimmed.rfind('/') {
        Some(pos) if pos + 1 < trimmed.len() => &trimmed[pos + 1..],
        _ if trimmed.is_empty() => ROOT_SEGMENT,
        _ => trimmed,
    }
}

/// Orders segment names under a case rule.
pub fn compare_names(a: &str, b: &str, case_sensitive: bool) -> Ordering {
    if case_sensitive {
        a.cmp(b)
    } else {
        a.chars()
            .flat_map(char::to_lowercase)
            .cmp(b.chars().flat_map(char::to_lowercase))
    }
}

#[inline]
pub fn names_equal(a: &str, b: &str, case_sensitive: bool) -> bool {
    compare_names(a, b, case_sensitive) == Ordering::Equal
}

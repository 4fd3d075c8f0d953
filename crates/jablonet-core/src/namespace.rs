// ── Flat namespace addressing ──
//
// Dot-delimited paths into the host store, built one sanitized segment at
// a time, plus the registry of paths already declared by this process.

use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

/// Substitute for every run of characters the host does not accept.
pub const PLACEHOLDER: char = '_';

/// A dot-delimited address of a single entry in the host store.
///
/// Segments are sanitized on the way in, so a `NamespacePath` only ever
/// contains characters the host accepts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NamespacePath(String);

impl NamespacePath {
    /// Single-segment path.
    pub fn root(segment: &str) -> Self {
        Self(sanitize_segment(segment).into_owned())
    }

    /// Wrap a path whose segments are already known to be valid.
    pub fn from_sanitized(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Append one raw segment, sanitizing it.
    pub fn child(&self, segment: &str) -> Self {
        Self(format!("{}.{}", self.0, sanitize_segment(segment)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last segment.
    pub fn leaf_name(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for NamespacePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NamespacePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Characters accepted inside a segment: upper/lower case letters, decimal
/// digits and a fixed punctuation set. The dot is the separator and never
/// part of a segment.
fn is_allowed(c: char) -> bool {
    c.is_lowercase()
        || c.is_uppercase()
        || c.is_numeric()
        || matches!(
            c,
            '_' | '-' | '/' | ' ' | ':' | '!' | '#' | '$' | '%' | '&' | '(' | ')' | '+' | '='
                | '@' | '^' | '{' | '}' | '|' | '~'
        )
}

/// Replace every run of disallowed characters with a single placeholder.
///
/// Deterministic, and borrows when nothing needs rewriting. Distinct raw
/// names can map to the same result; the reconciler reports such
/// collisions and lets the later write win.
pub fn sanitize_segment(raw: &str) -> Cow<'_, str> {
    if raw.is_empty() {
        return Cow::Owned(PLACEHOLDER.to_string());
    }
    if raw.chars().all(is_allowed) {
        return Cow::Borrowed(raw);
    }

    let mut out = String::with_capacity(raw.len());
    let mut in_run = false;
    for c in raw.chars() {
        if is_allowed(c) {
            out.push(c);
            in_run = false;
        } else if !in_run {
            out.push(PLACEHOLDER);
            in_run = true;
        }
    }
    Cow::Owned(out)
}

/// Paths this process has declared. Grows monotonically, never evicts.
#[derive(Debug, Default)]
pub struct KnownPaths {
    paths: HashSet<NamespacePath>,
}

impl KnownPaths {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, path: &NamespacePath) -> bool {
        self.paths.contains(path)
    }

    /// Record a path. Returns `true` if it was not known before.
    pub fn register(&mut self, path: NamespacePath) -> bool {
        self.paths.insert(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

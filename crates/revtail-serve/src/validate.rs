// Copyright 2026 Revtail Project
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Query-parameter validation for the tail endpoint.
//!
//! Validation is a fixed, tagged list of rules, each a pure function from the
//! raw query to pass/fail-with-reason, run unconditionally in declaration
//! order. Path resolution (filesystem checks) runs separately, after the rule
//! list, because it touches the filesystem and maps to different status codes.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Raw query parameters as they arrive on the wire. Everything is optional
/// here; the rules decide what is required.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct TailParams {
    pub filepath: Option<String>,
    pub entries: Option<String>,
    pub search: Option<String>,
}

/// A validated request, ready to hand to the reader.
#[derive(Clone, Debug)]
pub struct TailRequest {
    pub filepath: String,
    pub entries: Option<u64>,
    pub search: Option<String>,
}

pub const MAX_FILEPATH_BYTES: usize = 4096;
pub const MAX_SEARCH_CHARS: usize = 10_000;

/// One validation rule: a stable tag plus a pure check.
pub struct ValidationRule {
    pub name: &'static str,
    pub check: fn(&TailParams) -> Result<(), String>,
}

/// All rules, in the order they run.
pub const RULES: &[ValidationRule] = &[
    ValidationRule {
        name: "filepath-required",
        check: filepath_required,
    },
    ValidationRule {
        name: "filepath-length",
        check: filepath_length,
    },
    ValidationRule {
        name: "entries-numeric",
        check: entries_numeric,
    },
    ValidationRule {
        name: "search-length",
        check: search_length,
    },
    ValidationRule {
        name: "search-visible",
        check: search_visible,
    },
];

fn filepath_required(p: &TailParams) -> Result<(), String> {
    match p.filepath.as_deref() {
        Some(s) if !s.is_empty() => Ok(()),
        Some(_) => Err("filepath must not be empty".to_string()),
        None => Err("filepath query parameter is required".to_string()),
    }
}

fn filepath_length(p: &TailParams) -> Result<(), String> {
    match p.filepath.as_deref() {
        Some(s) if s.len() > MAX_FILEPATH_BYTES => Err(format!(
            "filepath exceeds {} bytes",
            MAX_FILEPATH_BYTES
        )),
        _ => Ok(()),
    }
}

fn entries_numeric(p: &TailParams) -> Result<(), String> {
    match p.entries.as_deref() {
        None => Ok(()),
        Some(s) => s
            .parse::<u64>()
            .map(|_| ())
            .map_err(|_| format!("entries must be a non-negative integer, got {:?}", s)),
    }
}

fn search_length(p: &TailParams) -> Result<(), String> {
    match p.search.as_deref() {
        None => Ok(()),
        Some(s) => {
            let n = s.chars().count();
            if n == 0 || n > MAX_SEARCH_CHARS {
                Err(format!(
                    "search must be 1-{} characters, got {}",
                    MAX_SEARCH_CHARS, n
                ))
            } else {
                Ok(())
            }
        }
    }
}

/// Format characters that render as nothing but change matching semantics:
/// zero-width spaces/joiners, bidi controls, word joiner, BOM.
const INVISIBLE: &[char] = &[
    '\u{200B}', '\u{200C}', '\u{200D}', '\u{200E}', '\u{200F}', '\u{202A}', '\u{202B}',
    '\u{202C}', '\u{202D}', '\u{202E}', '\u{2060}', '\u{2066}', '\u{2067}', '\u{2068}',
    '\u{2069}', '\u{FEFF}',
];

fn search_visible(p: &TailParams) -> Result<(), String> {
    let s = match p.search.as_deref() {
        None => return Ok(()),
        Some(s) => s,
    };
    if let Some(c) = s.chars().find(|c| c.is_control() || INVISIBLE.contains(c)) {
        return Err(format!(
            "search must not contain control or invisible characters (found U+{:04X})",
            c as u32
        ));
    }
    Ok(())
}

/// Run every rule in order; the first failure wins.
pub fn validate(params: &TailParams) -> Result<TailRequest, String> {
    for rule in RULES {
        (rule.check)(params).map_err(|reason| format!("{}: {}", rule.name, reason))?;
    }
    // Rules have established presence and parseability.
    let filepath = params.filepath.clone().unwrap_or_default();
    let entries = params.entries.as_deref().and_then(|s| s.parse().ok());
    Ok(TailRequest {
        filepath,
        entries,
        search: params.search.clone(),
    })
}

/// Why a path could not be served. Maps to the response status in `web`.
#[derive(Debug, PartialEq, Eq)]
pub enum ResolveError {
    /// The target does not exist (or a parent component is missing).
    NotFound,
    /// The resolved path escapes the base directory.
    Escapes,
    /// The target exists but is not a regular file.
    NotAFile,
}

/// Resolve `filepath` under the (already canonical) base directory and check
/// it stays inside and points at a regular file.
pub fn resolve_under_base(base: &Path, filepath: &str) -> Result<PathBuf, ResolveError> {
    let joined = base.join(filepath.trim_start_matches('/'));
    let resolved = joined.canonicalize().map_err(|_| ResolveError::NotFound)?;
    if !resolved.starts_with(base) {
        return Err(ResolveError::Escapes);
    }
    let meta = std::fs::metadata(&resolved).map_err(|_| ResolveError::NotFound)?;
    if !meta.is_file() {
        return Err(ResolveError::NotAFile);
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn params(filepath: Option<&str>, entries: Option<&str>, search: Option<&str>) -> TailParams {
        TailParams {
            filepath: filepath.map(|s| s.to_string()),
            entries: entries.map(|s| s.to_string()),
            search: search.map(|s| s.to_string()),
        }
    }

    #[test]
    fn accepts_a_minimal_valid_query() {
        let req = validate(&params(Some("app.log"), None, None)).unwrap();
        assert_eq!(req.filepath, "app.log");
        assert_eq!(req.entries, None);
        assert_eq!(req.search, None);
    }

    #[test]
    fn accepts_entries_and_search() {
        let req = validate(&params(Some("app.log"), Some("50"), Some("ERROR"))).unwrap();
        assert_eq!(req.entries, Some(50));
        assert_eq!(req.search.as_deref(), Some("ERROR"));
    }

    #[test]
    fn missing_filepath_fails_with_rule_tag() {
        let err = validate(&params(None, None, None)).unwrap_err();
        assert!(err.starts_with("filepath-required:"), "got {err}");
    }

    #[test]
    fn empty_filepath_is_rejected() {
        assert!(validate(&params(Some(""), None, None)).is_err());
    }

    #[test]
    fn oversized_filepath_is_rejected() {
        let long = "x".repeat(MAX_FILEPATH_BYTES + 1);
        let err = validate(&params(Some(&long), None, None)).unwrap_err();
        assert!(err.starts_with("filepath-length:"), "got {err}");
    }

    #[test]
    fn non_numeric_entries_is_rejected() {
        let err = validate(&params(Some("a.log"), Some("ten"), None)).unwrap_err();
        assert!(err.starts_with("entries-numeric:"), "got {err}");
        // Negative numbers do not parse as u64 either.
        assert!(validate(&params(Some("a.log"), Some("-1"), None)).is_err());
    }

    #[test]
    fn empty_and_oversized_search_are_rejected() {
        assert!(validate(&params(Some("a.log"), None, Some(""))).is_err());
        let long = "s".repeat(MAX_SEARCH_CHARS + 1);
        assert!(validate(&params(Some("a.log"), None, Some(&long))).is_err());
    }

    #[test]
    fn invisible_characters_in_search_are_rejected() {
        for bad in ["zero\u{200B}width", "bidi\u{202E}swap", "tab\tchar", "nl\nchar"] {
            let err = validate(&params(Some("a.log"), None, Some(bad))).unwrap_err();
            assert!(err.starts_with("search-visible:"), "got {err} for {bad:?}");
        }
    }

    #[test]
    fn rules_run_in_declaration_order() {
        // Both filepath and entries are bad; the filepath rule reports first.
        let err = validate(&params(None, Some("nope"), None)).unwrap_err();
        assert!(err.starts_with("filepath-required:"), "got {err}");
    }

    #[test]
    fn resolve_rejects_escapes_and_non_files() {
        let outer = tempfile::tempdir().unwrap();
        let base = outer.path().join("base");
        std::fs::create_dir_all(base.join("sub")).unwrap();
        let base = base.canonicalize().unwrap();

        let mut f = std::fs::File::create(base.join("ok.log")).unwrap();
        f.write_all(b"data\n").unwrap();
        std::fs::File::create(outer.path().join("secret.txt")).unwrap();

        assert!(resolve_under_base(&base, "ok.log").is_ok());
        assert_eq!(
            resolve_under_base(&base, "missing.log"),
            Err(ResolveError::NotFound)
        );
        assert_eq!(
            resolve_under_base(&base, "../secret.txt"),
            Err(ResolveError::Escapes)
        );
        assert_eq!(resolve_under_base(&base, "sub"), Err(ResolveError::NotAFile));
        // Leading slashes are treated as relative to the base, not the root.
        assert!(resolve_under_base(&base, "/ok.log").is_ok());
    }
}

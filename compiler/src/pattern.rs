//! Translation of vendor (PCRE-flavoured) regex patterns to the JavaScript
//! `RegExp` form used in validation expressions.
//!
//! # Examples
//!
//! ```
//! use asset_spec_compiler::pattern::translate_pattern;
//!
//! let translated = translate_pattern("(?i)\\Aarn:aws:[a-z0-9-]+\\Z").unwrap().unwrap();
//! assert_eq!(translated.pattern, "^arn:aws:[a-z0-9-]+$");
//! assert_eq!(translated.flags, "i");
//!
//! // Catch-all patterns validate nothing.
//! assert!(translate_pattern("[\\s\\S]*").unwrap().is_none());
//! ```

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    /// The pattern cannot be expressed as a JavaScript `RegExp`.
    #[error("pattern {pattern:?} is not supported: {reason}")]
    Unsupported { pattern: String, reason: String },
}

/// A pattern ready for `new RegExp(pattern, flags)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedPattern {
    pub pattern: String,
    pub flags: String,
}

impl TranslatedPattern {
    /// Renders the Joi `.pattern(...)` call for this pattern.
    pub fn to_joi(&self) -> String {
        let pattern = json_string(&self.pattern);
        if self.flags.is_empty() {
            format!(".pattern(new RegExp({pattern}))")
        } else {
            format!(".pattern(new RegExp({pattern}, {}))", json_string(&self.flags))
        }
    }
}

/// Known-broken vendor patterns, mapped to a working pattern or to no
/// validation at all.
const KNOWN_PATTERNS: &[(&str, Option<&str>)] = &[
    (
        "^[a-zA-Z0-9]+[a-zA-Z0-9-]+[a-zA-Z0-9]+$\\",
        Some("^[a-zA-Z0-9]+[a-zA-Z0-9-]+[a-zA-Z0-9]+$"),
    ),
    ("^[0-9]{12}$\\", Some("^[0-9]{12}$")),
    (
        "^[a-zA-Z0-9_.-/]+$",
        Some("^[a-zA-Z0-9_./-]+$"),
    ),
    ("^[\\u0020-\\uD7FF\\uE000-\\uFFFD\\uD800\\uDC00-\\uDBFF\\uDFFF\\t]*$", None),
    ("^[\\u0009\\u000A\\u000D\\u0020-\\u00FF]+$", None),
    ("[\\u0009\\u000A\\u000D\\u0020-\\uD7FF\\uE000-\\uFFFD]*", None),
];

const CATCH_ALL: &[&str] = &[".*", "^.*$", "[\\s\\S]*", "^[\\s\\S]*$", ".+", "^.+$"];

static INLINE_FLAGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\(\?([ism]+)\)").expect("inline flag regex is valid"));

/// Translates a vendor pattern. Returns `Ok(None)` when the pattern should
/// not produce any validation.
pub fn translate_pattern(pcre: &str) -> Result<Option<TranslatedPattern>, PatternError> {
    if let Some((_, fixed)) = KNOWN_PATTERNS.iter().find(|(known, _)| *known == pcre) {
        return Ok(fixed.map(|pattern| TranslatedPattern {
            pattern: pattern.to_string(),
            flags: String::new(),
        }));
    }

    let mut flags = String::new();
    let mut body = pcre;
    while let Some(caps) = INLINE_FLAGS.captures(body) {
        for flag in caps[1].chars() {
            if !flags.contains(flag) {
                flags.push(flag);
            }
        }
        body = &body[caps[0].len()..];
    }

    let pattern = replace_anchors(body);
    if pattern.contains("\\p{") || pattern.contains("\\P{") {
        flags.push('u');
    }

    if CATCH_ALL.contains(&pattern.as_str()) {
        return Ok(None);
    }

    match Regex::new(&pattern) {
        Ok(_) => {}
        // Parsed fine; only the compiled automaton outgrew the size limit.
        Err(regex::Error::CompiledTooBig(limit)) => {
            debug!(pattern = %pcre, limit, "Pattern too large to compile locally, keeping it");
        }
        Err(_) if uses_js_only_syntax(&pattern) => {}
        Err(err) => {
            return Err(PatternError::Unsupported {
                pattern: pcre.to_string(),
                reason: err.to_string(),
            });
        }
    }

    Ok(Some(TranslatedPattern { pattern, flags }))
}

/// Rewrites `\A` to `^` and `\Z`/`\z` to `$`, leaving other escapes intact.
fn replace_anchors(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('A') => out.push('^'),
            Some('Z') | Some('z') => out.push('$'),
            Some(next) => {
                out.push('\\');
                out.push(next);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Lookaround and backreferences run fine in JavaScript but not in `regex`.
fn uses_js_only_syntax(pattern: &str) -> bool {
    const LOOKAROUND: [&str; 4] = ["(?=", "(?!", "(?<=", "(?<!"];
    if LOOKAROUND.iter().any(|l| pattern.contains(l)) {
        return true;
    }
    let bytes = pattern.as_bytes();
    bytes
        .windows(2)
        .any(|w| w[0] == b'\\' && (b'1'..=b'9').contains(&w[1]))
}

fn json_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_pattern_passes_through() {
        let t = translate_pattern("^[a-z]{1,10}$").unwrap().unwrap();
        assert_eq!(t.pattern, "^[a-z]{1,10}$");
        assert!(t.flags.is_empty());
    }

    #[test]
    fn test_combined_inline_flags() {
        let t = translate_pattern("(?is)^abc$").unwrap().unwrap();
        assert_eq!(t.pattern, "^abc$");
        assert_eq!(t.flags, "is");
    }

    #[test]
    fn test_escaped_backslash_is_not_an_anchor() {
        let t = translate_pattern("^a\\\\Z$").unwrap().unwrap();
        assert_eq!(t.pattern, "^a\\\\Z$");
    }

    #[test]
    fn test_unicode_class_adds_u_flag() {
        let t = translate_pattern("^[\\p{L}\\p{N}_.:/=+\\-@]*$").unwrap().unwrap();
        assert_eq!(t.flags, "u");
    }

    #[test]
    fn test_lookahead_is_passed_through() {
        let t = translate_pattern("^(?!aws:)[a-zA-Z0-9+=._:/-]+$").unwrap().unwrap();
        assert_eq!(t.pattern, "^(?!aws:)[a-zA-Z0-9+=._:/-]+$");
    }

    #[test]
    fn test_known_broken_pattern_is_fixed() {
        let t = translate_pattern("^[0-9]{12}$\\").unwrap().unwrap();
        assert_eq!(t.pattern, "^[0-9]{12}$");
        assert!(translate_pattern("[\\u0009\\u000A\\u000D\\u0020-\\uD7FF\\uE000-\\uFFFD]*")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_large_bounded_repetition_is_accepted() {
        let t = translate_pattern(r"^[\p{L}\p{Z}\p{N}_.:/=+\-@]{1,256}$").unwrap().unwrap();
        assert_eq!(t.pattern, r"^[\p{L}\p{Z}\p{N}_.:/=+\-@]{1,256}$");
        assert_eq!(t.flags, "u");

        let t = translate_pattern(r"^[\w\s]{1,2048}$").unwrap().unwrap();
        assert_eq!(t.pattern, r"^[\w\s]{1,2048}$");
    }

    #[test]
    fn test_unbalanced_pattern_is_unsupported() {
        let err = translate_pattern("^(abc$").unwrap_err();
        assert!(matches!(err, PatternError::Unsupported { .. }));
    }

    #[test]
    fn test_joi_rendering_escapes_json() {
        let t = TranslatedPattern {
            pattern: "^\\d+$".into(),
            flags: "i".into(),
        };
        assert_eq!(t.to_joi(), ".pattern(new RegExp(\"^\\\\d+$\", \"i\"))");
    }
}

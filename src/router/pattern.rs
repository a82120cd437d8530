//! Route compiler: turns a path pattern into an anchored regular expression.
//!
//! Pattern syntax:
//!
//! | Segment | Matches |
//! |---|---|
//! | `users` | exactly `users` |
//! | `:id` | one non-empty segment, bound to `id` |
//! | `:id(\d+)` | one segment constrained by `\d+`, bound to `id` |
//! | `*` (last segment only) | the rest of the path including `/`, bound to `wildcard` |
//!
//! Tokens may be embedded in literal text (`/v:major.:minor`); the surrounding text is
//! escaped and matched verbatim. A `:` that is not followed by a name is literal.
//!
//! `/files/*` compiles to `^/files/(?P<wildcard>.*)` with no trailing anchor, so
//! `/files/` matches with an empty `wildcard` while `/files` does not match at all.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use super::core::ParamVec;
use crate::error::{Error, Result};

/// Reserved parameter name for the remainder-of-path capture.
pub const WILDCARD_PARAM: &str = "wildcard";

/// Default constraint for a parameter token without an explicit sub-pattern.
const DEFAULT_SEGMENT: &str = "[^/]+";

static PARAM_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*").expect("parameter name regex is valid"));

/// A compiled path pattern.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pattern: String,
    regex: Regex,
    param_names: Vec<Arc<str>>,
    wildcard: bool,
}

impl CompiledPattern {
    /// Compile `pattern`, failing with [`Error::RouteCompilation`] on malformed input.
    pub fn compile(pattern: &str) -> Result<Self> {
        let Some(rest) = pattern.strip_prefix('/') else {
            return Err(Error::compilation(pattern, "pattern must start with '/'"));
        };

        let segments: Vec<&str> = rest.split('/').collect();
        let mut source = String::with_capacity(pattern.len() * 2 + 2);
        source.push('^');
        let mut param_names: Vec<Arc<str>> = Vec::new();
        let mut wildcard = false;

        for (index, segment) in segments.iter().enumerate() {
            source.push('/');
            if *segment == "*" {
                if index + 1 != segments.len() {
                    return Err(Error::compilation(
                        pattern,
                        "'*' is only allowed as the final segment",
                    ));
                }
                source.push_str("(?P<wildcard>.*)");
                param_names.push(Arc::from(WILDCARD_PARAM));
                wildcard = true;
                break;
            }
            compile_segment(pattern, segment, &mut source, &mut param_names)?;
        }

        if !wildcard {
            source.push('$');
        }

        let regex = Regex::new(&source).map_err(|e| Error::compilation(pattern, e.to_string()))?;

        Ok(Self {
            pattern: pattern.to_string(),
            regex,
            param_names,
            wildcard,
        })
    }

    /// The pattern text as registered.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    #[must_use]
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Parameter names in the order they appear in the pattern.
    #[must_use]
    pub fn param_names(&self) -> &[Arc<str>] {
        &self.param_names
    }

    #[must_use]
    pub fn has_wildcard(&self) -> bool {
        self.wildcard
    }

    #[must_use]
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Match `path` and extract parameter values.
    ///
    /// Values come back in pattern order. Named groups written inside a constraint are
    /// part of that parameter's regex and are not reported on their own.
    #[must_use]
    pub fn captures(&self, path: &str) -> Option<ParamVec> {
        let caps = self.regex.captures(path)?;
        let mut params = ParamVec::new();
        for name in &self.param_names {
            if let Some(m) = caps.name(name) {
                params.push((Arc::clone(name), m.as_str().to_string()));
            }
        }
        Some(params)
    }
}

/// Scan one segment for `:name` / `:name(sub-pattern)` tokens, escaping literal text.
fn compile_segment(
    pattern: &str,
    segment: &str,
    out: &mut String,
    names: &mut Vec<Arc<str>>,
) -> Result<()> {
    let mut literal_start = 0;
    let mut cursor = 0;

    while let Some(offset) = segment[cursor..].find(':') {
        let colon = cursor + offset;
        let after = &segment[colon + 1..];
        let Some(name) = PARAM_NAME.find(after) else {
            // bare ':' is literal text
            cursor = colon + 1;
            continue;
        };

        out.push_str(&regex::escape(&segment[literal_start..colon]));

        let name = name.as_str();
        let mut end = colon + 1 + name.len();
        let constraint = if segment[end..].starts_with('(') {
            let close = find_group_end(&segment[end..])
                .ok_or_else(|| Error::compilation(pattern, format!("unbalanced '(' after :{name}")))?;
            let inner = &segment[end + 1..end + close];
            if inner.is_empty() {
                return Err(Error::compilation(
                    pattern,
                    format!("empty constraint for :{name}"),
                ));
            }
            end += close + 1;
            inner
        } else {
            DEFAULT_SEGMENT
        };

        out.push_str("(?P<");
        out.push_str(name);
        out.push('>');
        out.push_str(constraint);
        out.push(')');
        names.push(Arc::from(name));

        literal_start = end;
        cursor = end;
    }

    out.push_str(&regex::escape(&segment[literal_start..]));
    Ok(())
}

/// Given text starting with `(`, return the byte offset of its matching `)`.
///
/// Escapes and bracketed character classes are skipped so `\)` and `[)]` do not close
/// the group.
fn find_group_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_class = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '[' if !in_class => in_class = true,
            ']' if in_class => in_class = false,
            '(' if !in_class => depth += 1,
            ')' if !in_class => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

//! Operator substitution rules for Solidity sources.
//! Each rule swaps one operator token for another; rules are tried in order.
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::MutationError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MutationRule {
    pub original: String,
    pub mutant: String,
}

impl MutationRule {
    pub fn new(original: impl Into<String>, mutant: impl Into<String>) -> Self {
        Self {
            original: original.into(),
            mutant: mutant.into(),
        }
    }
}

/// Arithmetic, relational, equality and logical flips.
const DEFAULT_RULES: &[(&str, &str)] = &[
    ("+", "-"),
    ("-", "+"),
    (">", "<"),
    ("<", ">"),
    ("*", "/"),
    ("/", "*"),
    ("==", "!="),
    ("!=", "=="),
    ("&&", "||"),
    ("||", "&&"),
];

/// Lines starting with these are never code. Lines inside a `/* */` block
/// are tracked by [`scan_line`], not by prefix.
const COMMENT_PREFIXES: &[&str] = &["//", "/*", "*/"];

const DIRECTIVE_PREFIXES: &[&str] = &["pragma", "import"];

const LICENSE_MARKER: &str = "SPDX-License-Identifier";

/// Increment/decrement and compound assignments. A bare `+` rule would
/// otherwise turn `i++` into `i-+` or `x += 1` into `x -= 1`.
const COMPOUND_TOKENS: &[&str] = &[
    "++", "--", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "<<=", ">>=",
];

/// Ordered rule set plus the line filter. Built once and shared read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSet {
    rules: Vec<MutationRule>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            rules: DEFAULT_RULES
                .iter()
                .map(|(original, mutant)| MutationRule::new(*original, *mutant))
                .collect(),
        }
    }
}

impl RuleSet {
    pub fn new(rules: Vec<MutationRule>) -> Result<Self, MutationError> {
        for rule in &rules {
            validate(rule)?;
        }
        Ok(Self { rules })
    }

    /// Load a JSON array of `{"original": .., "mutant": ..}` objects.
    pub fn from_json_file(path: &Path) -> Result<Self, MutationError> {
        let data = std::fs::read_to_string(path).map_err(|e| MutationError::Rules {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let rules: Vec<MutationRule> =
            serde_json::from_str(&data).map_err(|e| MutationError::Rules {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        if rules.is_empty() {
            return Err(MutationError::Rules {
                path: path.to_path_buf(),
                message: "rule list is empty".to_string(),
            });
        }
        Self::new(rules)
    }

    pub fn rules(&self) -> &[MutationRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Whether `line` may be mutated at all.
    pub fn is_eligible(&self, line: &str) -> bool {
        is_eligible(line)
    }
}

fn validate(rule: &MutationRule) -> Result<(), MutationError> {
    let reason = if rule.original.is_empty() {
        Some("original token is empty")
    } else if rule.original.contains('\n') || rule.mutant.contains('\n') {
        Some("tokens must not span lines")
    } else if rule.original == rule.mutant {
        Some("original and mutant are identical")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(MutationError::InvalidRule {
            original: rule.original.clone(),
            mutant: rule.mutant.clone(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Comment lines, pragmas/imports, license markers and lines carrying
/// compound operators are skipped.
pub fn is_eligible(line: &str) -> bool {
    let trimmed = line.trim();
    if COMMENT_PREFIXES.iter().any(|p| trimmed.starts_with(p)) {
        return false;
    }
    if DIRECTIVE_PREFIXES.iter().any(|p| trimmed.starts_with(p)) {
        return false;
    }
    if line.contains(LICENSE_MARKER) {
        return false;
    }
    !COMPOUND_TOKENS.iter().any(|t| line.contains(t))
}

/// Which bytes of one line are code, as opposed to comment or string literal.
#[derive(Debug, Clone)]
pub struct LineScan {
    code: Vec<bool>,
    ends_in_block_comment: bool,
}

impl LineScan {
    /// Byte offset of the first occurrence of `token` lying entirely in code.
    pub fn find(&self, line: &str, token: &str) -> Option<usize> {
        let (bytes, needle) = (line.as_bytes(), token.as_bytes());
        if needle.is_empty() || needle.len() > bytes.len() {
            return None;
        }
        (0..=bytes.len() - needle.len()).find(|&at| {
            bytes[at..].starts_with(needle) && self.code[at..at + needle.len()].iter().all(|c| *c)
        })
    }

    /// Whether the next line starts inside an unterminated `/*`.
    pub fn ends_in_block_comment(&self) -> bool {
        self.ends_in_block_comment
    }
}

/// Classify every byte of `line`. `in_block_comment` carries a `/*` left
/// open by an earlier line. A `//` comment runs to the end of the line;
/// string literals honour backslash escapes.
pub fn scan_line(line: &str, in_block_comment: bool) -> LineScan {
    let bytes = line.as_bytes();
    let mut code = vec![false; bytes.len()];
    let mut in_block = in_block_comment;
    let mut quote: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        let rest = &bytes[i..];
        if in_block {
            if rest.starts_with(b"*/") {
                in_block = false;
                i += 2;
            } else {
                i += 1;
            }
            continue;
        }
        if let Some(q) = quote {
            match bytes[i] {
                b'\\' => i += 2,
                b if b == q => {
                    quote = None;
                    i += 1;
                }
                _ => i += 1,
            }
            continue;
        }
        if rest.starts_with(b"//") {
            break;
        }
        if rest.starts_with(b"/*") {
            in_block = true;
            i += 2;
            continue;
        }
        match bytes[i] {
            b'"' | b'\'' => quote = Some(bytes[i]),
            _ => code[i] = true,
        }
        i += 1;
    }
    LineScan {
        code,
        ends_in_block_comment: in_block,
    }
}

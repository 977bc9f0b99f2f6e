//! Shell-style glob patterns for matching image names

use regex::Regex;

/// A compiled fnmatch-style pattern.
///
/// Supports `*`, `?`, `[seq]` and `[!seq]`. Matching is anchored at both ends
/// and case-sensitive. `*` also matches `/`, so `*/postgres` matches
/// `immich-app/postgres`.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    source: String,
    regex: Regex,
}

impl GlobPattern {
    /// Compile a glob pattern
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&translate(pattern))?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// Check if the whole name matches the pattern
    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    /// The pattern as written
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl PartialEq for GlobPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// Translate a glob into an anchored regex
fn translate(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::from("^");
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' => {
                // Collapse runs of stars
                while i + 1 < chars.len() && chars[i + 1] == '*' {
                    i += 1;
                }
                out.push_str(".*");
            }
            '?' => out.push('.'),
            '[' => match class_end(&chars, i) {
                Some(end) => {
                    out.push_str(&translate_class(&chars[i + 1..end]));
                    i = end;
                }
                // Unterminated bracket is a literal
                None => out.push_str("\\["),
            },
            c => out.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }

    out.push('$');
    out
}

/// Index of the `]` closing the class opened at `start`
fn class_end(chars: &[char], start: usize) -> Option<usize> {
    let mut j = start + 1;
    if j < chars.len() && chars[j] == '!' {
        j += 1;
    }
    // A leading `]` is part of the set
    if j < chars.len() && chars[j] == ']' {
        j += 1;
    }
    while j < chars.len() && chars[j] != ']' {
        j += 1;
    }
    (j < chars.len()).then_some(j)
}

/// Translate the inside of `[...]` into a regex class.
///
/// Reversed ranges such as `z-a` match nothing; a class left with no members
/// matches no character, or any character when negated.
fn translate_class(body: &[char]) -> String {
    let (negated, body) = match body.first() {
        Some('!') => (true, &body[1..]),
        _ => (false, body),
    };

    let mut members = String::new();
    let mut i = 0;
    while i < body.len() {
        if i + 2 < body.len() && body[i + 1] == '-' {
            let (lo, hi) = (body[i], body[i + 2]);
            if lo <= hi {
                push_class_char(&mut members, lo);
                members.push('-');
                push_class_char(&mut members, hi);
            }
            i += 3;
        } else {
            push_class_char(&mut members, body[i]);
            i += 1;
        }
    }

    match (members.is_empty(), negated) {
        // Zero-width and never true, so nothing matches
        (true, false) => r"\b\B".to_string(),
        (true, true) => ".".to_string(),
        (false, false) => format!("[{}]", members),
        (false, true) => format!("[^{}]", members),
    }
}

fn push_class_char(class: &mut String, c: char) {
    if matches!(c, '\\' | '[' | ']' | '^' | '&' | '~' | '-') {
        class.push('\\');
    }
    class.push(c);
}

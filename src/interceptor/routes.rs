use std::fmt;

/// URL pattern where `*` matches any run of characters, as in browser
/// request filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlPattern {
    raw: String,
    parts: Vec<String>,
}

impl UrlPattern {
    pub fn new(pattern: &str) -> Self {
        Self {
            raw: pattern.to_string(),
            parts: pattern.split('*').map(str::to_string).collect(),
        }
    }

    pub fn matches(&self, url: &str) -> bool {
        // `split` always yields at least one part.
        let (first, rest) = match self.parts.split_first() {
            Some(split) => split,
            None => return url.is_empty(),
        };
        let Some(mut remaining) = url.strip_prefix(first.as_str()) else {
            return false;
        };

        let Some((last, middle)) = rest.split_last() else {
            // No wildcard at all: exact match.
            return remaining.is_empty();
        };

        for part in middle {
            match remaining.find(part.as_str()) {
                Some(idx) => remaining = &remaining[idx + part.len()..],
                None => return false,
            }
        }

        remaining.ends_with(last.as_str())
    }
}

impl fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

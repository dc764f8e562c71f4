//! Shell-style key patterns.
//!
//! Invalidation patterns such as `tile:5:*` support two wildcards: `*`
//! (any substring, including empty) and `?` (exactly one character).
//! Everything else is literal, including characters that are special to SQL
//! `LIKE` or to glob character classes.

/// A parsed key pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPattern {
    raw: String,
}

impl KeyPattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            raw: pattern.into(),
        }
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Translate to a SQL `LIKE` pattern using `\` as the escape character.
    pub fn to_like(&self) -> String {
        let mut like = String::with_capacity(self.raw.len() + 4);
        let mut prev_star = false;
        for c in self.raw.chars() {
            let star = c == '*';
            if star && prev_star {
                continue;
            }
            prev_star = star;
            match c {
                '*' => like.push('%'),
                '?' => like.push('_'),
                '%' | '_' | '\\' => {
                    like.push('\\');
                    like.push(c);
                }
                _ => like.push(c),
            }
        }
        like
    }

    /// Compile to a [`glob::Pattern`] with identical semantics.
    ///
    /// Literal runs are escaped so `[` and `]` never open a character class.
    /// A run of `*` compiles to a single `*`; glob would otherwise read `**`
    /// as a recursive path wildcard.
    pub fn to_glob(&self) -> Result<glob::Pattern, glob::PatternError> {
        let mut compiled = String::with_capacity(self.raw.len() + 4);
        let mut literal = String::new();
        let mut prev_star = false;
        for c in self.raw.chars() {
            let star = c == '*';
            if star && prev_star {
                continue;
            }
            prev_star = star;
            match c {
                '*' | '?' => {
                    compiled.push_str(&glob::Pattern::escape(&literal));
                    literal.clear();
                    compiled.push(c);
                }
                _ => literal.push(c),
            }
        }
        compiled.push_str(&glob::Pattern::escape(&literal));
        glob::Pattern::new(&compiled)
    }
}

impl From<&str> for KeyPattern {
    fn from(pattern: &str) -> Self {
        Self::new(pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_like_wildcards() {
        assert_eq!(KeyPattern::new("tile:5:*").to_like(), "tile:5:%");
        assert_eq!(KeyPattern::new("tile:?:0:0").to_like(), "tile:_:0:0");
    }

    #[test]
    fn test_to_like_escapes_sql_specials() {
        assert_eq!(KeyPattern::new("a_b%c\\d*").to_like(), "a\\_b\\%c\\\\d%");
    }

    #[test]
    fn test_glob_prefix_match() {
        let glob = KeyPattern::new("tile:5:*").to_glob().unwrap();
        assert!(glob.matches("tile:5:0:0"));
        assert!(glob.matches("tile:5:"));
        assert!(!glob.matches("tile:15:0:0"));
        assert!(!glob.matches("tile:50:1:1"));
    }

    #[test]
    fn test_glob_single_char() {
        let glob = KeyPattern::new("tile:?:1:1").to_glob().unwrap();
        assert!(glob.matches("tile:3:1:1"));
        assert!(!glob.matches("tile:13:1:1"));
    }

    #[test]
    fn test_glob_brackets_are_literal() {
        let glob = KeyPattern::new("key[1]*").to_glob().unwrap();
        assert!(glob.matches("key[1]-suffix"));
        assert!(!glob.matches("key1-suffix"));
    }

    #[test]
    fn test_star_runs_collapse() {
        let pattern = KeyPattern::new("tile:5:**");
        assert_eq!(pattern.to_like(), "tile:5:%");

        let glob = pattern.to_glob().unwrap();
        assert!(glob.matches("tile:5:0:0"));
        assert!(glob.matches("tile:5:"));
        assert!(!glob.matches("tile:6:0:0"));

        let glob = KeyPattern::new("tile:***:1:?").to_glob().unwrap();
        assert!(glob.matches("tile:12:1:3"));
    }

    #[test]
    fn test_escaped_percent_before_star() {
        assert_eq!(KeyPattern::new("a%**").to_like(), "a\\%%");
    }

    #[test]
    fn test_glob_without_wildcards_is_exact() {
        let glob = KeyPattern::new("tile:1:0:0").to_glob().unwrap();
        assert!(glob.matches("tile:1:0:0"));
        assert!(!glob.matches("tile:1:0:00"));
    }
}

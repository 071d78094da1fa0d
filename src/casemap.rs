//! IRC case-mapping functions.
//!
//! IRC uses a special case-insensitive comparison where some characters
//! are considered equivalent (e.g., `[` and `{`). Servers announce which
//! flavour they use through the `CASEMAPPING` ISUPPORT token; channel keys
//! in the state store are folded with whichever mapping is active.

/// A case-folding rule announced by the server.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CaseMapping {
    /// Only `A-Z` fold to `a-z`.
    Ascii,
    /// ASCII plus `[]\~` → `{}|^`.
    #[default]
    Rfc1459,
    /// ASCII plus `[]\` → `{}|` (no tilde).
    StrictRfc1459,
}

impl CaseMapping {
    /// Parse the value of a `CASEMAPPING` token. Unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "ascii" => Some(Self::Ascii),
            "rfc1459" => Some(Self::Rfc1459),
            "strict-rfc1459" => Some(Self::StrictRfc1459),
            _ => None,
        }
    }

    /// Fold a single character.
    #[inline]
    pub fn fold(self, c: char) -> char {
        match (self, c) {
            (_, 'A'..='Z') => c.to_ascii_lowercase(),
            (Self::Ascii, _) => c,
            (_, '[') => '{',
            (_, ']') => '}',
            (_, '\\') => '|',
            (Self::Rfc1459, '~') => '^',
            _ => c,
        }
    }

    /// Convert a string to lowercase under this mapping.
    pub fn to_lower(self, s: &str) -> String {
        s.chars().map(|c| self.fold(c)).collect()
    }

    /// Compare two strings case-insensitively under this mapping.
    pub fn eq(self, a: &str, b: &str) -> bool {
        a.len() == b.len()
            && a
                .chars()
                .zip(b.chars())
                .all(|(ca, cb)| self.fold(ca) == self.fold(cb))
    }
}

/// Convert a string to IRC lowercase using RFC 1459 case mapping.
pub fn irc_to_lower(s: &str) -> String {
    CaseMapping::Rfc1459.to_lower(s)
}

/// Compare two strings using RFC 1459 case-insensitive comparison.
pub fn irc_eq(a: &str, b: &str) -> bool {
    CaseMapping::Rfc1459.eq(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rfc1459_folds_brackets() {
        assert_eq!(irc_to_lower("#Foo[Bar]~"), "#foo{bar}^");
        assert!(irc_eq("Nick\\Away", "nick|away"));
    }

    #[test]
    fn test_strict_keeps_tilde() {
        assert_eq!(CaseMapping::StrictRfc1459.to_lower("A~["), "a~{");
    }

    #[test]
    fn test_ascii_only_letters() {
        assert_eq!(CaseMapping::Ascii.to_lower("#Chan[1]"), "#chan[1]");
        assert!(!CaseMapping::Ascii.eq("a[", "a{"));
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(CaseMapping::parse("RFC1459"), Some(CaseMapping::Rfc1459));
        assert_eq!(
            CaseMapping::parse("strict-rfc1459"),
            Some(CaseMapping::StrictRfc1459)
        );
        assert_eq!(CaseMapping::parse("rfc7613"), None);
    }
}

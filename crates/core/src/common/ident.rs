//! Case-insensitive identifiers.
//!
//! Unit, capability, and register names in a processor description or
//! program may be spelled with arbitrary case, and the same element may be
//! referred to with different case at different points. [`ICaseString`]
//! compares, hashes, and orders by the lower-case form of a string while
//! retaining and displaying the original spelling, so that the first
//! spelling encountered in a description becomes canonical for display
//! purposes without forcing every later reference to match it exactly.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A string compared, hashed, and ordered case-insensitively.
///
/// The original spelling is preserved for [`Display`](fmt::Display) and
/// [`ICaseString::as_str`]; only equality, ordering, and hashing fold case.
#[derive(Debug, Clone)]
pub struct ICaseString(String);

impl ICaseString {
    /// Returns the original spelling, unmodified.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn folded(&self) -> String {
        self.0.to_lowercase()
    }
}

impl From<&str> for ICaseString {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for ICaseString {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for ICaseString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq for ICaseString {
    fn eq(&self, other: &Self) -> bool {
        self.folded() == other.folded()
    }
}

impl Eq for ICaseString {}

impl Hash for ICaseString {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.folded().hash(state);
    }
}

impl PartialOrd for ICaseString {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ICaseString {
    fn cmp(&self, other: &Self) -> Ordering {
        self.folded().cmp(&other.folded())
    }
}

#[cfg(test)]
mod tests {
    use super::ICaseString;

    #[test]
    fn equal_regardless_of_case() {
        assert_eq!(ICaseString::from("ALU"), ICaseString::from("alu"));
        assert_eq!(ICaseString::from("Core 1"), ICaseString::from("CORE 1"));
    }

    #[test]
    fn preserves_first_spelling_for_display() {
        let id = ICaseString::from("MemUnit");
        assert_eq!(id.as_str(), "MemUnit");
        assert_eq!(id.to_string(), "MemUnit");
    }

    #[test]
    fn orders_lexicographically_on_folded_form() {
        let mut ids = vec![
            ICaseString::from("Beta"),
            ICaseString::from("alpha"),
            ICaseString::from("GAMMA"),
        ];
        ids.sort();
        let spellings: Vec<&str> = ids.iter().map(ICaseString::as_str).collect();
        assert_eq!(spellings, ["alpha", "Beta", "GAMMA"]);
    }

    #[test]
    fn hashes_equal_for_case_variants() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(ICaseString::from("Alu"));
        assert!(set.contains(&ICaseString::from("ALU")));
        assert!(!set.contains(&ICaseString::from("Mem")));
    }
}

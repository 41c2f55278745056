//! Container name table
//!
//! Ordered list of interned path/type strings shared by the reader, the
//! patcher and the appender. Each name is kept in its full on-disk form and
//! in a normalized form with the `$`-suffix variant marker stripped; lookup
//! by either form resolves to the same entry.

use std::collections::HashMap;

/// One interned name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name {
    /// Full on-disk form, including any `$` variant suffix
    pub full: String,
    /// Full form truncated at the first `$`
    pub normalized: String,
}

/// Strip the `$`-suffix variant marker from a name.
pub fn normalize(name: &str) -> &str {
    match name.find('$') {
        Some(pos) => &name[..pos],
        None => name,
    }
}

/// Ordered, deduplicated list of container names with bidirectional lookup.
#[derive(Debug, Default, Clone)]
pub struct NameTable {
    names: Vec<Name>,
    lookup: HashMap<String, usize>,
}

impl NameTable {
    /// Create an empty name table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of interned names.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Intern a name, returning its index. The first entry for a given full
    /// or normalized form wins the lookup slot.
    pub fn push(&mut self, full: &str) -> usize {
        let index = self.names.len();
        let normalized = normalize(full).to_string();
        self.lookup.entry(full.to_string()).or_insert(index);
        if normalized != full {
            self.lookup.entry(normalized.clone()).or_insert(index);
        }
        self.names.push(Name {
            full: full.to_string(),
            normalized,
        });
        index
    }

    /// Look up a name by full or normalized form.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.lookup.get(name).copied()
    }

    /// Whether a name (full or normalized) is present.
    pub fn contains(&self, name: &str) -> bool {
        self.lookup.contains_key(name)
    }

    /// Get a name by index.
    pub fn get(&self, index: usize) -> Option<&Name> {
        self.names.get(index)
    }

    /// Iterate over names in on-disk order.
    pub fn iter(&self) -> impl Iterator<Item = &Name> {
        self.names.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(
            normalize("foo/bar$uvlayout_lightmap=1"),
            "foo/bar"
        );
        assert_eq!(normalize("foo/bar"), "foo/bar");
        assert_eq!(normalize("$"), "");
    }

    #[test]
    fn test_lookup_by_either_form() {
        let mut table = NameTable::new();
        let idx = table.push("foo/bar$uvlayout_lightmap=1");
        table.push("baz");

        assert_eq!(table.index_of("foo/bar$uvlayout_lightmap=1"), Some(idx));
        assert_eq!(table.index_of("foo/bar"), Some(idx));
        assert_eq!(table.index_of("baz"), Some(1));
        assert_eq!(table.index_of("missing"), None);
    }

    #[test]
    fn test_push_returns_on_disk_order() {
        let mut table = NameTable::new();
        assert_eq!(table.push("a"), 0);
        assert_eq!(table.push("b"), 1);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(1).unwrap().full, "b");
    }
}

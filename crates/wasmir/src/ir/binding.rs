//! Name-to-index binding tables.

use super::types::Location;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Binding {
    pub loc: Location,
    pub index: u32,
}

/// Maps textual names to indices in one index space.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingHash {
    bindings: HashMap<String, Binding>,
}

impl BindingHash {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    pub fn find_index(&self, name: &str) -> Option<u32> {
        self.bindings.get(name).map(|b| b.index)
    }

    /// Adds a binding. Returns the existing binding if `name` is taken.
    pub fn insert(&mut self, name: String, binding: Binding) -> Result<(), Binding> {
        match self.bindings.get(&name) {
            Some(existing) => Err(*existing),
            None => {
                self.bindings.insert(name, binding);
                Ok(())
            }
        }
    }

    /// `name`, or the first of `name.1`, `name.2`, ... that is still free.
    pub fn unique_name(&self, name: &str) -> String {
        if !self.contains(name) {
            return name.to_string();
        }
        let mut counter = 1u32;
        loop {
            let candidate = format!("{name}.{counter}");
            if !self.contains(&candidate) {
                return candidate;
            }
            counter += 1;
        }
    }

    /// Binds a deduplicated version of `name` and returns the name used.
    pub fn bind_unique(&mut self, name: &str, index: u32, loc: Location) -> String {
        let unique = self.unique_name(name);
        self.bindings
            .insert(unique.clone(), Binding { loc, index });
        unique
    }

    /// Name bound to `index`, if any. Linear in the table size.
    pub fn name_of(&self, index: u32) -> Option<&str> {
        self.bindings
            .iter()
            .find(|(_, b)| b.index == index)
            .map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Binding)> {
        self.bindings.iter().map(|(name, b)| (name.as_str(), b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_names_get_numeric_suffixes() {
        let mut bindings = BindingHash::new();
        let loc = Location::default();
        assert_eq!(bindings.bind_unique("f", 0, loc), "f");
        assert_eq!(bindings.bind_unique("f", 1, loc), "f.1");
        assert_eq!(bindings.bind_unique("f", 2, loc), "f.2");
        assert_eq!(bindings.find_index("f.1"), Some(1));
        assert_eq!(bindings.len(), 3);
    }

    #[test]
    fn suffix_skips_names_taken_explicitly() {
        let mut bindings = BindingHash::new();
        let loc = Location::default();
        bindings.bind_unique("g.1", 0, loc);
        bindings.bind_unique("g", 1, loc);
        assert_eq!(bindings.bind_unique("g", 2, loc), "g.2");
    }

    #[test]
    fn insert_reports_existing_binding() {
        let mut bindings = BindingHash::new();
        let first = Binding {
            loc: Location::new(4),
            index: 0,
        };
        assert!(bindings.insert("x".into(), first).is_ok());
        let second = Binding {
            loc: Location::new(8),
            index: 1,
        };
        assert_eq!(bindings.insert("x".into(), second), Err(first));
        assert_eq!(bindings.name_of(0), Some("x"));
    }
}

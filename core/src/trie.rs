//! Prefix-matching trie keyed by Unicode code point.
//!
//! A [`Trie`] is at once an exact-match dictionary, an abbreviation resolver
//! and an alias table: aliases are just more keys mapped to the same value.
//!
//! Lookup walks the query one `char` at a time and then:
//!
//! - returns the value of the node the query ends on, if any (exact match);
//! - otherwise follows single-child chains forward until a value is reached
//!   (`"ver"` completes to `"version"`), giving up on any fork;
//! - when the query runs past the registered names and `allow_longer` is set,
//!   returns the value of the deepest node reached (`"helpme"` finds `"help"`).
//!
//! Ambiguity never guesses: it resolves to nothing.

use std::collections::BTreeMap;

use crate::error::{CrimError, Result};

/// One node of a [`Trie`]: a path node without a value, or a terminal node
/// holding exactly one value.
#[derive(Debug, Clone)]
pub struct TrieNode<V> {
    children: BTreeMap<char, TrieNode<V>>,
    value: Option<V>,
}

impl<V> Default for TrieNode<V> {
    fn default() -> Self {
        Self {
            children: BTreeMap::new(),
            value: None,
        }
    }
}

impl<V> TrieNode<V> {
    /// Child reached by `ch`, if any.
    pub fn child(&self, ch: char) -> Option<&TrieNode<V>> {
        self.children.get(&ch)
    }

    /// Value stored at this node.
    pub fn value(&self) -> Option<&V> {
        self.value.as_ref()
    }

    /// Whether this node terminates a registered key.
    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }
}

/// Mapping from string keys to values with unambiguous-prefix lookup.
///
/// # Examples
///
/// ```
/// use crim_core::Trie;
///
/// let mut trie = Trie::new();
/// trie.add("version", 1).unwrap();
/// trie.add("verbose", 2).unwrap();
/// trie.add("help", 3).unwrap();
///
/// assert_eq!(trie.find("he"), Some(&3));
/// assert_eq!(trie.find("vers"), Some(&1));
/// assert_eq!(trie.find("ver"), None); // ambiguous
/// assert_eq!(trie.find("helpme"), Some(&3)); // allow_longer
/// ```
#[derive(Debug, Clone)]
pub struct Trie<V> {
    root: TrieNode<V>,
    allow_longer: bool,
    len: usize,
}

impl<V> Default for Trie<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Trie<V> {
    /// Creates an empty trie with `allow_longer` enabled.
    pub fn new() -> Self {
        Self::with_allow_longer(true)
    }

    /// Creates an empty trie with the given `allow_longer` behavior.
    pub fn with_allow_longer(allow_longer: bool) -> Self {
        Self {
            root: TrieNode::default(),
            allow_longer,
            len: 0,
        }
    }

    /// Whether lookups may resolve to a name shorter than the query.
    pub fn allow_longer(&self) -> bool {
        self.allow_longer
    }

    /// Number of registered keys (names and aliases).
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no key has been registered.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Registers `value` under `key`.
    ///
    /// # Errors
    ///
    /// [`CrimError::InvalidArgument`] if `key` is empty, and
    /// [`CrimError::DuplicateRegistration`] if `key` already holds a value.
    pub fn add(&mut self, key: &str, value: V) -> Result<()> {
        if key.is_empty() {
            return Err(CrimError::InvalidArgument("empty name/alias".to_string()));
        }

        let mut node = &mut self.root;
        for ch in key.chars() {
            node = node.children.entry(ch).or_default();
        }

        if node.value.is_some() {
            return Err(CrimError::DuplicateRegistration {
                kind: "key",
                name: key.to_string(),
            });
        }

        node.value = Some(value);
        self.len += 1;
        Ok(())
    }

    /// Registers `value` under each alias.
    pub fn add_aliases<I, S>(&mut self, value: V, aliases: I) -> Result<()>
    where
        V: Clone,
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for alias in aliases {
            self.add(alias.as_ref(), value.clone())?;
        }
        Ok(())
    }

    /// Exact lookup, without abbreviation or `allow_longer`.
    pub fn get(&self, key: &str) -> Option<&V> {
        self.node(key).and_then(TrieNode::value)
    }

    /// Whether `key` is registered exactly.
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Resolves `partial` using this trie's `allow_longer` setting.
    pub fn find(&self, partial: &str) -> Option<&V> {
        self.find_with(partial, self.allow_longer)
    }

    /// Resolves `partial`, returning `default` when nothing matches.
    pub fn find_or<'a>(&'a self, partial: &str, default: &'a V) -> &'a V {
        self.find(partial).unwrap_or(default)
    }

    /// Resolves `partial` with an explicit `allow_longer` setting.
    pub fn find_with(&self, partial: &str, allow_longer: bool) -> Option<&V> {
        if partial.is_empty() {
            return None;
        }

        let mut node = &self.root;
        for ch in partial.chars() {
            match node.child(ch) {
                Some(child) => node = child,
                None if allow_longer => return node.value(),
                None => return None,
            }
        }

        // Forward completion through single-child chains.
        loop {
            if let Some(value) = node.value() {
                return Some(value);
            }
            if node.children.len() != 1 {
                return None;
            }
            node = node.children.values().next()?;
        }
    }

    fn node(&self, key: &str) -> Option<&TrieNode<V>> {
        let mut node = &self.root;
        for ch in key.chars() {
            node = node.child(ch)?;
        }
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trie(keys: &[&str]) -> Trie<String> {
        let mut trie = Trie::new();
        for key in keys {
            trie.add(key, key.to_string()).unwrap();
        }
        trie
    }

    #[test]
    fn test_exact_keys_resolve_to_their_values() {
        let trie = trie(&["play", "x", "coords", "help"]);
        for key in ["play", "x", "coords", "help"] {
            assert_eq!(trie.find(key).map(String::as_str), Some(key));
        }
        assert_eq!(trie.len(), 4);
    }

    #[test]
    fn test_unique_abbreviation_completes() {
        let trie = trie(&["version", "help"]);
        assert_eq!(trie.find("ver").map(String::as_str), Some("version"));
        assert_eq!(trie.find("v").map(String::as_str), Some("version"));
    }

    #[test]
    fn test_shared_prefix_is_ambiguous() {
        let trie = trie(&["version", "verbose"]);
        assert_eq!(trie.find("ver"), None);
        assert_eq!(trie.find("vers").map(String::as_str), Some("version"));
        assert_eq!(trie.find("verb").map(String::as_str), Some("verbose"));
    }

    #[test]
    fn test_exact_match_beats_forward_completion() {
        let trie = trie(&["help", "helpme"]);
        assert_eq!(trie.find("help").map(String::as_str), Some("help"));
        assert_eq!(trie.find("helpme").map(String::as_str), Some("helpme"));
        assert_eq!(trie.find("helpm").map(String::as_str), Some("helpme"));
    }

    #[test]
    fn test_prefix_registered_after_longer_key_keeps_both() {
        let trie = trie(&["helpme", "help"]);
        assert_eq!(trie.get("help").map(String::as_str), Some("help"));
        assert_eq!(trie.get("helpme").map(String::as_str), Some("helpme"));
    }

    #[test]
    fn test_allow_longer_controls_overlong_queries() {
        let mut trie = trie(&["help"]);
        assert_eq!(trie.find("helpful").map(String::as_str), Some("help"));
        assert_eq!(trie.find_with("helpful", false), None);

        trie.allow_longer = false;
        assert_eq!(trie.find("helpful"), None);
        assert_eq!(trie.find("help").map(String::as_str), Some("help"));
    }

    #[test]
    fn test_overlong_query_on_path_node_fails() {
        // "he" is only a path node, so "hex" has nothing to fall back to.
        let trie = trie(&["help"]);
        assert_eq!(trie.find("hex"), None);
    }

    #[test]
    fn test_empty_query_resolves_to_nothing() {
        let trie = trie(&["a"]);
        assert_eq!(trie.find(""), None);
        let fallback = "fallback".to_string();
        assert_eq!(trie.find_or("", &fallback), "fallback");
    }

    #[test]
    fn test_keys_are_walked_by_code_point() {
        let mut trie = Trie::new();
        trie.add("🎮play", 1).unwrap();
        trie.add("🎲roll", 2).unwrap();
        assert_eq!(trie.find("🎮"), Some(&1));
        assert_eq!(trie.find("🎲r"), Some(&2));
        assert_eq!(trie.find("🎯"), None);
    }

    #[test]
    fn test_aliases_share_a_value() {
        let mut trie = Trie::new();
        trie.add("coords", 7).unwrap();
        trie.add_aliases(7, ["x", "xy"]).unwrap();
        assert_eq!(trie.find("x"), Some(&7));
        assert_eq!(trie.find("xy"), Some(&7));
        assert_eq!(trie.find("co"), Some(&7));
    }

    #[test]
    fn test_rejects_empty_and_duplicate_keys() {
        let mut trie = Trie::new();
        assert!(matches!(trie.add("", 1), Err(CrimError::InvalidArgument(_))));

        trie.add("play", 1).unwrap();
        assert_eq!(
            trie.add("play", 2),
            Err(CrimError::DuplicateRegistration {
                kind: "key",
                name: "play".to_string(),
            })
        );
        assert_eq!(trie.get("play"), Some(&1));
    }
}

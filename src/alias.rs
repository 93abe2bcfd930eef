//! User-defined aliases and their expansion.

use crate::lexer;
use std::collections::{BTreeMap, HashSet};

/// Alias name to expansion text.
///
/// An empty expansion is a real value: running that alias drops the leading token.
/// Iteration is ordered by name, which is what the `alias` listing prints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable {
    entries: BTreeMap<String, String>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    /// Installs or overwrites an alias.
    pub fn insert(&mut self, name: impl Into<String>, expansion: impl Into<String>) {
        self.entries.insert(name.into(), expansion.into());
    }

    /// Removes an alias, returning its expansion if it existed.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.entries.remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rewrites `argv` to its fully alias-expanded form.
    ///
    /// The leading token is replaced by its expansion until it is no longer an alias.
    /// Expansion stops early when:
    /// - the expansion is empty: the leading token is dropped;
    /// - the leading token was already expanded during this call (a cycle such as
    ///   `a -> b -> a`): the current vector is kept as is;
    /// - the expansion starts with the alias's own name (`ls -> ls -l`): it is applied once.
    pub fn resolve(&self, argv: &mut Vec<String>) {
        let mut seen: HashSet<String> = HashSet::new();

        while let Some(head) = argv.first() {
            let Some(expansion) = self.get(head) else {
                break;
            };

            let replacement = lexer::split_into_tokens(expansion).unwrap_or_else(|err| {
                log::warn!("alias {head}: cannot tokenize expansion: {err}");
                Vec::new()
            });

            if replacement.is_empty() {
                log::debug!("alias {head}: empty expansion, dropping it");
                argv.remove(0);
                break;
            }

            if seen.contains(head) {
                log::debug!("alias {head}: cycle detected, stopping");
                break;
            }

            let self_reference = replacement[0] == *head;
            seen.insert(head.clone());
            log::debug!("alias {head} -> {}", lexer::join_tokens(&replacement));
            argv.splice(0..1, replacement);

            if self_reference {
                break;
            }
        }
    }
}

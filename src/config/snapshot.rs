//! Immutable configuration snapshots and the diff between two of them.

use std::collections::BTreeMap;

/// A point-in-time copy of every configuration key/value pair.
///
/// Snapshots are never patched. A reload builds a fresh one and swaps it in
/// whole, so readers see either the old or the new set of values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigSnapshot {
    values: BTreeMap<String, String>,
}

impl ConfigSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Compute what changed going from `self` to `newer`.
    ///
    /// Changes come out grouped as changed, then removed, then added; each
    /// group is in key order.
    pub fn diff(&self, newer: &ConfigSnapshot) -> Vec<ConfigChange> {
        let mut changed = Vec::new();
        let mut removed = Vec::new();

        for (key, old) in &self.values {
            match newer.values.get(key) {
                Some(new) if new != old => changed.push(ConfigChange {
                    key: key.clone(),
                    old: Some(old.clone()),
                    new: Some(new.clone()),
                }),
                Some(_) => {}
                None => removed.push(ConfigChange {
                    key: key.clone(),
                    old: Some(old.clone()),
                    new: None,
                }),
            }
        }

        let added = newer
            .values
            .iter()
            .filter(|(key, _)| !self.values.contains_key(*key))
            .map(|(key, new)| ConfigChange {
                key: key.clone(),
                old: None,
                new: Some(new.clone()),
            });

        changed.into_iter().chain(removed).chain(added).collect()
    }
}

impl<K, V> FromIterator<(K, V)> for ConfigSnapshot
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// How a single key differs between two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Changed,
    Removed,
    Added,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Changed => "changed",
            ChangeKind::Removed => "removed",
            ChangeKind::Added => "added",
        }
    }
}

/// One entry of a snapshot diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigChange {
    pub key: String,
    pub old: Option<String>,
    /// `None` when the key was removed.
    pub new: Option<String>,
}

impl ConfigChange {
    pub fn kind(&self) -> ChangeKind {
        match (&self.old, &self.new) {
            (Some(_), Some(_)) => ChangeKind::Changed,
            (Some(_), None) => ChangeKind::Removed,
            _ => ChangeKind::Added,
        }
    }
}

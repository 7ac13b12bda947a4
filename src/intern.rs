use std::{
    collections::HashMap,
    fmt::{Debug, Display, Formatter, Result as FmtResult},
    sync::{Arc, RwLock},
};

use lazy_static::lazy_static;

lazy_static! {
    /// Names are never evicted and live until the process exits. The set is
    /// bounded by the distinct atom ids and atom-type names seen in a run.
    static ref INTERNED_NAMES: RwLock<HashMap<Arc<str>, Name>> = RwLock::new(HashMap::new());
}

/// An interned string used for atom identifiers and atom-type names.
///
/// Reaction graphs repeat the same handful of type names ("C.sp3", "O.sp2")
/// and index-derived ids across every duplicate a task makes, so each distinct
/// string is stored once and shared.
#[allow(clippy::derived_hash_with_manual_eq)]
#[derive(Clone, Hash, Eq, PartialOrd, Ord)]
pub struct Name(Arc<str>);

impl Name {
    pub fn new(name: &str) -> Self {
        if let Some(found) = INTERNED_NAMES
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(name)
        {
            return found.clone();
        }

        let mut names = INTERNED_NAMES
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // Another writer may have raced us between the two locks.
        names
            .entry(Arc::from(name))
            .or_insert_with(|| Name(Arc::from(name)))
            .clone()
    }

    /// The default identifier of the atom at `index`.
    pub fn for_index(index: usize) -> Self {
        Name::new(&index.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Self {
        Name::new(s)
    }
}

impl From<String> for Name {
    fn from(s: String) -> Self {
        Name::new(&s)
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Debug for Name {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

impl Display for Name {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Name {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interned_names_share_storage() {
        let a = Name::new("C.sp3");
        let b = Name::from("C.sp3".to_string());
        assert_eq!(a, b);
        assert!(Arc::ptr_eq(&a.0, &b.0));
        assert_ne!(a, Name::new("C.sp2"));
        assert_eq!(Name::for_index(7).as_str(), "7");
    }

    #[test]
    fn test_names_outlive_their_handles() {
        drop(Name::new("intern-lifetime-check"));
        assert!(INTERNED_NAMES
            .read()
            .unwrap()
            .contains_key("intern-lifetime-check"));
    }
}

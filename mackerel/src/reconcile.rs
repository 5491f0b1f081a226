//! Merging freshly read API state into the previously stored state
//!
//! Scalars always take the fresh value. Collections take the fresh value
//! unless both sides are empty, in which case the stored representation
//! (null or explicitly empty) is kept so repeated refreshes stay stable.
//! Optional blocks present on both sides are merged field by field.

use std::collections::BTreeMap;

use crate::typeutil::FloatString;

/// Entity state that can absorb a fresh read
pub trait Reconcile: Sized {
    fn merge(self, fresh: Self) -> Self;
}

/// Collections whose emptiness decides the merge
pub trait Observed {
    fn is_observably_empty(&self) -> bool;
}

impl<T> Observed for Vec<T> {
    fn is_observably_empty(&self) -> bool {
        self.is_empty()
    }
}

impl<K, V> Observed for BTreeMap<K, V> {
    fn is_observably_empty(&self) -> bool {
        self.is_empty()
    }
}

impl<T: Observed> Observed for Option<T> {
    fn is_observably_empty(&self) -> bool {
        match self {
            Some(inner) => inner.is_observably_empty(),
            None => true,
        }
    }
}

pub fn merge_collection<T: Observed>(old: T, fresh: T) -> T {
    if old.is_observably_empty() && fresh.is_observably_empty() {
        old
    } else {
        fresh
    }
}

/// A block that changed presence is replaced wholesale
pub fn merge_block<T: Reconcile>(old: Option<T>, fresh: Option<T>) -> Option<T> {
    match (old, fresh) {
        (Some(old), Some(fresh)) => Some(old.merge(fresh)),
        (_, fresh) => fresh,
    }
}

/// Thresholds keep their stored spelling when numerically unchanged.
/// Null and the empty sentinel both mean "no threshold".
pub fn merge_threshold(
    old: Option<FloatString>,
    fresh: Option<FloatString>,
) -> Option<FloatString> {
    match (old, fresh) {
        (Some(old), Some(fresh)) => Some(old.reconcile(fresh)),
        (Some(old), None) if old.is_empty() => Some(old),
        (None, Some(fresh)) if fresh.is_empty() => None,
        (_, fresh) => fresh,
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Inner {
        tags: Option<Vec<String>>,
    }

    impl Reconcile for Inner {
        fn merge(self, fresh: Self) -> Self {
            Self {
                tags: merge_collection(self.tags, fresh.tags),
            }
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Entity {
        name: Option<String>,
        items: Option<Vec<String>>,
        labels: Option<BTreeMap<String, String>>,
        inner: Option<Inner>,
    }

    impl Reconcile for Entity {
        fn merge(self, fresh: Self) -> Self {
            Self {
                name: fresh.name,
                items: merge_collection(self.items, fresh.items),
                labels: merge_collection(self.labels, fresh.labels),
                inner: merge_block(self.inner, fresh.inner),
            }
        }
    }

    fn strings(items: &[&str]) -> Option<Vec<String>> {
        Some(items.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn both_empty_keeps_stored_representation() {
        let stored = Entity {
            name: Some("a".into()),
            items: None,
            labels: Some(BTreeMap::new()),
            inner: None,
        };
        let fresh = Entity {
            name: Some("a".into()),
            items: Some(vec![]),
            labels: None,
            inner: None,
        };

        let mut merged = stored.clone();
        for _ in 0..3 {
            merged = merged.merge(fresh.clone());
            assert_eq!(merged.items, None);
            assert_eq!(merged.labels, Some(BTreeMap::new()));
        }
    }

    #[test]
    fn any_non_empty_side_takes_fresh() {
        assert_eq!(merge_collection(strings(&["x"]), Some(vec![])), Some(vec![]));
        assert_eq!(merge_collection(strings(&["x"]), None), None);
        assert_eq!(merge_collection(None, strings(&["b", "a"])), strings(&["b", "a"]));
        assert_eq!(
            merge_collection(strings(&["a", "b"]), strings(&["b", "a"])),
            strings(&["b", "a"])
        );
    }

    #[test]
    fn nested_block_recurses_only_when_present_on_both_sides() {
        let merged = merge_block(
            Some(Inner { tags: Some(vec![]) }),
            Some(Inner { tags: None }),
        );
        assert_eq!(merged, Some(Inner { tags: Some(vec![]) }));

        let appeared = merge_block(None, Some(Inner { tags: None }));
        assert_eq!(appeared, Some(Inner { tags: None }));

        let gone = merge_block(Some(Inner { tags: strings(&["t"]) }), None);
        assert_eq!(gone, None);
    }

    #[test]
    fn thresholds_merge_semantically() {
        let fs = |s: &str| Some(FloatString::new(s).unwrap());
        assert_eq!(merge_threshold(fs("1e3"), fs("1000")), fs("1e3"));
        assert_eq!(merge_threshold(fs("1e3"), fs("10")), fs("10"));
        assert_eq!(merge_threshold(None, fs("")), None);
        assert_eq!(merge_threshold(fs(""), fs("")), fs(""));
        assert_eq!(merge_threshold(fs(""), None), fs(""));
        assert_eq!(merge_threshold(fs("5"), None), None);
    }
}

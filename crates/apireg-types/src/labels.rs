//! Deterministic label and annotation lists.
//!
//! Labels are stored as a key-sorted list of name/value pairs rather than a
//! native map, so that two resources with the same labels always serialize
//! to identical bytes regardless of insertion order.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// One name/value pair.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub value: String,
}

/// A list of labels kept sorted by name with unique names.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<Label>", into = "Vec<Label>")]
pub struct LabelList(Vec<Label>);

impl LabelList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from arbitrary pairs. Later duplicates win.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let map: BTreeMap<String, String> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self(
            map.into_iter()
                .map(|(name, value)| Label { name, value })
                .collect(),
        )
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .binary_search_by(|l| l.name.as_str().cmp(name))
            .ok()
            .map(|idx| self.0[idx].value.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Label> {
        self.0.iter()
    }

    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.0
            .iter()
            .map(|l| (l.name.clone(), l.value.clone()))
            .collect()
    }
}

impl From<Vec<Label>> for LabelList {
    fn from(labels: Vec<Label>) -> Self {
        Self::from_pairs(labels.into_iter().map(|l| (l.name, l.value)))
    }
}

impl From<LabelList> for Vec<Label> {
    fn from(list: LabelList) -> Self {
        list.0
    }
}

impl From<&BTreeMap<String, String>> for LabelList {
    fn from(map: &BTreeMap<String, String>) -> Self {
        Self::from_pairs(map.iter().map(|(k, v)| (k.clone(), v.clone())))
    }
}

impl From<&HashMap<String, String>> for LabelList {
    fn from(map: &HashMap<String, String>) -> Self {
        Self::from_pairs(map.iter().map(|(k, v)| (k.clone(), v.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn pairs_are_sorted_by_name() {
        let labels = LabelList::from_pairs([("zeta", "1"), ("alpha", "2"), ("mid", "3")]);
        let names: Vec<&str> = labels.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["alpha", "mid", "zeta"]);
    }

    #[test]
    fn later_duplicates_win() {
        let labels = LabelList::from_pairs([("k", "old"), ("k", "new")]);
        assert_eq!(labels.len(), 1);
        assert_eq!(labels.get("k"), Some("new"));
    }

    #[test]
    fn get_missing() {
        let labels = LabelList::from_pairs([("a", "1")]);
        assert_eq!(labels.get("b"), None);
    }

    #[test]
    fn serializes_as_pair_list() {
        let labels = LabelList::from_pairs([("b", "2"), ("a", "1")]);
        let json = serde_json::to_string(&labels).unwrap();
        assert_eq!(
            json,
            r#"[{"name":"a","value":"1"},{"name":"b","value":"2"}]"#
        );
    }

    #[test]
    fn deserializing_unsorted_input_normalizes() {
        let labels: LabelList =
            serde_json::from_str(r#"[{"name":"b","value":"2"},{"name":"a","value":"1"}]"#)
                .unwrap();
        assert_eq!(labels, LabelList::from_pairs([("a", "1"), ("b", "2")]));
    }

    proptest! {
        #[test]
        fn serialization_ignores_insertion_order(
            pairs in proptest::collection::btree_map("[a-z]{1,8}", "[a-z0-9]{0,8}", 0..12)
        ) {
            let forward: Vec<(String, String)> = pairs.clone().into_iter().collect();
            let mut backward = forward.clone();
            backward.reverse();

            let a = serde_json::to_vec(&LabelList::from_pairs(forward)).unwrap();
            let b = serde_json::to_vec(&LabelList::from_pairs(backward)).unwrap();
            prop_assert_eq!(a, b);
        }
    }
}

//! Row indexing by key.
//!
//! Both indexes keep the caller's input order inside each group and report,
//! rather than reject, items whose key function yields nothing.

use std::collections::BTreeMap;

use tracing::debug;

use crate::record::{PlotCode, Record};

/// One-to-many index: key → items sharing that key, in input order.
#[derive(Debug, Clone)]
pub struct Grouped<'a, K, T> {
    pub groups: BTreeMap<K, Vec<&'a T>>,
    /// Positions of items that had no key.
    pub skipped: Vec<usize>,
}

impl<'a, K: Ord, T> Grouped<'a, K, T> {
    pub fn get(&self, key: &K) -> &[&'a T] {
        self.groups.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// One-to-one index: key → the first item carrying that key.
#[derive(Debug, Clone)]
pub struct Unique<'a, K, T> {
    pub entries: BTreeMap<K, &'a T>,
    /// Positions of items that had no key.
    pub skipped: Vec<usize>,
    /// Positions of later items whose key was already taken.
    pub duplicates: Vec<usize>,
}

impl<'a, K: Ord, T> Unique<'a, K, T> {
    pub fn get(&self, key: &K) -> Option<&'a T> {
        self.entries.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn group_by<'a, K, T, F>(items: &'a [T], key: F) -> Grouped<'a, K, T>
where
    K: Ord,
    F: Fn(&T) -> Option<K>,
{
    let mut groups: BTreeMap<K, Vec<&'a T>> = BTreeMap::new();
    let mut skipped = Vec::new();

    for (i, item) in items.iter().enumerate() {
        match key(item) {
            Some(k) => groups.entry(k).or_default().push(item),
            None => skipped.push(i),
        }
    }

    if !skipped.is_empty() {
        debug!(skipped = skipped.len(), total = items.len(), "rows without a key left out of index");
    }
    Grouped { groups, skipped }
}

pub fn index_unique<'a, K, T, F>(items: &'a [T], key: F) -> Unique<'a, K, T>
where
    K: Ord,
    F: Fn(&T) -> Option<K>,
{
    let mut entries: BTreeMap<K, &'a T> = BTreeMap::new();
    let mut skipped = Vec::new();
    let mut duplicates = Vec::new();

    for (i, item) in items.iter().enumerate() {
        match key(item) {
            Some(k) => {
                if entries.contains_key(&k) {
                    duplicates.push(i);
                } else {
                    entries.insert(k, item);
                }
            }
            None => skipped.push(i),
        }
    }

    if !skipped.is_empty() || !duplicates.is_empty() {
        debug!(
            skipped = skipped.len(),
            duplicates = duplicates.len(),
            total = items.len(),
            "rows left out of unique index"
        );
    }
    Unique { entries, skipped, duplicates }
}

/// Key function for any table carrying a `plotcode` column.
pub fn plot_key(record: &Record) -> Option<PlotCode> {
    record.plot_code()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Value;

    fn row(code: Value, tag: &str) -> Record {
        Record::new().with("plotcode", code).with("tag", tag)
    }

    #[test]
    fn empty_input_gives_empty_index() {
        let rows: Vec<Record> = Vec::new();
        let g = group_by(&rows, plot_key);
        assert!(g.is_empty());
        assert!(g.skipped.is_empty());
        assert!(index_unique(&rows, plot_key).is_empty());
    }

    #[test]
    fn groups_keep_input_order_and_report_missing_keys() {
        let rows = vec![
            row(Value::Number(1.0), "a"),
            row(Value::Null, "orphan"),
            row(Value::Text("1".into()), "b"),
            row(Value::Number(2.0), "c"),
        ];
        let g = group_by(&rows, plot_key);
        assert_eq!(g.len(), 2);
        let tags: Vec<_> = g.get(&PlotCode(1)).iter().map(|r| r.text("tag").unwrap()).collect();
        assert_eq!(tags, vec!["a", "b"]);
        assert_eq!(g.skipped, vec![1]);
        assert!(g.get(&PlotCode(99)).is_empty());
    }

    #[test]
    fn unique_index_keeps_first_and_reports_duplicates() {
        let rows = vec![
            row(Value::Text("1014301".into()), "first"),
            row(Value::Number(1014301.0), "second"),
        ];
        let u = index_unique(&rows, plot_key);
        assert_eq!(u.get(&PlotCode(1014301)).and_then(|r| r.text("tag")), Some("first"));
        assert_eq!(u.duplicates, vec![1]);
    }

    #[test]
    fn works_on_arbitrary_items() {
        let words = ["apple", "avocado", "banana"];
        let g = group_by(&words[..], |w| w.chars().next());
        assert_eq!(g.get(&'a').len(), 2);
        assert_eq!(g.get(&'b').len(), 1);
    }
}

//! Grouper — partitions rows by (term, legislation identifier).
//!
//! The partition is stable: rows keep their input order inside a group, and a
//! key is never split across two groups no matter how its rows are interleaved.

use indexmap::IndexMap;

use crate::dataset::models::{GroupKey, TermGroup, TermRow};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GroupOrder {
    /// Groups appear in the order their key is first seen in the input.
    #[default]
    FirstSeen,
    /// Groups are ordered by term, then legislation identifier.
    Sorted,
}

pub fn group_rows(rows: Vec<TermRow>, order: GroupOrder) -> Vec<TermGroup> {
    let mut buckets: IndexMap<GroupKey, Vec<TermRow>> = IndexMap::new();
    for row in rows {
        buckets.entry(row.key()).or_default().push(row);
    }

    if order == GroupOrder::Sorted {
        buckets.sort_keys();
    }

    buckets
        .into_iter()
        .map(|(key, rows)| TermGroup { key, rows })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(term: &str, id: &str, para: &str) -> TermRow {
        TermRow {
            legislation_term: term.to_string(),
            legislation_id: id.to_string(),
            section_text: None,
            url: None,
            para_id: None,
            paragraphs: Some(para.to_string()),
            case_term: None,
        }
    }

    fn interleaved() -> Vec<TermRow> {
        vec![
            row("worker", "ERA 1996 s.230", "w1"),
            row("employer", "ERA 1996 s.230", "e1"),
            row("worker", "ERA 1996 s.230", "w2"),
            row("worker", "NMWA 1998 s.54", "n1"),
            row("employer", "ERA 1996 s.230", "e2"),
        ]
    }

    fn paragraphs(group: &TermGroup) -> Vec<&str> {
        group
            .rows
            .iter()
            .filter_map(|r| r.paragraphs.as_deref())
            .collect()
    }

    #[test]
    fn test_first_seen_order_and_stable_membership() {
        let groups = group_rows(interleaved(), GroupOrder::FirstSeen);

        let keys: Vec<String> = groups.iter().map(|g| g.key.to_string()).collect();
        assert_eq!(
            keys,
            vec![
                "worker (ERA 1996 s.230)",
                "employer (ERA 1996 s.230)",
                "worker (NMWA 1998 s.54)",
            ]
        );
        assert_eq!(paragraphs(&groups[0]), vec!["w1", "w2"]);
        assert_eq!(paragraphs(&groups[1]), vec!["e1", "e2"]);
        assert_eq!(paragraphs(&groups[2]), vec!["n1"]);
    }

    #[test]
    fn test_sorted_order() {
        let groups = group_rows(interleaved(), GroupOrder::Sorted);
        let keys: Vec<(&str, &str)> = groups
            .iter()
            .map(|g| (g.term(), g.legislation_id()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("employer", "ERA 1996 s.230"),
                ("worker", "ERA 1996 s.230"),
                ("worker", "NMWA 1998 s.54"),
            ]
        );
        // Sorting reorders groups, never the rows inside them.
        assert_eq!(paragraphs(&groups[1]), vec!["w1", "w2"]);
    }

    #[test]
    fn test_grouping_is_a_partition() {
        let rows = interleaved();
        let total = rows.len();
        let groups = group_rows(rows.clone(), GroupOrder::FirstSeen);

        let regrouped: usize = groups.iter().map(|g| g.rows.len()).sum();
        assert_eq!(regrouped, total);

        for original in &rows {
            let owners = groups
                .iter()
                .filter(|g| g.rows.contains(original))
                .count();
            assert_eq!(owners, 1, "row {original:?} must belong to exactly one group");
        }
        for group in &groups {
            assert!(group.rows.iter().all(|r| r.key() == group.key));
        }
    }

    #[test]
    fn test_same_term_different_legislation_are_distinct_groups() {
        let groups = group_rows(
            vec![row("worker", "A", "1"), row("worker", "B", "2")],
            GroupOrder::FirstSeen,
        );
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn test_empty_input() {
        assert!(group_rows(Vec::new(), GroupOrder::Sorted).is_empty());
    }
}

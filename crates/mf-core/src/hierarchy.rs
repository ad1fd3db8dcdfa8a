// SPDX-License-Identifier: MIT OR Apache-2.0
//! Forest operations over [`Hierarchy`] (spec invariant: the graph is a
//! forest; cycles are forbidden).

use crate::types::Hierarchy;
use std::collections::{HashSet, VecDeque};

/// Would re-parenting `child` under `new_parent` create a cycle?
///
/// True if `new_parent` is `child` itself, or if `child` already appears as
/// an ancestor of `new_parent`.
#[must_use]
pub fn would_create_cycle(hierarchy: &Hierarchy, child: &str, new_parent: &str) -> bool {
    if child == new_parent {
        return true;
    }
    let mut current = Some(new_parent.to_string());
    let mut guard = 0usize;
    while let Some(id) = current {
        if id == child {
            return true;
        }
        current = hierarchy.get(&id).cloned().flatten();
        guard += 1;
        if guard > hierarchy.len() + 1 {
            // Already-corrupt graph; treat as a cycle rather than loop forever.
            return true;
        }
    }
    false
}

/// Breadth-first list of `root` and every transitive child of `root`,
/// `root` first.
#[must_use]
pub fn descendants_inclusive(hierarchy: &Hierarchy, root: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    let mut queue = VecDeque::new();
    queue.push_back(root.to_string());
    seen.insert(root.to_string());

    while let Some(id) = queue.pop_front() {
        out.push(id.clone());
        for (candidate, parent) in hierarchy {
            if parent.as_deref() == Some(id.as_str()) && seen.insert(candidate.clone()) {
                queue.push_back(candidate.clone());
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, Option<&str>)]) -> Hierarchy {
        pairs.iter().map(|(k, v)| (k.to_string(), v.map(String::from))).collect()
    }

    #[test]
    fn self_parent_is_a_cycle() {
        let h = map(&[("a", None)]);
        assert!(would_create_cycle(&h, "a", "a"));
    }

    #[test]
    fn reparenting_under_own_descendant_is_a_cycle() {
        let h = map(&[("a", None), ("b", Some("a")), ("c", Some("b"))]);
        assert!(would_create_cycle(&h, "a", "c"));
    }

    #[test]
    fn unrelated_reparent_is_fine() {
        let h = map(&[("a", None), ("b", None)]);
        assert!(!would_create_cycle(&h, "a", "b"));
    }

    #[test]
    fn descendants_bfs_includes_root_first() {
        let h = map(&[("a", None), ("b", Some("a")), ("c", Some("a")), ("d", Some("b"))]);
        let d = descendants_inclusive(&h, "a");
        assert_eq!(d[0], "a");
        assert_eq!(d.len(), 4);
        assert!(d.contains(&"d".to_string()));
    }

    #[test]
    fn leaf_descendants_is_itself() {
        let h = map(&[("a", None), ("b", Some("a"))]);
        assert_eq!(descendants_inclusive(&h, "b"), vec!["b".to_string()]);
    }
}

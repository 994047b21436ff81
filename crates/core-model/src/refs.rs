//! Repository reference index.
//!
//! Refs are loaded once at startup from the ref enumerator's `<id>\t<name>`
//! stream and live for the whole session. Views ask for "all refs pointing
//! at this commit id" while streaming thousands of log records, so the
//! per-id lists are memoized: the first lookup scans the flat ref vector,
//! later lookups return the same handle. Handles are indices into the
//! central vector, so commit records can hold a cheap `Copy` token instead
//! of borrowing into the index.

use std::collections::HashMap;

/// A named pointer at a commit: a branch head or a peeled tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ref {
    /// Shortened name (`refs/heads/` / `refs/tags/` prefix stripped).
    pub name: String,
    /// Full 40-hex commit id.
    pub id: String,
    pub is_tag: bool,
}

/// Index of a ref inside [`RefIndex`].
pub type RefId = usize;

/// Handle to a memoized per-commit ref list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefListId(usize);

#[derive(Debug, Default)]
pub struct RefIndex {
    refs: Vec<Ref>,
    lists: Vec<Vec<RefId>>,
    by_id: HashMap<String, Option<RefListId>>,
}

impl RefIndex {
    pub fn new() -> RefIndex {
        RefIndex::default()
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    /// Filter and record one enumerated ref. Only peeled tags
    /// (`refs/tags/<t>^{}`) and branch heads (`refs/heads/<b>`) are kept;
    /// `HEAD` and everything else is dropped.
    pub fn add(&mut self, id: &str, raw_name: &str) {
        let (name, is_tag) = if let Some(rest) = raw_name.strip_prefix("refs/tags/") {
            // Annotated tags are enumerated twice; only the peeled entry
            // carries the commit id.
            match rest.strip_suffix("^{}") {
                Some(tag) => (tag, true),
                None => return,
            }
        } else if let Some(head) = raw_name.strip_prefix("refs/heads/") {
            (head, false)
        } else {
            return;
        };

        if name.is_empty() {
            return;
        }

        self.refs.push(Ref {
            name: name.to_owned(),
            id: id.to_owned(),
            is_tag,
        });
    }

    /// Ordered list of refs pointing at `id`, or `None` when there are
    /// none. The result is built on first use and stable afterwards.
    pub fn lookup(&mut self, id: &str) -> Option<RefListId> {
        if let Some(&hit) = self.by_id.get(id) {
            return hit;
        }

        let list: Vec<RefId> = self
            .refs
            .iter()
            .enumerate()
            .filter(|(_, r)| r.id == id)
            .map(|(i, _)| i)
            .collect();

        let handle = if list.is_empty() {
            None
        } else {
            self.lists.push(list);
            Some(RefListId(self.lists.len() - 1))
        };
        self.by_id.insert(id.to_owned(), handle);
        handle
    }

    pub fn list(&self, handle: RefListId) -> &[RefId] {
        &self.lists[handle.0]
    }

    pub fn get(&self, id: RefId) -> &Ref {
        &self.refs[id]
    }

    /// Convenience for rendering: resolve a list handle to refs.
    pub fn refs_in(&self, handle: RefListId) -> impl Iterator<Item = &Ref> {
        self.list(handle).iter().map(move |&rid| self.get(rid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const ID_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    fn index() -> RefIndex {
        let mut refs = RefIndex::new();
        refs.add(ID_A, "refs/heads/master");
        refs.add(ID_A, "refs/tags/v0.3");        // unpeeled: dropped
        refs.add(ID_A, "refs/tags/v0.3^{}");     // peeled: kept as tag
        refs.add(ID_B, "refs/heads/topic");
        refs.add(ID_B, "HEAD");                  // dropped
        refs.add(ID_B, "refs/remotes/origin/pu"); // dropped
        refs
    }

    #[test]
    fn filters_enumerated_names() {
        let refs = index();
        assert_eq!(refs.len(), 3);
    }

    #[test]
    fn lookup_returns_insertion_order() {
        let mut refs = index();
        let handle = refs.lookup(ID_A).expect("two refs at ID_A");
        let names: Vec<&str> = refs.refs_in(handle).map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["master", "v0.3"]);
        let tags: Vec<bool> = refs.refs_in(handle).map(|r| r.is_tag).collect();
        assert_eq!(tags, [false, true]);
    }

    #[test]
    fn lookup_is_memoized() {
        let mut refs = index();
        let first = refs.lookup(ID_A).unwrap();
        let second = refs.lookup(ID_A).unwrap();
        assert_eq!(first, second);
        assert_eq!(refs.list(first), refs.list(second));
    }

    #[test]
    fn lookup_miss_is_none_and_cached() {
        let mut refs = index();
        let id = "cccccccccccccccccccccccccccccccccccccccc";
        assert_eq!(refs.lookup(id), None);
        assert_eq!(refs.lookup(id), None);
    }
}

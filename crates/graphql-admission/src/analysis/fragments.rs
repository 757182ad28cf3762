// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::collections::{HashMap, HashSet};

use async_graphql::{
    parser::types::{ExecutableDocument, FragmentDefinition, SelectionSet},
    Name, Positioned,
};

/// Tracks which fragments are being expanded on the current path through a document, so that
/// walkers can inline fragment spreads without looping forever on cyclic fragments.
///
/// Cycles are invalid GraphQL, but admission control runs before (or regardless of) the engine's
/// own validation, so a spread that refers back to a fragment already being expanded is treated
/// as empty rather than as an error.
pub(crate) struct FragmentExpansion<'d> {
    definitions: &'d HashMap<Name, Positioned<FragmentDefinition>>,
    active: HashSet<&'d str>,
}

impl<'d> FragmentExpansion<'d> {
    pub(crate) fn new(document: &'d ExecutableDocument) -> Self {
        Self {
            definitions: &document.fragments,
            active: HashSet::new(),
        }
    }

    /// Run `visit` on the selection set of fragment `name`, with that fragment marked as active
    /// for the duration of the visit.
    ///
    /// Returns `None` without visiting anything if the fragment is not defined in the document, or
    /// if it is already being expanded further up the path.
    pub(crate) fn expand<T>(
        &mut self,
        name: &str,
        visit: impl FnOnce(&mut Self, &'d SelectionSet) -> T,
    ) -> Option<T> {
        let definitions = self.definitions;
        let (name, fragment) = definitions.get_key_value(name)?;
        let name = name.as_str();

        if !self.active.insert(name) {
            return None;
        }

        let result = visit(self, &fragment.node.selection_set.node);
        self.active.remove(name);
        Some(result)
    }

    /// Whether fragment `name` is on the current expansion path.
    #[cfg(test)]
    pub(crate) fn is_expanding(&self, name: &str) -> bool {
        self.active.contains(name)
    }
}

#[cfg(test)]
mod tests {
    use async_graphql::parser::parse_query;

    use super::*;

    const CYCLE: &str = r#"
        query { ...A }
        fragment A on T { a ...B }
        fragment B on T { b ...A }
    "#;

    #[test]
    fn test_unknown_fragment() {
        let doc = parse_query(CYCLE).unwrap();
        let mut fragments = FragmentExpansion::new(&doc);
        assert!(fragments.expand("C", |_, _| ()).is_none());
    }

    #[test]
    fn test_active_while_visiting() {
        let doc = parse_query(CYCLE).unwrap();
        let mut fragments = FragmentExpansion::new(&doc);

        let seen = fragments.expand("A", |fragments, set| {
            assert!(fragments.is_expanding("A"));
            assert!(!fragments.is_expanding("B"));
            set.items.len()
        });

        assert_eq!(seen, Some(2));
        assert!(!fragments.is_expanding("A"));
    }

    #[test]
    fn test_back_edge_not_expanded() {
        let doc = parse_query(CYCLE).unwrap();
        let mut fragments = FragmentExpansion::new(&doc);

        let nested = fragments.expand("A", |fragments, _| {
            fragments.expand("B", |fragments, _| fragments.expand("A", |_, _| ()))
        });

        // A and B both expand, but the spread of A inside B does not.
        assert_eq!(nested, Some(Some(None)));
    }

    #[test]
    fn test_siblings_can_reuse_fragment() {
        let doc = parse_query(CYCLE).unwrap();
        let mut fragments = FragmentExpansion::new(&doc);

        assert!(fragments.expand("B", |_, _| ()).is_some());
        assert!(fragments.expand("B", |_, _| ()).is_some());
    }
}

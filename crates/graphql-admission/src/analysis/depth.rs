// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use async_graphql::parser::types::{ExecutableDocument, Selection, SelectionSet};

use super::fragments::FragmentExpansion;

/// The deepest nesting of fields across all operations in `document`, with fragments inlined.
///
/// A leaf field counts as depth 1. Fragment spreads and inline fragments do not add a level of
/// their own. Spreads of unknown fragments, and spreads that would re-enter a fragment already
/// being expanded, contribute nothing.
pub fn calculate_depth(document: &ExecutableDocument) -> usize {
    let mut fragments = FragmentExpansion::new(document);
    document
        .operations
        .iter()
        .map(|(_, op)| selection_set_depth(&op.node.selection_set.node, &mut fragments))
        .max()
        .unwrap_or(0)
}

fn selection_set_depth<'d>(set: &'d SelectionSet, fragments: &mut FragmentExpansion<'d>) -> usize {
    set.items
        .iter()
        .map(|selection| match &selection.node {
            Selection::Field(field) => {
                1 + selection_set_depth(&field.node.selection_set.node, fragments)
            }

            Selection::FragmentSpread(spread) => fragments
                .expand(spread.node.fragment_name.node.as_str(), |fragments, set| {
                    selection_set_depth(set, fragments)
                })
                .unwrap_or(0),

            Selection::InlineFragment(inline) => {
                selection_set_depth(&inline.node.selection_set.node, fragments)
            }
        })
        .max()
        .unwrap_or(0)
}

// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use async_graphql::parser::types::{ExecutableDocument, Field, Selection, SelectionSet};
use async_graphql_value::Value;

use super::fragments::FragmentExpansion;

/// Weight of a field that looks like it returns a list or a connection.
pub const CONNECTION_BASE_COST: u64 = 10;

/// Page size assumed for list-like fields that do not state one.
pub const UNBOUNDED_LIST_MULTIPLIER: u64 = 10;

/// Heuristic cost model used to estimate how expensive a query will be to execute, without access
/// to the schema.
///
/// Whether a field returns a list is guessed from its name: fields whose names end in `s` or in
/// `Connection` are treated as lists. This misclassifies some fields (`status` is a "list",
/// `people` is not), and a schema-aware model would not, but the behaviour is relied upon by
/// existing limits, so it is kept as is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CostModel {
    pub connection_base_cost: u64,
    pub unbounded_list_multiplier: u64,
    pub pagination_arguments: Vec<String>,
}

/// Estimate the cost of `document` using the default [CostModel].
pub fn estimate_cost(document: &ExecutableDocument) -> u64 {
    CostModel::default().estimate(document)
}

/// Whether the field named `name` is assumed to return a list or a connection.
pub fn is_list_like(name: &str) -> bool {
    name.ends_with('s') || name.ends_with("Connection")
}

impl CostModel {
    /// Sum of the costs of all operations in `document`, with fragments inlined.
    pub fn estimate(&self, document: &ExecutableDocument) -> u64 {
        let mut fragments = FragmentExpansion::new(document);
        document
            .operations
            .iter()
            .map(|(_, op)| self.selection_set_cost(&op.node.selection_set.node, &mut fragments))
            .fold(0, u64::saturating_add)
    }

    /// The cost of `field` on its own, not counting its sub-selections.
    pub fn field_cost(&self, field: &Field) -> u64 {
        let name = field.name.node.as_str();
        if !is_list_like(name) {
            return 1;
        }

        let multiplier = self
            .page_size(field)
            .unwrap_or(self.unbounded_list_multiplier);

        self.connection_base_cost.saturating_mul(multiplier)
    }

    /// The literal page size requested by `field`, if any. Page sizes supplied through variables
    /// are not known at this point, so they do not count.
    fn page_size(&self, field: &Field) -> Option<u64> {
        self.pagination_arguments.iter().find_map(|arg| {
            let value = field.get_argument(arg)?;
            match &value.node {
                Value::Number(n) => n.as_u64(),
                _ => None,
            }
        })
    }

    fn selection_set_cost<'d>(
        &self,
        set: &'d SelectionSet,
        fragments: &mut FragmentExpansion<'d>,
    ) -> u64 {
        set.items
            .iter()
            .map(|selection| match &selection.node {
                Selection::Field(field) => self.field_cost(&field.node).saturating_add(
                    self.selection_set_cost(&field.node.selection_set.node, fragments),
                ),

                Selection::FragmentSpread(spread) => fragments
                    .expand(spread.node.fragment_name.node.as_str(), |fragments, set| {
                        self.selection_set_cost(set, fragments)
                    })
                    .unwrap_or(0),

                Selection::InlineFragment(inline) => {
                    self.selection_set_cost(&inline.node.selection_set.node, fragments)
                }
            })
            .fold(0, u64::saturating_add)
    }
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            connection_base_cost: CONNECTION_BASE_COST,
            unbounded_list_multiplier: UNBOUNDED_LIST_MULTIPLIER,
            pagination_arguments: vec!["first".to_owned(), "last".to_owned()],
        }
    }
}

#[cfg(test)]
mod tests {
    use async_graphql::parser::parse_query;

    use super::super::tests::empty_document;
    use super::*;

    fn cost(query: &str) -> u64 {
        estimate_cost(&parse_query(query).unwrap())
    }

    #[test]
    fn test_plain_fields() {
        assert_eq!(cost("{ foo bar }"), 2);
    }

    #[test]
    fn test_unbounded_list() {
        assert_eq!(cost("{ users }"), 100);
    }

    #[test]
    fn test_paginated_connection() {
        assert_eq!(cost("{ friendsConnection(first: 5) }"), 50);
    }

    #[test]
    fn test_last_argument() {
        assert_eq!(cost("{ posts(last: 3) }"), 30);
    }

    #[test]
    fn test_first_takes_priority() {
        assert_eq!(cost("{ posts(last: 3, first: 7) }"), 70);
    }

    #[test]
    fn test_variable_page_size_is_unbounded() {
        assert_eq!(cost("query($n: Int) { users(first: $n) }"), 100);
    }

    #[test]
    fn test_non_integer_page_size_is_unbounded() {
        assert_eq!(cost(r#"{ users(first: "5") }"#), 100);
        assert_eq!(cost("{ users(first: -5) }"), 100);
    }

    #[test]
    fn test_pagination_ignored_on_plain_fields() {
        assert_eq!(cost("{ user(first: 50) }"), 1);
    }

    #[test]
    fn test_nested_cost_not_multiplied() {
        // users: 10 * 2, each of id and name: 1
        assert_eq!(cost("{ users(first: 2) { id name } }"), 22);
    }

    #[test]
    fn test_fragment_spread() {
        let query = r#"
            query { ...FragCost }
            fragment FragCost on Query { foo }
        "#;
        assert_eq!(cost(query), 1);
    }

    #[test]
    fn test_fragment_reuse_counted_per_spread() {
        let query = r#"
            query { a { ...F } b { ...F } }
            fragment F on T { x y }
        "#;
        assert_eq!(cost(query), 6);
    }

    #[test]
    fn test_additive_over_siblings() {
        assert_eq!(
            cost("{ users(first: 4) { id } viewer { name } }"),
            cost("{ users(first: 4) { id } }") + cost("{ viewer { name } }"),
        );
    }

    #[test]
    fn test_fragment_cycle_terminates() {
        let query = r#"
            query { ...A }
            fragment A on T { a ...B }
            fragment B on T { b ...A }
        "#;
        assert_eq!(cost(query), 2);
    }

    #[test]
    fn test_unknown_fragment() {
        assert_eq!(cost("{ foo ...Missing }"), 1);
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(estimate_cost(&empty_document()), 0);
    }

    #[test]
    fn test_sum_over_operations() {
        let query = r#"
            query A { foo }
            query B { users }
        "#;
        assert_eq!(cost(query), 101);
    }

    #[test]
    fn test_saturates() {
        let model = CostModel {
            connection_base_cost: u64::MAX,
            ..CostModel::default()
        };

        let doc = parse_query("{ users(first: 2) posts(first: 2) }").unwrap();
        assert_eq!(model.estimate(&doc), u64::MAX);
    }

    #[test]
    fn test_list_heuristic() {
        assert!(is_list_like("users"));
        assert!(is_list_like("friendsConnection"));
        assert!(is_list_like("status"));
        assert!(!is_list_like("people"));
        assert!(!is_list_like("viewer"));
    }

    #[test]
    fn test_custom_model() {
        let model = CostModel {
            connection_base_cost: 2,
            unbounded_list_multiplier: 3,
            pagination_arguments: vec!["limit".to_owned()],
        };

        let doc = parse_query("{ users items(limit: 4) other(first: 100) }").unwrap();
        // users: 2 * 3, items: 2 * 4, other: 1
        assert_eq!(model.estimate(&doc), 15);
    }
}

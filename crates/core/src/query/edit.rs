//! Non-mutating query edits.
//!
//! Every edit returns a new node and leaves the input untouched. Children are
//! `Arc`s, so a rebuilt compound shares every subtree it did not change.
//! Targets are matched by node identity ([`Query::ptr_eq`]), never by value.

use std::sync::Arc;

use super::{CompoundQuery, FieldQuery, Join, Query};

impl CompoundQuery {
    fn with_queries(&self, queries: Vec<Query>) -> Self {
        Self {
            invert: self.invert,
            join: self.join,
            queries,
            relation: self.relation,
        }
    }

    fn position(&self, target: &Query) -> Option<usize> {
        self.queries.iter().position(|child| child.ptr_eq(target))
    }

    pub fn push(&self, query: impl Into<Query>) -> Self {
        let mut queries = self.queries.clone();
        queries.push(query.into());
        self.with_queries(queries)
    }

    pub fn push_field(&self, query: FieldQuery) -> Self {
        self.push(query)
    }

    pub fn push_compound(&self, query: CompoundQuery) -> Self {
        self.push(query)
    }

    /// Swaps a direct child. `None` when `target` is not one.
    pub fn replace(&self, target: &Query, replacement: impl Into<Query>) -> Option<Self> {
        let index = self.position(target)?;
        Some(self.replace_at(index, replacement.into()))
    }

    /// Drops a direct child. `None` when `target` is not one.
    pub fn remove(&self, target: &Query) -> Option<Self> {
        let index = self.position(target)?;
        Some(self.remove_at(index))
    }

    fn replace_at(&self, index: usize, replacement: Query) -> Self {
        let mut queries = self.queries.clone();
        queries[index] = replacement;
        self.with_queries(queries)
    }

    fn remove_at(&self, index: usize) -> Self {
        let mut queries = self.queries.clone();
        queries.remove(index);
        self.with_queries(queries)
    }

    pub fn with_join(&self, join: Join) -> Self {
        Self {
            join,
            ..self.clone()
        }
    }

    pub fn toggle_join(&self) -> Self {
        self.with_join(match self.join {
            Join::And => Join::Or,
            Join::Or => Join::And,
        })
    }

    pub fn with_invert(&self, invert: bool) -> Self {
        Self {
            invert,
            ..self.clone()
        }
    }

    pub fn toggle_invert(&self) -> Self {
        self.with_invert(!self.invert)
    }
}

impl Query {
    /// Replaces `target` anywhere in the tree, rebuilding only the compounds
    /// on the path to it. `None` when `target` is not in the tree.
    pub fn replace_descendant(
        &self,
        target: &Query,
        replacement: impl Into<Query>,
    ) -> Option<Query> {
        if self.ptr_eq(target) {
            return Some(replacement.into());
        }
        let replacement = replacement.into();
        self.edit_parent(target, &mut |parent, index| {
            parent.replace_at(index, replacement.clone())
        })
    }

    /// Removes `target` from wherever it sits below this node.
    pub fn remove_descendant(&self, target: &Query) -> Option<Query> {
        self.edit_parent(target, &mut |parent, index| parent.remove_at(index))
    }

    /// Flips the invert flag of either node kind.
    pub fn toggle_invert(&self) -> Query {
        match self {
            Query::Field(field) => field.with_invert(!field.invert).into(),
            Query::Compound(compound) => compound.toggle_invert().into(),
        }
    }

    fn edit_parent(
        &self,
        target: &Query,
        edit: &mut dyn FnMut(&CompoundQuery, usize) -> CompoundQuery,
    ) -> Option<Query> {
        let Query::Compound(compound) = self else {
            return None;
        };
        if let Some(index) = compound.position(target) {
            return Some(Query::Compound(Arc::new(edit(compound, index))));
        }
        compound
            .queries
            .iter()
            .enumerate()
            .find_map(|(index, child)| Some((index, child.edit_parent(target, &mut *edit)?)))
            .map(|(index, child)| compound.replace_at(index, child).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Modifier, Operator, QueryValue, RelationType};

    fn title(value: &str) -> FieldQuery {
        FieldQuery::new("title", None, Operator::Contains, Some(QueryValue::Text(value.into())))
    }

    fn sample() -> Query {
        CompoundQuery::new(Join::And)
            .push_field(title("beach"))
            .push_compound(
                CompoundQuery::new(Join::Or)
                    .push_field(title("sun"))
                    .push_field(title("sand")),
            )
            .push_compound(
                CompoundQuery::relation(RelationType::Album, true).push_field(FieldQuery::new(
                    "name",
                    None,
                    Operator::Equal,
                    Some(QueryValue::Text("Holidays".into())),
                )),
            )
            .into()
    }

    fn children(query: &Query) -> &[Query] {
        &query.as_compound().unwrap().queries
    }

    // ── Direct children ──────────────────────────────────────────

    #[test]
    fn test_push_leaves_original_untouched() {
        let base = CompoundQuery::new(Join::And).push_field(title("a"));
        let grown = base.push_field(title("b"));

        assert_eq!(base.queries.len(), 1);
        assert_eq!(grown.queries.len(), 2);
        assert!(grown.queries[0].ptr_eq(&base.queries[0]));
    }

    #[test]
    fn test_replace_and_remove_by_identity() {
        let base = CompoundQuery::new(Join::And)
            .push_field(title("same"))
            .push_field(title("same"));
        let second = base.queries[1].clone();
        assert_eq!(base.queries[0], second);

        let removed = base.remove(&second).unwrap();
        assert_eq!(removed.queries.len(), 1);
        assert!(removed.queries[0].ptr_eq(&base.queries[0]));

        let replaced = base.replace(&second, title("other")).unwrap();
        assert!(replaced.queries[0].ptr_eq(&base.queries[0]));
        assert_eq!(
            replaced.queries[1].as_field().unwrap().value,
            Some(QueryValue::Text("other".into()))
        );

        let stranger: Query = title("same").into();
        assert!(base.remove(&stranger).is_none());
        assert!(base.replace(&stranger, title("x")).is_none());
    }

    #[test]
    fn test_join_and_invert() {
        let base = CompoundQuery::new(Join::And).push_field(title("a"));
        let toggled = base.toggle_join().toggle_invert();

        assert_eq!(toggled.join, Join::Or);
        assert!(toggled.invert);
        assert_eq!(base.join, Join::And);
        assert!(!base.invert);
        assert!(toggled.queries[0].ptr_eq(&base.queries[0]));
        assert_eq!(base.with_join(Join::And), base);
    }

    // ── Deep edits ───────────────────────────────────────────────

    #[test]
    fn test_replace_descendant_shares_untouched_subtrees() {
        let root = sample();
        let nested = children(&root)[1].clone();
        let target = children(&nested)[0].clone();

        let replacement = FieldQuery::new(
            "title",
            Some(Modifier::Length),
            Operator::GreaterThan,
            Some(QueryValue::Number(3.0)),
        );
        let edited = root.replace_descendant(&target, replacement.clone()).unwrap();

        assert!(!edited.ptr_eq(&root));
        assert!(children(&edited)[0].ptr_eq(&children(&root)[0]));
        assert!(children(&edited)[2].ptr_eq(&children(&root)[2]));
        let new_nested = &children(&edited)[1];
        assert!(!new_nested.ptr_eq(&nested));
        assert!(children(new_nested)[1].ptr_eq(&children(&nested)[1]));
        assert_eq!(children(new_nested)[0].as_field(), Some(&replacement));

        // The input tree is unchanged.
        assert!(children(&nested)[0].ptr_eq(&target));
        assert_eq!(root, sample());
    }

    #[test]
    fn test_replace_descendant_root_and_missing() {
        let root = sample();
        let replacement: Query = title("root").into();
        let edited = root.replace_descendant(&root, replacement.clone()).unwrap();
        assert!(edited.ptr_eq(&replacement));

        let stranger: Query = title("beach").into();
        assert!(root.replace_descendant(&stranger, title("x")).is_none());
    }

    #[test]
    fn test_remove_descendant() {
        let root = sample();
        let relation = children(&root)[2].clone();
        let target = children(&relation)[0].clone();

        let edited = root.remove_descendant(&target).unwrap();
        let new_relation = children(&edited)[2].as_compound().unwrap();
        assert!(new_relation.queries.is_empty());
        assert_eq!(new_relation.relation_type(), Some(RelationType::Album));
        assert!(root.remove_descendant(&root).is_none());
    }

    #[test]
    fn test_toggle_invert_on_query() {
        let field: Query = title("a").into();
        assert!(field.toggle_invert().as_field().unwrap().invert);
        let root = sample();
        let flipped = root.toggle_invert();
        assert!(flipped.as_compound().unwrap().invert);
        assert!(children(&flipped)[0].ptr_eq(&children(&root)[0]));
    }
}

//! Boolean component expressions compiled to partition filters.
//!
//! A [`Query`] wraps an [`Expr`] built from `&`, `|` and `!` over component
//! [`Id`](component::Id)s (via ordinary Rust operator overloading - no
//! runtime reflection or string parsing needed). [`Query::resolve`] walks a
//! [`Table`]'s partitions and returns every `(signature, ranges)` pair whose
//! signature satisfies the expression; [`Query::for_each_range`] is the
//! chunked iteration primitive systems use to avoid materializing row lists.
//!
//! Resolution always re-walks the table's current partitions rather than
//! caching a stale list, so a query is trivially valid "until the next
//! structural change": there is no cache to invalidate.

use std::ops::{BitAnd, BitOr, Not as StdNot};

use crate::component::{self, Signature};
use crate::storage::{Table, TableRange};

/// A boolean expression over component membership in an archetype.
///
/// Build one from component ids with [`Expr::has`], then combine with the
/// standard `&`/`|`/`!` operators, e.g. `Expr::has(pos) & !Expr::has(dead)`.
#[derive(Debug, Clone)]
pub enum Expr {
    Has(component::Id),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Require the given component to be present.
    pub fn has(id: component::Id) -> Self {
        Expr::Has(id)
    }

    fn eval(&self, sig: &Signature) -> bool {
        match self {
            Expr::Has(id) => sig.contains(*id),
            Expr::Not(e) => !e.eval(sig),
            Expr::And(a, b) => a.eval(sig) && b.eval(sig),
            Expr::Or(a, b) => a.eval(sig) || b.eval(sig),
        }
    }

    /// Reduce a conjunction of (possibly negated) `Has` terms to a single
    /// `(required, forbidden)` mask pair - the fast path `Query::resolve`
    /// takes when the expression has no `Or`. Returns `None` for any
    /// expression containing an `Or`, which must fall back to per-partition
    /// evaluation since a union can't be expressed as one mask test.
    fn masks(&self) -> Option<(Signature, Signature)> {
        match self {
            Expr::Has(id) => Some((Signature::of(*id), Signature::empty())),
            Expr::Not(inner) => match inner.as_ref() {
                Expr::Has(id) => Some((Signature::empty(), Signature::of(*id))),
                _ => None,
            },
            Expr::And(a, b) => {
                let (ra, fa) = a.masks()?;
                let (rb, fb) = b.masks()?;
                Some((ra.union(&rb), fa.union(&fb)))
            }
            Expr::Or(_, _) => None,
        }
    }
}

impl BitAnd for Expr {
    type Output = Expr;
    fn bitand(self, rhs: Expr) -> Expr {
        Expr::And(Box::new(self), Box::new(rhs))
    }
}

impl BitOr for Expr {
    type Output = Expr;
    fn bitor(self, rhs: Expr) -> Expr {
        Expr::Or(Box::new(self), Box::new(rhs))
    }
}

impl StdNot for Expr {
    type Output = Expr;
    fn not(self) -> Expr {
        Expr::Not(Box::new(self))
    }
}

/// A resolved partition: its signature plus the currently-live ranges a
/// system may walk.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub signature: Signature,
    pub ranges: Vec<TableRange>,
}

/// A compiled component expression, ready to be resolved against a table's
/// current partitions.
#[derive(Debug, Clone)]
pub struct Query {
    expr: Expr,
}

impl Query {
    pub fn new(expr: Expr) -> Self {
        Self { expr }
    }

    /// Resolve this query against `table`'s current partitions: every
    /// partition whose signature satisfies the expression, paired with its
    /// non-empty live ranges.
    pub fn resolve(&self, table: &Table) -> Vec<Resolved> {
        if let Some((required, forbidden)) = self.expr.masks() {
            table
                .partitions()
                .filter(|p| {
                    p.signature().contains_all(&required) && p.signature().intersection(&forbidden).is_empty()
                })
                .map(|p| Resolved {
                    signature: p.signature().clone(),
                    ranges: p.ranges().iter().copied().filter(|r| !r.is_empty()).collect(),
                })
                .collect()
        } else {
            table
                .partitions()
                .filter(|p| self.expr.eval(p.signature()))
                .map(|p| Resolved {
                    signature: p.signature().clone(),
                    ranges: p.ranges().iter().copied().filter(|r| !r.is_empty()).collect(),
                })
                .collect()
        }
    }

    /// Chunked iteration primitive: invoke `f` once per `(signature, range)`
    /// pair this query resolves to, in implementation-defined order.
    /// Callers must not mutate table structure while iterating.
    pub fn for_each_range(&self, table: &Table, mut f: impl FnMut(&Signature, &TableRange)) {
        for resolved in self.resolve(table) {
            for range in &resolved.ranges {
                f(&resolved.signature, range);
            }
        }
    }
}

/// Map a row-id known to fall within `range` to a position relative to the
/// range's start, for callers indexing into raw per-block field arrays.
#[inline]
pub fn offset(range: &TableRange, row: usize) -> usize {
    row - range.start
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Id;

    fn sig(ids: &[u32]) -> Signature {
        Signature::from_ids(ids.iter().map(|&i| Id::new(i)))
    }

    #[test]
    fn and_requires_both_bits() {
        let expr = Expr::has(Id::new(0)) & Expr::has(Id::new(1));
        assert!(expr.eval(&sig(&[0, 1])));
        assert!(expr.eval(&sig(&[0, 1, 2])));
        assert!(!expr.eval(&sig(&[0])));
    }

    #[test]
    fn or_requires_either_bit() {
        let expr = Expr::has(Id::new(0)) | Expr::has(Id::new(1));
        assert!(expr.eval(&sig(&[0])));
        assert!(expr.eval(&sig(&[1])));
        assert!(!expr.eval(&sig(&[2])));
    }

    #[test]
    fn not_forbids_a_bit() {
        let expr = Expr::has(Id::new(0)) & !Expr::has(Id::new(1));
        assert!(expr.eval(&sig(&[0])));
        assert!(!expr.eval(&sig(&[0, 1])));
    }

    #[test]
    fn masks_none_for_expressions_containing_or() {
        let expr = Expr::has(Id::new(0)) | Expr::has(Id::new(1));
        assert!(expr.masks().is_none());
    }

    #[test]
    fn masks_some_for_pure_conjunction() {
        let expr = Expr::has(Id::new(0)) & !Expr::has(Id::new(1));
        let (required, forbidden) = expr.masks().unwrap();
        assert!(required.contains(Id::new(0)));
        assert!(forbidden.contains(Id::new(1)));
    }

    #[test]
    fn resolve_filters_by_required_and_forbidden() {
        use crate::storage::Table;

        #[derive(Clone, Copy)]
        struct A;
        impl crate::component::Component for A {}
        #[derive(Clone, Copy)]
        struct B;
        impl crate::component::Component for B {}

        let a_id = Id::new(0);
        let b_id = Id::new(1);
        let mut table = Table::new();
        table.register_component::<A>(a_id, crate::component::Info::new::<A>(a_id));
        table.register_component::<B>(b_id, crate::component::Info::new::<B>(b_id));

        let a_only = sig(&[0]);
        let a_and_b = sig(&[0, 1]);
        table.add_to_partition(&a_only);
        table.add_to_partition(&a_and_b);

        let query = Query::new(Expr::has(a_id) & !Expr::has(b_id));
        let resolved = query.resolve(&table);

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].signature, a_only);
    }
}

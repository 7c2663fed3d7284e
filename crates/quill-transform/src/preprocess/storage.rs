//! Static storage layout for `data` declarations.
//!
//! Every declaration receives an offset inside its frame and a chain of
//! stride coefficients. Tuples open a fresh frame for their fields, so field
//! offsets are relative to the tuple. Regions whose footprint reaches 2^176
//! are treated as dynamically sized and do not move the cursor.

use super::access::decompose_access;
use super::errors::{PreprocessError, Result};
use super::tables::{StorageVariable, StorageVariableTable};
use quill_core::{const_eval, is_pure_arithmetic, Decimal, Node, SourceSpan};
use tracing::{debug, warn};

#[derive(Debug, Clone, Default)]
pub struct StorageLayoutPlanner {
    table: StorageVariableTable,
    declarations: usize,
}

impl StorageLayoutPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lays out the next top-level declaration, indexed by its ordinal among
    /// the `data` declarations seen so far.
    pub fn plan(&mut self, declaration: &Node) -> Result<()> {
        let index = self.declarations;
        self.plan_at(declaration, index)?;
        self.declarations += 1;
        Ok(())
    }

    /// Lays out `declaration` with an explicit index. On failure the table
    /// is left exactly as it was.
    pub fn plan_at(&mut self, declaration: &Node, index: usize) -> Result<()> {
        let mut staged = self.table.clone();
        let cursor = staged.global_offset().clone();
        let cursor = layout(&mut staged, declaration, "", index, cursor)?;
        staged.set_global_offset(cursor);
        self.table = staged;
        Ok(())
    }

    pub fn table(&self) -> &StorageVariableTable {
        &self.table
    }

    pub fn into_table(self) -> StorageVariableTable {
        self.table
    }
}

/// Places `node` at `cursor` and returns the cursor for the next sibling.
fn layout(
    table: &mut StorageVariableTable,
    node: &Node,
    prefix: &str,
    index: usize,
    cursor: Decimal,
) -> Result<Decimal> {
    let (path, coefficients, non_final) = match node {
        Node::Token { .. } => leaf(node, prefix)?,
        Node::Operation { tag, .. } if tag == "access" => leaf(node, prefix)?,
        Node::Operation {
            tag,
            children,
            span,
        } => {
            let (head, fields) = if tag == "fun" {
                match children.split_first() {
                    Some((head, fields)) => (head.clone(), fields),
                    None => {
                        return Err(PreprocessError::malformed(
                            "tuple declaration without a name",
                            *span,
                        ))
                    }
                }
            } else {
                (Node::token(tag.clone(), *span), children.as_slice())
            };

            let access = decompose_access(&head)?;
            let path = format!("{}{}", prefix, access.base);
            let field_prefix = format!("{}.", path);

            let mut frame = Decimal::zero();
            for (field_index, field) in fields.iter().enumerate() {
                frame = layout(table, field, &field_prefix, field_index, frame)?;
            }

            let coefficients = stride_chain(frame, &access.dimensions, &path)?;
            (path, coefficients, true)
        }
    };

    let footprint = coefficients.last().cloned().unwrap_or_default();
    debug!(
        target: "quill::preprocess",
        path = %path,
        offset = %cursor,
        footprint = %footprint,
        "planned storage"
    );

    if table.contains(&path) {
        warn!(target: "quill::preprocess", path = %path, "storage path redeclared; last declaration wins");
    }
    table.insert(
        path,
        StorageVariable {
            offset: cursor.clone(),
            coefficients,
            index,
            non_final,
        },
    );

    if Decimal::tt176().gt(&footprint) {
        Ok(cursor.add(&footprint))
    } else {
        Ok(cursor)
    }
}

fn leaf(node: &Node, prefix: &str) -> Result<(String, Vec<Decimal>, bool)> {
    let access = decompose_access(node)?;
    let path = format!("{}{}", prefix, access.base);
    let coefficients = stride_chain(Decimal::one(), &access.dimensions, &path)?;
    Ok((path, coefficients, false))
}

/// Seeds the chain with the element size, then multiplies in each dimension
/// from the innermost (last written) outwards.
fn stride_chain(seed: Decimal, dimensions: &[Node], path: &str) -> Result<Vec<Decimal>> {
    let mut chain = Vec::with_capacity(dimensions.len() + 1);
    chain.push(seed);
    for dimension in dimensions.iter().rev() {
        let size = constant_size(dimension, path)?;
        let next = chain.last().cloned().unwrap_or_default().mul(&size);
        chain.push(next);
    }
    Ok(chain)
}

fn constant_size(dimension: &Node, path: &str) -> Result<Decimal> {
    let non_constant = |span: SourceSpan| PreprocessError::NonConstantArrayDimension {
        name: path.to_string(),
        span,
    };
    if !is_pure_arithmetic(dimension) {
        return Err(non_constant(dimension.span()));
    }
    const_eval(dimension).ok_or_else(|| non_constant(dimension.span()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quill_parser::parse_node;

    fn plan_all(sources: &[&str]) -> Result<StorageVariableTable> {
        let mut planner = StorageLayoutPlanner::new();
        for src in sources {
            planner.plan(&parse_node(src).unwrap())?;
        }
        Ok(planner.into_table())
    }

    fn dec(v: u64) -> Decimal {
        Decimal::from(v)
    }

    #[test]
    fn test_scalars_in_declaration_order() {
        let table = plan_all(&["a", "b", "c"]).unwrap();
        let offsets: Vec<(String, Decimal, usize)> = table
            .iter()
            .map(|(k, v)| (k.clone(), v.offset.clone(), v.index))
            .collect();
        assert_eq!(
            offsets,
            vec![
                ("a".to_string(), dec(0), 0),
                ("b".to_string(), dec(1), 1),
                ("c".to_string(), dec(2), 2),
            ]
        );
        assert_eq!(table.global_offset(), &dec(3));
    }

    #[test]
    fn test_array_footprint_advances_cursor() {
        let table = plan_all(&["(access a 5)", "b"]).unwrap();
        let a = table.get("a").unwrap();
        assert_eq!(a.offset, dec(0));
        assert_eq!(a.coefficients, vec![dec(1), dec(5)]);
        assert_eq!(a.footprint(), dec(5));
        assert_eq!(table.get("b").unwrap().offset, dec(5));
    }

    #[test]
    fn test_multi_dimensional_strides() {
        let table = plan_all(&["(access (access grid 4) (mul 2 3))", "after"]).unwrap();
        let grid = table.get("grid").unwrap();
        assert_eq!(grid.coefficients, vec![dec(1), dec(6), dec(24)]);
        assert_eq!(table.get("after").unwrap().offset, dec(24));
    }

    #[test]
    fn test_tuple_fields_use_local_frame() {
        let table = plan_all(&["first", "(x p q)", "last"]).unwrap();

        let x = table.get("x").unwrap();
        assert!(x.non_final);
        assert_eq!(x.offset, dec(1));
        assert_eq!(x.coefficients, vec![dec(2)]);
        assert_eq!(x.index, 1);

        let p = table.get("x.p").unwrap();
        let q = table.get("x.q").unwrap();
        assert_eq!((p.offset.clone(), p.index, p.non_final), (dec(0), 0, false));
        assert_eq!((q.offset.clone(), q.index), (dec(1), 1));

        assert_eq!(table.get("last").unwrap().offset, dec(3));
        assert_eq!(table.absolute_offset("x.q"), Some(dec(2)));
    }

    #[test]
    fn test_array_of_tuples() {
        let table = plan_all(&["(fun (access users 10) name (access scores 3))", "tail"]).unwrap();

        let users = table.get("users").unwrap();
        assert_eq!(users.coefficients, vec![dec(4), dec(40)]);
        assert!(users.non_final);
        assert_eq!(table.get("users.scores").unwrap().offset, dec(1));
        assert_eq!(table.get("tail").unwrap().offset, dec(40));
    }

    #[test]
    fn test_nested_tuples() {
        let table = plan_all(&["(outer a (inner b c) d)"]).unwrap();
        assert_eq!(table.get("outer.inner").unwrap().offset, dec(1));
        assert_eq!(table.get("outer.inner.c").unwrap().offset, dec(1));
        assert_eq!(table.get("outer.d").unwrap().offset, dec(3));
        assert_eq!(table.get("outer").unwrap().footprint(), dec(4));
        assert!(table.get("outer.inner").unwrap().non_final);
    }

    #[test]
    fn test_unsized_array_does_not_move_cursor() {
        let table = plan_all(&["(access log)", "counter"]).unwrap();
        let log = table.get("log").unwrap();
        assert_eq!(log.footprint(), Decimal::tt256m1());
        assert_eq!(table.get("counter").unwrap().offset, dec(0));
    }

    #[test]
    fn test_sentinel_boundary() {
        let sentinel = Decimal::tt176().to_string();
        let below = format!("(access big (sub {} 1))", sentinel);
        let at = format!("(access huge {})", sentinel);
        let table = plan_all(&[below.as_str(), at.as_str(), "next"]).unwrap();

        let big = table.get("big").unwrap().footprint();
        assert!(Decimal::tt176().gt(&big));
        assert_eq!(table.get("huge").unwrap().offset, big);
        assert_eq!(table.get("next").unwrap().offset, big);
    }

    #[test]
    fn test_non_constant_dimension_leaves_table_untouched() {
        let mut planner = StorageLayoutPlanner::new();
        planner.plan(&parse_node("owner").unwrap()).unwrap();
        let before = planner.table().clone();

        let err = planner
            .plan(&parse_node("(acct name (access history (sload 0)))").unwrap())
            .unwrap_err();

        match err {
            PreprocessError::NonConstantArrayDimension { name, .. } => {
                assert_eq!(name, "acct.history")
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(planner.table(), &before);
        assert!(!planner.table().contains("acct.name"));
    }

    #[test]
    fn test_malformed_tuple_head() {
        let err = plan_all(&["(fun)"]).unwrap_err();
        assert!(matches!(err, PreprocessError::MalformedDeclaration { .. }));
    }
}

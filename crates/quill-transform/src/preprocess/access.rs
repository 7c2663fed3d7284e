//! Shape helpers shared by the storage planner and the function lowering.

use super::errors::{PreprocessError, Result};
use quill_core::{Decimal, Node};

/// A storage name with its array dimensions in source order, outermost
/// first: `a[5][3]` yields `("a", [5, 3])`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageAccess {
    pub base: String,
    pub dimensions: Vec<Node>,
}

/// Flattens nested `(access inner size)` nodes. A single-child
/// `(access inner)` is an unsized dimension of length 2^256 - 1.
pub fn decompose_access(node: &Node) -> Result<StorageAccess> {
    let mut dimensions = Vec::new();
    let mut current = node;
    loop {
        match current {
            Node::Token { text, .. } => {
                dimensions.reverse();
                return Ok(StorageAccess {
                    base: text.clone(),
                    dimensions,
                });
            }
            Node::Operation { tag, children, span } if tag == "access" => {
                match children.as_slice() {
                    [inner] => {
                        dimensions.push(Node::token(Decimal::tt256m1().to_string(), *span));
                        current = inner;
                    }
                    [inner, size] => {
                        dimensions.push(size.clone());
                        current = inner;
                    }
                    _ => {
                        return Err(PreprocessError::malformed(
                            "error parsing storage variable statement",
                            *span,
                        ))
                    }
                }
            }
            other => {
                return Err(PreprocessError::malformed(
                    format!("expected a storage name, found '{}'", other),
                    other.span(),
                ))
            }
        }
    }
}

/// A `name:tag` pair, written either as `(: name tag)` or as one token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedName {
    pub name: String,
    pub tag: String,
}

/// Returns `None` for a plain name, the pair for a tagged one, and an error
/// for anything else.
pub fn split_tagged(node: &Node) -> Result<Option<TaggedName>> {
    let malformed = || PreprocessError::malformed(format!("malformed name '{}'", node), node.span());
    match node {
        Node::Operation { tag, children, .. } if tag == ":" => match children.as_slice() {
            [Node::Token { text: name, .. }, Node::Token { text: tag, .. }] => Ok(Some(TaggedName {
                name: name.clone(),
                tag: tag.clone(),
            })),
            _ => Err(malformed()),
        },
        Node::Operation { .. } => Err(malformed()),
        Node::Token { text, .. } => match text.split_once(':') {
            None => Ok(None),
            Some((name, tag)) if !name.is_empty() && !tag.is_empty() && !tag.contains(':') => {
                Ok(Some(TaggedName {
                    name: name.to_string(),
                    tag: tag.to_string(),
                }))
            }
            Some(_) => Err(malformed()),
        },
    }
}

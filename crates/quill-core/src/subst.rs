//! Hygienic template instantiation.
//!
//! Templates are ordinary ASTs in which `$name` tokens are placeholders. A
//! placeholder with a binding is replaced by the bound node; an unbound one
//! is a template-local identifier and is renamed under the caller's unique
//! prefix so it cannot capture or shadow anything at the expansion site.

use crate::ast::Node;
use crate::source_location::SourceSpan;
use indexmap::IndexMap;

pub type Bindings = IndexMap<String, Node>;

pub fn substitute(template: &Node, bindings: &Bindings, prefix: &str, span: SourceSpan) -> Node {
    match template {
        Node::Token { text, .. } => match text.strip_prefix('$') {
            Some(name) => match bindings.get(name) {
                Some(bound) => bound.clone(),
                None => Node::token(format!("{}{}", prefix, name), span),
            },
            None => Node::token(text.clone(), span),
        },
        Node::Operation { tag, children, .. } => Node::op(
            tag.clone(),
            children
                .iter()
                .map(|child| substitute(child, bindings, prefix, span))
                .collect(),
            span,
        ),
    }
}

/// Builds a binding map from `(name, node)` pairs.
pub fn bindings<I, S>(pairs: I) -> Bindings
where
    I: IntoIterator<Item = (S, Node)>,
    S: Into<String>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

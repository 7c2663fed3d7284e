use crate::source_location::{SourceSpan, INVALID_SPAN};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A node of the generic tagged tree produced by the parser.
///
/// Leaves carry their literal text; operations carry a tag and ordered
/// children. Trees are treated as values: passes build new trees instead of
/// editing existing ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Token {
        text: String,
        span: SourceSpan,
    },
    Operation {
        tag: String,
        children: Vec<Node>,
        span: SourceSpan,
    },
}

impl Node {
    pub fn token(text: impl Into<String>, span: SourceSpan) -> Self {
        Node::Token {
            text: text.into(),
            span,
        }
    }

    pub fn op(tag: impl Into<String>, children: Vec<Node>, span: SourceSpan) -> Self {
        Node::Operation {
            tag: tag.into(),
            children,
            span,
        }
    }

    /// A token with no source position, for nodes invented by a pass.
    pub fn synthetic(text: impl Into<String>) -> Self {
        Self::token(text, INVALID_SPAN)
    }

    /// Token text, or the tag of an operation.
    pub fn value(&self) -> &str {
        match self {
            Node::Token { text, .. } => text,
            Node::Operation { tag, .. } => tag,
        }
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Token { .. } => &[],
            Node::Operation { children, .. } => children,
        }
    }

    pub fn span(&self) -> SourceSpan {
        match self {
            Node::Token { span, .. } | Node::Operation { span, .. } => *span,
        }
    }

    pub fn is_token(&self) -> bool {
        matches!(self, Node::Token { .. })
    }

    pub fn is_op(&self, tag: &str) -> bool {
        matches!(self, Node::Operation { tag: t, .. } if t == tag)
    }

    pub fn as_token(&self) -> Option<&str> {
        match self {
            Node::Token { text, .. } => Some(text),
            Node::Operation { .. } => None,
        }
    }

    pub fn child(&self, index: usize) -> Option<&Node> {
        self.children().get(index)
    }

    /// True for an operation with no children, such as an empty `(seq)`.
    pub fn is_empty_op(&self) -> bool {
        matches!(self, Node::Operation { children, .. } if children.is_empty())
    }

    /// Visits every node in pre-order.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Node)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    pub fn count_nodes(&self) -> usize {
        let mut count = 0;
        self.walk(&mut |_| count += 1);
        count
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Token { text, .. } => f.write_str(text),
            Node::Operation { tag, children, .. } => {
                write!(f, "({}", tag)?;
                for child in children {
                    write!(f, " {}", child)?;
                }
                f.write_str(")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Node {
        Node::op(
            "seq",
            vec![
                Node::op(
                    "set",
                    vec![Node::synthetic("x"), Node::synthetic("1")],
                    INVALID_SPAN,
                ),
                Node::synthetic("x"),
            ],
            SourceSpan::new(0, 0, 20),
        )
    }

    #[test]
    fn test_display_is_compact_sexpr() {
        assert_eq!(sample().to_string(), "(seq (set x 1) x)");
        assert_eq!(Node::op("seq", vec![], INVALID_SPAN).to_string(), "(seq)");
    }

    #[test]
    fn test_accessors() {
        let node = sample();
        assert_eq!(node.value(), "seq");
        assert!(node.is_op("seq"));
        assert!(!node.is_token());
        assert_eq!(node.children().len(), 2);
        assert_eq!(node.child(1).and_then(Node::as_token), Some("x"));
        assert!(node.child(1).unwrap().children().is_empty());
        assert_eq!(node.span(), SourceSpan::new(0, 0, 20));
        assert_eq!(node.count_nodes(), 5);
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_value(Node::synthetic("7")).unwrap();
        assert_eq!(json["kind"], "token");
        assert_eq!(json["text"], "7");
    }
}

use crate::config::{EmitterConfig, OutputStyle};
use crate::emitter::{EmitContext, EmitHelper, EmitResult, Emitter};
use quill_core::Node;
use std::io::Write;

/// Prints a tree back as s-expression text.
///
/// In pretty mode a form that fits in the remaining width stays on one line;
/// otherwise its tag opens the line and each child follows on its own,
/// indented one level, with the closing parenthesis after the last child.
pub struct SexprEmitter {
    config: EmitterConfig,
}

impl SexprEmitter {
    pub fn new(config: EmitterConfig) -> Self {
        Self { config }
    }

    pub fn compact() -> Self {
        Self::new(EmitterConfig::compact())
    }

    fn flat(&self, node: &Node, context: &EmitContext) -> String {
        if !context.use_colors {
            return node.to_string();
        }
        match node {
            Node::Token { text, .. } => text.clone(),
            Node::Operation { tag, children, .. } => {
                let mut out = format!("({}", EmitHelper::paint(context, tag, "bright_blue"));
                for child in children {
                    out.push(' ');
                    out.push_str(&self.flat(child, context));
                }
                out.push(')');
                out
            }
        }
    }

    fn emit_node<W: Write>(
        &self,
        node: &Node,
        writer: &mut W,
        context: &mut EmitContext,
    ) -> EmitResult {
        let fits = flat_width(node, context.remaining_width()).is_some();
        match node {
            Node::Operation { tag, children, .. }
                if !fits && self.config.style == OutputStyle::Pretty =>
            {
                let tag = EmitHelper::paint(context, tag, "bright_blue");
                write!(writer, "{}({}", context.get_indent(), tag)?;
                context.indent();
                for child in children {
                    writeln!(writer)?;
                    self.emit_node(child, writer, context)?;
                }
                context.dedent();
                write!(writer, ")")?;
            }
            _ => write!(writer, "{}{}", context.get_indent(), self.flat(node, context))?,
        }
        Ok(())
    }
}

/// Length of `node` printed on one line, or `None` as soon as it exceeds
/// `limit`. Stops early so wide trees are not measured in full at every level.
fn flat_width(node: &Node, limit: usize) -> Option<usize> {
    match node {
        Node::Token { text, .. } => (text.len() <= limit).then_some(text.len()),
        Node::Operation { tag, children, .. } => {
            let mut width = tag.len() + 1;
            for child in children {
                let room = limit.checked_sub(width + 1)?;
                width += 1 + flat_width(child, room)?;
            }
            width += 1;
            (width <= limit).then_some(width)
        }
    }
}

impl Default for SexprEmitter {
    fn default() -> Self {
        Self::new(EmitterConfig::default())
    }
}

impl Emitter for SexprEmitter {
    type Item = Node;

    fn config(&self) -> &EmitterConfig {
        &self.config
    }

    fn emit<W: Write>(&self, item: &Node, writer: &mut W, context: &mut EmitContext) -> EmitResult {
        self.emit_node(item, writer, context)?;
        writeln!(writer)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::INVALID_SPAN;

    fn sample() -> Node {
        let tok = |text: &str| Node::synthetic(text);
        Node::op(
            "seq",
            vec![
                Node::op("set", vec![tok("x"), tok("1")], INVALID_SPAN),
                Node::op("return", vec![tok("x")], INVALID_SPAN),
            ],
            INVALID_SPAN,
        )
    }

    #[test]
    fn test_compact_ignores_width() {
        let emitter = SexprEmitter::new(EmitterConfig::compact().with_max_line_width(4));
        assert_eq!(
            emitter.emit_to_string(&sample()).unwrap(),
            "(seq (set x 1) (return x))\n"
        );
    }

    #[test]
    fn test_pretty_breaks_only_what_does_not_fit() {
        let emitter = SexprEmitter::new(EmitterConfig::default().with_max_line_width(20));
        assert_eq!(
            emitter.emit_to_string(&sample()).unwrap(),
            "(seq\n    (set x 1)\n    (return x))\n"
        );
    }

    #[test]
    fn test_flat_width_matches_display() {
        let node = sample();
        let full = node.to_string().len();
        assert_eq!(flat_width(&node, full), Some(full));
        assert_eq!(flat_width(&node, full - 1), None);
        assert_eq!(flat_width(&Node::op("seq", vec![], INVALID_SPAN), 5), Some(5));
    }

    #[test]
    fn test_deep_tree_breaks_at_every_level() {
        let mut node = Node::synthetic("x");
        for depth in 0..200 {
            node = Node::op("f", vec![node, Node::synthetic(depth.to_string())], INVALID_SPAN);
        }
        let emitter = SexprEmitter::new(EmitterConfig::default().with_max_line_width(40));
        let text = emitter.emit_to_string(&node).unwrap();
        assert!(text.starts_with("(f\n"));
        assert!(text.lines().all(|line| line.trim_start().len() <= 40));
    }

    #[test]
    fn test_colors_do_not_change_layout() {
        colored::control::set_override(true);
        let emitter = SexprEmitter::new(EmitterConfig::default().with_colors(true));
        let text = emitter.emit_to_string(&sample()).unwrap();
        colored::control::unset_override();
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("\u{1b}["));
    }
}

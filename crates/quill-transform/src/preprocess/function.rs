//! Lowers `(def (name params...) body)` into a selector-guarded block.
//!
//! Calldata layout expected by the lowered code:
//!
//! ```text
//! [0]                     dispatch index (one byte)
//! [1 .. 1+32n]            n header words: lengths of the variable-length
//!                         arguments, then the fixed-width arguments
//! [1+32n ..]              variable-length payloads, back to back
//! ```

use super::access::split_tagged;
use super::config::PreprocessConfig;
use super::errors::{PreprocessError, Result};
use quill_core::subst::bindings;
use quill_core::{substitute, NameGenerator, Node, SourceSpan};
use tracing::debug;

const WORD_SIZE: usize = 32;

/// Calldata offset of the first header word; byte 0 holds the selector.
const HEADER_START: usize = 1;

const PAYLOAD_FRAME: &str = "(with $offset $start $copies)";

const PAYLOAD_COPY: &str = "(seq
    (set $var (alloc $len))
    (calldatacopy $var $offset $len)
    (set $offset (add $offset $len)))";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LongKind {
    /// `s`: a byte string.
    Bytes,
    /// `a`: an array of words.
    Array,
}

impl LongKind {
    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "s" => Some(LongKind::Bytes),
            "a" => Some(LongKind::Array),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    /// One 32-byte word copied straight from the header.
    Scalar(String),
    /// Length in the header, payload after it.
    Long { name: String, kind: LongKind },
}

impl Param {
    pub fn name(&self) -> &str {
        match self {
            Param::Scalar(name) | Param::Long { name, .. } => name,
        }
    }

    pub fn is_long(&self) -> bool {
        matches!(self, Param::Long { .. })
    }
}

/// Name and parameters of a `def`, with the shape already validated.
#[derive(Debug, Clone)]
pub struct FunctionHeader<'a> {
    pub name: String,
    pub params: Vec<Param>,
    pub body: &'a Node,
    pub span: SourceSpan,
}

impl<'a> FunctionHeader<'a> {
    pub fn parse(def: &'a Node) -> Result<Self> {
        let span = def.span();
        let [signature, body] = def.children() else {
            return Err(PreprocessError::malformed(
                format!("def takes a signature and a body, found {} children", def.children().len()),
                span,
            ));
        };

        let params = signature
            .children()
            .iter()
            .map(parse_param)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            name: signature.value().to_string(),
            params,
            body,
            span,
        })
    }
}

fn parse_param(node: &Node) -> Result<Param> {
    match split_tagged(node)? {
        None => Ok(Param::Scalar(node.value().to_string())),
        Some(tagged) => match LongKind::from_tag(&tagged.tag) {
            Some(kind) => Ok(Param::Long {
                name: tagged.name,
                kind,
            }),
            None => Err(PreprocessError::InvalidParameterTag {
                tag: tagged.tag,
                span: node.span(),
            }),
        },
    }
}

pub struct FunctionLowering<'c> {
    config: &'c PreprocessConfig,
}

impl<'c> FunctionLowering<'c> {
    pub fn new(config: &'c PreprocessConfig) -> Self {
        Self { config }
    }

    /// Produces `(if (eq (get <selector>) <index>) (seq (comment "FUNCTION <name>") ...))`.
    pub fn lower(
        &self,
        header: &FunctionHeader<'_>,
        index: usize,
        names: &mut NameGenerator,
    ) -> Result<Node> {
        let span = header.span;
        let prefix = names.fresh_prefix();
        let tok = |text: String| Node::token(text, span);

        let (long, scalar): (Vec<&Param>, Vec<&Param>) =
            header.params.iter().partition(|p| p.is_long());

        let locals: Vec<Node> = long
            .iter()
            .map(|p| tok(self.config.length_local(p.name())))
            .chain(scalar.iter().map(|p| tok(p.name().to_string())))
            .collect();

        let mut block = vec![Node::op(
            "comment",
            vec![tok(format!("\"FUNCTION {}\"", header.name))],
            span,
        )];
        if let Some(first) = locals.first() {
            let header_bytes = locals.len() * WORD_SIZE;
            block.push(Node::op("declare", locals.clone(), span));
            block.push(Node::op(
                "calldatacopy",
                vec![
                    Node::op("ref", vec![first.clone()], span),
                    tok(HEADER_START.to_string()),
                    tok(header_bytes.to_string()),
                ],
                span,
            ));
            if !long.is_empty() {
                let payload_start = HEADER_START + header_bytes;
                block.push(self.copy_payloads(&long, payload_start, &prefix, span)?);
            }
        }
        block.push(header.body.clone());

        debug!(
            target: "quill::preprocess",
            function = %header.name,
            index,
            prefix = %prefix,
            header_words = locals.len(),
            payloads = long.len(),
            "lowered function"
        );

        let guard = Node::op(
            "eq",
            vec![
                Node::op("get", vec![tok(self.config.selector_var.clone())], span),
                tok(index.to_string()),
            ],
            span,
        );
        Ok(Node::op(
            "if",
            vec![guard, Node::op("seq", block, span)],
            span,
        ))
    }

    /// Copies each payload into freshly allocated memory, advancing a running
    /// calldata offset so payload `k` starts where payload `k-1` ended.
    fn copy_payloads(
        &self,
        long: &[&Param],
        start: usize,
        prefix: &str,
        span: SourceSpan,
    ) -> Result<Node> {
        let copy = quill_parser::parse_node(PAYLOAD_COPY)?;
        let frame = quill_parser::parse_node(PAYLOAD_FRAME)?;

        let copies = long
            .iter()
            .map(|param| {
                let binds = bindings([
                    ("var", Node::token(param.name(), span)),
                    ("len", Node::token(self.config.length_local(param.name()), span)),
                ]);
                substitute(&copy, &binds, prefix, span)
            })
            .collect();

        let binds = bindings([
            ("start", Node::token(start.to_string(), span)),
            ("copies", Node::op("seq", copies, span)),
        ]);
        Ok(substitute(&frame, &binds, prefix, span))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quill_parser::parse_node;

    fn lower(src: &str, index: usize) -> Result<String> {
        let def = parse_node(src).unwrap();
        let header = FunctionHeader::parse(&def)?;
        let config = PreprocessConfig::default();
        let mut names = NameGenerator::new();
        FunctionLowering::new(&config)
            .lower(&header, index, &mut names)
            .map(|n| n.to_string())
    }

    #[test]
    fn test_no_parameters() {
        assert_eq!(
            lower("(def (ping) (return 1))", 0).unwrap(),
            "(if (eq (get __funid) 0) (seq (comment \"FUNCTION ping\") (return 1)))"
        );
        assert_eq!(
            lower("(def ping (return 1))", 4).unwrap(),
            "(if (eq (get __funid) 4) (seq (comment \"FUNCTION ping\") (return 1)))"
        );
    }

    #[test]
    fn test_scalars_only() {
        assert_eq!(
            lower("(def (add x y) (return (add x y)))", 2).unwrap(),
            "(if (eq (get __funid) 2) (seq \
             (comment \"FUNCTION add\") \
             (declare x y) \
             (calldatacopy (ref x) 1 64) \
             (return (add x y))))"
        );
    }

    #[test]
    fn test_mixed_parameters_header_then_payloads() {
        let expected = "(if (eq (get __funid) 1) (seq \
            (comment \"FUNCTION f\") \
            (declare _len_b _len_c a) \
            (calldatacopy (ref _len_b) 1 96) \
            (with _temp0_offset 97 (seq \
            (seq (set b (alloc _len_b)) (calldatacopy b _temp0_offset _len_b) (set _temp0_offset (add _temp0_offset _len_b))) \
            (seq (set c (alloc _len_c)) (calldatacopy c _temp0_offset _len_c) (set _temp0_offset (add _temp0_offset _len_c))))) \
            (body)))";
        assert_eq!(lower("(def (f a (: b s) c:a) (body))", 1).unwrap(), expected);
    }

    #[test]
    fn test_each_lowering_gets_a_fresh_prefix() {
        let def = parse_node("(def (f s:s) (return s))").unwrap();
        let header = FunctionHeader::parse(&def).unwrap();
        let config = PreprocessConfig::default();
        let lowering = FunctionLowering::new(&config);
        let mut names = NameGenerator::new();

        let first = lowering.lower(&header, 0, &mut names).unwrap().to_string();
        let second = lowering.lower(&header, 1, &mut names).unwrap().to_string();
        assert!(first.contains("_temp0_offset") && !first.contains("_temp1_"));
        assert!(second.contains("_temp1_offset") && !second.contains("_temp0_"));
    }

    #[test]
    fn test_generated_nodes_carry_def_span() {
        let def = parse_node("(def (f x) (stop))").unwrap();
        let header = FunctionHeader::parse(&def).unwrap();
        let config = PreprocessConfig::default();
        let node = FunctionLowering::new(&config)
            .lower(&header, 0, &mut NameGenerator::new())
            .unwrap();
        assert_eq!(node.span(), def.span());
        assert_eq!(node.children()[0].span(), def.span());
    }

    #[test]
    fn test_invalid_tag() {
        let err = lower("(def (f (: x q)) (stop))", 0).unwrap_err();
        assert_eq!(
            err,
            PreprocessError::InvalidParameterTag {
                tag: "q".to_string(),
                span: err.span().unwrap(),
            }
        );
    }

    #[test]
    fn test_malformed_defs() {
        for src in ["(def (f x))", "(def (f x) (a) (b))", "(def (f (add 1 2)) (stop))"] {
            let err = lower(src, 0).unwrap_err();
            assert_eq!(err.kind(), "MalformedDeclaration", "{src}");
        }
    }

    #[test]
    fn test_header_records_kinds() {
        let def = parse_node("(def (f n (: data s) items:a) (stop))").unwrap();
        let header = FunctionHeader::parse(&def).unwrap();
        assert_eq!(
            header.params,
            vec![
                Param::Scalar("n".to_string()),
                Param::Long { name: "data".to_string(), kind: LongKind::Bytes },
                Param::Long { name: "items".to_string(), kind: LongKind::Array },
            ]
        );
    }
}

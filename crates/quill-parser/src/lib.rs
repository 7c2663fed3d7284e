/*! Read the generic tagged-tree AST from s-expression text.
 *
 * The preprocessor consumes trees, not text, but its own code templates, its tests and the CLI all
 * need a faithful way to write trees down. Every list `(head child ...)` becomes an operation tagged
 * with its head atom; atoms and string literals become tokens. Spans point back into the source.
 */

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use quill_core::{Node, SourceSpan};
use std::path::Path;
use thiserror::Error;

#[derive(Parser)]
#[grammar = "grammar.pest"]
pub struct SexprParser;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Syntax error: {0}")]
    Syntax(#[from] Box<pest::error::Error<Rule>>),
    #[error("No node in input")]
    EmptyInput,
    #[error("Empty list at {0}")]
    EmptyList(SourceSpan),
    #[error("List head must be an atom at {0}")]
    ListHead(SourceSpan),
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Parses exactly one node.
pub fn parse_node(input: &str) -> ParseResult<Node> {
    parse_node_in_file(input, 0)
}

pub fn parse_node_in_file(input: &str, file_id: u32) -> ParseResult<Node> {
    SexprParser::parse(Rule::single, input)
        .map_err(Box::new)?
        .flat_map(|single| single.into_inner())
        .find(|p| p.as_rule() != Rule::EOI)
        .ok_or(ParseError::EmptyInput)
        .and_then(|node| build(node, file_id))
}

/// Parses a sequence of top-level nodes.
pub fn parse_program(input: &str) -> ParseResult<Vec<Node>> {
    parse_in_file(input, 0)
}

pub fn parse_in_file(input: &str, file_id: u32) -> ParseResult<Vec<Node>> {
    SexprParser::parse(Rule::program, input)
        .map_err(Box::new)?
        .flat_map(|program| program.into_inner())
        .filter(|p| p.as_rule() != Rule::EOI)
        .map(|p| build(p, file_id))
        .collect()
}

/// Parses a whole file and wraps its top-level forms into one `(seq ...)`.
///
/// A file holding a single `seq` form is returned as-is.
pub fn parse_program_as_seq(input: &str, file_id: u32) -> ParseResult<Node> {
    let mut nodes = parse_in_file(input, file_id)?;
    if nodes.len() == 1 && nodes[0].is_op("seq") {
        return Ok(nodes.remove(0));
    }
    let span = SourceSpan::new(file_id, 0, input.len() as u32);
    Ok(Node::op("seq", nodes, span))
}

pub fn parse_file<P: AsRef<Path>>(path: P) -> ParseResult<Node> {
    let text = std::fs::read_to_string(path)?;
    parse_program_as_seq(&text, 0)
}

pub fn check(input: &str) -> bool {
    parse_program(input).is_ok()
}

fn span_of(pair: &Pair<'_, Rule>, file_id: u32) -> SourceSpan {
    let span = pair.as_span();
    SourceSpan::new(
        file_id,
        span.start() as u32,
        (span.end() - span.start()) as u32,
    )
}

fn build(pair: Pair<'_, Rule>, file_id: u32) -> ParseResult<Node> {
    let span = span_of(&pair, file_id);
    match pair.as_rule() {
        Rule::atom | Rule::string => Ok(Node::token(pair.as_str(), span)),
        Rule::list => {
            let mut items = pair.into_inner();
            let head = items.next().ok_or(ParseError::EmptyList(span))?;
            if head.as_rule() != Rule::atom {
                return Err(ParseError::ListHead(span_of(&head, file_id)));
            }
            let children = items
                .map(|p| build(p, file_id))
                .collect::<ParseResult<Vec<_>>>()?;
            Ok(Node::op(head.as_str(), children, span))
        }
        other => unreachable!("unexpected rule {:?}", other),
    }
}

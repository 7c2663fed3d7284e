/*! Core types shared by every stage of the Quill preprocessor.
 *
 * Later stages resolve storage addresses and pack call arguments from tables built here, so the
 * building blocks have to be exact: a generic tagged-tree AST with source spans, arbitrary-precision
 * decimals for offsets and strides, compile-time arithmetic, and hygienic template expansion driven
 * by an explicit unique-name generator.
 */

pub mod arith;
pub mod ast;
pub mod decimal;
pub mod names;
pub mod source_location;
pub mod subst;

pub use arith::{const_eval, is_pure_arithmetic};
pub use ast::Node;
pub use decimal::Decimal;
pub use names::NameGenerator;
pub use source_location::{SourceFiles, SourceSpan, INVALID_SPAN};
pub use subst::{substitute, Bindings};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid number literal: {0}")]
    InvalidNumber(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests;

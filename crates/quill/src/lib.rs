/*! Unified interface for the Quill preprocessor.
 *
 * One import for the whole front half: parse contract source into a tagged tree, lower it into the
 * dispatching program with its storage and extern tables, and print any of it back out.
 */

pub use quill_core as core;
pub use quill_emit as emit;
pub use quill_parser as parser;
pub use quill_transform as transform;

pub use quill_core::{Decimal, NameGenerator, Node, SourceFiles, SourceSpan};

pub use quill_emit::{EmitterConfig, ExternTableEmitter, SexprEmitter, StorageTableEmitter};

pub use quill_parser::{parse_program_as_seq, ParseError};

pub use quill_transform::{
    preprocess, preprocess_with_config, ExternTable, PreprocessConfig, PreprocessError,
    PreprocessResult, StorageVariableTable,
};

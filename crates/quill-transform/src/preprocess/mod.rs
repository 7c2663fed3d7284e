/*! Preprocess a parsed contract into one dispatching program plus side tables.
 *
 * The parser hands over a flat list of top-level declarations. This pass gives storage declarations
 * fixed offsets, turns each function into a block that runs only when the call selects it and first
 * unpacks its arguments from calldata, and stitches init, shared and per-call code into the program
 * shape the optimizer expects.
 */

mod access;
mod assembler;
mod config;
mod errors;
mod function;
mod storage;
mod tables;

pub use access::{decompose_access, split_tagged, StorageAccess, TaggedName};
pub use assembler::{ProgramAssembler, RESERVED_FUNCTIONS};
pub use config::PreprocessConfig;
pub use errors::{PreprocessError, Result};
pub use function::{FunctionHeader, FunctionLowering, LongKind, Param};
pub use storage::StorageLayoutPlanner;
pub use tables::{ExternTable, PreprocessResult, StorageVariable, StorageVariableTable, SELF_EXTERN};

use quill_core::Node;

/// Runs the pass with the default configuration and a fresh name generator.
pub fn preprocess(program: &Node) -> Result<PreprocessResult> {
    preprocess_with_config(program, PreprocessConfig::default())
}

pub fn preprocess_with_config(program: &Node, config: PreprocessConfig) -> Result<PreprocessResult> {
    ProgramAssembler::new(config).assemble(program)
}

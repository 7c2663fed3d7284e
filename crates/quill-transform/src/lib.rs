/*! Lower a parsed contract into the dispatching program form.
 *
 * Source-level contracts declare storage, interfaces and functions side by side. Later stages want a
 * single linear program plus lookup tables for addresses and call signatures; this crate produces
 * exactly that, failing fast with a located error on the first malformed declaration.
 */

pub mod preprocess;

pub use preprocess::{
    preprocess, preprocess_with_config, ExternTable, PreprocessConfig, PreprocessError,
    PreprocessResult, ProgramAssembler, StorageVariable, StorageVariableTable,
};

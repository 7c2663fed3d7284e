/*! Turn preprocessed programs and their tables back into text.
 *
 * The assembled program is what the optimizer sees and the tables are what address resolution and
 * call packing read, so both need a readable form for debugging a lowering and a stable form for
 * tooling. These emitters print trees as s-expressions and tables as text or JSON.
 */

pub mod config;
pub mod emitter;
pub mod sexpr_emitter;
pub mod table_emitter;

pub use config::{EmitterConfig, IndentStyle, OutputStyle};
pub use emitter::{EmitContext, EmitHelper, EmitResult, Emitter};
pub use sexpr_emitter::SexprEmitter;
pub use table_emitter::{result_to_json, tables_to_json, ExternTableEmitter, StorageTableEmitter};

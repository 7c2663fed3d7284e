use crate::config::EmitterConfig;
use crate::emitter::{EmitContext, EmitHelper, EmitResult, Emitter};
use anyhow::Result;
use quill_transform::{ExternTable, PreprocessResult, StorageVariableTable};
use std::io::Write;

/// Shown for members declared without a signature.
const UNBOUNDED_SIGNATURE: &str = "i...";

fn signature_label(signature: &str) -> &str {
    if signature.is_empty() {
        UNBOUNDED_SIGNATURE
    } else {
        signature
    }
}

fn join<T: ToString>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// One line per storage path, fields indented under their tuple.
pub struct StorageTableEmitter {
    config: EmitterConfig,
}

impl StorageTableEmitter {
    pub fn new(config: EmitterConfig) -> Self {
        Self { config }
    }
}

impl Emitter for StorageTableEmitter {
    type Item = StorageVariableTable;

    fn config(&self) -> &EmitterConfig {
        &self.config
    }

    fn emit<W: Write>(
        &self,
        table: &StorageVariableTable,
        writer: &mut W,
        context: &mut EmitContext,
    ) -> EmitResult {
        EmitHelper::write_section(writer, context, "storage")?;
        for (path, variable) in table.iter() {
            let mut line_ctx = context.clone();
            line_ctx.indent_level += path.matches('.').count();
            let name = EmitHelper::paint(&line_ctx, path, "yellow");
            let group = if variable.non_final { " group" } else { "" };
            EmitHelper::write_line(
                writer,
                &line_ctx,
                &format!(
                    "{} offset={} coefficients=[{}] index={}{}",
                    name,
                    variable.offset,
                    join(&variable.coefficients),
                    variable.index,
                    group
                ),
            )?;
        }
        EmitHelper::write_line(
            writer,
            context,
            &format!("next free offset: {}", table.global_offset()),
        )
    }
}

pub struct ExternTableEmitter {
    config: EmitterConfig,
}

impl ExternTableEmitter {
    pub fn new(config: EmitterConfig) -> Self {
        Self { config }
    }
}

impl Emitter for ExternTableEmitter {
    type Item = ExternTable;

    fn config(&self) -> &EmitterConfig {
        &self.config
    }

    fn emit<W: Write>(
        &self,
        table: &ExternTable,
        writer: &mut W,
        context: &mut EmitContext,
    ) -> EmitResult {
        EmitHelper::write_section(writer, context, "externs")?;
        for (extern_name, members) in &table.local_externs {
            let heading = EmitHelper::paint(context, extern_name, "green");
            EmitHelper::write_line(writer, context, &heading)?;
            let member_ctx = context.nested();
            for (member, index) in members {
                let line = match table.signature(extern_name, member) {
                    Some(sig) => format!("{} = {} ({})", member, index, signature_label(sig)),
                    None => format!("{} = {}", member, index),
                };
                EmitHelper::write_line(writer, &member_ctx, &line)?;
            }
        }

        EmitHelper::write_section(writer, context, "global")?;
        for (member, index) in &table.global_externs {
            let sig = table.global_signature(member).unwrap_or_default();
            EmitHelper::write_line(
                writer,
                context,
                &format!("{} = {} ({})", member, index, signature_label(sig)),
            )?;
        }
        Ok(())
    }
}

/// Both side tables as pretty-printed JSON.
pub fn tables_to_json(result: &PreprocessResult) -> Result<String> {
    let tables = serde_json::json!({
        "storage": result.storage,
        "externs": result.externs,
    });
    Ok(serde_json::to_string_pretty(&tables)?)
}

/// The whole result, program included, as JSON.
pub fn result_to_json(result: &PreprocessResult) -> Result<String> {
    Ok(serde_json::to_string_pretty(result)?)
}

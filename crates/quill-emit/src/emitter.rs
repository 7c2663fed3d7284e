use crate::config::EmitterConfig;
use anyhow::Result;
use std::io::Write;

pub type EmitResult = Result<()>;

#[derive(Debug, Clone)]
pub struct EmitContext {
    pub indent_level: usize,
    pub indent_chars: String,
    pub use_colors: bool,
    pub max_width: usize,
}

impl EmitContext {
    pub fn new() -> Self {
        Self::from_config(&EmitterConfig::default())
    }

    pub fn from_config(config: &EmitterConfig) -> Self {
        Self {
            indent_level: 0,
            indent_chars: config.indent_style.unit(),
            use_colors: config.use_colors,
            max_width: config.max_line_width,
        }
    }

    pub fn indent(&mut self) {
        self.indent_level += 1;
    }

    pub fn dedent(&mut self) {
        self.indent_level = self.indent_level.saturating_sub(1);
    }

    pub fn get_indent(&self) -> String {
        self.indent_chars.repeat(self.indent_level)
    }

    /// Columns left on the current line after indentation.
    pub fn remaining_width(&self) -> usize {
        self.max_width
            .saturating_sub(self.indent_chars.len() * self.indent_level)
    }

    pub fn nested(&self) -> Self {
        let mut ctx = self.clone();
        ctx.indent();
        ctx
    }
}

impl Default for EmitContext {
    fn default() -> Self {
        Self::new()
    }
}

pub trait Emitter {
    type Item: ?Sized;

    fn config(&self) -> &EmitterConfig;

    fn emit<W: Write>(
        &self,
        item: &Self::Item,
        writer: &mut W,
        context: &mut EmitContext,
    ) -> EmitResult;

    fn emit_to_string(&self, item: &Self::Item) -> Result<String> {
        let mut buffer = Vec::new();
        let mut context = EmitContext::from_config(self.config());
        self.emit(item, &mut buffer, &mut context)?;
        Ok(String::from_utf8(buffer)?)
    }
}

pub struct EmitHelper;

impl EmitHelper {
    pub fn write_line<W: Write>(writer: &mut W, context: &EmitContext, text: &str) -> EmitResult {
        writeln!(writer, "{}{}", context.get_indent(), text)?;
        Ok(())
    }

    pub fn paint(context: &EmitContext, text: &str, color: &str) -> String {
        if !context.use_colors {
            return text.to_string();
        }
        use colored::Colorize;
        match color {
            "blue" => text.blue().to_string(),
            "green" => text.green().to_string(),
            "yellow" => text.yellow().to_string(),
            "cyan" => text.cyan().to_string(),
            "magenta" => text.magenta().to_string(),
            "bright_blue" => text.bright_blue().to_string(),
            _ => text.to_string(),
        }
    }

    pub fn write_section<W: Write>(
        writer: &mut W,
        context: &EmitContext,
        title: &str,
    ) -> EmitResult {
        let heading = Self::paint(context, &format!("=== {} ===", title), "cyan");
        Self::write_line(writer, context, &heading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndentStyle;

    #[test]
    fn test_context_indentation() {
        let mut ctx = EmitContext::new();
        assert_eq!(ctx.get_indent(), "");

        ctx.indent();
        ctx.indent();
        assert_eq!(ctx.get_indent(), "        ");
        assert_eq!(ctx.remaining_width(), 72);

        ctx.dedent();
        ctx.dedent();
        ctx.dedent();
        assert_eq!(ctx.indent_level, 0);
        assert_eq!(ctx.nested().indent_level, 1);
    }

    #[test]
    fn test_tab_indent_from_config() {
        let config = EmitterConfig {
            indent_style: IndentStyle::Tabs,
            ..EmitterConfig::default()
        };
        let ctx = EmitContext::from_config(&config).nested();
        assert_eq!(ctx.get_indent(), "\t");
    }

    #[test]
    fn test_paint_without_colors_is_identity() {
        let ctx = EmitContext::new();
        assert_eq!(EmitHelper::paint(&ctx, "seq", "blue"), "seq");
    }
}

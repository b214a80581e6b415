use std::fmt::Write;

use super::Formatter;
use crate::schema::Schema;

/// Plain listing of each definition's direct dependencies.
///
/// ```text
/// Table Dependencies:
///
/// orders has no dependencies.
/// totals depends on: orders, customers
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format(&self, schema: &Schema) -> String {
        let mut output = String::from("Table Dependencies:\n\n");
        for definition in schema.definitions() {
            let dependencies = definition.depends_on();
            if dependencies.is_empty() {
                let _ = writeln!(output, "{} has no dependencies.", definition.name());
            } else {
                let names: Vec<&str> = dependencies.iter().map(|d| d.name()).collect();
                let _ = writeln!(output, "{} depends on: {}", definition.name(), names.join(", "));
            }
        }
        output
    }
}

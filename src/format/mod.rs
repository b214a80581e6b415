//! Read-only renderings of a [`Schema`].

mod mermaid;
mod text;

pub use mermaid::MermaidFormatter;
pub use text::TextFormatter;

use crate::schema::Schema;

/// Renders a schema as a string.
pub trait Formatter {
    fn format(&self, schema: &Schema) -> String;
}

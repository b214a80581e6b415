use std::fmt::Write;

use super::Formatter;
use crate::schema::Schema;

const CONFIG: &str = "\
---
config:
  layout: elk
  elk:
    mergeEdges: true
    nodePlacementStrategy: LINEAR_SEGMENTS
  theme: dark
---
";

/// Mermaid flowchart with one subgraph per dependency level.
#[derive(Debug, Clone, Copy, Default)]
pub struct MermaidFormatter;

impl Formatter for MermaidFormatter {
    fn format(&self, schema: &Schema) -> String {
        let graph = schema.graph();
        let name = |v| graph.payload(v).map(|n| sanitize(n)).unwrap_or_default();

        let mut output = format!("{}\ngraph LR\n", CONFIG);
        for (level, vertices) in graph.topological_levels() {
            let _ = writeln!(output, "  subgraph Level{}", level);
            for vertex in vertices {
                let node = name(vertex);
                let _ = writeln!(output, "    {}[{}]", node, node);
            }
            output.push_str("  end\n");
        }
        for (from, to) in graph.edges() {
            let _ = writeln!(output, "  {} --> {}", name(from), name(to));
        }
        output
    }
}

/// Replace every character outside `[A-Za-z0-9_]` with `_`.
pub(crate) fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

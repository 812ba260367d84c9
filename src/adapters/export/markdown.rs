//! Markdown dictionary exporter: one table per non-empty category.

use std::fmt::Write;

use crate::adapters::export::{entries, DictionaryEntry};
use crate::domain::error::FinmetricsError;
use crate::domain::metric::Category;
use crate::domain::registry::MetricRegistry;
use crate::ports::export_port::ExportPort;

pub struct MarkdownExporter;

fn escape(cell: &str) -> String {
    cell.replace('|', "\\|")
}

fn render_table(out: &mut String, rows: &[&DictionaryEntry]) {
    out.push_str("| Metric | Description | Formula | Inputs |\n");
    out.push_str("|--------|-------------|---------|--------|\n");
    for entry in rows {
        // writing to a String cannot fail
        let _ = writeln!(
            out,
            "| `{}` | {} | `{}` | {} |",
            escape(&entry.name),
            escape(&entry.description),
            escape(&entry.formula),
            escape(&entry.inputs.join(", ")),
        );
    }
}

impl ExportPort for MarkdownExporter {
    fn render(&self, registry: &MetricRegistry) -> Result<String, FinmetricsError> {
        let all = entries(registry);
        let mut out = String::from("# Financial Metrics Dictionary\n");

        for category in Category::ALL {
            let rows: Vec<&DictionaryEntry> = all.iter().filter(|e| e.category == category).collect();
            if rows.is_empty() {
                continue;
            }
            let _ = write!(out, "\n## {}\n\n", category.title());
            render_table(&mut out, &rows);
        }
        Ok(out)
    }
}

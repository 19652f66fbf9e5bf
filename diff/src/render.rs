use crate::compare::{Change, Difference};
use crate::document::Document;
use crate::engine::DiffResult;
use serde::Serialize;
use serde_json::Value;

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const RESET: &str = "\x1b[0m";

const INDENT: &str = "    ";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Include the full YAML of every listed document.
    pub show_content: bool,
    /// Wrap lines in ANSI color codes.
    pub color: bool,
}

/// Counts and sorted identity lists for a comment template. Worded for a
/// "plan" style comment, unlike the terminal [DiffResult::summary].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateSummary {
    pub summary: String,
    pub has_changes: bool,
    pub added: usize,
    pub deleted: usize,
    pub modified: usize,
    pub added_list: Vec<String>,
    pub deleted_list: Vec<String>,
    pub modified_list: Vec<String>,
}

impl DiffResult {
    /// `"<A> added, <D> deleted, <M> modified"`
    pub fn summary(&self) -> String {
        let counts = self.counts();
        format!(
            "{} added, {} deleted, {} modified",
            counts.added, counts.deleted, counts.modified
        )
    }

    /// Per-resource listing, identities in lexicographic order, followed by
    /// the summary line. Output is identical for equal results.
    pub fn text(&self, options: &RenderOptions) -> String {
        if !self.has_differences() {
            return String::from("No differences found\n");
        }

        let mut output = String::new();

        if !self.added.is_empty() {
            output.push_str(&format!("Added ({}):\n", self.added.len()));
            for (identity, doc) in &self.added {
                push_line(&mut output, &format!("+ {}", identity), GREEN, options);
                if options.show_content {
                    push_document(&mut output, doc, GREEN, options);
                }
            }
        }

        if !self.deleted.is_empty() {
            output.push_str(&format!("Deleted ({}):\n", self.deleted.len()));
            for (identity, doc) in &self.deleted {
                push_line(&mut output, &format!("- {}", identity), RED, options);
                if options.show_content {
                    push_document(&mut output, doc, RED, options);
                }
            }
        }

        if !self.modified.is_empty() {
            output.push_str(&format!("Modified ({}):\n", self.modified.len()));
            for (identity, modification) in &self.modified {
                push_line(&mut output, &format!("~ {}", identity), YELLOW, options);
                for difference in &modification.differences {
                    let line = format!("{}{}", INDENT, format_difference(difference));
                    push_line(&mut output, &line, difference_color(difference), options);
                }
                if options.show_content {
                    push_line(&mut output, &format!("{}--- old", INDENT), RED, options);
                    push_document(&mut output, &modification.old, RED, options);
                    push_line(&mut output, &format!("{}+++ new", INDENT), GREEN, options);
                    push_document(&mut output, &modification.new, GREEN, options);
                }
            }
        }

        output.push('\n');
        output.push_str(&self.summary());
        output.push('\n');
        output
    }

    /// Writes [DiffResult::text] to stdout.
    pub fn print(&self, options: &RenderOptions) {
        print!("{}", self.text(options));
    }

    pub fn template_summary(&self) -> TemplateSummary {
        let counts = self.counts();
        TemplateSummary {
            summary: format!(
                "Plan: {} to add, {} to delete, {} to modify",
                counts.added, counts.deleted, counts.modified
            ),
            has_changes: self.has_differences(),
            added: counts.added,
            deleted: counts.deleted,
            modified: counts.modified,
            added_list: self.added.keys().cloned().collect(),
            deleted_list: self.deleted.keys().cloned().collect(),
            modified_list: self.modified.keys().cloned().collect(),
        }
    }
}

/// One line per difference: `~ spec.replicas: 1 -> 3`, `+ path: value`,
/// `- path: value`, `~ list: length 3 -> 2`.
pub fn format_difference(difference: &Difference) -> String {
    let path = &difference.path;
    match &difference.change {
        Change::ValueChanged { old, new } => {
            format!("~ {}: {} -> {}", path, format_value(old), format_value(new))
        }
        Change::KeyAdded { value } => format!("+ {}: {}", path, format_value(value)),
        Change::KeyRemoved { value } => format!("- {}: {}", path, format_value(value)),
        Change::ArrayLengthChanged { old_len, new_len } => {
            format!("~ {}: length {} -> {}", path, old_len, new_len)
        }
    }
}

/// Compact JSON so that `1` and `"1"` stay distinguishable.
fn format_value(value: &Value) -> String {
    value.to_string()
}

fn difference_color(difference: &Difference) -> &'static str {
    match difference.change {
        Change::KeyAdded { .. } => GREEN,
        Change::KeyRemoved { .. } => RED,
        Change::ValueChanged { .. } | Change::ArrayLengthChanged { .. } => YELLOW,
    }
}

fn push_line(output: &mut String, line: &str, color: &str, options: &RenderOptions) {
    if options.color {
        output.push_str(&format!("{}{}{}\n", color, line, RESET));
    } else {
        output.push_str(line);
        output.push('\n');
    }
}

fn push_document(output: &mut String, doc: &Document, color: &str, options: &RenderOptions) {
    if let Some(source_file) = &doc.source_file {
        push_line(output, &format!("{}# {}", INDENT, source_file), color, options);
    }
    for line in doc.raw.lines() {
        push_line(output, &format!("{}{}", INDENT, line), color, options);
    }
}

//! Emit constructed nodes in the layout KiCad 8 uses when saving a board.

use super::{Sexpr, SexprKind};

/// Format a coordinate the way KiCad does: fixed precision, no trailing zeros.
pub fn format_number(n: f64) -> String {
    // KiCad board units are nanometres; six decimals of millimetres is exact.
    let mut text = format!("{n:.6}");
    if text.contains('.') {
        let trimmed = text.trim_end_matches('0').trim_end_matches('.').len();
        text.truncate(trimmed);
    }
    if text == "-0" {
        text = "0".to_string();
    }
    text
}

/// Quote and escape a string value.
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

/// Append `node` to `out`, assuming the cursor already sits at `depth` tabs.
///
/// Lists holding only atoms stay on one line; any other list puts its leading
/// atoms on the opening line and each nested list on its own line.
pub fn write_node(node: &Sexpr, depth: usize, out: &mut String) {
    write_indented(node, &"\t".repeat(depth), "\t", out);
}

/// Like [`write_node`], but the current line is indented with `indent` and
/// every nesting level adds `unit` (a tab, or spaces on older boards).
fn write_indented(node: &Sexpr, indent: &str, unit: &str, out: &mut String) {
    match &node.kind {
        SexprKind::Symbol(s) => out.push_str(s),
        SexprKind::Str(s) => out.push_str(&quote(s)),
        SexprKind::Number(n) => out.push_str(&format_number(*n)),
        SexprKind::List(items) => {
            out.push('(');
            let nested = items.iter().any(|item| item.as_list().is_some());
            if !nested {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(' ');
                    }
                    write_indented(item, indent, unit, out);
                }
                out.push(')');
                return;
            }

            let inner = format!("{indent}{unit}");
            let mut first = true;
            for item in items {
                if item.as_list().is_some() {
                    out.push('\n');
                    out.push_str(&inner);
                    write_indented(item, &inner, unit, out);
                } else {
                    if !first {
                        out.push(' ');
                    }
                    write_indented(item, indent, unit, out);
                }
                first = false;
            }
            out.push('\n');
            out.push_str(indent);
            out.push(')');
        }
    }
}

impl std::fmt::Display for Sexpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut out = String::new();
        write_node(self, 0, &mut out);
        f.write_str(&out)
    }
}

/// Render `node` for a line indented with `indent`, nesting by `unit`.
pub(crate) fn render(node: &Sexpr, indent: &str, unit: &str) -> String {
    let mut out = String::new();
    write_indented(node, indent, unit, &mut out);
    out
}

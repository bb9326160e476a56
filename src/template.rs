//! Template substitution and sanitization (spec.md §4.E).
//!
//! Two placeholder forms are recognized in node `content`:
//! `${N}` — 1-indexed, connection-ordered upstream output — and `${name}` —
//! a named loop variable, accumulator, or variable lookup.

use regex::Regex;
use std::sync::OnceLock;

use crate::context::ExecutionContext;

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([A-Za-z0-9_]+)\}").unwrap())
}

/// Substitute every `${...}` placeholder in `content` using `ctx`.
///
/// `${N}` resolves against `parent_outputs(node_id)` (1-indexed); anything
/// else is looked up by name via [`ExecutionContext::resolve_named`]. An
/// unresolved placeholder is replaced with an empty string.
pub fn substitute(content: &str, node_id: &str, ctx: &ExecutionContext) -> String {
    substitute_with(content, node_id, ctx, |s| s.to_string())
}

/// Like [`substitute`], but `sanitize` is applied to each resolved
/// replacement value before insertion — never to the author-written template
/// text itself. CLI and LLM nodes are the only two points where substituted
/// values cross into an external interpreter, so they're the only callers
/// that pass a non-identity sanitizer (spec.md §4.E).
pub fn substitute_with(
    content: &str,
    node_id: &str,
    ctx: &ExecutionContext,
    sanitize: impl Fn(&str) -> String,
) -> String {
    let parents = ctx.parent_outputs(node_id);
    let re = placeholder_re();

    re.replace_all(content, |caps: &regex::Captures| {
        let key = &caps[1];
        let resolved = if let Ok(index) = key.parse::<usize>() {
            if index >= 1 {
                parents.get(index - 1).cloned().unwrap_or_default()
            } else {
                String::new()
            }
        } else {
            ctx.resolve_named(key).unwrap_or_default()
        };
        sanitize(&resolved)
    })
    .into_owned()
}

/// Substitute only the named (non-numeric) `${...}` placeholders in
/// `content`, leaving `${N}`-shaped text untouched. Used by nodes whose
/// `content` is the joined output of their parents rather than an authored
/// template, where a coincidental `${1}`-looking substring in that joined
/// text shouldn't be reinterpreted as a positional reference.
pub fn substitute_named(content: &str, ctx: &ExecutionContext) -> String {
    let re = placeholder_re();
    re.replace_all(content, |caps: &regex::Captures| {
        let key = &caps[1];
        if key.chars().all(|c| c.is_ascii_digit()) {
            caps[0].to_string()
        } else {
            ctx.resolve_named(key).unwrap_or_default()
        }
    })
    .into_owned()
}

/// Join `node_id`'s parent outputs with `\n`, substitute named variables, and
/// trim — the shared "echo" behavior of `PREVIEW` and `LOOP_END` (spec.md
/// §4.F.3, §4.F.8).
pub fn join_and_substitute_named(node_id: &str, ctx: &ExecutionContext) -> String {
    let joined = ctx.parent_outputs(node_id).join("\n");
    substitute_named(&joined, ctx).trim().to_string()
}

/// Escape a string for safe interpolation into a shell command: backslash,
/// `${`, double quote, single quote, and semicolon are escaped. Newlines are
/// left untouched — CLI content legitimately spans multiple lines.
pub fn sanitize_for_shell(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            '$' if chars.peek() == Some(&'{') => {
                out.push_str("\\$");
            }
            '"' => out.push_str("\\\""),
            '\'' => out.push_str("\\'"),
            ';' => out.push_str("\\;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape a string before it's interpolated into an LLM prompt: only `${` is
/// escaped, so a value containing its own placeholder-looking text doesn't
/// get re-substituted by a downstream template pass.
pub fn sanitize_for_prompt(input: &str) -> String {
    input.replace("${", "\\${")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Edge;

    fn ctx_with_parents(edges: &[Edge]) -> ExecutionContext {
        ExecutionContext::new(edges)
    }

    #[test]
    fn indexed_placeholder_resolves_connection_order() {
        let edges = vec![Edge::new("e2", "b", "m"), Edge::new("e1", "a", "m")];
        let mut ctx = ctx_with_parents(&edges);
        ctx.set_output("a", crate::context::NodeOutput::Single("A-out".to_string()));
        ctx.set_output("b", crate::context::NodeOutput::Single("B-out".to_string()));
        let result = substitute("first=${1} second=${2}", "m", &ctx);
        assert_eq!(result, "first=B-out second=A-out");
    }

    #[test]
    fn unresolved_index_becomes_empty_string() {
        let edges = vec![];
        let ctx = ctx_with_parents(&edges);
        let result = substitute("value=${1}", "m", &ctx);
        assert_eq!(result, "value=");
    }

    #[test]
    fn named_placeholder_resolves_variable() {
        let edges = vec![];
        let mut ctx = ctx_with_parents(&edges);
        ctx.set_variable("topic", "rust");
        let result = substitute("about ${topic}", "m", &ctx);
        assert_eq!(result, "about rust");
    }

    #[test]
    fn variable_overrides_accumulator_and_loop() {
        let edges = vec![];
        let mut ctx = ctx_with_parents(&edges);
        ctx.loop_state_mut("ls").variable_name = Some("x".to_string());
        ctx.loop_state_mut("ls").variable_value = Some("loop-val".to_string());
        ctx.set_accumulator("x", "acc-val");
        ctx.set_variable("x", "var-val");
        let result = substitute("${x}", "m", &ctx);
        assert_eq!(result, "var-val");
    }

    #[test]
    fn placeholder_followed_by_word_chars_still_resolves() {
        let edges = vec![];
        let mut ctx = ctx_with_parents(&edges);
        ctx.set_variable("abc", "X");
        let result = substitute("${abc}def", "m", &ctx);
        assert_eq!(result, "Xdef");
    }

    #[test]
    fn substitute_with_sanitizes_only_resolved_values() {
        let edges = vec![Edge::new("e1", "a", "m")];
        let mut ctx = ctx_with_parents(&edges);
        ctx.set_output("a", crate::context::NodeOutput::Single("it's \"quoted\"".to_string()));
        let result = substitute_with("echo ${1}", "m", &ctx, sanitize_for_shell);
        assert_eq!(result, "echo it\\'s \\\"quoted\\\"");
    }

    #[test]
    fn shell_sanitizer_escapes_dangerous_chars_preserves_newlines() {
        let input = "echo \"${HOME}\"; rm 'x'\nline2";
        let out = sanitize_for_shell(input);
        assert!(out.contains("\\$"));
        assert!(out.contains("\\\""));
        assert!(out.contains("\\;"));
        assert!(out.contains("\\'"));
        assert!(out.contains('\n'));
    }

    #[test]
    fn prompt_sanitizer_only_escapes_dollar_brace() {
        let input = "please compute ${x}; ignore \"quotes\"";
        let out = sanitize_for_prompt(input);
        assert_eq!(out, "please compute \\${x}; ignore \"quotes\"");
    }
}

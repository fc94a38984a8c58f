//! Prompt template rendering
//!
//! Templates use `{{name}}` tokens resolved by exact-match lookup in the live
//! variable map. Substitution is a single pass over the template, so a value
//! containing `{{other}}` is never re-substituted. Unknown tokens are left
//! intact.

use crate::workflow::ExecutionContext;
use regex::Regex;
use std::sync::OnceLock;

/// Reserved token always bound to the most recent successful output
pub const PREVIOUS_OUTPUT_KEY: &str = "previous_output";
/// Short alias for [`PREVIOUS_OUTPUT_KEY`]
pub const PREVIOUS_KEY: &str = "previous";
/// Token guaranteed to resolve; defaults to the previous output
pub const INPUT_KEY: &str = "input";
/// Token guaranteed to resolve; defaults to the run's initial input
pub const INITIAL_INPUT_KEY: &str = "initial_input";

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").expect("token pattern is valid")
    })
}

/// Render a prompt template against the execution context.
///
/// Resolution order per token: the reserved `previous_output`/`previous`
/// bindings first (they shadow user variables), then `input`/`initial_input`
/// with their documented defaults, then the plain variable map.
pub fn render_prompt(template: &str, context: &ExecutionContext) -> String {
    token_pattern()
        .replace_all(template, |caps: &regex::Captures<'_>| {
            let key = &caps[1];
            resolve_token(key, context)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn resolve_token(key: &str, context: &ExecutionContext) -> Option<String> {
    match key {
        PREVIOUS_OUTPUT_KEY | PREVIOUS_KEY => Some(context.previous_output.clone()),
        INPUT_KEY => Some(
            context
                .variables
                .get(INPUT_KEY)
                .cloned()
                .unwrap_or_else(|| context.previous_output.clone()),
        ),
        INITIAL_INPUT_KEY => Some(
            context
                .variables
                .get(INITIAL_INPUT_KEY)
                .cloned()
                .unwrap_or_else(|| context.initial_input.clone()),
        ),
        _ => context.variables.get(key).cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_util::sync::CancellationToken;

    fn context_with(vars: &[(&str, &str)]) -> ExecutionContext {
        let mut ctx = ExecutionContext::new("the initial input", CancellationToken::new());
        for (k, v) in vars {
            ctx.variables.insert(k.to_string(), v.to_string());
        }
        ctx
    }

    #[test]
    fn test_plain_variable_substitution() {
        let ctx = context_with(&[("topic", "rust"), ("tone", "dry")]);
        let rendered = render_prompt("Write about {{topic}} in a {{tone}} tone", &ctx);
        assert_eq!(rendered, "Write about rust in a dry tone");
    }

    #[test]
    fn test_whitespace_inside_braces() {
        let ctx = context_with(&[("topic", "rust")]);
        assert_eq!(render_prompt("{{ topic }}", &ctx), "rust");
    }

    #[test]
    fn test_unknown_token_left_intact() {
        let ctx = context_with(&[]);
        assert_eq!(render_prompt("keep {{missing}} as-is", &ctx), "keep {{missing}} as-is");
    }

    #[test]
    fn test_reserved_previous_tokens() {
        let mut ctx = context_with(&[]);
        ctx.previous_output = "earlier output".to_string();
        assert_eq!(render_prompt("{{previous_output}}", &ctx), "earlier output");
        assert_eq!(render_prompt("{{previous}}", &ctx), "earlier output");
    }

    #[test]
    fn test_previous_output_shadows_variable() {
        let mut ctx = context_with(&[("previous_output", "stale")]);
        ctx.previous_output = "live".to_string();
        assert_eq!(render_prompt("{{previous_output}}", &ctx), "live");
    }

    #[test]
    fn test_input_defaults_to_previous_output() {
        let mut ctx = context_with(&[]);
        ctx.previous_output = "from step 1".to_string();
        assert_eq!(render_prompt("{{input}}", &ctx), "from step 1");

        let ctx = context_with(&[("input", "explicit")]);
        assert_eq!(render_prompt("{{input}}", &ctx), "explicit");
    }

    #[test]
    fn test_initial_input_always_resolves() {
        let ctx = context_with(&[]);
        assert_eq!(render_prompt("{{initial_input}}", &ctx), "the initial input");

        let ctx = context_with(&[("initial_input", "override")]);
        assert_eq!(render_prompt("{{initial_input}}", &ctx), "override");
    }

    #[test]
    fn test_no_rescan_of_substituted_text() {
        // A variable whose value contains a token must not be expanded again.
        let ctx = context_with(&[("outer", "{{inner}}"), ("inner", "secret")]);
        assert_eq!(render_prompt("{{outer}}", &ctx), "{{inner}}");
    }

    #[test]
    fn test_first_step_input_resolves_to_initial_input() {
        let ctx = ExecutionContext::new("seed", CancellationToken::new());
        assert_eq!(render_prompt("Analyze: {{input}}", &ctx), "Analyze: seed");
    }
}

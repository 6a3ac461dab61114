//! Pull-request title and before/after evidence report.
//!
//! The body layout is parsed by external tooling; keep the section headings
//! and fenced blocks exactly as in `templates/pr_body.md`.

use anyhow::Result;
use minijinja::{Environment, context};

const PR_BODY_TEMPLATE: &str = include_str!("../templates/pr_body.md");

/// Inputs for the evidence report.
#[derive(Debug, Clone, Copy)]
pub struct ReportInputs<'a> {
    pub summary: &'a str,
    /// Changed file, relative to the repository root.
    pub file: &'a str,
    /// Baseline test output.
    pub before: &'a str,
    /// Verification test output.
    pub after: &'a str,
}

/// Pull-request title for a patch summary.
pub fn pr_title(summary: &str) -> String {
    format!("fix: {}", summary.trim())
}

/// Render the Markdown pull-request body.
pub fn render_pr_body(inputs: &ReportInputs<'_>) -> Result<String> {
    let mut env = Environment::new();
    env.add_template("pr_body.md", PR_BODY_TEMPLATE)?;
    let rendered = env.get_template("pr_body.md")?.render(context! {
        summary => inputs.summary.trim(),
        file => inputs.file,
        before => inputs.before.trim_end(),
        after => inputs.after.trim_end(),
    })?;
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_fixed_layout() {
        let body = render_pr_body(&ReportInputs {
            summary: "Guard divide() against division by zero",
            file: "src/calculator.js",
            before: "FAIL divide\n",
            after: "PASS divide\n",
        })
        .expect("render");
        let expected = "## Summary\nGuard divide() against division by zero\n\n\
## Changes\n- src/calculator.js\n\n\
## Test Results\n### Before\n```\nFAIL divide\n```\n\n\
### After\n```\nPASS divide\n```";
        assert_eq!(body, expected);
    }

    #[test]
    fn does_not_escape_markup_in_output() {
        let body = render_pr_body(&ReportInputs {
            summary: "s",
            file: "a/b.js",
            before: "expected <1> & got {{x}}",
            after: "ok",
        })
        .expect("render");
        assert!(body.contains("expected <1> & got {{x}}"));
    }

    #[test]
    fn title_prefixes_summary() {
        assert_eq!(pr_title("  Make range inclusive \n"), "fix: Make range inclusive");
    }
}

//! Deterministic fixes keyed by goal markers.

use crate::patch::external::Proposal;

/// One built-in fix: the goal marker that selects it and the exact edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinFix {
    /// Matched case-insensitively as a substring of the goal.
    pub marker: &'static str,
    /// Path relative to the repository root.
    pub file: &'static str,
    pub old: &'static str,
    pub new: &'static str,
    pub summary: &'static str,
}

pub static BUILTIN_FIXES: &[BuiltinFix] = &[
    BuiltinFix {
        marker: "division by zero",
        file: "src/calculator.js",
        old: "  return a / b;",
        new: "  if (b === 0) {\n    throw new Error('Division by zero');\n  }\n  return a / b;",
        summary: "Guard divide() against division by zero",
    },
    BuiltinFix {
        marker: "off-by-one",
        file: "src/range.js",
        old: "i < end",
        new: "i <= end",
        summary: "Include the end bound in range()",
    },
];

/// First fix whose marker appears in `goal`.
pub fn lookup(goal: &str) -> Option<&'static BuiltinFix> {
    let goal = goal.to_lowercase();
    BUILTIN_FIXES.iter().find(|fix| goal.contains(fix.marker))
}

impl BuiltinFix {
    /// Same shape as an external reply, so both go through one validator.
    pub fn to_proposal(&self) -> Proposal {
        Proposal {
            summary: self.summary.to_string(),
            file: self.file.to_string(),
            old_code: self.old.to_string(),
            new_code: self.new.to_string(),
        }
    }
}

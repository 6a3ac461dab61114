//! Exact-fragment substitution.

/// Replace the first occurrence of `old` in `content` with `new`.
///
/// Returns `None` when `old` is empty or absent. Later occurrences are left
/// untouched.
pub fn replace_first(content: &str, old: &str, new: &str) -> Option<String> {
    if old.is_empty() {
        return None;
    }
    let start = content.find(old)?;
    let mut out = String::with_capacity(content.len() - old.len() + new.len());
    out.push_str(&content[..start]);
    out.push_str(new);
    out.push_str(&content[start + old.len()..]);
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_only_first_occurrence() {
        let content = "x = 1;\nx = 1;\n";
        let out = replace_first(content, "x = 1;", "x = 2;").expect("replaced");
        assert_eq!(out, "x = 2;\nx = 1;\n");
    }

    #[test]
    fn absent_fragment_yields_none() {
        assert_eq!(replace_first("abc", "zzz", "y"), None);
    }

    #[test]
    fn empty_fragment_yields_none() {
        assert_eq!(replace_first("abc", "", "y"), None);
    }

    #[test]
    fn handles_multibyte_text() {
        let out = replace_first("héllo wörld", "wörld", "world").expect("replaced");
        assert_eq!(out, "héllo world");
    }
}

//! Branch naming for published fixes.

use chrono::{Local, NaiveDateTime};

/// Branch name for a fix created at `at`: `fix/YYYYMMDD-HHMMSS`.
pub fn branch_name_at(at: NaiveDateTime) -> String {
    at.format("fix/%Y%m%d-%H%M%S").to_string()
}

/// Branch name for a fix created now, in local time.
pub fn branch_name_now() -> String {
    branch_name_at(Local::now().naive_local())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn zero_pads_all_components() {
        let at = NaiveDate::from_ymd_opt(2026, 3, 7)
            .and_then(|d| d.and_hms_opt(4, 5, 9))
            .expect("valid datetime");
        assert_eq!(branch_name_at(at), "fix/20260307-040509");
    }

    #[test]
    fn now_matches_expected_shape() {
        let re = regex::Regex::new(r"^fix/\d{8}-\d{6}$").expect("regex");
        assert!(re.is_match(&branch_name_now()));
    }
}

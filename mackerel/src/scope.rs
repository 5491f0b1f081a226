//! Scope names
//!
//! The API spells a role scope `"service: role"`; state uses
//! `"service:role"`.

pub fn normalize_scope(scope: &str) -> String {
    scope.replacen(": ", ":", 1)
}

pub fn normalize_scopes(scopes: &[String]) -> Vec<String> {
    scopes.iter().map(|s| normalize_scope(s)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn only_the_first_separator_is_rewritten() {
        let input = strings(&["svc: role", "plain", "svc:role2", "a: b: c"]);
        assert_eq!(
            normalize_scopes(&input),
            strings(&["svc:role", "plain", "svc:role2", "a:b: c"])
        );
    }

    #[test]
    fn normalization_is_idempotent() {
        let input = strings(&["svc: role", "plain", "svc:role2", ""]);
        let once = normalize_scopes(&input);
        assert_eq!(normalize_scopes(&once), once);
        assert_eq!(once.len(), input.len());
    }
}

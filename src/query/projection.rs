//! Field projection for list/detail endpoints.
//!
//! Clients narrow responses with a comma-separated `fields` query parameter.
//! The requested names are intersected with the per-resource allow-list;
//! unknown or disallowed names are dropped silently so a stray field name
//! never fails a request and never widens scope. Sensitive columns are kept
//! off every allow-list, which makes them unselectable by construction.

use std::collections::BTreeSet;

/// Restrict a raw `fields` parameter to the given allow-list.
///
/// `None` (absent parameter, or nothing left after filtering) means the
/// endpoint's default projection applies. Allow-list order is preserved so
/// the generated column list is deterministic.
pub fn project(raw: Option<&str>, allowed: &[&str]) -> Option<Vec<String>> {
    let raw = raw?;

    let requested: BTreeSet<&str> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    if requested.is_empty() {
        return None;
    }

    let kept: Vec<String> = allowed
        .iter()
        .copied()
        .filter(|field| requested.contains(*field))
        .map(|field| field.to_string())
        .collect();

    if kept.is_empty() {
        None
    } else {
        Some(kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALLOWED: &[&str] = &["id", "username", "is_admin"];

    #[test]
    fn absent_means_default_projection() {
        assert_eq!(project(None, ALLOWED), None);
        assert_eq!(project(Some(""), ALLOWED), None);
        assert_eq!(project(Some(" , ,"), ALLOWED), None);
    }

    #[test]
    fn keeps_only_allowed_fields() {
        let selected = project(Some("username,password_digest,id"), ALLOWED).unwrap();
        assert_eq!(selected, vec!["id".to_string(), "username".to_string()]);
    }

    #[test]
    fn unknown_fields_fall_back_to_default() {
        assert_eq!(project(Some("nope,also_nope"), ALLOWED), None);
    }

    #[test]
    fn trims_whitespace_and_ignores_duplicates() {
        let selected = project(Some(" id , id ,username"), ALLOWED).unwrap();
        assert_eq!(selected, vec!["id".to_string(), "username".to_string()]);
    }

    #[test]
    fn idempotent_under_reapplication() {
        let first = project(Some("username,id,bogus"), ALLOWED).unwrap();
        let joined = first.join(",");
        let second = project(Some(&joined), ALLOWED).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn never_returns_fields_outside_allow_list() {
        let selected = project(Some("id,secret,password_digest,username"), ALLOWED).unwrap();
        for field in &selected {
            assert!(ALLOWED.contains(&field.as_str()));
        }
    }
}

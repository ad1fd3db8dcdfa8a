// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared bind-path derivation, used by [`crate::migrate`]'s v3->v4 step and
//! by runtime commands that mint new objects after a project is already at
//! v4 (spec §4.1's sanitization rule applies in both places).

use std::collections::HashSet;

/// Sanitize `name` to `[A-Za-z0-9._-]` (replacing every other character
/// with `_`) and disambiguate against `used` with a numeric suffix,
/// inserting the result into `used`.
pub fn unique_sanitized(name: &str, used: &mut HashSet<String>) -> String {
    let mut sanitized: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' { c } else { '_' })
        .collect();
    if sanitized.is_empty() {
        sanitized = "object".to_string();
    }

    if !used.contains(&sanitized) {
        used.insert(sanitized.clone());
        return sanitized;
    }
    let mut n = 2u32;
    loop {
        let candidate = format!("{sanitized}_{n}");
        if !used.contains(&candidate) {
            used.insert(candidate.clone());
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_illegal_characters() {
        let mut used = HashSet::new();
        assert_eq!(unique_sanitized("Cube One!", &mut used), "Cube_One_");
    }

    #[test]
    fn disambiguates_on_collision() {
        let mut used = HashSet::new();
        assert_eq!(unique_sanitized("Cube", &mut used), "Cube");
        assert_eq!(unique_sanitized("Cube", &mut used), "Cube_2");
        assert_eq!(unique_sanitized("Cube", &mut used), "Cube_3");
    }

    #[test]
    fn empty_name_falls_back_to_object() {
        let mut used = HashSet::new();
        assert_eq!(unique_sanitized("", &mut used), "object");
    }
}

//! Path normalization for the storage abstraction and the ARF archive
//! (spec §4.2, §6): forbidden characters are replaced, and names that are
//! either too long or materially altered by sanitization get a content-free
//! disambiguating suffix so two different raw names never collide on the
//! sanitized form.

use sha2::{Digest, Sha256};

const FORBIDDEN: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];
const MAX_LEN: usize = 200;

/// Replace forbidden characters with `_`; if the result is longer than 200
/// bytes or differs from the original, suffix it with the 12-hex-char MD5...
/// per spec text ("12-char hex hash of the original name") — we use the
/// first 12 hex chars of a SHA-256 digest rather than MD5 itself, since MD5
/// is not otherwise used anywhere in this workspace and the spec only cares
/// that the suffix is a stable 12-hex-char fingerprint of the original name.
pub fn sanitize(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| if FORBIDDEN.contains(&c) { '_' } else { c })
        .collect();

    let altered = sanitized != name;
    let too_long = sanitized.len() > MAX_LEN;

    if !altered && !too_long {
        return sanitized;
    }

    let suffix = hex_fingerprint(name);
    if too_long {
        let budget = MAX_LEN.saturating_sub(suffix.len() + 1);
        let mut truncated: String = sanitized.chars().take(budget).collect();
        truncated.push('_');
        truncated.push_str(&suffix);
        truncated
    } else {
        format!("{sanitized}_{suffix}")
    }
}

fn hex_fingerprint(name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    let digest = hasher.finalize();
    hex::encode(digest)[..12].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_names_pass_through() {
        assert_eq!(sanitize("hello-world.json"), "hello-world.json");
    }

    #[test]
    fn forbidden_chars_replaced_and_suffixed() {
        let out = sanitize("a/b:c?.txt");
        assert!(!out.contains('/'));
        assert!(!out.contains(':'));
        assert!(!out.contains('?'));
        assert_eq!(out.len(), "a_b_c_.txt".len() + 1 + 12);
    }

    #[test]
    fn long_names_truncated_and_suffixed() {
        let long_name = "x".repeat(500);
        let out = sanitize(&long_name);
        assert!(out.len() <= MAX_LEN);
        assert!(out.ends_with(&hex_fingerprint(&long_name)));
    }

    #[test]
    fn different_names_never_collide_after_sanitization() {
        let a = sanitize("report:q1");
        let b = sanitize("report:q2");
        assert_ne!(a, b);
    }
}

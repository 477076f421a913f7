//! Name and slug normalization

use crate::error::TagResult;
use std::collections::HashSet;
use uuid::Uuid;

/// Trim, drop empty entries and de-duplicate case-insensitively.
///
/// The first spelling of a name wins and input order is preserved.
pub fn normalize_names<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut normalized = Vec::new();

    for name in names {
        let trimmed = name.as_ref().trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(name_key(trimmed)) {
            normalized.push(trimmed.to_string());
        }
    }

    normalized
}

/// Case-folded form used for name uniqueness
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// URL-safe slug for a tag name.
///
/// Letters and digits are lowercased and kept; every other run of characters
/// becomes a single `-`. A name with nothing usable gets a random 8 character
/// slug.
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_dash = false;

    for ch in name.trim().chars() {
        if ch.is_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.extend(ch.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if out.is_empty() {
        random_slug()
    } else {
        out
    }
}

fn random_slug() -> String {
    let mut slug = Uuid::new_v4().simple().to_string();
    slug.truncate(8);
    slug
}

/// First of `base`, `base-1`, `base-2`, ... that `is_taken` rejects.
pub fn unique_slug<F>(base: &str, mut is_taken: F) -> TagResult<String>
where
    F: FnMut(&str) -> TagResult<bool>,
{
    let base = base.to_lowercase();
    let mut candidate = base.clone();
    let mut suffix = 1u32;

    while is_taken(&candidate)? {
        candidate = format!("{}-{}", base, suffix);
        suffix += 1;
    }

    Ok(candidate)
}

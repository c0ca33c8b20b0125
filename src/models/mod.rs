//! Domain model module declarations.

use sha2::{Digest, Sha256};

pub mod assembly;
pub mod extension;
pub mod session;

/// Hex digits kept when a name has no alphanumeric characters to slug.
const SYMBOL_DIGEST_LEN: usize = 8;

/// Reduce a display name to the lowercase alphanumeric form used in identities.
///
/// `pyRevit Tools` and `pyRevitTools` both slug to `pyrevittools`; `工具`
/// stays `工具`. A name made only of non-ASCII symbols (`★`) slugs to a
/// short digest of itself, so distinct symbols keep distinct identities.
/// ASCII punctuation and whitespace alone slug to the empty string.
#[must_use]
pub fn slug(name: &str) -> String {
    let slug: String = name
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect();
    if !slug.is_empty() || name.is_ascii() {
        return slug;
    }

    let trimmed = name.trim();
    let digest = format!("{:x}", Sha256::digest(trimmed.as_bytes()));
    format!("u{}", &digest[..SYMBOL_DIGEST_LEN])
}

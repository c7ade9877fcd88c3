//! Slug and short id generation.
//!
//! Slugs are derived from display names and regenerated on every rename, so they are
//! not unique. Short ids are random URL-safe tokens assigned once per entity and used
//! only as asset path segments.

use rand::Rng;

/// Separator written in place of any run of non-alphanumeric characters.
pub const SLUG_SEPARATOR: char = '_';

/// URL-safe alphabet short ids are drawn from.
const SHORT_ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

pub const SHORT_ID_MIN_LENGTH: usize = 1;
pub const SHORT_ID_MAX_LENGTH: usize = 21;

/// Normalizes a display name into a lowercase slug.
/// Runs of whitespace and punctuation collapse into a single `_`; leading and trailing
/// separators are dropped. An input with no alphanumeric characters yields an empty slug.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut prev_separator = false;
    for ch in name.trim().to_lowercase().chars() {
        if ch.is_alphanumeric() {
            slug.push(ch);
            prev_separator = false;
        } else if !prev_separator {
            slug.push(SLUG_SEPARATOR);
            prev_separator = true;
        }
    }
    slug.trim_matches(SLUG_SEPARATOR).to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityConfig {
    short_id_length: usize,
}

impl IdentityConfig {
    /// Clamps the requested length into `SHORT_ID_MIN_LENGTH..=SHORT_ID_MAX_LENGTH`.
    #[must_use]
    pub fn new(short_id_length: usize) -> Self {
        Self {
            short_id_length: short_id_length.clamp(SHORT_ID_MIN_LENGTH, SHORT_ID_MAX_LENGTH),
        }
    }

    #[must_use]
    pub fn short_id_length(&self) -> usize {
        self.short_id_length
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self::new(4)
    }
}

/// Produces short ids. Collisions are not checked; their probability is accepted.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityGenerator {
    config: IdentityConfig,
}

impl IdentityGenerator {
    #[must_use]
    pub fn new(config: IdentityConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn new_short_id(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..self.config.short_id_length())
            .map(|_| {
                let index = rng.gen_range(0..SHORT_ID_ALPHABET.len());
                char::from(SHORT_ID_ALPHABET[index])
            })
            .collect()
    }
}

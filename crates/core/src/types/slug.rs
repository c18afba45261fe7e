//! URL-safe product and category slugs.
//!
//! Product slugs are unique by construction: the slugified title is suffixed
//! with the product's reference code (itself unique across systems) or, when
//! there is none, the numeric id. No database lookup is needed to pick one.

use core::fmt;

use serde::{Deserialize, Serialize};

/// A URL-safe identifier (lowercase ASCII alphanumerics separated by `-`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    /// Wrap an already-slugified string without re-normalizing it.
    ///
    /// Values read back from the database are trusted as-is.
    #[must_use]
    pub fn from_trusted(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Returns the slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Slug` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Transliterate to ASCII, lowercase, and join alphanumeric runs with `-`.
///
/// ```
/// use brico_core::slugify;
///
/// assert_eq!(slugify("Llave Inglesa 1/2\""), "llave-inglesa-1-2");
/// assert_eq!(slugify("  Cañería  "), "caneria");
/// ```
#[must_use]
pub fn slugify(text: &str) -> String {
    slug::slugify(text)
}

/// Build a product slug that is unique without consulting the database.
///
/// The suffix is the slugified reference code when present and non-blank,
/// otherwise the product id. If the title slugifies to nothing, the suffix
/// alone is the slug, so the result is never empty.
///
/// ```
/// use brico_core::make_unique_slug;
///
/// let slug = make_unique_slug("Varilla Roscada 1m", Some("06280545"), 2143);
/// assert_eq!(slug.as_str(), "varilla-roscada-1m-06280545");
///
/// let slug = make_unique_slug("Varilla Roscada 1m", None, 2143);
/// assert_eq!(slug.as_str(), "varilla-roscada-1m-2143");
/// ```
#[must_use]
pub fn make_unique_slug(title: &str, reference: Option<&str>, id: i32) -> Slug {
    let base = slugify(title);
    let suffix = reference
        .map(slugify)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| id.to_string());

    if base.is_empty() {
        Slug(suffix)
    } else {
        Slug(format!("{base}-{suffix}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_strips_accents_and_punctuation() {
        assert_eq!(slugify("Atornillador Eléctrico 18V"), "atornillador-electrico-18v");
        assert_eq!(slugify("--Tubo PVC (Ø32)--"), "tubo-pvc-o32");
        assert_eq!(slugify("¡¿!?"), "");
    }

    #[test]
    fn test_colliding_names_get_distinct_slugs() {
        let a = make_unique_slug("Martillo de carpintero", Some("REF-001"), 10);
        let b = make_unique_slug("Martillo de Carpintero", Some("REF-002"), 11);
        assert_ne!(a, b);

        let c = make_unique_slug("Martillo de carpintero", None, 12);
        let d = make_unique_slug("Martillo de carpintero", None, 13);
        assert_ne!(c, d);
        assert_eq!(c.as_str(), "martillo-de-carpintero-12");
    }

    #[test]
    fn test_blank_reference_falls_back_to_id() {
        let slug = make_unique_slug("Brocha", Some("   "), 5);
        assert_eq!(slug.as_str(), "brocha-5");

        let slug = make_unique_slug("Brocha", Some("***"), 5);
        assert_eq!(slug.as_str(), "brocha-5");
    }

    #[test]
    fn test_empty_title_yields_suffix_only() {
        assert_eq!(make_unique_slug("", None, 99).as_str(), "99");
        assert_eq!(make_unique_slug("   ", Some("AB 12"), 99).as_str(), "ab-12");
    }
}

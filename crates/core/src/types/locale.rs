//! Storefront locales.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when a string is not a supported locale.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unsupported locale: {0}")]
pub struct LocaleError(pub String);

/// A supported storefront language.
///
/// Localized product text is keyed by these codes. Spanish is the catalog's
/// source language and the default fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Es,
    En,
    De,
    Fr,
    Pt,
}

impl Locale {
    /// All supported locales.
    pub const ALL: [Self; 5] = [Self::Es, Self::En, Self::De, Self::Fr, Self::Pt];

    /// The two-letter language code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Es => "es",
            Self::En => "en",
            Self::De => "de",
            Self::Fr => "fr",
            Self::Pt => "pt",
        }
    }

    /// Human-readable label for a language selector.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Es => "Español",
            Self::En => "English",
            Self::De => "Deutsch",
            Self::Fr => "Français",
            Self::Pt => "Português",
        }
    }

    /// Parse a locale tag, accepting region suffixes (`es-ES`, `pt_BR`).
    ///
    /// # Errors
    ///
    /// Returns `LocaleError` if the base language is not supported.
    pub fn parse(input: &str) -> Result<Self, LocaleError> {
        let lower = input.trim().to_lowercase();
        let base = lower.split(['-', '_']).next().unwrap_or_default();
        Self::ALL
            .into_iter()
            .find(|locale| locale.as_str() == base)
            .ok_or(LocaleError(lower))
    }

    /// Resolve free-form input to a supported locale, falling back to the
    /// default when the input is missing or unsupported.
    #[must_use]
    pub fn ensure(input: Option<&str>) -> Self {
        input.and_then(|s| Self::parse(s).ok()).unwrap_or_default()
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Locale {
    type Err = LocaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

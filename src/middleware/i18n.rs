// src/middleware/i18n.rs

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts, HeaderMap};

const DEFAULT_LANG: &str = "pt";
const SUPPORTED_LANGS: [&str; 2] = ["pt", "en"];

// Idioma das mensagens de erro (pt ou en).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale(pub String);

impl Locale {
    pub fn is_english(&self) -> bool {
        self.0 == "en"
    }

    /// Primeiro idioma suportado do Accept-Language, na ordem de preferência.
    /// "en-US" conta como "en"; idiomas que não temos são ignorados.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|header_value| header_value.to_str().ok())
            .and_then(|header_str| {
                accept_language::parse(header_str)
                    .into_iter()
                    .filter_map(|tag| tag.split('-').next().map(str::to_lowercase))
                    .find(|lang| SUPPORTED_LANGS.contains(&lang.as_str()))
            })
            .map(Locale)
            .unwrap_or_default()
    }
}

impl Default for Locale {
    fn default() -> Self {
        Locale(DEFAULT_LANG.to_string())
    }
}

impl<S> FromRequestParts<S> for Locale
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Locale::from_headers(&parts.headers))
    }
}

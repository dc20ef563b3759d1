//! Bearer credential lookup in destination URLs.
//!
//! Some upload endpoints accept their token as a `bearer` query parameter. The
//! transfer forwards that token as an `Authorization` header as well, while the
//! URL itself is sent unchanged because those endpoints also expect the
//! parameter to stay in the query string.

use url::Url;

/// Query parameter carrying an embedded bearer credential.
pub const BEARER_QUERY_PARAM: &str = "bearer";

/// Returns the bearer credential embedded in `url`, if any.
///
/// Unparseable URLs and empty values yield `None`. When the parameter repeats,
/// the first occurrence wins.
#[must_use]
pub fn extract_bearer(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .query_pairs()
        .find(|(key, _)| key == BEARER_QUERY_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

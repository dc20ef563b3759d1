//! Default User-Agent string for both transfer legs.

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/fierce/stream-relay";

/// Default User-Agent sent on download and upload requests.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("stream-relay/{version} (+{PROJECT_UA_URL})")
}

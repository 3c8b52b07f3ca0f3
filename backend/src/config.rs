use shared::DEFAULT_IDENTITY_HEADER;
use tracing::warn;

pub const DEFAULT_CORS_ORIGIN_PREFIX: &str = "http://localhost";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Header the upstream identity provider writes the verified user id into.
    pub identity_header: String,
    pub allow_anonymous_share: bool,
    pub cors_origin_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            identity_header: DEFAULT_IDENTITY_HEADER.to_string(),
            allow_anonymous_share: true,
            cors_origin_prefix: DEFAULT_CORS_ORIGIN_PREFIX.to_string(),
        }
    }
}

impl Config {
    pub fn from_secrets(secrets: &shuttle_runtime::SecretStore) -> Self {
        Self::from_lookup(|key| secrets.get(key))
    }

    /// Missing or malformed keys fall back to the defaults with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let identity_header = match lookup("IDENTITY_HEADER").filter(|h| !h.trim().is_empty()) {
            Some(header) => header.trim().to_string(),
            None => {
                warn!("IDENTITY_HEADER not set - using {}", defaults.identity_header);
                defaults.identity_header
            }
        };

        let allow_anonymous_share = match lookup("ALLOW_ANONYMOUS_SHARE").as_deref().map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("true") || v == "1" => true,
            Some(v) if v.eq_ignore_ascii_case("false") || v == "0" => false,
            Some(v) => {
                warn!("ALLOW_ANONYMOUS_SHARE has unrecognised value {:?} - using {}", v, defaults.allow_anonymous_share);
                defaults.allow_anonymous_share
            }
            None => {
                warn!("ALLOW_ANONYMOUS_SHARE not set - using {}", defaults.allow_anonymous_share);
                defaults.allow_anonymous_share
            }
        };

        let cors_origin_prefix = match lookup("CORS_ALLOWED_ORIGIN_PREFIX").filter(|p| !p.trim().is_empty()) {
            Some(prefix) => prefix.trim().to_string(),
            None => {
                warn!("CORS_ALLOWED_ORIGIN_PREFIX not set - using {}", defaults.cors_origin_prefix);
                defaults.cors_origin_prefix
            }
        };

        Self {
            identity_header,
            allow_anonymous_share,
            cors_origin_prefix,
        }
    }
}

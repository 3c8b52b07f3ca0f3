use serde::{Serialize, Deserialize};
use crate::models::UserId;

pub const DEFAULT_IDENTITY_HEADER: &str = "X-User-Id";

/// Who is making a request, as established by the upstream identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "userId", rename_all = "camelCase")]
pub enum Identity {
    Authenticated(UserId),
    Anonymous,
}

impl Identity {
    pub fn user(id: impl Into<String>) -> Self {
        Identity::Authenticated(UserId::new(id))
    }

    pub fn user_id(&self) -> Option<&UserId> {
        match self {
            Identity::Authenticated(id) => Some(id),
            Identity::Anonymous => None,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Identity::Anonymous)
    }
}

/// Name of the header the identity provider writes the verified user id into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityHeader(pub String);

impl Default for IdentityHeader {
    fn default() -> Self {
        Self(DEFAULT_IDENTITY_HEADER.to_string())
    }
}

impl IdentityHeader {
    /// Blank header values are treated as no identity at all.
    pub fn resolve(&self, value: Option<&str>) -> Identity {
        value
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(Identity::user)
            .unwrap_or(Identity::Anonymous)
    }
}

// Backend-specific Rocket implementation
#[cfg(feature = "backend")]
mod backend_impl {
    use super::*;
    use rocket::request::{FromRequest, Outcome};
    use rocket::Request;

    #[rocket::async_trait]
    impl<'r> FromRequest<'r> for Identity {
        type Error = ();

        async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
            let fallback = IdentityHeader::default();
            let header = req.rocket().state::<IdentityHeader>().unwrap_or(&fallback);
            Outcome::Success(header.resolve(req.headers().get_one(&header.0)))
        }
    }
}

/**
 * Credential Extraction
 * 
 * Each extractor looks in one location of an HTTP request. They are tried in
 * order and the first one that finds *anything* wins, even if what it found
 * is malformed: a bad header is never silently skipped in favour of the query
 * parameter.
 */

use std::collections::HashMap;
use std::fmt;

use axum::extract::Query;
use axum::http::{header::AUTHORIZATION, HeaderMap, Uri};

use super::AuthError;

/// Name of the query parameter carrying a bearer token
pub const AUTH_QUERY_PARAM: &str = "auth";

/// Where a credential was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Header,
    Query,
    InBand,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Header => write!(f, "Authorization header"),
            Self::Query => write!(f, "'{}' query parameter", AUTH_QUERY_PARAM),
            Self::InBand => write!(f, "auth message"),
        }
    }
}

/// A bearer token and where it came from
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub source: CredentialSource,
}

impl Credential {
    pub fn new(token: impl Into<String>, source: CredentialSource) -> Self {
        Self {
            token: token.into(),
            source,
        }
    }
}

// Tokens stay out of logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("source", &self.source)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// `None` when the location is empty, `Some(Err)` when it holds something unusable
pub type Extractor = fn(&HeaderMap, &Uri) -> Option<Result<Credential, AuthError>>;

/// Request-level extractors, in precedence order
pub const EXTRACTORS: [Extractor; 2] = [from_authorization_header, from_query_parameter];

/// Find the credential of a request, if any
pub fn extract(headers: &HeaderMap, uri: &Uri) -> Option<Result<Credential, AuthError>> {
    EXTRACTORS.iter().find_map(|extractor| extractor(headers, uri))
}

/// `Authorization: Bearer <token>`
pub fn from_authorization_header(headers: &HeaderMap, _uri: &Uri) -> Option<Result<Credential, AuthError>> {
    let value = headers.get(AUTHORIZATION)?;
    let malformed = |message: &str| AuthError::MalformedCredential {
        location: CredentialSource::Header,
        message: message.to_string(),
    };

    let result = value
        .to_str()
        .map_err(|_| malformed("header is not valid ASCII"))
        .and_then(|header| {
            header
                .strip_prefix("Bearer ")
                .ok_or_else(|| malformed("expected Bearer scheme"))
        })
        .and_then(|token| {
            let token = token.trim();
            if token.is_empty() {
                Err(malformed("empty token"))
            } else {
                Ok(Credential::new(token, CredentialSource::Header))
            }
        });
    Some(result)
}

/// `?auth=<token>`
pub fn from_query_parameter(_headers: &HeaderMap, uri: &Uri) -> Option<Result<Credential, AuthError>> {
    let Query(params) = Query::<HashMap<String, String>>::try_from_uri(uri).ok()?;
    let token = params.get(AUTH_QUERY_PARAM)?;
    if token.is_empty() {
        return Some(Err(AuthError::MalformedCredential {
            location: CredentialSource::Query,
            message: "empty token".to_string(),
        }));
    }
    Some(Ok(Credential::new(token.clone(), CredentialSource::Query)))
}

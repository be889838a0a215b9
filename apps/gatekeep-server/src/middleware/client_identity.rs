//! Client identity extractor.

use actix_web::{FromRequest, HttpRequest, dev::Payload};
use std::future::{Ready, ready};

use gatekeep_core::client_identifier;

/// The identifier a request is rate limited under, taken from its proxy
/// headers.
///
/// ```ignore
/// async fn login(client: ClientIdentity) -> impl Responder {
///     format!("Attempt from {}", client.as_str())
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity(pub String);

impl ClientIdentity {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn from_request_headers(req: &HttpRequest) -> Self {
        let headers = req
            .headers()
            .iter()
            .filter_map(|(name, value)| Some((name.as_str(), value.to_str().ok()?)));

        Self(client_identifier(headers))
    }
}

impl FromRequest for ClientIdentity {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Ok(Self::from_request_headers(req)))
    }
}

use std::{collections::HashSet, marker::PhantomData};

use headers::authorization::{Bearer, Credentials};
use http::{header, HeaderMap, Request, Response, StatusCode};
use tower_http::validate_request::ValidateRequest;

/// Admin bearer tokens, an empty set lets every request through
pub struct ManyValidate<ResBody> {
    tokens: HashSet<String>,
    _ty: PhantomData<fn() -> ResBody>,
}

impl<ResBody> ManyValidate<ResBody> {
    pub fn new(tokens: Vec<String>) -> Self {
        Self {
            tokens: tokens.into_iter().collect(),
            _ty: PhantomData,
        }
    }
}

impl<ResBody> Clone for ManyValidate<ResBody> {
    fn clone(&self) -> Self {
        Self {
            tokens: self.tokens.clone(),
            _ty: PhantomData,
        }
    }
}

impl<B: Default> ValidateRequest<B> for ManyValidate<B> {
    type ResponseBody = B;

    fn validate(&mut self, request: &mut Request<B>) -> Result<(), Response<Self::ResponseBody>> {
        if self.tokens.is_empty() || has_token(request.headers(), &self.tokens) {
            return Ok(());
        }
        let mut response = Response::new(B::default());
        *response.status_mut() = StatusCode::UNAUTHORIZED;
        Err(response)
    }
}

fn has_token(headers: &HeaderMap, tokens: &HashSet<String>) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(Bearer::decode)
        .is_some_and(|bearer| tokens.contains(bearer.token()))
}

/// Whether the request carries a valid admin token, false when auth is off
pub fn is_admin(headers: &HeaderMap, tokens: &[String]) -> bool {
    let tokens: HashSet<String> = tokens.iter().cloned().collect();
    !tokens.is_empty() && has_token(headers, &tokens)
}

//! Authenticator dispatch
//!
//! Maps an `AuthenticationMethod` to the signing strategy applied to the
//! outgoing request.

use std::collections::HashMap;

use super::routes::AuthenticationMethod;
use super::scope::{ScopeContext, action_for_verb};
use super::signer::Signer;
use crate::error::{FeedError, Result};
use crate::feed::Feed;

/// Signing strategy for one authentication method
pub trait Authenticator: Send + Sync {
    fn authenticate(
        &self,
        signer: &Signer,
        request: &mut reqwest::Request,
        context: ScopeContext,
        feed: Option<&Feed>,
    ) -> Result<()>;
}

/// Signs the whole request; context and feed are ignored
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplicationAuthenticator;

impl Authenticator for ApplicationAuthenticator {
    fn authenticate(
        &self,
        signer: &Signer,
        request: &mut reqwest::Request,
        _context: ScopeContext,
        _feed: Option<&Feed>,
    ) -> Result<()> {
        signer.sign_http(request)
    }
}

/// Attaches a scoped JWT for the feed the request targets
///
/// Without a feed the token's `feed_id` claim becomes the `*` wildcard.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedAuthenticator;

impl Authenticator for FeedAuthenticator {
    fn authenticate(
        &self,
        signer: &Signer,
        request: &mut reqwest::Request,
        context: ScopeContext,
        feed: Option<&Feed>,
    ) -> Result<()> {
        let action =
            action_for_verb(request.method().as_str()).map_err(|_| FeedError::MissingAction)?;
        let feed_id = feed.map(Feed::id_without_colon).unwrap_or_default();
        signer.sign_scoped_token(request, context, action, &feed_id)
    }
}

/// Immutable method → authenticator table
pub struct Authenticators {
    by_method: HashMap<AuthenticationMethod, Box<dyn Authenticator>>,
}

impl std::fmt::Debug for Authenticators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticators")
            .field("methods", &self.by_method.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Authenticators {
    /// Empty table, see `with`
    pub fn empty() -> Self {
        Self {
            by_method: HashMap::new(),
        }
    }

    /// Both authentication methods of the feed service
    pub fn standard() -> Self {
        Self::empty()
            .with(AuthenticationMethod::Application, ApplicationAuthenticator)
            .with(AuthenticationMethod::Feed, FeedAuthenticator)
    }

    pub fn with(
        mut self,
        method: AuthenticationMethod,
        authenticator: impl Authenticator + 'static,
    ) -> Self {
        self.by_method.insert(method, Box::new(authenticator));
        self
    }

    /// Sign `request` with the strategy registered for `method`
    ///
    /// # Errors
    /// - `MissingAuthenticationMethod` if nothing is registered for `method`
    /// - `MissingAction` if feed authentication meets an unknown verb
    /// - `Signing` if the signature cannot be produced
    pub fn authenticate(
        &self,
        method: AuthenticationMethod,
        signer: &Signer,
        request: &mut reqwest::Request,
        context: ScopeContext,
        feed: Option<&Feed>,
    ) -> Result<()> {
        let authenticator = self
            .by_method
            .get(&method)
            .ok_or(FeedError::MissingAuthenticationMethod)?;
        authenticator.authenticate(signer, request, context, feed)
    }
}

impl Default for Authenticators {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::signer::AUTH_TYPE_HEADER;
    use reqwest::header::AUTHORIZATION;

    fn request(method: &str) -> reqwest::Request {
        reqwest::Request::new(
            reqwest::Method::from_bytes(method.as_bytes()).unwrap(),
            url::Url::parse("https://api.example.com/api/v1.0/feed/flat/bob/").unwrap(),
        )
    }

    fn feed() -> Feed {
        Feed::new("flat", "bob").unwrap()
    }

    #[test]
    fn application_method_signs_http() {
        let signer = Signer::new("key", "secret");
        let mut req = request("POST");

        Authenticators::standard()
            .authenticate(
                AuthenticationMethod::Application,
                &signer,
                &mut req,
                ScopeContext::NoContext,
                None,
            )
            .unwrap();

        let authorization = req.headers()[AUTHORIZATION].to_str().unwrap();
        assert!(authorization.starts_with("Signature keyId=\"key\""));
        assert!(req.headers().get(AUTH_TYPE_HEADER).is_none());
    }

    #[test]
    fn feed_method_sets_jwt() {
        let signer = Signer::new("key", "secret");
        let mut req = request("GET");
        let feed = feed();

        Authenticators::standard()
            .authenticate(
                AuthenticationMethod::Feed,
                &signer,
                &mut req,
                ScopeContext::Feed,
                Some(&feed),
            )
            .unwrap();

        assert_eq!(req.headers()[AUTH_TYPE_HEADER], "jwt");
        let expected = signer
            .generate_scoped_token(
                ScopeContext::Feed,
                crate::auth::ScopeAction::Read,
                "flatbob",
            )
            .unwrap();
        assert_eq!(req.headers()[AUTHORIZATION], expected.as_str());
    }

    #[test]
    fn feed_method_without_feed_uses_wildcard() {
        let signer = Signer::new("key", "secret");
        let mut req = request("DELETE");

        FeedAuthenticator
            .authenticate(&signer, &mut req, ScopeContext::Feed, None)
            .unwrap();

        let expected = signer
            .generate_scoped_token(ScopeContext::Feed, crate::auth::ScopeAction::Delete, "*")
            .unwrap();
        assert_eq!(req.headers()[AUTHORIZATION], expected.as_str());
    }

    #[test]
    fn feed_method_rejects_unknown_verb() {
        let signer = Signer::new("key", "secret");
        let mut req = request("TRACE");

        match FeedAuthenticator.authenticate(&signer, &mut req, ScopeContext::Feed, Some(&feed())) {
            Err(FeedError::MissingAction) => {}
            other => panic!("expected missing action, got: {other:?}"),
        }
        assert!(req.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn unregistered_method_is_an_error() {
        let signer = Signer::new("key", "secret");
        let mut req = request("GET");
        let authenticators = Authenticators::empty().with(AuthenticationMethod::Feed, FeedAuthenticator);

        match authenticators.authenticate(
            AuthenticationMethod::Application,
            &signer,
            &mut req,
            ScopeContext::NoContext,
            None,
        ) {
            Err(FeedError::MissingAuthenticationMethod) => {}
            other => panic!("expected missing authentication method, got: {other:?}"),
        }
    }
}

//! Request authentication
//!
//! Handles:
//! - Scope model (actions, resource contexts)
//! - Route classification
//! - Authenticator dispatch
//! - Token and signature generation

mod authenticator;
mod routes;
mod scope;
mod signer;

pub use authenticator::{
    ApplicationAuthenticator, Authenticator, Authenticators, FeedAuthenticator,
};
pub use routes::{AuthenticationMethod, Route, RouteTable};
pub use scope::{ScopeAction, ScopeContext, action_for_verb};
pub use signer::{
    AUTH_TYPE_HEADER, HTTP_DATE_FORMAT, ScopeClaims, Signer, http_date_now, url_safe,
};

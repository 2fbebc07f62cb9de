//! Client (tenant) descriptor contract.
//!
//! Every application talking to the sync server registers as a client:
//! a fixed identity plus the presentation strings used in
//! transactional mail and account flows. Services consume the
//! [`Client`] trait; concrete registrations live in the embedding
//! application.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

/// Application family a registered client belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationType {
    /// The note-taking apps.
    Notes,
    /// The browser clipper.
    Clipper,
}

/// A registered client application.
pub trait Client: Send + Sync {
    /// Stable client id, as sent in API requests.
    fn id(&self) -> &str;

    /// Human-readable client name.
    fn name(&self) -> &str;

    /// Application family of this client.
    fn app_type(&self) -> ApplicationType;

    /// Application the client authenticates as. Usually equal to
    /// [`Client::app_type`]; differs for clients piggybacking on
    /// another application's account pool.
    fn app_id(&self) -> ApplicationType;

    /// From-address for transactional mail sent on behalf of this
    /// client.
    fn sender_email(&self) -> &str;

    /// From-name for transactional mail.
    fn sender_name(&self) -> &str;

    /// Where to send the user after confirming their email address.
    fn email_confirmed_redirect_url(&self) -> &str;

    /// Where to send the user after recovering their account.
    fn account_recovery_redirect_url(&self) -> &str;

    /// Hook invoked after a user of this client confirms their email
    /// address.
    fn on_email_confirmed(
        &self,
        user_id: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>>;
}

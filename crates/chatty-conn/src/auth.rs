//! Auth gate — maps handshake credentials to a conversant.
//!
//! A gate is consulted exactly once per connection. There is no retry: a
//! rejected handshake ends the session.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;

use chatty_core::conversant::fields;
use chatty_core::{Conversant, ConversantId, Credentials};

use crate::store::{ConversantStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("malformed credentials: {0}")]
    MalformedCredentials(String),

    #[error("missing credential field {0:?}")]
    MissingField(&'static str),

    #[error("invalid credential field {field:?}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("credentials rejected: {0}")]
    Rejected(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authorize(&self, credentials: &Credentials) -> Result<Conversant, AuthError>;
}

/// Plain functions and closures are gates.
#[async_trait]
impl<F> Authenticator for F
where
    F: Fn(&Credentials) -> Result<Conversant, AuthError> + Send + Sync,
{
    async fn authorize(&self, credentials: &Credentials) -> Result<Conversant, AuthError> {
        self(credentials)
    }
}

/// Trust-on-first-use gate keyed by display name.
///
/// Requires a non-empty `display_name`. An optional numeric `id` pins the
/// conversant to an existing record; without one a fresh id is allocated.
/// The result is upserted into the store before it is returned.
pub struct DisplayNameAuth<S> {
    store: S,
    next_id: AtomicI64,
}

impl<S: ConversantStore> DisplayNameAuth<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            next_id: AtomicI64::new(1),
        }
    }

    fn resolve_id(&self, credentials: &Credentials) -> Result<ConversantId, AuthError> {
        let Some(raw) = credentials.get(fields::ID) else {
            return Ok(self.next_id.fetch_add(1, Ordering::SeqCst));
        };
        let id: ConversantId = raw.trim().parse().map_err(|e: std::num::ParseIntError| {
            AuthError::InvalidField {
                field: fields::ID,
                reason: e.to_string(),
            }
        })?;
        if id <= 0 {
            return Err(AuthError::InvalidField {
                field: fields::ID,
                reason: "must be positive".into(),
            });
        }
        // Keep allocated ids clear of ones clients have claimed.
        self.next_id.fetch_max(id.saturating_add(1), Ordering::SeqCst);
        Ok(id)
    }
}

#[async_trait]
impl<S: ConversantStore> Authenticator for DisplayNameAuth<S> {
    async fn authorize(&self, credentials: &Credentials) -> Result<Conversant, AuthError> {
        let display_name = credentials
            .get(fields::DISPLAY_NAME)
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .ok_or(AuthError::MissingField(fields::DISPLAY_NAME))?;
        let id = self.resolve_id(credentials)?;

        let conversant = self
            .store
            .update_or_create(Conversant::new(id, display_name))
            .await?;
        tracing::debug!(conversant = conversant.id, "conversant upserted");
        Ok(conversant)
    }
}

//! Session-backed customer preferences.
//!
//! Preferences are a small versioned blob remembering the email a customer
//! last checked out with, so repeat checkouts can prefill it. Reads are
//! tolerant: anything absent, unreadable, or written by a newer release
//! loads as defaults.

use chrono::Utc;
use tower_sessions::Session;

use paperfold_core::Email;

use crate::models::preferences::{CURRENT_VERSION, CustomerPreferences};
use crate::models::session::keys;

/// Preference operations bound to one customer session.
pub struct PreferencesService<'a> {
    session: &'a Session,
}

impl<'a> PreferencesService<'a> {
    #[must_use]
    pub const fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Load preferences, falling back to defaults when the stored blob is
    /// absent, unreadable, or carries a version newer than this release
    /// understands.
    pub async fn load(&self) -> CustomerPreferences {
        match self
            .session
            .get::<CustomerPreferences>(keys::CUSTOMER_PREFERENCES)
            .await
        {
            Ok(Some(prefs)) if prefs.version <= CURRENT_VERSION => prefs,
            Ok(Some(prefs)) => {
                tracing::debug!(
                    version = prefs.version,
                    "Preferences written by a newer release, ignoring"
                );
                CustomerPreferences::default()
            }
            Ok(None) => CustomerPreferences::default(),
            Err(error) => {
                tracing::debug!(error = %error, "Unreadable preferences in session, using defaults");
                CustomerPreferences::default()
            }
        }
    }

    /// The email remembered from a previous checkout, if any.
    pub async fn saved_email(&self) -> Option<Email> {
        self.load().await.email
    }

    /// Record a checkout attempt: remember the email when one was used and
    /// stamp the attempt time. Called whether or not the checkout succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store rejects the write.
    pub async fn record_checkout(
        &self,
        email: Option<&Email>,
    ) -> Result<(), tower_sessions::session::Error> {
        let mut prefs = self.load().await;
        if let Some(email) = email {
            prefs.email = Some(email.clone());
        }
        prefs.last_checkout_at = Some(Utc::now());
        prefs.version = CURRENT_VERSION;
        self.save(&prefs).await
    }

    /// Forget all stored preferences.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store rejects the write.
    pub async fn clear(&self) -> Result<(), tower_sessions::session::Error> {
        self.session
            .remove::<CustomerPreferences>(keys::CUSTOMER_PREFERENCES)
            .await
            .map(|_| ())
    }

    async fn save(
        &self,
        prefs: &CustomerPreferences,
    ) -> Result<(), tower_sessions::session::Error> {
        self.session.insert(keys::CUSTOMER_PREFERENCES, prefs).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::{MemoryStore, Session};

    use super::*;

    fn test_session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn email(addr: &str) -> Email {
        addr.parse().unwrap()
    }

    #[tokio::test]
    async fn test_load_defaults_when_absent() {
        let session = test_session();
        let prefs = PreferencesService::new(&session).load().await;
        assert_eq!(prefs, CustomerPreferences::default());
    }

    #[tokio::test]
    async fn test_record_checkout_remembers_email() {
        let session = test_session();
        let service = PreferencesService::new(&session);

        service
            .record_checkout(Some(&email("a@example.com")))
            .await
            .unwrap();

        assert_eq!(service.saved_email().await, Some(email("a@example.com")));
        assert!(service.load().await.last_checkout_at.is_some());
    }

    #[tokio::test]
    async fn test_record_checkout_overwrites_previous_email() {
        let session = test_session();
        let service = PreferencesService::new(&session);

        service
            .record_checkout(Some(&email("first@example.com")))
            .await
            .unwrap();
        service
            .record_checkout(Some(&email("second@example.com")))
            .await
            .unwrap();

        assert_eq!(
            service.saved_email().await,
            Some(email("second@example.com"))
        );
    }

    #[tokio::test]
    async fn test_record_checkout_without_email_keeps_saved_one() {
        let session = test_session();
        let service = PreferencesService::new(&session);

        service
            .record_checkout(Some(&email("keep@example.com")))
            .await
            .unwrap();
        service.record_checkout(None).await.unwrap();

        assert_eq!(service.saved_email().await, Some(email("keep@example.com")));
    }

    #[tokio::test]
    async fn test_clear_forgets_preferences() {
        let session = test_session();
        let service = PreferencesService::new(&session);

        service
            .record_checkout(Some(&email("gone@example.com")))
            .await
            .unwrap();
        service.clear().await.unwrap();

        assert_eq!(service.saved_email().await, None);
    }

    #[tokio::test]
    async fn test_newer_version_loads_as_defaults() {
        let session = test_session();
        let newer = CustomerPreferences {
            email: Some(email("future@example.com")),
            last_checkout_at: Some(Utc::now()),
            version: CURRENT_VERSION + 1,
        };
        session
            .insert(keys::CUSTOMER_PREFERENCES, &newer)
            .await
            .unwrap();

        let prefs = PreferencesService::new(&session).load().await;
        assert_eq!(prefs, CustomerPreferences::default());
    }

    #[tokio::test]
    async fn test_corrupt_blob_loads_as_defaults() {
        let session = test_session();
        session
            .insert(keys::CUSTOMER_PREFERENCES, vec![1, 2, 3])
            .await
            .unwrap();

        let prefs = PreferencesService::new(&session).load().await;
        assert_eq!(prefs, CustomerPreferences::default());
    }
}

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::Mutex;

use crate::config::SessionConfig;
use crate::session::codec;
use crate::session::crypto::{KeyRing, decode_signed, encode_signed};
use crate::session::errors::SessionError;
use crate::session::types::{Session, SessionRecord};
use crate::storage::{CacheStore, build_cache_store};
use crate::utils::gen_random_string;

use super::SessionStore;

const SESSION_PREFIX: &str = "session";

/// Server-held strategy: the payload lives in the cache store under a random
/// 256-bit identifier; only the identifier travels in the cookie, signed by
/// default to block cookie substitution.
///
/// Concurrent requests carrying the same identifier race on
/// read-modify-write; the last writer wins. Two tabs mutating the same
/// session can lose each other's writes.
pub struct ServerSessionStore {
    cache: Mutex<Box<dyn CacheStore>>,
    keyring: KeyRing,
    sign_session_id: bool,
    ttl: u64,
}

impl ServerSessionStore {
    pub(crate) async fn from_config(
        config: &SessionConfig,
        keyring: KeyRing,
    ) -> Result<Self, SessionError> {
        let cache = build_cache_store(&config.cache_store)
            .await
            .map_err(|e| SessionError::Storage(e.to_string()))?;
        Ok(Self {
            cache: Mutex::new(cache),
            keyring,
            sign_session_id: config.sign_session_id,
            ttl: config.max_age,
        })
    }

    fn cookie_value(&self, session_id: &str) -> String {
        if self.sign_session_id {
            encode_signed(session_id.as_bytes(), &self.keyring)
        } else {
            session_id.to_string()
        }
    }

    fn session_id_from_cookie(&self, cookie_value: &str) -> Result<String, SessionError> {
        if self.sign_session_id {
            let payload = decode_signed(cookie_value, &self.keyring)?;
            String::from_utf8(payload)
                .map_err(|_| SessionError::Decode("Session identifier is not UTF-8".to_string()))
        } else {
            Ok(cookie_value.to_string())
        }
    }

    /// Fetch the record, lazily removing it when past its expiry.
    async fn fetch_record(&self, session_id: &str) -> Result<SessionRecord, SessionError> {
        let cached = self
            .cache
            .lock()
            .await
            .get(SESSION_PREFIX, session_id)
            .await
            .map_err(|e| SessionError::Storage(e.to_string()))?
            .ok_or(SessionError::NotFound)?;

        let record: SessionRecord = cached.try_into()?;

        if record.expires_at < Utc::now() {
            tracing::debug!("Session {session_id} expired at {}", record.expires_at);
            self.cache
                .lock()
                .await
                .remove(SESSION_PREFIX, session_id)
                .await
                .map_err(|e| SessionError::Storage(e.to_string()))?;
            return Err(SessionError::NotFound);
        }

        Ok(record)
    }

    /// Explicit invalidation by identifier, removing the record immediately.
    pub async fn destroy_by_id(&self, session_id: &str) -> Result<(), SessionError> {
        self.cache
            .lock()
            .await
            .remove(SESSION_PREFIX, session_id)
            .await
            .map_err(|e| SessionError::Storage(e.to_string()))
    }
}

#[async_trait]
impl SessionStore for ServerSessionStore {
    async fn load(&self, cookie_value: Option<&str>) -> Result<Session, SessionError> {
        let Some(value) = cookie_value else {
            return Ok(Session::new());
        };

        let session_id = match self.session_id_from_cookie(value) {
            Ok(id) => id,
            Err(err) if err.is_absorbed() => {
                tracing::debug!("Discarding session cookie: {err}");
                return Ok(Session::new());
            }
            Err(err) => return Err(err),
        };

        match self.fetch_record(&session_id).await {
            Ok(record) => match codec::decode(record.data.as_bytes()) {
                Ok(data) => Ok(Session::from_parts(Some(session_id), data)),
                Err(err) => {
                    tracing::debug!("Discarding corrupt session record: {err}");
                    Ok(Session::new())
                }
            },
            Err(err) if err.is_absorbed() => {
                tracing::debug!("No usable session for {session_id}: {err}");
                Ok(Session::new())
            }
            Err(err) => Err(err),
        }
    }

    async fn save(&self, session: &mut Session) -> Result<String, SessionError> {
        let session_id = match session.id() {
            Some(id) => id.to_string(),
            None => {
                // 32 random bytes, twice the 128-bit unguessability floor
                let id = gen_random_string(32)?;
                session.set_id(id.clone());
                id
            }
        };

        let payload = codec::encode(session.data())?;
        let data = String::from_utf8(payload).map_err(|e| SessionError::Decode(e.to_string()))?;

        let record = SessionRecord {
            id: session_id.clone(),
            data,
            expires_at: Utc::now() + Duration::seconds(self.ttl as i64),
            ttl: self.ttl,
        };

        // Last-writer-wins: no version check on the record.
        self.cache
            .lock()
            .await
            .put_with_ttl(SESSION_PREFIX, &session_id, record.into(), self.ttl as usize)
            .await
            .map_err(|e| SessionError::Storage(e.to_string()))?;

        session.mark_clean();
        Ok(self.cookie_value(&session_id))
    }

    async fn destroy(&self, session: &mut Session) -> Result<(), SessionError> {
        if let Some(id) = session.id().map(str::to_string) {
            self.destroy_by_id(&id).await?;
        }
        session.reset();
        Ok(())
    }
}

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};

use crate::config::SessionConfig;
use crate::session::codec;
use crate::session::crypto::{KeyRing, decode_signed, encode_signed};
use crate::session::errors::SessionError;
use crate::session::types::Session;

use super::SessionStore;

/// Client-held strategy: the whole payload travels in the cookie, signed
/// with the current key or sealed when encryption is enabled. Nothing is
/// kept server-side, so the state is visible to the client in the sign-only
/// mode and must not carry values the client may not read.
pub struct CookieSessionStore {
    keyring: KeyRing,
    cookie_name: String,
    encrypt: bool,
    size_limit: usize,
}

impl CookieSessionStore {
    pub(crate) fn new(config: &SessionConfig, keyring: KeyRing) -> Self {
        Self {
            keyring,
            cookie_name: config.cookie_name.clone(),
            encrypt: config.encrypt,
            size_limit: config.cookie_size_limit,
        }
    }

    fn decode_value(&self, cookie_value: &str) -> Result<Session, SessionError> {
        let payload = if self.encrypt {
            let blob = STANDARD
                .decode(cookie_value)
                .map_err(|_| SessionError::Decode("Invalid base64 blob".to_string()))?;
            self.keyring.open(&blob).ok_or(SessionError::Tamper)?
        } else {
            decode_signed(cookie_value, &self.keyring)?
        };
        let data = codec::decode(&payload)?;
        Ok(Session::from_parts(None, data))
    }
}

#[async_trait]
impl SessionStore for CookieSessionStore {
    async fn load(&self, cookie_value: Option<&str>) -> Result<Session, SessionError> {
        let Some(value) = cookie_value else {
            return Ok(Session::new());
        };
        match self.decode_value(value) {
            Ok(session) => Ok(session),
            Err(err) if err.is_absorbed() => {
                tracing::debug!("Discarding session cookie: {err}");
                Ok(Session::new())
            }
            Err(err) => Err(err),
        }
    }

    async fn save(&self, session: &mut Session) -> Result<String, SessionError> {
        let payload = codec::encode(session.data())?;
        let value = if self.encrypt {
            STANDARD.encode(self.keyring.seal(&payload)?)
        } else {
            encode_signed(&payload, &self.keyring)
        };

        // `name=value` must fit the platform cookie ceiling; exceeding it is
        // a deployment error, not something to truncate.
        let cookie_len = self.cookie_name.len() + 1 + value.len();
        if cookie_len > self.size_limit {
            return Err(SessionError::Config(format!(
                "Session cookie is {cookie_len} bytes, exceeding the {}-byte limit; \
                 move large values to the server-backed store",
                self.size_limit
            )));
        }

        session.mark_clean();
        Ok(value)
    }

    async fn destroy(&self, session: &mut Session) -> Result<(), SessionError> {
        // All state is client-held; expiring the cookie is the whole job.
        session.reset();
        Ok(())
    }
}

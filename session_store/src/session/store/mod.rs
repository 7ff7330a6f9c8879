mod cookie;
mod server;

pub use cookie::CookieSessionStore;
pub use server::ServerSessionStore;

use async_trait::async_trait;
use http::header::{COOKIE, HeaderMap};

use crate::config::{SessionConfig, StoreKind};
use crate::session::crypto::KeyRing;
use crate::session::errors::SessionError;
use crate::session::types::Session;
use crate::utils::header_set_cookie;

/// One session persistence strategy. Exactly one implementation is active
/// per process, chosen by [`SessionManager::new`].
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Materialize the session carried by the request cookie value.
    /// Tampered, malformed, missing and expired state all yield a fresh
    /// empty session; only datastore faults surface as errors.
    async fn load(&self, cookie_value: Option<&str>) -> Result<Session, SessionError>;

    /// Persist the session and return the outgoing cookie value. Fails with
    /// a `Config` error when the encoded form cannot legally be emitted.
    async fn save(&self, session: &mut Session) -> Result<String, SessionError>;

    /// Invalidate the session, removing any server-side state and leaving
    /// the session fresh.
    async fn destroy(&self, session: &mut Session) -> Result<(), SessionError>;
}

/// Owns the store selected at startup and the request-boundary plumbing
/// around it.
///
/// The selection is immutable for the process lifetime; switching strategies
/// means constructing a new manager, i.e. restarting the application.
pub struct SessionManager {
    config: SessionConfig,
    store: Box<dyn SessionStore>,
}

impl SessionManager {
    /// Validate the key material and build the configured store.
    ///
    /// # Arguments
    /// * `config` - The process-wide session configuration
    ///
    /// # Returns
    /// * `Result<Self, SessionError>` - The manager, or a `Config` error on
    ///   missing key material / an unreachable datastore error
    pub async fn new(config: SessionConfig) -> Result<Self, SessionError> {
        let keyring = KeyRing::new(
            config.secret_key_base.clone(),
            config.key_rotation_list.clone(),
        )?;

        let store: Box<dyn SessionStore> = match config.store_kind {
            StoreKind::Cookie => Box::new(CookieSessionStore::new(&config, keyring)),
            StoreKind::Server => {
                Box::new(ServerSessionStore::from_config(&config, keyring).await?)
            }
        };

        tracing::info!("Initialized {:?} session store", config.store_kind);
        Ok(Self { config, store })
    }

    /// The store chosen at startup, for middleware that drives it directly.
    pub fn active_store(&self) -> &dyn SessionStore {
        self.store.as_ref()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Load the session for a request from its headers. A missing, garbled
    /// or invalid cookie yields a fresh empty session.
    pub async fn load_from_headers(&self, headers: &HeaderMap) -> Result<Session, SessionError> {
        let cookie_value =
            match session_cookie_from_headers(headers, &self.config.cookie_name) {
                Ok(value) => value,
                Err(err) => {
                    tracing::debug!("Discarding unreadable cookie header: {err}");
                    None
                }
            };
        self.store.load(cookie_value).await
    }

    /// Persist a dirty session and produce the response headers carrying the
    /// session cookie. A clean session produces no headers.
    pub async fn save_to_headers(
        &self,
        session: &mut Session,
    ) -> Result<HeaderMap, SessionError> {
        let mut headers = HeaderMap::new();
        if !session.is_dirty() {
            return Ok(headers);
        }

        let value = self.store.save(session).await?;
        header_set_cookie(
            &mut headers,
            &self.config.cookie_name,
            &value,
            self.config.max_age as i64,
            self.config.secure,
            self.config.same_site,
        )?;
        Ok(headers)
    }

    /// Prepare a logout response: remove any server-side record and expire
    /// the session cookie on the client.
    ///
    /// # Arguments
    /// * `cookies` - The cookies from the request
    ///
    /// # Returns
    /// * `Result<HeaderMap, SessionError>` - The headers with the logout
    ///   response, or an error
    pub async fn prepare_logout_response(
        &self,
        cookies: headers::Cookie,
    ) -> Result<HeaderMap, SessionError> {
        let mut headers = HeaderMap::new();
        header_set_cookie(
            &mut headers,
            &self.config.cookie_name,
            "",
            -86400,
            self.config.secure,
            self.config.same_site,
        )?;

        if let Some(value) = cookies.get(&self.config.cookie_name) {
            let mut session = self.store.load(Some(value)).await?;
            self.store.destroy(&mut session).await?;
        }
        Ok(headers)
    }

    /// Destroy a session directly (explicit logout with the session in
    /// hand), returning the headers that expire the cookie.
    pub async fn destroy(&self, session: &mut Session) -> Result<HeaderMap, SessionError> {
        self.store.destroy(session).await?;

        let mut headers = HeaderMap::new();
        header_set_cookie(
            &mut headers,
            &self.config.cookie_name,
            "",
            -86400,
            self.config.secure,
            self.config.same_site,
        )?;
        Ok(headers)
    }
}

/// Extract the raw session cookie value from a request's headers.
pub fn session_cookie_from_headers<'a>(
    headers: &'a HeaderMap,
    cookie_name: &str,
) -> Result<Option<&'a str>, SessionError> {
    let Some(cookie_header) = headers.get(COOKIE) else {
        tracing::debug!("No cookie header found");
        return Ok(None);
    };

    let cookie_str = cookie_header
        .to_str()
        .map_err(|_| SessionError::Cookie("Invalid cookie header".to_string()))?;

    let value = cookie_str.split(';').map(|s| s.trim()).find_map(|s| {
        let mut parts = s.splitn(2, '=');
        match (parts.next(), parts.next()) {
            (Some(k), Some(v)) if k == cookie_name => Some(v),
            _ => None,
        }
    });

    if value.is_none() {
        tracing::debug!("No session cookie '{cookie_name}' found in cookies");
    }

    Ok(value)
}

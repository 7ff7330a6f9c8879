use std::env;
use std::fmt;

use crate::session::SessionError;

pub(crate) const DEFAULT_COOKIE_NAME: &str = "__Host-Session";
pub(crate) const DEFAULT_MAX_AGE: u64 = 600;
/// Conventional browser limit for a single cookie, name and value included.
pub(crate) const DEFAULT_COOKIE_SIZE_LIMIT: usize = 4096;

/// Which session strategy the process runs with. Chosen once at startup,
/// immutable until restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// Entire payload lives in the (signed or sealed) cookie.
    Cookie,
    /// Payload lives in the datastore; the cookie carries an identifier.
    Server,
}

impl StoreKind {
    pub(crate) fn parse(kind: &str) -> Result<Self, SessionError> {
        match kind {
            "cookie" => Ok(Self::Cookie),
            "server" => Ok(Self::Server),
            other => Err(SessionError::Config(format!(
                "Unsupported session store kind: {other}. Supported kinds are 'cookie' and 'server'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    pub(crate) fn parse(value: &str) -> Result<Self, SessionError> {
        match value {
            "Strict" | "strict" => Ok(Self::Strict),
            "Lax" | "lax" => Ok(Self::Lax),
            "None" | "none" => Ok(Self::None),
            other => Err(SessionError::Config(format!(
                "Unsupported SameSite policy: {other}. Supported policies are 'Strict', 'Lax' and 'None'"
            ))),
        }
    }
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => write!(f, "Strict"),
            Self::Lax => write!(f, "Lax"),
            Self::None => write!(f, "None"),
        }
    }
}

/// Backend for the server-side store. Ignored when `StoreKind::Cookie` is
/// selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheStoreKind {
    Memory,
    Redis { url: String },
}

/// Process-wide session configuration, constructed once at startup and passed
/// by reference into request handling. There is no mutable global; swapping
/// the store kind requires building a new manager (i.e. a restart).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub store_kind: StoreKind,
    /// Name of the session cookie.
    pub cookie_name: String,
    /// Current signing key. Must be non-empty.
    pub secret_key_base: Vec<u8>,
    /// Rotated-out keys, newest first. Still valid for verification.
    pub key_rotation_list: Vec<Vec<u8>>,
    /// Session lifetime in seconds; also the cookie Max-Age.
    pub max_age: u64,
    pub same_site: SameSite,
    pub secure: bool,
    /// Seal the cookie payload with AEAD instead of signing it in cleartext.
    pub encrypt: bool,
    /// Sign the session identifier cookie of the server-backed store.
    pub sign_session_id: bool,
    /// Ceiling for the emitted `name=value` pair, in bytes.
    pub cookie_size_limit: usize,
    pub cache_store: CacheStoreKind,
}

impl SessionConfig {
    pub fn new(store_kind: StoreKind, secret_key_base: impl Into<Vec<u8>>) -> Self {
        Self {
            store_kind,
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            secret_key_base: secret_key_base.into(),
            key_rotation_list: Vec::new(),
            max_age: DEFAULT_MAX_AGE,
            same_site: SameSite::Lax,
            secure: true,
            encrypt: false,
            sign_session_id: true,
            cookie_size_limit: DEFAULT_COOKIE_SIZE_LIMIT,
            cache_store: CacheStoreKind::Memory,
        }
    }

    /// Read the configuration from `SESSION_*` environment variables, after
    /// loading a `.env` file when one is present.
    ///
    /// # Returns
    /// * `Result<Self, SessionError>` - The configuration, or a `Config`
    ///   error when a required variable is missing or a value is unsupported
    pub fn from_env() -> Result<Self, SessionError> {
        dotenvy::dotenv().ok();

        let secret_key_base = env::var("SESSION_SECRET_KEY_BASE")
            .map_err(|_| SessionError::Config("SESSION_SECRET_KEY_BASE must be set".to_string()))?
            .into_bytes();

        let store_kind = match env::var("SESSION_STORE_KIND") {
            Ok(kind) => StoreKind::parse(&kind)?,
            Err(_) => StoreKind::Cookie,
        };

        let key_rotation_list = env::var("SESSION_KEY_ROTATION")
            .map(|keys| {
                keys.split(',')
                    .filter(|key| !key.is_empty())
                    .map(|key| key.as_bytes().to_vec())
                    .collect()
            })
            .unwrap_or_default();

        let same_site = match env::var("SESSION_SAME_SITE") {
            Ok(policy) => SameSite::parse(&policy)?,
            Err(_) => SameSite::Lax,
        };

        let cache_store = match env::var("SESSION_CACHE_STORE_TYPE").as_deref() {
            Ok("memory") | Err(_) => CacheStoreKind::Memory,
            Ok("redis") => {
                let url = env::var("SESSION_CACHE_STORE_URL").map_err(|_| {
                    SessionError::Config(
                        "SESSION_CACHE_STORE_URL must be set for the redis cache store".to_string(),
                    )
                })?;
                CacheStoreKind::Redis { url }
            }
            Ok(other) => {
                return Err(SessionError::Config(format!(
                    "Unsupported cache store type: {other}. Supported types are 'memory' and 'redis'"
                )));
            }
        };

        Ok(Self {
            store_kind,
            cookie_name: env::var("SESSION_COOKIE_NAME")
                .unwrap_or_else(|_| DEFAULT_COOKIE_NAME.to_string()),
            secret_key_base,
            key_rotation_list,
            max_age: env::var("SESSION_COOKIE_MAX_AGE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_MAX_AGE),
            same_site,
            secure: env_flag("SESSION_COOKIE_SECURE", true),
            encrypt: env_flag("SESSION_ENCRYPT", false),
            sign_session_id: env_flag("SESSION_SIGN_SESSION_ID", true),
            cookie_size_limit: env::var("SESSION_COOKIE_SIZE_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_COOKIE_SIZE_LIMIT),
            cache_store,
        })
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

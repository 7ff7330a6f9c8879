//! session-store - switchable session persistence for web applications
//!
//! This crate provides the mechanism by which per-client session data is
//! persisted across requests and protected against tampering. Two strategies
//! are available behind one interface: a cookie store holding the whole
//! signed (or sealed) payload client-side, and a server store holding the
//! payload in a key-value datastore with only an opaque identifier in the
//! cookie. The strategy is chosen once at startup and is immutable for the
//! process lifetime.

mod config;
mod session;
mod storage;
mod utils;

pub use config::{CacheStoreKind, SameSite, SessionConfig, StoreKind};
pub use session::{
    CookieSessionStore, ServerSessionStore, Session, SessionError, SessionManager, SessionMap,
    SessionStore, session_cookie_from_headers,
};
pub use utils::{UtilError, gen_random_string};

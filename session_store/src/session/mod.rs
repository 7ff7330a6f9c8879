mod codec;
mod crypto;
mod errors;
mod store;
mod types;

pub use codec::SessionMap;
pub use errors::SessionError;
pub use store::{
    CookieSessionStore, ServerSessionStore, SessionManager, SessionStore,
    session_cookie_from_headers,
};
pub use types::Session;

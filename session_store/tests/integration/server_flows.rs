use http::HeaderMap;
use http::header::{COOKIE, SET_COOKIE};

use session_store::{SessionConfig, SessionManager, StoreKind};

fn replay_headers(response: &HeaderMap) -> HeaderMap {
    let set_cookie = response.get(SET_COOKIE).unwrap().to_str().unwrap();
    let pair = set_cookie.split(';').next().unwrap();
    let mut request = HeaderMap::new();
    request.insert(COOKIE, pair.parse().unwrap());
    request
}

#[tokio::test]
async fn full_request_cycle_keeps_payload_server_side() {
    let manager = SessionManager::new(SessionConfig::new(StoreKind::Server, "secret-key"))
        .await
        .unwrap();

    let mut session = manager.load_from_headers(&HeaderMap::new()).await.unwrap();
    session.insert("user_id", 42).unwrap();
    let response = manager.save_to_headers(&mut session).await.unwrap();

    // Only the identifier travels: the encoded payload must not appear in
    // the cookie
    let set_cookie = response.get(SET_COOKIE).unwrap().to_str().unwrap();
    assert!(!set_cookie.contains("eyJ1c2VyX2lkIjo0Mn0="));

    let request = replay_headers(&response);
    let loaded = manager.load_from_headers(&request).await.unwrap();
    assert_eq!(loaded.get::<i64>("user_id"), Some(42));
    assert_eq!(loaded.id(), session.id());
}

#[tokio::test]
async fn destroyed_sessions_stay_destroyed() {
    let manager = SessionManager::new(SessionConfig::new(StoreKind::Server, "secret-key"))
        .await
        .unwrap();

    let mut session = manager.load_from_headers(&HeaderMap::new()).await.unwrap();
    session.insert("user_id", 42).unwrap();
    let response = manager.save_to_headers(&mut session).await.unwrap();
    let request = replay_headers(&response);

    // Logout removes the record; replaying the stale cookie yields a fresh
    // session, not an error
    manager.destroy(&mut session).await.unwrap();
    let loaded = manager.load_from_headers(&request).await.unwrap();
    assert!(loaded.is_empty());
    assert!(loaded.id().is_none());
}

#[tokio::test]
async fn concurrent_tabs_last_writer_wins() {
    let manager = SessionManager::new(SessionConfig::new(StoreKind::Server, "secret-key"))
        .await
        .unwrap();

    let mut session = manager.load_from_headers(&HeaderMap::new()).await.unwrap();
    session.insert("user_id", 42).unwrap();
    let response = manager.save_to_headers(&mut session).await.unwrap();
    let request = replay_headers(&response);

    // Two tabs load the same session and write different keys
    let mut first = manager.load_from_headers(&request).await.unwrap();
    let mut second = manager.load_from_headers(&request).await.unwrap();
    first.insert("theme", "dark").unwrap();
    manager.save_to_headers(&mut first).await.unwrap();
    second.insert("locale", "de").unwrap();
    manager.save_to_headers(&mut second).await.unwrap();

    // The second writer's snapshot is the surviving state
    let loaded = manager.load_from_headers(&request).await.unwrap();
    assert_eq!(loaded.get::<String>("locale"), Some("de".to_string()));
    assert_eq!(loaded.get::<String>("theme"), None);
    assert_eq!(loaded.get::<i64>("user_id"), Some(42));
}

#[tokio::test]
async fn stolen_identifier_without_valid_signature_is_rejected() {
    let manager = SessionManager::new(SessionConfig::new(StoreKind::Server, "secret-key"))
        .await
        .unwrap();

    let mut session = manager.load_from_headers(&HeaderMap::new()).await.unwrap();
    session.insert("user_id", 42).unwrap();
    manager.save_to_headers(&mut session).await.unwrap();

    // An attacker who learns the raw identifier but not the signing key
    // cannot fabricate a valid cookie
    let cookie_name = manager.config().cookie_name.clone();
    let bare_id = session.id().unwrap().to_string();
    let mut request = HeaderMap::new();
    request.insert(
        COOKIE,
        format!("{cookie_name}={bare_id}").parse().unwrap(),
    );

    let loaded = manager.load_from_headers(&request).await.unwrap();
    assert!(loaded.is_empty());
}

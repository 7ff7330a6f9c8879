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
async fn full_request_cycle() {
    let manager = SessionManager::new(SessionConfig::new(StoreKind::Cookie, "secret-key"))
        .await
        .unwrap();

    // First request: no cookie, fresh session
    let mut session = manager.load_from_headers(&HeaderMap::new()).await.unwrap();
    assert!(session.is_empty());

    // Login handler stores the user id
    session.insert("user_id", 42).unwrap();
    let response = manager.save_to_headers(&mut session).await.unwrap();
    let set_cookie = response.get(SET_COOKIE).unwrap().to_str().unwrap();
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("Max-Age=600"));

    // Next request carries the cookie back
    let request = replay_headers(&response);
    let loaded = manager.load_from_headers(&request).await.unwrap();
    assert_eq!(loaded.get::<i64>("user_id"), Some(42));
}

#[tokio::test]
async fn tampered_signature_is_absorbed() {
    let manager = SessionManager::new(SessionConfig::new(StoreKind::Cookie, "secret-key"))
        .await
        .unwrap();

    let mut session = manager.load_from_headers(&HeaderMap::new()).await.unwrap();
    session.insert("user_id", 42).unwrap();
    let response = manager.save_to_headers(&mut session).await.unwrap();

    // Corrupt one signature byte in the replayed cookie
    let set_cookie = response.get(SET_COOKIE).unwrap().to_str().unwrap();
    let pair = set_cookie.split(';').next().unwrap();
    let sep = pair.rfind("--").unwrap();
    let mut tampered = pair.to_string().into_bytes();
    tampered[sep + 3] = if tampered[sep + 3] == b'A' { b'B' } else { b'A' };
    let tampered = String::from_utf8(tampered).unwrap();

    let mut request = HeaderMap::new();
    request.insert(COOKIE, tampered.parse().unwrap());

    // The request still succeeds, with a fresh anonymous session
    let loaded = manager.load_from_headers(&request).await.unwrap();
    assert!(loaded.is_empty());
}

#[tokio::test]
async fn rotation_survives_restart() {
    // A cookie minted before the rotation...
    let old_manager = SessionManager::new(SessionConfig::new(StoreKind::Cookie, "k_old"))
        .await
        .unwrap();
    let mut session = old_manager.load_from_headers(&HeaderMap::new()).await.unwrap();
    session.insert("user_id", 42).unwrap();
    let response = old_manager.save_to_headers(&mut session).await.unwrap();
    let request = replay_headers(&response);

    // ...still loads under the restarted process that keeps k_old in the ring
    let mut rotated_config = SessionConfig::new(StoreKind::Cookie, "k_new");
    rotated_config.key_rotation_list = vec![b"k_old".to_vec()];
    let rotated_manager = SessionManager::new(rotated_config).await.unwrap();
    let loaded = rotated_manager.load_from_headers(&request).await.unwrap();
    assert_eq!(loaded.get::<i64>("user_id"), Some(42));

    // ...and is gone once k_old is dropped from the ring
    let final_manager = SessionManager::new(SessionConfig::new(StoreKind::Cookie, "k_new"))
        .await
        .unwrap();
    let loaded = final_manager.load_from_headers(&request).await.unwrap();
    assert!(loaded.is_empty());
}

#[tokio::test]
async fn sealed_sessions_round_trip_and_hide_the_payload() {
    let mut config = SessionConfig::new(StoreKind::Cookie, "secret-key");
    config.encrypt = true;
    let manager = SessionManager::new(config).await.unwrap();

    let mut session = manager.load_from_headers(&HeaderMap::new()).await.unwrap();
    session.insert("user_id", 42).unwrap();
    let response = manager.save_to_headers(&mut session).await.unwrap();

    // The sign-only wire would leak the payload as base64
    let set_cookie = response.get(SET_COOKIE).unwrap().to_str().unwrap();
    assert!(!set_cookie.contains("eyJ1c2VyX2lkIjo0Mn0="));

    let request = replay_headers(&response);
    let loaded = manager.load_from_headers(&request).await.unwrap();
    assert_eq!(loaded.get::<i64>("user_id"), Some(42));
}

#[tokio::test]
async fn logout_expires_the_cookie() {
    let manager = SessionManager::new(SessionConfig::new(StoreKind::Cookie, "secret-key"))
        .await
        .unwrap();

    let mut session = manager.load_from_headers(&HeaderMap::new()).await.unwrap();
    session.insert("user_id", 42).unwrap();
    manager.save_to_headers(&mut session).await.unwrap();

    let logout = manager.destroy(&mut session).await.unwrap();
    let set_cookie = logout.get(SET_COOKIE).unwrap().to_str().unwrap();
    assert!(set_cookie.contains("Max-Age=-86400"));
    assert!(session.is_empty());
}

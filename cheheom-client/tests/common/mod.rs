#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use cheheom_api::config::AppConfig;
use cheheom_api::{build_router, AppState};
use cheheom_client::{ClientConfig, LocalStore, Session};
use cheheom_shared::clients::kv::KvStore;
use cheheom_shared::types::{Product, SignupRequest, UserType};

/// Start the API on an ephemeral port with an in-memory store.
pub async fn spawn_server(config: AppConfig) -> SocketAddr {
    let app = build_router(Arc::new(AppState {
        config,
        store: KvStore::memory(),
        metrics_handle: None,
    }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

pub fn client_config(addr: SocketAddr) -> ClientConfig {
    ClientConfig {
        base_url: format!("http://{addr}/api"),
        legacy_prefix: String::new(),
        timeout_ms: 5_000,
        ..ClientConfig::default()
    }
}

pub fn session(config: &ClientConfig, store: LocalStore) -> Session {
    Session::with_store(config, store).unwrap()
}

pub fn signup(email: &str, user_type: UserType) -> SignupRequest {
    SignupRequest {
        email: email.into(),
        password: "secret1".into(),
        name: "테스터".into(),
        phone: "010-0000-0000".into(),
        user_type: Some(user_type),
        business_name: (user_type == UserType::Business).then(|| "동네식당".into()),
        business_number: None,
        business_address: None,
    }
}

/// Sign up and sign in a fresh account on its own store.
pub async fn signed_in(config: &ClientConfig, email: &str, user_type: UserType) -> Session {
    let mut session = session(config, LocalStore::in_memory());
    session.sign_up(signup(email, user_type)).await.unwrap();
    session.sign_in(email, "secret1").await.unwrap();
    session
}

/// Sign in an existing account on a fresh store.
pub async fn signed_in_again(config: &ClientConfig, email: &str) -> Session {
    let mut session = session(config, LocalStore::in_memory());
    session.sign_in(email, "secret1").await.unwrap();
    session
}

pub fn draft_product() -> Product {
    Product {
        id: String::new(),
        name: "할머니 손맛 김치찌개".into(),
        seller: "동네식당".into(),
        category: "한식".into(),
        location: "서울시 마포구".into(),
        latitude: None,
        longitude: None,
        image: "https://example.com/a.jpg".into(),
        review_count: 0,
        description: "집밥 같은 김치찌개".into(),
        application_deadline: "12.20(금) - 12.25(수)".into(),
        required_reviewers: 10,
        current_applicants: 0,
        like_count: 0,
        distance: "1.2km".into(),
        badge: None,
        owner_id: None,
        created_at: None,
    }
}

#![allow(clippy::unwrap_used)]
// End-to-end tests for the model services against a wiremock server.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use galleria_api::{RestClient, TransportConfig};
use galleria_core::services::strings::string_value;
use galleria_core::{
    CoreError, EntityKind, Pk, Registry, UserSession, Value, YearMonth, string_table,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, Arc<Registry>) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&format!("{}/api", server.uri())).unwrap();
    let client = RestClient::new(base_url, &TransportConfig::default()).unwrap();
    (server, Registry::new(client))
}

// ── Listing & caching ───────────────────────────────────────────────

#[tokio::test]
async fn test_list_populates_the_cache_in_server_order() {
    let (server, registry) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/piece"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "name": "Sunrise" },
            { "id": 2, "name": "Dusk" }
        ])))
        .mount(&server)
        .await;

    let pieces = registry.service(EntityKind::Piece).unwrap();
    let listed = pieces.list().await.unwrap();

    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].get("name"), Some(Value::from("Sunrise")));
    assert_eq!(listed[1].pk(), Some(Pk::Int(2)));

    let cached = pieces.cached();
    assert_eq!(cached.len(), 2);
    assert!(cached[0].same_instance(&listed[0]));
    assert!(cached[1].same_instance(&listed[1]));
}

#[tokio::test]
async fn test_relisting_preserves_instance_identity() {
    let (server, registry) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/piece"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "name": "Sunrise" }
        ])))
        .mount(&server)
        .await;

    let pieces = registry.service(EntityKind::Piece).unwrap();
    let first = pieces.list().await.unwrap();
    let second = pieces.list().await.unwrap();

    assert!(second[0].same_instance(&first[0]));
    assert_eq!(pieces.cached().len(), 1);
}

#[tokio::test]
async fn test_lazy_list_skips_the_network_once_cached() {
    let (server, registry) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/category"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 4, "name": "Oils" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let categories = registry.service(EntityKind::Category).unwrap();
    let first = categories.lazy_list().await.unwrap();
    let second = categories.lazy_list().await.unwrap();

    assert_eq!(first.len(), 1);
    assert!(second[0].same_instance(&first[0]));
}

#[tokio::test]
async fn test_lazy_list_is_not_satisfied_by_cached_stubs() {
    let (server, registry) = setup().await;

    // Listing pieces seeds the category cache with a pk-only stub.
    Mock::given(method("GET"))
        .and(path("/api/piece"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "name": "Sunrise", "category": 4 }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/category"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 4, "name": "Oils" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let pieces = registry.service(EntityKind::Piece).unwrap();
    let categories = registry.service(EntityKind::Category).unwrap();
    pieces.list().await.unwrap();
    assert!(categories.cached()[0].is_stub());

    // The stub-only cache must not short-circuit the fetch.
    let listed = categories.lazy_list().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert!(!listed[0].is_stub());
    assert_eq!(listed[0].get("name"), Some(Value::from("Oils")));

    // Once fully loaded, the cache serves (the `.expect(1)` above holds).
    let again = categories.lazy_list().await.unwrap();
    assert!(again[0].same_instance(&listed[0]));
}

#[tokio::test]
async fn test_nested_categories_deduplicate_to_one_instance() {
    let (server, registry) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/piece"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "name": "Sunrise", "category": { "id": 4, "name": "Oils" } },
            { "id": 2, "name": "Dusk", "category": { "id": 4, "name": "Oils" } }
        ])))
        .mount(&server)
        .await;

    let pieces = registry.service(EntityKind::Piece).unwrap();
    let listed = pieces.list().await.unwrap();

    let first_cat = listed[0].get("category").unwrap();
    let second_cat = listed[1].get("category").unwrap();
    assert!(
        first_cat
            .as_link()
            .unwrap()
            .same_instance(second_cat.as_link().unwrap())
    );

    // The shared category knows both pieces.
    let category = registry
        .service(EntityKind::Category)
        .unwrap()
        .from_cache(&Pk::Int(4))
        .unwrap();
    let members = category.get("pieces").unwrap();
    assert_eq!(members.as_link_list().unwrap().len(), 2);
}

#[tokio::test]
async fn test_a_full_category_fetch_fills_linked_stubs_in_place() {
    let (server, registry) = setup().await;

    // Pieces arrive first, linking categories by bare pk.
    Mock::given(method("GET"))
        .and(path("/api/piece"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "name": "Sunrise", "category": 4 }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/category"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 4, "name": "Oils" }
        ])))
        .mount(&server)
        .await;

    let pieces = registry.service(EntityKind::Piece).unwrap();
    let categories = registry.service(EntityKind::Category).unwrap();

    let listed = pieces.list().await.unwrap();
    let linked = listed[0].get("category").unwrap().as_link().unwrap().clone();
    assert!(linked.is_stub());
    assert_eq!(linked.get("name"), None);

    categories.list().await.unwrap();

    // Same allocation, now fully loaded. The piece never had to be told.
    assert!(!linked.is_stub());
    assert_eq!(linked.get("name"), Some(Value::from("Oils")));
    let held = listed[0].get("category").unwrap();
    assert!(held.as_link().unwrap().same_instance(&linked));
}

// ── Retrieval ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_retrieve_converts_price_and_date() {
    let (server, registry) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/piece/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1,
            "name": "Sunrise",
            "price": "150.00",
            "date": "2013-07"
        })))
        .mount(&server)
        .await;

    let pieces = registry.service(EntityKind::Piece).unwrap();
    let piece = pieces.retrieve(&Pk::Int(1)).await.unwrap();

    assert_eq!(piece.get("price"), Some(Value::Float(150.0)));
    assert_eq!(
        piece.get("date"),
        Some(Value::YearMonth(YearMonth::new(2013, Some(7))))
    );
}

#[tokio::test]
async fn test_lazy_retrieve_prefers_the_cache_but_not_stubs() {
    let (server, registry) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/piece"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "name": "Sunrise", "category": 4 }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/category/4"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "id": 4, "name": "Oils" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let pieces = registry.service(EntityKind::Piece).unwrap();
    let categories = registry.service(EntityKind::Category).unwrap();
    let listed = pieces.list().await.unwrap();

    // A cached full instance short-circuits.
    let piece = pieces.lazy_retrieve(&Pk::Int(1)).await.unwrap();
    assert!(piece.same_instance(&listed[0]));

    // A cached stub does not; it is fetched and filled in place.
    let category = categories.lazy_retrieve(&Pk::Int(4)).await.unwrap();
    assert!(!category.is_stub());
    assert_eq!(category.get("name"), Some(Value::from("Oils")));
}

#[tokio::test]
async fn test_retrieve_missing_surfaces_the_detail_message() {
    let (server, registry) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/piece/99"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "detail": "Not found." })))
        .mount(&server)
        .await;

    let pieces = registry.service(EntityKind::Piece).unwrap();
    match pieces.retrieve(&Pk::Int(99)).await {
        Err(CoreError::Api { message, status }) => {
            assert_eq!(message, "Not found.");
            assert_eq!(status, Some(404));
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

// ── Writes ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_create_caches_the_response_and_notifies() {
    let (server, registry) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/category"))
        .and(body_json(json!({ "name": "Prints" })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({ "id": 7, "name": "Prints" })),
        )
        .mount(&server)
        .await;

    let categories = registry.service(EntityKind::Category).unwrap();
    let created_seen = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&created_seen);
    categories.observe_creations(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    // The update stream stays quiet for creates.
    let updated_seen = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&updated_seen);
    categories.observe_updates(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    let mut data = galleria_core::ClientDict::new();
    data.insert("name".to_owned(), Value::from("Prints"));
    let created = categories.create(&data).await.unwrap();

    assert_eq!(created.pk(), Some(Pk::Int(7)));
    assert!(categories.from_cache(&Pk::Int(7)).unwrap().same_instance(&created));
    assert_eq!(created_seen.load(Ordering::SeqCst), 1);
    assert_eq!(updated_seen.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_update_mutates_the_cached_instance_in_place() {
    let (server, registry) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/piece"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "name": "Sunrise", "price": "100.00" }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/api/piece/1"))
        .and(body_json(json!({ "price": "150.00" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1,
            "name": "Sunrise",
            "price": "150.00"
        })))
        .mount(&server)
        .await;

    let pieces = registry.service(EntityKind::Piece).unwrap();
    let listed = pieces.list().await.unwrap();
    let piece = listed[0].clone();

    let notified = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&notified);
    pieces.observe_updates(move |updated| {
        assert_eq!(updated.pk(), Some(Pk::Int(1)));
        seen.fetch_add(1, Ordering::SeqCst);
    });

    let mut data = galleria_core::ClientDict::new();
    data.insert("price".to_owned(), Value::Float(150.0));
    let response = piece.update(&data).await.unwrap();

    // The response dict is in client format...
    assert_eq!(response.get("price"), Some(&Value::Float(150.0)));
    // ...the cached instance picked up the change in place...
    assert_eq!(piece.get("price"), Some(Value::Float(150.0)));
    assert_eq!(pieces.cached().len(), 1);
    // ...and observers heard about it.
    assert_eq!(notified.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_update_of_an_uncached_pk_appends_to_the_cache() {
    let (server, registry) = setup().await;

    Mock::given(method("PATCH"))
        .and(path("/api/piece/5"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "id": 5, "name": "New" })),
        )
        .mount(&server)
        .await;

    let pieces = registry.service(EntityKind::Piece).unwrap();
    let mut data = galleria_core::ClientDict::new();
    data.insert("name".to_owned(), Value::from("New"));
    pieces.update(&Pk::Int(5), &data).await.unwrap();

    assert!(pieces.from_cache(&Pk::Int(5)).is_some());
}

#[tokio::test]
async fn test_category_piece_lists_cannot_be_written() {
    let (_server, registry) = setup().await;

    let categories = registry.service(EntityKind::Category).unwrap();
    let mut data = galleria_core::ClientDict::new();
    data.insert("pieces".to_owned(), Value::LinkList(Vec::new()));

    match categories.update(&Pk::Int(4), &data).await {
        Err(CoreError::UnwritableField { field }) => assert_eq!(field, "pieces"),
        other => panic!("expected UnwritableField, got {other:?}"),
    }
}

#[tokio::test]
async fn test_an_image_upload_goes_multipart_and_refreshes_the_category() {
    let (server, registry) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/piece"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "name": "Sunrise", "category": { "id": 4, "name": "Oils" } }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/api/piece/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1,
            "name": "Sunrise",
            "image": "images/pieces/1.jpg"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let pieces = registry.service(EntityKind::Piece).unwrap();
    let piece = pieces.list().await.unwrap().remove(0);

    let category = registry
        .service(EntityKind::Category)
        .unwrap()
        .from_cache(&Pk::Int(4))
        .unwrap();
    let refreshed = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&refreshed);
    category.observe_refresh(move || {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    let mut data = galleria_core::ClientDict::new();
    data.insert(
        "image".to_owned(),
        Value::File(galleria_core::FileUpload {
            file_name: "sunrise.jpg".to_owned(),
            content_type: Some("image/jpeg".to_owned()),
            bytes: vec![0xff, 0xd8, 0xff],
        }),
    );
    piece.update(&data).await.unwrap();

    // The response's truthy image told the category its thumbnails changed.
    assert_eq!(refreshed.load(Ordering::SeqCst), 1);
    assert_eq!(piece.get("image"), Some(Value::from("images/pieces/1.jpg")));
}

// ── Deletion ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_delete_flags_the_instance_while_in_flight() {
    let (server, registry) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/piece"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "name": "Sunrise", "category": { "id": 4, "name": "Oils" } }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/piece/1"))
        .respond_with(ResponseTemplate::new(204).set_delay(Duration::from_millis(100)))
        .mount(&server)
        .await;

    let pieces = registry.service(EntityKind::Piece).unwrap();
    let piece = pieces.list().await.unwrap().remove(0);
    let category = registry
        .service(EntityKind::Category)
        .unwrap()
        .from_cache(&Pk::Int(4))
        .unwrap();

    assert!(!piece.is_deleting());
    let in_flight = piece.clone();
    let handle = tokio::spawn(async move { in_flight.delete().await });

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(piece.is_deleting());

    handle.await.unwrap().unwrap();
    assert!(!piece.is_deleting());

    // Evicted from the cache and unlinked from its category.
    assert!(pieces.from_cache(&Pk::Int(1)).is_none());
    let members = category.get("pieces").unwrap();
    assert!(members.as_link_list().unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_delete_keeps_links_and_clears_the_flag() {
    let (server, registry) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/piece"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "name": "Sunrise", "category": { "id": 4, "name": "Oils" } }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/piece/1"))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({ "detail": "Forbidden" })),
        )
        .mount(&server)
        .await;

    let pieces = registry.service(EntityKind::Piece).unwrap();
    let piece = pieces.list().await.unwrap().remove(0);
    let category = registry
        .service(EntityKind::Category)
        .unwrap()
        .from_cache(&Pk::Int(4))
        .unwrap();

    let err = piece.delete().await.unwrap_err();
    assert_eq!(err.detail(), "Forbidden");

    assert!(!piece.is_deleting());
    let members = category.get("pieces").unwrap();
    assert_eq!(members.as_link_list().unwrap().len(), 1);
}

// ── Reordering ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_reorder_puts_the_full_pk_list() {
    let (server, registry) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/category"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "name": "Oils" },
            { "id": 2, "name": "Inks" }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/category"))
        .and(body_json(json!({ "reorder": [2, 1] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 2, "name": "Inks" },
            { "id": 1, "name": "Oils" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let categories = registry.service(EntityKind::Category).unwrap();
    let listed = categories.list().await.unwrap();

    let reordered = categories
        .reorder(&[Pk::Int(2), Pk::Int(1)])
        .await
        .unwrap();

    assert_eq!(reordered[0].pk(), Some(Pk::Int(2)));
    // The response instances are scratch copies, not the cached ones.
    assert!(!reordered[1].same_instance(&listed[0]));
}

#[tokio::test]
async fn test_reorder_is_rejected_for_fixed_order_entities() {
    let (_server, registry) = setup().await;

    let users = registry.service(EntityKind::User).unwrap();
    match users.reorder(&[Pk::Int(1)]).await {
        Err(CoreError::Unsupported { operation, entity }) => {
            assert_eq!(operation, "reorder");
            assert_eq!(entity, EntityKind::User);
        }
        other => panic!("expected Unsupported, got {other:?}"),
    }
}

// ── Session ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_login_sets_the_current_user() {
    let (server, registry) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .and(body_json(json!({ "email": "ana@example.org", "password": "hunter2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1,
            "first_name": "Ana",
            "last_name": "Duarte",
            "email": "ana@example.org",
            "is_staff": true
        })))
        .mount(&server)
        .await;

    let session = UserSession::new(&registry).unwrap();
    assert!(!session.is_logged_in());

    let logins = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&logins);
    session.observe_login(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    let user = session.login("ana@example.org", "hunter2").await.unwrap();

    assert_eq!(user.get("firstName"), Some(Value::from("Ana")));
    assert!(session.is_logged_in());
    assert!(session.is_staff());
    assert_eq!(logins.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_logout_forgets_the_current_user() {
    let (server, registry) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1,
            "first_name": "Ana",
            "is_staff": false
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/logout"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let session = UserSession::new(&registry).unwrap();
    session.login("ana@example.org", "pw").await.unwrap();

    let logouts = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&logouts);
    session.observe_logout(move || {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    session.logout().await.unwrap();

    assert!(!session.is_logged_in());
    assert!(!session.is_staff());
    assert_eq!(logouts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_session_load_without_a_session_resolves_to_none() {
    let (server, registry) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/user/self"))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({ "detail": "Not logged in" })),
        )
        .mount(&server)
        .await;

    let session = UserSession::new(&registry).unwrap();
    assert!(session.load().await.is_none());
    assert!(!session.is_logged_in());
}

#[tokio::test]
async fn test_session_load_recovers_a_persisted_session() {
    let (server, registry) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/user/self"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1,
            "first_name": "Ana",
            "is_staff": true
        })))
        .mount(&server)
        .await;

    let session = UserSession::new(&registry).unwrap();
    let initial = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&initial);
    session.observe_initial_user(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    let user = session.load().await.unwrap();
    assert_eq!(user.get("firstName"), Some(Value::from("Ana")));
    assert_eq!(initial.load(Ordering::SeqCst), 1);
}

// ── Site copy ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_string_table_is_keyed_and_cached() {
    let (server, registry) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/string"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "key": "biography", "value": "Painter of small harbours." },
            { "key": "contact", "value": "ana@example.org" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let table = string_table(&registry).await.unwrap();
    assert_eq!(
        string_value(&table, "biography").as_deref(),
        Some("Painter of small harbours.")
    );
    assert_eq!(string_value(&table, "missing"), None);

    // A second build is served from the cache, same instances included.
    let again = string_table(&registry).await.unwrap();
    assert!(again["contact"].same_instance(&table["contact"]));
}

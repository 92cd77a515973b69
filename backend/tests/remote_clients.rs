use bytes::Bytes;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use montcervin_backend::catalog::{fetch_page, PageRequest, PropertyFilter};
use montcervin_backend::mailer::{MailError, Mailer, OutgoingEmail, ResendMailer};
use montcervin_backend::media::{BucketStore, ImageStore, LocalImageStore};
use montcervin_backend::models::{Location, PropertyStatus};
use montcervin_backend::store::{CatalogSource, RestCatalog};

fn listing_json(id: Uuid) -> serde_json::Value {
    json!({
        "id": id,
        "title": "Fell End",
        "description": null,
        "price": 450000,
        "location": "Lake District",
        "property_type": "Cottage",
        "bedrooms": 3,
        "bathrooms": null,
        "square_feet": null,
        "year_built": 1820,
        "images": null,
        "features": ["Log burner"],
        "status": "available",
        "featured": false,
        "created_at": "2025-03-01T10:00:00Z",
        "updated_at": "2025-03-01T10:00:00Z"
    })
}

#[tokio::test]
async fn rest_catalog_counts_from_content_range() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/rest/v1/properties"))
        .and(header("Prefer", "count=exact"))
        .and(header("apikey", "anon-key"))
        .and(query_param("status", "eq.available"))
        .respond_with(ResponseTemplate::new(200).insert_header("Content-Range", "*/15"))
        .expect(1)
        .mount(&server)
        .await;

    let catalog = RestCatalog::new(&server.uri(), "anon-key").unwrap();
    let predicate = PropertyFilter::default().predicate();
    assert_eq!(catalog.count(&predicate).await.unwrap(), 15);
}

#[tokio::test]
async fn rest_catalog_selects_a_range_newest_first() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();
    Mock::given(method("GET"))
        .and(path("/rest/v1/properties"))
        .and(header("Range", "12-23"))
        .and(header("Range-Unit", "items"))
        .and(query_param("order", "created_at.desc,id.desc"))
        .and(query_param("location", "ilike.*lake*"))
        .respond_with(ResponseTemplate::new(206).set_body_json(json!([listing_json(id)])))
        .mount(&server)
        .await;

    let catalog = RestCatalog::new(&server.uri(), "anon-key").unwrap();
    let filter = PropertyFilter {
        location: Some("lake".into()),
        ..Default::default()
    };
    let rows = catalog.select(&filter.predicate(), 12, 12).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, id);
    assert_eq!(rows[0].location, Some(Location::LakeDistrict));
    assert_eq!(rows[0].status, PropertyStatus::Available);
    assert!(rows[0].images.is_empty());
}

#[tokio::test]
async fn range_not_satisfiable_ends_paging_quietly() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/properties"))
        .respond_with(ResponseTemplate::new(416).set_body_json(json!({
            "code": "PGRST103",
            "message": "Requested range not satisfiable",
            "details": "An offset of 24 was requested, but there are only 20 rows.",
            "hint": null
        })))
        .mount(&server)
        .await;

    let catalog = RestCatalog::new(&server.uri(), "anon-key").unwrap();
    let predicate = PropertyFilter::default().predicate();

    let err = catalog.select(&predicate, 24, 12).await.unwrap_err();
    assert!(err.is_range_not_satisfiable());

    // The count said 30, but rows vanished before the page was read.
    let batch = fetch_page(&catalog, &predicate, PageRequest::new(2, 12), Some(30))
        .await
        .unwrap();
    assert!(batch.records.is_empty());
}

#[tokio::test]
async fn other_rest_errors_keep_the_store_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/properties"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": "42703",
            "message": "column properties.colour does not exist"
        })))
        .mount(&server)
        .await;

    let catalog = RestCatalog::new(&server.uri(), "anon-key").unwrap();
    let predicate = PropertyFilter::default().predicate();
    let err = fetch_page(&catalog, &predicate, PageRequest::first(12), Some(5))
        .await
        .unwrap_err();
    assert_eq!(err.message, "column properties.colour does not exist");
}

#[tokio::test]
async fn unreachable_catalog_is_reported_as_unavailable() {
    let catalog = RestCatalog::new("http://127.0.0.1:9", "anon-key").unwrap();
    let predicate = PropertyFilter::default().predicate();
    let err = fetch_page(&catalog, &predicate, PageRequest::first(12), None)
        .await
        .unwrap_err();
    assert!(err.is_unavailable());
    assert!(!err.message.starts_with("store unavailable"));
}

#[tokio::test]
async fn rest_catalog_looks_up_by_id() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();
    Mock::given(method("GET"))
        .and(path("/rest/v1/properties"))
        .and(query_param("id", format!("eq.{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([listing_json(id)])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/properties"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let catalog = RestCatalog::new(&server.uri(), "anon-key").unwrap();
    assert_eq!(catalog.property(id).await.unwrap().unwrap().title, "Fell End");
    assert!(catalog.property(Uuid::new_v4()).await.unwrap().is_none());
}

fn reply() -> OutgoingEmail {
    OutgoingEmail {
        to: "buyer@example.com".into(),
        subject: "Your inquiry".into(),
        text: "Thanks for getting in touch.".into(),
    }
}

#[tokio::test]
async fn resend_mailer_posts_from_the_fixed_sender() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/emails"))
        .and(header("Authorization", "Bearer re_test"))
        .and(body_partial_json(json!({
            "from": "Montcervin <sales@montcervin.co.uk>",
            "to": ["buyer@example.com"],
            "subject": "Your inquiry",
            "text": "Thanks for getting in touch."
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "email_1" })))
        .expect(1)
        .mount(&server)
        .await;

    let mailer = ResendMailer::new(&server.uri(), "re_test", "Montcervin <sales@montcervin.co.uk>").unwrap();
    mailer.send(&reply()).await.unwrap();
}

#[tokio::test]
async fn resend_rejection_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(422).set_body_string("invalid `to` field"))
        .mount(&server)
        .await;

    let mailer = ResendMailer::new(&server.uri(), "re_test", "sales@montcervin.co.uk").unwrap();
    match mailer.send(&reply()).await {
        Err(MailError::Rejected { status, body }) => {
            assert_eq!(status, 422);
            assert_eq!(body, "invalid `to` field");
        }
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn bucket_store_returns_public_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/storage/v1/object/property-images/[^/]+$"))
        .and(header("Authorization", "Bearer service-key"))
        .and(header("Content-Type", "image/png"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Key": "property-images/x" })))
        .expect(1)
        .mount(&server)
        .await;

    let store = BucketStore::new(&server.uri(), "service-key", "property-images").unwrap();
    let url = store
        .put("abc-hall.png", "image/png", Bytes::from_static(b"png"))
        .await
        .unwrap();
    assert_eq!(
        url,
        format!("{}/storage/v1/object/public/property-images/abc-hall.png", server.uri())
    );
}

#[tokio::test]
async fn local_image_store_writes_under_its_directory() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalImageStore::new(dir.path().join("uploads"), "/media/");
    let url = store
        .put("abc-kitchen.jpg", "image/jpeg", Bytes::from_static(b"jpeg"))
        .await
        .unwrap();
    assert_eq!(url, "/media/abc-kitchen.jpg");
    let written = std::fs::read(dir.path().join("uploads").join("abc-kitchen.jpg")).unwrap();
    assert_eq!(written, b"jpeg");
}

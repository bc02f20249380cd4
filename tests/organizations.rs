#[macro_use]
mod common;

use actix_web::{http::StatusCode, test::TestRequest};
use mongodb::bson::doc;
use serde_json::{json, Value};

use bus_ticketing::{
    auth::{hash_password, issue_token},
    db::{MemoryStore, Store},
    models::{User, UserRole},
};

fn primaries(body: &Value) -> Vec<String> {
    body["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|org| org["isPrimary"] == true)
        .map(|org| org["id"].as_str().unwrap().to_string())
        .collect()
}

#[actix_web::test]
async fn first_organization_is_primary() {
    let store = MemoryStore::new();
    let app = test_app!(store);
    let token = sign_up!(app, "owner@example.com");

    let reply = call!(
        app,
        TestRequest::post()
            .uri("/api/organizations")
            .insert_header(common::bearer(&token))
            .set_json(common::organization("Modern Coast"))
    );
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.body["data"]["isPrimary"], true);
    assert_eq!(reply.body["data"]["address"]["city"], "Nairobi");

    let second = create_organization!(app, token, "Modern Coast Cargo");
    let reply = call!(
        app,
        TestRequest::get()
            .uri(&format!("/api/organizations/{second}"))
            .insert_header(common::bearer(&token))
    );
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["data"]["isPrimary"], false);
}

#[actix_web::test]
async fn exactly_one_primary_after_promotion() {
    let store = MemoryStore::new();
    let app = test_app!(store);
    let token = sign_up!(app, "owner@example.com");
    let first = create_organization!(app, token, "Dreamline");
    let second = create_organization!(app, token, "Dreamline Express");

    let reply = call!(
        app,
        TestRequest::post()
            .uri(&format!("/api/organizations/{second}/primary"))
            .insert_header(common::bearer(&token))
    );
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["message"], "Primary organization updated");

    let reply = call!(
        app,
        TestRequest::get()
            .uri("/api/organizations")
            .insert_header(common::bearer(&token))
    );
    assert_eq!(primaries(&reply.body), vec![second.clone()]);

    let mut update = common::organization("Dreamline Renamed");
    update["isPrimary"] = json!(true);
    let reply = call!(
        app,
        TestRequest::put()
            .uri(&format!("/api/organizations/{first}"))
            .insert_header(common::bearer(&token))
            .set_json(update)
    );
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["data"]["name"], "Dreamline Renamed");

    let reply = call!(
        app,
        TestRequest::get()
            .uri("/api/organizations")
            .insert_header(common::bearer(&token))
    );
    assert_eq!(primaries(&reply.body), vec![first]);
}

#[actix_web::test]
async fn deleting_the_primary_promotes_the_oldest_remaining() {
    let store = MemoryStore::new();
    let app = test_app!(store);
    let token = sign_up!(app, "owner@example.com");
    let first = create_organization!(app, token, "Guardian Angel");
    let second = create_organization!(app, token, "Guardian Angel Two");
    create_organization!(app, token, "Guardian Angel Three");

    let reply = call!(
        app,
        TestRequest::delete()
            .uri(&format!("/api/organizations/{first}"))
            .insert_header(common::bearer(&token))
    );
    assert_eq!(reply.status, StatusCode::OK);

    let reply = call!(
        app,
        TestRequest::get()
            .uri("/api/organizations")
            .insert_header(common::bearer(&token))
    );
    assert_eq!(reply.body["data"].as_array().unwrap().len(), 2);
    assert_eq!(primaries(&reply.body), vec![second]);
}

#[actix_web::test]
async fn organizations_with_fleet_cannot_be_deleted() {
    let store = MemoryStore::new();
    let app = test_app!(store);
    let token = sign_up!(app, "owner@example.com");
    let org = create_organization!(app, token, "Mash Poa");

    let mut bus = common::bus_type("Mash Classic");
    bus["organizationId"] = json!(org);
    let reply = call!(
        app,
        TestRequest::post()
            .uri("/api/bus-types")
            .insert_header(common::bearer(&token))
            .set_json(bus)
    );
    assert_eq!(reply.status, StatusCode::CREATED);

    let reply = call!(
        app,
        TestRequest::delete()
            .uri(&format!("/api/organizations/{org}"))
            .insert_header(common::bearer(&token))
    );
    assert_eq!(reply.status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn other_operators_organizations_are_forbidden() {
    let store = MemoryStore::new();
    let app = test_app!(store);
    let owner = sign_up!(app, "owner@example.com");
    let intruder = sign_up!(app, "intruder@example.com");
    let org = create_organization!(app, owner, "Tahmeed");

    let reply = call!(
        app,
        TestRequest::get()
            .uri(&format!("/api/organizations/{org}"))
            .insert_header(common::bearer(&intruder))
    );
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    let reply = call!(
        app,
        TestRequest::delete()
            .uri(&format!("/api/organizations/{org}"))
            .insert_header(common::bearer(&intruder))
    );
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    let reply = call!(
        app,
        TestRequest::get()
            .uri("/api/organizations")
            .insert_header(common::bearer(&intruder))
    );
    assert_eq!(reply.body["data"], json!([]));
}

#[actix_web::test]
async fn admins_may_read_any_organization() {
    let store = MemoryStore::new();
    let app = test_app!(store);
    let owner = sign_up!(app, "owner@example.com");
    let org = create_organization!(app, owner, "Spanish Coach");

    let config = common::config();
    let hash = hash_password(common::PASSWORD, &config.auth).unwrap();
    let admin = store
        .insert(User::new("Admin", "admin@example.com", hash, UserRole::Admin))
        .await
        .unwrap();
    let token = issue_token(admin.id.unwrap(), UserRole::Admin, &config.auth).unwrap();

    let reply = call!(
        app,
        TestRequest::get()
            .uri(&format!("/api/organizations/{org}"))
            .insert_header(common::bearer(&token))
    );
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["data"]["name"], "Spanish Coach");
}

#[actix_web::test]
async fn bad_input_and_ids_are_rejected() {
    let store = MemoryStore::new();
    let app = test_app!(store);
    let token = sign_up!(app, "owner@example.com");

    let reply = call!(
        app,
        TestRequest::post()
            .uri("/api/organizations")
            .insert_header(common::bearer(&token))
            .set_json(json!({ "name": "No Contact" }))
    );
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    let fields: Vec<&str> = reply.body["error"]["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"email"));
    assert!(fields.contains(&"phone"));
    assert!(fields.contains(&"address.city"));

    let reply = call!(
        app,
        TestRequest::get()
            .uri("/api/organizations/not-an-id")
            .insert_header(common::bearer(&token))
    );
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["error"]["code"], "INVALID_ID");

    let missing = mongodb::bson::oid::ObjectId::new().to_hex();
    let reply = call!(
        app,
        TestRequest::get()
            .uri(&format!("/api/organizations/{missing}"))
            .insert_header(common::bearer(&token))
    );
    assert_eq!(reply.status, StatusCode::NOT_FOUND);

    assert_eq!(
        store
            .count::<bus_ticketing::models::Organization>(doc! {})
            .await
            .unwrap(),
        0
    );
}

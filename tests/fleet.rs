#[macro_use]
mod common;

use actix_web::{http::StatusCode, test::TestRequest};
use mongodb::bson::doc;
use serde_json::json;

use bus_ticketing::{
    db::{MemoryStore, Store},
    models::{BusType, Route},
};

#[actix_web::test]
async fn bus_types_are_filed_under_an_owned_organization() {
    let store = MemoryStore::new();
    let app = test_app!(store);
    let token = sign_up!(app, "fleet@example.com");
    let org = create_organization!(app, token, "Easy Coach");
    let other_org = create_organization!(app, token, "Easy Coach West");

    let mut bus = json!({
        "organizationId": org,
        "name": "Volvo B11R",
        "acType": "ac",
        "seatingType": "seater_sleeper",
        "decks": {
            "lower": { "seaterCount": 30, "seaterPrice": 1450.0 },
            "upper": { "sleeperCount": 15, "sleeperPrice": 2200.0 }
        },
        "amenities": ["wifi", "blanket"]
    });
    let reply = call!(
        app,
        TestRequest::post()
            .uri("/api/bus-types")
            .insert_header(common::bearer(&token))
            .set_json(&bus)
    );
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
    assert_eq!(reply.body["data"]["totalCapacity"], 45);
    assert_eq!(reply.body["data"]["organizationId"], org.as_str());
    let id = reply.body["data"]["id"].as_str().unwrap().to_string();

    let mut other = common::bus_type("Scania Irizar");
    other["organizationId"] = json!(other_org);
    let reply = call!(
        app,
        TestRequest::post()
            .uri("/api/bus-types")
            .insert_header(common::bearer(&token))
            .set_json(other)
    );
    assert_eq!(reply.status, StatusCode::CREATED);

    let reply = call!(
        app,
        TestRequest::get()
            .uri(&format!("/api/bus-types?organizationId={org}"))
            .insert_header(common::bearer(&token))
    );
    assert_eq!(reply.body["data"].as_array().unwrap().len(), 1);
    let reply = call!(
        app,
        TestRequest::get()
            .uri("/api/bus-types")
            .insert_header(common::bearer(&token))
    );
    assert_eq!(reply.body["data"].as_array().unwrap().len(), 2);

    bus["name"] = json!("Volvo B11R Refit");
    bus["organizationId"] = json!(other_org);
    let reply = call!(
        app,
        TestRequest::put()
            .uri(&format!("/api/bus-types/{id}"))
            .insert_header(common::bearer(&token))
            .set_json(&bus)
    );
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["data"]["name"], "Volvo B11R Refit");
    assert_eq!(reply.body["data"]["organizationId"], other_org.as_str());

    let reply = call!(
        app,
        TestRequest::delete()
            .uri(&format!("/api/bus-types/{id}"))
            .insert_header(common::bearer(&token))
    );
    assert_eq!(reply.status, StatusCode::OK);
    let reply = call!(
        app,
        TestRequest::get()
            .uri(&format!("/api/bus-types/{id}"))
            .insert_header(common::bearer(&token))
    );
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn bus_type_layout_rules_are_enforced() {
    let store = MemoryStore::new();
    let app = test_app!(store);
    let token = sign_up!(app, "fleet@example.com");
    let org = create_organization!(app, token, "Easy Coach");

    let reply = call!(
        app,
        TestRequest::post()
            .uri("/api/bus-types")
            .insert_header(common::bearer(&token))
            .set_json(json!({
                "organizationId": org,
                "name": "Sleeper Only",
                "acType": "ac",
                "seatingType": "sleeper",
                "decks": { "lower": { "seaterCount": 10, "seaterPrice": 900.0 } }
            }))
    );
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["error"]["details"][0]["field"], "decks.lower.seaterCount");

    let reply = call!(
        app,
        TestRequest::post()
            .uri("/api/bus-types")
            .insert_header(common::bearer(&token))
            .set_json(common::bus_type("Missing Organization"))
    );
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["error"]["details"][0]["field"], "organizationId");
}

#[actix_web::test]
async fn fleet_cannot_be_filed_under_someone_elses_organization() {
    let store = MemoryStore::new();
    let app = test_app!(store);
    let owner = sign_up!(app, "owner@example.com");
    let intruder = sign_up!(app, "intruder@example.com");
    let org = create_organization!(app, owner, "Ena Coach");

    let mut bus = common::bus_type("Hijacked");
    bus["organizationId"] = json!(org);
    let reply = call!(
        app,
        TestRequest::post()
            .uri("/api/bus-types")
            .insert_header(common::bearer(&intruder))
            .set_json(bus)
    );
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    let mut route = common::route("Nairobi", "Kisii", &[]);
    route["organizationId"] = json!(org);
    let reply = call!(
        app,
        TestRequest::post()
            .uri("/api/routes")
            .insert_header(common::bearer(&intruder))
            .set_json(route)
    );
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn routes_can_be_managed() {
    let store = MemoryStore::new();
    let app = test_app!(store);
    let token = sign_up!(app, "routes@example.com");
    let org = create_organization!(app, token, "Crown Bus");

    let mut route = common::route("Nairobi", "Kisumu", &["Nakuru", "Kericho"]);
    route["organizationId"] = json!(org);
    let reply = call!(
        app,
        TestRequest::post()
            .uri("/api/routes")
            .insert_header(common::bearer(&token))
            .set_json(&route)
    );
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
    assert_eq!(reply.body["data"]["stops"], json!(["Nakuru", "Kericho"]));
    let id = reply.body["data"]["id"].as_str().unwrap().to_string();

    route["durationMinutes"] = json!(510);
    route["isActive"] = json!(false);
    let reply = call!(
        app,
        TestRequest::put()
            .uri(&format!("/api/routes/{id}"))
            .insert_header(common::bearer(&token))
            .set_json(&route)
    );
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["data"]["durationMinutes"], 510);
    assert_eq!(reply.body["data"]["isActive"], false);

    let reply = call!(
        app,
        TestRequest::delete()
            .uri(&format!("/api/routes/{id}"))
            .insert_header(common::bearer(&token))
    );
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["message"], "Route deleted");
}

#[actix_web::test]
async fn route_endpoints_must_differ() {
    let store = MemoryStore::new();
    let app = test_app!(store);
    let token = sign_up!(app, "routes@example.com");
    let org = create_organization!(app, token, "Crown Bus");

    let mut route = common::route("Nairobi", " nairobi ", &[]);
    route["organizationId"] = json!(org);
    let reply = call!(
        app,
        TestRequest::post()
            .uri("/api/routes")
            .insert_header(common::bearer(&token))
            .set_json(route)
    );
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["error"]["details"][0]["field"], "destination");

    let reply = call!(
        app,
        TestRequest::get()
            .uri("/api/routes?organizationId=zzz")
            .insert_header(common::bearer(&token))
    );
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["error"]["code"], "INVALID_ID");
}

#[actix_web::test]
async fn fleet_records_are_private_to_their_owner() {
    let store = MemoryStore::new();
    let app = test_app!(store);
    let owner = sign_up!(app, "owner@example.com");
    let intruder = sign_up!(app, "intruder@example.com");
    let org = create_organization!(app, owner, "Ena Coach");
    let intruder_org = create_organization!(app, intruder, "Rival Coach");

    let mut bus = common::bus_type("Ena Deluxe");
    bus["organizationId"] = json!(org);
    let reply = call!(
        app,
        TestRequest::post()
            .uri("/api/bus-types")
            .insert_header(common::bearer(&owner))
            .set_json(&bus)
    );
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
    let bus_id = reply.body["data"]["id"].as_str().unwrap().to_string();

    let mut route = common::route("Nairobi", "Kisii", &["Narok"]);
    route["organizationId"] = json!(org);
    let reply = call!(
        app,
        TestRequest::post()
            .uri("/api/routes")
            .insert_header(common::bearer(&owner))
            .set_json(&route)
    );
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
    let route_id = reply.body["data"]["id"].as_str().unwrap().to_string();

    for (uri, body) in [
        (format!("/api/bus-types/{bus_id}"), &bus),
        (format!("/api/routes/{route_id}"), &route),
    ] {
        let reply = call!(
            app,
            TestRequest::get()
                .uri(&uri)
                .insert_header(common::bearer(&intruder))
        );
        assert_eq!(reply.status, StatusCode::FORBIDDEN, "GET {uri}");

        let reply = call!(
            app,
            TestRequest::put()
                .uri(&uri)
                .insert_header(common::bearer(&intruder))
                .set_json(body)
        );
        assert_eq!(reply.status, StatusCode::FORBIDDEN, "PUT {uri}");

        let reply = call!(
            app,
            TestRequest::delete()
                .uri(&uri)
                .insert_header(common::bearer(&intruder))
        );
        assert_eq!(reply.status, StatusCode::FORBIDDEN, "DELETE {uri}");

        // The owner cannot hand the record over to the intruder either.
        let mut moved = body.clone();
        moved["organizationId"] = json!(intruder_org);
        let reply = call!(
            app,
            TestRequest::put()
                .uri(&uri)
                .insert_header(common::bearer(&owner))
                .set_json(moved)
        );
        assert_eq!(reply.status, StatusCode::FORBIDDEN, "move {uri}");

        let reply = call!(
            app,
            TestRequest::get()
                .uri(&uri)
                .insert_header(common::bearer(&owner))
        );
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body["data"]["organizationId"], org.as_str());
    }

    assert_eq!(store.count::<BusType>(doc! {}).await.unwrap(), 1);
    assert_eq!(store.count::<Route>(doc! {}).await.unwrap(), 1);
}

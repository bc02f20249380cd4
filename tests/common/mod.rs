#![allow(dead_code, unused_macros)]

use actix_web::{body::MessageBody, dev::ServiceResponse, http::StatusCode, test};
use serde_json::{json, Value};

use bus_ticketing::Config;

pub const PASSWORD: &str = "correct-horse-battery";

pub fn config() -> Config {
    let mut config = Config::default();
    config.auth.jwt_secret = "integration-secret".to_string();
    config.auth.bcrypt_cost = 4;
    config
}

pub struct Reply {
    pub status: StatusCode,
    pub body: Value,
    pub session: Option<String>,
}

pub async fn read<B: MessageBody>(resp: ServiceResponse<B>) -> Reply {
    let status = resp.status();
    let session = resp
        .response()
        .cookies()
        .find(|c| c.name() == config().auth.cookie_name)
        .map(|c| c.value().to_string());
    let bytes = test::read_body(resp).await;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    Reply {
        status,
        body,
        session,
    }
}

pub fn bearer(token: &str) -> (actix_web::http::header::HeaderName, String) {
    (
        actix_web::http::header::AUTHORIZATION,
        format!("Bearer {token}"),
    )
}

pub fn organization(name: &str) -> Value {
    json!({
        "name": name,
        "email": "ops@example.co.ke",
        "phone": "+254 700 123456",
        "address": {
            "line1": "Moi Avenue 12",
            "city": "Nairobi",
            "country": "Kenya"
        }
    })
}

pub fn bus_type(name: &str) -> Value {
    json!({
        "name": name,
        "acType": "ac",
        "seatingType": "seater",
        "decks": { "lower": { "seaterCount": 40, "seaterPrice": 1500.0 } },
        "amenities": ["wifi", "charging_point"]
    })
}

pub fn route(origin: &str, destination: &str, stops: &[&str]) -> Value {
    json!({
        "origin": origin,
        "destination": destination,
        "distanceKm": 485.0,
        "durationMinutes": 480,
        "stops": stops
    })
}

pub fn onboarding(slug: &str) -> Value {
    json!({
        "organization": organization("Coast Express"),
        "busTypes": [bus_type("Coast Deluxe"), bus_type("Coast Standard")],
        "routes": [
            route("Nairobi", "Mombasa", &["Mtito Andei", "Voi"]),
            route("Mombasa", "Nairobi", &["Voi", "Mtito Andei"])
        ],
        "tenant": {
            "name": "Coast Express",
            "slug": slug,
            "branding": { "primaryColor": "#0f766e", "tagline": "Ride the coast" },
            "paymentGateway": { "provider": "razorpay", "keyId": "rzp_test_1", "keySecret": "s3cret" }
        }
    })
}

/// Builds the app over the given `MemoryStore` with the test config.
macro_rules! test_app {
    ($store:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($store.clone()))
                .app_data(actix_web::web::Data::new(common::config()))
                .configure(bus_ticketing::configure::<bus_ticketing::db::MemoryStore>),
        )
        .await
    };
}

/// Sends a `TestRequest` and reads the reply.
macro_rules! call {
    ($app:expr, $req:expr) => {
        common::read(actix_web::test::call_service(&$app, $req.to_request()).await).await
    };
}

/// Registers an operator and returns the bearer token.
macro_rules! sign_up {
    ($app:expr, $email:expr) => {{
        let reply = call!(
            $app,
            actix_web::test::TestRequest::post()
                .uri("/api/auth/register")
                .set_json(serde_json::json!({
                    "name": "Test Operator",
                    "email": $email,
                    "password": common::PASSWORD,
                }))
        );
        assert_eq!(reply.status, actix_web::http::StatusCode::CREATED, "{}", reply.body);
        reply.body["data"]["token"].as_str().unwrap().to_string()
    }};
}

/// Creates an organization for `$token` and returns its id.
macro_rules! create_organization {
    ($app:expr, $token:expr, $name:expr) => {{
        let reply = call!(
            $app,
            actix_web::test::TestRequest::post()
                .uri("/api/organizations")
                .insert_header(common::bearer(&$token))
                .set_json(common::organization($name))
        );
        assert_eq!(reply.status, actix_web::http::StatusCode::CREATED, "{}", reply.body);
        reply.body["data"]["id"].as_str().unwrap().to_string()
    }};
}

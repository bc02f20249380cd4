//! Demo data: one onboarded operator with a Kenyan intercity network, so the
//! storefront has something to search on a fresh database.

use std::collections::BTreeSet;

use log::{info, warn};
use mongodb::bson::{doc, oid::ObjectId};

use super::{Store, StoreError};
use crate::{
    auth::hash_password,
    config::Config,
    models::{
        tenant::default_roles, AcType, Address, Amenity, Branding, BusType, BusTypeInput, Deck,
        Decks, NotificationSettings, Organization, OrganizationInput, PaymentGateway, Route,
        RouteInput, SeatingType, Tenant, TenantInput, User, UserRole,
    },
};

pub const DEMO_EMAIL: &str = "demo@easycoach.co.ke";
pub const DEMO_PASSWORD: &str = "demo-operator";
pub const DEMO_SLUG: &str = "easy-coach";

/// (origin, destination, km, minutes, stops)
const DEMO_ROUTES: [(&str, &str, f64, u32, &[&str]); 9] = [
    ("Nairobi", "Kisumu", 350.0, 495, &["Naivasha", "Nakuru", "Kericho"]),
    ("Nairobi", "Mombasa", 485.0, 480, &["Mtito Andei", "Voi"]),
    ("Mombasa", "Nairobi", 485.0, 480, &["Voi", "Mtito Andei"]),
    ("Nairobi", "Eldoret", 310.0, 360, &["Nakuru"]),
    ("Nairobi", "Busia", 430.0, 480, &["Nakuru", "Eldoret"]),
    ("Nairobi", "Nakuru", 160.0, 180, &["Naivasha"]),
    ("Nairobi", "Kisii", 305.0, 360, &["Narok"]),
    ("Nairobi", "Kakamega", 380.0, 480, &["Nakuru", "Kisumu"]),
    ("Nairobi", "Malindi", 600.0, 600, &["Mombasa"]),
];

fn seater(seats: u32, price: f64) -> Deck {
    Deck {
        seater_count: seats,
        sleeper_count: 0,
        seater_price: Some(price),
        sleeper_price: None,
    }
}

fn demo_bus_types() -> Vec<BusTypeInput> {
    let bus = |name: &str, ac_type, seating_type, decks, amenities: &[Amenity]| BusTypeInput {
        organization_id: None,
        name: name.to_string(),
        description: None,
        ac_type: Some(ac_type),
        seating_type: Some(seating_type),
        decks: Some(decks),
        amenities: amenities.iter().copied().collect::<BTreeSet<_>>(),
        is_active: Some(true),
    };

    vec![
        bus(
            "Standard",
            AcType::NonAc,
            SeatingType::Seater,
            Decks { lower: seater(52, 1450.0), upper: None },
            &[Amenity::ChargingPoint],
        ),
        bus(
            "VIP Oxygen",
            AcType::Ac,
            SeatingType::Seater,
            Decks { lower: seater(36, 2200.0), upper: None },
            &[Amenity::Wifi, Amenity::ChargingPoint, Amenity::WaterBottle, Amenity::Tv],
        ),
        bus(
            "Luxury Sleeper",
            AcType::Ac,
            SeatingType::SeaterSleeper,
            Decks {
                lower: seater(30, 1600.0),
                upper: Some(Deck {
                    seater_count: 0,
                    sleeper_count: 15,
                    seater_price: None,
                    sleeper_price: Some(2500.0),
                }),
            },
            &[Amenity::Wifi, Amenity::Blanket, Amenity::ReadingLight, Amenity::Toilet],
        ),
    ]
}

fn demo_routes() -> Vec<RouteInput> {
    DEMO_ROUTES
        .iter()
        .map(|(origin, destination, km, minutes, stops)| RouteInput {
            organization_id: None,
            origin: origin.to_string(),
            destination: destination.to_string(),
            distance_km: Some(*km),
            duration_minutes: Some(*minutes),
            stops: stops.iter().map(|s| s.to_string()).collect(),
            is_active: Some(true),
        })
        .collect()
}

/// Removes everything the demo operator owns, including the account.
async fn clear_demo<S: Store>(store: &S, owner: &User) -> Result<(), StoreError> {
    let Some(owner_id) = owner.id else {
        return Ok(());
    };
    let owned = doc! { "ownerId": owner_id };

    for route in store.find_many::<Route>(owned.clone()).await? {
        if let Some(id) = route.id {
            store.delete::<Route>(id).await?;
        }
    }
    for bus_type in store.find_many::<BusType>(owned.clone()).await? {
        if let Some(id) = bus_type.id {
            store.delete::<BusType>(id).await?;
        }
    }
    for org in store.find_many::<Organization>(owned.clone()).await? {
        if let Some(id) = org.id {
            store.delete::<Organization>(id).await?;
        }
    }
    for tenant in store.find_many::<Tenant>(owned).await? {
        if let Some(id) = tenant.id {
            store.delete::<Tenant>(id).await?;
        }
    }
    store.delete::<User>(owner_id).await?;
    Ok(())
}

pub async fn seed_demo_data<S: Store>(
    store: &S,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(existing) = store.find_one::<User>(doc! { "email": DEMO_EMAIL }).await? {
        if !config.force_seed {
            info!("Demo operator already present, skipping seed");
            return Ok(());
        }
        info!("Force seeding enabled. Clearing demo operator data...");
        clear_demo(store, &existing).await?;
    }

    info!("Seeding demo operator {}...", DEMO_EMAIL);
    let password = hash_password(DEMO_PASSWORD, &config.auth)?;
    let mut owner = User::new("Easy Coach Ops", DEMO_EMAIL, password, UserRole::Operator);
    let owner_id = ObjectId::new();
    owner.id = Some(owner_id);

    let tenant = store
        .insert(Tenant::new(
            owner_id,
            &TenantInput {
                name: "Easy Coach".to_string(),
                slug: DEMO_SLUG.to_string(),
                branding: Some(Branding {
                    tagline: Some("Travel in comfort across Kenya".to_string()),
                    ..Branding::default()
                }),
                payment_gateway: Some(PaymentGateway::default()),
                notification_settings: Some(NotificationSettings::default()),
                roles: Some(default_roles()),
            },
        ))
        .await?;

    let mut organization = Organization::new(
        owner_id,
        tenant.id,
        &OrganizationInput {
            name: "Easy Coach Ltd".to_string(),
            legal_name: Some("Easy Coach Limited".to_string()),
            registration_number: None,
            tax_id: None,
            email: "info@easycoach.co.ke".to_string(),
            phone: "+254 726 354 300".to_string(),
            address: Address {
                line1: "Haile Selassie Avenue".to_string(),
                line2: None,
                city: "Nairobi".to_string(),
                state: None,
                postal_code: Some("00100".to_string()),
                country: "Kenya".to_string(),
            },
            website: None,
            is_primary: Some(true),
        },
    );
    organization.is_primary = true;
    let organization = store.insert(organization).await?;
    let organization_id = organization.id.ok_or(StoreError::MissingId("Organization"))?;

    let bus_types = demo_bus_types();
    for input in &bus_types {
        store
            .insert(BusType::new(owner_id, organization_id, input))
            .await?;
    }
    let routes = demo_routes();
    for input in &routes {
        store.insert(Route::new(owner_id, organization_id, input)).await?;
    }

    owner.tenant_id = tenant.id;
    owner.onboarding_completed = true;
    store.insert(owner).await?;

    warn!(
        "Demo operator {} created with a well-known password; do not seed production databases",
        DEMO_EMAIL
    );
    info!(
        "Seeding complete with {} bus types and {} routes",
        bus_types.len(),
        routes.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::MemoryStore, models::ValidateRequest};

    fn config() -> Config {
        let mut config = Config::default();
        config.auth.bcrypt_cost = 4;
        config
    }

    #[test]
    fn demo_inputs_are_valid() {
        for bus_type in demo_bus_types() {
            assert!(bus_type.field_errors().is_empty(), "{}", bus_type.name);
        }
        for route in demo_routes() {
            assert!(route.field_errors().is_empty(), "{}", route.origin);
        }
    }

    #[actix_web::test]
    async fn seeding_is_idempotent_unless_forced() {
        let store = MemoryStore::new();
        let mut config = config();

        seed_demo_data(&store, &config).await.unwrap();
        seed_demo_data(&store, &config).await.unwrap();
        assert_eq!(store.count::<Route>(doc! {}).await.unwrap(), DEMO_ROUTES.len() as u64);
        assert_eq!(store.count::<User>(doc! {}).await.unwrap(), 1);

        config.force_seed = true;
        seed_demo_data(&store, &config).await.unwrap();
        assert_eq!(store.count::<Route>(doc! {}).await.unwrap(), DEMO_ROUTES.len() as u64);
        assert_eq!(store.count::<Tenant>(doc! {}).await.unwrap(), 1);
        assert_eq!(store.count::<BusType>(doc! {}).await.unwrap(), 3);
    }
}

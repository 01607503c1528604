//! Integration tests for the larder query layer.
//!
//! Each test creates a unique temporary database through
//! `larder-test-utils`, runs migrations, and drops it on completion.

use chrono::Utc;
use serde_json::json;

use larder_db::models::MealType;
use larder_db::pool::{MIGRATOR, TABLES, run_migrations, table_counts};
use larder_db::queries::meal_entries::{self, NewMealEntry};
use larder_db::queries::meal_plans::{self, NewMealPlan};
use larder_db::queries::pantry::{self, NewPantryEntry};
use larder_db::queries::users::{self, ProfileUpdate};
use larder_test_utils::{create_test_db, drop_test_db};

// -----------------------------------------------------------------------
// Users
// -----------------------------------------------------------------------

#[tokio::test]
async fn insert_user_applies_profile_defaults() {
    let (pool, db_name) = create_test_db().await;

    let user = users::insert_user(&pool, "cook@example.com").await.unwrap().unwrap();
    assert_eq!(user.email, "cook@example.com");
    assert_eq!(user.measurement_system, "metric");
    assert_eq!(user.variability, "traditional");
    assert!(user.include_spices);
    assert!(user.country.is_none());

    let fetched = users::get_user(&pool, user.id).await.unwrap().unwrap();
    assert_eq!(fetched, user);

    let by_email = users::get_user_by_email(&pool, "cook@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_email.id, user.id);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn duplicate_email_is_not_inserted() {
    let (pool, db_name) = create_test_db().await;

    let first = users::insert_user(&pool, "twice@example.com").await.unwrap().unwrap();
    let second = users::insert_user(&pool, "twice@example.com").await.unwrap();
    assert!(second.is_none(), "duplicate email must not create a second user");

    let (a, b) = tokio::join!(
        users::insert_user(&pool, "race@example.com"),
        users::insert_user(&pool, "race@example.com")
    );
    let created = [a.unwrap(), b.unwrap()]
        .into_iter()
        .filter(Option::is_some)
        .count();
    assert_eq!(created, 1, "exactly one concurrent insert wins");

    let stored = users::get_user_by_email(&pool, "twice@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.id, first.id);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn update_profile_changes_only_given_fields() {
    let (pool, db_name) = create_test_db().await;

    let user = users::insert_user(&pool, "profile@example.com").await.unwrap().unwrap();
    let update = ProfileUpdate {
        country: Some("CZ"),
        include_spices: Some(false),
        ..Default::default()
    };
    let updated = users::update_profile(&pool, user.id, &update)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(updated.country.as_deref(), Some("CZ"));
    assert!(!updated.include_spices);
    assert_eq!(updated.measurement_system, "metric");

    let missing = users::update_profile(&pool, uuid::Uuid::new_v4(), &update)
        .await
        .unwrap();
    assert!(missing.is_none());

    pool.close().await;
    drop_test_db(&db_name).await;
}

// -----------------------------------------------------------------------
// Pantry
// -----------------------------------------------------------------------

#[tokio::test]
async fn replace_pantry_preserves_order_and_drops_empty_lines() {
    let (pool, db_name) = create_test_db().await;
    let user = users::insert_user(&pool, "pantry@example.com").await.unwrap().unwrap();

    let items = [
        NewPantryEntry {
            name: "Rice",
            quantity_grams: 500.0,
            flagged_for_use: false,
        },
        NewPantryEntry {
            name: "old yoghurt",
            quantity_grams: 0.0,
            flagged_for_use: true,
        },
        NewPantryEntry {
            name: "Chicken Breast",
            quantity_grams: 600.0,
            flagged_for_use: true,
        },
    ];
    let stored = pantry::replace_pantry_in_pool(&pool, user.id, &items)
        .await
        .unwrap();
    assert_eq!(stored.len(), 2);

    let listed = pantry::list_pantry(&pool, user.id).await.unwrap();
    let names: Vec<&str> = listed.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["Rice", "Chicken Breast"]);
    assert!(listed[1].flagged_for_use);

    // A second replace overwrites everything.
    let items = [NewPantryEntry {
        name: "eggs",
        quantity_grams: 120.0,
        flagged_for_use: false,
    }];
    pantry::replace_pantry_in_pool(&pool, user.id, &items)
        .await
        .unwrap();
    let listed = pantry::list_pantry(&pool, user.id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "eggs");
    assert_eq!(listed[0].quantity_grams, 120.0);

    pool.close().await;
    drop_test_db(&db_name).await;
}

// -----------------------------------------------------------------------
// Plans and history
// -----------------------------------------------------------------------

#[tokio::test]
async fn meal_plan_insert_list_and_confirm_once() {
    let (pool, db_name) = create_test_db().await;
    let user = users::insert_user(&pool, "plans@example.com").await.unwrap().unwrap();

    let request = json!({ "meals_per_day": 2 });
    let response = json!({ "days": [], "shopping_list": [] });
    let plan = meal_plans::insert_meal_plan(
        &pool,
        &NewMealPlan {
            user_id: user.id,
            days: 3,
            meals_per_day: 2,
            people_count: 2,
            request_json: &request,
            response_json: &response,
        },
    )
    .await
    .unwrap();

    assert_eq!(plan.days, 3);
    assert_eq!(plan.request_json, request);
    assert!(plan.confirmed_at.is_none());

    let listed = meal_plans::list_meal_plans(&pool, user.id).await.unwrap();
    assert_eq!(listed.len(), 1);

    let pantry_after = json!([]);
    let mut conn = pool.acquire().await.unwrap();
    let first = meal_plans::mark_confirmed(&mut conn, plan.id, Utc::now(), &pantry_after)
        .await
        .unwrap();
    let second = meal_plans::mark_confirmed(&mut conn, plan.id, Utc::now(), &pantry_after)
        .await
        .unwrap();
    drop(conn);

    assert!(first);
    assert!(!second, "confirmation timestamp must only be set once");

    let stored = meal_plans::get_meal_plan(&pool, plan.id)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.confirmed_at.is_some());
    assert_eq!(stored.pantry_after_json, Some(pantry_after));

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn meal_entries_are_listed_in_plan_order() {
    let (pool, db_name) = create_test_db().await;
    let user = users::insert_user(&pool, "history@example.com").await.unwrap().unwrap();
    let body = json!({});
    let plan = meal_plans::insert_meal_plan(
        &pool,
        &NewMealPlan {
            user_id: user.id,
            days: 2,
            meals_per_day: 1,
            people_count: 1,
            request_json: &body,
            response_json: &body,
        },
    )
    .await
    .unwrap();

    let entries = vec![
        NewMealEntry {
            day_index: 1,
            meal_index: 1,
            name: "Porridge".to_string(),
            meal_type: MealType::Breakfast,
            meal_json: json!({ "name": "Porridge" }),
        },
        NewMealEntry {
            day_index: 2,
            meal_index: 1,
            name: "Stir fry".to_string(),
            meal_type: MealType::Dinner,
            meal_json: json!({ "name": "Stir fry" }),
        },
    ];

    let mut conn = pool.acquire().await.unwrap();
    let inserted = meal_entries::insert_meal_entries(&mut conn, user.id, plan.id, &entries)
        .await
        .unwrap();
    drop(conn);
    assert_eq!(inserted, 2);

    let history = meal_entries::list_meal_history(&pool, user.id, 20)
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].name, "Porridge");
    assert_eq!(history[1].meal_type, MealType::Dinner);

    let limited = meal_entries::list_meal_history(&pool, user.id, 1)
        .await
        .unwrap();
    assert_eq!(limited.len(), 1);

    let for_plan = meal_entries::list_entries_for_plan(&pool, plan.id)
        .await
        .unwrap();
    assert_eq!(for_plan.len(), 2);

    pool.close().await;
    drop_test_db(&db_name).await;
}

// -----------------------------------------------------------------------
// Schema
// -----------------------------------------------------------------------

#[tokio::test]
async fn table_counts_cover_exactly_the_larder_tables() {
    let (pool, db_name) = create_test_db().await;

    let empty = table_counts(&pool).await.unwrap();
    let names: Vec<&str> = empty.rows().iter().map(|(table, _)| *table).collect();
    assert_eq!(names, TABLES);
    assert!(empty.rows().iter().all(|(_, rows)| *rows == 0));

    let user = users::insert_user(&pool, "counted@example.com").await.unwrap().unwrap();
    pantry::replace_pantry_in_pool(
        &pool,
        user.id,
        &[NewPantryEntry {
            name: "rice",
            quantity_grams: 500.0,
            flagged_for_use: false,
        }],
    )
    .await
    .unwrap();

    let counts = table_counts(&pool).await.unwrap();
    assert_eq!(counts.users, 1);
    assert_eq!(counts.pantry_items, 1);
    assert_eq!(counts.meal_plans, 0);
    assert_eq!(counts.meal_entries, 0);

    // The test database is already migrated, so a rerun applies nothing.
    let report = run_migrations(&pool).await.unwrap();
    assert_eq!(report.applied, 0);
    assert_eq!(report.embedded, MIGRATOR.iter().count());

    pool.close().await;
    drop_test_db(&db_name).await;
}

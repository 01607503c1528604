//! Integration tests for the planning service against a real database.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use larder_core::generator::GeneratorGateway;
use larder_core::model::{DayPlan, Ingredient, MeasurementSystem, PlanRequest, PlannedMeal};
use larder_core::planner::DayGenerator;
use larder_core::service;
use larder_core::{PantryItem, PlanError};
use larder_db::models::MealType;
use larder_db::queries::{meal_plans, users};
use larder_test_utils::{create_test_db, drop_test_db};

/// Returns scripted days in order and remembers what it was asked.
struct ScriptedDays {
    days: Mutex<VecDeque<Result<DayPlan, PlanError>>>,
    seen: Mutex<Vec<PlanRequest>>,
}

impl ScriptedDays {
    fn new(days: Vec<Result<DayPlan, PlanError>>) -> Self {
        Self {
            days: Mutex::new(days.into()),
            seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl DayGenerator for ScriptedDays {
    async fn generate_day(&self, request: &PlanRequest) -> Result<DayPlan, PlanError> {
        self.seen.lock().unwrap().push(request.clone());
        self.days.lock().unwrap().pop_front().unwrap()
    }
}

fn day(name: &str, ingredients: &[(&str, f64)]) -> DayPlan {
    DayPlan {
        meals: vec![PlannedMeal {
            name: name.into(),
            meal_type: MealType::Dinner,
            ingredients: ingredients
                .iter()
                .map(|(n, q)| Ingredient::new(*n, *q))
                .collect(),
            steps: vec!["Cook.".into()],
        }],
    }
}

#[tokio::test]
async fn plan_uses_stored_pantry_and_profile_then_persists() {
    let (pool, db_name) = create_test_db().await;
    let user = users::insert_user(&pool, "planner@example.com").await.unwrap().unwrap();
    users::update_profile(
        &pool,
        user.id,
        &users::ProfileUpdate {
            measurement_system: Some("imperial"),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    service::save_pantry(
        &pool,
        user.id,
        &[
            PantryItem::new("Chicken Breast", 600.0).flagged(),
            PantryItem::new("rice", 500.0),
        ],
    )
    .await
    .unwrap();

    let generator = ScriptedDays::new(vec![
        Ok(day("Chicken rice", &[("chicken breast", 300.0), ("rice", 100.0)])),
        Ok(day("Chicken curry", &[("chicken breast", 400.0), ("curry paste", 50.0)])),
    ]);
    // The caller's pantry is ignored in favour of the stored one.
    let request = PlanRequest {
        pantry: vec![PantryItem::new("caviar", 1000.0)],
        ..Default::default()
    };

    let stored = service::plan_for_user(&pool, &generator, user.id, request, 2)
        .await
        .unwrap();

    assert_eq!(stored.plan.days.len(), 2);
    assert_eq!(stored.request.measurement_system, MeasurementSystem::Imperial);
    assert_eq!(
        stored.plan.shopping_list,
        vec![
            Ingredient::new("Chicken Breast", 100.0),
            Ingredient::new("curry paste", 50.0),
        ]
    );

    let seen = generator.seen.lock().unwrap().clone();
    assert_eq!(seen[0].pantry.len(), 2);
    assert_eq!(seen[0].pantry[0].name, "Chicken Breast");
    assert_eq!(seen[1].pantry[0].quantity_grams, 300.0);
    assert_eq!(seen[1].past_meals, vec!["Chicken rice"]);

    let fetched = service::get_plan_for_user(&pool, user.id, stored.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fetched.plan, stored.plan);
    assert!(!fetched.is_confirmed());

    let row = meal_plans::get_meal_plan(&pool, stored.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.days, 2);
    assert_eq!(row.meals_per_day, 3);

    // Planning never touches the live pantry.
    let pantry = service::load_pantry(&pool, user.id).await.unwrap();
    assert_eq!(pantry[0].quantity_grams, 600.0);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn failed_day_stores_nothing() {
    let (pool, db_name) = create_test_db().await;
    let user = users::insert_user(&pool, "failing@example.com").await.unwrap().unwrap();

    let generator = ScriptedDays::new(vec![
        Ok(day("a", &[("rice", 100.0)])),
        Err(PlanError::MalformedResponse {
            preview: "oops".into(),
        }),
    ]);
    let err = service::plan_for_user(&pool, &generator, user.id, PlanRequest::default(), 2)
        .await
        .unwrap_err();
    assert!(matches!(err, PlanError::MalformedResponse { .. }));

    let plans = service::list_plans_for_user(&pool, user.id).await.unwrap();
    assert!(plans.is_empty());

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn unknown_user_is_reported() {
    let (pool, db_name) = create_test_db().await;

    let gateway = GeneratorGateway::offline();
    let missing = uuid::Uuid::new_v4();
    let err = service::plan_for_user(&pool, &gateway, missing, PlanRequest::default(), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, PlanError::UserNotFound(id) if id == missing));

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn offline_gateway_plans_end_to_end() {
    let (pool, db_name) = create_test_db().await;
    let user = users::insert_user(&pool, "offline@example.com").await.unwrap().unwrap();
    service::save_pantry(&pool, user.id, &[PantryItem::new("rice", 150.0)])
        .await
        .unwrap();

    let gateway = GeneratorGateway::offline();
    let stored = service::plan_for_user(&pool, &gateway, user.id, PlanRequest::default(), 2)
        .await
        .unwrap();

    assert_eq!(stored.plan.meal_count(), 2);
    // Two canned days want 200 g rice against 150 g in stock.
    let rice = stored
        .plan
        .shopping_list
        .iter()
        .find(|i| i.name == "rice")
        .unwrap();
    assert_eq!(rice.quantity_grams, 50.0);

    let other = users::insert_user(&pool, "other@example.com").await.unwrap().unwrap();
    assert!(
        service::get_plan_for_user(&pool, other.id, stored.id)
            .await
            .unwrap()
            .is_none()
    );

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn pending_shopping_list_merges_unconfirmed_plans() {
    let (pool, db_name) = create_test_db().await;
    let user = users::insert_user(&pool, "shopper@example.com").await.unwrap().unwrap();
    service::save_pantry(&pool, user.id, &[PantryItem::new("rice", 30.0)])
        .await
        .unwrap();

    let first = ScriptedDays::new(vec![Ok(day(
        "Fried rice",
        &[("Soy Sauce", 25.0), ("rice", 80.0)],
    ))]);
    service::plan_for_user(&pool, &first, user.id, PlanRequest::default(), 1)
        .await
        .unwrap();

    let second = ScriptedDays::new(vec![Ok(day("Noodles", &[("soy  sauce", 10.0)]))]);
    service::plan_for_user(&pool, &second, user.id, PlanRequest::default(), 1)
        .await
        .unwrap();

    let third = ScriptedDays::new(vec![Ok(day("Blini", &[("caviar", 5.0)]))]);
    let confirmed = service::plan_for_user(&pool, &third, user.id, PlanRequest::default(), 1)
        .await
        .unwrap();
    larder_core::confirm::confirm_plan(&pool, user.id, confirmed.id)
        .await
        .unwrap();

    let list = service::pending_shopping_list(&pool, user.id).await.unwrap();
    assert_eq!(
        list,
        vec![Ingredient::new("Soy Sauce", 35.0), Ingredient::new("rice", 50.0)]
    );

    let nobody = users::insert_user(&pool, "idle@example.com").await.unwrap().unwrap();
    assert!(
        service::pending_shopping_list(&pool, nobody.id)
            .await
            .unwrap()
            .is_empty()
    );

    pool.close().await;
    drop_test_db(&db_name).await;
}

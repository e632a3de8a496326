//! Booking flow and the appointment lifecycle.

use axum::http::StatusCode;
use chrono::{Days, Utc};
use serde_json::json;
use sqlx::PgPool;
use tireshop_integration_tests::TestApp;

#[sqlx::test(migrator = "tireshop_server::db::MIGRATOR")]
#[ignore = "requires DATABASE_URL"]
async fn booking_confirms_by_email_and_follows_the_lifecycle(pool: PgPool) {
    let mut admin = TestApp::new(pool.clone());
    admin.login_as_admin(&pool).await;
    let service = admin
        .post(
            "/api/admin/services",
            json!({"name": "Tire Change", "basePrice": "39.00", "durationMinutes": 45}),
        )
        .await;
    assert_eq!(service.status, StatusCode::CREATED);
    let service_id = service.body["data"]["id"].as_i64().unwrap();

    let day = Utc::now().date_naive().checked_add_days(Days::new(3)).unwrap();
    let mut visitor = TestApp::new(pool);
    let booked = visitor
        .post(
            "/api/appointments",
            json!({
                "serviceId": service_id,
                "customerName": "Ana Ruiz",
                "customerEmail": "ana@example.com",
                "customerPhone": "+34 600 000 000",
                "scheduledDate": day.format("%Y-%m-%d").to_string(),
                "scheduledTime": "09:30:00"
            }),
        )
        .await;
    assert_eq!(booked.status, StatusCode::CREATED, "{:?}", booked.body);
    let appointment = &booked.body["data"];
    let number = appointment["appointmentNumber"].as_str().unwrap().to_string();
    assert!(number.starts_with("A-"));
    assert_eq!(appointment["status"], "scheduled");
    assert_eq!(appointment["durationMinutes"], 45);

    let emails = visitor.mailer.sent();
    assert_eq!(emails.len(), 1);
    assert!(emails[0].subject.contains(&number));

    let id = appointment["id"].as_i64().unwrap();
    let uri = format!("/api/admin/appointments/{id}");

    let skipped = admin.put(&uri, json!({"status": "completed"})).await;
    assert_eq!(skipped.status, StatusCode::BAD_REQUEST);

    let confirmed = admin.put(&uri, json!({"status": "confirmed", "adminNotes": "Bring locks"})).await;
    assert_eq!(confirmed.status, StatusCode::OK);
    assert_eq!(confirmed.body["data"]["status"], "confirmed");

    let stats = admin.get("/api/admin/appointments/stats").await;
    assert_eq!(stats.body["data"]["total"], 1);
    assert_eq!(stats.body["data"]["confirmed"], 1);
    assert_eq!(stats.body["data"]["upcoming"], 1);

    let on_day = admin
        .get(&format!("/api/admin/appointments?date={}", day.format("%Y-%m-%d")))
        .await;
    assert_eq!(on_day.body["pagination"]["total"], 1);

    let bad_date = admin.get("/api/admin/appointments?date=tomorrow").await;
    assert_eq!(bad_date.status, StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrator = "tireshop_server::db::MIGRATOR")]
#[ignore = "requires DATABASE_URL"]
async fn inactive_services_cannot_be_booked(pool: PgPool) {
    let mut admin = TestApp::new(pool.clone());
    admin.login_as_admin(&pool).await;
    let service = admin
        .post("/api/admin/services", json!({"name": "Old Service", "basePrice": "10.00", "isActive": false}))
        .await;
    let service_id = service.body["data"]["id"].as_i64().unwrap();

    let day = Utc::now().date_naive().checked_add_days(Days::new(1)).unwrap();
    let mut visitor = TestApp::new(pool);
    let response = visitor
        .post(
            "/api/appointments",
            json!({
                "serviceId": service_id,
                "customerName": "Ana Ruiz",
                "customerEmail": "ana@example.com",
                "customerPhone": "600000000",
                "scheduledDate": day.format("%Y-%m-%d").to_string(),
                "scheduledTime": "11:00:00"
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(visitor.mailer.sent().is_empty());
}

//! Tests for the public endpoints: POST /api/activate and POST /api/verify.

use axum::http::StatusCode;
use chrono::Utc;
use serde_json::json;

use xobikey::db::queries;
use xobikey::models::{LicenseStatus, LicenseType};
use xobikey::util::SECONDS_PER_DAY;

mod common;
use common::*;

fn seed_license(ctx: &TestContext, license_type: LicenseType) -> String {
    let conn = ctx.state.db.get().unwrap();
    queries::create_license(&conn, license_type, "")
        .unwrap()
        .license_key
}

#[tokio::test]
async fn activate_binds_a_pending_license() {
    let ctx = create_test_context();
    let app = app(&ctx);
    let key = seed_license(&ctx, LicenseType::Trial1d);

    let before = Utc::now().timestamp();
    let (status, body) = post_json(
        &app,
        "/api/activate",
        json!({ "license_key": key, "machine_code": "M1" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["license_type"], json!("trial_1d"));

    let expires_at = body["expires_at"].as_i64().unwrap();
    let expected = before + SECONDS_PER_DAY;
    assert!(
        (expires_at - expected).abs() <= 5,
        "trial_1d expiry should land ~1 day out (got {expires_at}, expected ~{expected})"
    );

    let conn = ctx.state.db.get().unwrap();
    let license = queries::get_license_by_key(&conn, &key).unwrap().unwrap();
    assert_eq!(license.status, LicenseStatus::Active);
    assert_eq!(license.machine_code.as_deref(), Some("M1"));
    assert!(license.activated_at.is_some());
}

#[tokio::test]
async fn activate_is_case_insensitive_on_the_key() {
    let ctx = create_test_context();
    let app = app(&ctx);
    let key = seed_license(&ctx, LicenseType::Trial7d);

    let (status, body) = post_json(
        &app,
        "/api/activate",
        json!({ "license_key": key.to_lowercase(), "machine_code": "M1" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
}

#[tokio::test]
async fn activate_unknown_key_is_a_domain_negative_outcome() {
    let ctx = create_test_context();
    let app = app(&ctx);

    let (status, body) = post_json(
        &app,
        "/api/activate",
        json!({ "license_key": "XOBI-0000-0000-0000", "machine_code": "M1" }),
    )
    .await;

    // Not an HTTP error: an invalid key is expected user behavior
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["message"], json!("Invalid license key"));
}

#[tokio::test]
async fn activate_missing_fields_is_a_bad_request() {
    let ctx = create_test_context();
    let app = app(&ctx);

    let (status, _) = post_json(&app, "/api/activate", json!({ "machine_code": "M1" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_json(
        &app,
        "/api/activate",
        json!({ "license_key": "XOBI-AAAA-BBBB-CCCC", "machine_code": "  " }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reactivation_from_the_same_machine_is_idempotent() {
    let ctx = create_test_context();
    let app = app(&ctx);
    let key = seed_license(&ctx, LicenseType::Monthly30d);

    let (_, first) = post_json(
        &app,
        "/api/activate",
        json!({ "license_key": key, "machine_code": "M1" }),
    )
    .await;
    let (status, second) = post_json(
        &app,
        "/api/activate",
        json!({ "license_key": key, "machine_code": "M1" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["success"], json!(true));
    assert_eq!(second["license_type"], first["license_type"]);
    assert_eq!(second["expires_at"], first["expires_at"]);
}

#[tokio::test]
async fn activation_from_another_machine_never_steals_the_binding() {
    let ctx = create_test_context();
    let app = app(&ctx);
    let key = seed_license(&ctx, LicenseType::Trial7d);

    post_json(
        &app,
        "/api/activate",
        json!({ "license_key": key, "machine_code": "M1" }),
    )
    .await;

    let (status, body) = post_json(
        &app,
        "/api/activate",
        json!({ "license_key": key, "machine_code": "M2" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(false));
    assert_eq!(
        body["message"],
        json!("License key is already in use by another device")
    );

    let conn = ctx.state.db.get().unwrap();
    let license = queries::get_license_by_key(&conn, &key).unwrap().unwrap();
    assert_eq!(license.machine_code.as_deref(), Some("M1"));
}

#[tokio::test]
async fn racing_activations_produce_exactly_one_winner() {
    let ctx = create_test_context();
    let app = app(&ctx);
    let key = seed_license(&ctx, LicenseType::Trial1d);

    let (result_a, result_b) = tokio::join!(
        post_json(
            &app,
            "/api/activate",
            json!({ "license_key": key.clone(), "machine_code": "M-A" }),
        ),
        post_json(
            &app,
            "/api/activate",
            json!({ "license_key": key.clone(), "machine_code": "M-B" }),
        ),
    );

    let a_won = result_a.1["success"] == json!(true);
    let b_won = result_b.1["success"] == json!(true);
    assert!(
        a_won ^ b_won,
        "exactly one racer may bind the license (a: {:?}, b: {:?})",
        result_a.1,
        result_b.1
    );

    let conn = ctx.state.db.get().unwrap();
    let license = queries::get_license_by_key(&conn, &key).unwrap().unwrap();
    let bound = license.machine_code.as_deref().unwrap();
    assert!(bound == "M-A" || bound == "M-B");
    if a_won {
        assert_eq!(bound, "M-A");
    } else {
        assert_eq!(bound, "M-B");
    }
}

#[tokio::test]
async fn revoked_and_expired_keys_are_rejected() {
    let ctx = create_test_context();
    let app = app(&ctx);

    let revoked_key;
    let expired_key;
    {
        let conn = ctx.state.db.get().unwrap();
        let revoked = queries::create_license(&conn, LicenseType::Trial1d, "").unwrap();
        queries::revoke_license(&conn, &revoked.id).unwrap();
        revoked_key = revoked.license_key;

        let expired = queries::create_license(&conn, LicenseType::Trial1d, "").unwrap();
        queries::claim_pending_license(&conn, &expired.id, "M9", 0, Some(1)).unwrap();
        queries::mark_license_expired(&conn, &expired.id).unwrap();
        expired_key = expired.license_key;
    }

    let (_, body) = post_json(
        &app,
        "/api/activate",
        json!({ "license_key": revoked_key, "machine_code": "M1" }),
    )
    .await;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["message"], json!("License key has been revoked"));

    let (_, body) = post_json(
        &app,
        "/api/activate",
        json!({ "license_key": expired_key, "machine_code": "M1" }),
    )
    .await;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["message"], json!("License key has expired"));
}

#[tokio::test]
async fn verify_authorizes_a_bound_machine() {
    let ctx = create_test_context();
    let app = app(&ctx);
    let key = seed_license(&ctx, LicenseType::Trial7d);

    let (_, unknown) = post_json(&app, "/api/verify", json!({ "machine_code": "M1" })).await;
    assert_eq!(unknown["authorized"], json!(false));

    post_json(
        &app,
        "/api/activate",
        json!({ "license_key": key, "machine_code": "M1" }),
    )
    .await;

    let (status, body) = post_json(&app, "/api/verify", json!({ "machine_code": "M1" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["authorized"], json!(true));
    assert_eq!(body["license_type"], json!("trial_7d"));
    assert!(body["expires_at"].is_i64());
}

#[tokio::test]
async fn verify_missing_machine_code_is_a_bad_request() {
    let ctx = create_test_context();
    let app = app(&ctx);

    let (status, _) = post_json(&app, "/api/verify", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn verify_lazily_expires_a_stale_license() {
    let ctx = create_test_context();
    let app = app(&ctx);

    let key;
    {
        let conn = ctx.state.db.get().unwrap();
        let license = queries::create_license(&conn, LicenseType::Trial1d, "").unwrap();
        // Activated in the past, expiry already behind us
        let long_ago = Utc::now().timestamp() - 10 * SECONDS_PER_DAY;
        queries::claim_pending_license(
            &conn,
            &license.id,
            "M1",
            long_ago,
            Some(long_ago + SECONDS_PER_DAY),
        )
        .unwrap();
        key = license.license_key;
    }

    let (status, body) = post_json(&app, "/api/verify", json!({ "machine_code": "M1" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["authorized"], json!(false));
    assert_eq!(body["message"], json!("License expired"));

    let conn = ctx.state.db.get().unwrap();
    let license = queries::get_license_by_key(&conn, &key).unwrap().unwrap();
    assert_eq!(license.status, LicenseStatus::Expired);

    // Subsequent verifies keep reporting not-authorized
    let (_, again) = post_json(&app, "/api/verify", json!({ "machine_code": "M1" })).await;
    assert_eq!(again["authorized"], json!(false));
}

#[tokio::test]
async fn permanent_license_verifies_without_expiry() {
    let ctx = create_test_context();
    let app = app(&ctx);
    let key = seed_license(&ctx, LicenseType::Permanent);

    let (_, activated) = post_json(
        &app,
        "/api/activate",
        json!({ "license_key": key, "machine_code": "M1" }),
    )
    .await;
    assert_eq!(activated["success"], json!(true));
    assert!(activated.get("expires_at").is_none() || activated["expires_at"].is_null());

    let (_, body) = post_json(&app, "/api/verify", json!({ "machine_code": "M1" })).await;
    assert_eq!(body["authorized"], json!(true));
    assert_eq!(body["license_type"], json!("permanent"));
}

#[tokio::test]
async fn end_to_end_trial_lifecycle() {
    let ctx = create_test_context();
    let app = app(&ctx);

    // Admin issues a single 1-day trial key
    let (_, generated) = post_json_admin(
        &app,
        "/api/admin/generate",
        json!({ "license_type": "trial_1d", "count": 1 }),
    )
    .await;
    let key = generated["licenses"][0]["license_key"]
        .as_str()
        .unwrap()
        .to_string();

    // Customer activates it on machine M1
    let before = Utc::now().timestamp();
    let (_, activated) = post_json(
        &app,
        "/api/activate",
        json!({ "license_key": key, "machine_code": "M1" }),
    )
    .await;
    assert_eq!(activated["success"], json!(true));
    let expires_at = activated["expires_at"].as_i64().unwrap();
    assert!((expires_at - (before + SECONDS_PER_DAY)).abs() <= 5);

    // The machine verifies fine while the trial runs
    let (_, verified) = post_json(&app, "/api/verify", json!({ "machine_code": "M1" })).await;
    assert_eq!(verified["authorized"], json!(true));

    // Fast-forward: push the stored expiry behind the clock
    {
        let conn = ctx.state.db.get().unwrap();
        let license = queries::get_license_by_key(&conn, &key).unwrap().unwrap();
        queries::set_expiry(&conn, &license.id, Some(before - 1)).unwrap();
    }

    let (_, stale) = post_json(&app, "/api/verify", json!({ "machine_code": "M1" })).await;
    assert_eq!(stale["authorized"], json!(false));

    let conn = ctx.state.db.get().unwrap();
    let license = queries::get_license_by_key(&conn, &key).unwrap().unwrap();
    assert_eq!(license.status, LicenseStatus::Expired);
}

#[tokio::test]
async fn health_reports_ok() {
    let ctx = create_test_context();
    let app = app(&ctx);

    let request = axum::http::Request::builder()
        .method("GET")
        .uri("/health")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(app, request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

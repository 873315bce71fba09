mod common;

use common::TestServer;
use reqwest::StatusCode;
use serde_json::{json, Value};

async fn book(srv: &TestServer, token: &str, hospital: &str) -> reqwest::Response {
    srv.client
        .post(srv.url(&format!("/hospitals/{}/appointments", hospital)))
        .bearer_auth(token)
        .json(&json!({"apptDate": "2026-11-02T09:30:00Z"}))
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn users_hold_at_most_three_bookings() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin().await;
    let hospital = srv.create_hospital(&admin, "General").await;
    let hospital_id = hospital["id"].as_str().unwrap();
    let (user_id, user) = srv.seed_user("jane@example.com", "user").await;

    for _ in 0..3 {
        let res = book(&srv, &user, hospital_id).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["data"]["user"], user_id.as_str());
        assert_eq!(body["data"]["hospital"]["name"], "General");
    }
    let res = book(&srv, &user, hospital_id).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // admins are not capped
    for _ in 0..4 {
        assert_eq!(book(&srv, &admin, hospital_id).await.status(), StatusCode::CREATED);
    }
}

#[tokio::test]
async fn users_only_see_their_own() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin().await;
    let hospital = srv.create_hospital(&admin, "General").await;
    let hospital_id = hospital["id"].as_str().unwrap();
    let (_, jane) = srv.seed_user("jane@example.com", "user").await;
    let (_, john) = srv.seed_user("john@example.com", "user").await;

    let body: Value = book(&srv, &jane, hospital_id).await.json().await.unwrap();
    let appt_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(book(&srv, &john, hospital_id).await.status(), StatusCode::CREATED);

    let url = srv.url(&format!("/appointments/{}", appt_id));
    let res = srv.client.get(&url).bearer_auth(&john).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let res = srv
        .client
        .put(&url)
        .bearer_auth(&john)
        .json(&json!({"apptDate": "2026-12-01T10:00:00Z"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let res = srv.client.delete(&url).bearer_auth(&john).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = srv.client.get(&url).bearer_auth(&jane).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let res = srv.client.get(&url).bearer_auth(&admin).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let mine: Value = srv
        .client
        .get(srv.url("/appointments"))
        .bearer_auth(&jane)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(mine["meta"]["total"], 1);
    let all: Value = srv
        .client
        .get(srv.url(&format!("/hospitals/{}/appointments", hospital_id)))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(all["meta"]["total"], 2);
}

#[tokio::test]
async fn booking_requires_existing_hospital_and_login() {
    let srv = TestServer::spawn().await;
    let (_, user) = srv.seed_user("jane@example.com", "user").await;

    let res = book(&srv, &user, "6f1c1f3e-8f49-4a43-9d6b-6b8e2f7f0a11").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = srv
        .client
        .post(srv.url("/appointments"))
        .bearer_auth(&user)
        .json(&json!({"apptDate": "2026-11-02T09:30:00Z"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = srv.client.get(srv.url("/appointments")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn owner_updates_and_deletes() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin().await;
    let hospital = srv.create_hospital(&admin, "General").await;
    let hospital_id = hospital["id"].as_str().unwrap();
    let (_, jane) = srv.seed_user("jane@example.com", "user").await;

    let body: Value = book(&srv, &jane, hospital_id).await.json().await.unwrap();
    let url = srv.url(&format!("/appointments/{}", body["data"]["id"].as_str().unwrap()));

    let res = srv
        .client
        .put(&url)
        .bearer_auth(&jane)
        .json(&json!({"apptDate": "2026-12-01T10:00:00Z"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: Value = res.json().await.unwrap();
    assert_eq!(updated["data"]["apptDate"], "2026-12-01T10:00:00Z");

    let res = srv.client.delete(&url).bearer_auth(&jane).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let res = srv.client.get(&url).bearer_auth(&jane).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

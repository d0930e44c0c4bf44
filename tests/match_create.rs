mod support;

#[tokio::test]
async fn test_match_creation() {
    let base_url = support::server_url();
    let client = reqwest::Client::new();
    let match_id = format!("match-{}", uuid::Uuid::new_v4());
    let payload = serde_json::json!({
        "match_id": match_id,
        "allowed_player_ids": []
    });

    let res = client
        .post(format!("{base_url}/matches"))
        .json(&payload)
        .send()
        .await
        .expect("request should succeed");

    assert_eq!(res.status(), reqwest::StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.expect("response should be json");
    assert_eq!(body["match_id"], serde_json::json!(match_id));
}

#[tokio::test]
async fn test_match_creation_with_rosters() {
    let base_url = support::server_url();
    let client = reqwest::Client::new();
    let match_id = format!("match-{}", uuid::Uuid::new_v4());
    // Rostered ids should be accepted without an explicit allow list.
    let payload = serde_json::json!({
        "match_id": match_id,
        "red_team_ids": [101, 102],
        "blue_team_ids": [201]
    });

    let res = client
        .post(format!("{base_url}/matches"))
        .json(&payload)
        .send()
        .await
        .expect("request should succeed");

    assert_eq!(res.status(), reqwest::StatusCode::CREATED);
}

#[tokio::test]
async fn test_duplicate_match_rejected() {
    let base_url = support::server_url();
    let client = reqwest::Client::new();
    let match_id = format!("match-{}", uuid::Uuid::new_v4());
    let payload = serde_json::json!({ "match_id": match_id });

    let first = client
        .post(format!("{base_url}/matches"))
        .json(&payload)
        .send()
        .await
        .expect("request should succeed");
    assert_eq!(first.status(), reqwest::StatusCode::CREATED);

    let second = client
        .post(format!("{base_url}/matches"))
        .json(&payload)
        .send()
        .await
        .expect("request should succeed");
    assert_eq!(second.status(), reqwest::StatusCode::CONFLICT);
    let body: serde_json::Value = second.json().await.expect("response should be json");
    assert_eq!(body["error"], serde_json::json!("match already exists"));
}

#[tokio::test]
async fn test_blank_match_id_rejected() {
    let base_url = support::server_url();
    let client = reqwest::Client::new();
    let payload = serde_json::json!({ "match_id": "   " });

    let res = client
        .post(format!("{base_url}/matches"))
        .json(&payload)
        .send()
        .await
        .expect("request should succeed");

    assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.expect("response should be json");
    assert_eq!(body["error"], serde_json::json!("match_id is required"));
}

use holdem_web::server::{routes, AppContext};
use serde_json::{json, Value};
use warp::filters::BoxedFilter;
use warp::http::StatusCode;
use warp::reply::Response;

struct Api {
    ctx: AppContext,
    filter: BoxedFilter<(Response,)>,
}

impl Api {
    fn new() -> Self {
        let ctx = AppContext::new_for_tests();
        let filter = routes(&ctx);
        Self { ctx, filter }
    }

    async fn call(&self, method: &str, path: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = warp::test::request().method(method).path(path);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.reply(&self.filter).await;
        let status = response.status();
        let json = if response.body().is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(response.body()).expect("json body")
        };
        (status, json)
    }

    async fn create_room(&self, physical: bool) -> String {
        let (status, body) = self
            .call("POST", "/api/rooms", Some(json!({ "physical_deck": physical })))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["code"].as_str().expect("code").to_string()
    }

    async fn join(&self, code: &str, name: &str) -> String {
        let (status, body) = self
            .call(
                "POST",
                &format!("/api/rooms/{code}/players"),
                Some(json!({ "name": name })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["player_id"].as_str().expect("player id").to_string()
    }

    async fn act(&self, code: &str, player_id: &str, action: Value) -> (StatusCode, Value) {
        let mut body = action;
        body["player_id"] = json!(player_id);
        self.call("POST", &format!("/api/rooms/{code}/actions"), Some(body))
            .await
    }
}

#[tokio::test]
async fn health_reports_ok() {
    let api = Api::new();
    let (status, body) = api.call("GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn create_join_and_fetch_room() {
    let api = Api::new();
    let code = api.create_room(false).await;
    assert_eq!(code.len(), 5);

    let alice = api.join(&code, "Alice").await;
    assert!(uuid::Uuid::parse_str(&alice).is_ok());

    let (status, snapshot) = api
        .call("GET", &format!("/api/rooms/{}", code.to_lowercase()), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["code"], code.as_str());
    assert_eq!(snapshot["phase"], "waiting");
    assert_eq!(snapshot["players"][0]["name"], "Alice");
    assert!(snapshot["players"][0].get("id").is_none());
    assert_eq!(snapshot["players"][0]["balance"], 1000);
}

#[tokio::test]
async fn unknown_room_is_404() {
    let api = Api::new();
    let (status, body) = api.call("GET", "/api/rooms/ZZZZZ", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "game_not_found");
    assert_eq!(body["details"]["code"], "ZZZZZ");
}

#[tokio::test]
async fn join_conflicts_are_409() {
    let api = Api::new();
    let code = api.create_room(false).await;
    for name in ["a", "b", "c", "d"] {
        api.join(&code, name).await;
    }
    let path = format!("/api/rooms/{code}/players");
    let (status, body) = api.call("POST", &path, Some(json!({ "name": "e" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "room_full");

    let other = api.create_room(false).await;
    api.join(&other, "Alice").await;
    let (status, body) = api
        .call(
            "POST",
            &format!("/api/rooms/{other}/players"),
            Some(json!({ "name": "ALICE" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "name_taken");
}

#[tokio::test]
async fn betting_through_the_api() {
    let api = Api::new();
    let code = api.create_room(false).await;
    let a = api.join(&code, "a").await;
    let b = api.join(&code, "b").await;

    let (status, body) = api.call("POST", &format!("/api/rooms/{code}/start"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["started"], true);

    // heads-up: the dealer posts the small blind and acts first
    let (status, body) = api.act(&code, &b, json!({ "kind": "check_or_call" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "not_your_turn");

    let (status, body) = api.act(&code, &a, json!({ "kind": "raise", "amount": 1 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_action");
    assert_eq!(body["details"]["minimum"], 2);

    let (status, body) = api.act(&code, &a, json!({ "kind": "raise" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_action");

    let (status, snapshot) = api.act(&code, &a, json!({ "kind": "raise", "amount": 4 })).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(snapshot["highest_bet"], 6);
    assert_eq!(snapshot["min_raise"], 4);

    let (status, snapshot) = api.act(&code, &b, json!({ "kind": "fold" })).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(snapshot["phase"], "showdown");
    assert_eq!(snapshot["players"][0]["balance"], 1002);

    let (status, body) = api.act(&code, &a, json!({ "kind": "fold" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");
}

#[tokio::test]
async fn starting_twice_conflicts() {
    let api = Api::new();
    let code = api.create_room(false).await;
    api.join(&code, "a").await;

    let path = format!("/api/rooms/{code}/start");
    let (_, body) = api.call("POST", &path, None).await;
    assert_eq!(body["started"], false);

    api.join(&code, "b").await;
    let (status, _) = api.call("POST", &path, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = api.call("POST", &path, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "invalid_action");
}

#[tokio::test]
async fn leaving_and_rejoining() {
    let api = Api::new();
    let code = api.create_room(false).await;
    let a = api.join(&code, "a").await;
    let b = api.join(&code, "b").await;

    let (status, snapshot) = api
        .call("POST", &format!("/api/rooms/{code}/players/{a}/rejoin"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["players"].as_array().map(Vec::len), Some(2));

    let (status, body) = api
        .call("DELETE", &format!("/api/rooms/{code}/players/{b}"), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, body) = api
        .call("DELETE", &format!("/api/rooms/{code}/players/{b}"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "player_not_found");
}

#[tokio::test]
async fn physical_room_settles_by_hand() {
    let api = Api::new();
    let code = api.create_room(true).await;
    let a = api.join(&code, "a").await;
    let b = api.join(&code, "b").await;
    api.call("POST", &format!("/api/rooms/{code}/start"), None).await;

    let winners = format!("/api/rooms/{code}/winners");
    let (status, body) = api
        .call("POST", &winners, Some(json!({ "winners": [0], "amount": 4 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_action");

    api.act(&code, &a, json!({ "kind": "check_or_call" })).await;
    api.act(&code, &b, json!({ "kind": "check_or_call" })).await;
    for _ in 0..3 {
        api.act(&code, &b, json!({ "kind": "check_or_call" })).await;
        api.act(&code, &a, json!({ "kind": "check_or_call" })).await;
    }
    let (_, snapshot) = api.call("GET", &format!("/api/rooms/{code}"), None).await;
    assert_eq!(snapshot["phase"], "showdown");
    assert_eq!(snapshot["community_cards"], json!([]));

    let (status, snapshot) = api
        .call("POST", &winners, Some(json!({ "winners": [1], "amount": 4 })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["players"][1]["balance"], 1002);
    assert_eq!(snapshot["pots"], json!([]));
}

#[tokio::test]
async fn malformed_requests_get_json_errors() {
    let api = Api::new();
    let code = api.create_room(false).await;

    let (status, body) = api
        .call(
            "POST",
            &format!("/api/rooms/{code}/players"),
            Some(json!({ "nickname": "a" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");

    let (status, body) = api.call("GET", "/api/nowhere", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    assert!(api.ctx.event_bus().subscriber_count() == 0);
}

#[tokio::test]
async fn rejected_requests_are_logged() {
    let logs = holdem_web::init_test_logging();
    let api = Api::new();
    let (status, _) = api.call("GET", "/api/rooms/QQQQQ", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let logged = logs
        .entries()
        .into_iter()
        .any(|e| e.message.contains("request rejected") && e.field("error") == Some("game_not_found"));
    assert!(logged, "client error was not logged");
}

#[tokio::test]
async fn seat_ids_stay_private() {
    let api = Api::new();
    let code = api.create_room(false).await;
    let alice = api.join(&code, "Alice").await;
    api.join(&code, "Bob").await;
    api.call("POST", &format!("/api/rooms/{code}/start"), None).await;

    let (status, snapshot) = api.call("GET", &format!("/api/rooms/{code}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!snapshot.to_string().contains(&alice));
    assert_eq!(snapshot["players"][0]["seat"], 0);

    // only the id handed out at join can act for a seat
    let (status, body) = api.act(&code, "Alice", json!({ "kind": "fold" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "player_not_found");
    let (status, _) = api.act(&code, &alice, json!({ "kind": "fold" })).await;
    assert_eq!(status, StatusCode::ACCEPTED);
}

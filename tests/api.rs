use std::{collections::HashMap, sync::Arc};

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
    response::Response,
};
use futures::future::BoxFuture;
use indexmap::IndexMap;
use serde_json::{Value, json};
use tower::ServiceExt;
use url::Url;

use trivai_back::{
    config::{AppConfig, GoogleSettings},
    dao::store::MemoryStore,
    routes,
    services::{
        generator::{GeneratorError, QuestionGenerator},
        google::{
            CodeExchange, GoogleClient, GoogleError, GoogleProfile, IdTokenClaims, TokenExchange,
        },
    },
    state::{
        AppState, SharedState,
        connections::{Difficulty, Group, Puzzle},
        feud::FeudRound,
        jeopardy::{Board, Clue},
    },
};

/// Deterministic content for every game.
struct ScriptedGenerator;

impl QuestionGenerator for ScriptedGenerator {
    fn jeopardy(&self, theme: String) -> BoxFuture<'static, Result<Board, GeneratorError>> {
        Box::pin(async move {
            let clues = vec![
                Clue {
                    question: format!("{theme} clue"),
                    answer: "Answer".into(),
                    value: 200,
                    daily_double: false,
                    image: None,
                },
                Clue {
                    question: format!("{theme} harder clue"),
                    answer: "Other".into(),
                    value: 400,
                    daily_double: false,
                    image: None,
                },
            ];
            Ok(Board {
                categories: vec![theme.clone()],
                questions: IndexMap::from([(theme, clues)]),
            })
        })
    }

    fn feud(
        &self,
        theme: String,
        num_questions: usize,
    ) -> BoxFuture<'static, Result<Vec<FeudRound>, GeneratorError>> {
        Box::pin(async move {
            Ok((1..=num_questions as u32)
                .map(|id| FeudRound {
                    id,
                    question: format!("Name something about {theme}"),
                    answers: vec!["First".into(), "Second".into()],
                    points: vec![70, 30],
                })
                .collect())
        })
    }

    fn connections(
        &self,
        theme: String,
        num_groups: usize,
        items_per_group: usize,
    ) -> BoxFuture<'static, Result<Puzzle, GeneratorError>> {
        Box::pin(async move {
            let groups = (0..num_groups)
                .map(|group| Group {
                    category: format!("{theme} {group}"),
                    items: (0..items_per_group)
                        .map(|item| format!("{theme}-{group}-{item}"))
                        .collect(),
                    difficulty: Difficulty::Common,
                })
                .collect();
            Ok(Puzzle { groups })
        })
    }
}

/// Accepts the ID token `good-id-token` for the `web-client` audience.
struct FakeGoogle;

impl GoogleClient for FakeGoogle {
    fn exchange_code(
        &self,
        request: CodeExchange,
    ) -> BoxFuture<'static, Result<TokenExchange, GoogleError>> {
        let result = match request.code.as_str() {
            "good-code" => Ok(TokenExchange {
                access_token: Some("access".into()),
                id_token: Some("good-id-token".into()),
            }),
            "no-id-token" => Ok(TokenExchange {
                access_token: Some("access".into()),
                id_token: None,
            }),
            _ => Err(GoogleError::Rejected("invalid_grant".into())),
        };
        Box::pin(async move { result })
    }

    fn fetch_user_info(
        &self,
        _access_token: String,
    ) -> BoxFuture<'static, Result<GoogleProfile, GoogleError>> {
        Box::pin(async {
            Ok(GoogleProfile {
                name: Some("Grace Hopper".into()),
                email: Some("grace@example.com".into()),
            })
        })
    }

    fn verify_id_token(
        &self,
        id_token: String,
        client_id: String,
    ) -> BoxFuture<'static, Result<IdTokenClaims, GoogleError>> {
        let result = if id_token == "good-id-token" && client_id == "web-client" {
            Ok(IdTokenClaims {
                iss: "https://accounts.google.com".into(),
                aud: client_id,
                sub: "google-42".into(),
                email: Some("grace@example.com".into()),
                name: Some("Grace Hopper".into()),
                picture: None,
            })
        } else {
            Err(GoogleError::Rejected("Token is invalid or expired".into()))
        };
        Box::pin(async move { result })
    }
}

fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.auth.jwt_secret = "test-secret".into();
    config.google = GoogleSettings {
        client_ids: vec!["web-client".into()],
        client_secret: Some("shh".into()),
        app_url: Some("https://trivai.test".into()),
    };
    config
}

async fn test_app() -> (Router, SharedState) {
    let state = AppState::new(test_config(), Arc::new(ScriptedGenerator), Arc::new(FakeGoogle));
    state.install_store(Arc::new(MemoryStore::new())).await;
    (routes::router(state.clone()), state)
}

async fn degraded_app() -> Router {
    let state = AppState::new(test_config(), Arc::new(ScriptedGenerator), Arc::new(FakeGoogle));
    routes::router(state)
}

async fn send(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(body) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(body.to_string())
        }
        None => Body::empty(),
    };
    app.clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn register(app: &Router, email: &str, username: &str) -> String {
    let response = send(
        app,
        Method::POST,
        "/api/v1/auth/register",
        None,
        Some(json!({ "email": email, "username": username, "password": "correct horse" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["token_type"], "bearer");
    body["access_token"].as_str().unwrap().to_owned()
}

fn location(response: &Response) -> Url {
    let value = response.headers()[header::LOCATION].to_str().unwrap();
    Url::parse(value).unwrap()
}

fn query_map(url: &Url) -> HashMap<String, String> {
    url.query_pairs().into_owned().collect()
}

#[tokio::test]
async fn welcome_and_health() {
    let (app, _) = test_app().await;

    let response = send(&app, Method::GET, "/", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["message"], "Welcome to TrivAI API!");

    let response = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(json_body(response).await["status"], "ok");

    let response = send(&degraded_app().await, Method::GET, "/health", None, None).await;
    assert_eq!(json_body(response).await["status"], "degraded");
}

#[tokio::test]
async fn register_login_and_me() {
    let (app, _) = test_app().await;
    let token = register(&app, "Ada@Example.com", "ada").await;

    let response = send(&app, Method::GET, "/api/v1/auth/me", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let me = json_body(response).await;
    assert_eq!(me["email"], "ada@example.com");
    assert_eq!(me["username"], "ada");
    assert_eq!(me["is_active"], true);

    let response = send(
        &app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({ "email": " ADA@example.com ", "password": "correct horse" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        &app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({ "email": "ada@example.com", "password": "wrong password" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["message"], "Incorrect email or password");
}

#[tokio::test]
async fn duplicate_accounts_are_rejected() {
    let (app, _) = test_app().await;
    register(&app, "ada@example.com", "ada").await;

    let response = send(
        &app,
        Method::POST,
        "/api/v1/auth/register",
        None,
        Some(json!({ "email": "ADA@example.com", "username": "other", "password": "long enough" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["message"], "Email already registered");

    let response = send(
        &app,
        Method::POST,
        "/api/v1/auth/register",
        None,
        Some(json!({ "email": "new@example.com", "username": "ada", "password": "long enough" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["message"], "Username already taken");
}

#[tokio::test]
async fn short_password_fails_validation() {
    let (app, _) = test_app().await;
    let response = send(
        &app,
        Method::POST,
        "/api/v1/auth/register",
        None,
        Some(json!({ "email": "ada@example.com", "username": "ada", "password": "short" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn protected_routes_challenge_for_bearer() {
    let (app, _) = test_app().await;

    let response = send(&app, Method::GET, "/api/v1/auth/me", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");

    let response = send(&app, Method::GET, "/api/v1/scores/me", Some("not-a-jwt"), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["message"], "Could not validate credentials");
}

#[tokio::test]
async fn google_id_token_login_creates_account() {
    let (app, _) = test_app().await;

    let response = send(
        &app,
        Method::POST,
        "/api/v1/auth/google",
        None,
        Some(json!({ "token": "good-id-token" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let token = json_body(response).await["access_token"].as_str().unwrap().to_owned();

    let me = json_body(send(&app, Method::GET, "/api/v1/auth/me", Some(&token), None).await).await;
    assert_eq!(me["email"], "grace@example.com");
    assert_eq!(me["username"], "grace");

    let response = send(
        &app,
        Method::POST,
        "/api/v1/auth/google",
        None,
        Some(json!({ "token": "forged" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn generated_games_are_saved_and_listed() {
    let (app, _) = test_app().await;
    let token = register(&app, "ada@example.com", "ada").await;

    let response = send(
        &app,
        Method::POST,
        "/api/v1/jeopardy/generate",
        Some(&token),
        Some(json!({ "theme": "Space" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let board = json_body(response).await;
    assert_eq!(board["categories"], json!(["Space"]));
    assert_eq!(board["questions"]["Space"][0]["value"], 200);
    let game_id = board["game_id"].as_str().unwrap().to_owned();

    let response = send(
        &app,
        Method::POST,
        "/api/v1/connections/generate",
        None,
        Some(json!({ "theme": "Birds", "num_groups": 2, "items_per_group": 3 })),
    )
    .await;
    let puzzle = json_body(response).await;
    assert_eq!(puzzle["status"], "success");
    assert_eq!(puzzle["data"]["groups"].as_array().unwrap().len(), 2);

    let listing = json_body(send(&app, Method::GET, "/api/v1/games", None, None).await).await;
    assert_eq!(listing.as_array().unwrap().len(), 2);

    let listing = json_body(
        send(&app, Method::GET, "/api/v1/games?game_type=jeopardy", None, None).await,
    )
    .await;
    assert_eq!(listing.as_array().unwrap().len(), 1);
    assert_eq!(listing[0]["id"], game_id.as_str());
    assert_eq!(listing[0]["title"], "Space");

    let detail = json_body(
        send(&app, Method::GET, &format!("/api/v1/games/{game_id}"), None, None).await,
    )
    .await;
    assert_eq!(detail["game_type"], "jeopardy");
    assert_eq!(detail["data"]["categories"], json!(["Space"]));
}

#[tokio::test]
async fn blank_theme_is_rejected() {
    let (app, _) = test_app().await;
    let response = send(
        &app,
        Method::POST,
        "/api/v1/feud/generate",
        None,
        Some(json!({ "theme": "   " })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn storage_routes_answer_503_in_degraded_mode() {
    let app = degraded_app().await;
    let response = send(&app, Method::GET, "/api/v1/games", None, None).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    // Generation keeps working without storage; the result just is not saved.
    let response = send(
        &app,
        Method::POST,
        "/api/v1/feud/generate",
        None,
        Some(json!({ "theme": "Food", "num_questions": 2 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["questions"].as_array().unwrap().len(), 2);
    assert!(body.get("game_id").is_none());
}

#[tokio::test]
async fn jeopardy_session_records_final_score() {
    let (app, _) = test_app().await;
    let token = register(&app, "ada@example.com", "ada").await;

    let board = json!({
        "categories": ["Science"],
        "questions": {
            "Science": [
                { "question": "Red planet", "answer": "Mars", "value": 400 },
                { "question": "H2O", "answer": "Water", "value": 200 }
            ]
        }
    });
    let response = send(
        &app,
        Method::POST,
        "/api/v1/jeopardy/sessions",
        Some(&token),
        Some(json!({ "board": board })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let view = json_body(response).await;
    assert_eq!(view["phase"], "board");
    assert_eq!(view["total"], 2);
    assert!(view["categories"][0]["clues"][0].get("answer").is_none());
    let session = view["session_id"].as_str().unwrap().to_owned();
    let base = format!("/api/v1/jeopardy/sessions/{session}");

    let selection = json_body(
        send(
            &app,
            Method::POST,
            &format!("{base}/select"),
            Some(&token),
            Some(json!({ "category": 0, "clue": 0 })),
        )
        .await,
    )
    .await;
    assert_eq!(selection["value"], 200);
    assert_eq!(selection["question"], "H2O");

    let response = send(
        &app,
        Method::POST,
        &format!("{base}/select"),
        Some(&token),
        Some(json!({ "category": 0, "clue": 1 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let settled = json_body(
        send(
            &app,
            Method::POST,
            &format!("{base}/answer"),
            Some(&token),
            Some(json!({ "answer": "what is water" })),
        )
        .await,
    )
    .await;
    assert_eq!(settled["correct"], true);
    assert_eq!(settled["delta"], 200);
    assert_eq!(settled["finished"], false);

    send(
        &app,
        Method::POST,
        &format!("{base}/select"),
        Some(&token),
        Some(json!({ "category": 0, "clue": 1 })),
    )
    .await;
    let settled = json_body(
        send(
            &app,
            Method::POST,
            &format!("{base}/judge"),
            Some(&token),
            Some(json!({ "correct": false })),
        )
        .await,
    )
    .await;
    assert_eq!(settled["expected_answer"], "Mars");
    assert_eq!(settled["score"], -200);
    assert_eq!(settled["finished"], true);

    let view = json_body(send(&app, Method::GET, &base, Some(&token), None).await).await;
    assert_eq!(view["phase"], "game_over");
    assert_eq!(view["categories"][0]["clues"][1]["answer"], "Mars");

    let scores = json_body(send(&app, Method::GET, "/api/v1/scores/me", Some(&token), None).await).await;
    assert_eq!(scores.as_array().unwrap().len(), 1);
    assert_eq!(scores[0]["game_type"], "jeopardy");
    assert_eq!(scores[0]["score"], -200);
}

#[tokio::test]
async fn session_needs_exactly_one_source() {
    let (app, _) = test_app().await;
    let token = register(&app, "ada@example.com", "ada").await;

    let response = send(&app, Method::POST, "/api/v1/feud/sessions", Some(&token), Some(json!({}))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        Method::POST,
        "/api/v1/jeopardy/sessions",
        Some(&token),
        Some(json!({ "theme": "Space", "game_id": uuid::Uuid::new_v4() })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn feud_session_ends_after_three_strikes() {
    let (app, _) = test_app().await;
    let token = register(&app, "ada@example.com", "ada").await;

    let rounds = json!([{
        "id": 1,
        "question": "Name a fruit",
        "answers": ["Apple", "Banana"],
        "points": [60, 30]
    }]);
    let view = json_body(
        send(
            &app,
            Method::POST,
            "/api/v1/feud/sessions",
            Some(&token),
            Some(json!({ "rounds": rounds })),
        )
        .await,
    )
    .await;
    assert_eq!(view["current"]["answers"][0]["revealed"], false);
    assert!(view["current"]["answers"][0].get("answer").is_none());
    let base = format!("/api/v1/feud/sessions/{}", view["session_id"].as_str().unwrap());

    let guess = json_body(
        send(
            &app,
            Method::POST,
            &format!("{base}/answer"),
            Some(&token),
            Some(json!({ "answer": "  APPLE! " })),
        )
        .await,
    )
    .await;
    assert_eq!(guess["matched"], true);
    assert_eq!(guess["rank"], 1);
    assert_eq!(guess["points"], 60);

    let mut misses = Vec::new();
    for _ in 0..3 {
        let miss = json_body(
            send(
                &app,
                Method::POST,
                &format!("{base}/answer"),
                Some(&token),
                Some(json!({ "answer": "kiwi" })),
            )
            .await,
        )
        .await;
        misses.push(miss);
    }
    assert_eq!(misses[0]["strikes"], 1);
    assert_eq!(misses[2]["strikes"], 3);
    assert_eq!(misses[2]["finished"], true);

    let response = send(
        &app,
        Method::POST,
        &format!("{base}/answer"),
        Some(&token),
        Some(json!({ "answer": "banana" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let scores = json_body(send(&app, Method::GET, "/api/v1/scores/me", Some(&token), None).await).await;
    assert_eq!(scores[0]["game_type"], "feud");
    assert_eq!(scores[0]["score"], 60);
}

#[tokio::test]
async fn connections_session_solves_groups() {
    let (app, _) = test_app().await;
    let token = register(&app, "ada@example.com", "ada").await;

    let puzzle = json!({ "groups": [
        { "category": "Fruit", "items": ["apple", "pear", "plum"] },
        { "category": "Colors", "items": ["red", "blue", "green"] }
    ]});
    let view = json_body(
        send(
            &app,
            Method::POST,
            "/api/v1/connections/sessions",
            Some(&token),
            Some(json!({ "puzzles": [puzzle] })),
        )
        .await,
    )
    .await;
    assert_eq!(view["group_size"], 3);
    assert_eq!(view["solved"], json!([]));
    let base = format!(
        "/api/v1/connections/sessions/{}",
        view["session_id"].as_str().unwrap()
    );

    let tile_of = |item: &str| -> u64 {
        view["tiles"]
            .as_array()
            .unwrap()
            .iter()
            .find(|tile| tile["item"] == item)
            .unwrap()["id"]
            .as_u64()
            .unwrap()
    };

    for item in ["apple", "pear", "red"] {
        send(
            &app,
            Method::POST,
            &format!("{base}/toggle"),
            Some(&token),
            Some(json!({ "tile": tile_of(item) })),
        )
        .await;
    }
    let miss = json_body(send(&app, Method::POST, &format!("{base}/submit"), Some(&token), None).await).await;
    assert_eq!(miss["correct"], false);
    assert_eq!(miss["one_away"], true);
    assert_eq!(miss["mistakes"], 1);

    for group in [["apple", "pear", "plum"], ["red", "blue", "green"]] {
        for item in group {
            send(
                &app,
                Method::POST,
                &format!("{base}/toggle"),
                Some(&token),
                Some(json!({ "tile": tile_of(item) })),
            )
            .await;
        }
        let hit = json_body(send(&app, Method::POST, &format!("{base}/submit"), Some(&token), None).await).await;
        assert_eq!(hit["correct"], true);
    }

    let view = json_body(send(&app, Method::GET, &base, Some(&token), None).await).await;
    assert_eq!(view["phase"], "game_over");
    assert_eq!(view["score"], 200);
    assert_eq!(view["solved"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn sessions_are_private_to_their_owner() {
    let (app, _) = test_app().await;
    let owner = register(&app, "ada@example.com", "ada").await;
    let intruder = register(&app, "eve@example.com", "eve").await;

    let view = json_body(
        send(
            &app,
            Method::POST,
            "/api/v1/jeopardy/sessions",
            Some(&owner),
            Some(json!({ "theme": "Space" })),
        )
        .await,
    )
    .await;
    let session = view["session_id"].as_str().unwrap().to_owned();
    assert!(view.get("game_id").is_some());

    let uri = format!("/api/v1/jeopardy/sessions/{session}");
    let response = send(&app, Method::GET, &uri, Some(&intruder), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&app, Method::GET, &format!("/api/v1/feud/sessions/{session}"), Some(&owner), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&app, Method::DELETE, &format!("/api/v1/sessions/{session}"), Some(&intruder), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&app, Method::DELETE, &format!("/api/v1/sessions/{session}"), Some(&owner), None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(&app, Method::GET, &uri, Some(&owner), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn oauth_start_redirects_to_google() {
    let (app, _) = test_app().await;
    let response = send(
        &app,
        Method::GET,
        "/auth/google?mode=signup&redirect=/play/feud",
        None,
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FOUND);

    let target = location(&response);
    assert_eq!(target.host_str(), Some("accounts.google.com"));
    let params = query_map(&target);
    assert_eq!(params["client_id"], "web-client");
    assert_eq!(params["redirect_uri"], "https://trivai.test/auth/google/callback");
    assert!(params.contains_key("state"));
}

#[tokio::test]
async fn oauth_callback_hands_token_to_web_app() {
    let (app, _) = test_app().await;
    let state = trivai_back::services::oauth_service::encode_state(
        &trivai_back::services::oauth_service::OAuthState {
            redirect_path: "/play/jeopardy".into(),
            ..Default::default()
        },
    );

    let mut callback = Url::parse("http://localhost/auth/google/callback").unwrap();
    callback
        .query_pairs_mut()
        .append_pair("code", "good-code")
        .append_pair("state", &state);
    let uri = format!("{}?{}", callback.path(), callback.query().unwrap());

    let response = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    let target = location(&response);
    assert_eq!(target.path(), "/play/jeopardy");
    let params = query_map(&target);
    assert_eq!(params["auth_success"], "1");
    assert_eq!(params["user_name"], "Grace Hopper");
    assert_eq!(params["redirect_path"], "/play/jeopardy");

    let me = send(&app, Method::GET, "/api/v1/auth/me", Some(&params["app_token"]), None).await;
    assert_eq!(me.status(), StatusCode::OK);
}

#[tokio::test]
async fn oauth_redirects_cannot_leave_the_web_app() {
    use trivai_back::services::oauth_service::{OAuthState, decode_state, encode_state};

    let (app, _) = test_app().await;
    let response = send(
        &app,
        Method::GET,
        "/auth/google?redirect=/%09/evil.example",
        None,
        None,
    )
    .await;
    let params = query_map(&location(&response));
    assert_eq!(decode_state(Some(&params["state"])).redirect_path, "/home");

    // a state crafted by hand skips the start route
    let state = encode_state(&OAuthState {
        redirect_path: "/\t/evil.example/x".into(),
        ..Default::default()
    });
    let mut callback = Url::parse("http://localhost/auth/google/callback").unwrap();
    callback
        .query_pairs_mut()
        .append_pair("code", "good-code")
        .append_pair("state", &state);
    let uri = format!("{}?{}", callback.path(), callback.query().unwrap());

    let response = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    let target = location(&response);
    assert_eq!(target.host_str(), Some("trivai.test"));
    assert_eq!(target.path(), "/home");
    let params = query_map(&target);
    assert_eq!(params["auth_success"], "1");
    assert_eq!(params["redirect_path"], "/home");
}

#[tokio::test]
async fn oauth_callback_reports_failures_as_params() {
    let (app, _) = test_app().await;

    let response = send(&app, Method::GET, "/auth/google/callback?error=access_denied", None, None).await;
    let params = query_map(&location(&response));
    assert_eq!(params["auth_error"], "access_denied");

    let response = send(&app, Method::GET, "/auth/google/callback", None, None).await;
    assert_eq!(query_map(&location(&response))["auth_error"], "missing_code");

    let response = send(&app, Method::GET, "/auth/google/callback?code=no-id-token", None, None).await;
    assert_eq!(query_map(&location(&response))["auth_error"], "missing_id_token");

    let response = send(&app, Method::GET, "/auth/google/callback?code=expired", None, None).await;
    let target = location(&response);
    assert_eq!(target.path(), "/home");
    assert_eq!(query_map(&target)["auth_error"], "oauth_failed");
}

#[tokio::test]
async fn oauth_without_configuration_is_a_server_error() {
    let mut config = test_config();
    config.google.client_secret = None;
    let state = AppState::new(config, Arc::new(ScriptedGenerator), Arc::new(FakeGoogle));
    let app = routes::router(state);

    let response = send(&app, Method::GET, "/auth/google", None, None).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json_body(response).await["error"],
        "Google OAuth is not configured on the server."
    );
}

//! Whole-pipeline tests: global stages, dispatch, per-route chains and
//! the fault wrapper working together.

use std::sync::Arc;

use bytes::Bytes;
use http::{header, Method, StatusCode};
use http_body_util::{BodyExt, Full};
use parking_lot::Mutex;
use pathway_core::{Envelope, Fault, FaultResult, Principal, ResourceId};
use pathway_middleware::stages::{AccessLogMiddleware, BodyParserMiddleware, CorsMiddleware, RequestIdMiddleware};
use pathway_middleware::{
    catch_fault, AuthGate, BoxFuture, Endpoint, FieldRule, GlobalStage, IdGuard, MemorySessionStore,
    MiddlewareContext, Pipeline, Reply, Request, RequestState, Response, RouteChain, SessionMiddleware,
    SessionSettings, ValidationMiddleware,
};
use pathway_router::Router;
use serde_json::{json, Value};

#[derive(Default)]
struct Notes {
    titles: Mutex<Vec<String>>,
}

fn login<'a>(_: &'a Notes, ctx: &'a mut MiddlewareContext) -> BoxFuture<'a, FaultResult<Reply>> {
    Box::pin(async move {
        let username = ctx.body_str("username").unwrap_or_default().to_string();
        let id: ResourceId = "65a1f0c2e4b0a1b2c3d4e5f6".parse().map_err(|_| Fault::unclassified("bad id"))?;
        ctx.establish_session(Principal::new(id, username.clone()));
        Ok(Reply::ok("Logged in successfully").with_data(json!({ "username": username })))
    })
}

fn create_note<'a>(notes: &'a Notes, ctx: &'a mut MiddlewareContext) -> BoxFuture<'a, FaultResult<Reply>> {
    Box::pin(async move {
        let title = ctx.body_str("title").unwrap_or_default().to_string();
        let mut titles = notes.titles.lock();
        if titles.contains(&title) {
            return Err(Fault::duplicate("title", title));
        }
        titles.push(title.clone());
        Ok(Reply::created("Note created").with_data(json!({ "title": title })))
    })
}

fn get_note<'a>(_: &'a Notes, ctx: &'a mut MiddlewareContext) -> BoxFuture<'a, FaultResult<Reply>> {
    Box::pin(async move {
        let id = ctx.param("id").unwrap_or_default().to_string();
        Err(Fault::not_found(format!("note {id}")))
    })
}

struct Dispatch {
    router: Router<RouteChain>,
}

impl Endpoint for Dispatch {
    fn call<'a>(&'a self, ctx: &'a mut MiddlewareContext, request: Request) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            ctx.transition(RequestState::GloballyProcessed).unwrap();
            let method = ctx.method().clone();
            let path = ctx.path().to_string();
            match self.router.match_route(&method, &path) {
                Some(found) => {
                    ctx.set_params(found.params);
                    found.value.call(ctx, request).await
                }
                None => Envelope::failure(StatusCode::NOT_FOUND, "Not Found", json!({})).into_response(),
            }
        })
    }
}

struct App {
    pipeline: Pipeline,
    dispatch: Dispatch,
}

impl App {
    fn new() -> Self {
        let notes = Arc::new(Notes::default());
        let mut router = Router::new();
        router
            .insert(
                Method::POST,
                "/login",
                RouteChain::new(Arc::new(catch_fault(notes.clone(), login)))
                    .stage(ValidationMiddleware::new(vec![
                        FieldRule::body("username").not_empty("Username is required").trim()
                    ])),
            )
            .unwrap();
        router
            .insert(
                Method::POST,
                "/notes",
                RouteChain::new(Arc::new(catch_fault(notes.clone(), create_note)))
                    .stage(ValidationMiddleware::new(vec![
                        FieldRule::body("title").not_empty("Title is required").trim().escape()
                    ]))
                    .stage(AuthGate::new()),
            )
            .unwrap();
        router
            .insert(
                Method::GET,
                "/notes/:id",
                RouteChain::new(Arc::new(catch_fault(notes, get_note)))
                    .stage(IdGuard::new(["id"]))
                    .stage(AuthGate::new()),
            )
            .unwrap();

        let pipeline = Pipeline::builder()
            .stage(GlobalStage::RequestId, RequestIdMiddleware::new())
            .stage(GlobalStage::AccessLog, AccessLogMiddleware::new())
            .stage(
                GlobalStage::Cors,
                CorsMiddleware::builder()
                    .allow_origin("http://localhost:5173")
                    .allow_credentials(true)
                    .build(),
            )
            .stage(GlobalStage::BodyParser, BodyParserMiddleware::new())
            .stage(
                GlobalStage::Session,
                SessionMiddleware::new(Arc::new(MemorySessionStore::new()), SessionSettings::default()),
            )
            .build();

        Self {
            pipeline,
            dispatch: Dispatch { router },
        }
    }

    async fn send(&self, request: Request) -> (StatusCode, http::HeaderMap, Value, RequestState) {
        let mut ctx = MiddlewareContext::for_request(&request);
        let response = self.pipeline.process(&mut ctx, request, &self.dispatch).await;
        let state = ctx.state();
        ctx.mark_responded().unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, headers, body, state)
    }
}

fn json_request(method: Method, uri: &str, body: Value, cookie: Option<&str>) -> Request {
    let mut builder = http::Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Full::new(Bytes::from(body.to_string()))).unwrap()
}

fn session_cookie(headers: &http::HeaderMap) -> String {
    let raw = headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
    raw.split(';').next().unwrap().to_string()
}

#[tokio::test]
async fn test_protected_route_without_session_is_401() {
    let app = App::new();
    let (status, _, body, state) = app
        .send(json_request(Method::POST, "/notes", json!({"title": "Ownership"}), None))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"success": false, "status": 401, "message": "Unauthorized", "error": {}}));
    assert_eq!(state, RequestState::Failed);
}

#[tokio::test]
async fn test_validation_runs_before_the_gate() {
    let app = App::new();
    let (status, _, body, _) = app
        .send(json_request(Method::POST, "/notes", json!({"title": ""}), None))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Validation Error");
    assert_eq!(body["error"]["errors"][0]["title"], "Title is required");
}

#[tokio::test]
async fn test_login_then_create_then_duplicate() {
    let app = App::new();

    let (status, headers, body, state) = app
        .send(json_request(Method::POST, "/login", json!({"username": "  ana  "}), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "ana");
    assert_eq!(state, RequestState::Handled);
    assert!(headers.contains_key("x-request-id"));
    let cookie = session_cookie(&headers);

    let (status, _, body, state) = app
        .send(json_request(
            Method::POST,
            "/notes",
            json!({"title": "<b>Traits</b>"}),
            Some(&cookie),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["title"], "&lt;b&gt;Traits&lt;&#x2F;b&gt;");
    assert_eq!(state, RequestState::Handled);

    let (status, _, body, state) = app
        .send(json_request(
            Method::POST,
            "/notes",
            json!({"title": "<b>Traits</b>"}),
            Some(&cookie),
        ))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Duplicate Entry");
    assert_eq!(body["error"]["title"], "&lt;b&gt;Traits&lt;&#x2F;b&gt;");
    assert_eq!(state, RequestState::Failed);
}

#[tokio::test]
async fn test_malformed_id_short_circuits_before_the_gate() {
    let app = App::new();
    let (status, _, body, _) = app
        .send(json_request(Method::GET, "/notes/not-an-id", json!({}), None))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid Data");
    assert_eq!(body["error"], json!({"id": "Invalid ID format"}));
}

#[tokio::test]
async fn test_controller_fault_is_classified_once() {
    let app = App::new();
    let (_, headers, _, _) = app
        .send(json_request(Method::POST, "/login", json!({"username": "ana"}), None))
        .await;
    let cookie = session_cookie(&headers);

    let (status, _, body, _) = app
        .send(json_request(
            Method::GET,
            "/notes/65a1f0c2e4b0a1b2c3d4e5f6",
            json!({}),
            Some(&cookie),
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Not Found");
}

#[tokio::test]
async fn test_malformed_json_is_rejected_by_the_body_parser() {
    let app = App::new();
    let request = http::Request::builder()
        .method(Method::POST)
        .uri("/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from_static(b"{not json")))
        .unwrap();

    let (status, _, body, state) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Validation Error");
    assert_eq!(state, RequestState::Failed);
}

#[tokio::test]
async fn test_unknown_route_is_404_envelope() {
    let app = App::new();
    let (status, _, body, _) = app.send(json_request(Method::GET, "/nowhere", json!({}), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_preflight_never_reaches_a_route() {
    let app = App::new();
    let request = http::Request::builder()
        .method(Method::OPTIONS)
        .uri("/notes")
        .header(header::ORIGIN, "http://localhost:5173")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Full::new(Bytes::new()))
        .unwrap();

    let (status, headers, _, state) = app.send(request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "http://localhost:5173"
    );
    assert_eq!(state, RequestState::Received);
}

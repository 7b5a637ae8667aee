//! Input validation.
//!
//! A route declares an ordered list of [`FieldRule`]s. Each rule reads one
//! body field or path parameter and runs its steps in declaration order:
//! checks record a violation, sanitizers rewrite the value in place so the
//! controller sees the normalized text.
//!
//! Every rule is evaluated, so several bad fields are reported together. A
//! rule stops at its first failed check. If anything failed, the request is
//! answered with a 400 envelope and the controller never runs:
//!
//! ```json
//! {"success":false,"status":400,"message":"Validation Error",
//!  "error":{"errors":[{"password":"Password must be at least 6 characters long"}]}}
//! ```
//!
//! # Example
//!
//! ```
//! use pathway_middleware::validation::FieldRule;
//!
//! let signup = vec![
//!     FieldRule::body("email").is_email("Must be a valid email address").normalize_email(),
//!     FieldRule::body("username").not_empty("Username is required").trim().escape(),
//!     FieldRule::body("password").length(6, None, "Password must be at least 6 characters long"),
//!     FieldRule::body("name").optional().trim().escape(),
//! ];
//! assert_eq!(signup.len(), 4);
//! ```

use std::sync::OnceLock;

use http::StatusCode;
use pathway_core::{count_fault, Envelope, FaultKind, FieldFault, ResourceId};
use regex::Regex;
use serde_json::{json, Map, Value};

use crate::context::MiddlewareContext;
use crate::fault_wrapper::fault_response;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::state::RequestState;
use crate::types::{Request, Response};

/// Where a rule reads its value from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// A field of the parsed body.
    Body,
    /// A captured path parameter.
    Param,
}

#[derive(Debug, Clone)]
enum Step {
    NotEmpty(String),
    Length {
        min: usize,
        max: Option<usize>,
        message: String,
    },
    IsEmail(String),
    IsResourceId(String),
    Trim,
    Escape,
    NormalizeEmail,
}

/// One field's constraints.
#[derive(Debug, Clone)]
pub struct FieldRule {
    source: Source,
    field: String,
    optional: bool,
    steps: Vec<Step>,
}

impl FieldRule {
    /// A rule over a body field.
    #[must_use]
    pub fn body(field: impl Into<String>) -> Self {
        Self::new(Source::Body, field)
    }

    /// A rule over a path parameter.
    #[must_use]
    pub fn param(field: impl Into<String>) -> Self {
        Self::new(Source::Param, field)
    }

    fn new(source: Source, field: impl Into<String>) -> Self {
        Self {
            source,
            field: field.into(),
            optional: false,
            steps: Vec::new(),
        }
    }

    /// Returns the field name.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Skips the rule when the field is absent or null.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// The value must not be the empty string.
    #[must_use]
    pub fn not_empty(mut self, message: impl Into<String>) -> Self {
        self.steps.push(Step::NotEmpty(message.into()));
        self
    }

    /// The value's length in characters must be within `min..=max`.
    #[must_use]
    pub fn length(mut self, min: usize, max: Option<usize>, message: impl Into<String>) -> Self {
        self.steps.push(Step::Length {
            min,
            max,
            message: message.into(),
        });
        self
    }

    /// The value must look like an email address.
    #[must_use]
    pub fn is_email(mut self, message: impl Into<String>) -> Self {
        self.steps.push(Step::IsEmail(message.into()));
        self
    }

    /// The value must be a well-formed resource id.
    #[must_use]
    pub fn is_resource_id(mut self, message: impl Into<String>) -> Self {
        self.steps.push(Step::IsResourceId(message.into()));
        self
    }

    /// Strips surrounding whitespace.
    #[must_use]
    pub fn trim(mut self) -> Self {
        self.steps.push(Step::Trim);
        self
    }

    /// Replaces HTML-significant characters with entities.
    #[must_use]
    pub fn escape(mut self) -> Self {
        self.steps.push(Step::Escape);
        self
    }

    /// Canonicalizes an email address.
    #[must_use]
    pub fn normalize_email(mut self) -> Self {
        self.steps.push(Step::NormalizeEmail);
        self
    }

    fn read(&self, ctx: &MiddlewareContext) -> Option<String> {
        match self.source {
            Source::Body => match ctx.body().get(&self.field) {
                None | Some(Value::Null) => None,
                Some(Value::String(s)) => Some(s.clone()),
                Some(Value::Array(_) | Value::Object(_)) => Some(String::new()),
                Some(other) => Some(other.to_string()),
            },
            Source::Param => ctx.param(&self.field).map(str::to_string),
        }
    }

    /// Runs the rule. Returns the violation message, if any.
    fn evaluate(&self, ctx: &mut MiddlewareContext) -> Option<String> {
        let present = self.read(ctx);
        if present.is_none() && self.optional {
            return None;
        }
        let mut value = present.clone().unwrap_or_default();
        let mut rewritten = false;

        for step in &self.steps {
            let failure = match step {
                Step::NotEmpty(message) => value.is_empty().then_some(message),
                Step::Length { min, max, message } => {
                    let len = value.chars().count();
                    (len < *min || max.is_some_and(|max| len > max)).then_some(message)
                }
                Step::IsEmail(message) => (!is_email(&value)).then_some(message),
                Step::IsResourceId(message) => (!ResourceId::is_valid(&value)).then_some(message),
                Step::Trim => {
                    value = value.trim().to_string();
                    rewritten = true;
                    None
                }
                Step::Escape => {
                    value = escape(&value);
                    rewritten = true;
                    None
                }
                Step::NormalizeEmail => {
                    value = normalize_email(&value);
                    rewritten = true;
                    None
                }
            };
            if let Some(message) = failure {
                return Some(message.clone());
            }
        }

        if rewritten && present.is_some() && self.source == Source::Body {
            ctx.body_mut().insert(self.field.clone(), Value::String(value));
        }
        None
    }
}

/// Evaluates every rule against the context, in order.
///
/// Sanitizers write their result back into the body. The returned list is
/// empty when the request passes.
pub fn validate(rules: &[FieldRule], ctx: &mut MiddlewareContext) -> Vec<FieldFault> {
    rules
        .iter()
        .filter_map(|rule| {
            rule.evaluate(ctx)
                .map(|message| FieldFault::new(rule.field.clone(), message))
        })
        .collect()
}

/// Builds the 400 envelope for a set of violations.
#[must_use]
pub fn violations_envelope(violations: &[FieldFault]) -> Envelope {
    let errors: Vec<Value> = violations
        .iter()
        .map(|v| {
            let mut entry = Map::new();
            entry.insert(v.field.clone(), Value::String(v.message.clone()));
            Value::Object(entry)
        })
        .collect();
    Envelope::failure(StatusCode::BAD_REQUEST, "Validation Error", json!({ "errors": errors }))
}

/// Per-route validator stage.
#[derive(Debug, Clone)]
pub struct ValidationMiddleware {
    rules: Vec<FieldRule>,
}

impl ValidationMiddleware {
    /// Creates the stage over a rule set.
    #[must_use]
    pub fn new(rules: Vec<FieldRule>) -> Self {
        Self { rules }
    }

    /// Returns the rules in evaluation order.
    #[must_use]
    pub fn rules(&self) -> &[FieldRule] {
        &self.rules
    }
}

impl Middleware for ValidationMiddleware {
    fn name(&self) -> &'static str {
        "validation"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let violations = validate(&self.rules, ctx);
            if !violations.is_empty() {
                if let Err(e) = ctx.transition(RequestState::Failed) {
                    tracing::warn!(request_id = %ctx.request_id(), error = %e, "validation failed out of order");
                }
                count_fault(FaultKind::Validation);
                tracing::error!(
                    request_id = %ctx.request_id(),
                    path = ctx.path(),
                    fields = ?violations.iter().map(|v| v.field.as_str()).collect::<Vec<_>>(),
                    "request validation failed"
                );
                return violations_envelope(&violations).into_response();
            }

            if let Err(e) = ctx.transition(RequestState::Validated) {
                tracing::warn!(request_id = %ctx.request_id(), error = %e, "validation passed out of order");
            }
            next.run(ctx, request).await
        })
    }
}

/// Rejects malformed identifier path parameters before anything else runs
/// for the route.
#[derive(Debug, Clone)]
pub struct IdGuard {
    params: Vec<String>,
}

impl IdGuard {
    /// Guards the named path parameters.
    #[must_use]
    pub fn new<I, S>(params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            params: params.into_iter().map(Into::into).collect(),
        }
    }
}

impl Middleware for IdGuard {
    fn name(&self) -> &'static str {
        "id_guard"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            for name in &self.params {
                if let Some(value) = ctx.param(name) {
                    if let Err(fault) = ResourceId::parse_field(name, value) {
                        return fault_response(ctx, &fault);
                    }
                }
            }
            next.run(ctx, request).await
        })
    }
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(
            r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@([A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z]{2,}$",
        )
        .expect("valid regex")
    })
}

/// Returns true if `value` has the shape of an email address.
#[must_use]
pub fn is_email(value: &str) -> bool {
    value.len() <= 254 && email_regex().is_match(value)
}

/// Replaces `& < > " ' / \` and backtick with HTML entities.
#[must_use]
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '/' => out.push_str("&#x2F;"),
            '\\' => out.push_str("&#x5C;"),
            '`' => out.push_str("&#96;"),
            other => out.push(other),
        }
    }
    out
}

/// Lowercases an address. Gmail addresses also lose dots and `+tags` in the
/// local part, and `googlemail.com` becomes `gmail.com`.
#[must_use]
pub fn normalize_email(value: &str) -> String {
    let Some((local, domain)) = value.rsplit_once('@') else {
        return value.to_string();
    };
    let local = local.to_lowercase();
    let domain = domain.to_lowercase();

    if domain == "gmail.com" || domain == "googlemail.com" {
        let local = local.split('+').next().unwrap_or_default().replace('.', "");
        format!("{local}@gmail.com")
    } else {
        format!("{local}@{domain}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::Response as HttpResponse;
    use http_body_util::{BodyExt, Full};
    use metrics::{Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit};
    use pathway_router::Params;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::Arc;

    fn ctx_with_body(body: Value) -> MiddlewareContext {
        let mut ctx = MiddlewareContext::new();
        ctx.set_body(body.as_object().cloned().unwrap());
        ctx
    }

    fn signup_rules() -> Vec<FieldRule> {
        vec![
            FieldRule::body("email")
                .is_email("Must be a valid email address")
                .normalize_email(),
            FieldRule::body("username").not_empty("Username is required").trim().escape(),
            FieldRule::body("password").length(6, None, "Password must be at least 6 characters long"),
            FieldRule::body("name").optional().trim().escape(),
        ]
    }

    fn request() -> Request {
        http::Request::builder()
            .uri("/auth/signup")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    fn tracking_handler(
        called: Arc<AtomicBool>,
    ) -> impl FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, Response> {
        move |_ctx, _req| {
            called.store(true, Ordering::SeqCst);
            Box::pin(async {
                HttpResponse::builder()
                    .status(StatusCode::OK)
                    .body(Full::new(Bytes::new()))
                    .unwrap()
            })
        }
    }

    #[test]
    fn test_collects_all_violations_in_rule_order() {
        let mut ctx = ctx_with_body(json!({"email": "nope", "username": "", "password": "short"}));
        let violations = validate(&signup_rules(), &mut ctx);
        let fields: Vec<_> = violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["email", "username", "password"]);
        assert_eq!(violations[2].message, "Password must be at least 6 characters long");
    }

    #[test]
    fn test_sanitizers_rewrite_body() {
        let mut ctx = ctx_with_body(json!({
            "email": "Ana.Lopez+news@GoogleMail.com",
            "username": "  <ana>  ",
            "password": "secret1",
            "name": " Ana "
        }));
        assert!(validate(&signup_rules(), &mut ctx).is_empty());
        assert_eq!(ctx.body_str("email"), Some("analopez@gmail.com"));
        assert_eq!(ctx.body_str("username"), Some("&lt;ana&gt;"));
        assert_eq!(ctx.body_str("name"), Some("Ana"));
    }

    #[test]
    fn test_optional_absent_field_is_not_a_violation() {
        let mut ctx = ctx_with_body(json!({"email": "a@b.io", "username": "a", "password": "secret1"}));
        assert!(validate(&signup_rules(), &mut ctx).is_empty());
        assert!(ctx.body().get("name").is_none());
    }

    #[test]
    fn test_missing_required_field_fails() {
        let mut ctx = ctx_with_body(json!({}));
        let rules = [FieldRule::body("title").not_empty("Title is required")];
        let violations = validate(&rules, &mut ctx);
        assert_eq!(violations, vec![FieldFault::new("title", "Title is required")]);
    }

    #[test]
    fn test_length_bounds() {
        let rules = [FieldRule::body("code").length(2, Some(4), "bad length")];
        for (value, ok) in [("a", false), ("ab", true), ("abcd", true), ("abcde", false), ("ñañ", true)] {
            let mut ctx = ctx_with_body(json!({ "code": value }));
            assert_eq!(validate(&rules, &mut ctx).is_empty(), ok, "{value}");
        }
    }

    #[test]
    fn test_param_resource_id_rule() {
        let rules = [FieldRule::param("id").is_resource_id("Invalid ID format")];
        let mut ctx = MiddlewareContext::new();
        ctx.set_params(Params::from_iter([("id".to_string(), "xyz".to_string())]));
        assert_eq!(validate(&rules, &mut ctx).len(), 1);

        ctx.set_params(Params::from_iter([("id".to_string(), "65a1f0c2e4b0a1b2c3d4e5f6".to_string())]));
        assert!(validate(&rules, &mut ctx).is_empty());
    }

    #[test]
    fn test_is_email() {
        assert!(is_email("ana@example.com"));
        assert!(is_email("a.b+c@sub.example.io"));
        assert!(!is_email("ana"));
        assert!(!is_email("ana@"));
        assert!(!is_email("ana@example"));
        assert!(!is_email(""));
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"<a href="/x">'&'</a>"#), "&lt;a href=&quot;&#x2F;x&quot;&gt;&#x27;&amp;&#x27;&lt;&#x2F;a&gt;");
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("Ana@Example.COM"), "ana@example.com");
        assert_eq!(normalize_email("a.n.a+x@gmail.com"), "ana@gmail.com");
        assert_eq!(normalize_email("not-an-email"), "not-an-email");
    }

    #[tokio::test]
    async fn test_middleware_short_circuits_on_violation() {
        let called = Arc::new(AtomicBool::new(false));
        let stage = ValidationMiddleware::new(signup_rules());
        let mut ctx = ctx_with_body(json!({"username": "a", "password": "short", "email": "a@b.io"}));

        let response = stage
            .process(&mut ctx, request(), Next::handler(tracking_handler(called.clone())))
            .await;

        assert!(!called.load(Ordering::SeqCst));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ctx.state(), RequestState::Failed);
        let body: Value =
            serde_json::from_slice(&response.into_body().collect().await.unwrap().to_bytes()).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Validation Error");
        assert_eq!(
            body["error"],
            json!({"errors": [{"password": "Password must be at least 6 characters long"}]})
        );
    }

    #[derive(Default)]
    struct FaultCounts(parking_lot::Mutex<Vec<(String, Arc<AtomicU64>)>>);

    impl FaultCounts {
        fn total(&self, name: &str) -> u64 {
            self.0
                .lock()
                .iter()
                .filter(|(key, _)| key == name)
                .map(|(_, count)| count.load(Ordering::SeqCst))
                .sum()
        }
    }

    impl Recorder for FaultCounts {
        fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

        fn register_counter(&self, key: &Key, _: &Metadata<'_>) -> Counter {
            let labels: Vec<String> = key.labels().map(|l| format!("{}={}", l.key(), l.value())).collect();
            let count = Arc::new(AtomicU64::new(0));
            self.0
                .lock()
                .push((format!("{}{{{}}}", key.name(), labels.join(",")), Arc::clone(&count)));
            Counter::from_arc(count)
        }

        fn register_gauge(&self, _: &Key, _: &Metadata<'_>) -> Gauge {
            Gauge::noop()
        }

        fn register_histogram(&self, _: &Key, _: &Metadata<'_>) -> Histogram {
            Histogram::noop()
        }
    }

    #[test]
    fn test_rejections_count_as_validation_faults() {
        let counts = FaultCounts::default();
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();

        metrics::with_local_recorder(&counts, || {
            runtime.block_on(async {
                let stage = ValidationMiddleware::new(signup_rules());
                let mut ctx = ctx_with_body(json!({"username": "", "password": "short", "email": "a@b.io"}));
                let called = Arc::new(AtomicBool::new(false));
                let response = stage
                    .process(&mut ctx, request(), Next::handler(tracking_handler(called.clone())))
                    .await;
                assert_eq!(response.status(), StatusCode::BAD_REQUEST);

                let mut ctx = ctx_with_body(json!({"username": "ana", "password": "secret1", "email": "a@b.io"}));
                let response = stage
                    .process(&mut ctx, request(), Next::handler(tracking_handler(called.clone())))
                    .await;
                assert_eq!(response.status(), StatusCode::OK);
            });
        });

        assert_eq!(counts.total("pathway_faults_total{kind=validation}"), 1);
    }

    #[tokio::test]
    async fn test_middleware_passes_clean_request() {
        let called = Arc::new(AtomicBool::new(false));
        let stage = ValidationMiddleware::new(signup_rules());
        let mut ctx = ctx_with_body(json!({"username": "ana", "password": "secret1", "email": "a@b.io"}));

        let response = stage
            .process(&mut ctx, request(), Next::handler(tracking_handler(called.clone())))
            .await;

        assert!(called.load(Ordering::SeqCst));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(ctx.state(), RequestState::Validated);
    }

    #[tokio::test]
    async fn test_id_guard_rejects_malformed_id() {
        let called = Arc::new(AtomicBool::new(false));
        let mut ctx = MiddlewareContext::new();
        ctx.set_params(Params::from_iter([("id".to_string(), "not-an-id".to_string())]));

        let response = IdGuard::new(["id"])
            .process(&mut ctx, request(), Next::handler(tracking_handler(called.clone())))
            .await;

        assert!(!called.load(Ordering::SeqCst));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value =
            serde_json::from_slice(&response.into_body().collect().await.unwrap().to_bytes()).unwrap();
        assert_eq!(body["message"], "Invalid Data");
        assert_eq!(body["error"], json!({"id": "Invalid ID format"}));
    }
}

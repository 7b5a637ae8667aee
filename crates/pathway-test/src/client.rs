//! In-memory client over an assembled [`Application`].

use std::sync::Arc;

use http::header::COOKIE;
use http::{HeaderValue, Method};
use pathway_server::Application;
use serde::Serialize;

use crate::error::TestError;
use crate::jar::CookieJar;
use crate::request::{TestRequest, TestRequestBuilder};
use crate::response::TestResponse;

/// Drives requests through the full pipeline without a socket.
///
/// Cookies set by the application are remembered and sent back, so a login
/// followed by an authenticated request works like it does in a browser.
///
/// # Example
///
/// ```ignore
/// use pathway_test::TestClient;
/// use serde_json::json;
///
/// let client = TestClient::new(app);
/// client
///     .post("/auth/login")
///     .json(&json!({ "username": "ada", "password": "secret1" }))
///     .send()
///     .await;
///
/// let me = client.get("/auth/current-user").send().await;
/// assert_eq!(me.data()["username"], "ada");
/// ```
pub struct TestClient {
    app: Arc<Application>,
    jar: CookieJar,
    default_headers: Vec<(String, String)>,
}

impl TestClient {
    /// Wraps an application.
    #[must_use]
    pub fn new(app: Application) -> Self {
        Self::from_arc(Arc::new(app))
    }

    /// Wraps a shared application; clients made this way have separate jars.
    #[must_use]
    pub fn from_arc(app: Arc<Application>) -> Self {
        Self {
            app,
            jar: CookieJar::new(),
            default_headers: Vec::new(),
        }
    }

    /// Adds a header sent with every request.
    #[must_use]
    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Returns the application.
    #[must_use]
    pub fn app(&self) -> &Arc<Application> {
        &self.app
    }

    /// Returns a remembered cookie.
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.jar.get(name)
    }

    /// Forgets every cookie, as if the browser were closed.
    pub fn clear_cookies(&self) {
        self.jar.clear();
    }

    /// Starts a `GET` request.
    pub fn get(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::GET, uri)
    }

    /// Starts a `POST` request.
    pub fn post(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::POST, uri)
    }

    /// Starts a `PUT` request.
    pub fn put(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::PUT, uri)
    }

    /// Starts a `DELETE` request.
    pub fn delete(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::DELETE, uri)
    }

    /// Starts a request with any method.
    pub fn request(&self, method: Method, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        let builder = self
            .default_headers
            .iter()
            .fold(TestRequestBuilder::new(method, uri), |builder, (name, value)| {
                builder.header(name, value)
            });
        TestClientRequest { client: self, builder }
    }

    async fn dispatch(&self, request: TestRequest) -> Result<TestResponse, TestError> {
        let mut request = request.into_http_request()?;
        if !request.headers().contains_key(COOKIE) {
            if let Some(cookies) = self.jar.header_value() {
                let value = HeaderValue::from_str(&cookies).map_err(|e| TestError::InvalidHeader(e.to_string()))?;
                request.headers_mut().insert(COOKIE, value);
            }
        }

        let (response, ctx) = self.app.handle_with_context(request).await;
        self.jar.store(response.headers());
        Ok(TestResponse::from_http(response).await?.with_state(ctx.state()))
    }
}

impl std::fmt::Debug for TestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestClient")
            .field("jar", &self.jar)
            .finish_non_exhaustive()
    }
}

/// A request bound to a [`TestClient`].
#[must_use]
pub struct TestClientRequest<'a> {
    client: &'a TestClient,
    builder: TestRequestBuilder,
}

impl TestClientRequest<'_> {
    /// Sets a header.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.builder = self.builder.header(name, value);
        self
    }

    /// Sets the `Origin` header.
    pub fn origin(mut self, origin: impl AsRef<str>) -> Self {
        self.builder = self.builder.origin(origin);
        self
    }

    /// Sets a raw body with a content type.
    pub fn body(mut self, content_type: impl AsRef<str>, body: impl Into<bytes::Bytes>) -> Self {
        self.builder = self.builder.content_type(content_type).body(body);
        self
    }

    /// Sets a JSON body.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        self.builder = self.builder.json(value);
        self
    }

    /// Sets a form body.
    pub fn form<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        self.builder = self.builder.form(value);
        self
    }

    /// Sends the request.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the body cannot be read;
    /// use [`try_send`](Self::try_send) to handle those.
    pub async fn send(self) -> TestResponse {
        match self.try_send().await {
            Ok(response) => response,
            Err(e) => panic!("test request failed: {e}"),
        }
    }

    /// Sends the request, returning build and read errors.
    pub async fn try_send(self) -> Result<TestResponse, TestError> {
        let request = self.builder.build()?;
        self.client.dispatch(request).await
    }
}

//! # Pathway Test
//!
//! In-memory testing for the Pathway backend: requests run through the
//! assembled [`Application`](pathway_server::Application), the whole global
//! pipeline and route chains included, without binding a port.
//!
//! - [`TestClient`]: request builder plus a cookie jar, so sessions carry
//!   over between requests
//! - [`TestResponse`]: buffered response with envelope helpers and the
//!   request's final [`RequestState`](pathway_middleware::RequestState)
//!
//! ## Example
//!
//! ```ignore
//! use http::StatusCode;
//! use pathway_test::TestClient;
//! use serde_json::json;
//!
//! let client = TestClient::new(app);
//! client
//!     .post("/auth/signup")
//!     .json(&json!({ "username": "ada", "email": "ada@example.com", "password": "secret1" }))
//!     .send()
//!     .await
//!     .assert_envelope(StatusCode::CREATED, "User created");
//! ```

#![doc(html_root_url = "https://docs.rs/pathway-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod jar;
mod request;
mod response;

pub use client::{TestClient, TestClientRequest};
pub use error::TestError;
pub use jar::CookieJar;
pub use request::{TestRequest, TestRequestBuilder};
pub use response::TestResponse;

//! Frontend shell.
//!
//! Requests that match no API route are answered from the built frontend:
//! an existing file under the root is served as is, any other path gets the
//! root `index.html` so the client-side router can take over.

use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use http::{header, HeaderValue, Method, StatusCode};
use pathway_middleware::{Body, Response};
use thiserror::Error;

/// Errors that can occur when serving the shell.
#[derive(Debug, Error)]
pub enum StaticFileError {
    /// Neither the file nor the shell exists.
    #[error("File not found: {0}")]
    NotFound(String),

    /// The path escapes the root or names a hidden file.
    #[error("Forbidden path: {0}")]
    Forbidden(String),

    /// Only `GET` and `HEAD` are served.
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// I/O error while reading a file.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Serves the built frontend with an `index.html` fallback.
///
/// # Example
///
/// ```rust
/// use pathway_server::StaticFiles;
///
/// let shell = StaticFiles::new("public/build").index("index.html");
/// assert_eq!(shell.root().to_str(), Some("public/build"));
/// ```
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
    index: String,
}

impl StaticFiles {
    /// Serves files under `root`.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            index: "index.html".to_string(),
        }
    }

    /// Sets the shell file name.
    #[must_use]
    pub fn index<S: Into<String>>(mut self, index: S) -> Self {
        self.index = index.into();
        self
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Answers `request_path` with a file or the shell.
    pub async fn serve(&self, request_path: &str, method: &Method) -> Result<Response, StaticFileError> {
        if method != Method::GET && method != Method::HEAD {
            return Err(StaticFileError::MethodNotAllowed);
        }

        let relative = sanitize(request_path)?;
        let candidate = self.root.join(&relative);
        let file = match tokio::fs::metadata(&candidate).await {
            Ok(meta) if meta.is_file() => candidate,
            _ => {
                let shell = self.root.join(&self.index);
                match tokio::fs::metadata(&shell).await {
                    Ok(meta) if meta.is_file() => shell,
                    _ => return Err(StaticFileError::NotFound(request_path.to_string())),
                }
            }
        };

        let bytes = tokio::fs::read(&file).await?;
        let length = bytes.len();
        let body = if method == Method::HEAD {
            Bytes::new()
        } else {
            Bytes::from(bytes)
        };

        let mut response = Response::new(Body::new(body));
        *response.status_mut() = StatusCode::OK;
        let headers = response.headers_mut();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(mime_type(&file)));
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
        Ok(response)
    }
}

/// Rejects traversal and hidden segments; returns the path relative to the
/// root.
fn sanitize(request_path: &str) -> Result<PathBuf, StaticFileError> {
    let path = request_path.trim_start_matches('/');
    let mut clean = PathBuf::new();
    for component in Path::new(path).components() {
        match component {
            Component::Normal(name) => {
                if name.to_str().is_some_and(|n| n.starts_with('.')) {
                    return Err(StaticFileError::Forbidden("Hidden files not allowed".to_string()));
                }
                clean.push(name);
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(StaticFileError::Forbidden(
                    "Directory traversal not allowed".to_string(),
                ));
            }
        }
    }
    Ok(clean)
}

fn mime_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" | "map" => "application/json",
        "txt" => "text/plain; charset=utf-8",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "wasm" => "application/wasm",
        "webmanifest" => "application/manifest+json",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use std::fs;
    use tempfile::TempDir;

    fn build_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.html"), "<html>shell</html>").unwrap();
        fs::create_dir(dir.path().join("static")).unwrap();
        fs::write(dir.path().join("static").join("app.js"), "console.log('hi')").unwrap();
        fs::write(dir.path().join(".env"), "SECRET=1").unwrap();
        dir
    }

    async fn body_text(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_serves_existing_file() {
        let dir = build_dir();
        let shell = StaticFiles::new(dir.path());

        let response = shell.serve("/static/app.js", &Method::GET).await.unwrap();
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/javascript; charset=utf-8"
        );
        assert_eq!(body_text(response).await, "console.log('hi')");
    }

    #[tokio::test]
    async fn test_unknown_path_gets_shell() {
        let dir = build_dir();
        let shell = StaticFiles::new(dir.path());

        let response = shell.serve("/paths/65a1f0c2e4b0a1b2c3d4e5f6", &Method::GET).await.unwrap();
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/html; charset=utf-8");
        assert_eq!(body_text(response).await, "<html>shell</html>");
    }

    #[tokio::test]
    async fn test_head_has_no_body() {
        let dir = build_dir();
        let response = StaticFiles::new(dir.path()).serve("/", &Method::HEAD).await.unwrap();
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "18");
        assert!(body_text(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_no_shell_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = StaticFiles::new(dir.path()).serve("/anything", &Method::GET).await.unwrap_err();
        assert!(matches!(err, StaticFileError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_traversal_and_hidden_files_forbidden() {
        let dir = build_dir();
        let shell = StaticFiles::new(dir.path());

        for path in ["/../etc/passwd", "/.env", "/static/../../secret"] {
            let err = shell.serve(path, &Method::GET).await.unwrap_err();
            assert!(matches!(err, StaticFileError::Forbidden(_)), "{path}");
        }
    }

    #[tokio::test]
    async fn test_post_not_served() {
        let dir = build_dir();
        let err = StaticFiles::new(dir.path()).serve("/", &Method::POST).await.unwrap_err();
        assert!(matches!(err, StaticFileError::MethodNotAllowed));
    }
}

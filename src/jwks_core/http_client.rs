use std::error::Error;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use dashmap::DashMap;

/// HTTP GET request for a key set.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Target URL.
    pub url: String,
    /// Request headers.
    pub headers: Vec<(String, String)>,
    /// Optional timeout duration.
    pub timeout: Option<Duration>,
    /// Largest body the client may buffer (None = unlimited).
    pub max_body_size: Option<usize>,
}

impl HttpRequest {
    /// A GET for `url` asking for JSON.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: vec![("accept".to_string(), "application/json".to_string())],
            timeout: None,
            max_body_size: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = Some(size);
        self
    }

    /// Fails once `len` bytes of body exceed the request's limit.
    pub fn check_body_size(&self, len: usize) -> Result<(), BodyLimitExceeded> {
        match self.max_body_size {
            Some(max) if len > max => Err(BodyLimitExceeded { len, max }),
            _ => Ok(()),
        }
    }
}

/// HTTP response from executing a call.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: Vec<(String, String)>,
    /// Response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// A 200 response carrying `body`.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self { status: 200, headers: Vec::new(), body: body.into() }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Error type for HTTP client operations.
pub type HttpClientError = Box<dyn Error + Send + Sync>;

/// Returned by a client that stopped reading because the body outgrew
/// `HttpRequest::max_body_size`. `len` is what was known when it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyLimitExceeded {
    pub len: usize,
    pub max: usize,
}

impl fmt::Display for BodyLimitExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "response body of at least {} bytes exceeds limit of {}", self.len, self.max)
    }
}

impl Error for BodyLimitExceeded {}

/// Transport used to download key sets.
pub trait JwksHttpClient: Send + Sync + Clone + 'static {
    /// Execute an HTTP request asynchronously.
    fn execute(
        &self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpClientError>> + Send + 'static>>;
}

#[derive(Debug, Clone)]
enum Canned {
    Response(HttpResponse),
    Failure(String),
}

/// In-memory HTTP client stub for testing.
///
/// Clones share their responses, so a test can keep one handle and swap what
/// the endpoint serves while a rotator holds another.
#[derive(Clone)]
pub struct InMemoryHttpClient {
    responses: Arc<DashMap<String, Canned>>,
    default_response: Option<HttpResponse>,
    delay: Arc<Mutex<Duration>>,
    requests: Arc<AtomicUsize>,
}

impl InMemoryHttpClient {
    /// Creates a new in-memory HTTP client with no default response.
    pub fn new() -> Self {
        Self {
            responses: Arc::new(DashMap::new()),
            default_response: None,
            delay: Arc::new(Mutex::new(Duration::ZERO)),
            requests: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Creates a new in-memory HTTP client with a default response on miss.
    pub fn with_default(response: HttpResponse) -> Self {
        Self { default_response: Some(response), ..Self::new() }
    }

    /// Register a mock response for a specific URL.
    pub fn insert_response(&self, url: impl Into<String>, response: HttpResponse) {
        self.responses.insert(url.into(), Canned::Response(response));
    }

    /// Make requests to `url` fail at the transport level.
    pub fn insert_failure(&self, url: impl Into<String>, message: impl Into<String>) {
        self.responses.insert(url.into(), Canned::Failure(message.into()));
    }

    pub fn remove(&self, url: &str) {
        self.responses.remove(url);
    }

    /// Delay every response by `delay`. Zero disables the delay.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap_or_else(PoisonError::into_inner) = delay;
    }

    /// Number of requests executed so far, across all clones.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl JwksHttpClient for InMemoryHttpClient {
    fn execute(
        &self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpClientError>> + Send + 'static>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let canned = self.responses.get(&request.url).map(|entry| entry.value().clone());
        let default = self.default_response.clone();
        let delay = *self.delay.lock().unwrap_or_else(PoisonError::into_inner);
        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let result: Result<HttpResponse, HttpClientError> = match canned {
                Some(Canned::Response(resp)) => match request.check_body_size(resp.body.len()) {
                    Ok(()) => Ok(resp),
                    Err(limit) => Err(Box::new(limit)),
                },
                Some(Canned::Failure(message)) => Err(message.into()),
                None => default.ok_or_else(|| "no mock response for url".into()),
            };
            result
        })
    }
}

/// HTTP client backed by `reqwest`.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestHttpClient {
    inner: reqwest::Client,
}

#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self { inner: reqwest::Client::new() }
    }

    /// Wraps a preconfigured client (proxies, TLS roots, pooling).
    pub fn with_client(inner: reqwest::Client) -> Self {
        Self { inner }
    }
}

#[cfg(feature = "reqwest")]
impl JwksHttpClient for ReqwestHttpClient {
    fn execute(
        &self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpClientError>> + Send + 'static>> {
        let client = self.inner.clone();
        Box::pin(async move {
            let mut builder = client.get(&request.url);
            for (k, v) in &request.headers {
                builder = builder.header(k.as_str(), v.as_str());
            }
            if let Some(timeout) = request.timeout {
                builder = builder.timeout(timeout);
            }
            let mut resp = builder.send().await.map_err(|e| Box::new(e) as HttpClientError)?;
            let status = resp.status().as_u16();
            let headers = resp
                .headers()
                .iter()
                .filter_map(|(k, v)| {
                    v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string()))
                })
                .collect();
            // Refuse up front when the server announces an oversized body.
            if let Some(announced) = resp.content_length() {
                let announced = usize::try_from(announced).unwrap_or(usize::MAX);
                request.check_body_size(announced).map_err(|e| Box::new(e) as HttpClientError)?;
            }
            let mut body = Vec::new();
            // Streams so an unannounced oversized body is cut off at the limit.
            loop {
                let chunk = resp.chunk().await.map_err(|e| Box::new(e) as HttpClientError)?;
                let Some(chunk) = chunk else { break };
                request
                    .check_body_size(body.len() + chunk.len())
                    .map_err(|e| Box::new(e) as HttpClientError)?;
                body.extend_from_slice(&chunk);
            }
            Ok::<_, HttpClientError>(HttpResponse { status, headers, body })
        })
    }
}

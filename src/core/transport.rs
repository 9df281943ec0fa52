//! HTTP Transport
//!
//! HTTP client interface, the reqwest implementation and a per-credential
//! transport factory.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::core::tls::{pem_certificates, TlsSettings};
use crate::error::{NetworkError, ProtocolError, TppError, TppResult};
use crate::types::AuthenticatorConfig;

/// HTTP request definition.
#[derive(Clone, Debug)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Request URL.
    pub url: String,
    /// Request headers.
    pub headers: HashMap<String, String>,
    /// Request body.
    pub body: Option<String>,
    /// Request timeout.
    pub timeout: Option<Duration>,
}

/// HTTP method.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// HTTP response definition.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Response body.
    pub body: String,
}

impl HttpResponse {
    /// Check for a 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP transport interface (for dependency injection).
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send an HTTP request.
    async fn send(&self, request: HttpRequest) -> TppResult<HttpResponse>;
}

/// Builds the transport used for one exchange from its TLS settings.
pub trait TransportFactory: Send + Sync {
    /// Get a transport configured with exactly `tls`.
    fn transport(&self, tls: &TlsSettings) -> TppResult<Arc<dyn HttpTransport>>;
}

/// Default reqwest-based HTTP transport.
pub struct ReqwestHttpTransport {
    client: reqwest::Client,
    default_timeout: Duration,
    max_response_size: usize,
}

impl ReqwestHttpTransport {
    /// Create transport with default settings and no custom TLS material.
    pub fn new() -> TppResult<Self> {
        Self::with_tls(&AuthenticatorConfig::default(), &TlsSettings::default())
    }

    /// Create transport with the given options and TLS material.
    pub fn with_tls(config: &AuthenticatorConfig, tls: &TlsSettings) -> TppResult<Self> {
        let tls_error = |e: reqwest::Error| {
            TppError::Network(NetworkError::TlsError {
                message: e.to_string(),
            })
        };

        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::none()); // TPP never redirects auth calls

        if let Some(bundle) = &tls.trust_bundle {
            builder = builder.tls_built_in_root_certs(false);
            for der in pem_certificates(bundle)? {
                let certificate = reqwest::Certificate::from_der(&der).map_err(tls_error)?;
                builder = builder.add_root_certificate(certificate);
            }
        }

        if let Some(identity) = &tls.identity {
            let client_identity = reqwest::Identity::from_pem(identity.pem()).map_err(tls_error)?;
            builder = builder
                .identity(client_identity)
                .http1_only()
                .pool_max_idle_per_host(0);
            for der in identity.ca_certificates() {
                let certificate = reqwest::Certificate::from_der(der).map_err(tls_error)?;
                builder = builder.add_root_certificate(certificate);
            }
        }

        let client = builder.build().map_err(tls_error)?;

        Ok(Self {
            client,
            default_timeout: config.timeout,
            max_response_size: config.max_response_size,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestHttpTransport {
    async fn send(&self, request: HttpRequest) -> TppResult<HttpResponse> {
        let timeout = request.timeout.unwrap_or(self.default_timeout);

        let mut req_builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };

        for (key, value) in &request.headers {
            req_builder = req_builder.header(key, value);
        }

        if let Some(body) = request.body {
            req_builder = req_builder.body(body);
        }

        req_builder = req_builder.timeout(timeout);

        let response = req_builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TppError::Network(NetworkError::Timeout { timeout })
            } else {
                TppError::Network(NetworkError::ConnectionFailed {
                    message: e.to_string(),
                })
            }
        })?;

        let status = response.status().as_u16();

        if (300..400).contains(&status) {
            let location = response
                .headers()
                .get("location")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();
            return Err(TppError::Protocol(ProtocolError::UnexpectedRedirect {
                location,
            }));
        }

        let mut headers = HashMap::new();
        for (key, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                headers.insert(key.to_string().to_lowercase(), v.to_string());
            }
        }

        if let Some(len) = response.content_length() {
            if len as usize > self.max_response_size {
                return Err(TppError::Protocol(ProtocolError::ResponseTooLarge {
                    size: len as usize,
                }));
            }
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                TppError::Network(NetworkError::Timeout { timeout })
            } else {
                TppError::Protocol(ProtocolError::InvalidResponse {
                    message: e.to_string(),
                })
            }
        })?;

        if body.len() > self.max_response_size {
            return Err(TppError::Protocol(ProtocolError::ResponseTooLarge {
                size: body.len(),
            }));
        }

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Upper bound on pooled identity-free clients.
pub const MAX_POOLED_CLIENTS: usize = 16;

#[derive(Default)]
struct ClientPool {
    clients: HashMap<String, Arc<ReqwestHttpTransport>>,
    insertion_order: VecDeque<String>,
}

/// Transport factory pooling reqwest clients by trust material.
///
/// Clients carrying a client identity are built for one exchange and never
/// pooled. Identity-free clients are pooled per trust bundle fingerprint, at
/// most `MAX_POOLED_CLIENTS` of them, evicting the oldest first.
pub struct ReqwestTransportFactory {
    config: AuthenticatorConfig,
    pool: Mutex<ClientPool>,
}

impl ReqwestTransportFactory {
    /// Create new factory.
    pub fn new(config: AuthenticatorConfig) -> Self {
        Self {
            config,
            pool: Mutex::new(ClientPool::default()),
        }
    }

    /// Number of pooled clients.
    pub fn pooled_clients(&self) -> usize {
        self.pool
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clients
            .len()
    }

    /// Drop every pooled client.
    pub fn clear(&self) {
        let mut pool = self
            .pool
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        pool.clients.clear();
        pool.insertion_order.clear();
    }
}

impl TransportFactory for ReqwestTransportFactory {
    fn transport(&self, tls: &TlsSettings) -> TppResult<Arc<dyn HttpTransport>> {
        if tls.has_identity() {
            let one_shot: Arc<dyn HttpTransport> =
                Arc::new(ReqwestHttpTransport::with_tls(&self.config, tls)?);
            return Ok(one_shot);
        }

        let key = tls.fingerprint();
        let mut pool = self
            .pool
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(existing) = pool.clients.get(&key) {
            let transport: Arc<dyn HttpTransport> = existing.clone();
            return Ok(transport);
        }

        let created = Arc::new(ReqwestHttpTransport::with_tls(&self.config, tls)?);
        while pool.clients.len() >= MAX_POOLED_CLIENTS {
            match pool.insertion_order.pop_front() {
                Some(oldest) => {
                    pool.clients.remove(&oldest);
                }
                None => break,
            }
        }
        pool.clients.insert(key.clone(), created.clone());
        pool.insertion_order.push_back(key);

        let transport: Arc<dyn HttpTransport> = created;
        Ok(transport)
    }
}

/// Mock HTTP transport for testing.
#[derive(Default)]
pub struct MockHttpTransport {
    responses: Mutex<VecDeque<TppResult<HttpResponse>>>,
    request_history: Mutex<Vec<HttpRequest>>,
    default_response: Mutex<Option<HttpResponse>>,
}

impl MockHttpTransport {
    /// Create new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response to return, in order.
    pub fn queue_response(&self, response: HttpResponse) -> &Self {
        self.responses.lock().unwrap().push_back(Ok(response));
        self
    }

    /// Queue a JSON response.
    pub fn queue_json_response<T: serde::Serialize>(&self, status: u16, body: &T) -> &Self {
        let response = HttpResponse {
            status,
            headers: [("content-type".to_string(), "application/json".to_string())]
                .into_iter()
                .collect(),
            body: serde_json::to_string(body).unwrap(),
        };
        self.queue_response(response)
    }

    /// Queue a transport error.
    pub fn queue_error(&self, error: TppError) -> &Self {
        self.responses.lock().unwrap().push_back(Err(error));
        self
    }

    /// Set default response when queue is empty.
    pub fn set_default_response(&self, response: HttpResponse) -> &Self {
        *self.default_response.lock().unwrap() = Some(response);
        self
    }

    /// Get request history.
    pub fn get_requests(&self) -> Vec<HttpRequest> {
        self.request_history.lock().unwrap().clone()
    }

    /// Get last request.
    pub fn get_last_request(&self) -> Option<HttpRequest> {
        self.request_history.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl HttpTransport for MockHttpTransport {
    async fn send(&self, request: HttpRequest) -> TppResult<HttpResponse> {
        self.request_history.lock().unwrap().push(request);

        if let Some(queued) = self.responses.lock().unwrap().pop_front() {
            return queued;
        }

        self.default_response
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| {
                TppError::Network(NetworkError::ConnectionFailed {
                    message: "No mock response available".to_string(),
                })
            })
    }
}

/// Mock transport factory handing out one shared mock transport.
pub struct MockTransportFactory {
    transport: Arc<MockHttpTransport>,
    tls_history: Mutex<Vec<TlsSettings>>,
}

impl MockTransportFactory {
    /// Create factory around a mock transport.
    pub fn new(transport: Arc<MockHttpTransport>) -> Self {
        Self {
            transport,
            tls_history: Mutex::new(Vec::new()),
        }
    }

    /// TLS settings requested so far, one entry per exchange.
    pub fn get_tls_history(&self) -> Vec<TlsSettings> {
        self.tls_history.lock().unwrap().clone()
    }
}

impl TransportFactory for MockTransportFactory {
    fn transport(&self, tls: &TlsSettings) -> TppResult<Arc<dyn HttpTransport>> {
        self.tls_history.lock().unwrap().push(tls.clone());
        let transport: Arc<dyn HttpTransport> = self.transport.clone();
        Ok(transport)
    }
}

/// Create production transport factory.
pub fn create_transport_factory(config: AuthenticatorConfig) -> ReqwestTransportFactory {
    ReqwestTransportFactory::new(config)
}

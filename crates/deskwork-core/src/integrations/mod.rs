//! Outbound HTTP services: reverse geocoding and license lookup.
//!
//! Each call is a single blocking request with a short timeout. There are no
//! retries; failures come back as an [`IntegrationError`] whose `Display`
//! text is fit to show to an agent.

pub mod geocode;
pub mod license;

use crate::error::{ErrorCode, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntegrationError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("Request timeout. Please try again.")]
    Timeout,

    #[error("Could not connect to {service}. Please check your internet connection.")]
    Unavailable { service: &'static str, detail: String },

    #[error("API returned status code: {0}")]
    Status(u16),

    #[error("API Error: {0}")]
    Remote(String),

    #[error("No data found for customer code: {0}")]
    NoData(String),

    #[error("Invalid response from {service}: {detail}")]
    Decode { service: &'static str, detail: String },

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

impl IntegrationError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotConfigured(_) | Self::Unavailable { .. } => ErrorCode::RemoteUnavailable,
            Self::Timeout => ErrorCode::RemoteTimeout,
            Self::Status(_) | Self::Remote(_) | Self::NoData(_) | Self::Decode { .. } => {
                ErrorCode::RemoteRejected
            }
            Self::Invalid(_) => ErrorCode::InvalidInput,
        }
    }
}

fn is_timeout(transport: &ureq::Transport) -> bool {
    let io_timeout = std::error::Error::source(transport)
        .and_then(|source| source.downcast_ref::<std::io::Error>())
        .is_some_and(|io| {
            matches!(
                io.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
            )
        });
    io_timeout || transport.to_string().contains("timed out")
}

pub(crate) fn map_request_error(service: &'static str, err: ureq::Error) -> IntegrationError {
    match err {
        ureq::Error::Status(code, _) => IntegrationError::Status(code),
        ureq::Error::Transport(transport) if is_timeout(&transport) => IntegrationError::Timeout,
        ureq::Error::Transport(transport) => IntegrationError::Unavailable {
            service,
            detail: transport.to_string(),
        },
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! One-shot HTTP server for exercising the clients.

    use std::io::Read;
    use std::net::TcpListener;
    use std::thread::JoinHandle;
    use tiny_http::{Header, Response, Server};

    /// Serve one request with `status` and `body`, returning the base URL
    /// and a handle yielding the request body.
    pub fn serve_once(status: u16, body: &'static str) -> (String, JoinHandle<String>) {
        let server = Server::http("127.0.0.1:0").expect("bind");
        let port = server
            .server_addr()
            .to_ip()
            .map(|addr| addr.port())
            .expect("ip listener");
        let handle = std::thread::spawn(move || {
            let mut request = server.recv().expect("recv");
            let mut request_body = String::new();
            request
                .as_reader()
                .read_to_string(&mut request_body)
                .expect("read body");

            let content_type = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                .expect("header");
            let response = Response::from_string(body)
                .with_status_code(status)
                .with_header(content_type);
            request.respond(response).expect("respond");
            request_body
        });
        (format!("http://127.0.0.1:{port}"), handle)
    }

    /// A URL nothing is listening on.
    pub fn closed_port_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);
        format!("http://{addr}")
    }
}

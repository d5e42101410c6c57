//! Per-connection backend channel.

use axum::body::{Body, Bytes};
use axum::http::{header, Method, Request, StatusCode, Uri};
use futures_util::StreamExt;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::time::Duration;
use tokio::time::timeout;

use crate::backend::{describe, BackendError, BackendTarget};
use crate::routing::Address;

/// A completed backend exchange.
#[derive(Debug, Clone)]
pub struct BackendReply {
    pub status: StatusCode,
    pub body: Bytes,
}

impl BackendReply {
    /// The body as UTF-8 text.
    pub fn text(&self) -> Result<&str, BackendError> {
        std::str::from_utf8(&self.body).map_err(|e| BackendError::Body(e.to_string()))
    }
}

/// Pooled HTTP client bound to one address's backend URL.
///
/// Owned by exactly one connection. Dropping it releases the pooled sockets.
pub struct BackendChannel {
    client: Client<HttpConnector, Body>,
    uri: Uri,
    timeout: Duration,
    max_response_size: usize,
}

impl BackendChannel {
    pub fn open(target: &BackendTarget, address: &Address) -> Result<Self, BackendError> {
        let uri = target.uri_for(address)?;

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(target.connect_timeout));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self {
            client,
            uri,
            timeout: target.request_timeout,
            max_response_size: target.max_response_size,
        })
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// `GET {url}{address}`.
    pub async fn get(&self) -> Result<BackendReply, BackendError> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(self.uri.clone())
            .body(Body::empty())
            .map_err(|e| BackendError::Request(e.to_string()))?;
        self.exchange(request).await
    }

    /// `POST {url}{address}` with `text` as a plain-text body.
    pub async fn post_text(&self, text: String) -> Result<BackendReply, BackendError> {
        let request = Request::builder()
            .method(Method::POST)
            .uri(self.uri.clone())
            .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(Body::from(text))
            .map_err(|e| BackendError::Request(e.to_string()))?;
        self.exchange(request).await
    }

    /// Send the request and read the whole body, all under one deadline.
    async fn exchange(&self, request: Request<Body>) -> Result<BackendReply, BackendError> {
        let call = async {
            let response = self
                .client
                .request(request)
                .await
                .map_err(|e| BackendError::Transport(describe(&e)))?;
            let status = response.status();
            let body = read_capped(Body::new(response.into_body()), self.max_response_size).await?;
            Ok(BackendReply { status, body })
        };

        match timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(BackendError::Timeout(self.timeout)),
        }
    }
}

async fn read_capped(body: Body, limit: usize) -> Result<Bytes, BackendError> {
    let mut stream = body.into_data_stream();
    let mut buf = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| BackendError::Body(describe(&e)))?;
        if buf.len() + chunk.len() > limit {
            let room = limit - buf.len();
            buf.extend_from_slice(&chunk[..room]);
            return Err(BackendError::TooLarge {
                limit,
                prefix: Bytes::from(buf),
            });
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(Bytes::from(buf))
}

impl std::fmt::Debug for BackendChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendChannel")
            .field("uri", &self.uri)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use axum::{routing::get, Router};
    use std::net::SocketAddr;
    use tokio::net::TcpListener;

    async fn serve(router: Router) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    fn channel_to(addr: SocketAddr, timeout_secs: u64) -> BackendChannel {
        channel_with(addr, timeout_secs, BackendConfig::default().max_response_size)
    }

    fn channel_with(addr: SocketAddr, timeout_secs: u64, max_response_size: usize) -> BackendChannel {
        let config = BackendConfig {
            url: format!("http://{addr}/"),
            request_timeout_secs: timeout_secs,
            max_response_size,
            ..BackendConfig::default()
        };
        let target = BackendTarget::from_config(&config);
        BackendChannel::open(&target, &Address::from_path("/room").unwrap()).unwrap()
    }

    #[tokio::test]
    async fn get_and_post_reach_address_path() {
        let router = Router::new().route(
            "/room",
            get(|| async { (StatusCode::ACCEPTED, "ok") })
                .post(|headers: axum::http::HeaderMap, body: String| async move {
                    let content_type = headers
                        .get(header::CONTENT_TYPE)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    format!("{content_type}|{body}")
                }),
        );
        let channel = channel_to(serve(router).await, 5);

        let reply = channel.get().await.unwrap();
        assert_eq!(reply.status, StatusCode::ACCEPTED);
        assert_eq!(reply.text().unwrap(), "ok");

        let reply = channel.post_text("hi".into()).await.unwrap();
        assert_eq!(reply.text().unwrap(), "text/plain; charset=utf-8|hi");
    }

    #[tokio::test]
    async fn unreachable_backend_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = channel_to(addr, 5).get().await.unwrap_err();
        assert!(matches!(err, BackendError::Transport(_)), "{err}");
    }

    #[tokio::test]
    async fn silent_backend_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let err = channel_to(addr, 1).post_text("anyone?".into()).await.unwrap_err();
        assert!(matches!(err, BackendError::Timeout(_)), "{err}");
    }

    #[tokio::test]
    async fn oversized_reply_keeps_prefix() {
        let router = Router::new().route("/room", get(|| async { "0123456789" }));
        let channel = channel_with(serve(router).await, 5, 4);

        match channel.get().await.unwrap_err() {
            BackendError::TooLarge { limit, prefix } => {
                assert_eq!(limit, 4);
                assert_eq!(&prefix[..], b"0123");
            }
            other => panic!("expected TooLarge, got {other}"),
        }

        let router = Router::new().route("/room", get(|| async { "0123" }));
        let channel = channel_with(serve(router).await, 5, 4);
        assert_eq!(channel.get().await.unwrap().text().unwrap(), "0123");
    }

    #[test]
    fn non_utf8_reply_is_body_error() {
        let reply = BackendReply {
            status: StatusCode::OK,
            body: Bytes::from_static(&[0xff, 0xfe]),
        };
        assert!(matches!(reply.text(), Err(BackendError::Body(_))));
    }
}

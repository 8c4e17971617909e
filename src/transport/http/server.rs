//! HTTP server accept loop

use std::{
    error::Error as _,
    io::{self, ErrorKind},
    net::SocketAddr,
    time::Duration,
};

use axum::Router;
use hyper::server::conn::http1;
use hyper_util::{
    rt::{TokioIo, TokioTimer},
    service::TowerToHyperService,
};
use listenfd::ListenFd;
use tokio::net::{TcpListener, TcpStream};
use tracing::{Instrument, debug, info, info_span, warn};

use crate::{
    core::{error::TransportError, types::ConnectionId},
    transport::http::deadline::{DeadlineStream, deadline_error},
};

/// How a served connection ended
#[derive(Debug)]
pub enum ConnectionEnd {
    /// The response was written in full
    Completed,
    /// The client went away before the exchange finished
    PeerGone,
    Failed(TransportError),
}

impl ConnectionEnd {
    fn from_result(result: Result<(), hyper::Error>) -> Self {
        let error = match result {
            Ok(()) => return Self::Completed,
            Err(error) => error,
        };

        if error.is_timeout() {
            return Self::Failed(TransportError::RequestTimeout);
        }
        if error.is_incomplete_message() || error.is_canceled() {
            return Self::PeerGone;
        }
        if let Some(io) = io_cause(&error) {
            if let Some(deadline) = deadline_error(io) {
                return Self::Failed(deadline);
            }
            if is_peer_gone(io.kind()) {
                return Self::PeerGone;
            }
        }

        Self::Failed(TransportError::Http(error))
    }

    /// True for endings that deserve operator attention
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed(e) if !matches!(e, TransportError::RequestTimeout))
    }

    fn log(&self) {
        match self {
            Self::Completed => debug!("Connection complete"),
            Self::PeerGone => debug!("Client went away"),
            Self::Failed(e) if !self.is_error() => debug!("Connection dropped: {}", e),
            Self::Failed(e) => warn!("Error serving connection: {}", e),
        }
    }
}

fn io_cause(error: &hyper::Error) -> Option<&io::Error> {
    let mut source = error.source();
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<io::Error>() {
            return Some(io);
        }
        source = cause.source();
    }
    None
}

fn is_peer_gone(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::BrokenPipe
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::NotConnected
            | ErrorKind::UnexpectedEof
    )
}

/// HTTP server
///
/// Connections are served one at a time in accept order. A request runs to
/// completion, including a full download, before the next accept.
pub struct HttpServer {
    listener: TcpListener,
    app: Router,
    request_timeout: Duration,
    stall_timeout: Duration,
}

impl HttpServer {
    /// Bind the listening socket
    ///
    /// A socket passed in by the service manager takes precedence over `addr`.
    pub async fn bind(
        addr: SocketAddr,
        app: Router,
        request_timeout: Duration,
        stall_timeout: Duration,
    ) -> io::Result<Self> {
        let listener = match ListenFd::from_env().take_tcp_listener(0)? {
            Some(std_listener) => {
                std_listener.set_nonblocking(true)?;
                info!("Using inherited listening socket");
                TcpListener::from_std(std_listener)?
            }
            None => TcpListener::bind(addr).await?,
        };

        info!("HTTP server listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            app,
            request_timeout,
            stall_timeout,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve connections forever
    pub async fn run(self) -> io::Result<()> {
        notify_ready();

        loop {
            if let Err(e) = self.serve_one().await {
                warn!("Error accepting connection: {}", e);
            }
        }
    }

    /// Accept one connection and serve it to the end
    pub async fn serve_one(&self) -> io::Result<ConnectionEnd> {
        let (stream, peer) = self.listener.accept().await?;
        let span = info_span!("conn", id = %ConnectionId::new(), %peer);

        let end = async {
            let end = self.serve(stream).await;
            end.log();
            end
        }
        .instrument(span)
        .await;

        Ok(end)
    }

    async fn serve(&self, stream: TcpStream) -> ConnectionEnd {
        if let Err(e) = stream.set_nodelay(true) {
            warn!("Could not disable Nagle: {}", e);
        }

        let io = TokioIo::new(DeadlineStream::new(
            stream,
            self.request_timeout,
            self.stall_timeout,
        ));
        let service = TowerToHyperService::new(self.app.clone());

        let mut builder = http1::Builder::new();
        builder
            .keep_alive(false)
            .timer(TokioTimer::new())
            .header_read_timeout(self.request_timeout);

        ConnectionEnd::from_result(builder.serve_connection(io, service).await)
    }
}

#[cfg(feature = "systemd")]
fn notify_ready() {
    if let Err(e) = sd_notify::notify(false, &[sd_notify::NotifyState::Ready]) {
        warn!("Failed to notify service manager: {}", e);
    }
}

#[cfg(not(feature = "systemd"))]
fn notify_ready() {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockRadioBackend, MockSystemProbe};
    use crate::core::{monitor::LinkMetrics, throughput::TransferPolicy};
    use crate::transport::http::handler::{DiagnosticState, router};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn server(stall_timeout: Duration) -> HttpServer {
        let state = DiagnosticState::new(
            Arc::new(MockRadioBackend::new()),
            Arc::new(MockSystemProbe::new()),
            Arc::new(LinkMetrics::new()),
            TransferPolicy::default(),
        );
        HttpServer::bind(
            "127.0.0.1:0".parse().unwrap(),
            router(Arc::new(state)),
            Duration::from_secs(5),
            stall_timeout,
        )
        .await
        .unwrap()
    }

    async fn request(addr: SocketAddr, raw: &[u8]) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(raw).await.unwrap();
        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.unwrap();
        String::from_utf8_lossy(&response).into_owned()
    }

    #[tokio::test]
    async fn test_serves_sequential_requests() {
        let server = server(Duration::from_secs(5)).await;
        let addr = server.local_addr().unwrap();
        tokio::spawn(server.run());

        let first = request(addr, b"GET /api/ping HTTP/1.1\r\nHost: ap\r\n\r\n").await;
        let second = request(addr, b"GET /nope HTTP/1.1\r\nHost: ap\r\n\r\n").await;

        assert!(first.starts_with("HTTP/1.1 200 OK"));
        assert!(second.starts_with("HTTP/1.1 404 Not Found"));
    }

    #[tokio::test]
    async fn test_completed_exchange() {
        let server = server(Duration::from_secs(5)).await;
        let addr = server.local_addr().unwrap();

        let client = tokio::spawn(request(addr, b"GET /api/clients HTTP/1.1\r\nHost: ap\r\n\r\n"));
        let end = server.serve_one().await.unwrap();

        assert!(matches!(end, ConnectionEnd::Completed));
        assert!(client.await.unwrap().ends_with("\r\n\r\n[]"));
    }

    #[tokio::test]
    async fn test_malformed_request_does_not_stop_server() {
        let server = server(Duration::from_secs(5)).await;
        let addr = server.local_addr().unwrap();
        tokio::spawn(server.run());

        let garbage = request(addr, b"NONSENSE\r\n\r\n").await;
        assert!(!garbage.contains("200 OK"));

        let ok = request(addr, b"GET /api/clients HTTP/1.1\r\nHost: ap\r\n\r\n").await;
        assert!(ok.ends_with("\r\n\r\n[]"));
    }

    #[tokio::test]
    async fn test_abandoned_download_ends_quietly() {
        let server = server(Duration::from_secs(5)).await;
        let addr = server.local_addr().unwrap();

        let client = tokio::spawn(async move {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            stream
                .write_all(b"GET /api/download?size=268435456 HTTP/1.1\r\nHost: ap\r\n\r\n")
                .await
                .unwrap();
            let mut first = [0u8; 1024];
            stream.read_exact(&mut first).await.unwrap();
            // Leaving with unread data resets the connection
        });

        let end = server.serve_one().await.unwrap();
        client.await.unwrap();

        assert!(matches!(end, ConnectionEnd::PeerGone), "{end:?}");
        assert!(!end.is_error());
    }

    #[tokio::test]
    async fn test_stalled_download_is_aborted() {
        let server = server(Duration::from_millis(300)).await;
        let addr = server.local_addr().unwrap();

        let (done_tx, done_rx) = tokio::sync::oneshot::channel::<()>();
        let client = tokio::spawn(async move {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            stream
                .write_all(b"GET /api/download?size=1073741824 HTTP/1.1\r\nHost: ap\r\n\r\n")
                .await
                .unwrap();
            // Never read; keep the socket open until the server gives up
            let _ = done_rx.await;
        });

        let end = server.serve_one().await.unwrap();
        let _ = done_tx.send(());
        client.await.unwrap();

        match end {
            ConnectionEnd::Failed(TransportError::TransferStalled { sent, stalled_for }) => {
                assert!(sent > 0);
                assert_eq!(stalled_for, Duration::from_millis(300));
            }
            other => panic!("unexpected end: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_silent_client_disconnect() {
        let server = server(Duration::from_secs(5)).await;
        let addr = server.local_addr().unwrap();

        drop(TcpStream::connect(addr).await.unwrap());
        let end = server.serve_one().await.unwrap();

        assert!(!end.is_error(), "{end:?}");
    }

    #[test]
    fn test_timeout_is_not_an_error() {
        assert!(!ConnectionEnd::Failed(TransportError::RequestTimeout).is_error());
        assert!(!ConnectionEnd::PeerGone.is_error());
        assert!(!ConnectionEnd::Completed.is_error());
    }
}

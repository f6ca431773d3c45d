//! TCP listener with connection tracking and idle deadlines.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Accept incoming TCP connections for `axum::serve`
//! - Wrap each stream with its tracking guard and idle timer
//! - Expose per-connection info to request middleware
//! - Graceful handling of accept errors

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use axum::extract::connect_info::Connected;
use axum::serve::IncomingStream;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{Instant, Sleep};

use crate::config::ServerConfig;
use crate::net::activity::RequestActivity;
use crate::net::connection::{ConnectionGuard, ConnectionId, ConnectionTracker};

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Failed to bind to address.
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },
}

/// A TCP listener whose connections are tracked and idle-limited.
#[derive(Debug)]
pub struct TrackedListener {
    /// The underlying TCP listener.
    inner: TcpListener,
    /// Open connection bookkeeping, shared with the lifecycle controller.
    tracker: ConnectionTracker,
    /// How long a connection may go without I/O.
    idle_timeout: Duration,
}

impl TrackedListener {
    /// Bind to the configured address.
    pub async fn bind(config: &ServerConfig) -> Result<Self, ListenerError> {
        let listener = TcpListener::bind(config.bind_target())
            .await
            .map_err(|source| ListenerError::Bind {
                address: config.bind_address(),
                source,
            })?;

        Ok(Self::from_tcp(listener, config.idle_timeout))
    }

    /// Wrap an already bound listener.
    pub fn from_tcp(inner: TcpListener, idle_timeout: Duration) -> Self {
        Self {
            inner,
            tracker: ConnectionTracker::new(),
            idle_timeout,
        }
    }

    /// Handle on the connection bookkeeping.
    pub fn tracker(&self) -> ConnectionTracker {
        self.tracker.clone()
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }
}

impl axum::serve::Listener for TrackedListener {
    type Io = TrackedStream;
    type Addr = SocketAddr;

    async fn accept(&mut self) -> (Self::Io, Self::Addr) {
        loop {
            match self.inner.accept().await {
                Ok((stream, peer_addr)) => {
                    let guard = self.tracker.track();
                    tracing::debug!(
                        connection_id = %guard.id(),
                        peer_addr = %peer_addr,
                        open_connections = self.tracker.active_count(),
                        "Connection accepted"
                    );
                    return (TrackedStream::new(stream, guard, self.idle_timeout), peer_addr);
                }
                Err(e) => handle_accept_error(e).await,
            }
        }
    }

    fn local_addr(&self) -> io::Result<Self::Addr> {
        self.inner.local_addr()
    }
}

/// Connection data attached to every request as `ConnectInfo<ConnectionInfo>`.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub id: ConnectionId,
    pub peer_addr: SocketAddr,
    pub activity: RequestActivity,
}

impl Connected<IncomingStream<'_, TrackedListener>> for ConnectionInfo {
    fn connect_info(stream: IncomingStream<'_, TrackedListener>) -> Self {
        let io = stream.io();
        Self {
            id: io.guard.id(),
            peer_addr: *stream.remote_addr(),
            activity: io.activity.clone(),
        }
    }
}

async fn handle_accept_error(e: io::Error) {
    if is_connection_error(&e) {
        return;
    }

    // Out of file descriptors and similar; back off instead of spinning.
    tracing::error!(error = %e, "Accept error");
    tokio::time::sleep(Duration::from_secs(1)).await;
}

fn is_connection_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
    )
}

/// An accepted TCP stream.
///
/// Reads and writes fail once the connection has gone the configured idle
/// timeout without I/O and without a request in flight, or once the tracker
/// requests a forced close. Either error makes hyper drop the connection.
pub struct TrackedStream {
    inner: TcpStream,
    idle_timeout: Duration,
    idle: Pin<Box<Sleep>>,
    close: Option<Pin<Box<dyn Future<Output = ()> + Send>>>,
    activity: RequestActivity,
    guard: ConnectionGuard,
}

impl TrackedStream {
    fn new(inner: TcpStream, guard: ConnectionGuard, idle_timeout: Duration) -> Self {
        Self {
            inner,
            idle_timeout,
            idle: Box::pin(tokio::time::sleep(idle_timeout)),
            close: Some(Box::pin(guard.closed())),
            activity: RequestActivity::default(),
            guard,
        }
    }

    /// Request activity of this connection.
    pub fn activity(&self) -> RequestActivity {
        self.activity.clone()
    }

    fn touch(&mut self) {
        self.idle.as_mut().reset(Instant::now() + self.idle_timeout);
    }

    fn poll_closed(&mut self, cx: &mut Context<'_>) -> Option<io::Error> {
        let closed = match self.close.as_mut() {
            Some(close) => close.as_mut().poll(cx).is_ready(),
            None => true,
        };
        if !closed {
            return None;
        }

        if self.close.take().is_some() {
            tracing::debug!(connection_id = %self.guard.id(), "Connection force-closed");
        }
        Some(io::Error::new(
            io::ErrorKind::ConnectionAborted,
            "connection closed at shutdown deadline",
        ))
    }

    fn poll_idle<T>(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<T>> {
        if self.idle.as_mut().poll(cx).is_pending() {
            return Poll::Pending;
        }

        if !self.activity.is_busy() {
            tracing::debug!(connection_id = %self.guard.id(), "Connection idle timeout");
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "connection idle timeout",
            )));
        }

        // A handler is still running; restart the clock.
        self.touch();
        if self.idle.as_mut().poll(cx).is_ready() {
            cx.waker().wake_by_ref();
        }
        Poll::Pending
    }
}

impl AsyncRead for TrackedStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if let Some(e) = this.poll_closed(cx) {
            return Poll::Ready(Err(e));
        }
        match Pin::new(&mut this.inner).poll_read(cx, buf) {
            Poll::Ready(result) => {
                this.touch();
                Poll::Ready(result)
            }
            Poll::Pending => this.poll_idle(cx),
        }
    }
}

impl AsyncWrite for TrackedStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if let Some(e) = this.poll_closed(cx) {
            return Poll::Ready(Err(e));
        }
        match Pin::new(&mut this.inner).poll_write(cx, buf) {
            Poll::Ready(result) => {
                this.touch();
                Poll::Ready(result)
            }
            Poll::Pending => this.poll_idle(cx),
        }
    }

    fn poll_write_vectored(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if let Some(e) = this.poll_closed(cx) {
            return Poll::Ready(Err(e));
        }
        match Pin::new(&mut this.inner).poll_write_vectored(cx, bufs) {
            Poll::Ready(result) => {
                this.touch();
                Poll::Ready(result)
            }
            Poll::Pending => this.poll_idle(cx),
        }
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if let Some(e) = this.poll_closed(cx) {
            return Poll::Ready(Err(e));
        }
        Pin::new(&mut this.inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::serve::Listener;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn pair(idle_timeout: Duration) -> (TrackedListener, TrackedStream, TcpStream) {
        let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut listener = TrackedListener::from_tcp(tcp, idle_timeout);
        let addr = listener.local_addr().unwrap();

        let client = TcpStream::connect(addr).await.unwrap();
        let (server, _) = listener.accept().await;
        (listener, server, client)
    }

    #[tokio::test]
    async fn bind_failure_names_address() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = ServerConfig {
            host: "127.0.0.1".into(),
            port: taken.local_addr().unwrap().port(),
            ..ServerConfig::default()
        };

        let err = TrackedListener::bind(&config).await.unwrap_err();
        assert!(err.to_string().contains(&config.bind_address()));
    }

    #[tokio::test]
    async fn accepted_connections_are_counted() {
        let (listener, server, client) = pair(Duration::from_secs(60)).await;
        let tracker = listener.tracker();
        assert_eq!(tracker.active_count(), 1);

        drop(server);
        drop(client);
        assert_eq!(tracker.active_count(), 0);
    }

    #[tokio::test]
    async fn data_flows_through() {
        let (_listener, mut server, mut client) = pair(Duration::from_secs(60)).await;

        client.write_all(b"ping").await.unwrap();
        let mut buf = [0u8; 4];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");

        server.write_all(b"pong").await.unwrap();
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"pong");
    }

    #[tokio::test]
    async fn idle_connection_times_out() {
        let (_listener, mut server, _client) = pair(Duration::from_millis(50)).await;

        let mut buf = [0u8; 1];
        let err = tokio::time::timeout(Duration::from_secs(2), server.read(&mut buf))
            .await
            .expect("idle timeout should fire")
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }

    #[tokio::test]
    async fn busy_connection_outlives_idle_timeout() {
        let (_listener, mut server, _client) = pair(Duration::from_millis(50)).await;
        let in_flight = server.activity().begin();

        let mut buf = [0u8; 1];
        let read = tokio::time::timeout(Duration::from_millis(300), server.read(&mut buf)).await;
        assert!(read.is_err(), "read should still be pending, got {read:?}");

        drop(in_flight);
        let err = tokio::time::timeout(Duration::from_secs(2), server.read(&mut buf))
            .await
            .expect("idle timeout should fire once the request is done")
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }

    #[tokio::test]
    async fn close_all_aborts_pending_reads() {
        let (listener, mut server, _client) = pair(Duration::from_secs(60)).await;
        let tracker = listener.tracker();

        let reader = tokio::spawn(async move {
            let mut buf = [0u8; 1];
            server.read(&mut buf).await
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        tracker.close_all();

        let err = tokio::time::timeout(Duration::from_secs(2), reader)
            .await
            .expect("read should abort")
            .unwrap()
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionAborted);
    }
}

/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 17/10/26
******************************************************************************/

//! Tokio driver for a [`Session`].
//!
//! The reactor owns the session and everything the phase machine asks it to
//! run: the supervision timer, the in-flight resolve/connect/handshake task,
//! the read half and the writer task. Every completion is turned back into an
//! [`Input`] and fed to the machine on the reactor task, so transitions never
//! overlap.
//!
//! Other threads reach the reactor through a [`ReactorHandle`].

use crate::config::SessionConfig;
use crate::handler::{SessionContext, SessionHandler, encode_line};
use crate::state::{Command, Input, Session, SessionEvent};
use bytes::{Bytes, BytesMut};
use forkey_core::error::SessionError;
use forkey_core::types::{OpToken, Phase};
use forkey_transport::resolve::Resolver;
use forkey_transport::transport::Transport;
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Time allowed for the writer to flush on shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Work posted to the reactor from another task or thread.
pub type Task = Box<dyn FnOnce(&mut SessionContext) + Send>;

enum Posted {
    Task(Task),
    Write(Bytes),
    Shutdown,
}

/// Cloneable, thread-safe handle to a running reactor.
#[derive(Debug, Clone)]
pub struct ReactorHandle {
    tx: mpsc::UnboundedSender<Posted>,
}

impl ReactorHandle {
    /// Runs `task` on the reactor with a session context.
    ///
    /// Returns false if the reactor has stopped.
    pub fn post<F>(&self, task: F) -> bool
    where
        F: FnOnce(&mut SessionContext) + Send + 'static,
    {
        self.tx.send(Posted::Task(Box::new(task))).is_ok()
    }

    /// Queues `payload` for transmission as one line.
    ///
    /// Returns false if the reactor has stopped.
    pub fn write(&self, payload: impl AsRef<str>) -> bool {
        self.tx
            .send(Posted::Write(encode_line(payload.as_ref())))
            .is_ok()
    }

    /// Asks the reactor to close the session and return.
    ///
    /// Returns false if the reactor has stopped.
    pub fn shutdown(&self) -> bool {
        self.tx.send(Posted::Shutdown).is_ok()
    }
}

enum Completion<T: Transport> {
    Resolved {
        token: OpToken,
        result: io::Result<Vec<SocketAddr>>,
    },
    TcpConnected {
        token: OpToken,
        result: io::Result<T::Socket>,
    },
    Handshaken {
        token: OpToken,
        result: io::Result<T::Stream>,
    },
    Wrote(io::Result<()>),
}

enum Event<T: Transport> {
    Completion(Completion<T>),
    Posted(Posted),
    Read(io::Result<usize>),
    Expired,
}

/// Drives one session over a resolver and a transport.
pub struct Reactor<R: Resolver, T: Transport> {
    session: Session,
    resolver: Arc<R>,
    transport: Arc<T>,
    inputs: VecDeque<Input>,
    completions_tx: mpsc::UnboundedSender<Completion<T>>,
    completions_rx: mpsc::UnboundedReceiver<Completion<T>>,
    handle: ReactorHandle,
    posted_rx: mpsc::UnboundedReceiver<Posted>,
    timer: Option<(OpToken, Instant)>,
    operation: Option<(OpToken, AbortHandle)>,
    socket: Option<T::Socket>,
    reader: Option<ReadHalf<T::Stream>>,
    read_buf: BytesMut,
    read_pending: bool,
    writer_tx: Option<mpsc::UnboundedSender<Bytes>>,
    writer_task: Option<JoinHandle<()>>,
    failure: Option<SessionError>,
    stopping: bool,
}

impl<R: Resolver, T: Transport> Reactor<R, T> {
    /// Creates a reactor for an idle session.
    pub fn new(config: SessionConfig, resolver: R, transport: T) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        let (posted_tx, posted_rx) = mpsc::unbounded_channel();
        Self {
            session: Session::new(config),
            resolver: Arc::new(resolver),
            transport: Arc::new(transport),
            inputs: VecDeque::new(),
            completions_tx,
            completions_rx,
            handle: ReactorHandle { tx: posted_tx },
            posted_rx,
            timer: None,
            operation: None,
            socket: None,
            reader: None,
            read_buf: BytesMut::new(),
            read_pending: false,
            writer_tx: None,
            writer_task: None,
            failure: None,
            stopping: false,
        }
    }

    /// Returns a handle for posting work to this reactor.
    #[must_use]
    pub fn handle(&self) -> ReactorHandle {
        self.handle.clone()
    }

    /// Returns the current session phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.session.phase()
    }

    /// Starts connecting to `host` once [`run`](Self::run) is awaited.
    pub fn connect(&mut self, host: impl Into<String>) {
        self.inputs.push_back(Input::Connect { host: host.into() });
    }

    /// Runs the session until it fails or is shut down.
    ///
    /// # Errors
    /// Returns the terminal session error. The same error has already been
    /// delivered to `handler.on_error`.
    pub async fn run<H: SessionHandler>(mut self, handler: &mut H) -> Result<(), SessionError> {
        loop {
            while let Some(input) = self.inputs.pop_front() {
                for command in self.session.handle(input) {
                    self.execute(command, handler);
                }
            }

            if let Some(error) = self.failure.take() {
                return Err(error);
            }
            if self.stopping {
                self.shut_down().await;
                return Ok(());
            }

            let event = self.next_event().await;
            self.dispatch(event);
        }
    }

    async fn next_event(&mut self) -> Event<T> {
        let deadline = self.timer.map(|(_, deadline)| deadline);
        let reader = if self.read_pending {
            self.reader.as_mut()
        } else {
            None
        };

        tokio::select! {
            biased;
            Some(completion) = self.completions_rx.recv() => Event::Completion(completion),
            Some(posted) = self.posted_rx.recv() => Event::Posted(posted),
            result = read_some(reader, &mut self.read_buf) => Event::Read(result),
            () = expiry(deadline) => Event::Expired,
        }
    }

    fn dispatch(&mut self, event: Event<T>) {
        match event {
            Event::Completion(completion) => self.complete(completion),
            Event::Posted(Posted::Task(task)) => {
                let mut ctx = SessionContext::new(self.session.phase());
                task(&mut ctx);
                self.absorb(ctx);
            }
            Event::Posted(Posted::Write(payload)) => {
                self.inputs.push_back(Input::Write(payload));
            }
            Event::Posted(Posted::Shutdown) => {
                info!("shutdown requested");
                self.stopping = true;
            }
            Event::Read(result) => {
                self.read_pending = false;
                let input = match result {
                    Ok(0) => Input::EndOfStream,
                    Ok(_) => Input::Received(self.read_buf.split().freeze()),
                    Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Input::EndOfStream,
                    Err(e) => Input::ReadFailed(e),
                };
                self.inputs.push_back(input);
            }
            Event::Expired => {
                if let Some((token, _)) = self.timer.take() {
                    self.inputs.push_back(Input::TimerExpired { token });
                }
            }
        }
    }

    fn complete(&mut self, completion: Completion<T>) {
        match completion {
            Completion::Resolved { token, result } => {
                self.finish_operation(token);
                self.inputs.push_back(Input::Resolved { token, result });
            }
            Completion::TcpConnected { token, result } => {
                self.finish_operation(token);
                let result = result.map(|socket| {
                    if self.session.is_current(token) {
                        self.socket = Some(socket);
                    }
                });
                self.inputs.push_back(Input::TcpConnected { token, result });
            }
            Completion::Handshaken { token, result } => {
                self.finish_operation(token);
                let result = result.map(|stream| {
                    if self.session.is_current(token) {
                        let (reader, writer) = tokio::io::split(stream);
                        self.reader = Some(reader);
                        self.start_writer(writer);
                    }
                });
                self.inputs.push_back(Input::Handshaken { token, result });
            }
            Completion::Wrote(result) => {
                self.inputs.push_back(Input::WriteCompleted(result));
            }
        }
    }

    fn execute<H: SessionHandler>(&mut self, command: Command, handler: &mut H) {
        match command {
            Command::ArmTimer { token, after } => {
                self.timer = Some((token, Instant::now() + after));
            }
            Command::CancelTimer => self.timer = None,
            Command::Resolve { token, host, port } => {
                debug!(%host, port, "resolving");
                let resolver = Arc::clone(&self.resolver);
                self.spawn_operation(token, async move {
                    Completion::Resolved {
                        token,
                        result: resolver.resolve(&host, port).await,
                    }
                });
            }
            Command::Connect { token, endpoints } => {
                debug!(?endpoints, "connecting");
                let transport = Arc::clone(&self.transport);
                self.spawn_operation(token, async move {
                    Completion::TcpConnected {
                        token,
                        result: transport.connect(&endpoints).await,
                    }
                });
            }
            Command::Handshake { token, host } => {
                let Some(socket) = self.socket.take() else {
                    self.inputs.push_back(Input::Handshaken {
                        token,
                        result: Err(io::Error::from(io::ErrorKind::NotConnected)),
                    });
                    return;
                };
                debug!(%host, "starting tls handshake");
                let transport = Arc::clone(&self.transport);
                self.spawn_operation(token, async move {
                    Completion::Handshaken {
                        token,
                        result: transport.handshake(&host, socket).await,
                    }
                });
            }
            Command::Abort { token } => {
                if let Some((current, handle)) = self.operation.take() {
                    if current == token {
                        debug!(%token, "operation aborted");
                        handle.abort();
                    } else {
                        self.operation = Some((current, handle));
                    }
                }
            }
            Command::Read => {
                self.read_buf.reserve(self.session.config().read_buffer_size);
                self.read_pending = true;
            }
            Command::Transmit(payload) => self.transmit(payload),
            Command::Emit(event) => self.deliver(event, handler),
            Command::Close => self.close(),
        }
    }

    fn deliver<H: SessionHandler>(&mut self, event: SessionEvent, handler: &mut H) {
        let mut ctx = SessionContext::new(self.session.phase());
        match event {
            SessionEvent::Connected => {
                info!("session connected");
                handler.on_connected(&mut ctx);
            }
            SessionEvent::Line(line) => {
                debug!("< {line}");
                handler.on_line(&line, &mut ctx);
            }
            SessionEvent::Error(err) => {
                error!(error = %err, kind = %err.kind(), "session failed");
                handler.on_error(&err);
                self.failure = Some(err);
            }
        }
        self.absorb(ctx);
    }

    fn absorb(&mut self, ctx: SessionContext) {
        let (outbound, shutdown) = ctx.into_parts();
        self.inputs.extend(outbound.into_iter().map(Input::Write));
        if shutdown {
            self.stopping = true;
        }
    }

    fn transmit(&mut self, payload: Bytes) {
        debug!("> {}", payload.escape_ascii());
        let sent = self
            .writer_tx
            .as_ref()
            .is_some_and(|tx| tx.send(payload).is_ok());
        if !sent {
            self.inputs.push_back(Input::WriteCompleted(Err(io::Error::from(
                io::ErrorKind::NotConnected,
            ))));
        }
    }

    fn spawn_operation<F>(&mut self, token: OpToken, operation: F)
    where
        F: Future<Output = Completion<T>> + Send + 'static,
    {
        let completions = self.completions_tx.clone();
        let task = tokio::spawn(async move {
            let _ = completions.send(operation.await);
        });
        self.operation = Some((token, task.abort_handle()));
    }

    fn finish_operation(&mut self, token: OpToken) {
        if self.operation.as_ref().is_some_and(|(current, _)| *current == token) {
            self.operation = None;
        }
    }

    fn start_writer(&mut self, writer: WriteHalf<T::Stream>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let completions = self.completions_tx.clone();
        self.writer_tx = Some(tx);
        self.writer_task = Some(tokio::spawn(write_loop::<T>(writer, rx, completions)));
    }

    fn close(&mut self) {
        if let Some((token, handle)) = self.operation.take() {
            debug!(%token, "operation aborted on close");
            handle.abort();
        }
        self.timer = None;
        self.socket = None;
        self.reader = None;
        self.read_pending = false;
        self.writer_tx = None;
        if let Some(task) = self.writer_task.take() {
            task.abort();
        }
    }

    async fn shut_down(&mut self) {
        self.writer_tx = None;
        if let Some(task) = self.writer_task.take() {
            let abort = task.abort_handle();
            if tokio::time::timeout(SHUTDOWN_GRACE, task).await.is_err() {
                warn!("writer did not finish in time");
                abort.abort();
            }
        }
        self.close();
    }
}

impl<R: Resolver, T: Transport> fmt::Debug for Reactor<R, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reactor")
            .field("phase", &self.session.phase())
            .field("timer", &self.timer)
            .field("read_pending", &self.read_pending)
            .field("stopping", &self.stopping)
            .finish_non_exhaustive()
    }
}

async fn read_some<S: tokio::io::AsyncRead>(
    reader: Option<&mut ReadHalf<S>>,
    buf: &mut BytesMut,
) -> io::Result<usize> {
    match reader {
        Some(reader) => reader.read_buf(buf).await,
        None => std::future::pending().await,
    }
}

async fn expiry(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn write_loop<T: Transport>(
    mut writer: WriteHalf<T::Stream>,
    mut outbound: mpsc::UnboundedReceiver<Bytes>,
    completions: mpsc::UnboundedSender<Completion<T>>,
) {
    while let Some(payload) = outbound.recv().await {
        let result: io::Result<()> = async {
            writer.write_all(&payload).await?;
            writer.flush().await
        }
        .await;
        let failed = result.is_err();
        if completions.send(Completion::Wrote(result)).is_err() || failed {
            return;
        }
    }
    if let Err(e) = writer.shutdown().await {
        debug!(error = %e, "stream shutdown failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncBufReadExt, BufReader, DuplexStream, duplex};
    use tokio::sync::oneshot;

    #[derive(Clone, Copy)]
    enum ResolveMode {
        Succeed,
        Fail,
        Hang,
    }

    struct CancelGuard {
        cancelled: Arc<AtomicUsize>,
        armed: bool,
    }

    impl Drop for CancelGuard {
        fn drop(&mut self) {
            if self.armed {
                self.cancelled.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    struct FakeResolver {
        mode: ResolveMode,
        calls: Arc<Mutex<Vec<(String, u16)>>>,
        cancelled: Arc<AtomicUsize>,
    }

    impl FakeResolver {
        fn new(mode: ResolveMode) -> Self {
            Self {
                mode,
                calls: Arc::default(),
                cancelled: Arc::default(),
            }
        }
    }

    #[async_trait]
    impl Resolver for FakeResolver {
        async fn resolve(&self, host: &str, port: u16) -> io::Result<Vec<SocketAddr>> {
            self.calls.lock().push((host.to_string(), port));
            let mut guard = CancelGuard {
                cancelled: Arc::clone(&self.cancelled),
                armed: true,
            };
            let result = match self.mode {
                ResolveMode::Succeed => Ok(vec![SocketAddr::from(([10, 0, 0, 2], port))]),
                ResolveMode::Fail => Err(io::Error::other("fault")),
                ResolveMode::Hang => std::future::pending().await,
            };
            guard.armed = false;
            result
        }
    }

    #[derive(Clone, Copy)]
    enum HandshakeMode {
        Succeed,
        Fail,
    }

    struct FakeTransport {
        connect_ok: bool,
        handshake: HandshakeMode,
        peer: Mutex<Option<oneshot::Sender<DuplexStream>>>,
    }

    impl FakeTransport {
        fn new(peer: oneshot::Sender<DuplexStream>) -> Self {
            Self {
                connect_ok: true,
                handshake: HandshakeMode::Succeed,
                peer: Mutex::new(Some(peer)),
            }
        }

        fn unused() -> Self {
            Self {
                connect_ok: true,
                handshake: HandshakeMode::Succeed,
                peer: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        type Socket = ();
        type Stream = DuplexStream;

        async fn connect(&self, _endpoints: &[SocketAddr]) -> io::Result<()> {
            if self.connect_ok {
                Ok(())
            } else {
                Err(io::Error::from(io::ErrorKind::ConnectionRefused))
            }
        }

        async fn handshake(&self, _host: &str, _socket: ()) -> io::Result<DuplexStream> {
            match self.handshake {
                HandshakeMode::Fail => Err(io::Error::other("bad certificate")),
                HandshakeMode::Succeed => {
                    let (client, server) = duplex(4096);
                    if let Some(peer) = self.peer.lock().take() {
                        let _ = peer.send(server);
                    }
                    Ok(client)
                }
            }
        }
    }

    #[derive(Default)]
    struct Recorder {
        connected: usize,
        lines: Vec<String>,
        errors: Vec<SessionError>,
    }

    impl SessionHandler for Recorder {
        fn on_connected(&mut self, ctx: &mut SessionContext) {
            self.connected += 1;
            ctx.write("NICK forkey");
        }

        fn on_line(&mut self, line: &str, ctx: &mut SessionContext) {
            self.lines.push(line.to_string());
            if let Some(token) = line.strip_prefix("PING ") {
                ctx.write(format!("PONG {token}"));
            }
        }

        fn on_error(&mut self, error: &SessionError) {
            self.errors.push(error.clone());
        }
    }

    async fn next_line(peer: &mut BufReader<DuplexStream>) -> String {
        let mut line = String::new();
        peer.read_line(&mut line).await.unwrap();
        line
    }

    #[tokio::test]
    async fn test_end_to_end_ping_pong() {
        let (peer_tx, peer_rx) = oneshot::channel();
        let resolver = FakeResolver::new(ResolveMode::Succeed);
        let calls = Arc::clone(&resolver.calls);
        let mut reactor = Reactor::new(SessionConfig::new(), resolver, FakeTransport::new(peer_tx));
        reactor.connect("irc.hostname.org");
        let handle = reactor.handle();
        let mut handler = Recorder::default();

        let driver = async move {
            let mut peer = BufReader::new(peer_rx.await.unwrap());
            assert_eq!(next_line(&mut peer).await, "NICK forkey\r\n");

            peer.get_mut().write_all(b"PING :abc\r\n\r\n").await.unwrap();
            assert_eq!(next_line(&mut peer).await, "PONG :abc\r\n");

            handle.post(|ctx| ctx.write("PRIVMSG #chan :posted"));
            assert_eq!(next_line(&mut peer).await, "PRIVMSG #chan :posted\r\n");

            handle.shutdown();
            peer
        };

        let (result, _peer) = tokio::join!(reactor.run(&mut handler), driver);
        assert_eq!(result, Ok(()));
        assert_eq!(handler.connected, 1);
        assert_eq!(handler.lines, vec!["PING :abc"]);
        assert!(handler.errors.is_empty());
        assert_eq!(
            calls.lock().clone(),
            vec![("irc.hostname.org".to_string(), 6667)]
        );
    }

    #[tokio::test]
    async fn test_early_writes_flush_after_handshake() {
        let (peer_tx, peer_rx) = oneshot::channel();
        let mut reactor = Reactor::new(
            SessionConfig::new(),
            FakeResolver::new(ResolveMode::Succeed),
            FakeTransport::new(peer_tx),
        );
        let handle = reactor.handle();
        handle.write("PASS secret");
        reactor.connect("host");
        let mut handler = Recorder::default();

        let driver = async move {
            let mut peer = BufReader::new(peer_rx.await.unwrap());
            let first = next_line(&mut peer).await;
            let second = next_line(&mut peer).await;
            handle.shutdown();
            (peer, first, second)
        };

        let (result, (_peer, first, second)) = tokio::join!(reactor.run(&mut handler), driver);
        assert_eq!(result, Ok(()));
        assert_eq!(first, "PASS secret\r\n");
        assert_eq!(second, "NICK forkey\r\n");
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_timeout_cancels_resolver() {
        let resolver = FakeResolver::new(ResolveMode::Hang);
        let cancelled = Arc::clone(&resolver.cancelled);
        let mut reactor = Reactor::new(SessionConfig::new(), resolver, FakeTransport::unused());
        reactor.connect("host");
        let mut handler = Recorder::default();

        let result = reactor.run(&mut handler).await;
        let expected = SessionError::Timeout {
            phase: Phase::Resolving,
            after_ms: 10_000,
        };
        assert_eq!(result, Err(expected.clone()));
        assert_eq!(handler.errors, vec![expected]);

        for _ in 0..10 {
            if cancelled.load(Ordering::SeqCst) == 1 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(cancelled.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_resolution_failure_reported_once() {
        let mut reactor = Reactor::new(
            SessionConfig::new(),
            FakeResolver::new(ResolveMode::Fail),
            FakeTransport::unused(),
        );
        reactor.connect("host");
        let mut handler = Recorder::default();

        let result = reactor.run(&mut handler).await;
        assert!(matches!(result, Err(SessionError::ResolutionFailure { .. })));
        assert_eq!(handler.errors.len(), 1);
        assert_eq!(handler.connected, 0);
    }

    #[tokio::test]
    async fn test_connect_failure_reported() {
        let mut transport = FakeTransport::unused();
        transport.connect_ok = false;
        let mut reactor = Reactor::new(
            SessionConfig::new(),
            FakeResolver::new(ResolveMode::Succeed),
            transport,
        );
        reactor.connect("host");
        let mut handler = Recorder::default();

        let result = reactor.run(&mut handler).await;
        assert!(matches!(result, Err(SessionError::ConnectFailure(_))));
        assert_eq!(handler.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_handshake_failure_reported() {
        let mut transport = FakeTransport::unused();
        transport.handshake = HandshakeMode::Fail;
        let mut reactor = Reactor::new(
            SessionConfig::new(),
            FakeResolver::new(ResolveMode::Succeed),
            transport,
        );
        reactor.connect("host");
        let mut handler = Recorder::default();

        let result = reactor.run(&mut handler).await;
        assert!(matches!(result, Err(SessionError::HandshakeFailure(_))));
        assert_eq!(handler.errors.len(), 1);
        assert_eq!(handler.connected, 0);
    }

    #[tokio::test]
    async fn test_peer_close_reports_stream_closed() {
        let (peer_tx, peer_rx) = oneshot::channel();
        let mut reactor = Reactor::new(
            SessionConfig::new(),
            FakeResolver::new(ResolveMode::Succeed),
            FakeTransport::new(peer_tx),
        );
        reactor.connect("host");
        let mut handler = Recorder::default();

        let driver = async move {
            let mut peer = BufReader::new(peer_rx.await.unwrap());
            assert_eq!(next_line(&mut peer).await, "NICK forkey\r\n");
            peer.get_mut().write_all(b":server 001 forkey :hi\r\n").await.unwrap();
            drop(peer);
        };

        let (result, ()) = tokio::join!(reactor.run(&mut handler), driver);
        assert_eq!(result, Err(SessionError::StreamClosed));
        assert_eq!(handler.lines, vec![":server 001 forkey :hi"]);
        assert_eq!(handler.errors, vec![SessionError::StreamClosed]);
    }
}

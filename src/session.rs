//! Connection/session manager on tokio.
//!
//! [`Engine`] owns the shared [`Config`] and [`Identity`] and a table of live
//! sessions keyed by a random hex id. Each accepted transport gets its own
//! task that drives a sans-IO [`Connection`]: bytes from the transport go to
//! `handle_input`, `poll_output` is drained to the transport, and the
//! handshake deadline is fed back through `handle_timeout`. Upper layers talk
//! to a session through [`Engine::read_application`] /
//! [`Engine::write_application`] and get completions on [`ConnectionEvents`].
//!
//! The session table lock is only held to insert, look up or remove an
//! entry, never across I/O.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use log::{debug, info, trace, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::certificate::Identity;
use crate::connection::{Connection, Output};
use crate::rng::SeededRng;
use crate::types::{CipherSuite, ProtocolVersion};
use crate::{Config, Error};

/// Length of the random session identifier before hex encoding.
pub const SESSION_ID_LEN: usize = 16;

const READ_CHUNK: usize = 16 * 1024;

/// Opaque correlation token threaded through to completion callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag(pub u64);

/// Snapshot of a session handed to [`ConnectionEvents`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub session_id: String,
    pub version: Option<ProtocolVersion>,
    pub cipher_suite: Option<CipherSuite>,
    pub server_name: Option<String>,
}

impl ConnectionInfo {
    fn of(session_id: &str, conn: &Connection) -> Self {
        ConnectionInfo {
            session_id: session_id.to_string(),
            version: conn.negotiated_version(),
            cipher_suite: conn.cipher_suite(),
            server_name: conn.server_name().map(str::to_string),
        }
    }
}

/// Callbacks from session tasks to the layer above.
///
/// Called from the session's own task, one at a time per session.
pub trait ConnectionEvents: Send + Sync {
    fn on_handshake_complete(&self, _conn: &ConnectionInfo) {}

    /// Application bytes answering an earlier [`Engine::read_application`].
    fn on_application_read(&self, _conn: &ConnectionInfo, _data: Vec<u8>, _tag: Tag) {}

    /// The bytes of [`Engine::write_application`] were handed to the transport.
    fn on_application_write_complete(&self, _conn: &ConnectionInfo, _tag: Tag) {}

    /// The session ended and was removed from the table. `error` is the
    /// reason for an abnormal end.
    fn on_closed(&self, _conn: &ConnectionInfo, _error: Option<&Error>) {}
}

/// Events sink that ignores everything.
#[derive(Debug, Default)]
pub struct NoEvents;

impl ConnectionEvents for NoEvents {}

enum Command {
    Read(Tag),
    Write(Vec<u8>, Tag),
    Close,
}

struct SessionEntry {
    commands: mpsc::Sender<Command>,
}

struct EngineInner {
    config: Arc<Config>,
    identity: Identity,
    events: Arc<dyn ConnectionEvents>,
    rng: Mutex<SeededRng>,
    sessions: Mutex<HashMap<String, SessionEntry>>,
}

impl EngineInner {
    fn sessions(&self) -> MutexGuard<'_, HashMap<String, SessionEntry>> {
        // A panicking callback must not take the whole table down with it.
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn new_session_id(&self) -> String {
        let mut id = [0u8; SESSION_ID_LEN];
        self.rng.lock().unwrap_or_else(|e| e.into_inner()).fill(&mut id);
        id.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

/// The server: shared configuration plus the live session table.
///
/// Cloning is cheap and every clone refers to the same table.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

impl Engine {
    /// Create an engine serving `identity`.
    ///
    /// Fails when no enabled cipher suite can be used with the identity's
    /// key, so a misconfigured server never accepts a connection.
    pub fn new(
        config: Arc<Config>,
        identity: Identity,
        events: Arc<dyn ConnectionEvents>,
    ) -> Result<Engine, Error> {
        let usable_tls13 = config.enable_tls13() && !config.tls13_cipher_suites().is_empty();
        let usable_tls12 = config.enable_tls12()
            && config.tls12_cipher_suites().iter().any(|s| {
                s.descriptor()
                    .map(|d| d.authentication == Some(identity.algorithm()))
                    .unwrap_or(false)
            });
        if !usable_tls13 && !usable_tls12 {
            return Err(Error::ConfigError(format!(
                "no enabled cipher suite for a {:?} identity",
                identity.algorithm()
            )));
        }

        let rng = SeededRng::new(config.rng_seed());
        Ok(Engine {
            inner: Arc::new(EngineInner {
                config,
                identity,
                events,
                rng: Mutex::new(rng),
                sessions: Mutex::new(HashMap::new()),
            }),
        })
    }

    /// Start a server handshake on `transport` and return the new session id.
    ///
    /// Must be called from within a tokio runtime.
    pub fn accept<T>(&self, transport: T) -> String
    where
        T: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let session_id = self.inner.new_session_id();
        let (tx, rx) = mpsc::channel(self.inner.config.max_queue_tx());

        self.inner
            .sessions()
            .insert(session_id.clone(), SessionEntry { commands: tx });
        info!("Accepted session {}", session_id);

        let task = SessionTask {
            inner: Arc::clone(&self.inner),
            session_id: session_id.clone(),
            conn: Connection::new(
                Arc::clone(&self.inner.config),
                self.inner.identity.clone(),
                Instant::now(),
            ),
            commands: rx,
            reads: VecDeque::new(),
            received: Vec::new(),
            writes: Vec::new(),
            announced: false,
        };
        tokio::spawn(task.run(transport));

        session_id
    }

    /// Remove a session and release it. Returns whether it was present.
    ///
    /// The session task notices the dropped command channel, sends
    /// close_notify and ends.
    pub fn clear(&self, session_id: &str) -> bool {
        let removed = self.inner.sessions().remove(session_id).is_some();
        if removed {
            debug!("Cleared session {}", session_id);
        }
        removed
    }

    /// Ask for the next application bytes. They arrive through
    /// [`ConnectionEvents::on_application_read`] with `tag`.
    pub fn read_application(&self, session_id: &str, tag: Tag) -> Result<(), Error> {
        self.command(session_id, Command::Read(tag))
    }

    /// Send application bytes. Completion is reported through
    /// [`ConnectionEvents::on_application_write_complete`] with `tag`.
    /// Bytes written before the handshake completes are held until it does.
    ///
    /// Like every request, fails with [`Error::TransmitQueueFull`] when
    /// [`Config::max_queue_tx`] requests are already waiting.
    pub fn write_application(&self, session_id: &str, data: &[u8], tag: Tag) -> Result<(), Error> {
        self.command(session_id, Command::Write(data.to_vec(), tag))
    }

    /// Send close_notify and end the session. Closing twice is harmless.
    pub fn close(&self, session_id: &str) -> Result<(), Error> {
        self.command(session_id, Command::Close)
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.inner.sessions().len()
    }

    /// Session resumption is not offered; every handshake is a full one.
    pub fn resume_session(&self, session_id: &[u8]) -> Result<String, Error> {
        debug!("Refusing to resume session of {} bytes", session_id.len());
        Err(Error::ResumptionUnsupported)
    }

    fn command(&self, session_id: &str, command: Command) -> Result<(), Error> {
        let sessions = self.inner.sessions();
        let entry = sessions
            .get(session_id)
            .ok_or_else(|| Error::UnknownSession(session_id.to_string()))?;
        entry.commands.try_send(command).map_err(|e| match e {
            TrySendError::Full(_) => Error::TransmitQueueFull,
            TrySendError::Closed(_) => Error::ConnectionClosed,
        })
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("identity", &self.inner.identity)
            .field("sessions", &self.session_count())
            .finish()
    }
}

// ============================================================================
// Session task
// ============================================================================

struct SessionTask {
    inner: Arc<EngineInner>,
    session_id: String,
    conn: Connection,
    commands: mpsc::Receiver<Command>,
    /// Outstanding read requests, answered in order.
    reads: VecDeque<Tag>,
    /// Application bytes not yet claimed by a read request.
    received: Vec<u8>,
    /// Writes whose completion goes out after the next flush.
    writes: Vec<Tag>,
    announced: bool,
}

impl SessionTask {
    async fn run<T>(mut self, transport: T)
    where
        T: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let (mut reader, mut writer) = tokio::io::split(transport);
        let result = self.drive(&mut reader, &mut writer).await;

        // Last words (alert or close_notify) before the transport goes.
        if let Err(e) = self.flush(&mut writer).await {
            trace!("Session {} final flush failed: {}", self.session_id, e);
        }
        if let Err(e) = writer.shutdown().await {
            trace!("Session {} shutdown failed: {}", self.session_id, e);
        }

        self.inner.sessions().remove(&self.session_id);
        let info = ConnectionInfo::of(&self.session_id, &self.conn);
        match &result {
            Ok(()) => debug!("Session {} closed", self.session_id),
            Err(e) => warn!("Session {} ended: {}", self.session_id, e),
        }
        self.inner.events.on_closed(&info, result.as_ref().err());
    }

    async fn drive<R, W>(&mut self, reader: &mut R, writer: &mut W) -> Result<(), Error>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = vec![0u8; READ_CHUNK];
        let mut commands_open = true;
        let max_received = self.inner.config.max_queue_rx();

        loop {
            let deadline = self.flush(writer).await?;
            if self.conn.is_closed() {
                return Ok(());
            }

            // Unclaimed application data holds back the transport.
            let readable = self.received.len() < max_received;
            if !readable {
                trace!(
                    "Session {} paused with {} unread bytes",
                    self.session_id,
                    self.received.len()
                );
            }

            tokio::select! {
                read = reader.read(&mut buf), if readable => {
                    let n = read?;
                    if n == 0 {
                        debug!("Session {} transport EOF", self.session_id);
                        self.conn.close();
                        return Ok(());
                    }
                    self.conn.handle_input(&buf[..n])?;
                }

                command = self.commands.recv(), if commands_open => match command {
                    Some(Command::Read(tag)) => {
                        self.reads.push_back(tag);
                        self.answer_reads();
                    }
                    Some(Command::Write(data, tag)) => {
                        self.conn.send_application_data(&data)?;
                        self.writes.push(tag);
                    }
                    Some(Command::Close) => self.conn.close(),
                    None => {
                        // Engine::clear dropped our entry.
                        commands_open = false;
                        self.conn.close();
                    }
                },

                _ = tokio::time::sleep_until(deadline.into()) => {
                    self.conn.handle_timeout(Instant::now())?;
                }
            }
        }
    }

    /// Drain the connection's output to the transport and dispatch events.
    /// Returns the next timeout.
    async fn flush<W>(&mut self, writer: &mut W) -> Result<Instant, Error>
    where
        W: AsyncWrite + Unpin,
    {
        loop {
            match self.conn.poll_output() {
                Output::Transmit(bytes) => {
                    writer.write_all(&bytes).await?;
                }
                Output::Connected => {
                    let info = self.info();
                    info!(
                        "Session {} connected ({:?}, {:?})",
                        self.session_id, info.version, info.cipher_suite
                    );
                    self.announced = true;
                    self.inner.events.on_handshake_complete(&info);
                }
                Output::ApplicationData(data) => {
                    self.received.extend_from_slice(&data);
                    self.answer_reads();
                }
                Output::Closed => {}
                Output::Timeout(at) => {
                    writer.flush().await?;
                    self.complete_writes();
                    return Ok(at);
                }
            }
        }
    }

    fn answer_reads(&mut self) {
        if self.received.is_empty() {
            return;
        }
        if let Some(tag) = self.reads.pop_front() {
            let data = std::mem::take(&mut self.received);
            let info = self.info();
            self.inner.events.on_application_read(&info, data, tag);
        }
    }

    /// Writes made before the handshake are still queued inside the
    /// connection; they complete once it is connected.
    fn complete_writes(&mut self) {
        if !self.announced || self.writes.is_empty() {
            return;
        }
        let info = self.info();
        for tag in self.writes.drain(..) {
            self.inner.events.on_application_write_complete(&info, tag);
        }
    }

    fn info(&self) -> ConnectionInfo {
        ConnectionInfo::of(&self.session_id, &self.conn)
    }
}

//! Connection lifecycle manager.
//!
//! [`Client`] owns the socket and the [`Session`], and runs the single task
//! that every source of work funnels into: inbound lines, liveness signals,
//! the flood-protection ticker and requests sent through a [`ClientHandle`].
//! Because only that task touches the session, protocol state needs no
//! locking.
//!
//! # Example
//!
//! ```no_run
//! use slirc_client::{Client, Event, Options};
//!
//! # async fn demo() -> slirc_client::error::Result<()> {
//! let mut opts = Options::new("irc.libera.chat", "slirc-bot");
//! opts.channels.push("#slirc".to_string());
//!
//! let mut client = Client::new(opts);
//! client.on("message#", |event| {
//!     if let Event::Message { from, to, text } = event {
//!         println!("{} <{}> {}", to, from.as_deref().unwrap_or("*"), text);
//!     }
//! });
//!
//! let handle = client.handle();
//! tokio::spawn(client.run());
//! handle.say("#slirc", "hello")?;
//! # Ok(())
//! # }
//! ```

use std::panic::{self, AssertUnwindSafe};

use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};

use crate::bus::SubscriptionId;
use crate::ctcp::CtcpKind;
use crate::error::{ClientError, Result};
use crate::event::Event;
use crate::liveness::{ConnectionId, LivenessTimer, Signal};
use crate::options::Options;
use crate::session::Session;
use crate::state::WhoisInfo;
use crate::transport::Transport;

type WhoisCallback = Box<dyn FnOnce(&WhoisInfo) + Send>;
type Subscriber = Box<dyn FnMut(&Event) + Send>;

/// Work submitted to the processing task.
enum Request {
    Connect,
    Disconnect {
        message: Option<String>,
        done: oneshot::Sender<()>,
    },
    Join(String),
    Part {
        channel: String,
        message: Option<String>,
    },
    Say {
        target: String,
        text: String,
    },
    Notice {
        target: String,
        text: String,
    },
    Action {
        channel: String,
        text: String,
    },
    Ctcp {
        target: String,
        kind: CtcpKind,
        text: String,
    },
    Whois {
        nick: String,
        callback: Option<WhoisCallback>,
    },
    List(Vec<String>),
    Raw(Vec<String>),
    Subscribe {
        pattern: String,
        handler: Subscriber,
        reply: oneshot::Sender<SubscriptionId>,
    },
    Unsubscribe(SubscriptionId),
}

/// Whether to keep reconnecting after the `attempt`-th failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// `None` retries forever.
    pub retry_count: Option<u32>,
}

impl ReconnectPolicy {
    pub fn new(retry_count: Option<u32>) -> Self {
        ReconnectPolicy { retry_count }
    }

    /// `true` once `attempt` has reached the ceiling.
    pub fn exhausted(&self, attempt: u32) -> bool {
        matches!(self.retry_count, Some(limit) if attempt >= limit)
    }
}

/// How one connection ended.
#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    /// Closed on request; stay idle until asked to connect again.
    Closed,
    /// Failed or dropped; subject to the reconnect policy.
    Lost,
    /// Every handle is gone; stop running.
    Detached,
}

/// The processing task and its state.
pub struct Client {
    session: Session,
    requests: mpsc::UnboundedReceiver<Request>,
    tx: Option<mpsc::UnboundedSender<Request>>,
    policy: ReconnectPolicy,
    attempt: u32,
    next_conn: u64,
    ping_counter: u64,
    close_waiters: Vec<oneshot::Sender<()>>,
    /// Liveness signals from every timer this client has started.
    signals: mpsc::UnboundedSender<Signal>,
    signal_rx: mpsc::UnboundedReceiver<Signal>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("session", &self.session)
            .field("attempt", &self.attempt)
            .field("next_conn", &self.next_conn)
            .field("ping_counter", &self.ping_counter)
            .finish_non_exhaustive()
    }
}

impl Client {
    pub fn new(options: Options) -> Self {
        let (tx, requests) = mpsc::unbounded_channel();
        let (signals, signal_rx) = mpsc::unbounded_channel();
        let policy = ReconnectPolicy::new(options.retry_count);
        Client {
            session: Session::new(options),
            requests,
            tx: Some(tx),
            policy,
            attempt: 0,
            next_conn: 0,
            ping_counter: 0,
            close_waiters: Vec::new(),
            signals,
            signal_rx,
        }
    }

    /// A handle for submitting work. Take handles before calling
    /// [`Client::run`]; the run loop ends once all of them are dropped.
    pub fn handle(&mut self) -> ClientHandle {
        let tx = match &self.tx {
            Some(tx) => tx.clone(),
            None => {
                let (tx, requests) = mpsc::unbounded_channel();
                self.requests = requests;
                self.tx = Some(tx.clone());
                tx
            }
        };
        ClientHandle { tx }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Subscribe before the client starts running.
    pub fn on<F>(&mut self, pattern: &str, handler: F) -> SubscriptionId
    where
        F: FnMut(&Event) + Send + 'static,
    {
        self.session.on(pattern, handler)
    }

    pub fn once<F>(&mut self, pattern: &str, handler: F) -> SubscriptionId
    where
        F: FnOnce(&Event) + Send + 'static,
    {
        self.session.once(pattern, handler)
    }

    /// Drive the connection until every [`ClientHandle`] is dropped.
    ///
    /// Connects immediately when `auto_connect` is set, otherwise waits for
    /// [`ClientHandle::connect`]. After an intentional disconnect or retry
    /// exhaustion the client idles until asked to connect again.
    pub async fn run(mut self) {
        self.tx = None;
        let mut active = self.session.options().auto_connect;

        loop {
            if !active {
                match self.requests.recv().await {
                    None => return,
                    Some(Request::Connect) => {
                        self.attempt = 0;
                        active = true;
                    }
                    Some(request) => self.apply(request),
                }
                self.release_close_waiters();
                continue;
            }

            match self.connect_once().await {
                Outcome::Detached => return,
                Outcome::Closed => active = false,
                Outcome::Lost => {
                    if self.policy.exhausted(self.attempt) {
                        let retry_count = self.policy.retry_count.unwrap_or(self.attempt);
                        warn!(retry_count, "giving up on reconnecting");
                        self.session.emit(Event::Abort { retry_count });
                        active = false;
                        continue;
                    }
                    self.attempt += 1;
                    match self.wait_retry().await {
                        Some(keep) => active = keep,
                        None => return,
                    }
                }
            }
        }
    }

    /// Sleep out the retry delay while still serving requests. Returns
    /// whether to reconnect, or `None` when every handle is gone.
    async fn wait_retry(&mut self) -> Option<bool> {
        let delay = sleep(self.session.options().retry_delay());
        tokio::pin!(delay);
        debug!(attempt = self.attempt, "reconnecting after delay");

        loop {
            tokio::select! {
                _ = &mut delay => return Some(true),
                request = self.requests.recv() => match request {
                    None => return None,
                    Some(Request::Connect) => return Some(true),
                    Some(Request::Disconnect { done, .. }) => {
                        info!("reconnect cancelled by disconnect");
                        let _ = done.send(());
                        return Some(false);
                    }
                    Some(request) => self.apply(request),
                },
            }
        }
    }

    async fn connect_once(&mut self) -> Outcome {
        let options = self.session.options().clone();
        info!(server = %options.server, port = options.port, attempt = self.attempt, "connecting");

        let mut transport = match Transport::connect(&options).await {
            Ok(transport) => transport,
            Err(e) => {
                warn!(error = %e, "connection failed");
                self.session.emit(Event::NetError {
                    error: e.to_string(),
                });
                return Outcome::Lost;
            }
        };

        self.next_conn += 1;
        let conn = ConnectionId(self.next_conn);
        let timer = LivenessTimer::start(
            conn,
            options.ping_interval(),
            options.ping_timeout(),
            self.signals.clone(),
        );
        self.session.on_connected();

        let mut ticker = interval(options.flood_protection_delay());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if let Err(e) = self.flush(&mut transport).await {
                return self.dropped(&timer, ClientError::from(e).to_string());
            }
            if self.session.is_closing() {
                if let Err(e) = transport.close().await {
                    debug!(error = %e, "error while closing transport");
                }
                return self.dropped(&timer, "closed on request".to_string());
            }

            tokio::select! {
                line = transport.read_line() => match line {
                    Some(Ok(line)) => {
                        timer.notify_activity();
                        self.process_line(&line);
                    }
                    Some(Err(e)) => return self.dropped(&timer, ClientError::from(e).to_string()),
                    None => return self.dropped(&timer, "connection closed by server".to_string()),
                },
                Some(signal) = self.signal_rx.recv() => {
                    if signal.connection() != timer.id() {
                        trace!(stale = signal.connection().0, "ignoring signal from old connection");
                        continue;
                    }
                    match signal {
                        Signal::WantPing(_) => {
                            self.ping_counter += 1;
                            let token = self.ping_counter.to_string();
                            self.session.ping(&token);
                        }
                        Signal::Timeout(_) => return self.dropped(&timer, "ping timeout".to_string()),
                    }
                },
                _ = ticker.tick(), if options.flood_protection => {
                    self.session.tick();
                },
                request = self.requests.recv() => match request {
                    Some(request) => self.apply(request),
                    None => {
                        debug!("all handles dropped, quitting");
                        self.session.disconnect(None);
                        let _ = self.flush(&mut transport).await;
                        let _ = transport.close().await;
                        return Outcome::Detached;
                    }
                },
            }
        }
    }

    /// The connection ended. During an intentional disconnect that is the
    /// close being waited for, whatever the transport reported; otherwise
    /// it is a loss for the reconnect policy.
    fn dropped(&mut self, timer: &LivenessTimer, reason: String) -> Outcome {
        timer.stop();
        if self.session.is_closing() {
            info!(conn = timer.id().0, reason = %reason, "connection closed");
            self.release_close_waiters();
            return Outcome::Closed;
        }
        warn!(conn = timer.id().0, error = %reason, "connection lost");
        self.session.emit(Event::NetError { error: reason });
        Outcome::Lost
    }

    /// Feed one line to the session, isolating panics from the read loop
    /// unless we are already shutting down.
    fn process_line(&mut self, line: &str) {
        let session = &mut self.session;
        if let Err(fault) = panic::catch_unwind(AssertUnwindSafe(|| session.handle_line(line))) {
            if self.session.is_closing() {
                panic::resume_unwind(fault);
            }
            error!(line, "fault while processing inbound line");
        }
        if self.session.is_registered() && self.attempt != 0 {
            debug!(attempt = self.attempt, "registered, resetting retry counter");
            self.attempt = 0;
        }
    }

    async fn flush(&mut self, transport: &mut Transport) -> std::io::Result<()> {
        for line in self.session.drain_outbound() {
            transport.write_line(line).await?;
        }
        Ok(())
    }

    fn release_close_waiters(&mut self) {
        for done in self.close_waiters.drain(..) {
            let _ = done.send(());
        }
    }

    fn apply(&mut self, request: Request) {
        let session = &mut self.session;
        match request {
            // Already connected or connecting.
            Request::Connect => {}
            Request::Disconnect { message, done } => {
                session.disconnect(message.as_deref());
                self.close_waiters.push(done);
            }
            Request::Join(channel) => session.join(&channel),
            Request::Part { channel, message } => session.part(&channel, message.as_deref()),
            Request::Say { target, text } => session.say(&target, &text),
            Request::Notice { target, text } => session.notice(&target, &text),
            Request::Action { channel, text } => session.action(&channel, &text),
            Request::Ctcp { target, kind, text } => session.ctcp(&target, kind, &text),
            Request::Whois { nick, callback } => session.whois(&nick, callback),
            Request::List(filters) => {
                let filters: Vec<&str> = filters.iter().map(String::as_str).collect();
                session.list(&filters);
            }
            Request::Raw(args) => session.send(&args),
            Request::Subscribe {
                pattern,
                handler,
                reply,
            } => {
                let id = session.on(&pattern, handler);
                let _ = reply.send(id);
            }
            Request::Unsubscribe(id) => {
                session.off(id);
            }
        }
    }
}

/// Cloneable, non-blocking access to a running [`Client`].
///
/// Every method only enqueues work; it fails with [`ClientError::Closed`]
/// once the client task has stopped.
#[derive(Clone, Debug)]
pub struct ClientHandle {
    tx: mpsc::UnboundedSender<Request>,
}

impl ClientHandle {
    fn request(&self, request: Request) -> Result<()> {
        self.tx.send(request).map_err(|_| ClientError::Closed)
    }

    /// Connect (or reconnect) after a disconnect, an abort, or when
    /// `auto_connect` is off.
    pub fn connect(&self) -> Result<()> {
        self.request(Request::Connect)
    }

    /// Send QUIT and close. The receiver resolves once the transport is
    /// closed.
    pub fn disconnect(&self, message: Option<&str>) -> Result<oneshot::Receiver<()>> {
        let (done, rx) = oneshot::channel();
        self.request(Request::Disconnect {
            message: message.map(str::to_string),
            done,
        })?;
        Ok(rx)
    }

    /// Join a channel; `channel` may carry a key after a space.
    pub fn join(&self, channel: &str) -> Result<()> {
        self.request(Request::Join(channel.to_string()))
    }

    pub fn part(&self, channel: &str, message: Option<&str>) -> Result<()> {
        self.request(Request::Part {
            channel: channel.to_string(),
            message: message.map(str::to_string),
        })
    }

    pub fn say(&self, target: &str, text: &str) -> Result<()> {
        self.request(Request::Say {
            target: target.to_string(),
            text: text.to_string(),
        })
    }

    pub fn notice(&self, target: &str, text: &str) -> Result<()> {
        self.request(Request::Notice {
            target: target.to_string(),
            text: text.to_string(),
        })
    }

    pub fn action(&self, channel: &str, text: &str) -> Result<()> {
        self.request(Request::Action {
            channel: channel.to_string(),
            text: text.to_string(),
        })
    }

    pub fn ctcp(&self, target: &str, kind: CtcpKind, text: &str) -> Result<()> {
        self.request(Request::Ctcp {
            target: target.to_string(),
            kind,
            text: text.to_string(),
        })
    }

    /// Query WHOIS; `callback` runs once with the merged record.
    pub fn whois<F>(&self, nick: &str, callback: F) -> Result<()>
    where
        F: FnOnce(&WhoisInfo) + Send + 'static,
    {
        self.request(Request::Whois {
            nick: nick.to_string(),
            callback: Some(Box::new(callback)),
        })
    }

    pub fn list(&self, filters: &[&str]) -> Result<()> {
        self.request(Request::List(
            filters.iter().map(|f| f.to_string()).collect(),
        ))
    }

    /// Send a raw command; the last argument is framed as trailing if needed.
    pub fn send<S: AsRef<str>>(&self, args: &[S]) -> Result<()> {
        self.request(Request::Raw(
            args.iter().map(|a| a.as_ref().to_string()).collect(),
        ))
    }

    /// Subscribe from outside the client task.
    pub async fn subscribe<F>(&self, pattern: &str, handler: F) -> Result<SubscriptionId>
    where
        F: FnMut(&Event) + Send + 'static,
    {
        let (reply, rx) = oneshot::channel();
        self.request(Request::Subscribe {
            pattern: pattern.to_string(),
            handler: Box::new(handler),
            reply,
        })?;
        rx.await.map_err(|_| ClientError::Closed)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> Result<()> {
        self.request(Request::Unsubscribe(id))
    }
}

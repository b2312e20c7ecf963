#![forbid(unsafe_code)]

//! Connection authorization hook.
//!
//! A server consults an [`AuthObserver`] once per connection, after the peer
//! has authenticated, to decide whether the connection is accepted.
//!
//! # Decision rule
//!
//! Handlers run in connection order. The first handler returning `false`
//! denies the peer and no later handler runs. If every handler returns
//! `true`, or none is connected, the peer is **allowed**.
//!
//! # Failure Modes
//!
//! - **Handler panics**: unwinds to the caller. The handler list lock is not
//!   held while handlers run, so the observer stays usable.
//! - **Handler connects or disconnects during a decision**: takes effect on
//!   the next decision.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::credentials::Credentials;

static NEXT_HANDLER_ID: AtomicU64 = AtomicU64::new(1);

/// The transport a peer connected over.
pub trait PeerStream {
    /// Short description of the remote end, for diagnostics.
    fn peer_label(&self) -> String;
}

impl PeerStream for std::net::TcpStream {
    fn peer_label(&self) -> String {
        self.peer_addr()
            .map_or_else(|_| "tcp:<unknown>".to_owned(), |addr| format!("tcp:{addr}"))
    }
}

#[cfg(unix)]
impl PeerStream for std::os::unix::net::UnixStream {
    fn peer_label(&self) -> String {
        match self.peer_addr() {
            Ok(addr) => match addr.as_pathname() {
                Some(path) => format!("unix:{}", path.display()),
                None => "unix:<unnamed>".to_owned(),
            },
            Err(_) => "unix:<unknown>".to_owned(),
        }
    }
}

/// Identifier of a connected handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

type Handler = Arc<dyn Fn(&dyn PeerStream, Option<&Credentials>) -> bool + Send + Sync>;

/// Decides whether authenticated peers may connect.
#[derive(Clone, Default)]
pub struct AuthObserver {
    handlers: Arc<Mutex<Vec<(HandlerId, Handler)>>>,
}

impl AuthObserver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect a handler voting on every peer.
    pub fn connect_authorize_authenticated_peer(
        &self,
        handler: impl Fn(&dyn PeerStream, Option<&Credentials>) -> bool + Send + Sync + 'static,
    ) -> HandlerId {
        let id = HandlerId(NEXT_HANDLER_ID.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, Arc::new(handler)));
        id
    }

    /// Disconnect a handler. Returns `false` if it was not connected here.
    pub fn disconnect(&self, id: HandlerId) -> bool {
        let mut handlers = self.lock();
        match handlers.iter().position(|(h, _)| *h == id) {
            Some(pos) => {
                handlers.remove(pos);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.lock().len()
    }

    /// Decide whether the peer on `stream` is authorized.
    pub fn authorize_authenticated_peer(
        &self,
        stream: &dyn PeerStream,
        credentials: Option<&Credentials>,
    ) -> bool {
        let handlers: Vec<(HandlerId, Handler)> = self.lock().clone();
        let peer = stream.peer_label();
        for (id, handler) in &handlers {
            if !handler(stream, credentials) {
                tracing::info!(
                    peer = %peer,
                    credentials = ?credentials.map(ToString::to_string),
                    handler = id.0,
                    "peer denied"
                );
                return false;
            }
        }
        tracing::debug!(
            peer = %peer,
            credentials = ?credentials.map(ToString::to_string),
            handlers = handlers.len(),
            "peer authorized"
        );
        true
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(HandlerId, Handler)>> {
        self.handlers.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl fmt::Debug for AuthObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthObserver")
            .field("handlers", &self.handler_count())
            .finish()
    }
}

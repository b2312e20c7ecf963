#![forbid(unsafe_code)]

//! Authorization of authenticated peers.
//!
//! [`AuthObserver`] lets a server veto connections after authentication,
//! for example to accept only peers running as the same user:
//!
//! ```
//! use tether_auth::{AuthObserver, Credentials, PeerStream};
//!
//! struct Local;
//! impl PeerStream for Local {
//!     fn peer_label(&self) -> String {
//!         "local".into()
//!     }
//! }
//!
//! let me = Credentials::new(1000, 1000, None);
//! let observer = AuthObserver::new();
//! observer.connect_authorize_authenticated_peer(move |_, creds| {
//!     creds.is_some_and(|c| c.is_same_user(&me))
//! });
//!
//! assert!(observer.authorize_authenticated_peer(&Local, Some(&Credentials::new(1000, 5, None))));
//! assert!(!observer.authorize_authenticated_peer(&Local, None));
//! ```

pub mod credentials;
pub mod observer;

pub use credentials::Credentials;
pub use observer::{AuthObserver, HandlerId, PeerStream};

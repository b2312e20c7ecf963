#![forbid(unsafe_code)]

//! Process credentials of a peer.

use std::fmt;

/// Identity of a process: user, group and, when known, process id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Credentials {
    uid: u32,
    gid: u32,
    pid: Option<i32>,
}

impl Credentials {
    #[must_use]
    pub const fn new(uid: u32, gid: u32, pid: Option<i32>) -> Self {
        Self { uid, gid, pid }
    }

    /// Credentials of the current process.
    #[cfg(unix)]
    #[must_use]
    pub fn current() -> Self {
        use rustix::process::{getgid, getpid, getuid};
        Self {
            uid: getuid().as_raw(),
            gid: getgid().as_raw(),
            pid: Some(getpid().as_raw_nonzero().get()),
        }
    }

    /// Credentials of the process on the other end of a Unix socket.
    #[cfg(any(target_os = "linux", target_os = "android"))]
    pub fn from_peer(stream: &std::os::unix::net::UnixStream) -> std::io::Result<Self> {
        let cred = rustix::net::sockopt::socket_peercred(stream)?;
        Ok(Self {
            uid: cred.uid.as_raw(),
            gid: cred.gid.as_raw(),
            pid: Some(cred.pid.as_raw_nonzero().get()),
        })
    }

    #[must_use]
    pub const fn uid(&self) -> u32 {
        self.uid
    }

    #[must_use]
    pub const fn gid(&self) -> u32 {
        self.gid
    }

    #[must_use]
    pub const fn pid(&self) -> Option<i32> {
        self.pid
    }

    /// Whether both credentials belong to the same user.
    #[must_use]
    pub const fn is_same_user(&self, other: &Credentials) -> bool {
        self.uid == other.uid
    }
}

impl fmt::Display for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "uid={} gid={}", self.uid, self.gid)?;
        if let Some(pid) = self.pid {
            write!(f, " pid={pid}")?;
        }
        Ok(())
    }
}

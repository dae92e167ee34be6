//! Registered user
//!
//! Each user owns its own fine-grained locks: one for the follow graph
//! edges, one for the set of users blocking it, and one for the mailbox
//! (session binding + offline queue). Cross-user edge updates go through
//! [`with_edge_pair`], which always locks the lower registration number first.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::network::ConnectionId;
use crate::protocol::Notification;

/// Follow graph edges of one user
#[derive(Debug, Default)]
pub(crate) struct Edges {
    pub(crate) following: HashSet<String>,
    pub(crate) followers: HashSet<String>,
}

/// Session binding and offline queue, locked together
#[derive(Debug, Default)]
struct Mailbox {
    connection: Option<ConnectionId>,
    pending: VecDeque<Notification>,
}

/// Outcome of handing a notification to a user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Sent to the user's live connection
    Live,

    /// Stored in the offline queue
    Queued,
}

/// A registered user
#[derive(Debug)]
pub struct User {
    username: String,
    password: String,

    /// Registration sequence number (listing order)
    seq: u64,

    /// Age at registration time
    age: u16,

    edges: Mutex<Edges>,

    /// Users that have blocked this user
    blocked_by: Mutex<HashSet<String>>,

    mailbox: Mutex<Mailbox>,

    /// Mirrors `mailbox.connection.is_some()` for lock-free reads
    connected: AtomicBool,
}

impl User {
    pub fn new(username: impl Into<String>, password: impl Into<String>, seq: u64, age: u16) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            seq,
            age,
            edges: Mutex::new(Edges::default()),
            blocked_by: Mutex::new(HashSet::new()),
            mailbox: Mutex::new(Mailbox::default()),
            connected: AtomicBool::new(false),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn age(&self) -> u16 {
        self.age
    }

    /// Plaintext comparison
    pub fn password_matches(&self, password: &str) -> bool {
        self.password == password
    }

    // =========================================================================
    // Session
    // =========================================================================

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.mailbox.lock().connection
    }

    /// Bind the user to a connection
    ///
    /// Every queued notification is passed to `deliver` in FIFO order while
    /// the mailbox is locked, and the user only becomes connected once the
    /// queue is empty, so a concurrent delivery either lands in the drained
    /// queue or goes live after it.
    pub fn connect<F>(&self, connection_id: ConnectionId, mut deliver: F)
    where
        F: FnMut(Notification),
    {
        let mut mailbox = self.mailbox.lock();
        while let Some(notification) = mailbox.pending.pop_front() {
            deliver(notification);
        }
        mailbox.connection = Some(connection_id);
        self.connected.store(true, Ordering::Release);
    }

    /// Unbind the user from its connection
    pub fn disconnect(&self) {
        let mut mailbox = self.mailbox.lock();
        mailbox.connection = None;
        self.connected.store(false, Ordering::Release);
    }

    /// Send live if connected, otherwise queue
    ///
    /// `send` returns whether the connection accepted the message; a refused
    /// live send falls back to the queue.
    pub fn deliver<F>(&self, notification: Notification, send: F) -> Delivery
    where
        F: FnOnce(ConnectionId, &Notification) -> bool,
    {
        let mut mailbox = self.mailbox.lock();
        if let Some(connection_id) = mailbox.connection {
            if send(connection_id, &notification) {
                return Delivery::Live;
            }
        }
        mailbox.pending.push_back(notification);
        Delivery::Queued
    }

    /// Number of notifications waiting for the next login
    pub fn pending_count(&self) -> usize {
        self.mailbox.lock().pending.len()
    }

    // =========================================================================
    // Social Graph
    // =========================================================================

    pub fn is_following(&self, username: &str) -> bool {
        self.edges.lock().following.contains(username)
    }

    pub fn has_follower(&self, username: &str) -> bool {
        self.edges.lock().followers.contains(username)
    }

    /// Snapshot of follower usernames
    pub fn followers(&self) -> Vec<String> {
        self.edges.lock().followers.iter().cloned().collect()
    }

    /// Snapshot of followed usernames
    pub fn following(&self) -> Vec<String> {
        self.edges.lock().following.iter().cloned().collect()
    }

    pub fn follower_count(&self) -> usize {
        self.edges.lock().followers.len()
    }

    pub fn following_count(&self) -> usize {
        self.edges.lock().following.len()
    }

    /// True if `username` has blocked this user
    pub fn is_blocked_by(&self, username: &str) -> bool {
        self.blocked_by.lock().contains(username)
    }

    /// Record that `username` blocked this user; false if already recorded
    pub fn add_blocked_by(&self, username: &str) -> bool {
        self.blocked_by.lock().insert(username.to_string())
    }
}

/// Lock the edges of two distinct users in registration order
///
/// Returns `None` when both references are the same user.
pub(crate) fn with_edge_pair<R, F>(a: &User, b: &User, f: F) -> Option<R>
where
    F: FnOnce(&mut Edges, &mut Edges) -> R,
{
    if a.seq == b.seq {
        return None;
    }

    if a.seq < b.seq {
        let mut first = a.edges.lock();
        let mut second = b.edges.lock();
        Some(f(&mut first, &mut second))
    } else {
        let mut first = b.edges.lock();
        let mut second = a.edges.lock();
        Some(f(&mut second, &mut first))
    }
}

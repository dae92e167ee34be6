//! Directory Module
//!
//! The shared, concurrently accessed store of users, the social graph and
//! the notification history.
//!
//! ## Locking
//! Two coarse reader-writer locks are owned here but acquired by the engine:
//! - **session lock**: write for LOGIN/LOGOUT, read for POST/PM
//! - **directory lock**: write for REGISTER, read for LOGSTAT
//!
//! FOLLOW, STAT and BLOCK take neither; they rely on the per-user locks in
//! [`User`]. The internal maps have their own short-lived locks which never
//! nest inside one another.

mod user;

pub use user::{Delivery, User};

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{Datelike, Local, NaiveDate};
use parking_lot::{Mutex, RwLock};

use crate::error::{BgsError, Result};
use crate::network::ConnectionId;
use crate::protocol::{Notification, UserStats};
use user::with_edge_pair;

/// Shared user directory
pub struct Directory {
    /// "Now", frozen at construction; ages are computed against it
    today: NaiveDate,

    /// username -> user
    registered: RwLock<HashMap<String, Arc<User>>>,

    /// connection id -> logged-in user
    logged_in: RwLock<HashMap<ConnectionId, Arc<User>>>,

    /// Every accepted post and PM, in acceptance order
    history: Mutex<Vec<Notification>>,

    next_user_number: AtomicU64,

    session_lock: RwLock<()>,
    directory_lock: RwLock<()>,
}

impl Directory {
    /// Create an empty directory, snapshotting today's local date
    pub fn new() -> Self {
        Self::with_today(Local::now().date_naive())
    }

    /// Create an empty directory with a fixed "today"
    pub fn with_today(today: NaiveDate) -> Self {
        Self {
            today,
            registered: RwLock::new(HashMap::new()),
            logged_in: RwLock::new(HashMap::new()),
            history: Mutex::new(Vec::new()),
            next_user_number: AtomicU64::new(0),
            session_lock: RwLock::new(()),
            directory_lock: RwLock::new(()),
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Gates LOGIN/LOGOUT (write) against POST/PM (read)
    pub fn session_lock(&self) -> &RwLock<()> {
        &self.session_lock
    }

    /// Gates REGISTER (write) against LOGSTAT (read)
    pub fn directory_lock(&self) -> &RwLock<()> {
        &self.directory_lock
    }

    // =========================================================================
    // Registration
    // =========================================================================

    pub fn get_by_name(&self, username: &str) -> Option<Arc<User>> {
        self.registered.read().get(username).cloned()
    }

    /// Register a new user; fails if the name is taken
    pub fn register(&self, username: &str, password: &str, year: u16, month: u16, day: u16) -> Result<Arc<User>> {
        let mut registered = self.registered.write();
        if registered.contains_key(username) {
            return Err(BgsError::UsernameTaken(username.to_string()));
        }

        let seq = self.next_user_number.fetch_add(1, Ordering::SeqCst);
        let age = age_on(self.today, year, month, day);
        let user = Arc::new(User::new(username, password, seq, age));
        registered.insert(username.to_string(), Arc::clone(&user));

        Ok(user)
    }

    pub fn registered_count(&self) -> usize {
        self.registered.read().len()
    }

    /// Registered users in registration order, minus those who blocked `caller`
    pub fn list_registered(&self, caller: &User) -> Vec<Arc<User>> {
        let mut users: Vec<Arc<User>> = self
            .registered
            .read()
            .values()
            .filter(|user| !caller.is_blocked_by(user.username()))
            .cloned()
            .collect();
        users.sort_by_key(|user| user.seq());
        users
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    /// Bind `user` to `connection_id`, draining its offline queue through `deliver`
    pub fn login<F>(&self, user: &Arc<User>, connection_id: ConnectionId, deliver: F)
    where
        F: FnMut(Notification),
    {
        user.connect(connection_id, deliver);
        self.logged_in.write().insert(connection_id, Arc::clone(user));
    }

    /// Remove the session bound to `connection_id`, if any
    pub fn logout(&self, connection_id: ConnectionId) -> Option<Arc<User>> {
        let user = self.logged_in.write().remove(&connection_id)?;
        user.disconnect();
        Some(user)
    }

    pub fn is_anyone_logged_in(&self) -> bool {
        !self.logged_in.read().is_empty()
    }

    pub fn logged_in_count(&self) -> usize {
        self.logged_in.read().len()
    }

    pub fn get_by_connection(&self, connection_id: ConnectionId) -> Option<Arc<User>> {
        self.logged_in.read().get(&connection_id).cloned()
    }

    // =========================================================================
    // Social Graph
    // =========================================================================

    /// Follow or unfollow `target_name` on behalf of `actor`
    ///
    /// Follow succeeds only if the target exists, is not followed yet and has
    /// not blocked the actor; unfollow only if currently followed. Both sides
    /// of the edge change under the same pair of locks.
    pub fn follow_or_unfollow(&self, actor: &User, target_name: &str, follow: bool) -> bool {
        let Some(target) = self.get_by_name(target_name) else {
            return false;
        };

        if follow && actor.is_blocked_by(target.username()) {
            return false;
        }

        with_edge_pair(actor, &target, |actor_edges, target_edges| {
            if follow {
                if !actor_edges.following.insert(target.username().to_string()) {
                    return false;
                }
                target_edges.followers.insert(actor.username().to_string());
            } else {
                if !actor_edges.following.remove(target.username()) {
                    return false;
                }
                target_edges.followers.remove(actor.username());
            }
            true
        })
        .unwrap_or(false)
    }

    /// `blocker` blocks `target`: record it and sever follow edges both ways
    pub fn block(&self, blocker: &User, target: &User) {
        target.add_blocked_by(blocker.username());

        with_edge_pair(blocker, target, |blocker_edges, target_edges| {
            if blocker_edges.following.remove(target.username()) {
                target_edges.followers.remove(blocker.username());
            }
            if target_edges.following.remove(blocker.username()) {
                blocker_edges.followers.remove(target.username());
            }
        });
    }

    // =========================================================================
    // History & Stats
    // =========================================================================

    pub fn add_to_history(&self, notification: Notification) {
        self.history.lock().push(notification);
    }

    pub fn history_len(&self) -> usize {
        self.history.lock().len()
    }

    /// Number of public posts authored by `username`
    pub fn post_count(&self, username: &str) -> usize {
        self.history
            .lock()
            .iter()
            .filter(|n| n.is_public() && n.author == username)
            .count()
    }

    /// Stats entry for LOGSTAT/STAT
    pub fn stats_of(&self, user: &User) -> UserStats {
        UserStats {
            age: user.age(),
            posts: saturate(self.post_count(user.username())),
            followers: saturate(user.follower_count()),
            following: saturate(user.following_count()),
        }
    }
}

impl Default for Directory {
    fn default() -> Self {
        Self::new()
    }
}

/// Whole years between the birth date and `today`
fn age_on(today: NaiveDate, year: u16, month: u16, day: u16) -> u16 {
    let mut age = today.year() - i32::from(year);
    let today_md = (today.month(), today.day());
    if (u32::from(month), u32::from(day)) > today_md {
        age -= 1;
    }
    age.clamp(0, i32::from(u16::MAX)) as u16
}

fn saturate(count: usize) -> u16 {
    u16::try_from(count).unwrap_or(u16::MAX)
}

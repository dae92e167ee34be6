//! Engine Module
//!
//! The protocol engine: one instance per connection, executing decoded
//! messages against the shared [`Directory`].
//!
//! ## Responsibilities
//! - Enforce each command's preconditions
//! - Take the coarse directory/session locks for the commands that need them
//! - Answer with ACK on success and ERROR(opcode) on any rejection
//! - Fan notifications out live or into offline queues
//!
//! ## Lock Usage
//! | Command        | Session lock | Directory lock |
//! |----------------|--------------|----------------|
//! | REGISTER       | -            | write          |
//! | LOGIN / LOGOUT | write        | -              |
//! | POST / PM      | read         | -              |
//! | LOGSTAT        | -            | read           |
//! | FOLLOW / STAT / BLOCK | -     | -              |

mod content;

pub use content::{mentions, WordFilter};

use std::sync::Arc;

use crate::directory::{Delivery, Directory, User};
use crate::error::{BgsError, Result};
use crate::network::{ConnectionId, Connections};
use crate::protocol::{Ack, AckBody, BirthDate, Message, Notification};

/// Per-connection protocol engine
pub struct Engine {
    directory: Arc<Directory>,
    filter: Arc<WordFilter>,

    /// Set by `start`
    connection_id: ConnectionId,
    connections: Option<Arc<dyn Connections>>,

    /// Set once LOGOUT succeeds
    should_terminate: bool,
}

impl Engine {
    pub fn new(directory: Arc<Directory>, filter: Arc<WordFilter>) -> Self {
        Self {
            directory,
            filter,
            connection_id: 0,
            connections: None,
            should_terminate: false,
        }
    }

    /// Bind the engine to its connection before any message is processed
    pub fn start(&mut self, connection_id: ConnectionId, connections: Arc<dyn Connections>) {
        self.connection_id = connection_id;
        self.connections = Some(connections);
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    pub fn should_terminate(&self) -> bool {
        self.should_terminate
    }

    /// Execute one decoded message
    ///
    /// Every rejection is answered with ERROR carrying the message's opcode.
    pub fn process(&mut self, message: Message) {
        if self.connections.is_none() {
            tracing::warn!("Dropping {} received before the engine was started", message.opcode());
            return;
        }

        tracing::trace!("Connection {} processing {:?}", self.connection_id, message);

        if let Err(e) = self.dispatch(&message) {
            tracing::debug!(
                "Connection {}: {} rejected: {}",
                self.connection_id,
                message.opcode(),
                e
            );
            self.send(message.error());
        }
    }

    /// Release this connection's session after the transport went away
    pub fn on_disconnect(&mut self) {
        {
            let _session = self.directory.session_lock().write();
            if let Some(user) = self.directory.logout(self.connection_id) {
                tracing::debug!(
                    "Connection {} closed; {} logged out",
                    self.connection_id,
                    user.username()
                );
            }
        }

        if let Some(connections) = &self.connections {
            connections.disconnect(self.connection_id);
        }
    }

    fn dispatch(&mut self, message: &Message) -> Result<()> {
        // Server-only messages have no ACK and are never executed
        let Some(ack) = message.ack() else {
            return Ok(());
        };

        match message {
            Message::Register {
                username,
                password,
                birth_date,
            } => self.register(username, password, *birth_date, ack),
            Message::Login {
                username,
                password,
                captcha,
            } => self.login(username, password, *captcha, ack),
            Message::Logout => self.logout(ack),
            Message::Follow { follow, username } => self.follow(*follow, username, ack),
            Message::Post { content } => self.post(content, ack),
            Message::Pm { username, content } => self.pm(username, content, ack),
            Message::LogStat => self.logstat(ack),
            Message::Stat { usernames } => self.stat(usernames, ack),
            Message::Block { username } => self.block(username, ack),
            Message::Notification(_) | Message::Ack(_) | Message::Error { .. } => Ok(()),
        }
    }

    // =========================================================================
    // Handlers
    // =========================================================================

    fn register(&mut self, username: &str, password: &str, birth_date: BirthDate, ack: Ack) -> Result<()> {
        let _registry = self.directory.directory_lock().write();

        let user = self
            .directory
            .register(username, password, birth_date.year, birth_date.month, birth_date.day)?;
        tracing::info!("Registered {} (#{}, age {})", user.username(), user.seq(), user.age());

        self.send(Message::Ack(ack));
        Ok(())
    }

    fn login(&mut self, username: &str, password: &str, captcha: u8, ack: Ack) -> Result<()> {
        let _session = self.directory.session_lock().write();

        if self.directory.get_by_connection(self.connection_id).is_some() {
            return Err(BgsError::AlreadyLoggedIn);
        }
        if captcha == b'0' {
            return Err(BgsError::CaptchaRejected);
        }

        let user = self
            .directory
            .get_by_name(username)
            .ok_or_else(|| BgsError::UnknownUser(username.to_string()))?;
        if !user.password_matches(password) {
            return Err(BgsError::WrongPassword);
        }
        if user.is_connected() {
            return Err(BgsError::AlreadyConnected(username.to_string()));
        }

        self.send(Message::Ack(ack));

        let connection_id = self.connection_id;
        let mut drained = 0usize;
        self.directory.login(&user, connection_id, |notification| {
            drained += 1;
            self.send(Message::Notification(notification));
        });

        tracing::info!(
            "{} logged in on connection {} ({} queued notifications delivered)",
            username,
            connection_id,
            drained
        );
        Ok(())
    }

    fn logout(&mut self, ack: Ack) -> Result<()> {
        let _session = self.directory.session_lock().write();

        // Global check: any logged-in user anywhere lets LOGOUT through
        if !self.directory.is_anyone_logged_in() {
            return Err(BgsError::NoActiveSessions);
        }

        if let Some(user) = self.directory.logout(self.connection_id) {
            tracing::info!("{} logged out from connection {}", user.username(), self.connection_id);
        }

        self.send(Message::Ack(ack));
        self.should_terminate = true;
        if let Some(connections) = &self.connections {
            connections.disconnect(self.connection_id);
        }
        Ok(())
    }

    fn follow(&mut self, follow: bool, username: &str, ack: Ack) -> Result<()> {
        let actor = self.current_user()?;

        if !self.directory.follow_or_unfollow(&actor, username, follow) {
            return Err(BgsError::FollowRejected(username.to_string()));
        }

        self.send(Message::Ack(ack));
        Ok(())
    }

    fn post(&mut self, content: &str, ack: Ack) -> Result<()> {
        let _session = self.directory.session_lock().read();

        let sender = self.current_user()?;

        let mut recipients = sender.followers();
        for name in mentions(content) {
            if !recipients.contains(&name) && self.directory.get_by_name(&name).is_some() {
                recipients.push(name);
            }
        }

        let notification = Notification::public(sender.username(), content);
        for name in &recipients {
            if let Some(recipient) = self.directory.get_by_name(name) {
                self.deliver(&recipient, notification.clone());
            }
        }
        self.directory.add_to_history(notification);

        tracing::debug!("{} posted to {} recipients", sender.username(), recipients.len());
        self.send(Message::Ack(ack));
        Ok(())
    }

    fn pm(&mut self, username: &str, content: &str, ack: Ack) -> Result<()> {
        let _session = self.directory.session_lock().read();

        let sender = self.current_user()?;
        let recipient = self
            .directory
            .get_by_name(username)
            .ok_or_else(|| BgsError::UnknownUser(username.to_string()))?;
        if recipient.is_blocked_by(sender.username()) {
            return Err(BgsError::Blocked(username.to_string()));
        }

        let notification = Notification::private(sender.username(), self.filter.apply(content));
        let delivery = self.deliver(&recipient, notification.clone());
        self.directory.add_to_history(notification);

        tracing::debug!("{} sent a PM to {} ({:?})", sender.username(), username, delivery);
        self.send(Message::Ack(ack));
        Ok(())
    }

    fn logstat(&mut self, mut ack: Ack) -> Result<()> {
        let _registry = self.directory.directory_lock().read();

        let caller = self.current_user()?;
        let stats = self
            .directory
            .list_registered(&caller)
            .iter()
            .map(|user| self.directory.stats_of(user))
            .collect();

        ack.body = AckBody::Stats(stats);
        self.send(Message::Ack(ack));
        Ok(())
    }

    /// All-or-nothing on unknown names, then skip users who blocked the caller
    fn stat(&mut self, usernames: &[String], mut ack: Ack) -> Result<()> {
        let caller = self.current_user()?;

        let users = usernames
            .iter()
            .map(|name| {
                self.directory
                    .get_by_name(name)
                    .ok_or_else(|| BgsError::UnknownUser(name.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        let stats = users
            .iter()
            .filter(|user| !caller.is_blocked_by(user.username()))
            .map(|user| self.directory.stats_of(user))
            .collect();

        ack.body = AckBody::Stats(stats);
        self.send(Message::Ack(ack));
        Ok(())
    }

    fn block(&mut self, username: &str, ack: Ack) -> Result<()> {
        let blocker = self.current_user()?;
        let target = self
            .directory
            .get_by_name(username)
            .ok_or_else(|| BgsError::UnknownUser(username.to_string()))?;

        self.directory.block(&blocker, &target);
        tracing::debug!("{} blocked {}", blocker.username(), username);

        self.send(Message::Ack(ack));
        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn current_user(&self) -> Result<Arc<User>> {
        self.directory
            .get_by_connection(self.connection_id)
            .ok_or(BgsError::NotLoggedIn)
    }

    fn deliver(&self, recipient: &User, notification: Notification) -> Delivery {
        recipient.deliver(notification, |connection_id, notification| {
            self.send_to(connection_id, Message::Notification(notification.clone()))
        })
    }

    fn send(&self, message: Message) -> bool {
        self.send_to(self.connection_id, message)
    }

    fn send_to(&self, connection_id: ConnectionId, message: Message) -> bool {
        match &self.connections {
            Some(connections) => connections.send(connection_id, message),
            None => false,
        }
    }
}

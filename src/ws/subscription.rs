//! Per-connection subscription manager.
//!
//! Tracks which event topics a WebSocket client is subscribed to and
//! which account's events it may see, providing server-side filtering.

use std::collections::HashSet;

use crate::domain::{AccountId, EventTopic, Principal, Session, SessionToken, StorefrontEvent};

/// Manages topic subscriptions and visibility for a single connection.
#[derive(Debug)]
pub struct SubscriptionManager {
    /// Principal of the session that opened the connection.
    principal: Principal,
    /// Token the connection authenticated with.
    token: SessionToken,
    /// Subscribed topics. If `subscribe_all` is true, this set is ignored.
    topics: HashSet<EventTopic>,
    /// Whether the client subscribes to all topics (wildcard `"*"`).
    subscribe_all: bool,
}

impl SubscriptionManager {
    /// Creates an empty subscription manager for `session`.
    #[must_use]
    pub fn new(session: &Session) -> Self {
        Self {
            principal: session.principal,
            token: session.token.clone(),
            topics: HashSet::new(),
            subscribe_all: false,
        }
    }

    /// Adds topics to the subscription set. `"*"` enables the wildcard.
    pub fn subscribe(&mut self, topics: &[EventTopic], wildcard: bool) {
        if wildcard {
            self.subscribe_all = true;
        }
        self.topics.extend(topics.iter().copied());
    }

    /// Removes topics from the subscription set. `"*"` clears the wildcard.
    pub fn unsubscribe(&mut self, topics: &[EventTopic], wildcard: bool) {
        if wildcard {
            self.subscribe_all = false;
        }
        for topic in topics {
            self.topics.remove(topic);
        }
    }

    /// Returns `true` if the event is visible to this principal and its
    /// topic matches the subscription filter.
    ///
    /// Customers see their own account's events and catalog changes; the
    /// administrator sees everything.
    #[must_use]
    pub fn matches(&self, event: &StorefrontEvent) -> bool {
        let visible = match (self.principal, event.account_id()) {
            (Principal::Admin, _) => true,
            (Principal::Account { .. }, None) => event.topic() == EventTopic::Plans,
            (Principal::Account { account_id }, Some(owner)) => account_id == owner,
        };
        visible && (self.subscribe_all || self.topics.contains(&event.topic()))
    }

    /// Returns `true` if this event ends the connection's access: its own
    /// session logged out, or the customer's account was banned or deleted.
    #[must_use]
    pub fn revokes_access(&self, event: &StorefrontEvent) -> bool {
        if let StorefrontEvent::SessionClosed { token, .. } = event {
            return *token == self.token;
        }
        let Principal::Account { account_id } = self.principal else {
            return false;
        };
        match event {
            StorefrontEvent::AccountDeleted { account_id: id, .. } => *id == account_id,
            StorefrontEvent::AccountBanChanged {
                account_id: id,
                banned,
                ..
            } => *banned && *id == account_id,
            _ => false,
        }
    }

    /// Account the connection belongs to, if any.
    #[must_use]
    pub fn account_id(&self) -> Option<AccountId> {
        match self.principal {
            Principal::Account { account_id } => Some(account_id),
            Principal::Admin => None,
        }
    }

    /// Returns the explicitly subscribed topics.
    #[must_use]
    pub fn topics(&self) -> Vec<EventTopic> {
        self.topics.iter().copied().collect()
    }

    /// Returns the number of explicitly subscribed topics.
    #[must_use]
    pub fn count(&self) -> usize {
        self.topics.len()
    }

    /// Returns `true` if the wildcard subscription is active.
    #[must_use]
    pub fn is_subscribed_all(&self) -> bool {
        self.subscribe_all
    }
}

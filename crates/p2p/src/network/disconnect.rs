//! Disconnect bookkeeping for a single peer.
//!
//! A peer goes from connected to disconnected exactly once. The first party
//! to record a disconnect (a local immediate or clean disconnect, or the
//! transport reporting a close) fixes the reason and origin; later calls
//! cannot overwrite it. Subscribers are told once, when the transport
//! confirms the connection is closed.

use meridian_core::PeerDisconnectedSubscriber;
use meridian_types::{DisconnectReason, DisconnectRecord, SubscriptionId};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug)]
struct LinkState {
    connected: bool,
    record: Option<DisconnectRecord>,
}

/// The `{connected, reason, locally_initiated}` tuple, updated as one unit.
#[derive(Debug)]
pub struct DisconnectState {
    link: Mutex<LinkState>,
}

impl Default for DisconnectState {
    fn default() -> Self {
        Self {
            link: Mutex::new(LinkState {
                connected: true,
                record: None,
            }),
        }
    }
}

impl DisconnectState {
    /// Whether no disconnect has been requested or observed yet.
    pub fn is_connected(&self) -> bool {
        self.link.lock().connected
    }

    /// The recorded disconnect, if any.
    pub fn record(&self) -> Option<DisconnectRecord> {
        self.link.lock().record
    }

    /// Mark the peer disconnected and record why, unless a record exists.
    ///
    /// Returns true if this call wrote the record.
    pub fn record_disconnect(
        &self,
        reason: Option<DisconnectReason>,
        locally_initiated: bool,
    ) -> bool {
        let mut link = self.link.lock();
        link.connected = false;
        if link.record.is_some() {
            return false;
        }
        link.record = Some(DisconnectRecord::new(reason, locally_initiated));
        true
    }

    /// The transport closed the connection. Returns the final record.
    pub fn mark_closed(&self) -> DisconnectRecord {
        let mut link = self.link.lock();
        link.connected = false;
        *link.record.get_or_insert(DisconnectRecord::REMOTE_CLOSE)
    }
}

struct SubscriberState {
    next_id: SubscriptionId,
    subscribers: BTreeMap<SubscriptionId, Arc<dyn PeerDisconnectedSubscriber>>,
    delivered: Option<DisconnectRecord>,
}

/// Disconnect observers, notified exactly once.
pub struct DisconnectSubscribers {
    state: Mutex<SubscriberState>,
}

impl Default for DisconnectSubscribers {
    fn default() -> Self {
        Self {
            state: Mutex::new(SubscriberState {
                next_id: SubscriptionId::new(0),
                subscribers: BTreeMap::new(),
                delivered: None,
            }),
        }
    }
}

impl DisconnectSubscribers {
    /// Register an observer.
    ///
    /// If the notification has already gone out, the observer is called
    /// right away with the delivered record.
    pub fn subscribe(&self, subscriber: Arc<dyn PeerDisconnectedSubscriber>) -> SubscriptionId {
        let (id, late) = {
            let mut state = self.state.lock();
            let id = state.next_id;
            state.next_id = id.next();
            match state.delivered {
                Some(record) => (id, Some(record)),
                None => {
                    state.subscribers.insert(id, Arc::clone(&subscriber));
                    (id, None)
                }
            }
        };

        if let Some(record) = late {
            subscriber.on_disconnected(record.reason, record.locally_initiated);
        }
        id
    }

    /// Remove an observer. Returns false if it was not registered (or has
    /// already been notified).
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.state.lock().subscribers.remove(&id).is_some()
    }

    /// Notify every observer, in subscription order. Only the first call has
    /// any effect.
    ///
    /// Returns false if the notification had already been delivered.
    pub fn deliver(&self, record: DisconnectRecord) -> bool {
        let subscribers = {
            let mut state = self.state.lock();
            if state.delivered.is_some() {
                return false;
            }
            state.delivered = Some(record);
            std::mem::take(&mut state.subscribers)
        };

        for subscriber in subscribers.values() {
            subscriber.on_disconnected(record.reason, record.locally_initiated);
        }
        true
    }

    /// Number of observers still waiting.
    pub fn len(&self) -> usize {
        self.state.lock().subscribers.len()
    }

    /// Whether no observers are waiting.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

use crate::protocol::Message;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::oneshot;

/// Outstanding request table: index → one-shot reply slot
///
/// The caller claims a slot before sending; the receive loop fulfils
/// it when the echoing reply arrives. Dropping a slot's sender wakes
/// the waiting caller with a closed-channel error, which is how a dead
/// transport fails every blocked call at once.
#[derive(Debug, Default)]
pub struct PendingReplies {
    slots: Mutex<HashMap<i32, oneshot::Sender<Message>>>,
}

impl PendingReplies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a slot for a request about to be sent
    pub fn claim(&self, index: i32) -> oneshot::Receiver<Message> {
        let (tx, rx) = oneshot::channel();
        self.slots
            .lock()
            .expect("pending table poisoned")
            .insert(index, tx);
        rx
    }

    /// Deliver a reply to whichever caller is waiting on its index
    ///
    /// Returns false when no such request is outstanding; the caller
    /// drops the reply.
    pub fn fulfill(&self, reply: Message) -> bool {
        let slot = self
            .slots
            .lock()
            .expect("pending table poisoned")
            .remove(&reply.index);
        match slot {
            Some(tx) => tx.send(reply).is_ok(),
            None => false,
        }
    }

    /// Forget a claimed slot (the caller gave up waiting)
    pub fn abandon(&self, index: i32) {
        self.slots
            .lock()
            .expect("pending table poisoned")
            .remove(&index);
    }

    /// Drop every outstanding slot, failing all blocked callers
    pub fn fail_all(&self) {
        self.slots
            .lock()
            .expect("pending table poisoned")
            .clear();
    }

    pub fn outstanding(&self) -> usize {
        self.slots.lock().expect("pending table poisoned").len()
    }
}

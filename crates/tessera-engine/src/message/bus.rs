use std::collections::HashMap;

use crate::error::BusWarning;

use super::message::{same_handler, HandlerRef, Message, MessagePriority, MessageSubscriptionNode};

/// Deliveries drained per `update` unless configured otherwise.
pub const DEFAULT_MESSAGES_PER_UPDATE: usize = 10;

/// Publish/subscribe hub with an immediate and a deferred delivery tier.
///
/// - HIGH messages are dispatched inside [`post`](Self::post), in subscription
///   order.
/// - NORMAL messages are queued as one node per subscribed handler and handed
///   out by [`update`](Self::update), at most `budget` per call.
///
/// The deferred queue is drained last-in-first-out: the most recently queued
/// node is delivered first, and overflow from a busy frame is delivered on
/// later frames behind anything posted in between.
pub struct MessageBus {
    subscriptions: HashMap<String, Vec<HandlerRef>>,
    queue: Vec<MessageSubscriptionNode>,
    budget: usize,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::with_budget(DEFAULT_MESSAGES_PER_UPDATE)
    }

    /// Bus delivering at most `budget` queued messages per update.
    ///
    /// A zero budget would never drain the queue and is raised to 1.
    pub fn with_budget(budget: usize) -> Self {
        let budget = if budget == 0 {
            log::warn!("message budget of 0 would starve the queue, using 1");
            1
        } else {
            budget
        };
        Self {
            subscriptions: HashMap::new(),
            queue: Vec::new(),
            budget,
        }
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    /// Registers `handler` for `code`.
    ///
    /// Subscribing the same handler twice to a code is reported and ignored.
    pub fn subscribe(&mut self, code: &str, handler: HandlerRef) -> Result<(), BusWarning> {
        let handlers = self.subscriptions.entry(code.to_string()).or_default();
        if handlers.iter().any(|h| same_handler(h, &handler)) {
            let warning = BusWarning::DuplicateSubscription(code.to_string());
            log::warn!("{warning}");
            return Err(warning);
        }
        handlers.push(handler);
        log::trace!("subscribed handler to '{code}' ({} total)", handlers.len());
        Ok(())
    }

    /// Removes `handler` from `code`.
    ///
    /// Unknown codes or handlers are reported and otherwise ignored.
    pub fn unsubscribe(&mut self, code: &str, handler: &HandlerRef) -> Result<(), BusWarning> {
        let index = self
            .subscriptions
            .get(code)
            .and_then(|handlers| handlers.iter().position(|h| same_handler(h, handler)));

        let Some(index) = index else {
            let warning = BusWarning::UnknownSubscription(code.to_string());
            log::warn!("{warning}");
            return Err(warning);
        };

        if let Some(handlers) = self.subscriptions.get_mut(code) {
            handlers.remove(index);
            if handlers.is_empty() {
                self.subscriptions.remove(code);
            }
        }
        Ok(())
    }

    /// Posts `message` to every handler subscribed to its code.
    ///
    /// Messages without subscribers are dropped.
    pub fn post(&mut self, message: Message) {
        log::trace!("message posted: {message:?}");
        let Some(handlers) = self.subscriptions.get(&message.code) else {
            return;
        };

        match message.priority {
            MessagePriority::High => {
                // Snapshot so handlers are free to hold their own borrows.
                let targets: Vec<HandlerRef> = handlers.clone();
                for handler in targets {
                    handler.borrow_mut().on_message(&message);
                }
            }
            MessagePriority::Normal => {
                for handler in handlers {
                    self.queue.push(MessageSubscriptionNode {
                        message: message.clone(),
                        handler: handler.clone(),
                    });
                }
            }
        }
    }

    /// Delivers up to `budget` queued messages, newest first.
    ///
    /// Returns the number delivered.
    pub fn update(&mut self, dt: f32) -> usize {
        if self.queue.is_empty() {
            return 0;
        }

        let limit = self.budget.min(self.queue.len());
        for _ in 0..limit {
            let Some(node) = self.queue.pop() else { break };
            node.handler.borrow_mut().on_message(&node.message);
        }
        log::trace!(
            "bus update (dt={dt:.4}): delivered {limit}, {} still queued",
            self.queue.len()
        );
        limit
    }

    /// Number of queued (handler, message) nodes.
    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    pub fn subscriber_count(&self, code: &str) -> usize {
        self.subscriptions.get(code).map_or(0, Vec::len)
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Delivery tier.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum MessagePriority {
    /// Queued and delivered by `MessageBus::update`.
    #[default]
    Normal,
    /// Delivered synchronously inside `MessageBus::post`.
    High,
}

/// A posted message.
///
/// `sender` and `context` are opaque to the bus; receivers downcast them with
/// [`Message::sender_as`] / [`Message::context_as`].
#[derive(Clone)]
pub struct Message {
    pub code: String,
    pub sender: Option<Rc<dyn Any>>,
    pub context: Option<Rc<dyn Any>>,
    pub priority: MessagePriority,
}

impl Message {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            sender: None,
            context: None,
            priority: MessagePriority::Normal,
        }
    }

    /// A message delivered before `post` returns.
    pub fn high(code: impl Into<String>) -> Self {
        Self { priority: MessagePriority::High, ..Self::new(code) }
    }

    pub fn with_sender(mut self, sender: Rc<dyn Any>) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn with_context(mut self, context: Rc<dyn Any>) -> Self {
        self.context = Some(context);
        self
    }

    pub fn context_as<T: Any>(&self) -> Option<&T> {
        self.context.as_deref()?.downcast_ref()
    }

    pub fn sender_as<T: Any>(&self) -> Option<&T> {
        self.sender.as_deref()?.downcast_ref()
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("code", &self.code)
            .field("priority", &self.priority)
            .field("has_sender", &self.sender.is_some())
            .field("has_context", &self.context.is_some())
            .finish()
    }
}

/// Receiver of bus messages.
pub trait MessageHandler {
    fn on_message(&mut self, message: &Message);
}

/// Shared handler reference as stored by the bus.
///
/// Subscription identity is the allocation: two `HandlerRef`s are the same
/// handler when they point at the same `RefCell`.
pub type HandlerRef = Rc<RefCell<dyn MessageHandler>>;

#[inline]
pub(crate) fn same_handler(a: &HandlerRef, b: &HandlerRef) -> bool {
    // Compare data pointers only; vtable pointers may differ across codegen units.
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

/// A queued NORMAL-priority delivery: one message bound to one handler.
pub(crate) struct MessageSubscriptionNode {
    pub message: Message,
    pub handler: HandlerRef,
}

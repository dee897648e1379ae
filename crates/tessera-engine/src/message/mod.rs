//! Engine-internal messaging.
//!
//! Publishers and subscribers only share a string code. Payloads travel as
//! type-erased `Rc<dyn Any>` and are downcast by the receiver.

mod bus;
mod message;

pub use bus::{MessageBus, DEFAULT_MESSAGES_PER_UPDATE};
pub use message::{HandlerRef, Message, MessageHandler, MessagePriority};

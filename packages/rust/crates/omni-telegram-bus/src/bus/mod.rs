//! Message bus seam: trait, NATS implementation, subject scheme.

mod nats;
pub mod subjects;
mod traits;

pub use nats::NatsBus;
pub use traits::{BusError, BusMessage, BusSubscription, MessageBus, ReplyAddress};

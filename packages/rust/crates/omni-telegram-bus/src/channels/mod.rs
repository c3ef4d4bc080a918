//! Chat platform channels bridged onto the bus.

pub mod telegram;

//! Flow reconstruction: canonical keys and per-batch accumulators.

mod accumulator;
mod key;

pub use accumulator::{FlowAccumulator, FlowPacket, FlowTable};
pub use key::{FlowKey, Protocol};

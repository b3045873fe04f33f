//! Interface to the BLE host stack.
//!
//! The host stack (controller, HCI, L2CAP, ATT, and SMP protocol machines)
//! runs outside of this crate. It is driven through the [`Stack`] trait and
//! reports back via [`Event`]s, which are handled on a single task in the order
//! in which they were delivered.

pub use {event::*, stack::*};

mod event;
#[cfg(test)]
pub(crate) mod mock;
mod stack;

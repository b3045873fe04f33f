use rand_core::RngCore;
use tracing::{info, warn};

use super::{Device, NumCompare, Passkey, Prompt};

/// Passkey action requested by the host stack during pairing.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum PasskeyAction {
    /// Display a passkey that the peer enters.
    Display,
    /// Confirm that the value matches the one shown by the peer.
    NumCompare(NumCompare),
    /// Enter the passkey shown by the peer.
    Input,
    /// Provide out-of-band data.
    Oob,
    /// Action code not known to this crate.
    Unknown(u8),
}

impl PasskeyAction {
    /// Decodes a host stack action code. `numcmp` is only used for the
    /// numeric comparison action.
    #[must_use]
    pub const fn from_raw(action: u8, numcmp: u32) -> Self {
        match action {
            1 => Self::Oob,
            2 => Self::Input,
            3 => Self::Display,
            4 => Self::NumCompare(NumCompare(numcmp)),
            a => Self::Unknown(a),
        }
    }
}

/// Response to a passkey action, injected back into the host stack.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum PasskeyIo {
    Display(Passkey),
    NumCompare(bool),
    Input(Passkey),
    Oob([u8; 16]),
}

/// Transient state of a single passkey action. An exchange is created for
/// each action and consumed by [`Exchange::respond`].
#[derive(Clone, Copy, Debug)]
pub struct Exchange {
    action: PasskeyAction,
    passkey: Option<Passkey>,
}

impl Exchange {
    /// Starts a new exchange, generating a passkey if the action requires
    /// one.
    #[must_use]
    pub fn new(action: PasskeyAction, rng: &mut impl RngCore) -> Self {
        let passkey = matches!(action, PasskeyAction::Display).then(|| Passkey::random(rng));
        Self { action, passkey }
    }

    /// Returns the generated passkey, if any.
    #[inline]
    #[must_use]
    pub const fn passkey(&self) -> Option<Passkey> {
        self.passkey
    }

    /// Interacts with the local device and returns the response to inject or
    /// `None` if the action is not supported. `auto_accept` decides numeric
    /// comparison when the device has no confirmation input.
    pub fn respond(self, dev: &mut Device, auto_accept: bool) -> Option<PasskeyIo> {
        match self.action {
            PasskeyAction::Display => {
                let k = self.passkey.unwrap_or_default();
                dev.display.show(Prompt::Passkey(k));
                Some(PasskeyIo::Display(k))
            }
            PasskeyAction::NumCompare(n) => {
                dev.display.show(Prompt::NumCompare(n));
                let accept = match dev.confirm.as_mut() {
                    Some(c) => c.confirm(n),
                    None => {
                        if auto_accept {
                            warn!("Accepting numeric comparison without user confirmation");
                        }
                        auto_accept
                    }
                };
                info!("Numeric comparison {}", if accept { "accepted" } else { "rejected" });
                Some(PasskeyIo::NumCompare(accept))
            }
            PasskeyAction::Input => {
                info!("Entering passkey {}", Passkey::ZERO);
                Some(PasskeyIo::Input(Passkey::ZERO))
            }
            PasskeyAction::Oob => {
                warn!("Supplying placeholder OOB data; pairing is not protected from MITM");
                Some(PasskeyIo::Oob([0; 16]))
            }
            PasskeyAction::Unknown(a) => {
                warn!("Unsupported passkey action {a}");
                None
            }
        }
    }
}

use bitflags::bitflags;

bitflags! {
    /// Characteristic properties ([Vol 3] Part G, Section 3.3.1.1).
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    #[repr(transparent)]
    pub struct Prop: u8 {
        /// Permits reads of the Characteristic Value.
        const READ = 0x02;
        /// Permit writes of the Characteristic Value without response.
        const WRITE_WITHOUT_RESPONSE = 0x04;
        /// Permits writes of the Characteristic Value with response.
        const WRITE = 0x08;
        /// Permits notifications of a Characteristic Value without
        /// acknowledgment. The host stack adds the Client Characteristic
        /// Configuration descriptor.
        const NOTIFY = 0x10;
        /// Permits indications of a Characteristic Value with acknowledgment.
        /// The host stack adds the Client Characteristic Configuration
        /// descriptor.
        const INDICATE = 0x20;
    }
}

impl Prop {
    /// Returns whether any write operation is permitted.
    #[inline]
    #[must_use]
    pub const fn writable(self) -> bool {
        self.intersects(Self::WRITE.union(Self::WRITE_WITHOUT_RESPONSE))
    }

    /// Returns whether the host stack adds a Client Characteristic
    /// Configuration descriptor for this characteristic.
    #[inline]
    #[must_use]
    pub const fn has_cccd(self) -> bool {
        self.intersects(Self::NOTIFY.union(Self::INDICATE))
    }
}

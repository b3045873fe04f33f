use bitflags::bitflags;

bitflags! {
    /// Advertising data flags ([CSS] Part A, Section 1.3).
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    #[repr(transparent)]
    pub struct AdvFlag: u8 {
        /// LE Limited Discoverable Mode.
        const LE_LIMITED = 1 << 0;
        /// LE General Discoverable Mode.
        const LE_GENERAL = 1 << 1;
        /// BR/EDR Not Supported.
        const NO_BREDR = 1 << 2;
    }
}

/// Response data type ([Assigned Numbers] Section 2.3).
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    Ord,
    PartialEq,
    PartialOrd,
    num_enum::IntoPrimitive,
    num_enum::TryFromPrimitive,
)]
#[non_exhaustive]
#[repr(u8)]
pub enum ResponseDataType {
    Flags = 0x01,
    IncompleteServiceClass16 = 0x02,
    CompleteServiceClass16 = 0x03,
    IncompleteServiceClass32 = 0x04,
    CompleteServiceClass32 = 0x05,
    IncompleteServiceClass128 = 0x06,
    CompleteServiceClass128 = 0x07,
    ShortLocalName = 0x08,
    CompleteLocalName = 0x09,
    TxPower = 0x0A,
    Appearance = 0x19,
    LeRole = 0x1C,
    ManufacturerData = 0xFF,
}

/// LE role ([CSS] Part A, Section 1.17).
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Eq,
    PartialEq,
    num_enum::IntoPrimitive,
    num_enum::TryFromPrimitive,
)]
#[non_exhaustive]
#[repr(u8)]
pub enum LeRole {
    #[default]
    PeripheralOnly = 0x00,
    CentralOnly = 0x01,
    PeripheralPreferred = 0x02,
    CentralPreferred = 0x03,
}

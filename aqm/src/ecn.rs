//! Explicit Congestion Notification codepoints.

use std::fmt;

/// Mask selecting the ECN field in the IP TOS / traffic-class byte.
pub const MASK: u8 = 0b11;

/// The ECN field of a packet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Ecn {
    /// Not ECN-capable transport.
    #[default]
    NotEct,
    /// ECN-capable transport, codepoint 1 (used by L4S).
    Ect1,
    /// ECN-capable transport, codepoint 0.
    Ect0,
    /// Congestion experienced.
    Ce,
}

impl Ecn {
    /// Decode the ECN field from a TOS / traffic-class byte.
    pub const fn from_tos(tos: u8) -> Self {
        match tos & MASK {
            0b00 => Self::NotEct,
            0b01 => Self::Ect1,
            0b10 => Self::Ect0,
            _ => Self::Ce,
        }
    }

    /// Return the two-bit encoding of the codepoint.
    pub const fn bits(self) -> u8 {
        match self {
            Self::NotEct => 0b00,
            Self::Ect1 => 0b01,
            Self::Ect0 => 0b10,
            Self::Ce => 0b11,
        }
    }

    /// Returns true if the sender understands congestion marks.
    pub const fn is_capable(self) -> bool {
        !matches!(self, Self::NotEct)
    }

    /// Returns true if the packet belongs to the low-latency (L4S) service.
    ///
    /// Packets already marked `CE` are treated as L4S so a mark applied upstream does not move
    /// them back into the classic queue behavior.
    pub const fn is_l4s(self) -> bool {
        matches!(self, Self::Ect1 | Self::Ce)
    }

    /// Set congestion experienced.
    ///
    /// Returns false (leaving the codepoint untouched) if the transport is not ECN-capable, in
    /// which case the caller must drop instead.
    pub fn mark(&mut self) -> bool {
        if !self.is_capable() {
            return false;
        }
        *self = Self::Ce;
        true
    }
}

impl fmt::Display for Ecn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotEct => "Not-ECT",
            Self::Ect1 => "ECT(1)",
            Self::Ect0 => "ECT(0)",
            Self::Ce => "CE",
        };
        f.write_str(name)
    }
}

use std::fmt;

/// Position of a registered system in the world's update order. Systems run
/// in ascending order every frame, so registration order is update order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SystemHandle(u32);

impl SystemHandle {
    pub(crate) fn new(order: u32) -> Self {
        Self(order)
    }

    /// Zero for the first system updated each frame.
    #[inline]
    pub fn order(self) -> u32 {
        self.0
    }

    /// Whether this system updates before `other` within a frame.
    pub fn runs_before(self, other: SystemHandle) -> bool {
        self.0 < other.0
    }
}

impl fmt::Display for SystemHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

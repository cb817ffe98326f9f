//! Preallocated request storage.
//!
//! [`RequestSlot`]s live in a [`SlotArena`] and are linked by index, either in the free pool or
//! in the pending queue.

mod arena;
mod slot;

pub use arena::{SlotArena, SlotIndex};
pub use slot::{FixedText, RequestSlot};

/// Attach protocol version of a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ApiVersion {
    /// Command and arguments are passed inline, the channel only carries the reply.
    V1 = 1,
    /// Command and arguments are read from the channel after dequeue.
    V2 = 2,
}

impl ApiVersion {
    pub const fn as_u32(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for ApiVersion {
    type Error = u32;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ApiVersion::V1),
            2 => Ok(ApiVersion::V2),
            other => Err(other),
        }
    }
}

use crate::{
    request::{ApiVersion, SlotIndex},
    ARG_COUNT_MAX, ARG_LENGTH_MAX, CHANNEL_NAME_MAX, NAME_LENGTH_MAX,
};

/// Inline text buffer with a capacity fixed at compile time.
///
/// Setting a value copies it into the buffer and never allocates.
#[derive(Clone)]
pub struct FixedText<const CAP: usize> {
    bytes: [u8; CAP],
    len: usize,
}

impl<const CAP: usize> FixedText<CAP> {
    pub const fn new() -> Self {
        Self {
            bytes: [0; CAP],
            len: 0,
        }
    }

    /// Replaces the content. Text longer than `CAP` bytes is refused and the content is left
    /// untouched.
    pub fn set(&mut self, text: &str) -> bool {
        let src = text.as_bytes();
        if src.len() > CAP {
            return false;
        }
        self.bytes[..src.len()].copy_from_slice(src);
        self.len = src.len();
        true
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    pub fn as_str(&self) -> &str {
        // Always valid: the bytes were copied from a `&str`.
        std::str::from_utf8(&self.bytes[..self.len]).unwrap_or_default()
    }

    pub const fn capacity(&self) -> usize {
        CAP
    }
}

impl<const CAP: usize> Default for FixedText<CAP> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const CAP: usize> std::fmt::Debug for FixedText<CAP> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self.as_str(), f)
    }
}

/// One pending request.
///
/// The version is stored raw so that a request with an unknown version can still travel to the
/// consumer, which logs and discards it.
#[derive(Clone, Debug)]
pub struct RequestSlot {
    version: u32,
    name: FixedText<NAME_LENGTH_MAX>,
    args: [FixedText<ARG_LENGTH_MAX>; ARG_COUNT_MAX],
    channel: FixedText<CHANNEL_NAME_MAX>,
    pub(super) next: Option<SlotIndex>,
}

impl RequestSlot {
    pub const fn new() -> Self {
        Self {
            version: ApiVersion::V1.as_u32(),
            name: FixedText::new(),
            args: [FixedText::new(), FixedText::new(), FixedText::new()],
            channel: FixedText::new(),
            next: None,
        }
    }

    /// Fills the slot. The caller has validated every length beforehand, so a `false` return
    /// means nothing was changed.
    pub fn populate(
        &mut self,
        version: u32,
        name: &str,
        args: &[&str; ARG_COUNT_MAX],
        channel: &str,
    ) -> bool {
        if name.len() > NAME_LENGTH_MAX
            || args.iter().any(|arg| arg.len() > ARG_LENGTH_MAX)
            || channel.len() > CHANNEL_NAME_MAX
        {
            return false;
        }
        self.version = version;
        self.name.set(name);
        for (dst, src) in self.args.iter_mut().zip(args) {
            dst.set(src);
        }
        self.channel.set(channel);
        true
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Argument `i`, empty when out of range.
    pub fn arg(&self, i: usize) -> &str {
        self.args.get(i).map(FixedText::as_str).unwrap_or_default()
    }

    pub fn channel(&self) -> &str {
        self.channel.as_str()
    }
}

impl Default for RequestSlot {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_text_bounds() {
        let mut text = FixedText::<4>::new();
        assert!(text.set("abcd"));
        assert_eq!(text.as_str(), "abcd");
        assert!(!text.set("abcde"));
        assert_eq!(text.as_str(), "abcd");
        assert!(text.set(""));
        assert_eq!(text.as_str(), "");
        assert_eq!(text.capacity(), 4);
    }

    #[test]
    fn test_fixed_text_multibyte() {
        let mut text = FixedText::<4>::new();
        // 2 characters, 4 bytes
        assert!(text.set("éé"));
        assert_eq!(text.as_str(), "éé");
        // 3 characters, 6 bytes
        assert!(!text.set("ééé"));
    }

    #[test]
    fn test_populate() {
        let mut slot = RequestSlot::new();
        assert!(slot.populate(2, "jcmd", &["a", "", "c"], r"\\.\pipe\x"));
        assert_eq!(slot.version(), 2);
        assert_eq!(slot.name(), "jcmd");
        assert_eq!(slot.arg(0), "a");
        assert_eq!(slot.arg(1), "");
        assert_eq!(slot.arg(2), "c");
        assert_eq!(slot.arg(3), "");
        assert_eq!(slot.channel(), r"\\.\pipe\x");

        let long_name = "n".repeat(NAME_LENGTH_MAX + 1);
        assert!(!slot.populate(1, &long_name, &["", "", ""], "p"));
        assert_eq!(slot.name(), "jcmd");
        assert_eq!(slot.version(), 2);
    }
}

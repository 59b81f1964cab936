/// One chip channel the allocator can hand out.
///
/// A slot is never destroyed, only reset: `note == None` marks it free.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Voice {
    note: Option<u8>,
    channel: u8,
}

impl Voice {
    pub const fn new() -> Self {
        Self {
            note: None,
            channel: 0,
        }
    }

    pub fn start(&mut self, note: u8, channel: u8) {
        self.note = Some(note);
        self.channel = channel;
    }

    pub fn free(&mut self) {
        self.note = None;
        self.channel = 0;
    }

    pub fn is_free(&self) -> bool {
        self.note.is_none()
    }

    /// True when this slot is sounding `note` for MIDI `channel`.
    pub fn plays(&self, note: u8, channel: u8) -> bool {
        self.note == Some(note) && self.channel == channel
    }

    pub fn note(&self) -> Option<u8> {
        self.note
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_voice_is_free() {
        let v = Voice::new();
        assert!(v.is_free());
        assert_eq!(v.note(), None);
    }

    #[test]
    fn test_start_and_free() {
        let mut v = Voice::new();
        v.start(60, 3);
        assert!(!v.is_free());
        assert!(v.plays(60, 3));
        assert!(!v.plays(60, 4));

        v.free();
        assert!(v.is_free());
        assert!(!v.plays(60, 3));
    }
}

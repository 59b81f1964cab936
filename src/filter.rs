//! Host-facing capability surface.
//!
//! A host drives a sound engine through this trait without knowing anything
//! else about it: lifecycle, note events and a flat integer parameter space.
//! Every method has a pass-through default, so an implementor only overrides
//! what it actually handles and unknown parameter ids fall through untouched.

/// Parameter id within a [`Filter`]'s id space.
pub type ParamId = u16;

pub trait Filter {
    /// Whether `id` names a parameter this filter understands.
    fn is_available(&self, _id: ParamId) -> bool {
        false
    }

    fn get_param(&self, _id: ParamId) -> i32 {
        0
    }

    /// Returns `false` if `id` is unknown, read-only, or `value` is out of
    /// range. Nothing changes on failure.
    fn set_param(&mut self, _id: ParamId, _value: i32) -> bool {
        false
    }

    /// One-time setup. Must run once before the first [`update`](Self::update).
    fn begin(&mut self) -> bool {
        true
    }

    /// Periodic host tick.
    fn update(&mut self) {}

    fn note_on(&mut self, _note: u8, _velocity: u8, _channel: u8) -> bool {
        false
    }

    fn note_off(&mut self, _note: u8, _velocity: u8, _channel: u8) -> bool {
        false
    }
}

impl<T: Filter + ?Sized> Filter for Box<T> {
    fn is_available(&self, id: ParamId) -> bool {
        (**self).is_available(id)
    }

    fn get_param(&self, id: ParamId) -> i32 {
        (**self).get_param(id)
    }

    fn set_param(&mut self, id: ParamId, value: i32) -> bool {
        (**self).set_param(id, value)
    }

    fn begin(&mut self) -> bool {
        (**self).begin()
    }

    fn update(&mut self) {
        (**self).update()
    }

    fn note_on(&mut self, note: u8, velocity: u8, channel: u8) -> bool {
        (**self).note_on(note, velocity, channel)
    }

    fn note_off(&mut self, note: u8, velocity: u8, channel: u8) -> bool {
        (**self).note_off(note, velocity, channel)
    }
}

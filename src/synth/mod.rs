// Purpose: turn note events into chip register writes
// This layer owns voice bookkeeping and knows nothing about threads or audio

pub mod allocator;
pub mod message;
pub mod percussion;
pub mod register;
pub mod voice;

pub use allocator::VoiceAllocator;
pub use percussion::Percussion;
pub use register::{CommandSink, RegisterCommand};

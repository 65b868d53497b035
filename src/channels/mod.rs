//! Channel abstraction for the messaging platform.

pub mod channel;
pub mod telegram;

pub use channel::*;
pub use telegram::TelegramChannel;

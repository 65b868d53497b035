//! PuzzleGold relay — forwards price posts between Telegram channels.

pub mod channels;
pub mod config;
pub mod error;
pub mod health;
pub mod pipeline;
pub mod relay;

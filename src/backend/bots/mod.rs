//! Bot Directory Module
//!
//! Listing bots of a space and the owner's controls over them.

pub mod handlers;

pub use handlers::{assign_manager, get_bot, list_bots, mute_bot, remove_bot, remove_manager, unmute_bot};

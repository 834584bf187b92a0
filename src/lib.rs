pub mod commands;
pub mod config;
pub mod data;
pub mod handlers;
pub mod janitor;
pub mod logging;
pub mod policy;

// Customize these constants for your bot
pub const BOT_NAME: &str = "role_warden";
pub const COMMAND_TARGET: &str = "role_warden::command";
pub const ERROR_TARGET: &str = "role_warden::error";
pub const EVENT_TARGET: &str = "role_warden::handlers";
pub const MODERATION_TARGET: &str = "role_warden::moderation";
pub const CONSOLE_TARGET: &str = "role_warden";

pub use config::Config;
pub use data::{Data, DataInner};
pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

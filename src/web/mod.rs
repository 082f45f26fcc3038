//! Web server for the osu! OAuth leg of verification
//!
//! Runs alongside the Discord bot; the link sent on "Verify" points here.

mod oauth;
mod server;

pub use oauth::OsuOAuthState;
pub use server::{start_web_server, WebServerConfig};

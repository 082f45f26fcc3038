pub mod interaction;
pub mod ready;

pub use interaction::handle_interaction;
pub use ready::ensure_verification_prompt;

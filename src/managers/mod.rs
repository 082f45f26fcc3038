pub mod onion_manager;
pub mod role_manager;
pub mod verification_manager;

#[cfg(test)]
pub(crate) mod test_support;

pub use onion_manager::{create_shared_onion_manager, SharedOnionManager};
pub use role_manager::{create_shared_role_manager, SharedRoleManager};
pub use verification_manager::{create_shared_verification_manager, SharedVerificationManager};

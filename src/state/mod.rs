pub mod verification_store;

pub use verification_store::{
    create_shared_verification_store, SharedVerificationStore, VerificationRequest,
};

//! Identity verifiers for different credential kinds

pub mod jwt;
pub mod mock;

pub use jwt::{JwtVerifier, JwtVerifierConfig};
pub use mock::MockVerifier;

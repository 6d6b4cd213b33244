/// Federated sign-in through an external identity provider
///
/// The provider validates its own access tokens and returns a profile;
/// the bridge maps that profile onto a local account.

pub mod bridge;
pub mod provider;

pub use bridge::FederationBridge;
pub use provider::{ExternalProfile, GraphIdentityProvider, IdentityProvider};

/// Provider tag stored on linked accounts
pub const AZURE_PROVIDER: &str = "azure_ad";

// ============================================================================
// Delivery Minter
// ============================================================================
//
// Origin side of the capability delivery protocol. Given an object, the
// caller's identity and IP, and a validity window, produce a signed URL that
// the edge gateway can verify without a database.
//
// Shares only the secret and the wire format with the gateway, never code.
//
// ============================================================================

pub mod canonical;
pub mod disposition;
mod error;
mod minter;
pub mod object_key;

pub use disposition::Disposition;
pub use error::MintError;
pub use minter::{CapabilityUrl, GrantKind, MintRequest, Minter};
pub use object_key::{parse_user_file_key, ObjectKey, UserFileKey};

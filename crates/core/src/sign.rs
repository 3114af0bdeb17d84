//! Signing collaborator contract.
//!
//! The document layer prepares the byte ranges; a `Signer` only turns the
//! signed bytes into a detached CMS blob.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SignError {
    #[error("no signing backend available")]
    Unavailable,

    #[error("credential rejected: {0}")]
    Credential(String),

    #[error("signing tool failed: {0}")]
    Tool(String),

    #[error("signature needs {needed} bytes but only {reserved} are reserved")]
    Capacity { needed: usize, reserved: usize },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Certificate file (PKCS#12) plus its password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub cert: PathBuf,
    pub password: String,
}

pub trait Signer {
    /// Returns a DER encoded detached signature over `content`.
    fn sign(&self, content: &[u8]) -> Result<Vec<u8>, SignError>;
}

/// Builds a signer for a credential; the credential may come from the
/// command line or from an add-signature request.
pub trait SignerProvider {
    fn signer_for(&self, credential: &Credential) -> Result<Box<dyn Signer>, SignError>;

    /// Bytes reserved in `/Contents` for the signature.
    fn reserve(&self) -> usize {
        8192
    }
}

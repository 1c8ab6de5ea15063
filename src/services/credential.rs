use crate::error::{Result, SentinelError};
use alloy::signers::local::PrivateKeySigner;
use std::{fmt, str::FromStr};

/// Source of the privileged identity used for freeze transactions.
pub trait SigningCredential: Send + Sync {
    /// Produces a fresh signer; callers drop it once their transaction is sent.
    fn signer(&self) -> Result<PrivateKeySigner>;
}

/// Hex private key read from configuration. Never printed.
#[derive(Clone)]
pub struct SecretKey(String);

impl SecretKey {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(***)")
    }
}

impl SigningCredential for SecretKey {
    fn signer(&self) -> Result<PrivateKeySigner> {
        PrivateKeySigner::from_str(self.0.trim())
            .map_err(|e| SentinelError::ChainWrite(format!("Invalid signing key: {}", e)))
    }
}

//! Salted, one-way password hashing.

use tokio::task;

/// Errors raised while hashing or verifying.
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    /// A mapping to `bcrypt::BcryptError`.
    #[error(transparent)]
    Bcrypt(#[from] bcrypt::BcryptError),

    /// The blocking task running the hash was cancelled or panicked.
    #[error(transparent)]
    TaskJoin(#[from] task::JoinError),
}

/// A bcrypt password hasher with a fixed work factor.
///
/// Hashing and verification are CPU bound, so both are moved onto the blocking
/// thread pool.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    /// Lowest work factor bcrypt accepts.
    pub const MIN_COST: u32 = 4;

    /// Highest work factor bcrypt accepts.
    pub const MAX_COST: u32 = 31;

    /// Work factor used unless configured otherwise.
    pub const DEFAULT_COST: u32 = 10;

    /// Creates a hasher using the given work factor.
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// The configured work factor.
    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hashes the password with a fresh salt.
    pub async fn hash(&self, password: String) -> Result<String, HashError> {
        let cost = self.cost;
        let hashed = task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
        Ok(hashed)
    }

    /// Returns `true` when the password matches the stored hash.
    ///
    /// A stored hash bcrypt cannot parse never matches.
    pub async fn verify(&self, password: String, password_hash: String) -> Result<bool, HashError> {
        let verified = task::spawn_blocking(move || bcrypt::verify(password, &password_hash)).await?;

        match verified {
            Ok(verified) => Ok(verified),
            Err(err) => {
                tracing::warn!(err = %err, "stored password hash could not be parsed");
                Ok(false)
            }
        }
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(Self::DEFAULT_COST)
    }
}

//! A MongoDB implementation of `CredentialStore`.

use async_trait::async_trait;
use mongodb::{
    bson::{doc, oid::ObjectId},
    error::{ErrorKind, WriteError, WriteFailure},
    options::IndexOptions,
    Client, Collection, IndexModel,
};

use super::{CredentialStore, Error, Result};
use crate::users::User;

const DUPLICATE_KEY: i32 = 11000;

/// MongoDB store implementation.
///
/// Users are kept one document per user, `{ _id, username, password }`, where
/// `password` holds the hash.
#[derive(Clone, Debug)]
pub struct MongoStore {
    collection: Collection<User>,
}

impl MongoStore {
    /// Collection the users are stored in.
    pub const COLLECTION: &'static str = "users";

    /// Database used when neither the caller nor the URI name one.
    pub const DEFAULT_DATABASE: &'static str = "local_auth";

    /// Creates a new store with the provided collection.
    pub fn new(collection: Collection<User>) -> Self {
        Self { collection }
    }

    /// Connects to the deployment at `uri` and opens the users collection.
    ///
    /// The database is `database` if given, else the one named in the URI,
    /// else [`MongoStore::DEFAULT_DATABASE`].
    pub async fn connect(uri: &str, database: Option<&str>) -> Result<Self> {
        let client = Client::with_uri_str(uri).await?;

        let db = match database {
            Some(name) => client.database(name),
            None => client
                .default_database()
                .unwrap_or_else(|| client.database(Self::DEFAULT_DATABASE)),
        };

        Ok(Self::new(db.collection(Self::COLLECTION)))
    }

    /// Creates the unique index on `username`.
    ///
    /// Signup relies on it to reject duplicate usernames. The call is a no-op
    /// when the index exists already.
    pub async fn migrate(&self) -> Result {
        let index = IndexModel::builder()
            .keys(doc! { "username": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        self.collection.create_index(index).await?;

        Ok(())
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(WriteError {
            code: DUPLICATE_KEY,
            ..
        }))
    )
}

#[async_trait]
impl CredentialStore for MongoStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = self
            .collection
            .find_one(doc! { "username": username })
            .await?;

        Ok(user)
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<User>> {
        let user = self.collection.find_one(doc! { "_id": *id }).await?;

        Ok(user)
    }

    async fn insert(&self, username: &str, password_hash: &str) -> Result<User> {
        let user = User::new(ObjectId::new(), username, password_hash);

        match self.collection.insert_one(&user).await {
            Ok(_) => Ok(user),
            Err(err) if is_duplicate_key(&err) => Err(Error::DuplicateUsername),
            Err(err) => Err(err.into()),
        }
    }
}

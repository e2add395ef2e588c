//! # Persistent Storage Layer
//!
//! Sled-backed key-value storage for users and organizations. Each record is
//! a JSON value under its natural key; every document lives inside its
//! organization's record.
//!
//! ## Storage Structure
//!
//! | Tree | Key | Value |
//! |------|-----|-------|
//! | `users` | login | serialized `User` |
//! | `organizations` | org id | serialized `Organization` |
//!
//! ## Atomicity
//!
//! Inserts use compare-and-swap against an absent key, so a duplicate key is
//! reported as a conflict instead of overwriting. Updates to an organization
//! run as a Sled transaction over its single record: the read, the change
//! and the write commit together or not at all, and Sled retries the closure
//! when another writer got there first.
//!
//! ## References
//!
//! - Sled documentation: <https://sled.rs/>

use crate::models::{Organization, Result, StoreError, UpdateResult, User};
use sled::transaction::{ConflictableTransactionError, TransactionError};
use std::path::Path;
use tracing::debug;

/// Tree name for user accounts.
const USER_TREE: &str = "users";

/// Tree name for organizations.
const ORG_TREE: &str = "organizations";

/// Handle to the embedded database.
///
/// Cheap to clone; clones share the same database. Safe to use from several
/// threads at once.
///
/// # Example
///
/// ```rust
/// use xdb_store::{Organization, Storage};
///
/// let storage = Storage::temporary().unwrap();
/// let org = Organization::new("Acme").unwrap();
/// storage.insert_organization(&org).unwrap();
///
/// let loaded = storage.load_organization(org.org_id()).unwrap().unwrap();
/// assert_eq!(loaded.org_name(), "Acme");
/// ```
#[derive(Clone)]
pub struct Storage {
    db: sled::Db,
    users: sled::Tree,
    organizations: sled::Tree,
}

impl Storage {
    /// Opens or creates a database at the given path.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` if the path cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Creates an in-memory database, discarded when the last handle drops.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> Result<Self> {
        let users = db.open_tree(USER_TREE)?;
        let organizations = db.open_tree(ORG_TREE)?;
        Ok(Storage {
            db,
            users,
            organizations,
        })
    }

    /// Inserts a user. Returns false if the login is taken.
    pub fn insert_user(&self, user: &User) -> Result<bool> {
        let bytes = serde_json::to_vec(user)?;
        let swapped = self
            .users
            .compare_and_swap(user.login().as_bytes(), None as Option<&[u8]>, Some(bytes))?;
        Ok(swapped.is_ok())
    }

    pub fn load_user(&self, login: &str) -> Result<Option<User>> {
        match self.users.get(login.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Removes a user. Returns false if it did not exist.
    pub fn remove_user(&self, login: &str) -> Result<bool> {
        Ok(self.users.remove(login.as_bytes())?.is_some())
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Inserts a new organization.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if an organization with the same id
    /// already exists.
    pub fn insert_organization(&self, org: &Organization) -> Result<()> {
        let bytes = serde_json::to_vec(org)?;
        let swapped = self.organizations.compare_and_swap(
            org.org_id().as_bytes(),
            None as Option<&[u8]>,
            Some(bytes),
        )?;
        swapped.map_err(|_| {
            StoreError::Conflict(format!("organization `{}` already exists", org.org_id()))
        })
    }

    pub fn load_organization(&self, org_id: &str) -> Result<Option<Organization>> {
        match self.organizations.get(org_id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Lists every organization id in key order.
    pub fn organization_ids(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        for entry in self.organizations.iter() {
            let (key, _) = entry?;
            let id = String::from_utf8(key.to_vec())
                .map_err(|_| StoreError::Corrupted("organization key is not UTF-8".to_string()))?;
            ids.push(id);
        }
        Ok(ids)
    }

    /// Atomically applies `change` to one organization.
    ///
    /// `change` returns `Some(value)` when it modified the organization, in
    /// which case the record is written back, or `None` to leave it as is.
    /// It may run more than once if the transaction is retried, so it must
    /// not have side effects outside the organization it is given.
    ///
    /// # Errors
    ///
    /// Errors returned by `change` abort the transaction and are passed
    /// through unchanged.
    pub fn update_organization<A, F>(&self, org_id: &str, change: F) -> Result<UpdateResult<A>>
    where
        F: Fn(&mut Organization) -> Result<Option<A>>,
    {
        let key = org_id.as_bytes();
        let outcome = self.organizations.transaction(|tx| {
            let bytes = match tx.get(key)? {
                Some(bytes) => bytes,
                None => return Ok(UpdateResult::unmatched()),
            };
            let mut org: Organization = serde_json::from_slice(&bytes)
                .map_err(|e| ConflictableTransactionError::Abort(StoreError::from(e)))?;

            match change(&mut org).map_err(ConflictableTransactionError::Abort)? {
                Some(value) => {
                    let updated = serde_json::to_vec(&org)
                        .map_err(|e| ConflictableTransactionError::Abort(StoreError::from(e)))?;
                    tx.insert(key, updated)?;
                    Ok(UpdateResult::modified(value))
                }
                None => Ok(UpdateResult::unmodified()),
            }
        });

        let result = outcome.map_err(|e| match e {
            TransactionError::Abort(e) => e,
            TransactionError::Storage(e) => StoreError::Database(e),
        })?;
        debug!(
            "update of organization {}: matched {}, modified {}",
            org_id, result.matched_count, result.modified_count
        );
        Ok(result)
    }

    /// Flushes pending writes to disk, returning the bytes written.
    pub fn flush(&self) -> Result<usize> {
        Ok(self.db.flush()?)
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("users", &self.users.len())
            .field("organizations", &self.organizations.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Document;

    #[test]
    fn test_user_insert_is_unique() {
        let storage = Storage::temporary().unwrap();
        let user = User::new("alice", "pw").unwrap();

        assert!(storage.insert_user(&user).unwrap());
        assert!(!storage.insert_user(&user).unwrap());
        assert_eq!(storage.user_count(), 1);
        assert_eq!(storage.load_user("alice").unwrap(), Some(user));
    }

    #[test]
    fn test_remove_user() {
        let storage = Storage::temporary().unwrap();
        storage.insert_user(&User::new("alice", "pw").unwrap()).unwrap();

        assert!(storage.remove_user("alice").unwrap());
        assert!(!storage.remove_user("alice").unwrap());
        assert!(storage.load_user("alice").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_organization_conflicts() {
        let storage = Storage::temporary().unwrap();
        let org = Organization::new("Acme").unwrap();

        storage.insert_organization(&org).unwrap();
        let err = storage.insert_organization(&org).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(storage.organization_ids().unwrap(), vec![org.org_id().to_string()]);
    }

    #[test]
    fn test_update_missing_organization() {
        let storage = Storage::temporary().unwrap();
        let result = storage
            .update_organization("missing", |_| Ok(Some(())))
            .unwrap();
        assert_eq!(result.matched_count, 0);
        assert_eq!(result.modified_count, 0);
    }

    #[test]
    fn test_update_without_change_is_not_written() {
        let storage = Storage::temporary().unwrap();
        let org = Organization::new("Acme").unwrap();
        storage.insert_organization(&org).unwrap();

        let result = storage
            .update_organization(org.org_id(), |_| Ok(None::<()>))
            .unwrap();
        assert_eq!(result.matched_count, 1);
        assert_eq!(result.modified_count, 0);
    }

    #[test]
    fn test_update_appends_document() {
        let storage = Storage::temporary().unwrap();
        let org = Organization::new("Acme").unwrap();
        storage.insert_organization(&org).unwrap();
        let doc = Document::from_raw("<a/>", None).unwrap();

        let result = storage
            .update_organization(org.org_id(), |org| org.append_doc(&doc).map(Some))
            .unwrap();
        assert_eq!(result.value, Some(1));

        let loaded = storage.load_organization(org.org_id()).unwrap().unwrap();
        assert_eq!(loaded.doc_count(), 1);
        assert_eq!(loaded.docs().len(), 1);
    }

    #[test]
    fn test_failed_update_leaves_record() {
        let storage = Storage::temporary().unwrap();
        let org = Organization::new("Acme").unwrap();
        storage.insert_organization(&org).unwrap();
        let root = User::root("qwerty").unwrap();

        let err = storage
            .update_organization(org.org_id(), |org| org.add_user(&root).map(Some))
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));

        let loaded = storage.load_organization(org.org_id()).unwrap().unwrap();
        assert_eq!(loaded.users(), ["root".to_string()]);
    }

    #[test]
    fn test_reopen_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xdb.db");
        let org = Organization::new("Acme").unwrap();
        {
            let storage = Storage::open(&path).unwrap();
            storage.insert_organization(&org).unwrap();
            storage.flush().unwrap();
        }
        let storage = Storage::open(&path).unwrap();
        assert!(storage.load_organization(org.org_id()).unwrap().is_some());
    }
}

//! # Repository Access
//!
//! The operations the document service performs against the store. Every
//! write is a single atomic update of one organization record; reads go
//! straight to storage with no cache in between.
//!
//! ## Access Rules
//!
//! | Operation | Membership required |
//! |-----------|---------------------|
//! | `doc_create_one` | yes, checked again inside the write |
//! | `doc_find_one` | yes |
//! | `doc_remove_one` | no |
//! | `doc_create_many` | no |
//!
//! Callers that need a gate on removal apply it themselves.

use crate::models::{
    reject_reserved, Document, Organization, OrganizationSummary, Outcome, Payload, Result,
    StoreError, User, ROOT_LOGIN,
};
use crate::storage::Storage;
use std::cell::Cell;
use tracing::{debug, info, warn};

/// Operations over a borrowed [`Storage`].
///
/// # Example
///
/// ```rust
/// use xdb_store::{Outcome, Repository, Storage, User};
///
/// let storage = Storage::temporary().unwrap();
/// let repo = Repository::new(&storage);
/// let root = User::root("qwerty").unwrap();
/// repo.init_users_storage(&root).unwrap();
///
/// let org = repo.org_create_one("Acme").unwrap();
/// let created = repo
///     .doc_create_one(&root, org.org_id(), r#"<person name="Ann">42</person>"#, None)
///     .unwrap();
/// assert_eq!(created, Outcome::Done(1));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Repository<'s> {
    storage: &'s Storage,
}

impl<'s> Repository<'s> {
    pub fn new(storage: &'s Storage) -> Self {
        Repository { storage }
    }

    pub fn storage(&self) -> &'s Storage {
        self.storage
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Seeds the user store with `root` when it is empty.
    ///
    /// Returns true if the account was inserted.
    pub fn init_users_storage(&self, root: &User) -> Result<bool> {
        if self.storage.user_count() > 0 {
            return Ok(false);
        }
        let inserted = self.storage.insert_user(root)?;
        if inserted {
            info!("user store initialized with {}", root.login());
        }
        Ok(inserted)
    }

    /// Adds a user. Returns false if the login is taken.
    pub fn user_add(&self, user: &User) -> Result<bool> {
        let inserted = self.storage.insert_user(user)?;
        if inserted {
            info!("user {} added", user.login());
        }
        Ok(inserted)
    }

    /// Removes a user. Returns false if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` for the `root` account.
    pub fn user_remove(&self, login: &str) -> Result<bool> {
        let login = login.to_lowercase();
        if login == ROOT_LOGIN {
            return Err(StoreError::Validation(format!(
                "login `{}` cannot be removed",
                ROOT_LOGIN
            )));
        }
        self.storage.remove_user(&login)
    }

    pub fn check_user_exists(&self, login: &str) -> Result<bool> {
        Ok(self.storage.load_user(&login.to_lowercase())?.is_some())
    }

    /// Returns the stored account when both login and password hash match.
    pub fn check_user_password(&self, user: &User) -> Result<Option<User>> {
        Ok(self
            .storage
            .load_user(user.login())?
            .filter(|stored| stored == user))
    }

    // =========================================================================
    // Organizations
    // =========================================================================

    /// Creates and stores one organization.
    pub fn org_create_one(&self, org_name: &str) -> Result<Organization> {
        let org = Organization::new(org_name)?;
        self.storage.insert_organization(&org)?;
        info!("organization {} ({}) created", org.org_id(), org.org_name());
        Ok(org)
    }

    /// Creates several organizations.
    ///
    /// Every name is validated before anything is stored.
    pub fn org_create_many(&self, org_names: &[&str]) -> Result<Vec<Organization>> {
        let orgs = org_names
            .iter()
            .map(|name| Organization::new(name))
            .collect::<Result<Vec<_>>>()?;
        for org in &orgs {
            self.storage.insert_organization(org)?;
        }
        info!("{} organizations created", orgs.len());
        Ok(orgs)
    }

    /// Adds a member to an organization.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` for the reserved `root` login,
    /// without touching the store.
    pub fn org_add_user(&self, org_id: &str, user: &User) -> Result<Outcome<()>> {
        reject_reserved(user)?;
        let result = self
            .storage
            .update_organization(org_id, |org| Ok(org.add_user(user)?.then_some(())))?;
        Ok(result.into_outcome())
    }

    /// Removes a member from an organization.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` for the reserved `root` login,
    /// without touching the store.
    pub fn org_remove_user(&self, org_id: &str, user: &User) -> Result<Outcome<()>> {
        reject_reserved(user)?;
        let result = self
            .storage
            .update_organization(org_id, |org| Ok(org.remove_user(user)?.then_some(())))?;
        Ok(result.into_outcome())
    }

    /// Returns true if `login` is a member. Unknown organizations have no members.
    pub fn org_check_user(&self, org_id: &str, login: &str) -> Result<bool> {
        Ok(self
            .storage
            .load_organization(org_id)?
            .map(|org| org.has_user(login))
            .unwrap_or(false))
    }

    pub fn org_get_info(&self, org_id: &str) -> Result<Option<OrganizationSummary>> {
        Ok(self
            .storage
            .load_organization(org_id)?
            .map(|org| org.summary()))
    }

    // =========================================================================
    // Documents
    // =========================================================================

    /// Converts raw input to a document and appends it under the next id.
    ///
    /// Membership is checked before parsing and again inside the write. The id is
    /// taken from the organization's counter inside the same atomic update
    /// that appends the document.
    ///
    /// # Returns
    ///
    /// - `Outcome::Done(doc_id)` when stored
    /// - `Outcome::PermissionDenied` when `user` is not a member
    /// - `Outcome::NotFound` when the organization disappeared meanwhile
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Codec` when the input does not parse; nothing is
    /// written in that case.
    pub fn doc_create_one(
        &self,
        user: &User,
        org_id: &str,
        raw: impl Into<Payload>,
        charset: Option<&str>,
    ) -> Result<Outcome<u64>> {
        if !self.org_check_user(org_id, user.login())? {
            debug!("{} is not a member of {}", user.login(), org_id);
            return Ok(Outcome::PermissionDenied);
        }

        let doc = Document::from_raw(raw, charset)?;
        self.append_as_member(user, org_id, &doc)
    }

    /// Appends `doc` in one atomic update that also re-checks membership.
    fn append_as_member(&self, user: &User, org_id: &str, doc: &Document) -> Result<Outcome<u64>> {
        let member = Cell::new(true);
        let result = self.storage.update_organization(org_id, |org| {
            member.set(org.has_user(user.login()));
            if member.get() {
                org.append_doc(doc).map(Some)
            } else {
                Ok(None)
            }
        })?;

        let outcome = match result.into_outcome() {
            Outcome::Unmodified if !member.get() => {
                debug!("{} left {} before the write", user.login(), org_id);
                Outcome::PermissionDenied
            }
            outcome => outcome,
        };
        if let Outcome::Done(doc_id) = outcome {
            info!("document {} created in {} by {}", doc_id, org_id, user.login());
        }
        Ok(outcome)
    }

    /// Appends several documents, one atomic update each.
    ///
    /// Ids are contiguous when nothing else writes to the organization at the
    /// same time. A failure part way leaves the earlier documents in place.
    /// When `charset` is given it replaces each document's encoding label.
    ///
    /// # Returns
    ///
    /// `Outcome::Done((first_id, last_id))` only if every document was stored.
    pub fn doc_create_many(
        &self,
        org_id: &str,
        mut docs: Vec<Document>,
        charset: Option<&str>,
    ) -> Result<Outcome<(u64, u64)>> {
        if docs.iter().any(|doc| doc.data().is_none()) {
            return Err(StoreError::MissingData);
        }
        if let Some(label) = charset {
            for doc in &mut docs {
                doc.set_encoding(label)?;
            }
        }

        let mut first = None;
        let mut last = 0;
        let mut stored = 0;
        for doc in &docs {
            let result = self
                .storage
                .update_organization(org_id, |org| org.append_doc(doc).map(Some))?;
            if result.matched_count == 0 {
                break;
            }
            if let Some(doc_id) = result.value {
                first.get_or_insert(doc_id);
                last = doc_id;
                stored += 1;
            }
        }

        match first {
            Some(first) if stored == docs.len() => {
                info!("documents {}..={} created in {}", first, last, org_id);
                Ok(Outcome::Done((first, last)))
            }
            None if stored == 0 && !docs.is_empty() => Ok(Outcome::NotFound),
            _ => {
                if stored > 0 {
                    warn!("only {} of {} documents stored in {}", stored, docs.len(), org_id);
                }
                Ok(Outcome::Unmodified)
            }
        }
    }

    /// Fetches one document for a member of its organization.
    pub fn doc_find_one(&self, user: &User, org_id: &str, doc_id: u64) -> Result<Outcome<Document>> {
        let org = match self.storage.load_organization(org_id)? {
            Some(org) if org.has_user(user.login()) => org,
            _ => {
                debug!("{} is not a member of {}", user.login(), org_id);
                return Ok(Outcome::PermissionDenied);
            }
        };
        Ok(match org.find_doc(doc_id) {
            Some(record) => Outcome::Done(Document::from_record(record.clone())),
            None => Outcome::NotFound,
        })
    }

    /// Removes one document. The id is not reused.
    ///
    /// # Returns
    ///
    /// `Outcome::Done(doc_id)` when a document was removed, `Outcome::NotFound`
    /// when the organization or the document does not exist.
    pub fn doc_remove_one(&self, org_id: &str, doc_id: u64) -> Result<Outcome<u64>> {
        let result = self
            .storage
            .update_organization(org_id, |org| Ok(org.remove_doc(doc_id).then_some(doc_id)))?;
        Ok(match result.into_outcome() {
            Outcome::Done(doc_id) => {
                info!("document {} removed from {}", doc_id, org_id);
                Outcome::Done(doc_id)
            }
            _ => Outcome::NotFound,
        })
    }
}

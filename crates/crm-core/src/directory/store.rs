//! Directory storage traits.
//!
//! Reads go through a [`DirectoryReader`]; every write happens inside a
//! [`DirectoryTransaction`] so that a mutation and its immediate verification
//! read observe one consistent snapshot. Dropping a transaction without
//! calling `commit` discards its writes.

use super::model::{EntityId, Group, Label, User};
use crate::error::Result;
use async_trait::async_trait;

/// Read access to one workspace's directory.
#[async_trait]
pub trait DirectoryReader: Send + Sync {
    async fn users(&self) -> Result<Vec<User>>;

    async fn labels(&self) -> Result<Vec<Label>>;

    async fn groups(&self) -> Result<Vec<Group>>;

    async fn user(&self, id: EntityId) -> Result<Option<User>> {
        Ok(self.users().await?.into_iter().find(|u| u.id == id))
    }

    async fn label(&self, id: EntityId) -> Result<Option<Label>> {
        Ok(self.labels().await?.into_iter().find(|l| l.id == id))
    }

    async fn group(&self, id: EntityId) -> Result<Option<Group>> {
        Ok(self.groups().await?.into_iter().find(|g| g.id == id))
    }
}

/// A unit of work over one workspace's directory.
#[async_trait]
pub trait DirectoryTransaction: DirectoryReader {
    /// Inserts (id `0`) or replaces a user, returning the stored row.
    async fn save_user(&mut self, user: User) -> Result<User>;

    async fn delete_user(&mut self, id: EntityId) -> Result<()>;

    /// Inserts (id `0`) or replaces a label, returning the stored row.
    async fn save_label(&mut self, label: Label) -> Result<Label>;

    async fn delete_label(&mut self, id: EntityId) -> Result<()>;

    /// Inserts (id `0`) or replaces a group, returning the stored row.
    async fn save_group(&mut self, group: Group) -> Result<Group>;

    async fn delete_group(&mut self, id: EntityId) -> Result<()>;

    /// Publishes the writes made in this transaction.
    async fn commit(self: Box<Self>) -> Result<()>;
}

/// Entry point to the directory of every workspace.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// Opens a reader on the current committed state.
    async fn reader(&self, workspace_id: &str) -> Result<Box<dyn DirectoryReader>>;

    /// Starts a transaction; transactions on one workspace are serialized.
    async fn begin(&self, workspace_id: &str) -> Result<Box<dyn DirectoryTransaction>>;
}

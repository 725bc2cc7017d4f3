//! In-memory workspace directory.
//!
//! Each workspace keeps one committed [`DirectorySnapshot`]. A transaction
//! works on a private copy and swaps it in on commit; writers of the same
//! workspace are serialized by an async mutex, while readers only ever see
//! committed snapshots.

use async_trait::async_trait;
use crm_core::directory::{
    DirectoryReader, DirectoryStore, DirectoryTransaction, EntityId, Group, Label, User,
};
use crm_core::error::{CrmError, Result};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// Point-in-time copy of one workspace's directory.
#[derive(Debug, Clone, Default)]
pub struct DirectorySnapshot {
    users: BTreeMap<EntityId, User>,
    labels: BTreeMap<EntityId, Label>,
    groups: BTreeMap<EntityId, Group>,
    last_id: EntityId,
}

impl DirectorySnapshot {
    fn allocate_id(&mut self) -> EntityId {
        self.last_id += 1;
        self.last_id
    }

    fn upsert_user(&mut self, mut user: User) -> Result<User> {
        if user.id == 0 {
            user.id = self.allocate_id();
        } else if !self.users.contains_key(&user.id) {
            return Err(CrmError::not_found("user", user.id.to_string()));
        }
        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    fn upsert_label(&mut self, mut label: Label) -> Result<Label> {
        if label.id == 0 {
            label.id = self.allocate_id();
        } else if !self.labels.contains_key(&label.id) {
            return Err(CrmError::not_found("label", label.id.to_string()));
        }
        self.labels.insert(label.id, label.clone());
        Ok(label)
    }

    fn upsert_group(&mut self, mut group: Group) -> Result<Group> {
        if group.id == 0 {
            group.id = self.allocate_id();
        } else if !self.groups.contains_key(&group.id) {
            return Err(CrmError::not_found("group", group.id.to_string()));
        }
        self.groups.insert(group.id, group.clone());
        Ok(group)
    }

    fn remove_user(&mut self, id: EntityId) -> Result<()> {
        self.users
            .remove(&id)
            .ok_or_else(|| CrmError::not_found("user", id.to_string()))?;
        for group in self.groups.values_mut() {
            group.member_ids.remove(&id);
        }
        Ok(())
    }

    fn remove_label(&mut self, id: EntityId) -> Result<()> {
        self.labels
            .remove(&id)
            .ok_or_else(|| CrmError::not_found("label", id.to_string()))?;
        for user in self.users.values_mut() {
            user.label_ids.remove(&id);
        }
        Ok(())
    }

    fn remove_group(&mut self, id: EntityId) -> Result<()> {
        self.groups
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| CrmError::not_found("group", id.to_string()))
    }
}

#[async_trait]
impl DirectoryReader for DirectorySnapshot {
    async fn users(&self) -> Result<Vec<User>> {
        Ok(self.users.values().cloned().collect())
    }

    async fn labels(&self) -> Result<Vec<Label>> {
        Ok(self.labels.values().cloned().collect())
    }

    async fn groups(&self) -> Result<Vec<Group>> {
        Ok(self.groups.values().cloned().collect())
    }

    async fn user(&self, id: EntityId) -> Result<Option<User>> {
        Ok(self.users.get(&id).cloned())
    }

    async fn label(&self, id: EntityId) -> Result<Option<Label>> {
        Ok(self.labels.get(&id).cloned())
    }

    async fn group(&self, id: EntityId) -> Result<Option<Group>> {
        Ok(self.groups.get(&id).cloned())
    }
}

#[derive(Default)]
struct WorkspaceDirectory {
    committed: RwLock<DirectorySnapshot>,
    writer: Arc<Mutex<()>>,
}

/// Directory store holding every workspace in memory.
#[derive(Default)]
pub struct InMemoryDirectory {
    workspaces: Mutex<HashMap<String, Arc<WorkspaceDirectory>>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    async fn workspace(&self, workspace_id: &str) -> Arc<WorkspaceDirectory> {
        let mut workspaces = self.workspaces.lock().await;
        workspaces
            .entry(workspace_id.to_string())
            .or_default()
            .clone()
    }

    /// Copy of the committed state of a workspace.
    pub async fn snapshot(&self, workspace_id: &str) -> DirectorySnapshot {
        self.workspace(workspace_id).await.committed.read().await.clone()
    }
}

#[async_trait]
impl DirectoryStore for InMemoryDirectory {
    async fn reader(&self, workspace_id: &str) -> Result<Box<dyn DirectoryReader>> {
        Ok(Box::new(self.snapshot(workspace_id).await))
    }

    async fn begin(&self, workspace_id: &str) -> Result<Box<dyn DirectoryTransaction>> {
        let workspace = self.workspace(workspace_id).await;
        let guard = workspace.writer.clone().lock_owned().await;
        let working = workspace.committed.read().await.clone();
        Ok(Box::new(InMemoryTransaction {
            workspace,
            working,
            _guard: guard,
        }))
    }
}

struct InMemoryTransaction {
    workspace: Arc<WorkspaceDirectory>,
    working: DirectorySnapshot,
    _guard: OwnedMutexGuard<()>,
}

#[async_trait]
impl DirectoryReader for InMemoryTransaction {
    async fn users(&self) -> Result<Vec<User>> {
        self.working.users().await
    }

    async fn labels(&self) -> Result<Vec<Label>> {
        self.working.labels().await
    }

    async fn groups(&self) -> Result<Vec<Group>> {
        self.working.groups().await
    }

    async fn user(&self, id: EntityId) -> Result<Option<User>> {
        self.working.user(id).await
    }

    async fn label(&self, id: EntityId) -> Result<Option<Label>> {
        self.working.label(id).await
    }

    async fn group(&self, id: EntityId) -> Result<Option<Group>> {
        self.working.group(id).await
    }
}

#[async_trait]
impl DirectoryTransaction for InMemoryTransaction {
    async fn save_user(&mut self, user: User) -> Result<User> {
        self.working.upsert_user(user)
    }

    async fn delete_user(&mut self, id: EntityId) -> Result<()> {
        self.working.remove_user(id)
    }

    async fn save_label(&mut self, label: Label) -> Result<Label> {
        self.working.upsert_label(label)
    }

    async fn delete_label(&mut self, id: EntityId) -> Result<()> {
        self.working.remove_label(id)
    }

    async fn save_group(&mut self, group: Group) -> Result<Group> {
        self.working.upsert_group(group)
    }

    async fn delete_group(&mut self, id: EntityId) -> Result<()> {
        self.working.remove_group(id)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let this = *self;
        *this.workspace.committed.write().await = this.working;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn committed_writes_become_visible() {
        let store = InMemoryDirectory::new();
        let mut tx = store.begin("ws").await.unwrap();
        let saved = tx.save_user(User::new("Ali", "0912")).await.unwrap();
        assert_eq!(saved.id, 1);
        assert!(store.reader("ws").await.unwrap().users().await.unwrap().is_empty());

        tx.commit().await.unwrap();
        let users = store.reader("ws").await.unwrap().users().await.unwrap();
        assert_eq!(users, vec![saved]);
    }

    #[tokio::test]
    async fn dropped_transaction_rolls_back() {
        let store = InMemoryDirectory::new();
        {
            let mut tx = store.begin("ws").await.unwrap();
            tx.save_label(Label::new("VIP", "#f97316")).await.unwrap();
        }
        assert!(store.reader("ws").await.unwrap().labels().await.unwrap().is_empty());

        // The writer lock was released with the dropped transaction.
        let tx = store.begin("ws").await.unwrap();
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn workspaces_are_isolated() {
        let store = InMemoryDirectory::new();
        let mut tx = store.begin("a").await.unwrap();
        tx.save_group(Group::new("Sales")).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.reader("a").await.unwrap().groups().await.unwrap().len(), 1);
        assert!(store.reader("b").await.unwrap().groups().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_a_label_detaches_it_from_users() {
        let store = InMemoryDirectory::new();
        let mut tx = store.begin("ws").await.unwrap();
        let label = tx.save_label(Label::new("VIP", "#f97316")).await.unwrap();
        let mut user = User::new("Ali", "0912");
        user.label_ids.insert(label.id);
        let user = tx.save_user(user).await.unwrap();
        tx.delete_label(label.id).await.unwrap();

        let reloaded = tx.user(user.id).await.unwrap().unwrap();
        assert!(reloaded.label_ids.is_empty());
    }

    #[tokio::test]
    async fn replacing_an_unknown_id_fails() {
        let store = InMemoryDirectory::new();
        let mut tx = store.begin("ws").await.unwrap();
        let mut ghost = User::new("Ghost", "000");
        ghost.id = 42;
        assert!(tx.save_user(ghost).await.unwrap_err().is_not_found());
    }
}

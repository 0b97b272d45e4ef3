use std::collections::HashMap;

use tokio::{task::JoinHandle, time::Instant};
use uuid::Uuid;

use crate::{clock::PlaybackClock, connection::Connection, protocol::MemberSummary};

/// One connected user inside a room
#[derive(Debug, Clone)]
pub struct Member {
    pub id: Uuid,
    pub connection: Connection,
    pub username: String,
    pub is_host: bool,
}

impl Member {
    pub fn summary(&self) -> MemberSummary {
        MemberSummary {
            id: self.id,
            username: self.username.clone(),
            is_host: self.is_host,
        }
    }
}

/// Identity of a member who left, kept so a rejoin under the same
/// username resumes it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepartedMember {
    pub id: Uuid,
    pub is_host: bool,
}

/// Deferred removal of an empty room
#[derive(Debug)]
pub struct PendingDeletion {
    pub token: Uuid,
    handle: JoinHandle<()>,
}

impl PendingDeletion {
    pub fn new(token: Uuid, handle: JoinHandle<()>) -> Self {
        Self { token, handle }
    }

    pub fn cancel(self) {
        self.handle.abort();
    }
}

/// Synchronization state of one room
#[derive(Debug)]
pub struct Room {
    pub video_id: i64,
    pub clock: PlaybackClock,
    members: HashMap<Uuid, Member>,
    departed: HashMap<String, DepartedMember>,
    pending_deletion: Option<PendingDeletion>,
}

impl Room {
    pub fn new(now: Instant) -> Self {
        Self {
            video_id: 0,
            clock: PlaybackClock::new(now),
            members: HashMap::new(),
            departed: HashMap::new(),
            pending_deletion: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn member(&self, id: &Uuid) -> Option<&Member> {
        self.members.get(id)
    }

    pub fn member_mut(&mut self, id: &Uuid) -> Option<&mut Member> {
        self.members.get_mut(id)
    }

    pub fn has_username(&self, username: &str) -> bool {
        self.members.values().any(|m| m.username == username)
    }

    pub fn is_host(&self, id: &Uuid) -> bool {
        self.members.get(id).is_some_and(|m| m.is_host)
    }

    pub fn has_host(&self) -> bool {
        self.members.values().any(|m| m.is_host)
    }

    pub fn insert_member(&mut self, member: Member) {
        self.members.insert(member.id, member);
    }

    /// Removes and returns the member registered under `username`.
    pub fn take_member_by_username(&mut self, username: &str) -> Option<Member> {
        let id = self
            .members
            .values()
            .find(|m| m.username == username)
            .map(|m| m.id)?;
        self.members.remove(&id)
    }

    /// Removes a member and remembers its identity under its username.
    pub fn depart_member(&mut self, id: &Uuid) -> Option<Member> {
        let member = self.members.remove(id)?;
        self.departed.insert(
            member.username.clone(),
            DepartedMember {
                id: member.id,
                is_host: member.is_host,
            },
        );
        Some(member)
    }

    /// Consumes the identity left behind by `username`, if any.
    pub fn take_departed(&mut self, username: &str) -> Option<DepartedMember> {
        self.departed.remove(username)
    }

    /// Promotes an arbitrary member to host.
    pub fn elect_host(&mut self) -> Option<&Member> {
        let member = self.members.values_mut().next()?;
        member.is_host = true;
        Some(&*member)
    }

    pub fn connections(&self) -> Vec<Connection> {
        self.members.values().map(|m| m.connection.clone()).collect()
    }

    pub fn roster(&self) -> Vec<MemberSummary> {
        self.members.values().map(Member::summary).collect()
    }

    pub fn pending_deletion_token(&self) -> Option<Uuid> {
        self.pending_deletion.as_ref().map(|p| p.token)
    }

    pub fn set_pending_deletion(&mut self, pending: PendingDeletion) {
        if let Some(previous) = self.pending_deletion.replace(pending) {
            previous.cancel();
        }
    }

    /// Returns true when a scheduled deletion was cancelled.
    pub fn cancel_pending_deletion(&mut self) -> bool {
        match self.pending_deletion.take() {
            Some(pending) => {
                pending.cancel();
                true
            }
            None => false,
        }
    }
}

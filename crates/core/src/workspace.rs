//! Multi-document workspace
//!
//! Each open PDF gets its own [`DocumentSession`]; sessions share nothing but
//! the configuration they were opened with.

use crate::session::{DocumentSession, SessionConfig, SessionError};
use doc_model::DocumentId;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug)]
pub struct Workspace {
    /// Open sessions keyed by document id
    sessions: BTreeMap<DocumentId, DocumentSession>,

    /// Counter for generating unique document ids
    next_id: u64,

    /// Document that receives input when none is named
    active: Option<DocumentId>,

    config: SessionConfig,
}

impl Workspace {
    pub fn new(config: SessionConfig) -> Self {
        Self { sessions: BTreeMap::new(), next_id: 1, active: None, config }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Opens a PDF from disk. Nothing is registered if opening fails.
    pub fn open(&mut self, path: impl AsRef<Path>) -> Result<DocumentId, SessionError> {
        let id = DocumentId(self.next_id);
        let session = DocumentSession::open(id, path.as_ref(), &self.config)?;
        log::info!("{id}: opened {}", path.as_ref().display());
        Ok(self.register(session))
    }

    pub fn open_bytes(&mut self, bytes: &[u8]) -> Result<DocumentId, SessionError> {
        let id = DocumentId(self.next_id);
        let session = DocumentSession::open_bytes(id, bytes, &self.config)?;
        Ok(self.register(session))
    }

    /// Drops a session and its unsaved changes.
    pub fn close(&mut self, id: DocumentId) -> Option<DocumentSession> {
        let session = self.sessions.remove(&id)?;
        if session.is_dirty() {
            log::warn!("{id}: closed with unsaved stickers");
        }
        if self.active == Some(id) {
            self.active = self.sessions.keys().next().copied();
        }
        Some(session)
    }

    pub fn get(&self, id: DocumentId) -> Option<&DocumentSession> {
        self.sessions.get(&id)
    }

    pub fn get_mut(&mut self, id: DocumentId) -> Option<&mut DocumentSession> {
        self.sessions.get_mut(&id)
    }

    pub fn active(&self) -> Option<DocumentId> {
        self.active
    }

    pub fn active_session_mut(&mut self) -> Option<&mut DocumentSession> {
        let id = self.active?;
        self.sessions.get_mut(&id)
    }

    pub fn set_active(&mut self, id: DocumentId) -> bool {
        if !self.sessions.contains_key(&id) {
            return false;
        }
        self.active = Some(id);
        true
    }

    /// Ids of open documents in opening order.
    pub fn ids(&self) -> Vec<DocumentId> {
        self.sessions.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn register(&mut self, session: DocumentSession) -> DocumentId {
        let id = session.id();
        self.next_id += 1;
        self.sessions.insert(id, session);
        if self.active.is_none() {
            self.active = Some(id);
        }
        id
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

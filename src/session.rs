use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::roles::Role;

/// Session
///
/// Snapshot supplied by the external identity store. The navigation layer only ever
/// reads it; `profile` is opaque and carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Session {
    pub is_authenticated: bool,
    pub role: Option<Role>,
    #[serde(default)]
    #[ts(type = "unknown")]
    #[schema(value_type = Object)]
    pub profile: serde_json::Value,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(role: Role, profile: serde_json::Value) -> Self {
        Self {
            is_authenticated: true,
            role: Some(role),
            profile,
        }
    }

    /// The role authorization decisions may rely on. A role left behind on an
    /// unauthenticated session does not count.
    pub fn effective_role(&self) -> Option<Role> {
        if self.is_authenticated { self.role } else { None }
    }
}

/// SessionPhase
///
/// Dispatcher-facing classification of the session input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Bootstrap: identity data has not been read yet.
    NoSession,
    /// Logged out, or authenticated with a role that has not materialized yet.
    Unauthenticated,
    Authenticated(Role),
}

impl SessionPhase {
    pub fn of(snapshot: Option<&Session>) -> Self {
        match snapshot {
            None => SessionPhase::NoSession,
            Some(session) => match session.effective_role() {
                Some(role) => SessionPhase::Authenticated(role),
                None => SessionPhase::Unauthenticated,
            },
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SessionPhase::NoSession => "no_session",
            SessionPhase::Unauthenticated => "unauthenticated",
            SessionPhase::Authenticated(_) => "authenticated",
        }
    }

    pub fn role(self) -> Option<Role> {
        match self {
            SessionPhase::Authenticated(role) => Some(role),
            SessionPhase::NoSession | SessionPhase::Unauthenticated => None,
        }
    }
}

/// Creates the session context for one navigation client.
///
/// The writer half goes to the login/logout collaborator and is the only way to change
/// the session; the reader half is handed to the dispatcher. `None` means the identity
/// store has not been read yet.
pub fn session_channel() -> (SessionWriter, SessionReader) {
    let (tx, rx) = watch::channel(None);
    (SessionWriter { tx }, SessionReader { rx })
}

/// SessionWriter
///
/// Deliberately not `Clone`: there is exactly one writer per session context.
#[derive(Debug)]
pub struct SessionWriter {
    tx: watch::Sender<Option<Session>>,
}

impl SessionWriter {
    pub fn publish(&self, session: Session) {
        tracing::debug!(
            authenticated = session.is_authenticated,
            role = ?session.role,
            "session published"
        );
        self.tx.send_replace(Some(session));
    }

    pub fn login(&self, role: Role, profile: serde_json::Value) {
        self.publish(Session::authenticated(role, profile));
    }

    pub fn logout(&self) {
        self.publish(Session::anonymous());
    }

    pub fn reader(&self) -> SessionReader {
        SessionReader {
            rx: self.tx.subscribe(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionReader {
    rx: watch::Receiver<Option<Session>>,
}

impl SessionReader {
    pub fn snapshot(&self) -> Option<Session> {
        self.rx.borrow().clone()
    }

    pub fn phase(&self) -> SessionPhase {
        SessionPhase::of(self.rx.borrow().as_ref())
    }

    /// Waits for the next session update. Returns `false` once the writer is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

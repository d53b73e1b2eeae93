use std::{collections::HashMap, sync::Arc};

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    dispatcher::{ComposedRoutes, Dispatcher, PendingView, View},
    modules::ModuleResolver,
    routes::RouteTable,
    session::{Session, SessionPhase, SessionWriter, session_channel},
};

/// NavigationClient
///
/// One navigating client: the session context's writer half (owned on behalf of the
/// external identity store) and the dispatcher that reads the other half.
struct NavigationClient {
    writer: SessionWriter,
    dispatcher: Dispatcher,
}

/// ClientRegistry
///
/// Shared, in-memory directory of navigation clients. All clients share the route
/// table and module resolver, so an implementation resolved for one client is cached
/// for every other client too.
#[derive(Clone)]
pub struct ClientRegistry {
    table: &'static RouteTable,
    resolver: Arc<ModuleResolver>,
    clients: Arc<Mutex<HashMap<Uuid, NavigationClient>>>,
}

/// Session update outcome: the phase the dispatcher now sees, plus the landing
/// redirect if this update triggered one.
pub struct SessionUpdate {
    pub phase: SessionPhase,
    pub view: Option<View>,
}

impl ClientRegistry {
    pub fn new(table: &'static RouteTable, resolver: Arc<ModuleResolver>) -> Self {
        Self {
            table,
            resolver,
            clients: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn resolver(&self) -> &Arc<ModuleResolver> {
        &self.resolver
    }

    pub async fn create(&self) -> Uuid {
        let id = Uuid::new_v4();
        let (writer, reader) = session_channel();
        let dispatcher = Dispatcher::new(self.table, Arc::clone(&self.resolver), reader);
        self.clients
            .lock()
            .await
            .insert(id, NavigationClient { writer, dispatcher });
        tracing::debug!(client = %id, "navigation client created");
        id
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        self.clients.lock().await.remove(&id).is_some()
    }

    /// Publishes a session on behalf of the identity store, then lets the dispatcher
    /// react to it.
    pub async fn publish_session(&self, id: Uuid, session: Session) -> Option<SessionUpdate> {
        let mut clients = self.clients.lock().await;
        let client = clients.get_mut(&id)?;
        client.writer.publish(session);
        let view = client.dispatcher.sync_session();
        Some(SessionUpdate {
            phase: client.dispatcher.phase(),
            view,
        })
    }

    pub async fn logout(&self, id: Uuid) -> Option<SessionUpdate> {
        self.publish_session(id, Session::anonymous()).await
    }

    /// Runs a navigation. The returned `PendingView`, if any, is awaited by the caller
    /// after the registry lock is released.
    pub async fn navigate(&self, id: Uuid, path: &str) -> Option<(View, Option<PendingView>)> {
        let mut clients = self.clients.lock().await;
        let client = clients.get_mut(&id)?;
        let view = client.dispatcher.navigate(path);
        let pending = match view {
            View::Pending { .. } => client.dispatcher.pending(),
            _ => None,
        };
        Some((view, pending))
    }

    pub async fn current_view(&self, id: Uuid) -> Option<Option<View>> {
        let clients = self.clients.lock().await;
        clients.get(&id).map(|client| client.dispatcher.current_view())
    }

    pub async fn retry(&self, id: Uuid) -> Option<Option<View>> {
        let mut clients = self.clients.lock().await;
        clients.get_mut(&id).map(|client| client.dispatcher.retry())
    }

    pub async fn reachable_paths(&self, id: Uuid) -> Option<(SessionPhase, Vec<String>)> {
        let clients = self.clients.lock().await;
        let phase = clients.get(&id)?.dispatcher.phase();
        let composed = ComposedRoutes::for_phase(self.table, phase);
        Some((phase, composed.reachable_paths()))
    }
}

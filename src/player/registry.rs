use dashmap::DashMap;
use serenity::model::id::GuildId;
use std::sync::Arc;
use tracing::info;

use crate::player::session::PlaybackSession;

/// Mapa global guild → sesión de reproducción.
///
/// Es la única pieza de estado mutable a nivel de proceso. Las entradas se
/// crean bajo demanda y solo desaparecen con un desmontaje explícito; no hay
/// persistencia entre reinicios.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<GuildId, Arc<PlaybackSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, guild_id: GuildId) -> Option<Arc<PlaybackSession>> {
        self.sessions.get(&guild_id).map(|session| session.clone())
    }

    /// Devuelve la sesión de la guild, creándola con `init` si no existe.
    /// La entrada del mapa garantiza una única creación aunque varios
    /// comandos lleguen a la vez a una guild sin sesión.
    pub fn get_or_create(
        &self,
        guild_id: GuildId,
        init: impl FnOnce() -> Arc<PlaybackSession>,
    ) -> Arc<PlaybackSession> {
        self.sessions.entry(guild_id).or_insert_with(init).clone()
    }

    pub fn remove(&self, guild_id: GuildId) -> Option<Arc<PlaybackSession>> {
        self.sessions.remove(&guild_id).map(|(_, session)| session)
    }

    /// Da de baja la sesión de la guild y la desmonta por completo. Un
    /// `get_or_create` posterior entrega una sesión nueva.
    pub async fn destroy(&self, guild_id: GuildId) {
        if let Some(session) = self.remove(guild_id) {
            session.teardown().await;
        }
    }

    /// Desmonta todas las sesiones vivas. Se usa al apagar el proceso.
    pub async fn shutdown(&self) {
        let guilds: Vec<GuildId> = self.sessions.iter().map(|entry| *entry.key()).collect();
        for guild_id in guilds {
            self.destroy(guild_id).await;
        }
        info!("🧹 Todas las sesiones fueron finalizadas");
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::session::PlaybackState;
    use crate::player::testkit::{track, FakeConductor, FakeSurface};
    use crate::sources::MockSourceResolver;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn spawn_session(guild_id: GuildId) -> Arc<PlaybackSession> {
        let (conductor, _started) = FakeConductor::new();
        PlaybackSession::spawn(
            guild_id,
            1.0,
            Arc::new(MockSourceResolver::new()),
            conductor,
            FakeSurface::new(),
        )
    }

    #[tokio::test]
    async fn get_or_create_returns_the_same_session() {
        let registry = SessionRegistry::new();
        let guild = GuildId::new(1);

        let first = registry.get_or_create(guild, || spawn_session(guild));
        let second = registry.get_or_create(guild, || spawn_session(guild));

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_first_touch_creates_exactly_one_session() {
        let registry = Arc::new(SessionRegistry::new());
        let guild = GuildId::new(1);
        let created = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let registry = registry.clone();
            let created = created.clone();
            handles.push(tokio::spawn(async move {
                registry.get_or_create(guild, || {
                    created.fetch_add(1, Ordering::SeqCst);
                    spawn_session(guild)
                })
            }));
        }

        let sessions: Vec<_> = futures_join(handles).await;
        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert!(sessions
            .iter()
            .all(|session| Arc::ptr_eq(session, &sessions[0])));
    }

    async fn futures_join(
        handles: Vec<tokio::task::JoinHandle<Arc<PlaybackSession>>>,
    ) -> Vec<Arc<PlaybackSession>> {
        let mut sessions = Vec::new();
        for handle in handles {
            sessions.push(handle.await.unwrap());
        }
        sessions
    }

    #[tokio::test]
    async fn destroy_then_get_or_create_yields_a_fresh_session() {
        let registry = SessionRegistry::new();
        let guild = GuildId::new(1);

        let old = registry.get_or_create(guild, || spawn_session(guild));
        old.enqueue(track("a", 1));
        old.set_volume(20).await.unwrap();

        registry.destroy(guild).await;
        assert!(registry.is_empty());

        let fresh = registry.get_or_create(guild, || spawn_session(guild));
        assert!(!Arc::ptr_eq(&old, &fresh));

        let snapshot = fresh.snapshot();
        assert_eq!(snapshot.state, PlaybackState::Idle);
        assert!(snapshot.current.is_none());
        assert_eq!(snapshot.queue_len, 0);
        assert_eq!(snapshot.volume, 1.0);
        assert!(!snapshot.loop_single);
        assert_eq!(snapshot.skip_votes, 0);
    }

    #[tokio::test]
    async fn shutdown_tears_down_every_live_session() {
        let registry = SessionRegistry::new();
        for id in 1..=3u64 {
            let guild = GuildId::new(id);
            registry.get_or_create(guild, || spawn_session(guild));
        }
        assert_eq!(registry.len(), 3);

        registry.shutdown().await;
        assert!(registry.is_empty());
        assert!(registry.get(GuildId::new(2)).is_none());
    }
}

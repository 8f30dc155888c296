use super::active_session::{ActiveSession, SharedSession};
use super::ids::{IdGenerator, generate_unique};
use crate::game::core::messages::ServerMessage;
use crate::game::core::session::GameSession;
use crate::game::core::settings::Settings;
use crate::game::core::{SessionError, SessionResult};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

const MAX_CODE_ATTEMPTS: usize = 64;
const MAX_ID_ATTEMPTS: usize = 8;

/// Identity of a freshly created session
#[derive(Debug, Clone)]
pub struct CreatedSession {
    pub session_id: String,
    pub code: String,
    pub host_token: String,
}

/// Sessions indexed by id and by join code
pub struct SessionRegistry {
    ids: Arc<dyn IdGenerator>,
    sessions: DashMap<String, SharedSession>,
    codes: DashMap<String, String>, // join code -> session id
}

impl SessionRegistry {
    pub fn new(ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            ids,
            sessions: DashMap::new(),
            codes: DashMap::new(),
        }
    }

    pub fn ids(&self) -> &dyn IdGenerator {
        self.ids.as_ref()
    }

    /// Create a session in LOBBY with `host_connection` bound as host
    pub fn create(
        &self,
        settings: Settings,
        host_connection: &str,
        host_tx: broadcast::Sender<ServerMessage>,
    ) -> SessionResult<(CreatedSession, SharedSession)> {
        let session_id = generate_unique(
            || self.ids.session_id(),
            |id| self.sessions.contains_key(id),
            MAX_ID_ATTEMPTS,
        )
        .ok_or(SessionError::CodeSpaceExhausted)?;

        let code = self.reserve_code(&session_id)?;
        let host_token = self.ids.host_token();

        let session = GameSession::new(
            session_id.clone(),
            code.clone(),
            host_token.clone(),
            settings,
            host_connection,
        );
        let shared = ActiveSession::new_shared(session, host_connection, host_tx);
        self.sessions.insert(session_id.clone(), shared.clone());

        info!(session_id, code, "Session created");

        Ok((
            CreatedSession {
                session_id,
                code,
                host_token,
            },
            shared,
        ))
    }

    /// Claim an unused code for `session_id`. The entry API makes the
    /// check-and-insert atomic across concurrent creates.
    fn reserve_code(&self, session_id: &str) -> SessionResult<String> {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = self.ids.join_code();
            match self.codes.entry(code) {
                Entry::Occupied(entry) => {
                    debug!(code = %entry.key(), "Join code collision, retrying");
                }
                Entry::Vacant(entry) => {
                    let code = entry.key().clone();
                    entry.insert(session_id.to_string());
                    return Ok(code);
                }
            }
        }
        Err(SessionError::CodeSpaceExhausted)
    }

    pub fn get(&self, session_id: &str) -> Option<SharedSession> {
        self.sessions.get(session_id).map(|s| s.clone())
    }

    pub fn get_by_code(&self, code: &str) -> Option<SharedSession> {
        let session_id = self.codes.get(code.trim())?.clone();
        self.get(&session_id)
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop both index entries. Callers cancel the session's timers.
    pub fn remove(&self, session_id: &str, code: &str) -> Option<SharedSession> {
        let (_, shared) = self.sessions.remove(session_id)?;
        self.codes.remove_if(code, |_, id| id == session_id);
        info!(session_id, code, "Session removed");
        Some(shared)
    }

    /// Remove sessions that finished at least `retention_ms` before `now_ms`.
    /// Returns how many were removed.
    pub async fn reap_finished(&self, retention_ms: u64, now_ms: u64) -> usize {
        let handles: Vec<SharedSession> = self.sessions.iter().map(|s| s.value().clone()).collect();

        let mut reaped = 0;
        for shared in handles {
            let mut active = shared.lock().await;
            let Some(finished_at) = active.session.finished_at_ms() else {
                continue;
            };
            if now_ms.saturating_sub(finished_at) < retention_ms {
                continue;
            }
            active.cancel_timers();
            let (id, code) = (active.session.id.clone(), active.session.code.clone());
            if self.remove(&id, &code).is_some() {
                reaped += 1;
            }
        }
        reaped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::engine::ids::RandomIds;
    use std::sync::Mutex;

    /// Hands out join codes from a fixed list, then repeats the last one
    struct ScriptedIds {
        codes: Mutex<Vec<&'static str>>,
        counter: Mutex<u32>,
    }

    impl ScriptedIds {
        fn new(codes: Vec<&'static str>) -> Self {
            Self {
                codes: Mutex::new(codes),
                counter: Mutex::new(0),
            }
        }
    }

    impl IdGenerator for ScriptedIds {
        fn session_id(&self) -> String {
            let mut counter = self.counter.lock().unwrap();
            *counter += 1;
            format!("session-{counter}")
        }

        fn join_code(&self) -> String {
            let mut codes = self.codes.lock().unwrap();
            if codes.len() > 1 {
                codes.remove(0).to_string()
            } else {
                codes[0].to_string()
            }
        }

        fn host_token(&self) -> String {
            "token".to_string()
        }

        fn player_id(&self) -> String {
            "p-1".to_string()
        }
    }

    fn tx() -> broadcast::Sender<ServerMessage> {
        broadcast::channel(16).0
    }

    #[tokio::test]
    async fn create_indexes_by_id_and_code() {
        let registry = SessionRegistry::new(Arc::new(RandomIds));
        let (created, _) = registry.create(Settings::default(), "host", tx()).unwrap();

        assert_eq!(created.code.len(), 6);
        assert!(created.code.chars().all(|c| c.is_ascii_digit()));
        assert!(registry.get(&created.session_id).is_some());

        let by_code = registry.get_by_code(&created.code).unwrap();
        assert_eq!(by_code.lock().await.session.id, created.session_id);
    }

    #[test]
    fn code_collision_retries_until_unique() {
        let registry = SessionRegistry::new(Arc::new(ScriptedIds::new(vec![
            "111111", "111111", "111111", "222222",
        ])));

        let (first, _) = registry.create(Settings::default(), "h1", tx()).unwrap();
        let (second, _) = registry.create(Settings::default(), "h2", tx()).unwrap();

        assert_eq!(first.code, "111111");
        assert_eq!(second.code, "222222");
    }

    #[test]
    fn exhausted_code_space_fails_create_only() {
        let registry = SessionRegistry::new(Arc::new(ScriptedIds::new(vec!["111111"])));

        registry.create(Settings::default(), "h1", tx()).unwrap();
        let Err(err) = registry.create(Settings::default(), "h2", tx()) else {
            panic!("second create should run out of codes");
        };

        assert!(matches!(err, SessionError::CodeSpaceExhausted));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unknown_lookups_return_none() {
        let registry = SessionRegistry::new(Arc::new(RandomIds));
        assert!(registry.get("nope").is_none());
        assert!(registry.get_by_code("000000").is_none());
    }

    #[test]
    fn remove_frees_code() {
        let registry = SessionRegistry::new(Arc::new(ScriptedIds::new(vec!["111111"])));
        let (created, _) = registry.create(Settings::default(), "h1", tx()).unwrap();

        assert!(registry.remove(&created.session_id, &created.code).is_some());
        assert!(registry.get_by_code("111111").is_none());
        assert!(registry.is_empty());

        let (again, _) = registry.create(Settings::default(), "h2", tx()).unwrap();
        assert_eq!(again.code, "111111");
    }

    #[tokio::test]
    async fn reaper_removes_only_old_finished_sessions() {
        let registry = SessionRegistry::new(Arc::new(RandomIds));
        let (live, _) = registry.create(Settings::default(), "h1", tx()).unwrap();
        let (done, done_shared) = registry.create(Settings::default(), "h2", tx()).unwrap();

        done_shared.lock().await.session.finish(1_000).unwrap();

        assert_eq!(registry.reap_finished(5_000, 3_000).await, 0);
        assert_eq!(registry.reap_finished(5_000, 6_000).await, 1);

        assert!(registry.get(&live.session_id).is_some());
        assert!(registry.get(&done.session_id).is_none());
        assert!(registry.get_by_code(&done.code).is_none());
    }
}

//! Live session registry.
//!
//! Owns every live [`GameSession`] and the index binding each connection to
//! at most one session. The two maps in [`Index`] only ever change together,
//! under the index write lock.
//!
//! # Locking
//!
//! Each session sits behind its own mutex, so events for different sessions
//! run in parallel while events for one session are serialized. Whenever both
//! locks are needed the session lock is taken first, then the index lock.
//! Lookups read the index, release it, lock the session and then re-check
//! that the session is still live and the connection still plays in it.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex, RwLock};

use super::code::CodeGenerator;
use super::connection::ConnectionId;
use super::session::{Deal, Departure, GameSession, Rejection};

/// Random draws tried before walking the code space for a free slot.
const RANDOM_CODE_ATTEMPTS: u32 = 32;

/// Shared handle to one session.
pub type SharedSession = Arc<Mutex<GameSession>>;

/// Owned lock on one session. Holding it serializes everything that session
/// does, including fan-out of the events it produced.
pub type SessionGuard = ArcMutexGuard<RawMutex, GameSession>;

/// Result of dropping a connection.
pub enum RemovalOutcome {
    /// The connection was not in any session
    NotBound,
    /// The connection was the last player; the session is gone
    SessionDestroyed { code: String },
    /// Others remain and should be told
    PlayersRemaining {
        names: Vec<String>,
        departure: Departure,
        session: SessionGuard,
    },
}

#[derive(Debug, Default)]
struct Index {
    sessions: HashMap<String, SharedSession>,
    connection_to_code: HashMap<ConnectionId, String>,
}

#[derive(Debug, Default)]
pub struct SessionRegistry {
    index: RwLock<Index>,
    codes: Mutex<CodeGenerator>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_codes(codes: CodeGenerator) -> Self {
        Self {
            index: RwLock::default(),
            codes: Mutex::new(codes),
        }
    }

    /// Create a waiting session hosted by `connection`.
    pub fn create_session(
        &self,
        connection: ConnectionId,
        host_name: String,
    ) -> Result<SessionGuard, Rejection> {
        let mut index = self.index.write();
        if index.connection_to_code.contains_key(&connection) {
            return Err(Rejection::AlreadyInSession);
        }

        let code = self.fresh_code(&index)?;
        let session = Arc::new(Mutex::new(GameSession::new(code.clone(), connection, host_name)));
        let guard = session.lock_arc();
        index.sessions.insert(code.clone(), session);
        index.connection_to_code.insert(connection, code.clone());
        log::info!("session {} created by {}", code, connection);
        Ok(guard)
    }

    /// Pick a code no live session uses. Runs under the index write lock, so
    /// it must terminate: a few random draws, then one pass over the space.
    fn fresh_code(&self, index: &Index) -> Result<String, Rejection> {
        let mut codes = self.codes.lock();
        let space = codes.space();
        if index.sessions.len() as u64 >= space {
            log::warn!("all {} session codes are live, refusing new session", space);
            return Err(Rejection::ServerFull);
        }

        for attempt in 1..=RANDOM_CODE_ATTEMPTS {
            let code = codes.generate();
            if !index.sessions.contains_key(&code) {
                return Ok(code);
            }
            log::debug!("session code {} already live (attempt {})", code, attempt);
        }

        log::warn!(
            "{} of {} session codes live, scanning for a free one",
            index.sessions.len(),
            space
        );
        let start = codes.draw();
        (0..space)
            .map(|offset| codes.format((start + offset) % space))
            .find(|code| !index.sessions.contains_key(code))
            .ok_or(Rejection::ServerFull)
    }

    /// Add `connection` to the waiting session `code` as `name`.
    pub fn join_session(
        &self,
        code: &str,
        connection: ConnectionId,
        name: String,
    ) -> Result<SessionGuard, Rejection> {
        if self.index.read().connection_to_code.contains_key(&connection) {
            return Err(Rejection::AlreadyInSession);
        }
        let session = self
            .index
            .read()
            .sessions
            .get(code)
            .cloned()
            .ok_or(Rejection::SessionNotFound)?;

        let mut guard = session.lock_arc();
        if guard.is_retired() {
            return Err(Rejection::SessionNotFound);
        }
        guard.check_joinable(&name)?;

        let mut index = self.index.write();
        if index.connection_to_code.contains_key(&connection) {
            return Err(Rejection::AlreadyInSession);
        }
        guard.add_player(connection, name)?;
        index.connection_to_code.insert(connection, code.to_string());
        drop(index);
        log::info!("{} joined session {} ({} players)", connection, code, guard.player_count());
        Ok(guard)
    }

    /// Lock the session `connection` plays in, if any.
    pub fn resolve_session(&self, connection: ConnectionId) -> Option<SessionGuard> {
        let session = {
            let index = self.index.read();
            let code = index.connection_to_code.get(&connection)?;
            index.sessions.get(code)?.clone()
        };
        let guard = session.lock_arc();
        (!guard.is_retired() && guard.has_connection(connection)).then_some(guard)
    }

    /// Start the round in session `code` on behalf of `connection`. `deal` is
    /// only consulted once every precondition holds.
    pub fn start_session(
        &self,
        code: &str,
        connection: ConnectionId,
        deal: impl FnOnce(usize) -> Deal,
    ) -> Result<SessionGuard, Rejection> {
        let session = self
            .index
            .read()
            .sessions
            .get(code)
            .cloned()
            .ok_or(Rejection::SessionNotFound)?;
        let mut guard = session.lock_arc();
        if guard.is_retired() || !guard.has_connection(connection) {
            return Err(Rejection::SessionNotFound);
        }
        guard.check_startable(connection)?;
        let deal = deal(guard.player_count());
        guard.start(connection, deal)?;
        log::info!("session {} started with {} players", code, guard.player_count());
        Ok(guard)
    }

    /// Drop `connection` from whatever session it is in. Safe to call any
    /// number of times.
    pub fn remove_connection(&self, connection: ConnectionId) -> RemovalOutcome {
        let Some(mut guard) = self.resolve_session(connection) else {
            self.index.write().connection_to_code.remove(&connection);
            return RemovalOutcome::NotBound;
        };
        let Some(departure) = guard.remove_player(connection) else {
            return RemovalOutcome::NotBound;
        };

        let code = guard.code().to_string();
        let mut index = self.index.write();
        index.connection_to_code.remove(&connection);
        if departure == Departure::Emptied {
            guard.retire();
            index.sessions.remove(&code);
            log::info!("session {} destroyed after its last player left", code);
            return RemovalOutcome::SessionDestroyed { code };
        }
        drop(index);

        log::info!("{} left session {} ({:?})", connection, code, departure);
        RemovalOutcome::PlayersRemaining {
            names: guard.player_names(),
            departure,
            session: guard,
        }
    }

    /// Tear down a session: retire it, drop it from the index and unbind all
    /// of its participants. The caller holds the session lock.
    pub fn destroy_session(&self, session: &mut GameSession) {
        session.retire();
        let code = session.code().to_string();
        let mut index = self.index.write();
        index.sessions.remove(&code);
        for connection in session.connections() {
            if index.connection_to_code.get(&connection) == Some(&code) {
                index.connection_to_code.remove(&connection);
            }
        }
        log::info!("session {} destroyed", code);
    }

    /// Code of the session `connection` is bound to.
    pub fn code_for(&self, connection: ConnectionId) -> Option<String> {
        self.index.read().connection_to_code.get(&connection).cloned()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.index.read().sessions.contains_key(code)
    }

    pub fn session_count(&self) -> usize {
        self.index.read().sessions.len()
    }

    pub fn bound_count(&self) -> usize {
        self.index.read().connection_to_code.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SessionState;
    use std::collections::HashSet;

    fn registry() -> SessionRegistry {
        SessionRegistry::with_codes(CodeGenerator::seeded(5, 6))
    }

    fn deal(guesser_index: usize) -> impl FnOnce(usize) -> Deal {
        move |_| Deal {
            subject: "Moon".to_string(),
            guesser_index,
        }
    }

    fn create(registry: &SessionRegistry, conn: u64, name: &str) -> String {
        registry
            .create_session(ConnectionId(conn), name.to_string())
            .unwrap()
            .code()
            .to_string()
    }

    #[test]
    fn test_create_binds_connection() {
        let registry = registry();
        let code = create(&registry, 1, "Ava");
        assert!(registry.contains(&code));
        assert_eq!(registry.code_for(ConnectionId(1)), Some(code.clone()));
        assert_eq!(registry.bound_count(), 1);

        let again = registry.create_session(ConnectionId(1), "Ava".to_string());
        assert_eq!(again.err(), Some(Rejection::AlreadyInSession));
        assert_eq!(registry.session_count(), 1);
    }

    #[test]
    fn test_join_rejections_in_order() {
        let registry = registry();
        let code = create(&registry, 1, "Ava");
        let other = create(&registry, 9, "Zed");

        // Already bound beats everything else
        let err = registry.join_session("nope", ConnectionId(9), "Ava".to_string()).err();
        assert_eq!(err, Some(Rejection::AlreadyInSession));

        let err = registry.join_session("nope", ConnectionId(2), "Ben".to_string()).err();
        assert_eq!(err, Some(Rejection::SessionNotFound));

        let err = registry.join_session(&code, ConnectionId(2), "Ava".to_string()).err();
        assert_eq!(err, Some(Rejection::NameTaken));
        assert_eq!(registry.code_for(ConnectionId(2)), None);

        registry.join_session(&code, ConnectionId(2), "Ben".to_string()).unwrap();
        registry.start_session(&code, ConnectionId(1), deal(0)).unwrap();

        let err = registry.join_session(&code, ConnectionId(3), "Ava".to_string()).err();
        assert_eq!(err, Some(Rejection::NotWaiting));
        assert_ne!(code, other);
    }

    #[test]
    fn test_start_rejections() {
        let registry = registry();
        let code = create(&registry, 1, "Ava");

        let err = registry.start_session(&code, ConnectionId(1), deal(0)).err();
        assert_eq!(err, Some(Rejection::TooFewPlayers));

        registry.join_session(&code, ConnectionId(2), "Ben".to_string()).unwrap();
        let err = registry.start_session(&code, ConnectionId(2), deal(0)).err();
        assert_eq!(err, Some(Rejection::NotHost));

        let err = registry.start_session(&code, ConnectionId(7), deal(0)).err();
        assert_eq!(err, Some(Rejection::SessionNotFound));

        let session = registry.start_session(&code, ConnectionId(1), deal(1)).unwrap();
        assert_eq!(session.state(), SessionState::Playing);
        assert_eq!(session.guesser().unwrap().name, "Ben");
    }

    #[test]
    fn test_dealer_not_consulted_on_rejection() {
        let registry = registry();
        let code = create(&registry, 1, "Ava");
        let mut consulted = false;
        let _ = registry.start_session(&code, ConnectionId(1), |_| {
            consulted = true;
            Deal {
                subject: "Moon".to_string(),
                guesser_index: 0,
            }
        });
        assert!(!consulted);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let registry = registry();
        let code = create(&registry, 1, "Ava");
        registry.join_session(&code, ConnectionId(2), "Ben".to_string()).unwrap();

        match registry.remove_connection(ConnectionId(2)) {
            RemovalOutcome::PlayersRemaining { names, departure, .. } => {
                assert_eq!(names, vec!["Ava".to_string()]);
                assert_eq!(departure, Departure::Continued);
            }
            _ => panic!("expected remaining players"),
        }
        assert!(matches!(registry.remove_connection(ConnectionId(2)), RemovalOutcome::NotBound));

        assert!(matches!(
            registry.remove_connection(ConnectionId(1)),
            RemovalOutcome::SessionDestroyed { .. }
        ));
        assert!(!registry.contains(&code));
        assert_eq!(registry.bound_count(), 0);
        assert!(matches!(registry.remove_connection(ConnectionId(1)), RemovalOutcome::NotBound));
    }

    #[test]
    fn test_destroy_unbinds_everyone() {
        let registry = registry();
        let code = create(&registry, 1, "Ava");
        registry.join_session(&code, ConnectionId(2), "Ben".to_string()).unwrap();
        let keep = create(&registry, 3, "Cy");

        let mut session = registry.resolve_session(ConnectionId(2)).unwrap();
        registry.destroy_session(&mut session);
        assert!(session.is_retired());
        drop(session);

        assert!(!registry.contains(&code));
        assert!(registry.resolve_session(ConnectionId(1)).is_none());
        assert!(registry.resolve_session(ConnectionId(2)).is_none());
        assert!(registry.contains(&keep));
        assert_eq!(registry.bound_count(), 1);
    }

    #[test]
    fn test_stale_handle_sees_retired_session() {
        let registry = registry();
        let code = create(&registry, 1, "Ava");
        let stale = registry.index.read().sessions.get(&code).cloned().unwrap();

        registry.remove_connection(ConnectionId(1));
        assert!(stale.lock().is_retired());

        let err = registry.join_session(&code, ConnectionId(2), "Ben".to_string()).err();
        assert_eq!(err, Some(Rejection::SessionNotFound));
    }

    #[test]
    fn test_codes_unique_under_collisions() {
        // A 4-digit space makes collisions likely over a few hundred draws
        let registry = SessionRegistry::with_codes(CodeGenerator::seeded(99, 4));
        let mut codes = HashSet::new();
        for conn in 0..300 {
            codes.insert(create(&registry, conn, "Host"));
        }
        assert_eq!(codes.len(), 300);
        assert_eq!(registry.session_count(), 300);
    }

    #[test]
    fn test_full_code_space_is_refused() {
        let registry = SessionRegistry::with_codes(CodeGenerator::seeded(3, 4));
        for conn in 0..10_000 {
            create(&registry, conn, "Host");
        }
        assert_eq!(registry.session_count(), 10_000);

        let err = registry.create_session(ConnectionId(10_000), "Late".to_string()).err();
        assert_eq!(err, Some(Rejection::ServerFull));
        assert_eq!(registry.code_for(ConnectionId(10_000)), None);
        assert!(registry.resolve_session(ConnectionId(0)).is_some());

        // Freeing one slot makes exactly that code available again
        let freed = registry.code_for(ConnectionId(42)).unwrap();
        registry.remove_connection(ConnectionId(42));
        assert_eq!(create(&registry, 10_000, "Late"), freed);
    }

    #[test]
    fn test_concurrent_create_and_leave() {
        let registry = registry();
        std::thread::scope(|scope| {
            for t in 0..8u64 {
                let registry = &registry;
                scope.spawn(move || {
                    for i in 0..50u64 {
                        let host = ConnectionId(t * 1000 + i * 2);
                        let guest = ConnectionId(t * 1000 + i * 2 + 1);
                        let code = registry
                            .create_session(host, "Host".to_string())
                            .unwrap()
                            .code()
                            .to_string();
                        registry.join_session(&code, guest, "Guest".to_string()).unwrap();
                        registry.remove_connection(guest);
                        registry.remove_connection(host);
                        registry.remove_connection(host);
                    }
                });
            }
        });
        assert_eq!(registry.session_count(), 0);
        assert_eq!(registry.bound_count(), 0);
    }
}

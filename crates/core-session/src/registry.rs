//! Session registry: which controller serves which user, and which sessions keep it alive.
//!
//! One controller per user. Several sessions (connections) of the same user share it, and
//! it is torn down when the last of them detaches.

use crate::TeleprompterController;
use crate::{DisplaySink, SessionError};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info};

pub type SessionId = String;
pub type UserId = String;

struct UserEntry<S> {
    controller: TeleprompterController<S>,
    sessions: BTreeSet<SessionId>,
}

pub struct SessionRegistry<S> {
    users: HashMap<UserId, UserEntry<S>>,
    session_owner: HashMap<SessionId, UserId>,
}

impl<S> Default for SessionRegistry<S> {
    fn default() -> Self {
        Self {
            users: HashMap::new(),
            session_owner: HashMap::new(),
        }
    }
}

impl<S: DisplaySink> SessionRegistry<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `session` to `user`, creating the user's controller with `create` if none
    /// exists. Re-attaching a known session to the same user is a no-op.
    pub fn attach<F>(
        &mut self,
        session: impl Into<SessionId>,
        user: impl Into<UserId>,
        create: F,
    ) -> Result<&mut TeleprompterController<S>, SessionError>
    where
        F: FnOnce() -> Result<TeleprompterController<S>, SessionError>,
    {
        let session = session.into();
        let user = user.into();
        if let Some(previous) = self.session_owner.get(&session).cloned()
            && previous != user
        {
            self.detach(&session);
        }
        let entry = match self.users.entry(user.clone()) {
            std::collections::hash_map::Entry::Occupied(e) => e.into_mut(),
            std::collections::hash_map::Entry::Vacant(e) => {
                info!(target: "session.registry", "controller_created");
                e.insert(UserEntry {
                    controller: create()?,
                    sessions: BTreeSet::new(),
                })
            }
        };
        if entry.sessions.insert(session.clone()) {
            debug!(target: "session.registry", sessions = entry.sessions.len(), "session_attached");
        }
        self.session_owner.insert(session, user);
        Ok(&mut entry.controller)
    }

    pub fn controller_for_session(&mut self, session: &str) -> Option<&mut TeleprompterController<S>> {
        let user = self.session_owner.get(session)?;
        self.users.get_mut(user).map(|e| &mut e.controller)
    }

    pub fn controller_for_user(&mut self, user: &str) -> Option<&mut TeleprompterController<S>> {
        self.users.get_mut(user).map(|e| &mut e.controller)
    }

    /// Detach one session. When it was the user's last, the controller is torn down and
    /// dropped; returns true in that case.
    pub fn detach(&mut self, session: &str) -> bool {
        let Some(user) = self.session_owner.remove(session) else {
            return false;
        };
        let Some(entry) = self.users.get_mut(&user) else {
            return false;
        };
        entry.sessions.remove(session);
        if !entry.sessions.is_empty() {
            debug!(target: "session.registry", sessions = entry.sessions.len(), "session_detached");
            return false;
        }
        if let Some(mut entry) = self.users.remove(&user) {
            entry.controller.teardown();
        }
        info!(target: "session.registry", "controller_destroyed");
        true
    }

    /// Tear down and drop the user's controller along with all of its sessions.
    pub fn destroy_user(&mut self, user: &str) -> bool {
        let Some(mut entry) = self.users.remove(user) else {
            return false;
        };
        entry.controller.teardown();
        for session in &entry.sessions {
            self.session_owner.remove(session);
        }
        info!(target: "session.registry", "controller_destroyed");
        true
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn session_count(&self) -> usize {
        self.session_owner.len()
    }

    /// Iterate every live controller (for the host's timer loop).
    pub fn controllers_mut(&mut self) -> impl Iterator<Item = &mut TeleprompterController<S>> {
        self.users.values_mut().map(|e| &mut e.controller)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_config::Config;
    use std::time::{Duration, Instant};

    #[derive(Default)]
    struct NullSink;

    impl DisplaySink for NullSink {
        fn show(&mut self, _frame: &str, _timeout: Duration) {}
    }

    fn make(now: Instant) -> impl FnOnce() -> Result<TeleprompterController<NullSink>, SessionError> {
        move || TeleprompterController::new("one two three", Config::default(), NullSink, now)
    }

    #[test]
    fn last_session_tears_down_controller() {
        let now = Instant::now();
        let mut reg = SessionRegistry::new();
        let sub = reg.attach("s1", "alice", make(now)).unwrap().subscription();
        reg.attach("s2", "alice", || panic!("controller must be reused"))
            .unwrap();
        assert_eq!(reg.user_count(), 1);
        assert_eq!(reg.session_count(), 2);

        assert!(!reg.detach("s1"));
        assert!(sub.is_active());
        assert!(reg.controller_for_session("s2").is_some());
        assert!(reg.controller_for_session("s1").is_none());

        assert!(reg.detach("s2"));
        assert!(!sub.is_active());
        assert_eq!(reg.user_count(), 0);
        assert!(!reg.detach("s2"));
    }

    #[test]
    fn users_are_isolated() {
        let now = Instant::now();
        let mut reg = SessionRegistry::new();
        reg.attach("s1", "alice", make(now)).unwrap();
        reg.attach("s2", "bob", make(now)).unwrap();
        assert_eq!(reg.controllers_mut().count(), 2);
        assert!(reg.destroy_user("alice"));
        assert!(reg.controller_for_session("s1").is_none());
        assert!(reg.controller_for_user("bob").is_some());
    }

    #[test]
    fn creation_failure_leaves_registry_unchanged() {
        let mut reg: SessionRegistry<NullSink> = SessionRegistry::new();
        let err = reg.attach("s1", "alice", || {
            Err(core_config::ConfigError::NonFiniteLineWidth(f64::NAN).into())
        });
        assert!(err.is_err());
        assert_eq!(reg.user_count(), 0);
        assert_eq!(reg.session_count(), 0);
    }
}

//! Per-connection protocol state machine.

use super::error::ChatError;
use super::events::ClientEvent;
use super::types::Identity;

/// Protocol state of one connection.
///
/// Room membership is not part of this enum: a connection may be present in
/// any number of rooms, and presence is tracked by the session registry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No identity bound yet.
    #[default]
    Unauthenticated,
    /// Identity bound.
    Authenticated(Identity),
    /// Transport gone; nothing is accepted.
    Closed,
}

impl ConnectionState {
    /// Decide whether `event` may be processed in this state.
    ///
    /// Returns the bound identity for events that require one.
    pub fn admit(&self, event: &ClientEvent) -> Result<Option<&Identity>, ChatError> {
        match (self, event) {
            (ConnectionState::Closed, _) => Err(ChatError::ConnectionClosed),
            (_, ClientEvent::Ping) | (_, ClientEvent::Authenticate { .. }) => Ok(self.identity()),
            (ConnectionState::Authenticated(identity), _) => Ok(Some(identity)),
            (ConnectionState::Unauthenticated, _) => Err(ChatError::NotAuthenticated),
        }
    }

    /// Transition after a verified credential.
    ///
    /// Re-authenticating as the same identity keeps the state; a different
    /// identity is refused.
    pub fn authenticate(&mut self, identity: Identity) -> Result<(), ChatError> {
        match self {
            ConnectionState::Closed => Err(ChatError::ConnectionClosed),
            ConnectionState::Authenticated(bound) if *bound != identity => {
                Err(ChatError::AlreadyBound)
            }
            _ => {
                *self = ConnectionState::Authenticated(identity);
                Ok(())
            }
        }
    }

    /// Transition to the terminal state.
    ///
    /// Returns `false` if the connection was already closed.
    pub fn close(&mut self) -> bool {
        !matches!(std::mem::replace(self, ConnectionState::Closed), ConnectionState::Closed)
    }

    /// Bound identity, if any.
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            ConnectionState::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }

    /// Whether the connection is closed.
    pub fn is_closed(&self) -> bool {
        matches!(self, ConnectionState::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn join() -> ClientEvent {
        ClientEvent::JoinRoom {
            room_id: 1,
            secret: None,
        }
    }

    #[test]
    fn test_unauthenticated_gate() {
        let state = ConnectionState::default();
        assert_eq!(state.admit(&join()), Err(ChatError::NotAuthenticated));
        assert_eq!(
            state.admit(&ClientEvent::SendMessage {
                room_id: 1,
                content: "hi".into(),
                kind: Default::default()
            }),
            Err(ChatError::NotAuthenticated)
        );
        assert_eq!(state.admit(&ClientEvent::Ping), Ok(None));
        assert_eq!(
            state.admit(&ClientEvent::Authenticate {
                credential: "t".into()
            }),
            Ok(None)
        );
    }

    #[test]
    fn test_authenticated_admits_everything() {
        let mut state = ConnectionState::default();
        state.authenticate(Identity::new(1, "alice")).unwrap();
        assert_eq!(state.admit(&join()), Ok(Some(&Identity::new(1, "alice"))));
        assert_eq!(
            state.admit(&ClientEvent::Typing { room_id: 1 }).unwrap(),
            Some(&Identity::new(1, "alice"))
        );
    }

    #[test]
    fn test_reauthentication() {
        let mut state = ConnectionState::default();
        state.authenticate(Identity::new(1, "alice")).unwrap();
        state.authenticate(Identity::new(1, "alice")).unwrap();
        assert_eq!(
            state.authenticate(Identity::new(2, "bob")),
            Err(ChatError::AlreadyBound)
        );
        assert_eq!(state.identity(), Some(&Identity::new(1, "alice")));
    }

    #[test]
    fn test_closed_is_terminal() {
        let mut state = ConnectionState::Authenticated(Identity::new(1, "alice"));
        assert!(state.close());
        assert!(!state.close());
        assert!(state.is_closed());
        assert_eq!(state.admit(&ClientEvent::Ping), Err(ChatError::ConnectionClosed));
        assert_eq!(
            state.authenticate(Identity::new(1, "alice")),
            Err(ChatError::ConnectionClosed)
        );
    }
}

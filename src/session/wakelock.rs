use tokio::sync::oneshot::{self, error::TryRecvError};
use tracing::{debug, error, info, trace};

#[derive(Debug, Clone, thiserror::Error)]
pub enum WakeLockError {
    #[error("Screen wakelock is not supported on this platform")]
    Unsupported,

    #[error("Wakelock request rejected: {0}")]
    Rejected(String),

    #[error("Wakelock operation was abandoned")]
    Abandoned,
}

pub type WakeLockCompletion = oneshot::Receiver<Result<(), WakeLockError>>;

// Platform screen wakelock. Both operations complete asynchronously.
pub trait WakeLock {
    fn is_supported(&self) -> bool;

    fn request(&mut self) -> WakeLockCompletion;

    fn release(&mut self) -> WakeLockCompletion;
}

// Desktop hosts have no screen wakelock
#[derive(Debug, Default)]
pub struct UnsupportedWakeLock;

impl WakeLock for UnsupportedWakeLock {
    fn is_supported(&self) -> bool {
        false
    }

    fn request(&mut self) -> WakeLockCompletion {
        completed(Err(WakeLockError::Unsupported))
    }

    fn release(&mut self) -> WakeLockCompletion {
        completed(Err(WakeLockError::Unsupported))
    }
}

fn completed(result: Result<(), WakeLockError>) -> WakeLockCompletion {
    let (tx, rx) = oneshot::channel();
    // The receiver is still alive here
    let _ = tx.send(result);
    rx
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeLockState {
    Released,
    Acquiring,
    Acquired,
    Releasing,
}

impl WakeLockState {
    pub fn is_held(self) -> bool {
        self == WakeLockState::Acquired
    }

    pub fn in_flight(self) -> bool {
        matches!(self, WakeLockState::Acquiring | WakeLockState::Releasing)
    }

    // State after a completed platform operation
    fn settle(self, succeeded: bool) -> WakeLockState {
        match (self, succeeded) {
            (WakeLockState::Acquiring, true) => WakeLockState::Acquired,
            (WakeLockState::Acquiring, false) => WakeLockState::Released,
            (WakeLockState::Releasing, true) => WakeLockState::Released,
            (WakeLockState::Releasing, false) => WakeLockState::Acquired,
            (settled, _) => settled,
        }
    }
}

/// Outcome of a wakelock toggle or completion, for the session to publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WakeLockUpdate {
    /// New (or restored) held state
    Changed(bool),
    /// Operation failed; state restored to `held`
    Failed { held: bool, reason: String },
}

/// Single-flight wakelock toggle
pub struct WakeLockToggle {
    platform: Box<dyn WakeLock>,
    state: WakeLockState,
    pending: Option<WakeLockCompletion>,
}

impl WakeLockToggle {
    pub fn new(platform: Box<dyn WakeLock>) -> Self {
        Self {
            platform,
            state: WakeLockState::Released,
            pending: None,
        }
    }

    pub fn state(&self) -> WakeLockState {
        self.state
    }

    pub fn is_supported(&self) -> bool {
        self.platform.is_supported()
    }

    /// Starts an acquire or release; `None` when dropped by the single-flight guard
    pub fn toggle(&mut self) -> Option<WakeLockUpdate> {
        if self.state.in_flight() {
            trace!("Wakelock toggle dropped, {:?} in flight", self.state);
            return None;
        }

        if !self.platform.is_supported() {
            error!("{}", WakeLockError::Unsupported);
            self.state = WakeLockState::Released;
            return Some(WakeLockUpdate::Failed {
                held: false,
                reason: WakeLockError::Unsupported.to_string(),
            });
        }

        let (next, completion) = match self.state {
            WakeLockState::Acquired => (WakeLockState::Releasing, self.platform.release()),
            _ => (WakeLockState::Acquiring, self.platform.request()),
        };
        debug!("Wakelock {:?} -> {:?}", self.state, next);
        self.state = next;
        self.pending = Some(completion);
        None
    }

    /// Settles a completed platform operation, if any
    pub fn poll(&mut self) -> Option<WakeLockUpdate> {
        let completion = self.pending.as_mut()?;
        let result = match completion.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Closed) => Err(WakeLockError::Abandoned),
        };
        self.pending = None;

        let previous = self.state;
        self.state = previous.settle(result.is_ok());
        let held = self.state.is_held();

        match result {
            Ok(()) => {
                info!("Wakelock {}", if held { "acquired" } else { "released" });
                Some(WakeLockUpdate::Changed(held))
            }
            Err(e) => {
                error!("Wakelock operation failed during {:?}: {}", previous, e);
                Some(WakeLockUpdate::Failed {
                    held,
                    reason: e.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    type Responder = oneshot::Sender<Result<(), WakeLockError>>;

    // Platform stand-in that hands completion senders back to the test
    #[derive(Clone, Default)]
    pub(crate) struct FakeWakeLock {
        pub requests: Rc<RefCell<VecDeque<Responder>>>,
        pub releases: Rc<RefCell<VecDeque<Responder>>>,
        pub calls: Rc<RefCell<usize>>,
    }

    impl WakeLock for FakeWakeLock {
        fn is_supported(&self) -> bool {
            true
        }

        fn request(&mut self) -> WakeLockCompletion {
            *self.calls.borrow_mut() += 1;
            let (tx, rx) = oneshot::channel();
            self.requests.borrow_mut().push_back(tx);
            rx
        }

        fn release(&mut self) -> WakeLockCompletion {
            *self.calls.borrow_mut() += 1;
            let (tx, rx) = oneshot::channel();
            self.releases.borrow_mut().push_back(tx);
            rx
        }
    }

    fn respond(queue: &Rc<RefCell<VecDeque<Responder>>>, result: Result<(), WakeLockError>) {
        if let Some(tx) = queue.borrow_mut().pop_front() {
            let _ = tx.send(result);
        }
    }

    #[test]
    fn second_toggle_while_in_flight_is_dropped() {
        let fake = FakeWakeLock::default();
        let mut toggle = WakeLockToggle::new(Box::new(fake.clone()));

        assert_eq!(toggle.toggle(), None);
        assert_eq!(toggle.toggle(), None);
        assert_eq!(*fake.calls.borrow(), 1);
        assert_eq!(toggle.state(), WakeLockState::Acquiring);

        assert_eq!(toggle.poll(), None);
        respond(&fake.requests, Ok(()));
        assert_eq!(toggle.poll(), Some(WakeLockUpdate::Changed(true)));
        assert_eq!(toggle.state(), WakeLockState::Acquired);

        toggle.toggle();
        respond(&fake.releases, Ok(()));
        assert_eq!(toggle.poll(), Some(WakeLockUpdate::Changed(false)));
        assert_eq!(*fake.calls.borrow(), 2);
    }

    #[test]
    fn failure_restores_previous_state_and_clears_guard() {
        let fake = FakeWakeLock::default();
        let mut toggle = WakeLockToggle::new(Box::new(fake.clone()));

        toggle.toggle();
        respond(&fake.requests, Err(WakeLockError::Rejected("denied".into())));
        assert!(matches!(
            toggle.poll(),
            Some(WakeLockUpdate::Failed { held: false, .. })
        ));
        assert_eq!(toggle.state(), WakeLockState::Released);

        // Guard cleared, next toggle reaches the platform
        toggle.toggle();
        assert_eq!(*fake.calls.borrow(), 2);
        respond(&fake.requests, Ok(()));
        toggle.poll();

        toggle.toggle();
        respond(&fake.releases, Err(WakeLockError::Rejected("busy".into())));
        assert!(matches!(
            toggle.poll(),
            Some(WakeLockUpdate::Failed { held: true, .. })
        ));
        assert_eq!(toggle.state(), WakeLockState::Acquired);
    }

    #[test]
    fn abandoned_completion_counts_as_failure() {
        let fake = FakeWakeLock::default();
        let mut toggle = WakeLockToggle::new(Box::new(fake.clone()));

        toggle.toggle();
        fake.requests.borrow_mut().clear();
        assert!(matches!(
            toggle.poll(),
            Some(WakeLockUpdate::Failed { held: false, .. })
        ));
        assert!(!toggle.state().in_flight());
    }

    #[test]
    fn unsupported_platform_reports_and_stays_released() {
        let mut toggle = WakeLockToggle::new(Box::new(UnsupportedWakeLock));

        assert!(!toggle.is_supported());
        assert!(matches!(
            toggle.toggle(),
            Some(WakeLockUpdate::Failed { held: false, .. })
        ));
        assert_eq!(toggle.state(), WakeLockState::Released);
        assert_eq!(toggle.poll(), None);
    }
}

//! Lifecycle state machine.
//!
//! Sequences `init -> start -> stop -> destroy` (with intermediate states)
//! for any component implementing [`LifecycleContext`]. The legality of each
//! transition is encoded in a single dispatch per operation rather than a
//! class-per-state hierarchy, so the full table is auditable in one place:
//!
//! | From | Operation | To (success) | To (hook failure) |
//! |---|---|---|---|
//! | `New` | `init` | `Initializing` -> `Initialized` | `Failed` |
//! | `New` | `start` | implicit `init`, then `Started` | `Failed` |
//! | `New` | `stop` | `Stopped` | n/a |
//! | `Initialized` | `start` | `StartingPrep` -> `Starting` -> `Started` | `Failed` |
//! | `Started` | `stop` | `StoppingPrep` -> `Stopping` -> `Stopped` | `Failed` |
//! | `New`/`Initialized`/`Stopped`/`Failed` | `destroy` | `Destroying` -> `Destroyed` | `Failed` |
//! | `Destroyed` | `destroy` | no-op | n/a |
//!
//! Any other `(state, operation)` pair fails with
//! [`LifecycleError::InvalidTransition`] without mutating state.
//!
//! The machine performs no internal synchronization beyond an atomic state
//! word; serializing transitions against each other and against reads of the
//! managed resource is the owning component's job (see
//! [`SessionStore`](crate::store::SessionStore), which holds its writer lock
//! for the duration of every transition).

use crate::error::{BackendError, LifecycleError, LifecycleResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use tracing::debug;

/// The states a lifecycle-managed component moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LifecycleState {
    /// Freshly constructed; nothing has run yet.
    New = 0,
    /// The `do_init` hook is executing.
    Initializing = 1,
    /// Initialization completed.
    Initialized = 2,
    /// A start transition has been accepted.
    StartingPrep = 3,
    /// The `do_start` hook is executing.
    Starting = 4,
    /// The component is running.
    Started = 5,
    /// A stop transition has been accepted.
    StoppingPrep = 6,
    /// The `do_stop` hook is executing.
    Stopping = 7,
    /// The component has stopped.
    Stopped = 8,
    /// The `do_destroy` hook is executing.
    Destroying = 9,
    /// The component has been torn down.
    Destroyed = 10,
    /// A hook raised an error; only `destroy()` is accepted.
    Failed = 11,
}

impl LifecycleState {
    /// The state's canonical name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Initializing => "INITIALIZING",
            Self::Initialized => "INITIALIZED",
            Self::StartingPrep => "STARTING_PREP",
            Self::Starting => "STARTING",
            Self::Started => "STARTED",
            Self::StoppingPrep => "STOPPING_PREP",
            Self::Stopping => "STOPPING",
            Self::Stopped => "STOPPED",
            Self::Destroying => "DESTROYING",
            Self::Destroyed => "DESTROYED",
            Self::Failed => "FAILED",
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::New,
            1 => Self::Initializing,
            2 => Self::Initialized,
            3 => Self::StartingPrep,
            4 => Self::Starting,
            5 => Self::Started,
            6 => Self::StoppingPrep,
            7 => Self::Stopping,
            8 => Self::Stopped,
            9 => Self::Destroying,
            10 => Self::Destroyed,
            _ => Self::Failed,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The four lifecycle operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleOp {
    /// `init()`
    Init,
    /// `start()`
    Start,
    /// `stop()`
    Stop,
    /// `destroy()`
    Destroy,
}

impl fmt::Display for LifecycleOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Init => "init",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Destroy => "destroy",
        })
    }
}

/// The four-hook capability a component exposes to be driven by a
/// [`LifecycleStateMachine`].
#[async_trait]
pub trait LifecycleContext: Send {
    /// Implements the work behind `init()`.
    async fn do_init(&mut self) -> Result<(), BackendError>;

    /// Implements the work behind `start()`.
    async fn do_start(&mut self) -> Result<(), BackendError>;

    /// Implements the work behind `stop()`.
    async fn do_stop(&mut self) -> Result<(), BackendError>;

    /// Implements the work behind `destroy()`.
    async fn do_destroy(&mut self) -> Result<(), BackendError>;
}

/// A handle interested in lifecycle activity.
///
/// Registered listeners are retained and enumerable, but no events are
/// dispatched to them; registration without notification is part of the
/// contract, not an omission.
pub trait LifecycleListener: Send + Sync {
    /// Listener identity, used only for enumeration and diagnostics.
    fn name(&self) -> &str;
}

/// Finite-state controller for a [`LifecycleContext`].
///
/// Transition methods take the context explicitly; the machine holds only
/// the current state and the listener set. The state word is atomic so
/// [`state()`](Self::state) never observes a torn write, even when read from
/// a thread that holds no lock.
pub struct LifecycleStateMachine {
    state: AtomicU8,
    listeners: Mutex<Vec<Arc<dyn LifecycleListener>>>,
}

impl LifecycleStateMachine {
    /// Create a new machine in [`LifecycleState::New`].
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(LifecycleState::New as u8),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Current state.
    pub fn state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Current state's canonical name.
    pub fn state_name(&self) -> &'static str {
        self.state().name()
    }

    fn set_state(&self, state: LifecycleState) {
        debug!(state = %state, "transitioning");
        self.state.store(state as u8, Ordering::Release);
    }

    fn rejected<T>(&self, operation: LifecycleOp) -> LifecycleResult<T> {
        Err(LifecycleError::InvalidTransition {
            state: self.state(),
            operation,
        })
    }

    /// Register a lifecycle listener.
    pub fn add_lifecycle_listener(&self, listener: Arc<dyn LifecycleListener>) {
        self.listeners.lock().push(listener);
    }

    /// Remove a previously registered listener. Unknown handles are ignored.
    pub fn remove_lifecycle_listener(&self, listener: &Arc<dyn LifecycleListener>) {
        self.listeners
            .lock()
            .retain(|registered| !Arc::ptr_eq(registered, listener));
    }

    /// Enumerate the registered listeners.
    pub fn find_lifecycle_listeners(&self) -> Vec<Arc<dyn LifecycleListener>> {
        self.listeners.lock().clone()
    }

    /// Drive the context through `Initializing` into `Initialized`.
    pub async fn init(&self, context: &mut dyn LifecycleContext) -> LifecycleResult<()> {
        match self.state() {
            LifecycleState::New => {
                self.set_state(LifecycleState::Initializing);
                self.run_hook(context, LifecycleOp::Init).await?;
                self.set_state(LifecycleState::Initialized);
                Ok(())
            }
            _ => self.rejected(LifecycleOp::Init),
        }
    }

    /// Drive the context through `StartingPrep` and `Starting` into
    /// `Started`. From `New` this first performs the `init()` transition.
    pub async fn start(&self, context: &mut dyn LifecycleContext) -> LifecycleResult<()> {
        match self.state() {
            LifecycleState::New => {
                self.init(context).await?;
                self.start_from_initialized(context).await
            }
            LifecycleState::Initialized => self.start_from_initialized(context).await,
            _ => self.rejected(LifecycleOp::Start),
        }
    }

    async fn start_from_initialized(
        &self,
        context: &mut dyn LifecycleContext,
    ) -> LifecycleResult<()> {
        self.set_state(LifecycleState::StartingPrep);
        self.set_state(LifecycleState::Starting);
        self.run_hook(context, LifecycleOp::Start).await?;
        self.set_state(LifecycleState::Started);
        Ok(())
    }

    /// Drive the context through `StoppingPrep` and `Stopping` into
    /// `Stopped`. From `New` this moves straight to `Stopped` without
    /// running any hook.
    pub async fn stop(&self, context: &mut dyn LifecycleContext) -> LifecycleResult<()> {
        match self.state() {
            LifecycleState::New => {
                self.set_state(LifecycleState::Stopped);
                Ok(())
            }
            LifecycleState::Started => {
                self.set_state(LifecycleState::StoppingPrep);
                self.set_state(LifecycleState::Stopping);
                self.run_hook(context, LifecycleOp::Stop).await?;
                self.set_state(LifecycleState::Stopped);
                Ok(())
            }
            _ => self.rejected(LifecycleOp::Stop),
        }
    }

    /// Drive the context through `Destroying` into `Destroyed`.
    ///
    /// Accepted from `New`, `Initialized`, `Stopped`, and `Failed`; from
    /// `Destroyed` it is an idempotent no-op. The `do_destroy` hook runs on
    /// every non-no-op path, so a context that releases its resource from an
    /// `Option` releases it exactly once.
    pub async fn destroy(&self, context: &mut dyn LifecycleContext) -> LifecycleResult<()> {
        match self.state() {
            LifecycleState::New
            | LifecycleState::Initialized
            | LifecycleState::Stopped
            | LifecycleState::Failed => {
                self.set_state(LifecycleState::Destroying);
                self.run_hook(context, LifecycleOp::Destroy).await?;
                self.set_state(LifecycleState::Destroyed);
                Ok(())
            }
            LifecycleState::Destroyed => Ok(()),
            _ => self.rejected(LifecycleOp::Destroy),
        }
    }

    async fn run_hook(
        &self,
        context: &mut dyn LifecycleContext,
        operation: LifecycleOp,
    ) -> LifecycleResult<()> {
        let result = match operation {
            LifecycleOp::Init => context.do_init().await,
            LifecycleOp::Start => context.do_start().await,
            LifecycleOp::Stop => context.do_stop().await,
            LifecycleOp::Destroy => context.do_destroy().await,
        };
        if let Err(source) = result {
            self.set_state(LifecycleState::Failed);
            return Err(LifecycleError::Hook { operation, source });
        }
        Ok(())
    }
}

impl Default for LifecycleStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct TestContext {
        calls: Vec<&'static str>,
        fail_on: Option<LifecycleOp>,
    }

    impl TestContext {
        fn failing(op: LifecycleOp) -> Self {
            Self {
                calls: Vec::new(),
                fail_on: Some(op),
            }
        }

        fn hook(&mut self, op: LifecycleOp, label: &'static str) -> Result<(), BackendError> {
            self.calls.push(label);
            if self.fail_on == Some(op) {
                return Err(BackendError::other("hook failure injected"));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl LifecycleContext for TestContext {
        async fn do_init(&mut self) -> Result<(), BackendError> {
            self.hook(LifecycleOp::Init, "init")
        }

        async fn do_start(&mut self) -> Result<(), BackendError> {
            self.hook(LifecycleOp::Start, "start")
        }

        async fn do_stop(&mut self) -> Result<(), BackendError> {
            self.hook(LifecycleOp::Stop, "stop")
        }

        async fn do_destroy(&mut self) -> Result<(), BackendError> {
            self.hook(LifecycleOp::Destroy, "destroy")
        }
    }

    struct NamedListener(&'static str);

    impl LifecycleListener for NamedListener {
        fn name(&self) -> &str {
            self.0
        }
    }

    async fn drive_to(machine: &LifecycleStateMachine, ctx: &mut TestContext, target: LifecycleState) {
        match target {
            LifecycleState::New => {}
            LifecycleState::Initialized => machine.init(ctx).await.unwrap(),
            LifecycleState::Started => machine.start(ctx).await.unwrap(),
            LifecycleState::Stopped => {
                machine.start(ctx).await.unwrap();
                machine.stop(ctx).await.unwrap();
            }
            LifecycleState::Destroyed => machine.destroy(ctx).await.unwrap(),
            LifecycleState::Failed => {
                ctx.fail_on = Some(LifecycleOp::Start);
                machine.start(ctx).await.unwrap_err();
                ctx.fail_on = None;
            }
            other => panic!("cannot drive to {other}"),
        }
        assert_eq!(machine.state(), target);
    }

    #[tokio::test]
    async fn full_cycle_transitions() {
        let machine = LifecycleStateMachine::new();
        let mut ctx = TestContext::default();

        assert_eq!(machine.state(), LifecycleState::New);
        machine.init(&mut ctx).await.unwrap();
        assert_eq!(machine.state(), LifecycleState::Initialized);
        machine.start(&mut ctx).await.unwrap();
        assert_eq!(machine.state(), LifecycleState::Started);
        machine.stop(&mut ctx).await.unwrap();
        assert_eq!(machine.state(), LifecycleState::Stopped);
        machine.destroy(&mut ctx).await.unwrap();
        assert_eq!(machine.state(), LifecycleState::Destroyed);
        assert_eq!(ctx.calls, vec!["init", "start", "stop", "destroy"]);
    }

    #[tokio::test]
    async fn start_from_new_performs_implicit_init() {
        let machine = LifecycleStateMachine::new();
        let mut ctx = TestContext::default();

        machine.start(&mut ctx).await.unwrap();
        assert_eq!(machine.state(), LifecycleState::Started);
        assert_eq!(ctx.calls, vec!["init", "start"]);
    }

    #[tokio::test]
    async fn stop_from_new_skips_hooks() {
        let machine = LifecycleStateMachine::new();
        let mut ctx = TestContext::default();

        machine.stop(&mut ctx).await.unwrap();
        assert_eq!(machine.state(), LifecycleState::Stopped);
        assert!(ctx.calls.is_empty());
    }

    #[tokio::test]
    async fn illegal_transitions_leave_state_unchanged() {
        // Every stable (state, operation) pair outside the table must be
        // rejected without moving the machine.
        let illegal: &[(LifecycleState, LifecycleOp)] = &[
            (LifecycleState::Initialized, LifecycleOp::Init),
            (LifecycleState::Initialized, LifecycleOp::Stop),
            (LifecycleState::Started, LifecycleOp::Init),
            (LifecycleState::Started, LifecycleOp::Start),
            (LifecycleState::Started, LifecycleOp::Destroy),
            (LifecycleState::Stopped, LifecycleOp::Init),
            (LifecycleState::Stopped, LifecycleOp::Start),
            (LifecycleState::Stopped, LifecycleOp::Stop),
            (LifecycleState::Destroyed, LifecycleOp::Init),
            (LifecycleState::Destroyed, LifecycleOp::Start),
            (LifecycleState::Destroyed, LifecycleOp::Stop),
            (LifecycleState::Failed, LifecycleOp::Init),
            (LifecycleState::Failed, LifecycleOp::Start),
            (LifecycleState::Failed, LifecycleOp::Stop),
        ];

        for &(state, op) in illegal {
            let machine = LifecycleStateMachine::new();
            let mut ctx = TestContext::default();
            drive_to(&machine, &mut ctx, state).await;
            let calls_before = ctx.calls.len();

            let err = match op {
                LifecycleOp::Init => machine.init(&mut ctx).await.unwrap_err(),
                LifecycleOp::Start => machine.start(&mut ctx).await.unwrap_err(),
                LifecycleOp::Stop => machine.stop(&mut ctx).await.unwrap_err(),
                LifecycleOp::Destroy => machine.destroy(&mut ctx).await.unwrap_err(),
            };

            assert!(
                matches!(
                    err,
                    LifecycleError::InvalidTransition { state: s, operation: o }
                        if s == state && o == op
                ),
                "unexpected error for {state}->{op}(): {err}"
            );
            assert_eq!(machine.state(), state, "state moved on {state}->{op}()");
            assert_eq!(ctx.calls.len(), calls_before, "hook ran on {state}->{op}()");
        }
    }

    #[tokio::test]
    async fn hook_failure_quarantines_machine() {
        let machine = LifecycleStateMachine::new();
        let mut ctx = TestContext::failing(LifecycleOp::Start);

        let err = machine.start(&mut ctx).await.unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::Hook {
                operation: LifecycleOp::Start,
                ..
            }
        ));
        assert_eq!(machine.state(), LifecycleState::Failed);

        // Only destroy() escapes FAILED.
        ctx.fail_on = None;
        machine.start(&mut ctx).await.unwrap_err();
        machine.stop(&mut ctx).await.unwrap_err();
        assert_eq!(machine.state(), LifecycleState::Failed);
        machine.destroy(&mut ctx).await.unwrap();
        assert_eq!(machine.state(), LifecycleState::Destroyed);
    }

    #[tokio::test]
    async fn destroy_accepted_from_resting_states() {
        for target in [
            LifecycleState::New,
            LifecycleState::Initialized,
            LifecycleState::Stopped,
        ] {
            let machine = LifecycleStateMachine::new();
            let mut ctx = TestContext::default();
            drive_to(&machine, &mut ctx, target).await;
            machine.destroy(&mut ctx).await.unwrap();
            assert_eq!(machine.state(), LifecycleState::Destroyed);
            assert_eq!(ctx.calls.last(), Some(&"destroy"));
        }
    }

    #[tokio::test]
    async fn destroy_is_idempotent_once_destroyed() {
        let machine = LifecycleStateMachine::new();
        let mut ctx = TestContext::default();

        machine.destroy(&mut ctx).await.unwrap();
        machine.destroy(&mut ctx).await.unwrap();
        assert_eq!(machine.state(), LifecycleState::Destroyed);
        // The hook ran exactly once.
        assert_eq!(ctx.calls, vec!["destroy"]);
    }

    #[tokio::test]
    async fn failing_destroy_hook_lands_in_failed() {
        let machine = LifecycleStateMachine::new();
        let mut ctx = TestContext::failing(LifecycleOp::Destroy);

        machine.destroy(&mut ctx).await.unwrap_err();
        assert_eq!(machine.state(), LifecycleState::Failed);
    }

    #[tokio::test]
    async fn listener_registration_round_trip() {
        let machine = LifecycleStateMachine::new();
        let a: Arc<dyn LifecycleListener> = Arc::new(NamedListener("a"));
        let b: Arc<dyn LifecycleListener> = Arc::new(NamedListener("b"));

        machine.add_lifecycle_listener(a.clone());
        machine.add_lifecycle_listener(b.clone());
        assert_eq!(machine.find_lifecycle_listeners().len(), 2);

        machine.remove_lifecycle_listener(&a);
        let remaining = machine.find_lifecycle_listeners();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].name(), "b");
    }

    #[test]
    fn state_names_match_the_table() {
        assert_eq!(LifecycleState::StartingPrep.name(), "STARTING_PREP");
        assert_eq!(LifecycleState::StoppingPrep.to_string(), "STOPPING_PREP");
        assert_eq!(LifecycleOp::Destroy.to_string(), "destroy");
    }
}

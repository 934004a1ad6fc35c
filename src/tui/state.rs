//! UI state machine: named states, lifecycle hooks, transitions.
//!
//! States are process-lifetime values registered once and addressed by
//! [`StateId`]. Exactly one is active at a time. `input()` never switches
//! states itself: it returns a [`Transition`] and the loop applies it,
//! following the Elm/TEA split between describing a change and performing it.
//!
//! Shared data (settings, the source catalog) lives in [`AppContext`] and is
//! passed by reference to every hook.

use tracing::{debug, info};

use crate::error::StateError;
use crate::settings::SettingsStore;
use crate::source::{Source, SourceCatalog};

use super::compositor::Compositor;
use super::key::InputEvent;
use super::toast::{Toast, ToastQueue};

// ============================================================================
// IDS, PAYLOADS, TRANSITIONS
// ============================================================================

/// Every state the application can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateId {
    MainMenu,
    Source,
}

impl StateId {
    pub fn name(self) -> &'static str {
        match self {
            StateId::MainMenu => "mainMenu",
            StateId::Source => "source",
        }
    }
}

/// Data handed to `enter()` / `exit()` during a transition.
#[derive(Debug)]
pub enum Payload {
    /// A source whose provider has already been resolved.
    OpenSource(Source),
}

/// What an `input()` call asks the loop to do next.
#[derive(Debug)]
pub enum Transition {
    /// Remain in the current state.
    Stay,
    /// Exit the current state and enter `target`.
    Switch {
        target: StateId,
        enter: Option<Payload>,
        exit: Option<Payload>,
    },
    /// Stop the loop.
    Quit,
}

impl Transition {
    /// Switch to `target` without payloads.
    pub fn to(target: StateId) -> Self {
        Transition::Switch {
            target,
            enter: None,
            exit: None,
        }
    }

    /// Switch to `target`, handing it `payload` on enter.
    pub fn to_with(target: StateId, payload: Payload) -> Self {
        Transition::Switch {
            target,
            enter: Some(payload),
            exit: None,
        }
    }
}

// ============================================================================
// CONTEXT
// ============================================================================

/// Application-wide data threaded through every state hook.
#[derive(Debug)]
pub struct AppContext {
    pub settings: SettingsStore,
    pub catalog: SourceCatalog,
}

impl AppContext {
    pub fn new(settings: SettingsStore, catalog: SourceCatalog) -> Self {
        AppContext { settings, catalog }
    }
}

// ============================================================================
// STATE CAPABILITY
// ============================================================================

/// One screen of the application.
pub trait State {
    fn id(&self) -> StateId;

    /// Once per process, before any state is entered.
    fn init(&mut self, _ctx: &mut AppContext) {}

    /// Becoming active. Failing here is fatal.
    fn enter(&mut self, ctx: &mut AppContext, payload: Option<Payload>) -> Result<(), StateError>;

    /// Ceasing to be active. Failing here is fatal.
    fn exit(&mut self, _ctx: &mut AppContext, _payload: Option<Payload>) -> Result<(), StateError> {
        Ok(())
    }

    /// Draw the whole screen into `frame`. The loop resets and flushes.
    fn render(&mut self, ctx: &AppContext, frame: &mut Compositor);

    /// Handle one decoded event. Errors are shown to the user, not fatal.
    fn input(&mut self, ctx: &mut AppContext, event: &InputEvent) -> Result<Transition, StateError>;

    /// Toast queue rendered by this state, if it has one.
    fn toasts(&mut self) -> Option<&mut ToastQueue> {
        None
    }
}

// ============================================================================
// MACHINE
// ============================================================================

/// Registry of states plus the id of the active one.
#[derive(Default)]
pub struct StateMachine {
    states: Vec<Box<dyn State>>,
    active: Option<StateId>,
}

impl StateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `state`, replacing any state with the same id.
    pub fn register(&mut self, state: Box<dyn State>) {
        let id = state.id();
        self.states.retain(|s| s.id() != id);
        self.states.push(state);
    }

    /// Run `init()` on every registered state.
    pub fn init_all(&mut self, ctx: &mut AppContext) {
        for state in &mut self.states {
            state.init(ctx);
        }
    }

    pub fn active_id(&self) -> Option<StateId> {
        self.active
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    fn index_of(&self, id: StateId) -> Option<usize> {
        self.states.iter().position(|s| s.id() == id)
    }

    pub fn active_mut(&mut self) -> Option<&mut dyn State> {
        let index = self.index_of(self.active?)?;
        Some(self.states[index].as_mut())
    }

    /// Exit the active state, then enter `target` and make it active.
    ///
    /// If `enter` fails the previously active id is kept.
    pub fn switch_to(
        &mut self,
        ctx: &mut AppContext,
        target: StateId,
        enter: Option<Payload>,
        exit: Option<Payload>,
    ) -> Result<(), StateError> {
        let target_index = self
            .index_of(target)
            .ok_or(StateError::Unregistered(target.name()))?;

        if let Some(state) = self.active_mut() {
            debug!(state = state.id().name(), "exit");
            state.exit(ctx, exit)?;
        }

        debug!(state = target.name(), "enter");
        self.states[target_index].enter(ctx, enter)?;
        self.active = Some(target);
        info!(state = target.name(), "switched state");
        Ok(())
    }

    /// Forward one event to the active state.
    pub fn dispatch(
        &mut self,
        ctx: &mut AppContext,
        event: &InputEvent,
    ) -> Result<Transition, StateError> {
        match self.active_mut() {
            Some(state) => state.input(ctx, event),
            None => Ok(Transition::Stay),
        }
    }

    /// Draw the active state, if any.
    pub fn render(&mut self, ctx: &AppContext, frame: &mut Compositor) {
        if let Some(state) = self.active_mut() {
            state.render(ctx, frame);
        }
    }

    /// Queue `toast` on the active state. Returns false if it owns no queue.
    pub fn push_toast(&mut self, toast: Toast) -> bool {
        match self.active_mut().and_then(|state| state.toasts()) {
            Some(queue) => {
                queue.push(toast);
                true
            }
            None => false,
        }
    }

    /// Exit the active state and leave the machine with none.
    pub fn exit_active(&mut self, ctx: &mut AppContext) -> Result<(), StateError> {
        if let Some(state) = self.active_mut() {
            debug!(state = state.id().name(), "exit");
            state.exit(ctx, None)?;
        }
        self.active = None;
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

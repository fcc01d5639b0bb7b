use super::error::EngineError;
use crate::core::backend::{Backend, Platform, PlatformChoice, Session};
use std::cell::RefCell;
use std::rc::Rc;

/// Platform name that selects the highest-rated platform the backend offers.
pub const FASTEST_PLATFORM: &str = "fastest";

/// A session handle that derived engines may hold at the same time.
pub(crate) type SharedSession<S> = Rc<RefCell<S>>;

/// Lifecycle of an engine's binding to the backend.
///
/// `bind` is the only way into `Ready` and `release` the only way out.
pub(crate) enum SessionSlot<S> {
    Uninitialized,
    Ready(SharedSession<S>),
}

impl<S: Session> SessionSlot<S> {
    pub fn is_ready(&self) -> bool {
        matches!(self, SessionSlot::Ready(_))
    }

    pub fn get(&self) -> Option<&SharedSession<S>> {
        match self {
            SessionSlot::Ready(session) => Some(session),
            SessionSlot::Uninitialized => None,
        }
    }

    pub fn bind(&mut self, session: SharedSession<S>) -> SharedSession<S> {
        *self = SessionSlot::Ready(Rc::clone(&session));
        session
    }

    /// Drops this slot's handle. Returns whether a session was held.
    pub fn release(&mut self) -> bool {
        let was_ready = self.is_ready();
        *self = SessionSlot::Uninitialized;
        was_ready
    }

    pub fn platform_name(&self) -> Option<String> {
        self.get()
            .map(|session| session.borrow().platform().name().to_string())
    }
}

/// Turns a caller's platform preference into a concrete platform.
pub(crate) fn select_platform<B: Backend>(
    backend: &B,
    choice: PlatformChoice,
) -> Result<Platform, EngineError> {
    match choice {
        PlatformChoice::Handle(platform) => Ok(platform),
        PlatformChoice::Default => Ok(backend.default_platform()?),
        PlatformChoice::Named(name) => {
            let resolved = if name == FASTEST_PLATFORM {
                backend.fastest_platform()
            } else {
                backend.resolve_platform(&name)
            };
            resolved.ok_or_else(|| EngineError::PlatformResolution {
                name,
                available: backend.platform_names(),
            })
        }
    }
}

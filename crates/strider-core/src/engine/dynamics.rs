use super::cache::SnapshotCache;
use super::config::{EngineConfiguration, EngineOptions, PartialEngineOptions};
use super::error::EngineError;
use super::persist::PersistedEngine;
use super::session::{self, SessionSlot, SharedSession};
use super::validity;
use crate::core::backend::{Backend, PlatformChoice, Session};
use crate::core::models::snapshot::{EngineId, Snapshot, SnapshotDescriptor};
use crate::core::models::topology::Topology;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, info};

/// Replacements applied when deriving a new engine from an existing one.
///
/// Anything left unset is inherited. Leaving both `integrator` and
/// `backend_properties` unset lets the derived engine reuse a live session.
pub struct EngineOverrides<B: Backend> {
    integrator: Option<Arc<B::Integrator>>,
    backend_properties: Option<BTreeMap<String, String>>,
    options: PartialEngineOptions,
}

impl<B: Backend> Default for EngineOverrides<B> {
    fn default() -> Self {
        Self {
            integrator: None,
            backend_properties: None,
            options: PartialEngineOptions::default(),
        }
    }
}

impl<B: Backend> EngineOverrides<B> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn integrator(mut self, integrator: impl Into<Arc<B::Integrator>>) -> Self {
        self.integrator = Some(integrator.into());
        self
    }
    pub fn backend_properties(mut self, properties: BTreeMap<String, String>) -> Self {
        self.backend_properties = Some(properties);
        self
    }
    pub fn options(mut self, options: PartialEngineOptions) -> Self {
        self.options = options;
        self
    }
}

/// Produces snapshots from a backend session, one frame at a time.
///
/// The session is created on first use and kept until [`reset`](Self::reset).
/// The current snapshot is cached; reads between mutations never reach the
/// backend. Engines are deliberately `!Send` and `!Sync`: a session is a
/// single-threaded resource, so use one engine per thread.
pub struct DynamicsEngine<B: Backend> {
    id: EngineId,
    backend: Arc<B>,
    config: EngineConfiguration<B>,
    session: SessionSlot<B::Session>,
    cache: SnapshotCache,
}

impl<B: Backend> fmt::Debug for DynamicsEngine<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicsEngine")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("platform", &self.platform_name())
            .field("cached", &!self.cache.is_empty())
            .finish()
    }
}

impl<B: Backend> DynamicsEngine<B> {
    pub fn new(backend: Arc<B>, config: EngineConfiguration<B>) -> Self {
        Self {
            id: EngineId::next(),
            backend,
            config,
            session: SessionSlot::Uninitialized,
            cache: SnapshotCache::new(),
        }
    }

    pub fn id(&self) -> EngineId {
        self.id
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub fn configuration(&self) -> &EngineConfiguration<B> {
        &self.config
    }

    pub fn options(&self) -> &EngineOptions {
        self.config.options()
    }

    pub fn topology(&self) -> &Topology {
        self.config.topology()
    }

    pub fn n_steps_per_frame(&self) -> usize {
        self.config.options().n_steps_per_frame
    }

    pub fn n_frames_max(&self) -> Option<usize> {
        self.config.options().n_frames_max
    }

    /// The shape every snapshot written to this engine must have.
    pub fn descriptor(&self) -> SnapshotDescriptor {
        self.config.topology().descriptor()
    }

    pub fn is_initialized(&self) -> bool {
        self.session.is_ready()
    }

    /// Name of the platform the live session runs on, if there is one.
    pub fn platform_name(&self) -> Option<String> {
        self.session.platform_name()
    }

    pub fn available_platforms(&self) -> Vec<String> {
        self.backend.platform_names()
    }

    /// Whether both engines currently hold the same backend session.
    pub fn shares_session_with(&self, other: &Self) -> bool {
        match (self.session.get(), other.session.get()) {
            (Some(mine), Some(theirs)) => Rc::ptr_eq(mine, theirs),
            _ => false,
        }
    }

    /// Creates the backend session if none exists; otherwise does nothing.
    ///
    /// With [`PlatformChoice::Default`] the configured `platform` option is used
    /// when present, and the backend's default platform otherwise.
    pub fn initialize(&mut self, platform: impl Into<PlatformChoice>) -> Result<(), EngineError> {
        self.ensure_session(platform.into()).map(|_| ())
    }

    /// Discards the session and the cached snapshot. The configuration is kept.
    pub fn reset(&mut self) {
        self.cache.invalidate();
        if self.session.release() {
            info!(engine = %self.id, "Released simulation session.");
        }
    }

    fn ensure_session(
        &mut self,
        choice: PlatformChoice,
    ) -> Result<SharedSession<B::Session>, EngineError> {
        if let Some(session) = self.session.get() {
            return Ok(Rc::clone(session));
        }

        let choice = match choice {
            PlatformChoice::Default => self
                .config
                .options()
                .platform
                .clone()
                .map_or(PlatformChoice::Default, PlatformChoice::Named),
            explicit => explicit,
        };
        let platform = session::select_platform(self.backend.as_ref(), choice)?;
        let created = self.backend.create_session(
            self.config.topology(),
            self.config.system(),
            self.config.integrator(),
            &platform,
            self.config.backend_properties(),
        )?;

        info!(
            engine = %self.id,
            platform = %platform,
            "Initialized simulation session."
        );
        Ok(self.session.bind(Rc::new(RefCell::new(created))))
    }

    /// The current state, built from the session only on a cache miss.
    pub fn current_snapshot(&mut self) -> Result<Arc<Snapshot>, EngineError> {
        if let Some(cached) = self.cache.get() {
            return Ok(Arc::clone(cached));
        }
        self.rebuild_snapshot()
    }

    fn rebuild_snapshot(&mut self) -> Result<Arc<Snapshot>, EngineError> {
        let session = self.ensure_session(PlatformChoice::Default)?;
        let state = session.borrow().state()?;
        let snapshot = Arc::new(Snapshot::from_state(state, self.id));
        self.cache.store(Arc::clone(&snapshot));
        debug!(engine = %self.id, "Rebuilt current snapshot from session state.");
        Ok(snapshot)
    }

    fn check_snapshot(&self, snapshot: &Snapshot) -> Result<(), EngineError> {
        let expected = self.descriptor();
        let found = snapshot.descriptor();
        if found.n_spatial != expected.n_spatial {
            return Err(EngineError::DimensionMismatch {
                field: "spatial dimensions",
                expected: expected.n_spatial,
                found: found.n_spatial,
            });
        }
        if found.n_atoms != expected.n_atoms {
            return Err(EngineError::DimensionMismatch {
                field: "coordinates",
                expected: expected.n_atoms,
                found: found.n_atoms,
            });
        }
        if snapshot.velocities().len() != expected.n_atoms {
            return Err(EngineError::DimensionMismatch {
                field: "velocities",
                expected: expected.n_atoms,
                found: snapshot.velocities().len(),
            });
        }
        Ok(())
    }

    /// Pushes `snapshot` into the session and makes it the current state.
    ///
    /// A snapshot built by this engine is cached as-is. Any other snapshot is
    /// only trusted as input: the cache is rebuilt from what the backend holds
    /// after the write, which may differ (e.g. after periodic wrapping).
    pub fn set_current_snapshot(&mut self, snapshot: Arc<Snapshot>) -> Result<(), EngineError> {
        self.check_snapshot(&snapshot)?;
        if self.cache.holds(&snapshot) {
            return Ok(());
        }

        let session = self.ensure_session(PlatformChoice::Default)?;
        self.cache.invalidate();
        {
            let mut session = session.borrow_mut();
            session.set_positions(snapshot.coordinates())?;
            session.set_box_vectors(snapshot.box_vectors())?;
            session.set_velocities(snapshot.velocities())?;
        }

        if snapshot.engine() == Some(self.id) {
            self.cache.store(snapshot);
        } else {
            debug!(
                engine = %self.id,
                origin = ?snapshot.engine(),
                "Snapshot from another origin written; rebuilding cache."
            );
            self.rebuild_snapshot()?;
        }
        Ok(())
    }

    /// Advances the session by `n_steps_per_frame` steps and returns the new state.
    pub fn generate_next_frame(&mut self) -> Result<Arc<Snapshot>, EngineError> {
        let session = self.ensure_session(PlatformChoice::Default)?;
        self.cache.invalidate();
        session.borrow_mut().step(self.n_steps_per_frame())?;
        self.rebuild_snapshot()
    }

    /// Minimizes the session's energy. The next read reflects the minimized state.
    pub fn minimize(&mut self) -> Result<(), EngineError> {
        let session = self.ensure_session(PlatformChoice::Default)?;
        self.cache.invalidate();
        session.borrow_mut().minimize_energy()?;
        debug!(engine = %self.id, "Energy minimization finished.");
        Ok(())
    }

    /// Simulated time between two consecutive frames, in picoseconds.
    pub fn snapshot_timestep(&mut self) -> Result<f64, EngineError> {
        let session = self.ensure_session(PlatformChoice::Default)?;
        let step_size = session.borrow().step_size();
        Ok(self.n_steps_per_frame() as f64 * step_size)
    }

    pub fn is_valid_snapshot(snapshot: &Snapshot) -> bool {
        validity::is_valid_snapshot(snapshot)
    }

    /// Builds a sibling engine that shares this one's topology and system.
    ///
    /// The live session is handed over only when the integrator is unchanged
    /// (absent or pointer-identical) and no backend properties were supplied.
    /// The new engine always starts with an empty cache and its own identity.
    pub fn derive(&self, overrides: EngineOverrides<B>) -> Result<Self, EngineError> {
        let EngineOverrides {
            integrator,
            backend_properties,
            options,
        } = overrides;

        let integrator_unchanged = integrator
            .as_ref()
            .is_none_or(|new| Arc::ptr_eq(new, self.config.integrator()));
        let properties_unchanged = backend_properties.is_none();

        let config = self
            .config
            .with_overrides(integrator, backend_properties, options)?;
        let mut derived = Self::new(Arc::clone(&self.backend), config);

        let reusable = self
            .session
            .get()
            .filter(|_| integrator_unchanged && properties_unchanged);
        if let Some(session) = reusable {
            derived.session.bind(Rc::clone(session));
            debug!(
                from = %self.id,
                to = %derived.id,
                "Derived engine reuses the existing session."
            );
        }
        Ok(derived)
    }

    pub fn to_persisted(&self) -> Result<PersistedEngine, EngineError> {
        PersistedEngine::encode(self.backend.as_ref(), &self.config)
    }

    /// Reconstructs an engine from its persisted configuration, without a session.
    pub fn from_persisted(backend: Arc<B>, record: &PersistedEngine) -> Result<Self, EngineError> {
        let config = record.decode(backend.as_ref())?;
        Ok(Self::new(backend, config))
    }
}

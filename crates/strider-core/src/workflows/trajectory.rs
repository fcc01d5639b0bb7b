use crate::core::backend::Backend;
use crate::core::models::snapshot::Snapshot;
use crate::engine::DynamicsEngine;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Upper bound on the frame buffer reserved up front; longer runs grow it as they go.
const PREALLOCATED_FRAMES: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Every requested frame was generated.
    Completed,
    /// The engine's `n_frames_max` cut the run short.
    FrameLimit,
    /// The frame at this index contains NaN values. It is the last frame returned.
    Diverged { frame: usize },
}

#[derive(Debug, Clone)]
pub struct TrajectoryResult {
    /// The starting state at index 0, followed by one entry per generated frame.
    pub frames: Vec<Arc<Snapshot>>,
    pub stop_reason: StopReason,
}

impl TrajectoryResult {
    /// Number of frames produced by stepping, excluding the starting state.
    pub fn generated(&self) -> usize {
        self.frames.len().saturating_sub(1)
    }

    pub fn is_complete(&self) -> bool {
        self.stop_reason == StopReason::Completed
    }
}

#[instrument(skip_all, name = "trajectory_workflow")]
pub fn run<B: Backend>(
    engine: &mut DynamicsEngine<B>,
    initial: Option<Arc<Snapshot>>,
    n_frames: usize,
    reporter: &ProgressReporter,
) -> Result<TrajectoryResult, EngineError> {
    if let Some(snapshot) = initial {
        engine.set_current_snapshot(snapshot)?;
    }
    let start = engine.current_snapshot()?;

    let (target, limited) = match engine.n_frames_max() {
        Some(max) if n_frames > max => (max, true),
        _ => (n_frames, false),
    };
    if limited {
        info!(
            requested = n_frames,
            limit = target,
            "Requested frame count exceeds n_frames_max; truncating."
        );
        reporter.report(Progress::Message(format!(
            "Limiting run to {} of {} requested frames",
            target, n_frames
        )));
    }

    info!(
        frames = target,
        steps_per_frame = engine.n_steps_per_frame(),
        "Starting trajectory generation."
    );
    reporter.report(Progress::TrajectoryStart {
        total_frames: target as u64,
    });

    let mut frames = Vec::with_capacity(target.min(PREALLOCATED_FRAMES).saturating_add(1));
    frames.push(start);
    let mut stop_reason = if limited {
        StopReason::FrameLimit
    } else {
        StopReason::Completed
    };

    for index in 1..=target {
        let frame = engine.generate_next_frame()?;
        let valid = DynamicsEngine::<B>::is_valid_snapshot(&frame);
        frames.push(frame);
        reporter.report(Progress::FrameGenerated { frame: index });

        if !valid {
            warn!(frame = index, "Trajectory diverged: frame contains NaN values.");
            reporter.report(Progress::Diverged { frame: index });
            stop_reason = StopReason::Diverged { frame: index };
            break;
        }
    }

    reporter.report(Progress::TrajectoryFinish);
    info!(
        generated = frames.len() - 1,
        reason = ?stop_reason,
        "Trajectory generation finished."
    );
    Ok(TrajectoryResult {
        frames,
        stop_reason,
    })
}

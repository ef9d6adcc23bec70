//! Animated view transitions and their completion signals.
//!
//! Every animated view change hands the caller an [`AnimationHandle`]. The
//! handle resolves exactly once: `Completed` when the transition ran to its
//! end, `Superseded` when a later view change replaced it, `Cancelled` when
//! the owning view went away. A handle is never left pending forever because
//! dropping the sending half resolves it as `Cancelled`.

use crate::animation::easing::EasingType;
use crate::core::geo::Coordinate;
use futures::channel::oneshot;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

/// How an animated view change ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationOutcome {
    Completed,
    Superseded,
    Cancelled,
}

impl AnimationOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, AnimationOutcome::Completed)
    }
}

/// Awaitable completion signal of one view change.
#[derive(Debug)]
pub struct AnimationHandle {
    receiver: oneshot::Receiver<AnimationOutcome>,
    outcome: Option<AnimationOutcome>,
}

impl AnimationHandle {
    pub(crate) fn pair() -> (Completion, AnimationHandle) {
        let (sender, receiver) = oneshot::channel();
        (
            Completion {
                sender: Some(sender),
            },
            AnimationHandle {
                receiver,
                outcome: None,
            },
        )
    }

    /// A handle that is already resolved, used for immediate view changes.
    pub(crate) fn resolved(outcome: AnimationOutcome) -> AnimationHandle {
        let (mut completion, handle) = Self::pair();
        completion.resolve(outcome);
        handle
    }

    /// Non-blocking check; `None` while the transition is still running.
    pub fn try_outcome(&mut self) -> Option<AnimationOutcome> {
        if self.outcome.is_none() {
            self.outcome = match self.receiver.try_recv() {
                Ok(outcome) => outcome,
                Err(oneshot::Canceled) => Some(AnimationOutcome::Cancelled),
            };
        }
        self.outcome
    }

    pub fn is_pending(&mut self) -> bool {
        self.try_outcome().is_none()
    }
}

impl Future for AnimationHandle {
    type Output = AnimationOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some(outcome) = self.outcome {
            return Poll::Ready(outcome);
        }
        let polled = Pin::new(&mut self.receiver).poll(cx);
        polled.map(|result| {
            let outcome = result.unwrap_or(AnimationOutcome::Cancelled);
            self.outcome = Some(outcome);
            outcome
        })
    }
}

/// Sending half of an [`AnimationHandle`], owned by the running transition.
#[derive(Debug)]
pub(crate) struct Completion {
    sender: Option<oneshot::Sender<AnimationOutcome>>,
}

impl Completion {
    pub(crate) fn resolve(&mut self, outcome: AnimationOutcome) {
        if let Some(sender) = self.sender.take() {
            // The caller may have dropped its handle; nobody is listening then.
            let _ = sender.send(outcome);
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        self.resolve(AnimationOutcome::Cancelled);
    }
}

/// Interpolated view values for one animation frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionFrame {
    pub center: Coordinate,
    pub zoom: f64,
    pub rotation: f64,
    pub finished: bool,
}

/// A running center/zoom/rotation animation.
#[derive(Debug)]
pub struct Transition {
    from_center: Coordinate,
    to_center: Coordinate,
    from_zoom: f64,
    to_zoom: f64,
    from_rotation: f64,
    to_rotation: f64,
    duration: Duration,
    elapsed: Duration,
    easing: EasingType,
    completion: Completion,
}

impl Transition {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        from_center: Coordinate,
        to_center: Coordinate,
        from_zoom: f64,
        to_zoom: f64,
        from_rotation: f64,
        to_rotation: f64,
        duration: Duration,
        completion: Completion,
    ) -> Self {
        Self {
            from_center,
            to_center,
            from_zoom,
            to_zoom,
            from_rotation,
            to_rotation,
            duration,
            elapsed: Duration::ZERO,
            easing: EasingType::default(),
            completion,
        }
    }

    pub fn with_easing(mut self, easing: EasingType) -> Self {
        self.easing = easing;
        self
    }

    pub fn target_center(&self) -> Coordinate {
        self.to_center
    }

    pub fn target_zoom(&self) -> f64 {
        self.to_zoom
    }

    pub fn progress(&self) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0)
    }

    /// Advances the clock and returns the frame to apply.
    pub fn step(&mut self, dt: Duration) -> TransitionFrame {
        self.elapsed = (self.elapsed + dt).min(self.duration);
        let t = self.progress();
        if t >= 1.0 {
            return TransitionFrame {
                center: self.to_center,
                zoom: self.to_zoom,
                rotation: self.to_rotation,
                finished: true,
            };
        }
        TransitionFrame {
            center: self.easing.interpolate(&self.from_center, &self.to_center, t),
            zoom: self.easing.interpolate(&self.from_zoom, &self.to_zoom, t),
            rotation: self.easing.interpolate(&self.from_rotation, &self.to_rotation, t),
            finished: t >= 1.0,
        }
    }

    /// Ends the transition, resolving its handle with `outcome`.
    pub(crate) fn finish(mut self, outcome: AnimationOutcome) {
        self.completion.resolve(outcome);
    }
}

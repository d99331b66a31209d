//! Generation stage sequencer.
//!
//! `StageSequencer` is the state machine: `idle → thinking → searching →
//! responding → idle`, one step at a time, never skipping. Each started turn
//! gets a fresh number and every event carries the turn it belongs to, so an
//! event from a cancelled turn can never move the stage.
//!
//! `StageTimer` is one event source for it: a background task that posts
//! `StageTick`s at a fixed interval. A transport-backed session feeds the
//! same machine through `complete()` instead.

use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::models::GenerationStage;

/// Identifies one generation turn.
pub type Turn = u64;

/// Ticks needed to walk thinking → searching → responding → idle.
pub const STAGE_STEPS: usize = 3;

#[derive(Debug, Error, PartialEq)]
pub enum StageError {
    #[error("Generation already in progress (stage: {0})")]
    AlreadyRunning(GenerationStage),
}

/// Outcome of feeding one tick to the sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStep {
    /// Moved forward into this stage.
    Entered(GenerationStage),
    /// Left `responding`; the turn is over and the stage is `idle`.
    Complete,
    /// Stale turn or idle sequencer; nothing changed.
    Ignored,
}

#[derive(Debug, Default)]
pub struct StageSequencer {
    stage: GenerationStage,
    turn: Turn,
}

impl StageSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> GenerationStage {
        self.stage
    }

    /// The running turn, if any.
    pub fn active_turn(&self) -> Option<Turn> {
        (!self.stage.is_idle()).then_some(self.turn)
    }

    /// Begin a turn. Only valid from `idle`.
    pub fn start(&mut self) -> Result<Turn, StageError> {
        if !self.stage.is_idle() {
            return Err(StageError::AlreadyRunning(self.stage));
        }
        self.turn += 1;
        self.stage = GenerationStage::Thinking;
        Ok(self.turn)
    }

    /// Move one stage forward within `turn`.
    pub fn advance(&mut self, turn: Turn) -> StageStep {
        if self.active_turn() != Some(turn) {
            return StageStep::Ignored;
        }

        self.stage = self.stage.next();
        if self.stage.is_idle() {
            StageStep::Complete
        } else {
            StageStep::Entered(self.stage)
        }
    }

    /// Finish `turn` now, walking every remaining stage in order.
    ///
    /// Returns the stages entered, ending with `Idle`, or an empty path when
    /// `turn` is not the running one.
    pub fn complete(&mut self, turn: Turn) -> Vec<GenerationStage> {
        let mut path = Vec::new();
        if self.active_turn() != Some(turn) {
            return path;
        }
        loop {
            self.stage = self.stage.next();
            path.push(self.stage);
            if self.stage.is_idle() {
                return path;
            }
        }
    }

    /// Abort the running turn. Returns `false` when already idle.
    pub fn cancel(&mut self) -> bool {
        if self.stage.is_idle() {
            return false;
        }
        self.stage = GenerationStage::Idle;
        true
    }
}

/// Timer event: "advance `turn` by one stage".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTick {
    pub turn: Turn,
}

/// Background task posting `STAGE_STEPS` ticks, `delay` apart.
pub struct StageTimer {
    task: Option<JoinHandle<()>>,
}

impl StageTimer {
    pub fn schedule<E>(turn: Turn, delay: Duration, events: mpsc::UnboundedSender<E>) -> Self
    where
        E: From<StageTick> + Send + 'static,
    {
        let task = tokio::spawn(async move {
            for _ in 0..STAGE_STEPS {
                tokio::time::sleep(delay).await;
                if events.send(StageTick { turn }.into()).is_err() {
                    return;
                }
            }
        });

        Self { task: Some(task) }
    }

    /// Stop posting ticks. Returns `true` only on the call that stopped it.
    pub fn cancel(&mut self) -> bool {
        match self.task.take() {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for StageTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use GenerationStage::*;

    #[test]
    fn full_turn_walks_every_stage() {
        let mut seq = StageSequencer::new();
        let turn = seq.start().unwrap();
        assert_eq!(seq.stage(), Thinking);
        assert_eq!(seq.advance(turn), StageStep::Entered(Searching));
        assert_eq!(seq.advance(turn), StageStep::Entered(Responding));
        assert_eq!(seq.advance(turn), StageStep::Complete);
        assert_eq!(seq.stage(), Idle);
        assert_eq!(seq.active_turn(), None);
    }

    #[test]
    fn start_rejected_from_every_active_stage() {
        let mut seq = StageSequencer::new();
        let turn = seq.start().unwrap();
        for _ in 0..3 {
            let stage = seq.stage();
            assert_eq!(seq.start(), Err(StageError::AlreadyRunning(stage)));
            // Rejection leaves the running turn untouched.
            assert_eq!(seq.active_turn(), Some(turn));
            seq.advance(turn);
        }
        assert!(seq.start().is_ok());
    }

    #[test]
    fn cancel_from_any_active_stage_returns_to_idle() {
        for ticks in 0..3 {
            let mut seq = StageSequencer::new();
            let turn = seq.start().unwrap();
            for _ in 0..ticks {
                seq.advance(turn);
            }
            assert!(seq.cancel());
            assert_eq!(seq.stage(), Idle);
            // Late ticks from the cancelled turn are ignored.
            assert_eq!(seq.advance(turn), StageStep::Ignored);
            assert_eq!(seq.stage(), Idle);
        }
    }

    #[test]
    fn cancel_twice_equals_cancel_once() {
        let mut seq = StageSequencer::new();
        seq.start().unwrap();
        assert!(seq.cancel());
        assert!(!seq.cancel());
        assert_eq!(seq.stage(), Idle);
    }

    #[test]
    fn stale_tick_does_not_move_new_turn() {
        let mut seq = StageSequencer::new();
        let old = seq.start().unwrap();
        seq.cancel();
        let new = seq.start().unwrap();
        assert_ne!(old, new);

        assert_eq!(seq.advance(old), StageStep::Ignored);
        assert_eq!(seq.stage(), Thinking);
    }

    #[test]
    fn complete_walks_remaining_stages_in_order() {
        let mut seq = StageSequencer::new();
        let turn = seq.start().unwrap();
        assert_eq!(seq.complete(turn), vec![Searching, Responding, Idle]);

        let turn = seq.start().unwrap();
        seq.advance(turn);
        seq.advance(turn);
        assert_eq!(seq.complete(turn), vec![Idle]);
    }

    #[test]
    fn complete_on_idle_or_stale_turn_is_empty() {
        let mut seq = StageSequencer::new();
        assert!(seq.complete(1).is_empty());

        let turn = seq.start().unwrap();
        assert!(seq.complete(turn + 1).is_empty());
        assert_eq!(seq.stage(), Thinking);
    }

    #[tokio::test(start_paused = true)]
    async fn timer_posts_three_ticks_at_fixed_interval() {
        let (tx, mut rx) = mpsc::unbounded_channel::<StageTick>();
        let start = tokio::time::Instant::now();
        let _timer = StageTimer::schedule(7, Duration::from_millis(1500), tx);

        for i in 1..=STAGE_STEPS as u32 {
            let tick = rx.recv().await.unwrap();
            assert_eq!(tick, StageTick { turn: 7 });
            let expected = Duration::from_millis(1500) * i;
            let elapsed = start.elapsed();
            assert!(elapsed >= expected && elapsed < expected + Duration::from_millis(50));
        }
        // Sender dropped with the finished task.
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_posts_nothing_more() {
        let (tx, mut rx) = mpsc::unbounded_channel::<StageTick>();
        let mut timer = StageTimer::schedule(1, Duration::from_secs(1), tx);

        assert!(rx.recv().await.is_some());
        assert!(timer.cancel());
        assert!(!timer.cancel());
        assert!(!timer.is_active());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(rx.recv().await.is_none());
    }
}

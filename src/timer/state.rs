use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::modes::FocusModeDefinition;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TimerPhase {
    Idle,
    Running,
    Paused,
    Break,
}

impl Default for TimerPhase {
    fn default() -> Self {
        TimerPhase::Idle
    }
}

impl TimerPhase {
    /// Phases during which the one-second clock must be armed.
    pub fn is_ticking(self) -> bool {
        matches!(self, TimerPhase::Running | TimerPhase::Break)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TimerPhase::Idle => "idle",
            TimerPhase::Running => "running",
            TimerPhase::Paused => "paused",
            TimerPhase::Break => "break",
        }
    }
}

/// Outcome of feeding one command or tick into a [`TimerSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The command has no transition from the current phase; nothing changed.
    Ignored,
    Applied { from: TimerPhase, to: TimerPhase },
}

impl Transition {
    pub fn is_applied(&self) -> bool {
        matches!(self, Transition::Applied { .. })
    }

    /// `Some((from, to))` only when the phase actually changed.
    pub fn phase_change(&self) -> Option<(TimerPhase, TimerPhase)> {
        match *self {
            Transition::Applied { from, to } if from != to => Some((from, to)),
            _ => None,
        }
    }

    /// True for the Running -> Break edge, the only one that awards points.
    pub fn completed_study(&self) -> bool {
        self.phase_change() == Some((TimerPhase::Running, TimerPhase::Break))
    }
}

/// Read-only view of a session handed to the rendering layer.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub session_id: String,
    pub opened_at: DateTime<Utc>,
    pub mode_id: String,
    pub mode_name: String,
    pub phase: TimerPhase,
    pub selected_duration: u64,
    pub remaining: u64,
    pub display_time: String,
    pub progress_fraction: f64,
    pub completed_count: u32,
    pub points_earned: u64,
    pub session_number: u32,
}

/// Study/break countdown for one opened timer view. All durations are seconds.
#[derive(Debug, Clone)]
pub struct TimerSession {
    id: String,
    opened_at: DateTime<Utc>,
    mode: Arc<FocusModeDefinition>,
    selected_duration: u64,
    remaining: u64,
    phase: TimerPhase,
    completed_count: u32,
}

impl TimerSession {
    pub fn new(mode: Arc<FocusModeDefinition>) -> Self {
        let selected_duration = mode.study_secs;
        Self {
            id: Uuid::new_v4().to_string(),
            opened_at: Utc::now(),
            mode,
            selected_duration,
            remaining: selected_duration,
            phase: TimerPhase::Idle,
            completed_count: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn mode(&self) -> &FocusModeDefinition {
        &self.mode
    }

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn selected_duration(&self) -> u64 {
        self.selected_duration
    }

    pub fn completed_count(&self) -> u32 {
        self.completed_count
    }

    pub fn is_ticking(&self) -> bool {
        self.phase.is_ticking()
    }

    pub fn start(&mut self) -> Transition {
        match self.phase {
            TimerPhase::Idle => self.enter(TimerPhase::Running),
            _ => Transition::Ignored,
        }
    }

    pub fn pause(&mut self) -> Transition {
        match self.phase {
            TimerPhase::Running => self.enter(TimerPhase::Paused),
            _ => Transition::Ignored,
        }
    }

    pub fn resume(&mut self) -> Transition {
        match self.phase {
            TimerPhase::Paused => self.enter(TimerPhase::Running),
            _ => Transition::Ignored,
        }
    }

    /// Abandons the current phase without credit.
    pub fn reset(&mut self) -> Transition {
        match self.phase {
            TimerPhase::Idle => Transition::Ignored,
            _ => self.return_to_idle(),
        }
    }

    pub fn skip_break(&mut self) -> Transition {
        match self.phase {
            TimerPhase::Break => self.return_to_idle(),
            _ => Transition::Ignored,
        }
    }

    /// Picks a new study length. Only honoured while idle and only for a
    /// length the mode offers.
    pub fn select_duration(&mut self, secs: u64) -> Transition {
        if self.phase != TimerPhase::Idle || !self.mode.allows_duration(secs) {
            return Transition::Ignored;
        }
        self.selected_duration = secs;
        self.remaining = secs;
        Transition::Applied {
            from: TimerPhase::Idle,
            to: TimerPhase::Idle,
        }
    }

    /// Advances the countdown by one second.
    pub fn tick(&mut self) -> Transition {
        match self.phase {
            TimerPhase::Running if self.remaining > 1 => {
                self.remaining -= 1;
                self.stay()
            }
            TimerPhase::Running => {
                self.completed_count = self.completed_count.saturating_add(1);
                self.remaining = self.mode.break_secs;
                self.enter(TimerPhase::Break)
            }
            TimerPhase::Break if self.remaining > 1 => {
                self.remaining -= 1;
                self.stay()
            }
            TimerPhase::Break => self.return_to_idle(),
            TimerPhase::Idle | TimerPhase::Paused => Transition::Ignored,
        }
    }

    pub fn current_phase_duration(&self) -> u64 {
        match self.phase {
            TimerPhase::Break => self.mode.break_secs,
            _ => self.selected_duration,
        }
    }

    pub fn progress_fraction(&self) -> f64 {
        let total = self.current_phase_duration();
        if total == 0 {
            return 1.0;
        }
        let elapsed = total.saturating_sub(self.remaining);
        (elapsed as f64 / total as f64).clamp(0.0, 1.0)
    }

    pub fn display_time(&self) -> String {
        format_clock(self.remaining)
    }

    pub fn points_earned(&self) -> u64 {
        u64::from(self.completed_count) * u64::from(self.mode.points)
    }

    /// 1-based number of the study phase in progress, as shown in the view.
    pub fn session_number(&self) -> u32 {
        self.completed_count.saturating_add(1)
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            session_id: self.id.clone(),
            opened_at: self.opened_at,
            mode_id: self.mode.id.clone(),
            mode_name: self.mode.name.clone(),
            phase: self.phase,
            selected_duration: self.selected_duration,
            remaining: self.remaining,
            display_time: self.display_time(),
            progress_fraction: self.progress_fraction(),
            completed_count: self.completed_count,
            points_earned: self.points_earned(),
            session_number: self.session_number(),
        }
    }

    fn return_to_idle(&mut self) -> Transition {
        self.remaining = self.selected_duration;
        self.enter(TimerPhase::Idle)
    }

    fn enter(&mut self, next: TimerPhase) -> Transition {
        let from = self.phase;
        self.phase = next;
        Transition::Applied { from, to: next }
    }

    fn stay(&self) -> Transition {
        Transition::Applied {
            from: self.phase,
            to: self.phase,
        }
    }
}

/// Formats seconds as zero-padded `MM:SS`; minutes are not capped at 99.
pub fn format_clock(total_secs: u64) -> String {
    format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mode(study: u64, brk: u64, points: u32) -> Arc<FocusModeDefinition> {
        Arc::new(FocusModeDefinition::new("test", "Test", study, brk, points))
    }

    fn pomodoro() -> Arc<FocusModeDefinition> {
        Arc::new(
            FocusModeDefinition::new("pomodoro", "Pomodoro", 25 * 60, 5 * 60, 20)
                .with_duration_minutes(&[25]),
        )
    }

    fn deep_focus() -> Arc<FocusModeDefinition> {
        Arc::new(
            FocusModeDefinition::new("deep-focus", "Deep Focus", 60 * 60, 10 * 60, 30)
                .with_duration_minutes(&[60, 75, 90]),
        )
    }

    fn tick_n(session: &mut TimerSession, n: u64) {
        for _ in 0..n {
            session.tick();
        }
    }

    #[test]
    fn test_new_session_is_idle_at_full_duration() {
        let session = TimerSession::new(pomodoro());
        assert_eq!(session.phase(), TimerPhase::Idle);
        assert_eq!(session.remaining(), 1500);
        assert_eq!(session.selected_duration(), 1500);
        assert_eq!(session.completed_count(), 0);
        assert_eq!(session.display_time(), "25:00");
        assert_eq!(session.session_number(), 1);
    }

    #[test]
    fn test_pomodoro_cycle_scenario() {
        let mut session = TimerSession::new(pomodoro());
        session.start();
        tick_n(&mut session, 1500);

        assert_eq!(session.phase(), TimerPhase::Break);
        assert_eq!(session.remaining(), 300);
        assert_eq!(session.completed_count(), 1);
        assert_eq!(session.points_earned(), 20);

        assert!(session.skip_break().is_applied());
        assert_eq!(session.phase(), TimerPhase::Idle);
        assert_eq!(session.remaining(), 1500);
        assert_eq!(session.completed_count(), 1);
    }

    #[test]
    fn test_ticking_full_duration_completes_exactly_once() {
        for duration in [1u64, 2, 7, 60] {
            let mut session = TimerSession::new(mode(duration, 4, 10));
            session.start();

            let mut completions = 0;
            for _ in 0..duration {
                if session.tick().completed_study() {
                    completions += 1;
                }
            }

            assert_eq!(completions, 1, "duration {duration}");
            assert_eq!(session.phase(), TimerPhase::Break);
            assert_eq!(session.remaining(), 4);
            assert_eq!(session.completed_count(), 1);
        }
    }

    #[test]
    fn test_break_runs_out_to_idle() {
        let mut session = TimerSession::new(mode(3, 2, 5));
        session.start();
        tick_n(&mut session, 3);
        assert_eq!(session.phase(), TimerPhase::Break);

        session.tick();
        assert_eq!(session.phase(), TimerPhase::Break);
        assert_eq!(session.remaining(), 1);

        let transition = session.tick();
        assert_eq!(
            transition.phase_change(),
            Some((TimerPhase::Break, TimerPhase::Idle))
        );
        assert_eq!(session.remaining(), 3);
        assert_eq!(session.completed_count(), 1);
    }

    #[test]
    fn test_reset_from_every_active_phase() {
        let mut running = TimerSession::new(mode(10, 5, 1));
        running.start();
        tick_n(&mut running, 4);

        let mut paused = running.clone();
        paused.pause();

        let mut on_break = TimerSession::new(mode(10, 5, 1));
        on_break.start();
        tick_n(&mut on_break, 11);
        assert_eq!(on_break.phase(), TimerPhase::Break);

        for mut session in [running, paused, on_break] {
            let before = session.completed_count();
            assert!(session.reset().is_applied());
            assert_eq!(session.phase(), TimerPhase::Idle);
            assert_eq!(session.remaining(), 10);
            assert_eq!(session.completed_count(), before);
        }
    }

    #[test]
    fn test_reset_while_idle_is_ignored() {
        let mut session = TimerSession::new(mode(10, 5, 1));
        assert_eq!(session.reset(), Transition::Ignored);
    }

    #[test]
    fn test_pause_twice_is_idempotent() {
        let mut session = TimerSession::new(mode(10, 5, 1));
        session.start();
        tick_n(&mut session, 2);

        assert!(session.pause().is_applied());
        let remaining = session.remaining();
        assert_eq!(session.pause(), Transition::Ignored);
        assert_eq!(session.phase(), TimerPhase::Paused);
        assert_eq!(session.remaining(), remaining);
    }

    #[test]
    fn test_duplicate_commands_are_no_ops() {
        let mut session = TimerSession::new(mode(10, 5, 1));
        session.start();
        assert_eq!(session.start(), Transition::Ignored);
        assert_eq!(session.resume(), Transition::Ignored);
        assert_eq!(session.skip_break(), Transition::Ignored);
        assert_eq!(session.phase(), TimerPhase::Running);
        assert_eq!(session.remaining(), 10);

        let mut idle = TimerSession::new(mode(10, 5, 1));
        assert_eq!(idle.pause(), Transition::Ignored);
        assert_eq!(idle.resume(), Transition::Ignored);
        assert_eq!(idle.skip_break(), Transition::Ignored);
        assert_eq!(idle.phase(), TimerPhase::Idle);
    }

    #[test]
    fn test_paused_and_idle_ignore_ticks() {
        let mut session = TimerSession::new(mode(10, 5, 1));
        assert_eq!(session.tick(), Transition::Ignored);
        assert_eq!(session.remaining(), 10);

        session.start();
        session.tick();
        session.pause();
        assert_eq!(session.tick(), Transition::Ignored);
        assert_eq!(session.remaining(), 9);

        session.resume();
        session.tick();
        assert_eq!(session.remaining(), 8);
    }

    #[test]
    fn test_select_duration_only_while_idle() {
        let mut session = TimerSession::new(deep_focus());
        assert!(session.select_duration(90 * 60).is_applied());
        assert_eq!(session.remaining(), 5400);
        assert_eq!(session.selected_duration(), 5400);

        session.start();
        assert_eq!(session.select_duration(60 * 60), Transition::Ignored);
        assert_eq!(session.selected_duration(), 5400);
        assert_eq!(session.remaining(), 5400);
    }

    #[test]
    fn test_select_duration_rejects_unlisted_lengths() {
        let mut session = TimerSession::new(pomodoro());
        assert_eq!(session.select_duration(45 * 60), Transition::Ignored);
        assert_eq!(session.select_duration(0), Transition::Ignored);
        assert_eq!(session.remaining(), 1500);
    }

    #[test]
    fn test_break_returns_to_selected_duration() {
        let mut session = TimerSession::new(deep_focus());
        session.select_duration(75 * 60);
        session.start();
        tick_n(&mut session, 75 * 60);
        assert_eq!(session.phase(), TimerPhase::Break);
        assert_eq!(session.remaining(), 600);

        // duration picks during the break are refused
        assert_eq!(session.select_duration(90 * 60), Transition::Ignored);

        tick_n(&mut session, 600);
        assert_eq!(session.phase(), TimerPhase::Idle);
        assert_eq!(session.remaining(), 4500);
    }

    #[test]
    fn test_progress_fraction() {
        let mut session = TimerSession::new(mode(4, 2, 1));
        assert_eq!(session.progress_fraction(), 0.0);

        session.start();
        assert_eq!(session.progress_fraction(), 0.0);
        session.tick();
        assert!((session.progress_fraction() - 0.25).abs() < f64::EPSILON);
        tick_n(&mut session, 2);
        assert_eq!(session.remaining(), 1);
        assert!((session.progress_fraction() - 0.75).abs() < f64::EPSILON);

        session.tick();
        assert_eq!(session.phase(), TimerPhase::Break);
        assert_eq!(session.progress_fraction(), 0.0);
        session.tick();
        assert!((session.progress_fraction() - 0.5).abs() < f64::EPSILON);

        for _ in 0..50 {
            session.tick();
            let progress = session.progress_fraction();
            assert!((0.0..=1.0).contains(&progress));
        }
    }

    #[test]
    fn test_points_follow_completed_count() {
        let mut session = TimerSession::new(mode(2, 1, 15));
        for cycle in 1..=3u32 {
            session.start();
            tick_n(&mut session, 2);
            assert_eq!(session.completed_count(), cycle);
            assert_eq!(session.points_earned(), u64::from(cycle) * 15);
            session.tick();
            assert_eq!(session.phase(), TimerPhase::Idle);
        }

        session.start();
        session.tick();
        session.reset();
        assert_eq!(session.points_earned(), 45);
        assert_eq!(session.session_number(), 4);
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(59), "00:59");
        assert_eq!(format_clock(300), "05:00");
        assert_eq!(format_clock(5400), "90:00");
        assert_eq!(format_clock(100 * 60 + 5), "100:05");
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let mut session = TimerSession::new(pomodoro());
        session.start();
        session.tick();

        let snapshot = session.snapshot();
        assert_eq!(snapshot.display_time, "24:59");
        assert_eq!(snapshot.phase, TimerPhase::Running);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["modeId"], "pomodoro");
        assert_eq!(json["phase"], "running");
        assert_eq!(json["remaining"], 1499);
        assert_eq!(json["pointsEarned"], 0);
        assert_eq!(json["sessionNumber"], 1);
    }
}

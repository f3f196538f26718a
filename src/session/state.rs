use crate::domain::views::format_clock;
use crate::domain::{flatten_leaves, Subtask, Task};
use crate::ticker::timer_seconds;

/// Default break length in minutes
pub const DEFAULT_BREAK_MINUTES: i64 = 5;

/// Where the session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Closed,
    Work { paused: bool },
    Break { paused: bool },
}

impl SessionPhase {
    pub fn is_paused(&self) -> bool {
        match self {
            SessionPhase::Closed => true,
            SessionPhase::Work { paused } | SessionPhase::Break { paused } => *paused,
        }
    }

    pub fn is_running(&self) -> bool {
        !self.is_paused()
    }

    pub fn is_break(&self) -> bool {
        matches!(self, SessionPhase::Break { .. })
    }

    /// Same mode with the pause flag replaced
    fn with_paused(self, paused: bool) -> Self {
        match self {
            SessionPhase::Closed => SessionPhase::Closed,
            SessionPhase::Work { .. } => SessionPhase::Work { paused },
            SessionPhase::Break { .. } => SessionPhase::Break { paused },
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SessionPhase::Closed => "closed",
            SessionPhase::Work { paused: true } => "work (paused)",
            SessionPhase::Work { paused: false } => "work",
            SessionPhase::Break { paused: true } => "break (paused)",
            SessionPhase::Break { paused: false } => "break",
        }
    }
}

/// Work timer saved while on a break
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSnapshot {
    pub remaining_seconds: u32,
    pub total_seconds: u32,
}

/// Observable state of a focus session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusState {
    pub phase: SessionPhase,
    pub task_id: Option<String>,
    pub task_title: String,
    pub subtask_title: Option<String>,
    /// Index of the current leaf in the session's leaf snapshot
    pub subtask_index: usize,
    pub total_leaves: usize,
    pub completed_subtasks: usize,
    pub total_seconds: u32,
    pub remaining_seconds: u32,
    pub break_seconds: u32,
    pub saved_work: Option<TimerSnapshot>,
    /// Set once the last leaf's timer ran out and the task was completed
    pub task_finished: bool,
}

impl Default for FocusState {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Closed,
            task_id: None,
            task_title: "Focus Session".to_string(),
            subtask_title: None,
            subtask_index: 0,
            total_leaves: 0,
            completed_subtasks: 0,
            total_seconds: 0,
            remaining_seconds: 0,
            break_seconds: timer_seconds(DEFAULT_BREAK_MINUTES),
            saved_work: None,
            task_finished: false,
        }
    }
}

impl FocusState {
    pub fn is_active(&self) -> bool {
        self.phase != SessionPhase::Closed
    }

    /// Fraction of the current timer already elapsed (0.0 to 1.0)
    pub fn progress(&self) -> f64 {
        if self.total_seconds == 0 {
            return 1.0;
        }
        1.0 - f64::from(self.remaining_seconds) / f64::from(self.total_seconds)
    }

    /// Plain text lines for the terminal focus screen
    pub fn status_lines(&self) -> Vec<String> {
        if !self.is_active() {
            return vec![self.task_title.clone(), "No session open".to_string()];
        }

        let mut lines = vec![self.task_title.clone()];
        if self.total_leaves > 0 {
            lines.push(format!(
                "Subtask {}/{}: {}",
                self.subtask_index + 1,
                self.total_leaves,
                self.subtask_title.as_deref().unwrap_or("-")
            ));
        }
        lines.push(format!(
            "{} / {}  [{}]  {:.0}%",
            format_clock(self.remaining_seconds),
            format_clock(self.total_seconds),
            self.phase.label(),
            self.progress() * 100.0
        ));
        lines.push(format!(
            "Done {}/{}  break {} min",
            self.completed_subtasks,
            self.total_leaves,
            self.break_seconds / 60
        ));
        if self.task_finished {
            lines.push("Task complete".to_string());
        }
        lines
    }
}

/// Direction for stepping through leaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Previous,
    Next,
}

/// What happened when a countdown reached zero
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerOutcome {
    /// Break finished, work timer restored
    BreakOver,
    /// Moved on to the next incomplete leaf
    Advanced { index: usize },
    /// No incomplete leaf left; the bound task must be completed
    TaskFinished,
}

/// Focus session state machine over a task's leaf snapshot
///
/// Pure and clock-free: the driver calls `tick` once per second while the
/// session runs. The leaf list is taken at `open` and never refreshed, so
/// edits to the task made while the session is open are not seen.
#[derive(Debug, Clone)]
pub struct FocusSession {
    task_id: String,
    leaves: Vec<Subtask>,
    state: FocusState,
}

impl FocusSession {
    pub fn open(task: &Task, break_minutes: i64) -> Self {
        let leaves = flatten_leaves(&task.subtasks);
        let index = leaves.iter().position(|leaf| !leaf.completed).unwrap_or(0);

        let total_seconds = match leaves.get(index) {
            Some(leaf) => timer_seconds(i64::from(leaf.duration)),
            None => timer_seconds(task.planned_minutes()),
        };

        let state = FocusState {
            phase: SessionPhase::Work { paused: true },
            task_id: Some(task.id.clone()),
            task_title: task.title.clone(),
            subtask_title: leaves.get(index).map(|leaf| leaf.title.clone()),
            subtask_index: index,
            total_leaves: leaves.len(),
            completed_subtasks: leaves.iter().filter(|leaf| leaf.completed).count(),
            total_seconds,
            remaining_seconds: total_seconds,
            break_seconds: timer_seconds(break_minutes),
            saved_work: None,
            task_finished: false,
        };

        Self {
            task_id: task.id.clone(),
            leaves,
            state,
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn state(&self) -> &FocusState {
        &self.state
    }

    pub fn leaves(&self) -> &[Subtask] {
        &self.leaves
    }

    pub fn is_running(&self) -> bool {
        self.state.phase.is_running()
    }

    /// Paused -> running; refused when already running or nothing is left to count
    pub fn start(&mut self) -> bool {
        if self.is_running() || self.state.remaining_seconds == 0 {
            return false;
        }
        self.state.phase = self.state.phase.with_paused(false);
        true
    }

    pub fn pause(&mut self) {
        self.state.phase = self.state.phase.with_paused(true);
    }

    /// Flip paused/running within the current mode; returns whether it now runs
    pub fn toggle_timer(&mut self) -> bool {
        if self.is_running() {
            self.pause();
            false
        } else {
            self.start()
        }
    }

    pub fn reset(&mut self) {
        self.pause();
        self.state.remaining_seconds = self.state.total_seconds;
    }

    /// One second of countdown; Some when the timer reaches zero
    pub fn tick(&mut self) -> Option<TimerOutcome> {
        if !self.is_running() {
            return None;
        }
        self.state.remaining_seconds = self.state.remaining_seconds.saturating_sub(1);
        if self.state.remaining_seconds == 0 {
            Some(self.complete_countdown())
        } else {
            None
        }
    }

    /// Handle a timer that ran out
    pub fn complete_countdown(&mut self) -> TimerOutcome {
        if self.state.phase.is_break() {
            self.restore_work();
            return TimerOutcome::BreakOver;
        }

        let next = self
            .leaves
            .iter()
            .enumerate()
            .skip(self.state.subtask_index + 1)
            .find(|(_, leaf)| !leaf.completed)
            .map(|(index, _)| index);

        match next {
            Some(index) => {
                self.select_leaf(index);
                self.state.completed_subtasks =
                    (self.state.completed_subtasks + 1).min(self.state.total_leaves);
                TimerOutcome::Advanced { index }
            }
            None => {
                self.state.phase = SessionPhase::Work { paused: true };
                self.state.remaining_seconds = 0;
                self.state.completed_subtasks = self.state.total_leaves;
                self.state.task_finished = true;
                TimerOutcome::TaskFinished
            }
        }
    }

    /// Enter or leave break mode, always landing paused
    ///
    /// `minutes` replaces the configured break length before entering.
    pub fn toggle_break_mode(&mut self, minutes: Option<i64>) {
        self.pause();
        if let Some(minutes) = minutes {
            self.state.break_seconds = timer_seconds(minutes);
        }

        if self.state.phase.is_break() {
            self.restore_work();
        } else {
            self.state.saved_work = Some(TimerSnapshot {
                remaining_seconds: self.state.remaining_seconds,
                total_seconds: self.state.total_seconds,
            });
            self.state.phase = SessionPhase::Break { paused: true };
            self.state.total_seconds = self.state.break_seconds;
            self.state.remaining_seconds = self.state.break_seconds;
        }
    }

    pub fn set_break_duration(&mut self, minutes: i64) {
        self.state.break_seconds = timer_seconds(minutes);
        if self.state.phase.is_break() {
            self.pause();
            self.state.total_seconds = self.state.break_seconds;
            self.state.remaining_seconds = self.state.break_seconds;
        }
    }

    /// Step to the neighbouring leaf; false at either end or with no leaves
    ///
    /// Moving always lands in paused work mode with the target leaf's full
    /// duration; an ongoing break is dropped.
    pub fn navigate(&mut self, direction: Direction) -> bool {
        if self.leaves.is_empty() {
            return false;
        }
        let current = self.state.subtask_index;
        let target = match direction {
            Direction::Previous => current.saturating_sub(1),
            Direction::Next => (current + 1).min(self.leaves.len() - 1),
        };
        if target == current {
            return false;
        }

        self.state.saved_work = None;
        self.select_leaf(target);
        self.state.completed_subtasks = self.leaves.iter().filter(|leaf| leaf.completed).count();
        true
    }

    fn select_leaf(&mut self, index: usize) {
        let leaf = &self.leaves[index];
        let seconds = timer_seconds(i64::from(leaf.duration));
        self.state.phase = SessionPhase::Work { paused: true };
        self.state.subtask_index = index;
        self.state.subtask_title = Some(leaf.title.clone());
        self.state.total_seconds = seconds;
        self.state.remaining_seconds = seconds;
    }

    fn restore_work(&mut self) {
        if let Some(saved) = self.state.saved_work.take() {
            self.state.remaining_seconds = saved.remaining_seconds;
            self.state.total_seconds = saved.total_seconds;
        }
        self.state.phase = SessionPhase::Work { paused: true };
    }
}

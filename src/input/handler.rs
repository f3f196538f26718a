use crate::session::{Direction, SessionHandle};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Step for the break length keys, in minutes
const BREAK_STEP_MINUTES: i64 = 1;

/// Handle a key on the focus screen; returns true when the screen should exit
pub fn handle_key(session: &SessionHandle, key: KeyEvent) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        session.close();
        return true;
    }

    match key.code {
        KeyCode::Char(' ') | KeyCode::Enter => session.toggle_timer(),
        KeyCode::Char('p') | KeyCode::Char('P') => session.pause_timer(),
        KeyCode::Char('r') | KeyCode::Char('R') => session.reset_timer(),
        KeyCode::Char('b') | KeyCode::Char('B') => session.toggle_break_mode(None),

        // Break length
        KeyCode::Char('+') | KeyCode::Char('=') => adjust_break(session, BREAK_STEP_MINUTES),
        KeyCode::Char('-') | KeyCode::Char('_') => adjust_break(session, -BREAK_STEP_MINUTES),

        // Leaf navigation
        KeyCode::Left | KeyCode::Char('h') => session.navigate_leaf(Direction::Previous),
        KeyCode::Right | KeyCode::Char('l') => session.navigate_leaf(Direction::Next),

        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
            session.close();
            return true;
        }
        _ => {}
    }

    // A session that closed itself (bound task deleted, nothing to focus on)
    // ends the screen too
    !session.state().is_active()
}

fn adjust_break(session: &SessionHandle, delta: i64) {
    let current = i64::from(session.state().break_seconds / 60);
    let minutes = (current + delta).max(1);
    if minutes != current {
        session.set_break_duration(minutes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Subtask, Task};
    use crate::repository::{LocalRepository, TaskRepository};
    use crate::session::{SessionOptions, SessionPhase};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::runtime::Handle;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn open_session() -> (Arc<LocalRepository>, SessionHandle) {
        let repo = Arc::new(LocalRepository::in_memory());
        let mut task = Task::new("local", "Keys");
        task.subtasks = vec![Subtask::new("one", 10), Subtask::new("two", 20)];
        repo.upsert_task(task.clone()).unwrap();

        let options = SessionOptions {
            notifications: false,
            auto_start_delay: Duration::from_secs(60),
            ..SessionOptions::default()
        };
        let session = SessionHandle::new(repo.clone(), Handle::current(), options);
        assert!(session.open(&task.id));
        (repo, session)
    }

    #[tokio::test(start_paused = true)]
    async fn test_space_toggles_timer() {
        let (_repo, session) = open_session();
        assert!(!handle_key(&session, key(KeyCode::Char(' '))));
        assert_eq!(session.state().phase, SessionPhase::Work { paused: false });

        handle_key(&session, key(KeyCode::Char('p')));
        assert_eq!(session.state().phase, SessionPhase::Work { paused: true });
    }

    #[tokio::test(start_paused = true)]
    async fn test_break_keys() {
        let (_repo, session) = open_session();
        handle_key(&session, key(KeyCode::Char('+')));
        assert_eq!(session.state().break_seconds, 360);

        handle_key(&session, key(KeyCode::Char('b')));
        let state = session.state();
        assert_eq!(state.phase, SessionPhase::Break { paused: true });
        assert_eq!(state.total_seconds, 360);

        for _ in 0..10 {
            handle_key(&session, key(KeyCode::Char('-')));
        }
        assert_eq!(session.state().break_seconds, 60, "break never drops below a minute");
    }

    #[tokio::test(start_paused = true)]
    async fn test_arrow_keys_navigate() {
        let (_repo, session) = open_session();
        handle_key(&session, key(KeyCode::Right));
        assert_eq!(session.state().subtask_index, 1);
        assert_eq!(session.state().total_seconds, 1200);

        handle_key(&session, key(KeyCode::Char('h')));
        assert_eq!(session.state().subtask_index, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quit_closes_session() {
        let (_repo, session) = open_session();
        assert!(handle_key(&session, key(KeyCode::Char('q'))));
        assert!(!session.state().is_active());

        let (_repo, session) = open_session();
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert!(handle_key(&session, ctrl_c));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deleted_task_ends_screen() {
        let (repo, session) = open_session();
        let task_id = session.state().task_id.unwrap();
        repo.delete_task(&task_id).unwrap();

        assert!(handle_key(&session, key(KeyCode::Char(' '))));
    }
}

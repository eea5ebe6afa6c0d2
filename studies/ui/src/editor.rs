use std::sync::{ mpsc::Receiver, PoisonError };

use crate::state::{ EvalState, StateMutex };

/// Copies every snapshot sent by the evaluation thread into the shared state.
pub struct Editor {
    pub rx: Receiver<EvalState>,
    pub state: StateMutex,
}

impl Editor {
    /// Returns once every sender has been dropped.
    pub fn listen_and_update(&self) {
        while let Ok(received_state) = self.rx.recv() {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            *state = received_state;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{ mpsc, Arc, Mutex };

    use super::*;

    #[test]
    fn keeps_the_latest_snapshot() {
        let (tx, rx) = mpsc::channel();
        let state = Arc::new(Mutex::new(EvalState::default()));
        let editor = Editor { rx, state: Arc::clone(&state) };

        for batch in 1..=3 {
            let mut snapshot = EvalState::default();
            snapshot.progress.current_batch = batch;
            tx.send(snapshot).unwrap();
        }
        drop(tx);

        editor.listen_and_update();
        assert_eq!(state.lock().unwrap().progress.current_batch, 3);
    }
}

use std::{ sync::{ mpsc::Receiver, Arc, Mutex }, thread };

use color_eyre::Result;
use editor::Editor;
use state::EvalState;
use ui::{ App, AppState };

pub mod ui;
pub mod state;
pub mod editor;

/// Draws the evaluation dashboard until the user quits, fed by the snapshots
/// arriving on `rx`.
pub fn run_dashboard(rx: Receiver<EvalState>) -> Result<()> {
    color_eyre::install()?;

    let state = Arc::new(Mutex::new(EvalState::default()));

    let editor = Editor {
        rx,
        state: Arc::clone(&state),
    };

    thread::spawn(move || {
        editor.listen_and_update();
    });

    let terminal = ratatui::init();
    let app = App {
        state: AppState::default(),
        eval_state: Arc::clone(&state),
        scroll_position: 0,
    };

    let app_result = app.run(terminal);
    ratatui::restore();
    app_result
}

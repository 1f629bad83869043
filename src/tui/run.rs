//! TUI entry point and terminal setup.

use std::io;

use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{prelude::CrosstermBackend, Terminal};
use tracing::info;

use crate::fields::GroupBy;
use crate::store::TaskStore;
use crate::tui::{app::App, enums::Screen};

/// Initialise the terminal, run the app until the user quits, and restore
/// the terminal even when the loop fails.
pub fn run_tui(store: TaskStore, screen: Screen, group_by: GroupBy) -> io::Result<()> {
    info!(?screen, ?group_by, tasks = store.len(), "starting terminal interface");
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(store, screen, group_by);
    let result = app.run(&mut terminal);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

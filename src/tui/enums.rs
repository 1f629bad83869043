//! Enumerations for TUI state management.

/// Which view the TUI is showing.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Screen {
    Table,
    Board,
}

impl Screen {
    pub fn toggled(self) -> Self {
        match self {
            Screen::Table => Screen::Board,
            Screen::Board => Screen::Table,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Screen::Table => "Table",
            Screen::Board => "Board",
        }
    }
}

/// What keystrokes are currently routed to.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Mode {
    Normal,
    Search,
    TitleEdit,
    Form,
    Help,
    Confirm,
}

//! Command implementations for the CLI interface.
//!
//! Each handler works against an open `TaskStore` and goes through the same
//! editor, engine and view controllers the terminal UI uses, so a command
//! line `move` behaves exactly like dropping a card on the board.

use clap::Subcommand;
use clap_complete::{generate, Shell};

use chrono::Local;

use crate::editor::{parse_custom_field_arg, TaskDraft};
use crate::engine::{self, BucketKey, SortKey, TaskFilter};
use crate::error::{Error, Result};
use crate::fields::*;
use crate::store::TaskStore;
use crate::task::{Task, User};
use crate::tui::enums::Screen;
use crate::tui::run::run_tui;
use crate::users;
use crate::views::board::{BoardView, DropOutcome};
use crate::views::table::TableView;
use crate::views::{save_draft, Selection};

#[derive(Subcommand)]
pub enum Commands {
    /// Launch the interactive terminal interface.
    Ui {
        /// Open on the board instead of the table.
        #[arg(long)]
        board: bool,
        /// Board grouping.
        #[arg(long, value_enum, default_value_t = GroupBy::Status)]
        group_by: GroupBy,
    },

    /// Add a new task.
    Add {
        /// Short title for the task.
        title: String,
        #[arg(long, value_enum, default_value_t = Status::NotStarted)]
        status: Status,
        #[arg(long, value_enum, default_value_t = Priority::None)]
        priority: Priority,
        /// Optional longer description.
        #[arg(long)]
        desc: Option<String>,
        /// Assignee user id (see `users`). May be repeated.
        #[arg(long = "assignee")]
        assignees: Vec<String>,
        /// Custom field: id=value or id:type=value (text | number | boolean). May be repeated.
        #[arg(long = "field")]
        fields: Vec<String>,
    },

    /// List tasks as a paginated table.
    List {
        /// Case-insensitive title search.
        #[arg(long)]
        search: Option<String>,
        /// Filter by status. May be repeated.
        #[arg(long, value_enum)]
        status: Vec<Status>,
        /// Filter by priority. May be repeated.
        #[arg(long, value_enum)]
        priority: Vec<Priority>,
        /// Filter by assignee user id. May be repeated.
        #[arg(long = "user")]
        users: Vec<String>,
        /// Sort column.
        #[arg(long, value_enum, default_value_t = SortField::Created)]
        sort: SortField,
        /// Sort direction.
        #[arg(long, value_enum, default_value_t = SortDirection::Desc)]
        dir: SortDirection,
        /// Page to show (10 rows per page).
        #[arg(long, default_value_t = 1)]
        page: usize,
    },

    /// Show tasks grouped into board columns.
    Board {
        #[arg(long, value_enum, default_value_t = GroupBy::Status)]
        group_by: GroupBy,
        /// Case-insensitive title search.
        #[arg(long)]
        search: Option<String>,
        #[arg(long, value_enum, default_value_t = SortField::Created)]
        sort: SortField,
        #[arg(long, value_enum, default_value_t = SortDirection::Desc)]
        dir: SortDirection,
    },

    /// View a single task.
    View {
        id: u64,
    },

    /// Update fields on a task.
    Update {
        id: u64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, value_enum)]
        status: Option<Status>,
        #[arg(long, value_enum)]
        priority: Option<Priority>,
        #[arg(long)]
        desc: Option<String>,
        /// Toggle an assignee on or off. May be repeated.
        #[arg(long = "assignee")]
        assignees: Vec<String>,
        /// Remove all assignees before applying --assignee.
        #[arg(long)]
        clear_assignees: bool,
        /// Set a custom field: id=value or id:type=value. May be repeated.
        #[arg(long = "field")]
        fields: Vec<String>,
        /// Remove a custom field by id. May be repeated.
        #[arg(long = "remove-field")]
        remove_fields: Vec<String>,
    },

    /// Move a task to another board column (status or priority).
    Move {
        id: u64,
        /// Destination: a status (not_started, in_progress, completed) or a priority (none .. urgent).
        to: String,
    },

    /// Delete one or more tasks.
    Delete {
        #[arg(required = true, num_args = 1..)]
        ids: Vec<u64>,
    },

    /// List collaborators that can be assigned.
    Users,

    /// Generate shell completion scripts.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Dispatch a parsed command.
pub fn run(command: Commands, mut store: TaskStore) -> Result<()> {
    match command {
        Commands::Ui { board, group_by } => {
            let screen = if board { Screen::Board } else { Screen::Table };
            cmd_ui(store, screen, group_by)
        }
        Commands::Add {
            title,
            status,
            priority,
            desc,
            assignees,
            fields,
        } => cmd_add(&mut store, title, status, priority, desc, assignees, fields),
        Commands::List {
            search,
            status,
            priority,
            users,
            sort,
            dir,
            page,
        } => {
            let filter = TaskFilter {
                search: search.unwrap_or_default(),
                statuses: status,
                priorities: priority,
                users,
            };
            cmd_list(&store, filter, SortKey::new(sort, dir), page);
            Ok(())
        }
        Commands::Board {
            group_by,
            search,
            sort,
            dir,
        } => {
            cmd_board(&store, group_by, search, SortKey::new(sort, dir));
            Ok(())
        }
        Commands::View { id } => cmd_view(&store, id),
        Commands::Update {
            id,
            title,
            status,
            priority,
            desc,
            assignees,
            clear_assignees,
            fields,
            remove_fields,
        } => cmd_update(
            &mut store,
            id,
            title,
            status,
            priority,
            desc,
            assignees,
            clear_assignees,
            fields,
            remove_fields,
        ),
        Commands::Move { id, to } => cmd_move(&mut store, id, &to),
        Commands::Delete { ids } => cmd_delete(&mut store, ids),
        Commands::Users => {
            cmd_users();
            Ok(())
        }
        Commands::Completions { shell } => {
            cmd_completions(shell);
            Ok(())
        }
    }
}

pub fn cmd_ui(store: TaskStore, screen: Screen, group_by: GroupBy) -> Result<()> {
    run_tui(store, screen, group_by)?;
    Ok(())
}

fn resolve_users(ids: &[String]) -> Result<Vec<User>> {
    ids.iter()
        .map(|id| users::find(id.trim()).ok_or_else(|| Error::UnknownUser(id.clone())))
        .collect()
}

fn parse_fields(raw: &[String]) -> Result<Vec<crate::task::CustomField>> {
    raw.iter()
        .map(|f| parse_custom_field_arg(f).map_err(Error::InvalidArgument))
        .collect()
}

pub fn cmd_add(
    store: &mut TaskStore,
    title: String,
    status: Status,
    priority: Priority,
    desc: Option<String>,
    assignees: Vec<String>,
    fields: Vec<String>,
) -> Result<()> {
    let mut draft = TaskDraft::new(title);
    draft.status = status;
    draft.priority = priority;
    draft.description = desc;
    draft.assignees = resolve_users(&assignees)?;
    for field in parse_fields(&fields)? {
        draft.set_custom_field(&field.field_id, field.value);
    }
    let (task, notice) = save_draft(store, None, draft)?;
    println!("{} (id {})", notice.message, task.id);
    Ok(())
}

pub fn cmd_list(store: &TaskStore, filter: TaskFilter, sort: SortKey, page: usize) {
    let mut view = TableView::new();
    view.set_filter(filter, store.tasks());
    view.set_sort(sort, store.tasks());

    let total = view.rows(store.tasks()).len();
    view.go_to_page(page, store.tasks());
    if view.pager().page() != page {
        eprintln!("Page {} is out of range, showing page {}", page, view.pager().page());
    }

    let rows = view.page_rows(store.tasks());
    if rows.is_empty() {
        println!("No tasks found");
        if !store.is_empty() {
            let statuses: Vec<&str> = engine::distinct_statuses(store.tasks())
                .into_iter()
                .map(Status::as_str)
                .collect();
            let priorities: Vec<&str> = engine::distinct_priorities(store.tasks())
                .into_iter()
                .map(Priority::as_str)
                .collect();
            println!(
                "Statuses in use: {} | priorities in use: {}",
                statuses.join(", "),
                priorities.join(", ")
            );
        }
        return;
    }
    print_table(&rows);
    let prev = if view.pager().has_prev() { "prev available" } else { "first page" };
    let next = if view.has_next_page(store.tasks()) { "next available" } else { "last page" };
    println!(
        "Page {}/{} ({} tasks, sorted by {}) | {} | {}",
        view.pager().page(),
        view.pager().page_count(total),
        total,
        view.sort(),
        prev,
        next
    );
}

pub fn cmd_board(store: &TaskStore, group_by: GroupBy, search: Option<String>, sort: SortKey) {
    let mut view = BoardView::new(group_by);
    if let Some(search) = search {
        view.set_search(&search);
    }
    view.set_sort(sort);
    for bucket in view.buckets(store.tasks()) {
        println!("{} ({})", bucket.key.label(), bucket.tasks.len());
        if bucket.tasks.is_empty() {
            println!("  -");
        }
        for t in bucket.tasks {
            let detail = match group_by {
                GroupBy::Status => t.priority.label(),
                GroupBy::Priority => t.status.label(),
            };
            println!(
                "  #{:<5} {} [{}] {}",
                t.id,
                truncate(&t.title, 48),
                detail,
                format_assignees(&t.assignees)
            );
        }
        println!();
    }
}

pub fn cmd_view(store: &TaskStore, id: u64) -> Result<()> {
    let task = store.get(id).ok_or(Error::TaskNotFound(id))?;
    println!("#{} {}", task.id, task.title);
    println!("Status:      {}", task.status.label());
    println!("Priority:    {}", task.priority.label());
    println!("Assignees:   {}", format_assignees(&task.assignees));
    println!(
        "Created:     {}",
        task.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
    );
    println!(
        "Updated:     {}",
        task.updated_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
    );
    if !task.custom_fields.is_empty() {
        println!("Fields:");
        for f in &task.custom_fields {
            println!("  {} ({}): {}", f.field_id, f.value.field_type().as_str(), f.value);
        }
    }
    println!();
    println!("{}", task.description.as_deref().unwrap_or("-"));
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn cmd_update(
    store: &mut TaskStore,
    id: u64,
    title: Option<String>,
    status: Option<Status>,
    priority: Option<Priority>,
    desc: Option<String>,
    assignees: Vec<String>,
    clear_assignees: bool,
    fields: Vec<String>,
    remove_fields: Vec<String>,
) -> Result<()> {
    let task = store.get(id).ok_or(Error::TaskNotFound(id))?;
    let mut draft = TaskDraft::from_task(task);
    if let Some(title) = title {
        draft.title = title;
    }
    if let Some(status) = status {
        draft.status = status;
    }
    if let Some(priority) = priority {
        draft.priority = priority;
    }
    if let Some(desc) = desc {
        draft.description = Some(desc);
    }
    if clear_assignees {
        draft.assignees.clear();
    }
    for user in resolve_users(&assignees)? {
        draft.toggle_assignee(&user);
    }
    for field in parse_fields(&fields)? {
        draft.set_custom_field(&field.field_id, field.value);
    }
    for field_id in &remove_fields {
        draft.remove_custom_field(field_id);
    }
    let (_, notice) = save_draft(store, Some(id), draft)?;
    println!("{}", notice.message);
    Ok(())
}

pub fn cmd_move(store: &mut TaskStore, id: u64, to: &str) -> Result<()> {
    let target: BucketKey = to.parse().map_err(Error::InvalidArgument)?;
    let group_by = match target {
        BucketKey::Status(_) => GroupBy::Status,
        BucketKey::Priority(_) => GroupBy::Priority,
    };
    if store.get(id).is_none() {
        return Err(Error::TaskNotFound(id));
    }
    let mut board = BoardView::new(group_by);
    match board.move_task(store, id, target) {
        outcome @ DropOutcome::Moved { .. } => {
            if let Some(notice) = outcome.notice() {
                println!("{}", notice.message);
            }
        }
        DropOutcome::Unchanged | DropOutcome::Reordered { .. } => {
            println!("Task {} is already in {}", id, target.label());
        }
        DropOutcome::NotDragging | DropOutcome::Cancelled => {
            println!("Task {} was not moved", id);
        }
    }
    Ok(())
}

pub fn cmd_delete(store: &mut TaskStore, ids: Vec<u64>) -> Result<()> {
    let missing: Vec<String> = ids
        .iter()
        .filter(|id| store.get(**id).is_none())
        .map(|id| id.to_string())
        .collect();
    if !missing.is_empty() {
        eprintln!("Not found, skipped: {}", missing.join(", "));
    }

    if let [id] = ids.as_slice() {
        if store.delete(*id) {
            println!("Task deleted");
        }
        return Ok(());
    }

    let mut selection = Selection::default();
    for id in ids.iter().filter(|id| store.get(**id).is_some()) {
        if !selection.contains(*id) {
            selection.toggle(*id);
        }
    }
    if let Some(notice) = selection.delete_from(store) {
        println!("{}", notice.message);
    }
    Ok(())
}

pub fn cmd_users() {
    println!("{:<5} {:<16} {}", "ID", "Name", "Email");
    for u in users::directory() {
        println!("{:<5} {:<16} {}", u.id, u.name, u.email);
    }
}

pub fn cmd_completions(shell: Shell) {
    use clap::CommandFactory;
    let mut cmd = crate::cli::Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut std::io::stdout());
}

/// Print tasks in a formatted table.
pub fn print_table(tasks: &[&Task]) {
    println!(
        "{:<6} {:<12} {:<9} {:<17} {:<10} {}",
        "ID", "Status", "Priority", "Created", "Assignees", "Title"
    );
    for t in tasks {
        println!(
            "{:<6} {:<12} {:<9} {:<17} {:<10} {}",
            t.id,
            t.status.label(),
            t.priority.label(),
            t.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
            truncate(&format_assignees(&t.assignees), 10),
            t.title
        );
    }
}

/// Comma-separated initials, or "-" when nobody is assigned.
pub fn format_assignees(assignees: &[User]) -> String {
    if assignees.is_empty() {
        "-".to_string()
    } else {
        assignees
            .iter()
            .map(|a| a.initials())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out = String::new();
        for (i, ch) in s.chars().enumerate() {
            if i + 1 >= width {
                out.push('…');
                break;
            }
            out.push(ch);
        }
        out
    }
}

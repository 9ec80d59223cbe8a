// Line-oriented command session over one in-memory store

use crate::filter::{Filter, FilterOp};
use crate::models::{NewTask, Priority, Task, TaskId, TaskUpdate, parse_date};
use crate::query::{StatusFilter, ViewQuery};
use crate::record::IndexValue;
use crate::store::{Stats, TaskStore};
use chrono::{Local, NaiveDate, NaiveDateTime};
use colored::Colorize;
use eyre::{Context, Result, eyre};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use tracing::{info, warn};

pub const HELP: &str = "\
Commands:
  add <text> [!low|!medium|!high] [#category] [@YYYY-MM-DD]
  toggle <id>
  edit <id> [text] [!priority] [#category|#-] [@date|@-] [+done|+open]
  rm <id>                (alias: delete)
  list [all|active|completed] [!priority] [#category] [@date] [search words]
                         (alias: ls)
  stats
  help
  quit";

/// Settings shared by every command in a session
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Priority for `add` when no `!priority` token is given
    pub default_priority: Priority,
    /// Emit JSON instead of text
    pub json: bool,
}

/// One parsed session command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Add(NewTask),
    Toggle(TaskId),
    Edit(TaskId, TaskUpdate),
    Remove(TaskId),
    List(ViewQuery),
    Stats,
    Help,
    Quit,
}

/// Metadata tokens pulled out of a command line
#[derive(Debug, Default)]
struct Tokens<'a> {
    words: Vec<&'a str>,
    priority: Option<Priority>,
    category: Option<Option<String>>,
    due_date: Option<Option<NaiveDate>>,
    completed: Option<bool>,
}

impl<'a> Tokens<'a> {
    fn parse(args: &[&'a str]) -> Result<Self> {
        let mut tokens = Tokens::default();

        for arg in args {
            if let Some(p) = arg.strip_prefix('!') {
                tokens.priority = Some(p.parse()?);
            } else if let Some(c) = arg.strip_prefix('#') {
                tokens.category = match c {
                    "" => return Err(eyre!("Empty category after '#'")),
                    "-" => Some(None),
                    c => Some(Some(c.to_string())),
                };
            } else if let Some(d) = arg.strip_prefix('@') {
                tokens.due_date = match d {
                    "-" => Some(None),
                    d => Some(Some(parse_date(d)?)),
                };
            } else if *arg == "+done" {
                tokens.completed = Some(true);
            } else if *arg == "+open" {
                tokens.completed = Some(false);
            } else {
                tokens.words.push(*arg);
            }
        }

        Ok(tokens)
    }

    fn text(&self) -> Option<String> {
        if self.words.is_empty() {
            None
        } else {
            Some(self.words.join(" "))
        }
    }
}

fn parse_id(args: &[&str], command: &str) -> Result<TaskId> {
    let raw = args
        .first()
        .ok_or_else(|| eyre!("Usage: {} <id>", command))?;
    raw.parse()
}

impl Command {
    /// Parse one input line
    ///
    /// Returns `Ok(None)` for blank lines and `//` comments.
    pub fn parse(line: &str, default_priority: Priority) -> Result<Option<Command>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with("//") {
            return Ok(None);
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        let (name, args) = (parts[0], &parts[1..]);

        let command = match name.to_lowercase().as_str() {
            "add" => {
                let tokens = Tokens::parse(args)?;
                if tokens.completed.is_some() {
                    return Err(eyre!("'+done' and '+open' are only valid for edit"));
                }
                Command::Add(NewTask {
                    text: tokens.text().unwrap_or_default(),
                    priority: tokens.priority.unwrap_or(default_priority),
                    category: tokens.category.flatten(),
                    due_date: tokens.due_date.flatten(),
                })
            }
            "toggle" => Command::Toggle(parse_id(args, "toggle")?),
            "rm" | "delete" => Command::Remove(parse_id(args, "rm")?),
            "edit" => {
                let id = parse_id(args, "edit")?;
                let tokens = Tokens::parse(&args[1..])?;
                Command::Edit(
                    id,
                    TaskUpdate {
                        text: tokens.text(),
                        completed: tokens.completed,
                        priority: tokens.priority,
                        category: tokens.category,
                        due_date: tokens.due_date,
                    },
                )
            }
            "list" | "ls" => Command::List(parse_list(args)?),
            "stats" => Command::Stats,
            "help" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(eyre!("Unknown command: {:?} (try 'help')", other)),
        };

        Ok(Some(command))
    }
}

fn parse_list(args: &[&str]) -> Result<ViewQuery> {
    let (status, rest) = match args.first().map(|a| a.parse::<StatusFilter>()) {
        Some(Ok(status)) => (status, &args[1..]),
        _ => (StatusFilter::All, args),
    };

    let tokens = Tokens::parse(rest)?;
    if tokens.completed.is_some() {
        return Err(eyre!("Use 'list active' or 'list completed' instead of '+open'/'+done'"));
    }

    let mut query = ViewQuery::new(status).search(tokens.words.join(" "));
    if let Some(priority) = tokens.priority {
        query = query.filter(Filter::eq(
            "priority",
            IndexValue::String(priority.as_str().to_string()),
        ));
    }
    match tokens.category {
        Some(Some(category)) => query = query.filter(Filter::eq("category", IndexValue::String(category))),
        Some(None) => return Err(eyre!("'#-' is only valid for edit")),
        None => {}
    }
    match tokens.due_date {
        Some(Some(date)) => query = query.filter(Filter::new("due_date", FilterOp::Lte, IndexValue::Date(date))),
        Some(None) => return Err(eyre!("'@-' is only valid for edit")),
        None => {}
    }

    Ok(query)
}

/// Whether the session should keep reading input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Quit,
}

/// Result of running a batch of lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub commands: usize,
    pub failures: usize,
}

/// A store plus the command driver feeding it
pub struct Session {
    store: TaskStore,
    config: SessionConfig,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            store: TaskStore::new(),
            config,
        }
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    /// Parse and apply one line, writing any output to `out`
    pub fn execute<W: Write>(&mut self, line: &str, out: &mut W) -> Result<Outcome> {
        match Command::parse(line, self.config.default_priority)? {
            Some(command) => self.apply(command, out),
            None => Ok(Outcome::Continue),
        }
    }

    /// Apply an already parsed command
    pub fn apply<W: Write>(&mut self, command: Command, out: &mut W) -> Result<Outcome> {
        let json = self.config.json;

        match command {
            Command::Add(fields) => {
                let id = self.store.create(fields)?;
                if json {
                    writeln!(out, "{}", serde_json::json!({ "id": id }))?;
                } else {
                    writeln!(out, "Added task {}", id)?;
                }
            }
            Command::Toggle(id) => {
                let found = self.store.toggle(id);
                if json {
                    writeln!(out, "{}", serde_json::json!({ "id": id, "found": found }))?;
                } else if let Some(task) = self.store.get(id) {
                    let state = if task.completed { "completed" } else { "active" };
                    writeln!(out, "Task {} marked {}", id, state)?;
                } else {
                    writeln!(out, "No task with id {}", id)?;
                }
            }
            Command::Edit(id, changes) => {
                let found = self.store.update(id, changes)?;
                self.write_found(out, id, found, "Updated")?;
            }
            Command::Remove(id) => {
                let found = self.store.delete(id);
                self.write_found(out, id, found, "Deleted")?;
            }
            Command::List(query) => {
                let tasks = self.store.view(&query);
                if json {
                    writeln!(out, "{}", serde_json::to_string_pretty(&tasks)?)?;
                } else if tasks.is_empty() {
                    writeln!(out, "{}", empty_message(&query))?;
                } else {
                    let now = now();
                    for task in tasks {
                        writeln!(out, "{}", render_task(task, now))?;
                    }
                }
            }
            Command::Stats => {
                let stats = self.store.stats(now());
                if json {
                    writeln!(out, "{}", serde_json::to_string(&stats)?)?;
                } else {
                    writeln!(out, "{}", render_stats(&stats))?;
                }
            }
            Command::Help => writeln!(out, "{}", HELP)?,
            Command::Quit => return Ok(Outcome::Quit),
        }

        Ok(Outcome::Continue)
    }

    fn write_found<W: Write>(&self, out: &mut W, id: TaskId, found: bool, verb: &str) -> Result<()> {
        if self.config.json {
            writeln!(out, "{}", serde_json::json!({ "id": id, "found": found }))?;
        } else if found {
            writeln!(out, "{} task {}", verb, id)?;
        } else {
            writeln!(out, "No task with id {}", id)?;
        }
        Ok(())
    }

    /// Execute every line of `input`
    ///
    /// A failing line is reported to `out` and counted; later lines still
    /// run. With `prompt` set a `> ` prompt precedes each read.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, out: &mut W, prompt: bool) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        let mut lines = input.lines().enumerate();

        loop {
            if prompt {
                write!(out, "> ")?;
                out.flush()?;
            }

            let Some((index, line)) = lines.next() else {
                break;
            };
            let line = line.context("Failed to read command input")?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with("//") {
                continue;
            }

            summary.commands += 1;
            match self.execute(&line, out) {
                Ok(Outcome::Continue) => {}
                Ok(Outcome::Quit) => break,
                Err(e) => {
                    summary.failures += 1;
                    warn!(line = index + 1, error = %e, "Command failed");
                    if self.config.json {
                        let report = serde_json::json!({ "line": index + 1, "error": e.to_string() });
                        writeln!(out, "{}", report)?;
                    } else {
                        writeln!(out, "error: line {}: {}", index + 1, e)?;
                    }
                }
            }
        }

        info!(
            session_id = %self.store.session_id(),
            commands = summary.commands,
            failures = summary.failures,
            "Session input finished"
        );
        Ok(summary)
    }

    /// Execute a command script file
    pub fn run_file<P: AsRef<Path>, W: Write>(&mut self, path: P, out: &mut W) -> Result<RunSummary> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("Failed to open command script {:?}", path))?;
        self.run(BufReader::new(file), out, false)
    }
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn empty_message(query: &ViewQuery) -> &'static str {
    match query.status {
        StatusFilter::All => "No tasks. Add a task to get started",
        StatusFilter::Active => "No tasks. All tasks are completed",
        StatusFilter::Completed => "No tasks. Nothing completed yet",
    }
}

/// One-line text rendering of a task
pub fn render_task(task: &Task, now: NaiveDateTime) -> String {
    let check = if task.completed { "[x]" } else { "[ ]" };
    let text = if task.completed {
        task.text.dimmed().strikethrough().to_string()
    } else {
        task.text.bold().to_string()
    };
    let priority = match task.priority {
        Priority::High => task.priority.as_str().red(),
        Priority::Medium => task.priority.as_str().yellow(),
        Priority::Low => task.priority.as_str().green(),
    };

    let mut line = format!("{} {:>3}  {}  {}", check, task.id.0, text, priority);
    if let Some(category) = &task.category {
        line.push_str(&format!("  #{}", category.cyan()));
    }
    if let Some(due) = task.due_date {
        let due = due.format("%Y-%m-%d").to_string();
        if task.is_overdue(now) {
            line.push_str(&format!("  due {}", due.red().bold()));
        } else {
            line.push_str(&format!("  due {}", due));
        }
    }
    line
}

fn render_stats(stats: &Stats) -> String {
    format!(
        "{} tasks: {} active, {} completed, {} overdue",
        stats.total, stats.active, stats.completed, stats.overdue
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn session() -> Session {
        Session::new(SessionConfig::default())
    }

    fn exec(session: &mut Session, line: &str) -> String {
        let mut out = Vec::new();
        session.execute(line, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_add_with_metadata() {
        let command = Command::parse("add Buy milk !low #Shopping @2024-01-10", Priority::Medium)
            .unwrap()
            .unwrap();

        assert_eq!(
            command,
            Command::Add(
                NewTask::new("Buy milk", Priority::Low)
                    .with_category("Shopping")
                    .with_due_date(date(2024, 1, 10))
            )
        );
    }

    #[test]
    fn test_parse_add_uses_default_priority() {
        let command = Command::parse("add Stretch", Priority::High).unwrap().unwrap();
        assert_eq!(command, Command::Add(NewTask::new("Stretch", Priority::High)));
    }

    #[test]
    fn test_parse_blank_and_comment() {
        assert_eq!(Command::parse("   ", Priority::Medium).unwrap(), None);
        assert_eq!(Command::parse("// setup", Priority::Medium).unwrap(), None);
    }

    #[test]
    fn test_parse_errors() {
        assert!(Command::parse("fly away", Priority::Medium).is_err());
        assert!(Command::parse("toggle", Priority::Medium).is_err());
        assert!(Command::parse("toggle abc", Priority::Medium).is_err());
        assert!(Command::parse("add Task !urgent", Priority::Medium).is_err());
        assert!(Command::parse("add Task @tomorrow", Priority::Medium).is_err());
        assert!(Command::parse("add Task +done", Priority::Medium).is_err());
        assert!(Command::parse("add Task #", Priority::Medium).is_err());
    }

    #[test]
    fn test_parse_edit_clears() {
        let command = Command::parse("edit 3 #- @- +done", Priority::Medium).unwrap().unwrap();

        assert_eq!(
            command,
            Command::Edit(
                TaskId(3),
                TaskUpdate::default().category(None).due_date(None).completed(true)
            )
        );
    }

    #[test]
    fn test_parse_edit_text_only() {
        let command = Command::parse("edit 1 Call the bank", Priority::Medium).unwrap().unwrap();
        assert_eq!(command, Command::Edit(TaskId(1), TaskUpdate::default().text("Call the bank")));
    }

    #[test]
    fn test_parse_list() {
        let command = Command::parse("list active !high #Work report", Priority::Medium)
            .unwrap()
            .unwrap();

        let expected = ViewQuery::new(StatusFilter::Active)
            .search("report")
            .filter(Filter::eq("priority", IndexValue::String("high".to_string())))
            .filter(Filter::eq("category", IndexValue::String("Work".to_string())));
        assert_eq!(command, Command::List(expected));
    }

    #[test]
    fn test_parse_list_without_status_is_search() {
        let command = Command::parse("list milk", Priority::Medium).unwrap().unwrap();
        assert_eq!(command, Command::List(ViewQuery::default().search("milk")));
    }

    #[test]
    fn test_add_then_blank_add_rejected() {
        let mut session = session();
        let mut out = Vec::new();

        session.execute("add Buy milk !low", &mut out).unwrap();
        assert!(session.execute("add !high", &mut out).is_err());

        assert_eq!(session.store().len(), 1);
        assert_eq!(session.store().tasks()[0].text, "Buy milk");
    }

    #[test]
    fn test_toggle_and_remove_messages() {
        let mut session = session();
        exec(&mut session, "add Walk dog");

        assert!(exec(&mut session, "toggle 1").contains("marked completed"));
        assert!(exec(&mut session, "toggle 1").contains("marked active"));
        assert!(exec(&mut session, "toggle 9").contains("No task with id 9"));
        assert!(exec(&mut session, "rm 1").contains("Deleted task 1"));
        assert!(exec(&mut session, "rm 1").contains("No task with id 1"));
        assert!(session.store().is_empty());
    }

    #[test]
    fn test_edit_applies_update() {
        let mut session = session();
        exec(&mut session, "add Draft #Work @2024-02-01");
        exec(&mut session, "edit 1 Final report !high #- +done");

        let task = session.store().get(TaskId(1)).unwrap();
        assert_eq!(task.text, "Final report");
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.category, None);
        assert_eq!(task.due_date, Some(date(2024, 2, 1)));
        assert!(task.completed);
    }

    #[test]
    fn test_list_text_output_order() {
        let mut session = session();
        exec(&mut session, "add Alpha !low");
        exec(&mut session, "add Bravo !high");
        exec(&mut session, "add Charlie !medium");

        let output = exec(&mut session, "list");
        let bravo = output.find("Bravo").unwrap();
        let charlie = output.find("Charlie").unwrap();
        let alpha = output.find("Alpha").unwrap();
        assert!(bravo < charlie && charlie < alpha);
    }

    #[test]
    fn test_list_empty_messages() {
        let mut session = session();
        assert!(exec(&mut session, "list").contains("Add a task"));
        assert!(exec(&mut session, "list active").contains("All tasks are completed"));
        assert!(exec(&mut session, "list completed").contains("Nothing completed"));
    }

    #[test]
    fn test_list_json_output() {
        let mut session = Session::new(SessionConfig {
            json: true,
            ..Default::default()
        });
        exec(&mut session, "add Buy milk #Shopping");
        exec(&mut session, "add Pay rent !high");

        let output = exec(&mut session, "list shopping");
        let tasks: Vec<Task> = serde_json::from_str(&output).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].text, "Buy milk");
        assert_eq!(tasks[0].category.as_deref(), Some("Shopping"));
    }

    #[test]
    fn test_stats_output() {
        let mut session = session();
        exec(&mut session, "add Old bill @2000-01-01");
        exec(&mut session, "add Far future @2999-01-01");
        exec(&mut session, "add Done already");
        exec(&mut session, "toggle 3");

        let output = exec(&mut session, "stats");
        assert_eq!(output.trim(), "3 tasks: 2 active, 1 completed, 1 overdue");
    }

    #[test]
    fn test_run_counts_failures_and_continues() {
        let mut session = session();
        let script = "\
// seed
add Buy milk !low
add
bogus command
add Pay rent !high
";
        let mut out = Vec::new();
        let summary = session.run(Cursor::new(script), &mut out, false).unwrap();

        assert_eq!(summary, RunSummary { commands: 4, failures: 2 });
        assert_eq!(session.store().len(), 2);

        let output = String::from_utf8(out).unwrap();
        assert!(output.contains("error: line 3"));
        assert!(output.contains("error: line 4"));
    }

    #[test]
    fn test_run_json_reports_failures_as_json() {
        let mut session = Session::new(SessionConfig {
            json: true,
            ..Default::default()
        });
        let mut out = Vec::new();
        let summary = session
            .run(Cursor::new("add Buy milk\nadd\nnonsense\n"), &mut out, false)
            .unwrap();
        assert_eq!(summary.failures, 2);

        let output = String::from_utf8(out).unwrap();
        let lines: Vec<serde_json::Value> = output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["id"], 1);
        assert_eq!(lines[1]["line"], 2);
        assert_eq!(lines[2]["line"], 3);
        assert!(lines[2]["error"].as_str().unwrap().contains("Unknown command"));
    }

    #[test]
    fn test_help_lists_aliases() {
        assert!(HELP.contains("delete"));
        assert!(HELP.contains("ls"));
        assert_eq!(
            Command::parse("delete 2", Priority::Medium).unwrap(),
            Some(Command::Remove(TaskId(2)))
        );
        assert_eq!(
            Command::parse("ls active", Priority::Medium).unwrap(),
            Command::parse("list active", Priority::Medium).unwrap()
        );
    }

    #[test]
    fn test_run_stops_at_quit() {
        let mut session = session();
        let mut out = Vec::new();
        let summary = session
            .run(Cursor::new("add One\nquit\nadd Two\n"), &mut out, false)
            .unwrap();

        assert_eq!(summary.commands, 2);
        assert_eq!(session.store().len(), 1);
    }

    #[test]
    fn test_run_file() {
        let temp = TempDir::new().unwrap();
        let script_path = temp.path().join("tasks.todo");
        std::fs::write(&script_path, "add Water plants #Home\ntoggle 1\n").unwrap();

        let mut session = session();
        let mut out = Vec::new();
        let summary = session.run_file(&script_path, &mut out).unwrap();

        assert_eq!(summary.failures, 0);
        assert!(session.store().get(TaskId(1)).unwrap().completed);
    }

    #[test]
    fn test_run_file_missing() {
        let temp = TempDir::new().unwrap();
        let mut session = session();
        let mut out = Vec::new();

        assert!(session.run_file(temp.path().join("missing.todo"), &mut out).is_err());
    }

    #[test]
    fn test_render_task_contains_fields() {
        let task = Task {
            id: TaskId(5),
            text: "Renew passport".to_string(),
            completed: false,
            priority: Priority::High,
            category: Some("Admin".to_string()),
            due_date: Some(date(2024, 3, 1)),
            created_at: chrono::Utc::now(),
        };
        let now = date(2024, 1, 1).and_hms_opt(0, 0, 0).unwrap();

        let line = render_task(&task, now);
        assert!(line.starts_with("[ ]"));
        assert!(line.contains("Renew passport"));
        assert!(line.contains("high"));
        assert!(line.contains("Admin"));
        assert!(line.contains("2024-03-01"));
    }
}

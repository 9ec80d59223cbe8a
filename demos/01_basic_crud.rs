//! Demo 01: Basic CRUD and views
//!
//! Creates a few tasks, toggles and edits them, then prints the sorted view
//! for each status filter.
//!
//! Run with: cargo run --example 01_basic_crud

use chrono::NaiveDate;
use eyre::{Result, eyre};
use todostore::{NewTask, Priority, StatusFilter, TaskStore, TaskUpdate, ViewQuery};

fn date(y: i32, m: u32, d: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d).ok_or_else(|| eyre!("invalid date {}-{}-{}", y, m, d))
}

fn main() -> Result<()> {
    println!("TodoStore Basic CRUD Demo");
    println!("=========================\n");

    let mut store = TaskStore::new();
    println!("Session: {}\n", store.session_id());

    // CREATE
    println!("1. CREATE - Adding tasks...");
    let report = store.create(NewTask::new("Finish report", Priority::High).with_due_date(date(2024, 1, 10)?))?;
    let invoice = store.create(NewTask::new("Send invoice", Priority::High).with_due_date(date(2024, 1, 5)?))?;
    let groceries = store.create(NewTask::new("Buy groceries", Priority::Medium).with_category("Shopping"))?;
    let plants = store.create(NewTask::new("Water plants", Priority::Low))?;
    println!("   Created {} tasks", store.len());

    match store.create(NewTask::new("   ", Priority::High)) {
        Ok(_) => println!("   Blank task accepted?!"),
        Err(e) => println!("   Blank task rejected: {}", e),
    }
    println!();

    // UPDATE
    println!("2. UPDATE - Toggling and editing...");
    store.toggle(plants);
    store.update(groceries, TaskUpdate::default().text("Buy groceries and milk"))?;
    println!("   Toggled task {}, renamed task {}\n", plants, groceries);

    // VIEWS
    for status in [StatusFilter::All, StatusFilter::Active, StatusFilter::Completed] {
        println!("3. VIEW - {}:", status);
        for task in store.view(&ViewQuery::new(status)) {
            let mark = if task.completed { "x" } else { " " };
            println!("   [{}] {} {} ({})", mark, task.id, task.text, task.priority);
        }
        println!();
    }

    println!("4. SEARCH - 'shop':");
    for task in store.view(&ViewQuery::default().search("shop")) {
        println!("   {} {}", task.id, task.text);
    }
    println!();

    // DELETE
    println!("5. DELETE - Removing tasks {} and {}...", report, invoice);
    store.delete(report);
    store.delete(invoice);
    println!("   Deleting again is a no-op: {}", store.delete(report));
    println!("   Remaining tasks: {}\n", store.len());

    println!("Demo complete!");
    Ok(())
}

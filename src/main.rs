mod auth;
mod db;
mod models;
mod session;

use anyhow::Result;
use clap::{Parser, Subcommand};
use dialoguer::{Confirm, Input, Password, Select};

use db::Database;
use models::{Record, RecordDraft};
use session::Session;

#[derive(Parser)]
#[command(name = "subtrack")]
#[command(about = "Track job-application submissions in a local database")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Register a new user account
    Register,

    /// Start an interactive session
    Shell,

    /// Dump all records as JSON (requires login)
    Export,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let db = Database::open()?;
    db.init()?;

    match cli.command {
        Commands::Init => {
            println!("Database initialized at {}", db.path().display());
        }

        Commands::Register => {
            let mut session = Session::new(db);
            register_form(&mut session)?;
        }

        Commands::Shell => {
            run_shell(Session::new(db))?;
        }

        Commands::Export => {
            let mut session = Session::new(db);
            if login_form(&mut session)? {
                let records = session.records()?;
                println!("{}", serde_json::to_string_pretty(&records)?);
            }
        }
    }

    Ok(())
}

// --- Interactive shell ---

fn run_shell(mut session: Session) -> Result<()> {
    println!("subtrack - type 'help' for commands once logged in.");
    loop {
        if !session.is_authenticated() {
            match auth_screen(&mut session)? {
                AuthOutcome::LoggedIn => {
                    print_records(&session.records()?);
                }
                AuthOutcome::Quit => break,
                AuthOutcome::Stay => {}
            }
        } else {
            let line: String = Input::new()
                .with_prompt("subtrack")
                .allow_empty(true)
                .interact_text()?;
            match shell_command(&mut session, line.trim()) {
                Ok(ShellOutcome::Continue) => {}
                Ok(ShellOutcome::Quit) => break,
                Err(e) => eprintln!("Error: {e:#}"),
            }
        }
    }
    Ok(())
}

enum AuthOutcome {
    LoggedIn,
    Stay,
    Quit,
}

fn auth_screen(session: &mut Session) -> Result<AuthOutcome> {
    let choice = Select::new()
        .with_prompt("Welcome to subtrack")
        .items(&["Log in", "Register", "Quit"])
        .default(0)
        .interact()?;

    match choice {
        0 => {
            if login_form(session)? {
                Ok(AuthOutcome::LoggedIn)
            } else {
                Ok(AuthOutcome::Stay)
            }
        }
        1 => {
            register_form(session)?;
            Ok(AuthOutcome::Stay)
        }
        _ => Ok(AuthOutcome::Quit),
    }
}

fn login_form(session: &mut Session) -> Result<bool> {
    let username: String = Input::new().with_prompt("Username").interact_text()?;
    let password = Password::new().with_prompt("Password").interact()?;

    if session.login(&username, &password)? {
        println!("Welcome, {username}!");
        Ok(true)
    } else {
        println!("Invalid username or password.");
        Ok(false)
    }
}

fn register_form(session: &mut Session) -> Result<()> {
    let username: String = Input::new().with_prompt("Username").interact_text()?;
    let password = Password::new()
        .with_prompt("Password")
        .with_confirmation("Confirm password", "Passwords do not match")
        .interact()?;

    match session.register(&username, &password) {
        Ok(_) => println!("Registered '{username}'. You can now log in."),
        Err(e) => println!("Registration failed: {e}"),
    }
    Ok(())
}

enum ShellOutcome {
    Continue,
    Quit,
}

fn shell_command(session: &mut Session, line: &str) -> Result<ShellOutcome> {
    let mut parts = line.split_whitespace();
    let command = parts.next().unwrap_or("");
    let arg = parts.next();

    match command {
        "" => {}

        "list" => print_records(&session.records()?),

        "add" => {
            let draft = record_form(None)?;
            let (id, records) = session.add_record(&draft)?;
            println!("Added record #{id}");
            print_records(&records);
        }

        "edit" => {
            let id = parse_id(arg, "edit")?;
            match session.begin_edit(id)? {
                Some(prefill) => {
                    let draft = record_form(Some(prefill))?;
                    let (changed, records) = session.submit_edit(&draft)?;
                    if changed > 0 {
                        println!("Record #{id} updated.");
                    } else {
                        println!("Record #{id} not found.");
                    }
                    print_records(&records);
                }
                None => println!("Record #{id} not found."),
            }
        }

        "delete" => {
            let id = parse_id(arg, "delete")?;
            match session.get_record(id)? {
                Some(record) => {
                    let confirmed = Confirm::new()
                        .with_prompt(format!(
                            "Delete the record for {} (#{id})? This cannot be undone.",
                            record.company
                        ))
                        .default(false)
                        .interact()?;
                    if confirmed {
                        let (changed, records) = session.delete_record(id)?;
                        if changed > 0 {
                            println!("Record #{id} deleted.");
                        } else {
                            println!("Record #{id} not found.");
                        }
                        print_records(&records);
                    }
                }
                None => println!("Record #{id} not found."),
            }
        }

        "export" => {
            let records = session.records()?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }

        "logout" => {
            session.logout();
            println!("Logged out.");
        }

        "quit" | "exit" => return Ok(ShellOutcome::Quit),

        "help" => print_help(),

        other => println!("Unknown command '{other}'. Type 'help' for commands."),
    }

    Ok(ShellOutcome::Continue)
}

fn parse_id(arg: Option<&str>, command: &str) -> Result<i64> {
    let raw = arg.ok_or_else(|| anyhow::anyhow!("usage: {command} <id>"))?;
    raw.parse()
        .map_err(|_| anyhow::anyhow!("'{raw}' is not a record id"))
}

fn record_form(prefill: Option<RecordDraft>) -> Result<RecordDraft> {
    let base = prefill.unwrap_or_else(|| RecordDraft {
        submission_time: chrono::Local::now().format("%Y-%m-%dT%H:%M").to_string(),
        ..Default::default()
    });

    let submission_time: String = Input::new()
        .with_prompt("Submission time (YYYY-MM-DDTHH:MM)")
        .with_initial_text(base.submission_time)
        .interact_text()?;
    let company: String = Input::new()
        .with_prompt("Company")
        .with_initial_text(base.company)
        .interact_text()?;
    let status: String = Input::new()
        .with_prompt("Status")
        .with_initial_text(base.status)
        .interact_text()?;

    Ok(RecordDraft {
        submission_time,
        company,
        status,
        interview_details: optional_field("Interview details", base.interview_details)?,
        business: optional_field("Business", base.business)?,
        address: optional_field("Address", base.address)?,
        benefits: optional_field("Benefits", base.benefits)?,
    })
}

fn optional_field(label: &str, initial: Option<String>) -> Result<Option<String>> {
    let value: String = Input::new()
        .with_prompt(label)
        .with_initial_text(initial.unwrap_or_default())
        .allow_empty(true)
        .interact_text()?;
    Ok(if value.is_empty() { None } else { Some(value) })
}

fn print_records(records: &[Record]) {
    if records.is_empty() {
        println!("No records yet.");
        return;
    }
    println!(
        "{:<5} {:<17} {:<20} {:<12} {:<20} {:<14} {:<16} {:<14}",
        "ID", "SUBMITTED", "COMPANY", "STATUS", "INTERVIEW", "BUSINESS", "ADDRESS", "BENEFITS"
    );
    println!("{}", "-".repeat(124));
    for record in records {
        println!(
            "{:<5} {:<17} {:<20} {:<12} {:<20} {:<14} {:<16} {:<14}",
            record.id,
            truncate(&record.submission_time.replace('T', " "), 16),
            truncate(&record.company, 18),
            truncate(&record.status, 10),
            truncate(record.interview_details.as_deref().unwrap_or("-"), 18),
            truncate(record.business.as_deref().unwrap_or("-"), 12),
            truncate(record.address.as_deref().unwrap_or("-"), 14),
            truncate(record.benefits.as_deref().unwrap_or("-"), 12),
        );
    }
}

fn print_help() {
    println!("Commands:");
    println!("  list          Show all records, newest first");
    println!("  add           Add a new submission record");
    println!("  edit <id>     Edit all fields of a record");
    println!("  delete <id>   Delete a record (asks for confirmation)");
    println!("  export        Dump all records as JSON");
    println!("  logout        Return to the login screen");
    println!("  quit          Exit");
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}

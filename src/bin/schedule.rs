use anyhow::{bail, Context, Result};
use chrono::{Datelike, Local, NaiveDate};
use clap::{Parser, Subcommand};

use study_planner::client::{FormField, Notice, ScheduleClient, ScheduleController};
use study_planner::config::{ClientConfig, LogFormat};
use study_planner::models::Event;
use study_planner::store::DeleteOutcome;
use study_planner::telemetry;

#[derive(Parser)]
#[command(name = "schedule")]
#[command(about = "Manage study events on a Study Planner server")]
struct Cli {
    /// API root, e.g. http://localhost:8000/api (defaults to SCHEDULE_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List scheduled events
    List {
        /// Only events starting on this day (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Schedule a new event
    Add {
        #[arg(short, long)]
        title: String,

        #[arg(short, long)]
        description: String,

        /// Start date/time (e.g. "2024-04-01T09:00")
        #[arg(short, long)]
        start: String,

        /// End date/time
        #[arg(short, long)]
        end: String,
    },
    /// Delete an event by id
    Delete {
        id: i64,
    },
    /// Show a month calendar with event days marked
    Calendar {
        /// Month to show (YYYY-MM), defaults to the current month
        #[arg(long)]
        month: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string());
    telemetry::init(&rust_log, LogFormat::Pretty);

    let mut config = ClientConfig::from_env()?;
    if let Some(url) = cli.api_url {
        config.base_url = url;
    }

    run(cli.command, &config, Local::now().date_naive()).await
}

async fn run(command: Commands, config: &ClientConfig, today: NaiveDate) -> Result<()> {
    let client = ScheduleClient::from_config(config)?;
    let mut controller = ScheduleController::new(client, today);

    // Список нужен только для чтения; add и delete сами перечитают его после запроса
    controller.mount().await;
    let fetched = report_notices(&mut controller) == 0;

    match command {
        Commands::List { date } => {
            if !fetched {
                bail!("could not load events");
            }
            match date {
                Some(date) => print_events(controller.events_on(date)),
                None => print_events(controller.events().iter()),
            }
        }
        Commands::Add { title, description, start, end } => {
            controller.edit(FormField::Title, title);
            controller.edit(FormField::Description, description);
            controller.edit(FormField::Start, start);
            controller.edit(FormField::End, end);

            let id = controller.submit().await;
            report_notices(&mut controller);
            match id {
                Some(id) => println!("Created event #{}", id),
                None => bail!("event was not created"),
            }
        }
        Commands::Delete { id } => {
            let outcome = controller.delete(id).await;
            report_notices(&mut controller);
            match outcome {
                Some(DeleteOutcome::Deleted) => println!("Event #{} removed", id),
                Some(DeleteOutcome::NotFound) => println!("Event #{} not found", id),
                None => bail!("event #{} was not deleted", id),
            }
        }
        Commands::Calendar { month } => {
            if !fetched {
                bail!("could not load events");
            }
            let (year, month) = match month {
                Some(value) => parse_month(&value)?,
                None => (today.year(), today.month()),
            };
            let grid = controller
                .render_month(year, month)
                .context("month out of range")?;
            println!("{}", grid);
        }
    }

    Ok(())
}

fn parse_month(value: &str) -> Result<(i32, u32)> {
    let date = NaiveDate::parse_from_str(&format!("{}-01", value.trim()), "%Y-%m-%d")
        .with_context(|| format!("expected YYYY-MM, got {:?}", value))?;
    Ok((date.year(), date.month()))
}

fn print_events<'a>(events: impl IntoIterator<Item = &'a Event>) {
    let mut empty = true;
    for event in events {
        empty = false;
        println!("#{:<5} {}  [{} - {}]", event.id, event.title, event.start, event.end);
        println!("       {}", event.description);
    }
    if empty {
        println!("No events added yet.");
    }
}

/// Печатает накопленные уведомления и возвращает их количество.
fn report_notices(controller: &mut ScheduleController) -> usize {
    let notices = controller.take_notices();
    for notice in &notices {
        match notice {
            Notice::Alert(message) => eprintln!("! {}", message),
            Notice::Error(message) => eprintln!("error: {}", message),
        }
    }
    notices.len()
}

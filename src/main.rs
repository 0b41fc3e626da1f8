use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use brewstock::catalog::{
    add_ingredient, classify_row, edit_ingredient_details, filter_ingredients, is_container_low, save_settings,
    unit_for_type, IngredientDetails, Measure, NewIngredient, StockStatus,
};
use brewstock::db::{JsonFileSeed, SqliteStore};
use brewstock::export::{export_ingredients_csv, export_json};
use brewstock::import::{import_ingredients, import_state_json, read_csv};
use brewstock::ledger::{ContainerMovement, Direction, IngredientMovement, StockMovement};
use brewstock::numeric::{parse_count, parse_quantity};
use brewstock::settings::Settings;
use brewstock::{Confirmation, Ledger, Outcome, Tracker};

#[derive(Parser)]
#[command(name = "brewstock", version, about = "Brewery ingredient and packaging stock ledger")]
struct Cli {
    /// Database file, overriding BREWSTOCK_DATABASE_PATH.
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum MoveKind {
    In,
    Out,
    Adjust,
}

#[derive(Clone, Copy, ValueEnum)]
enum Flow {
    In,
    Out,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingredient table with stock status.
    List {
        #[arg(long, default_value = "")]
        query: String,
        #[arg(long)]
        only_low: bool,
    },
    /// Add an ingredient lot and log its initial stock.
    Add {
        #[arg(long = "type")]
        type_label: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        supplier: String,
        #[arg(long, default_value = "")]
        name_supplier: String,
        #[arg(long, default_value = "")]
        lot: String,
        #[arg(long, default_value = "")]
        spec: String,
        #[arg(long, default_value = "")]
        packaging: String,
        #[arg(long, default_value = "")]
        notes: String,
        /// Initial quantity in grams.
        #[arg(long, default_value = "0")]
        qty: String,
    },
    /// Stock-in, stock-out or adjustment of an ingredient, in grams.
    Move {
        id: String,
        #[arg(value_enum)]
        kind: MoveKind,
        #[arg(allow_hyphen_values = true)]
        quantity: String,
        #[arg(long, default_value = "")]
        reason: String,
        #[arg(long, default_value = "")]
        notes: String,
        /// Accept a stock-out that leaves a negative balance.
        #[arg(long)]
        yes: bool,
    },
    /// Log an adjustment not tied to any ingredient.
    Global {
        #[arg(allow_hyphen_values = true)]
        quantity: String,
        #[arg(long, default_value = "")]
        reason: String,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Packaging counts.
    Containers,
    /// Receive or consume packaging units.
    Container {
        group: String,
        size: String,
        #[arg(value_enum)]
        direction: Flow,
        quantity: String,
        #[arg(long, default_value = "")]
        reason: String,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Set a packaging count after a recount.
    ContainerSet {
        group: String,
        size: String,
        #[arg(allow_hyphen_values = true)]
        value: String,
    },
    /// Register a new packaging format.
    ContainerFormat { group: String, size: String },
    /// Movement log, oldest first.
    Movements,
    /// Show or change thresholds and the negative-stock policy.
    Settings {
        #[arg(long)]
        malt: Option<String>,
        #[arg(long)]
        hop: Option<String>,
        #[arg(long)]
        yeast: Option<String>,
        #[arg(long)]
        grain: Option<String>,
        #[arg(long)]
        other: Option<String>,
        /// GROUP=COUNT, repeatable.
        #[arg(long = "container-threshold")]
        container_thresholds: Vec<String>,
        #[arg(long)]
        block_negative: Option<bool>,
    },
    /// Change packaging or notes of an ingredient.
    Edit {
        id: String,
        #[arg(long)]
        packaging: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Replace all ingredients with the rows of a stock CSV.
    ImportCsv {
        file: PathBuf,
        #[arg(long)]
        yes: bool,
    },
    /// Replace the whole state with a JSON dump.
    ImportJson {
        file: PathBuf,
        #[arg(long)]
        yes: bool,
    },
    ExportJson { file: Option<PathBuf> },
    ExportCsv { file: Option<PathBuf> },
}

/// Asks a yes/no question on the terminal. Anything but y/yes is a no.
fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn write_output(file: Option<PathBuf>, content: &str) -> Result<()> {
    match file {
        Some(path) => std::fs::write(&path, content).with_context(|| format!("writing {}", path.display())),
        None => {
            println!("{}", content);
            Ok(())
        }
    }
}

fn parse_threshold(raw: Option<String>, current: f64) -> Result<f64> {
    match raw {
        Some(text) => Ok(parse_quantity(&text)?),
        None => Ok(current),
    }
}

fn run(command: Commands, tracker: &Tracker<SqliteStore>) -> Result<()> {
    match command {
        Commands::List { query, only_low } => {
            let state = tracker.state()?;
            for item in filter_ingredients(&state, &query, only_low) {
                let status = match classify_row(item, &state.config) {
                    StockStatus::Negative => "NEGATIVE",
                    StockStatus::Low => "low",
                    StockStatus::Ok => "ok",
                };
                let unit = match unit_for_type(item.type_label()) {
                    Measure::Mass => "g",
                    Measure::Count => "units",
                };
                let qty = |v: Option<f64>| v.map(|n| n.to_string()).unwrap_or_else(|| "?".into());
                println!(
                    "{:<40} {:<8} {:<24} {:<10} {:>10} {:>10} {:>10} {:<5} {}",
                    item.id(),
                    item.type_label(),
                    item.display_label(),
                    item.kind.spec_text(),
                    qty(item.initial_qty()),
                    qty(item.used_qty()),
                    qty(item.remaining_qty()),
                    unit,
                    status
                );
            }
        }
        Commands::Add {
            type_label,
            name,
            supplier,
            name_supplier,
            lot,
            spec,
            packaging,
            notes,
            qty,
        } => {
            let fields = NewIngredient {
                type_label,
                supplier,
                name,
                name_supplier,
                lot_number: lot,
                spec,
                packaging,
                notes,
                initial_qty: parse_quantity(&qty)?,
            };
            let today = chrono::Local::now().date_naive();
            let id = tracker.transact(|state| add_ingredient(state, fields, today))?;
            println!("added {}", id);
        }
        Commands::Move {
            id,
            kind,
            quantity,
            reason,
            notes,
            yes,
        } => {
            let req = IngredientMovement {
                ingredient_id: id,
                kind: match kind {
                    MoveKind::In => StockMovement::StockIn,
                    MoveKind::Out => StockMovement::StockOut,
                    MoveKind::Adjust => StockMovement::Adjustment,
                },
                quantity: parse_quantity(&quantity)?,
                reason,
                notes,
            };
            let confirmation = if yes { Confirmation::Confirmed } else { Confirmation::NotGiven };
            let mut outcome = tracker.transact(|state| Ledger::new(state).record_ingredient_movement(&req, confirmation))?;
            if let Outcome::NeedsConfirmation { requested, available } = outcome {
                let question = format!(
                    "Stock-out of {} g exceeds the {} g remaining. Continue?",
                    requested, available
                );
                if !confirm(&question)? {
                    println!("cancelled");
                    return Ok(());
                }
                outcome = tracker.transact(|state| {
                    Ledger::new(state).record_ingredient_movement(&req, Confirmation::Confirmed)
                })?;
            }
            if let Outcome::Applied(movement) = outcome {
                println!("{} {} g on {}", movement.kind, movement.quantity, movement.target);
            }
        }
        Commands::Global { quantity, reason, notes } => {
            let quantity = parse_quantity(&quantity)?;
            let movement = tracker.transact(|state| Ledger::new(state).record_global_movement(quantity, &reason, &notes))?;
            println!("{} {} on {}", movement.kind, movement.quantity, movement.target);
        }
        Commands::Containers => {
            let state = tracker.state()?;
            for (group, size, level) in state.containers.iter() {
                let flag = if is_container_low(&state.config, group, level) { "low" } else { "" };
                println!("{:<12} {:<8} {:>6} {}", group, size, level, flag);
            }
        }
        Commands::Container {
            group,
            size,
            direction,
            quantity,
            reason,
            notes,
        } => {
            let req = ContainerMovement {
                group,
                size,
                direction: match direction {
                    Flow::In => Direction::In,
                    Flow::Out => Direction::Out,
                },
                quantity: parse_count(&quantity)?,
                reason,
                notes,
            };
            let movement = tracker.transact(|state| Ledger::new(state).record_container_movement(&req))?;
            println!("{} {} on {}", movement.kind, movement.quantity, movement.target);
        }
        Commands::ContainerSet { group, size, value } => {
            let value = parse_count(&value)?;
            let movement = tracker.transact(|state| Ledger::new(state).set_container_level(&group, &size, value))?;
            println!("{} set to {} ({:+})", movement.target, value, movement.quantity);
        }
        Commands::ContainerFormat { group, size } => {
            let added = tracker.transact(|state| Ledger::new(state).register_container_format(&group, &size))?;
            if added {
                println!("format added: {}.{}", group.trim(), size.trim());
            } else {
                println!("format already exists");
            }
        }
        Commands::Movements => {
            for m in tracker.state()?.movements {
                println!(
                    "{} {:<21} {:<32} {:>10} {:<5} {:<20} {}",
                    m.date, m.kind, m.target, m.quantity, m.unit, m.reason, m.notes
                );
            }
        }
        Commands::Settings {
            malt,
            hop,
            yeast,
            grain,
            other,
            container_thresholds,
            block_negative,
        } => {
            let mut config = tracker.state()?.config;
            let t = &mut config.thresholds;
            t.malt = parse_threshold(malt, t.malt)?;
            t.hop = parse_threshold(hop, t.hop)?;
            t.yeast = parse_threshold(yeast, t.yeast)?;
            t.grain = parse_threshold(grain, t.grain)?;
            t.other = parse_threshold(other, t.other)?;
            for entry in container_thresholds {
                let Some((group, count)) = entry.split_once('=') else {
                    bail!("container threshold must look like GROUP=COUNT, got '{}'", entry);
                };
                config
                    .container_thresholds
                    .insert(group.trim().to_string(), parse_count(count)?);
            }
            if let Some(flag) = block_negative {
                config.block_negative = flag;
            }
            let shown = config.clone();
            tracker.transact(|state| save_settings(state, config))?;
            println!("{}", serde_json::to_string_pretty(&shown)?);
        }
        Commands::Edit { id, packaging, notes } => {
            tracker.transact(|state| edit_ingredient_details(state, &id, IngredientDetails { packaging, notes }))?;
            println!("updated {}", id);
        }
        Commands::ImportCsv { file, yes } => {
            let text = std::fs::read_to_string(&file).with_context(|| format!("reading {}", file.display()))?;
            let table = read_csv(&text)?;
            if !yes && !confirm("Importing replaces every ingredient. Continue?")? {
                println!("cancelled");
                return Ok(());
            }
            let count = tracker.transact(|state| import_ingredients(state, &table))?;
            println!("imported {} ingredients", count);
        }
        Commands::ImportJson { file, yes } => {
            let text = std::fs::read_to_string(&file).with_context(|| format!("reading {}", file.display()))?;
            let state = import_state_json(&text)?;
            if !yes && !confirm("Importing replaces all data. Continue?")? {
                println!("cancelled");
                return Ok(());
            }
            tracker.replace(&state)?;
            println!("state replaced ({} ingredients)", state.ingredients.len());
        }
        Commands::ExportJson { file } => write_output(file, &export_json(&tracker.state()?)?)?,
        Commands::ExportCsv { file } => write_output(file, &export_ingredients_csv(&tracker.state()?)?)?,
    }
    Ok(())
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let settings = Settings::load().context("loading settings")?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(settings.log_filter.as_str())).init();

    let cli = Cli::parse();
    let db_path = cli.db.unwrap_or(settings.database_path);
    let store = SqliteStore::open(&db_path).with_context(|| format!("opening {}", db_path.display()))?;
    let mut tracker = Tracker::new(store);
    if let Some(seed) = settings.seed_path {
        tracker = tracker.with_seed(JsonFileSeed::new(seed));
    }

    run(cli.command, &tracker)
}

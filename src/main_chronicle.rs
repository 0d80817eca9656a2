//! ZIGGURAT CHRONICLE - Command Line Entry Point
//!
//! Create, inspect and evolve characters stored as JSON files.
//! Flow: load config → open repository → load revision → operate → save

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use ziggurat_chronicle::demiurge::Age;
use ziggurat_chronicle::initiation::config::DEFAULT_CONFIG_PATH;
use ziggurat_chronicle::initiation::SystemComponents;
use ziggurat_chronicle::{
    CharacterRepository, EvolveOptions, Identity, InitiationManager, KnowledgeItem, MemoryEntry,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (defaults are used when it does not exist)
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Override the configured character data directory
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new character and print its id
    New {
        #[arg(long)]
        name: String,
        /// Age in years, or a descriptive word such as "ancient"
        #[arg(long)]
        age: Option<Age>,
        #[arg(long)]
        role: Option<String>,
    },
    /// Print a character as JSON
    Show { id: Uuid },
    /// List stored character ids
    List,
    /// Advance a character over elapsed time
    Evolve {
        id: Uuid,
        #[arg(long, default_value_t = 0.0)]
        days: f64,
        #[arg(long, default_value_t = 0.0)]
        years: f64,
        /// Leave the identity age untouched
        #[arg(long)]
        no_age: bool,
        /// Leave memories untouched
        #[arg(long)]
        no_memory: bool,
        /// Keep memories however faint they become
        #[arg(long, conflicts_with = "prune_threshold")]
        no_prune: bool,
        #[arg(long)]
        prune_threshold: Option<f64>,
        /// Also apply cognitive growth in the same revision
        #[arg(long)]
        grow: bool,
    },
    /// Add a memory
    Remember {
        id: Uuid,
        content: String,
        #[arg(long)]
        importance: Option<f64>,
        #[arg(long)]
        decay_rate: Option<f64>,
        #[arg(long)]
        category: Option<String>,
    },
    /// Add a knowledge item
    Learn {
        id: Uuid,
        topic: String,
        #[arg(long, default_value = "")]
        content: String,
        #[arg(long)]
        confidence: Option<f64>,
    },
    /// Raise maturity by an amount
    Mature { id: Uuid, amount: f64 },
    /// Lower maturity by the configured decay rate
    Decay { id: Uuid },
    /// Advance the temporal age by one
    Age { id: Uuid },
    /// Apply cognitive growth
    Grow { id: Uuid },
    /// Deep-merge a JSON object into the character
    Update { id: Uuid, attrs: String },
    /// Print the history log
    History {
        id: Uuid,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Delete a character
    Delete { id: Uuid },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut initiation = InitiationManager::from_path(&args.config)?;
    if let Some(data_dir) = args.data_dir.clone() {
        initiation = initiation.with_data_dir(data_dir);
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&initiation.config().logging.filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let system = initiation.init_system()?;
    run(&system, args.command)
}

fn run(system: &SystemComponents, command: Command) -> Result<()> {
    let engine = &system.engine;
    let repo = &system.repository;

    let load = |id: Uuid| {
        repo.get(id)
            .with_context(|| format!("failed to load character {}", id))
    };

    match command {
        Command::New { name, age, role } => {
            let mut identity = Identity::named(name);
            identity.age = age;
            identity.role = role;
            let character = system
                .draft(identity)?
                .build(engine.config())
                .context("invalid character")?;
            repo.save(&character)?;
            println!("{}", character.id());
        }
        Command::Show { id } => {
            println!("{}", serde_json::to_string_pretty(&load(id)?)?);
        }
        Command::List => {
            for id in repo.list_ids()? {
                let character = load(id)?;
                println!(
                    "{}  v{}  {}  {} ({:.3})",
                    id,
                    character.version(),
                    character.identity().name,
                    character.temporal_state().stage(),
                    character.temporal_state().maturity()
                );
            }
        }
        Command::Evolve {
            id,
            days,
            years,
            no_age,
            no_memory,
            no_prune,
            prune_threshold,
            grow,
        } => {
            let defaults = system.evolve_options();
            let options = EvolveOptions {
                days,
                years,
                age_enabled: !no_age,
                memory_enabled: !no_memory,
                prune_threshold: if no_prune {
                    None
                } else {
                    prune_threshold.or(defaults.prune_threshold)
                },
                cognitive_growth: grow,
            };
            let current = load(id)?;
            let evolved = engine.evolve(&current, &options)?;
            if evolved.version() == current.version() {
                println!("unchanged (v{})", current.version());
            } else {
                repo.save(&evolved)?;
                report(&evolved);
            }
        }
        Command::Remember {
            id,
            content,
            importance,
            decay_rate,
            category,
        } => {
            let mut entry = MemoryEntry::new(content)?;
            if let Some(importance) = importance {
                entry = entry.with_importance(importance);
            }
            if let Some(decay_rate) = decay_rate {
                entry = entry.with_decay_rate(decay_rate);
            }
            if let Some(category) = category {
                entry = entry.with_category(category);
            }
            let next = engine.remember(&load(id)?, entry)?;
            repo.save(&next)?;
            report(&next);
        }
        Command::Learn {
            id,
            topic,
            content,
            confidence,
        } => {
            let mut item = KnowledgeItem::new(topic, content);
            if let Some(confidence) = confidence {
                item = item.with_confidence(confidence);
            }
            let next = engine.learn(&load(id)?, item)?;
            repo.save(&next)?;
            report(&next);
        }
        Command::Mature { id, amount } => {
            let next = engine.increase_maturity(&load(id)?, amount)?;
            repo.save(&next)?;
            report(&next);
        }
        Command::Decay { id } => {
            let next = engine.apply_decay(&load(id)?)?;
            repo.save(&next)?;
            report(&next);
        }
        Command::Age { id } => {
            let next = engine.increment_age(&load(id)?)?;
            repo.save(&next)?;
            report(&next);
        }
        Command::Grow { id } => {
            let next = engine.apply_cognitive_growth(&load(id)?)?;
            repo.save(&next)?;
            report(&next);
        }
        Command::Update { id, attrs } => {
            let attrs: serde_json::Value =
                serde_json::from_str(&attrs).context("attributes must be valid JSON")?;
            let next = engine.update(&load(id)?, &attrs)?;
            repo.save(&next)?;
            report(&next);
        }
        Command::History { id, limit } => {
            let character = load(id)?;
            let history = character.history();
            let events = match limit {
                Some(n) => history.recent(n),
                None => history.events(),
            };
            for event in events {
                println!(
                    "{}  {:<18} {}",
                    event.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    event.event_type().to_string(),
                    event.description
                );
            }
        }
        Command::Delete { id } => {
            repo.delete(id)?;
            println!("deleted {}", id);
        }
    }

    Ok(())
}

fn report(character: &ziggurat_chronicle::Character) {
    let temporal = character.temporal_state();
    println!(
        "v{}  age {}  maturity {:.3}  stage {}  memories {}/{}",
        character.version(),
        temporal.age(),
        temporal.maturity(),
        temporal.stage(),
        character.memory_store().len(),
        character.memory_store().capacity()
    );
}

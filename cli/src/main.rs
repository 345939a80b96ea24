use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use stashbuff_cli::commands::{self, Placement};
use stashbuff_cli::context::resolve_config_path;
use stashbuff_cli::{CliContext, logging, readline};
use stashbuff_core::config::default_config_path;

fn main() -> Result<(), String> {
    let mut log = logging::init();

    let config_path = resolve_config_path(
        std::env::args().nth(1).map(PathBuf::from),
        default_config_path(),
    );
    match &config_path {
        Some(path) => tracing::info!(path = %path.display(), "Loading buff mapping"),
        None => tracing::info!("No buff mapping file, using built-in defaults"),
    }
    let mut ctx = CliContext::new(config_path);
    log.set_debug_mode(ctx.config().settings.debug_mode);

    loop {
        let line = readline()?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let result = respond(line, &mut ctx);
        log.set_debug_mode(ctx.config().settings.debug_mode);
        match result {
            Ok(quit) => {
                if quit {
                    break;
                }
            }
            Err(err) => {
                writeln!(std::io::stdout(), "{err}").map_err(|e| e.to_string())?;
                std::io::stdout().flush().map_err(|e| e.to_string())?;
            }
        }
    }

    Ok(())
}

#[derive(Parser)]
#[command(version, about = "stashbuff sandbox")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a buff mapping file and rebuild the world
    LoadConfig {
        #[arg(short, long)]
        path: String,
        /// Copied into place when `path` does not exist
        #[arg(short, long)]
        template: Option<String>,
    },
    /// Load a fresh area
    Area {
        #[arg(short, long)]
        excluded: bool,
    },
    /// Create a target container in the inventory, pet inventory or a slot
    SpawnContainer {
        #[arg(short, long, default_value_t = 8)]
        slots: usize,
        #[arg(short, long, default_value_t = 0)]
        index: usize,
        #[arg(long)]
        pet: bool,
        #[arg(long, conflicts_with = "pet")]
        slot: Option<String>,
    },
    /// Create an item stack inside a container slot
    Put {
        #[arg(short, long)]
        container: u64,
        #[arg(short, long)]
        index: usize,
        #[arg(short = 't', long)]
        item_type: i32,
        #[arg(short = 'n', long, default_value_t = 1)]
        count: u32,
    },
    SetStack {
        #[arg(short, long)]
        item: u64,
        #[arg(short = 'n', long)]
        count: u32,
    },
    /// Take an item out of wherever it is
    Take {
        #[arg(short, long)]
        item: u64,
    },
    /// Use one unit of an item
    Use {
        #[arg(short, long)]
        item: u64,
    },
    /// Run host frames
    Frame {
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,
    },
    Status,
    Exit,
}

fn respond(line: &str, ctx: &mut CliContext) -> Result<bool, String> {
    let mut args = shlex::split(line).ok_or("error: Invalid quoting")?;
    args.insert(0, "stashbuff".to_string());
    let cli = Cli::try_parse_from(args).map_err(|e| e.to_string())?;

    match cli.command {
        Some(Commands::LoadConfig { path, template }) => {
            commands::load_config(&path, template.as_deref(), ctx)?
        }
        Some(Commands::Area { excluded }) => commands::enter_area(excluded, ctx)?,
        Some(Commands::SpawnContainer {
            slots,
            index,
            pet,
            slot,
        }) => {
            let placement = match (&slot, pet) {
                (Some(name), _) => Placement::Slot(name),
                (None, true) => Placement::Pet(index),
                (None, false) => Placement::Inventory(index),
            };
            commands::spawn_container(slots, placement, ctx)?
        }
        Some(Commands::Put {
            container,
            index,
            item_type,
            count,
        }) => commands::put(container, index, item_type, count, ctx)?,
        Some(Commands::SetStack { item, count }) => commands::set_stack(item, count, ctx)?,
        Some(Commands::Take { item }) => commands::take(item, ctx)?,
        Some(Commands::Use { item }) => commands::use_item(item, ctx)?,
        Some(Commands::Frame { count }) => commands::frame(count, ctx),
        Some(Commands::Status) => commands::status(ctx),
        Some(Commands::Exit) => {
            commands::exit(ctx);
            return Ok(true);
        }
        None => {}
    }
    Ok(false)
}

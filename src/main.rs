use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use skillsync::{
    display_path, BackupMetadata, BackupStore, CleanupOptions, Config, CreateOptions, Platform,
    Resolver, ResolverOptions, Scope,
};

#[derive(Parser)]
#[command(name = "skillsync", version, about = "Discover and back up agent skills")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve the effective skill set for a platform
    Discover(DiscoverArgs),
    /// Manage skill backups
    #[command(subcommand)]
    Backup(BackupCommand),
}

#[derive(Args)]
struct DiscoverArgs {
    /// claude-code, cursor or codex
    #[arg(long, short)]
    platform: Platform,
    /// Working directory to resolve from (defaults to the current directory)
    #[arg(long)]
    dir: Option<PathBuf>,
    /// Repository root (detected from the working directory when omitted)
    #[arg(long)]
    repo_root: Option<PathBuf>,
    /// Admin-scope skill directory
    #[arg(long)]
    admin: Option<PathBuf>,
    /// System-scope skill directory
    #[arg(long)]
    system: Option<PathBuf>,
    /// Restrict to these scopes (repeatable)
    #[arg(long = "scope", short)]
    scopes: Vec<Scope>,
    /// Include skills from the Claude Code plugin cache
    #[arg(long)]
    plugins: bool,
    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum BackupCommand {
    /// Back up a file or every file in a directory
    Create {
        path: PathBuf,
        #[arg(long, short)]
        platform: Platform,
        #[arg(long)]
        description: Option<String>,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// List backups, newest first
    List {
        #[arg(long, short)]
        platform: Option<Platform>,
        #[arg(long)]
        json: bool,
    },
    /// List backups of one source file, newest first
    History {
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Check stored files against their recorded hashes (all when no id is given)
    Verify { id: Option<String> },
    /// Restore a backup to its source path or to --to
    Restore {
        id: String,
        #[arg(long)]
        to: Option<PathBuf>,
    },
    /// Delete a backup
    Delete { id: String },
    /// Prune old backups
    Cleanup {
        #[arg(long)]
        max_age_hours: Option<u32>,
        #[arg(long)]
        max_count: Option<usize>,
        #[arg(long)]
        keep_at_least_one: bool,
        #[arg(long)]
        dry_run: bool,
        #[arg(long, short)]
        platform: Option<Platform>,
    },
    /// Summarise the backup index
    Stats {
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    let exit_code = match cli.command {
        Command::Discover(args) => run_discover(&config, args),
        Command::Backup(command) => run_backup(&config, command),
    };

    std::process::exit(exit_code);
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_discover(config: &Config, args: DiscoverArgs) -> i32 {
    let working_dir = match args.dir.map_or_else(std::env::current_dir, Ok) {
        Ok(dir) => dir,
        Err(err) => {
            eprintln!("Unable to determine working directory: {err}");
            return 1;
        }
    };

    let mut options = ResolverOptions::new(args.platform, &working_dir);
    options.repo_root = args.repo_root;
    options.admin_path = args.admin;
    options.system_path = args.system;
    options.include_plugins = args.plugins;

    let resolver = Resolver::new(options, config);
    let skills = if args.scopes.is_empty() {
        resolver.resolve()
    } else {
        resolver.resolve_scopes(&args.scopes)
    };

    if args.json {
        return print_json(&skills);
    }
    if skills.is_empty() {
        eprintln!("No skills found.");
        return 0;
    }
    for skill in &skills {
        let scope = skill.scope.map_or("-", Scope::as_str);
        let rel = display_path(&skill.source_path, &working_dir);
        if skill.description.is_empty() {
            println!("{}\t{scope}\t{rel}", skill.name);
        } else {
            println!("{}\t{scope}\t{rel}\t{}", skill.name, skill.description);
        }
    }
    0
}

fn run_backup(config: &Config, command: BackupCommand) -> i32 {
    let store = BackupStore::from_config(config);

    let result = match command {
        BackupCommand::Create {
            path,
            platform,
            description,
            tags,
        } => {
            let options = CreateOptions {
                description,
                tags,
                ..CreateOptions::default()
            };
            let created = if path.is_dir() {
                store.create_dir(&path, platform, &options)
            } else {
                store.create(&path, platform, &options).map(|entry| vec![entry])
            };
            created.map(|created| {
                for entry in &created {
                    println!("{}\t{}", entry.id, entry.source_path.display());
                }
                0
            })
        }
        BackupCommand::List { platform, json } => store
            .list(platform)
            .map(|entries| print_entries(&entries, json)),
        BackupCommand::History { path, json } => store
            .history(&path)
            .map(|entries| print_entries(&entries, json)),
        BackupCommand::Verify { id: Some(id) } => store.verify(&id).map(|entry| {
            println!("OK\t{}", entry.id);
            0
        }),
        BackupCommand::Verify { id: None } => store.list(None).map(|entries| verify_all(&store, &entries)),
        BackupCommand::Restore { id, to } => store.get(&id).and_then(|entry| {
            let target = to.unwrap_or_else(|| entry.source_path.clone());
            store.restore(&id, &target).map(|_| {
                println!("Restored {id} to {}", target.display());
                0
            })
        }),
        BackupCommand::Delete { id } => store.delete(&id).map(|entry| {
            println!("Deleted {}", entry.id);
            0
        }),
        BackupCommand::Cleanup {
            max_age_hours,
            max_count,
            keep_at_least_one,
            dry_run,
            platform,
        } => {
            let options = CleanupOptions {
                max_age: max_age_hours.map(|hours| chrono::Duration::hours(i64::from(hours))),
                max_count,
                keep_at_least_one,
                dry_run,
                platform,
            };
            store.cleanup(&options).map(|removed| {
                let verb = if dry_run { "Would delete" } else { "Deleted" };
                for entry in &removed {
                    println!("{verb}\t{}\t{}", entry.id, entry.source_path.display());
                }
                0
            })
        }
        BackupCommand::Stats { json } => store.stats().map(|stats| {
            if json {
                return print_json(&stats);
            }
            println!("Backups: {}", stats.total_count);
            println!("Total size: {} bytes", stats.total_size);
            for (platform, count) in &stats.by_platform {
                println!("  {platform}: {count}");
            }
            if stats.total_count > 0 {
                println!("Oldest: {}", stats.oldest.to_rfc3339());
                println!("Newest: {}", stats.newest.to_rfc3339());
            }
            0
        }),
    };

    result.unwrap_or_else(|err| {
        eprintln!("{err}");
        1
    })
}

fn verify_all(store: &BackupStore, entries: &[BackupMetadata]) -> i32 {
    let mut failed = false;
    for entry in entries {
        match store.verify(&entry.id) {
            Ok(_) => println!("OK\t{}", entry.id),
            Err(err) => {
                eprintln!("FAILED\t{}: {err}", entry.id);
                failed = true;
            }
        }
    }
    i32::from(failed)
}

fn print_entries(entries: &[BackupMetadata], json: bool) -> i32 {
    if json {
        return print_json(&entries);
    }
    for entry in entries {
        println!(
            "{}\t{}\t{}\t{}",
            entry.id,
            entry.platform,
            entry.created_at.to_rfc3339(),
            entry.source_path.display()
        );
    }
    0
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{json}");
            0
        }
        Err(err) => {
            eprintln!("Failed to encode JSON: {err}");
            1
        }
    }
}

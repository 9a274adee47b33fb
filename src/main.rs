// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::{error, info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::{Path, PathBuf};

use weblate_trans::app_config::{self, Config};
use weblate_trans::database::{ProjectRecord, SubProjectRecord};
use weblate_trans::formats::load_store;
use weblate_trans::managers::{Managers, RequestType, SearchFields};
use weblate_trans::query::Condition;
use weblate_trans::validators::{
    validate_commit_message, validate_filemask, validate_repo, validate_repoweb,
};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a project
    CreateProject {
        /// Display name
        #[arg(long)]
        name: String,
        /// URL slug
        #[arg(long)]
        slug: String,
        /// Restrict access to users holding the project permission
        #[arg(long)]
        acl: bool,
    },

    /// Create a subproject after validating its settings
    CreateSubproject {
        /// Slug of the owning project
        #[arg(long)]
        project: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        slug: String,
        /// Repository URL or weblate://project/subproject link
        #[arg(long)]
        repo: String,
        /// Translation file mask, `*` stands for the language code
        #[arg(long)]
        filemask: String,
        /// Monolingual base file
        #[arg(long, default_value = "")]
        template: String,
        /// Repository browser URL template
        #[arg(long, default_value = "")]
        repoweb: String,
        /// Commit message template
        #[arg(long, default_value = "")]
        commit_message: String,
    },

    /// Import one translation file
    Import {
        /// project/subproject
        target: String,
        /// Language code
        #[arg(short, long)]
        language: String,
        /// File path relative to the checkout
        #[arg(short, long)]
        file: String,
        /// Repository checkout directory
        #[arg(short, long, default_value = ".")]
        checkout: PathBuf,
        /// Reload even when the file did not change
        #[arg(long)]
        force: bool,
    },

    /// Import every translation file of a checkout
    Scan {
        /// project/subproject
        target: String,
        /// Repository checkout directory
        #[arg(short, long, default_value = ".")]
        checkout: PathBuf,
        /// Reload even when files did not change
        #[arg(long)]
        force: bool,
    },

    /// Upload a glossary file
    Glossary {
        /// Project slug
        project: String,
        /// Language code
        #[arg(short, long)]
        language: String,
        /// PO or JSON glossary file
        #[arg(short, long)]
        file: PathBuf,
        /// Replace translations of existing words
        #[arg(long)]
        overwrite: bool,
    },

    /// Full-text search in a translation
    Search {
        /// project/subproject
        target: String,
        #[arg(short, long)]
        language: String,
        /// Only look at source strings
        #[arg(long)]
        source_only: bool,
        query: String,
    },

    /// List units similar to a unit, as translation suggestions
    Similar {
        /// project/subproject
        target: String,
        #[arg(short, long)]
        language: String,
        /// Checksum of the unit
        checksum: String,
    },

    /// Count units of a translation by request type
    Count {
        /// project/subproject
        target: String,
        #[arg(short, long)]
        language: String,
        /// all, fuzzy, untranslated, suggestions, allchecks, a check name, ...
        #[arg(default_value = "all")]
        request: String,
    },

    /// Apply queued full-text index updates
    ProcessQueue {
        /// Maximum updates to apply
        #[arg(long, default_value_t = 1000)]
        limit: usize,
    },

    /// Check subproject settings without storing anything
    Validate {
        #[arg(long)]
        repoweb: Option<String>,
        #[arg(long)]
        commit_message: Option<String>,
        #[arg(long)]
        filemask: Option<String>,
        #[arg(long)]
        repo: Option<String>,
    },

    /// Show database statistics
    Stats,
}

/// weblate-trans - translation management data layer
///
/// Imports translation files into a SQLite store and answers the queries a
/// translation platform needs: filtered unit lists, counters, full-text
/// search and similar messages.
#[derive(Parser, Debug)]
#[command(name = "weblate-trans")]
#[command(version)]
#[command(about = "Translation management data layer")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: PathBuf,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // ANSI color of a level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[{}m{} {:<5} {}\x1B[0m",
                Self::color_for_level(record.level()),
                now,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn main() {
    let cli = CommandLineOptions::parse();

    let config = match load_config(&cli.config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{:#}", e);
            std::process::exit(2);
        }
    };

    let level = cli
        .log_level
        .clone()
        .map(app_config::LogLevel::from)
        .unwrap_or(config.log_level);
    if let Err(e) = CustomLogger::init(LevelFilter::from(level)) {
        eprintln!("Failed to initialize logger: {}", e);
    }

    if let Err(e) = run(cli.command, &config) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

/// Load the configuration file, falling back to defaults when it is missing
fn load_config(path: &Path) -> Result<Config> {
    let config = if path.exists() {
        Config::from_file(path)?
    } else {
        Config::default()
    };
    config.validate()?;
    Ok(config)
}

/// Split a `project/subproject` argument
fn split_target(target: &str) -> Result<(&str, &str)> {
    target
        .split_once('/')
        .ok_or_else(|| anyhow!("Expected project/subproject, got {:?}", target))
}

fn run(command: Commands, config: &Config) -> Result<()> {
    let managers = Managers::open(config)?;

    match command {
        Commands::CreateProject { name, slug, acl } => {
            let mut project = ProjectRecord::new(&name, &slug);
            project.enable_acl = acl;
            let project = managers.create_project(&project)?;
            println!("Created project {} (id {})", project.slug, project.id);
        }

        Commands::CreateSubproject {
            project,
            name,
            slug,
            repo,
            filemask,
            template,
            repoweb,
            commit_message,
        } => {
            let project = managers.projects.get_by_slug(&project)?;
            let mut subproject = SubProjectRecord::new(&project, &name, &slug, &repo, &filemask);
            subproject.template = template;
            subproject.repoweb = repoweb;
            subproject.commit_message = commit_message;
            let subproject = managers.create_subproject(&subproject)?;
            println!("Created subproject {}", subproject.full_slug());
        }

        Commands::Import {
            target,
            language,
            file,
            checkout,
            force,
        } => {
            let (project, slug) = split_target(&target)?;
            let subproject = managers.subprojects.get(project, slug)?;
            let summary = managers
                .translations
                .update_from_file(&subproject, &checkout, &language, &file, force)?;
            print_summary(&summary);
        }

        Commands::Scan {
            target,
            checkout,
            force,
        } => {
            let (project, slug) = split_target(&target)?;
            let subproject = managers.subprojects.get(project, slug)?;
            let summaries = managers
                .translations
                .scan_subproject(&subproject, &checkout, force)?;
            for summary in &summaries {
                print_summary(summary);
            }
        }

        Commands::Glossary {
            project,
            language,
            file,
            overwrite,
        } => {
            let project = managers.projects.get_by_slug(&project)?;
            let language = managers.repository.get_or_create_language(&language)?;
            let store = load_store(&file)
                .with_context(|| format!("Failed to load glossary {}", file.display()))?;
            let written = managers
                .dictionary
                .upload(&project, &language, &store, overwrite)?;
            println!("{} glossary entries written", written);
        }

        Commands::Search {
            target,
            language,
            source_only,
            query,
        } => {
            let (project, slug) = split_target(&target)?;
            let subproject = managers.subprojects.get(project, slug)?;
            let translation = managers.translations.get(&subproject, &language)?;
            let fields = if source_only {
                SearchFields::source_only()
            } else {
                SearchFields::all()
            };
            for unit in managers.units.search_units(&translation, &query, fields)?.fetch()? {
                println!("{}\t{}\t{}", unit.checksum, unit.source, unit.target);
            }
        }

        Commands::Similar {
            target,
            language,
            checksum,
        } => {
            let (project, slug) = split_target(&target)?;
            let subproject = managers.subprojects.get(project, slug)?;
            let translation = managers.translations.get(&subproject, &language)?;
            let unit = managers
                .units
                .for_translation(&translation)
                .filter(Condition::eq("u.checksum", checksum))
                .get()?;
            for similar in managers.units.similar(&unit)?.fetch()? {
                println!("{}\t{}", similar.source, similar.target);
            }
        }

        Commands::Count {
            target,
            language,
            request,
        } => {
            let (project, slug) = split_target(&target)?;
            let subproject = managers.subprojects.get(project, slug)?;
            let translation = managers.translations.get(&subproject, &language)?;
            let rqtype = RequestType::parse(&request, managers.units.checks());
            let count = managers.units.count_type(&rqtype, &translation)?;
            println!("{}: {}", rqtype, count);
        }

        Commands::ProcessQueue { limit } => {
            let processed = managers.units.process_index_queue(limit)?;
            let pending = managers.queue.pending()?;
            info!("{} index updates applied, {} pending", processed, pending);
            println!("{} applied, {} pending", processed, pending);
        }

        Commands::Validate {
            repoweb,
            commit_message,
            filemask,
            repo,
        } => {
            let mut failed = false;
            let mut report = |field: &str, result: Result<(), weblate_trans::ValidationError>| {
                match result {
                    Ok(()) => println!("{}: ok", field),
                    Err(e) => {
                        failed = true;
                        println!("{}: {} [{}]", field, e, e.code);
                    }
                }
            };
            if let Some(val) = repoweb {
                report("repoweb", validate_repoweb(&val));
            }
            if let Some(val) = commit_message {
                report("commit_message", validate_commit_message(&val));
            }
            if let Some(val) = filemask {
                report("filemask", validate_filemask(&val));
            }
            if let Some(val) = repo {
                report("repo", validate_repo(&val, &managers.subprojects));
            }
            if failed {
                warn!("Some values were rejected");
                std::process::exit(1);
            }
        }

        Commands::Stats => {
            let stats = managers.db().stats()?;
            println!("Projects:              {}", stats.project_count);
            println!("Translations:          {}", stats.translation_count);
            println!("Units:                 {}", stats.unit_count);
            println!("Pending index updates: {}", stats.pending_index_updates);
            println!("Database size:         {} bytes", stats.file_size_bytes);
        }
    }

    Ok(())
}

fn print_summary(summary: &weblate_trans::managers::ImportSummary) {
    let translation = &summary.translation;
    if summary.skipped {
        println!(
            "{} ({}): unchanged",
            translation.full_slug(),
            translation.language_code
        );
        return;
    }
    println!(
        "{} ({}): {} created, {} updated, {} deleted, {:.1}% translated",
        translation.full_slug(),
        translation.language_code,
        summary.created,
        summary.updated,
        summary.deleted,
        translation.translated_percent()
    );
}

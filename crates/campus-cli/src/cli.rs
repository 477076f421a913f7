use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Log level options for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    Off,
    /// Error messages only
    Error,
    /// Warnings and errors
    Warn,
    /// Informational messages
    Info,
    /// Debug messages
    Debug,
    /// Trace-level messages (most verbose)
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

#[derive(Parser)]
#[command(name = "campus")]
#[command(about = "campus - tag taxonomy maintenance for the department site")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Set log level (off, error, warn, info, debug, trace)
    /// If not specified, uses CAMPUS_LOG_LEVEL or the config file value
    #[arg(short = 'l', long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Enable verbose logging (shortcut for --log-level=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (defaults to ~/.config/campus/config.toml)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Database path (overrides config file and CAMPUS_DB_PATH)
    #[arg(long = "db", global = true)]
    pub db_path: Option<PathBuf>,

    /// User id recorded in the audit log
    #[arg(long, global = true)]
    pub actor: Option<i64>,
}

impl Cli {
    /// `--log-level` wins over `--verbose`; `None` defers to config
    pub fn effective_log_level(&self) -> Option<LogLevel> {
        self.log_level
            .or(self.verbose.then_some(LogLevel::Debug))
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Tag maintenance
    #[command(subcommand)]
    Tags(TagsCommands),

    /// Print the effective configuration
    Config {
        /// Print JSON instead of TOML
        #[arg(long)]
        json: bool,
    },
}

/// Status filter for `tags list`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusFilter {
    All,
    Active,
    Inactive,
}

/// Tag management subcommands
#[derive(Subcommand)]
pub enum TagsCommands {
    /// Merge source tags into a target tag
    Merge {
        /// Surviving tag id
        target: i64,

        /// Tag ids folded into the target
        #[arg(required = true)]
        sources: Vec<i64>,
    },

    /// Split a tag into new tags by name
    Split {
        /// Tag to split
        tag: i64,

        /// Names of the new tags
        #[arg(required = true)]
        names: Vec<String>,

        /// Leave the original tag active
        #[arg(long)]
        keep_original: bool,

        /// Color for the new tags (defaults to the original's)
        #[arg(long)]
        color: Option<String>,
    },

    /// Create a tag
    Create {
        /// Context, e.g. posts, labs, projects
        context: String,

        name: String,

        /// English display name
        #[arg(long)]
        name_en: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        color: Option<String>,

        /// Create the tag deactivated
        #[arg(long)]
        inactive: bool,
    },

    /// Change a tag's attributes; omitted flags keep their value
    Update {
        id: i64,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        name_en: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        color: Option<String>,

        /// Set the active flag (true or false)
        #[arg(long)]
        active: Option<bool>,
    },

    /// Deactivate a tag
    Deactivate { id: i64 },

    /// Show one tag
    Show { id: i64 },

    /// List tags with usage counts
    List {
        #[arg(short, long)]
        context: Option<String>,

        #[arg(short, long, value_enum, default_value = "all")]
        status: StatusFilter,

        /// Substring of name, English name or slug
        #[arg(short, long)]
        keyword: Option<String>,

        /// Page size (clamped to 5..=100)
        #[arg(long, default_value = "15")]
        limit: usize,

        #[arg(long, default_value = "0")]
        offset: usize,
    },

    /// Make sure names exist as tags in the given contexts
    Register {
        /// Context to register in (repeatable)
        #[arg(short, long = "context", required = true)]
        contexts: Vec<String>,

        #[arg(required = true)]
        names: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_merge_parses() {
        let cli = Cli::try_parse_from(["campus", "tags", "merge", "1", "2", "3"]).unwrap();
        if let Commands::Tags(TagsCommands::Merge { target, sources }) = cli.command {
            assert_eq!(target, 1);
            assert_eq!(sources, vec![2, 3]);
        } else {
            panic!("Expected Tags Merge command");
        }
    }

    #[test]
    fn test_merge_requires_sources() {
        assert!(Cli::try_parse_from(["campus", "tags", "merge", "1"]).is_err());
    }

    #[test]
    fn test_split_parses_flags() {
        let cli = Cli::try_parse_from([
            "campus",
            "tags",
            "split",
            "4",
            "Deep Learning",
            "NLP",
            "--keep-original",
            "--color",
            "#123456",
        ])
        .unwrap();

        if let Commands::Tags(TagsCommands::Split {
            tag,
            names,
            keep_original,
            color,
        }) = cli.command
        {
            assert_eq!(tag, 4);
            assert_eq!(names, vec!["Deep Learning", "NLP"]);
            assert!(keep_original);
            assert_eq!(color.as_deref(), Some("#123456"));
        } else {
            panic!("Expected Tags Split command");
        }
    }

    #[test]
    fn test_global_args_after_subcommand() {
        let cli = Cli::try_parse_from([
            "campus", "tags", "show", "9", "--db", "/tmp/x.db", "-v", "--actor", "3",
        ])
        .unwrap();

        assert_eq!(cli.db_path, Some(PathBuf::from("/tmp/x.db")));
        assert_eq!(cli.actor, Some(3));
        assert_eq!(cli.effective_log_level(), Some(LogLevel::Debug));
    }

    #[test]
    fn test_log_level_beats_verbose() {
        let cli = Cli::try_parse_from(["campus", "-v", "-l", "trace", "config"]).unwrap();
        assert_eq!(cli.effective_log_level(), Some(LogLevel::Trace));

        let cli = Cli::try_parse_from(["campus", "config"]).unwrap();
        assert_eq!(cli.effective_log_level(), None);
    }

    #[test]
    fn test_register_repeatable_context() {
        let cli = Cli::try_parse_from([
            "campus", "tags", "register", "-c", "posts", "-c", "labs", "AI", "IoT",
        ])
        .unwrap();

        if let Commands::Tags(TagsCommands::Register { contexts, names }) = cli.command {
            assert_eq!(contexts, vec!["posts", "labs"]);
            assert_eq!(names, vec!["AI", "IoT"]);
        } else {
            panic!("Expected Tags Register command");
        }
    }

    #[test]
    fn test_list_defaults() {
        let cli = Cli::try_parse_from(["campus", "tags", "list"]).unwrap();
        if let Commands::Tags(TagsCommands::List {
            status,
            limit,
            offset,
            ..
        }) = cli.command
        {
            assert_eq!(status, StatusFilter::All);
            assert_eq!(limit, 15);
            assert_eq!(offset, 0);
        } else {
            panic!("Expected Tags List command");
        }
    }
}

use clap::{Parser, Subcommand, ValueEnum};
use settingskit::ValueKind;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "settingskit")]
#[command(about = "Inspect and edit settings stores", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Store location: a file path, file:<path>, or HKCU\<key> / HKLM\<key>
    #[arg(short, long, global = true)]
    pub store: Option<String>,

    /// Directory holding config.json
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Open the store read-only
    #[arg(long, global = true)]
    pub read_only: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List all keys
    #[command(alias = "ls")]
    Keys,

    /// Print the value of a key
    Get {
        key: String,
    },

    /// Set a key
    Set {
        key: String,

        value: String,

        /// How to interpret VALUE. Arrays are comma-separated, maps are key=value pairs.
        #[arg(short = 't', long = "type", value_enum, default_value_t = KindArg::String)]
        kind: KindArg,
    },

    /// Remove a key
    #[command(alias = "rm")]
    Remove {
        key: String,
    },

    /// Rename a key, keeping its value
    #[command(alias = "mv")]
    Rename {
        old_key: String,
        new_key: String,
    },

    /// Remove every key matching a regular expression
    RemoveMatching {
        pattern: String,
    },

    /// Show where the store lives
    Info,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum KindArg {
    String,
    StringArray,
    Int,
    IntArray,
    Double,
    DoubleArray,
    Decimal,
    DecimalArray,
    Bool,
    BoolArray,
    Datetime,
    DatetimeArray,
    Duration,
    DurationArray,
    Map,
}

impl From<KindArg> for ValueKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::String => ValueKind::String,
            KindArg::StringArray => ValueKind::StringArray,
            KindArg::Int => ValueKind::Int,
            KindArg::IntArray => ValueKind::IntArray,
            KindArg::Double => ValueKind::Double,
            KindArg::DoubleArray => ValueKind::DoubleArray,
            KindArg::Decimal => ValueKind::Decimal,
            KindArg::DecimalArray => ValueKind::DecimalArray,
            KindArg::Bool => ValueKind::Bool,
            KindArg::BoolArray => ValueKind::BoolArray,
            KindArg::Datetime => ValueKind::DateTime,
            KindArg::DatetimeArray => ValueKind::DateTimeArray,
            KindArg::Duration => ValueKind::Duration,
            KindArg::DurationArray => ValueKind::DurationArray,
            KindArg::Map => ValueKind::Map,
        }
    }
}

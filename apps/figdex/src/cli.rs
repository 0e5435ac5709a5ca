use clap::ArgAction;
use clap::Parser;
use clap::ValueEnum;
use figdex_collector::CollectorConfig;
use figdex_collector::DEFAULT_MARKER_TAG;
use figdex_collector::DEFAULT_TITLE_ATTRIBUTE;
use figdex_core::FigdexError;
use figdex_core::FigdexResult;
use std::path::PathBuf;

/// Builds a list of figures from the captions of an HTML document.
#[derive(Debug, Parser)]
#[command(name = "figdex", version, about = "List of figures for HTML documents")]
pub(crate) struct Args {
    /// HTML file to index. Reads stdin when absent or `-`.
    #[arg(value_name = "INPUT")]
    pub input: Option<PathBuf>,

    /// How to print the collected list.
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Write the document, with assigned caption ids, to PATH.
    #[arg(short = 'o', long = "write", value_name = "PATH", conflicts_with = "in_place")]
    pub write: Option<PathBuf>,

    /// Overwrite INPUT with the document carrying assigned caption ids.
    #[arg(long)]
    pub in_place: bool,

    /// Insert the rendered list into the element with this id before writing.
    #[arg(long, value_name = "ID")]
    pub inject: Option<String>,

    /// Tag of the elements treated as captions.
    #[arg(long, default_value = DEFAULT_MARKER_TAG)]
    pub marker: String,

    /// Attribute whose value overrides the caption text as title.
    #[arg(long = "title-attr", default_value = DEFAULT_TITLE_ATTRIBUTE)]
    pub title_attr: String,

    /// Only scan below the element with this id.
    #[arg(long, value_name = "ID")]
    pub root: Option<String>,

    /// Generate `figure-N` ids instead of random UUIDs.
    #[arg(long)]
    pub sequential_ids: bool,

    /// Increase log verbosity (-v debug, -vv trace). FIGDEX_LOG overrides.
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
    Html,
}

/// Where the mutated document goes, if anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DocumentSink {
    Discard,
    File(PathBuf),
}

/// Validated invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Settings {
    pub input: Option<PathBuf>,
    pub format: OutputFormat,
    pub sink: DocumentSink,
    pub inject: Option<String>,
    pub collector: CollectorConfig,
    pub sequential_ids: bool,
}

impl Args {
    pub(crate) fn into_settings(self) -> FigdexResult<Settings> {
        let input = self
            .input
            .filter(|path| path.as_os_str() != "-");

        let sink = match (self.write, self.in_place) {
            (Some(path), _) => DocumentSink::File(path),
            (None, true) => match &input {
                Some(path) => DocumentSink::File(path.clone()),
                None => {
                    return Err(FigdexError::new(
                        "cli.invalid_args",
                        "--in-place needs an INPUT file, not stdin",
                    ));
                }
            },
            (None, false) => DocumentSink::Discard,
        };

        if self.inject.is_some() && sink == DocumentSink::Discard {
            return Err(FigdexError::new(
                "cli.invalid_args",
                "--inject only makes sense together with --write or --in-place",
            ));
        }

        if self.marker.trim().is_empty() {
            return Err(FigdexError::new("cli.invalid_args", "--marker must not be empty"));
        }

        let collector = CollectorConfig {
            marker_tag: self.marker.trim().to_ascii_lowercase(),
            title_attribute: self.title_attr.to_ascii_lowercase(),
            scope_id: self.root,
            ..CollectorConfig::default()
        };

        Ok(Settings {
            input,
            format: self.format,
            sink,
            inject: self.inject,
            collector,
            sequential_ids: self.sequential_ids,
        })
    }
}

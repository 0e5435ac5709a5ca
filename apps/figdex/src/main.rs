mod cli;
mod host;
mod output;

use clap::Parser;
use cli::Args;
use cli::DocumentSink;
use cli::Settings;
use figdex_collector::IdGenerator;
use figdex_collector::SequentialIds;
use figdex_collector::UuidV4Ids;
use figdex_core::FigdexError;
use figdex_core::FigdexResult;
use host::Page;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "FIGDEX_LOG";

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    let result = args.into_settings().and_then(|settings| run(&settings));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("figdex: {error}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "figdex={level},figdex_collector={level},figdex_html={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(settings: &Settings) -> FigdexResult<()> {
    let source = read_input(settings.input.as_deref())?;
    let output = if settings.sequential_ids {
        process(settings, &source, SequentialIds::default())?
    } else {
        process(settings, &source, UuidV4Ids)?
    };

    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(output.as_bytes())
        .and_then(|()| stdout.flush())
        .map_err(|error| FigdexError::io("cli.write_failed", "stdout", error))
}

/// Runs the page through its frames, writes the document if requested and
/// returns what goes to stdout.
fn process<G: IdGenerator>(settings: &Settings, source: &str, ids: G) -> FigdexResult<String> {
    let mut page = Page::load(source, settings.collector.clone(), ids);
    let frame = page.settle()?;
    let listing = output::format_list(settings.format, page.items(), &frame)?;

    if let Some(target) = &settings.inject {
        page.inject(target)?;
    }

    if let DocumentSink::File(path) = &settings.sink {
        let html = figdex_html::serialize(page.document());
        std::fs::write(path, html)
            .map_err(|error| FigdexError::io("cli.write_failed", path.display(), error))?;
        tracing::info!(path = %path.display(), items = page.items().len(), "wrote document");
    }

    Ok(listing)
}

fn read_input(path: Option<&Path>) -> FigdexResult<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|error| FigdexError::io("cli.read_failed", path.display(), error)),
        None => {
            let mut source = String::new();
            std::io::stdin()
                .read_to_string(&mut source)
                .map_err(|error| FigdexError::io("cli.read_failed", "stdin", error))?;
            Ok(source)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::process;
    use super::read_input;
    use crate::cli::Args;
    use clap::Parser;
    use figdex_collector::SequentialIds;
    use pretty_assertions::assert_eq;

    const REPORT: &str = "<!DOCTYPE html><html><body><aside id=\"lof\"></aside>\
        <figure><figcaption>Topology</figcaption></figure></body></html>";

    fn settings(argv: &[&str]) -> super::Settings {
        Args::try_parse_from(std::iter::once("figdex").chain(argv.iter().copied()))
            .expect("argv parses")
            .into_settings()
            .expect("argv is valid")
    }

    #[test]
    fn writes_document_with_assigned_ids() {
        let dir = tempfile::tempdir().expect("temp dir");
        let input = dir.path().join("report.html");
        std::fs::write(&input, REPORT).expect("write input");

        let input_arg = input.to_string_lossy().into_owned();
        let settings = settings(&[input_arg.as_str(), "--in-place", "--sequential-ids"]);
        let source = read_input(settings.input.as_deref()).expect("read input");
        let listing = process(&settings, &source, SequentialIds::default()).expect("process");
        assert_eq!(listing, "1. Topology  #figure-1\n");

        let written = std::fs::read_to_string(&input).expect("read back");
        assert!(written.starts_with("<!DOCTYPE html>"));
        assert!(written.contains("<figcaption id=\"figure-1\">Topology</figcaption>"));
    }

    #[test]
    fn injects_list_into_written_copy() {
        let dir = tempfile::tempdir().expect("temp dir");
        let out = dir.path().join("out.html");
        let out_arg = out.to_string_lossy().into_owned();
        let settings = settings(&["-", "--write", out_arg.as_str(), "--inject", "lof"]);

        process(&settings, REPORT, SequentialIds::default()).expect("process");
        let written = std::fs::read_to_string(&out).expect("read back");
        assert!(written.contains(
            "<aside id=\"lof\"><div><ul><li><a href=\"#figure-1\">Topology</a></li></ul></div></aside>"
        ));
    }

    #[test]
    fn missing_input_reports_read_failure() {
        let dir = tempfile::tempdir().expect("temp dir");
        let error = read_input(Some(&dir.path().join("absent.html"))).expect_err("no file");
        assert_eq!(error.code, "cli.read_failed");
    }
}

//! CLI tool for assembling PowerPoint decks from a template and content records.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use slidefill_core::{
    fetch_records, resolve_images, BindingTable, ContentRecord, Error, ImageFetcher, RecordSet,
};
use slidefill_pptx::{inspect_template, Assembler, AssemblyOptions};
use std::fs;
use std::path::{Path, PathBuf};

/// Fill a PowerPoint template with structured slide content.
#[derive(Parser, Debug)]
#[command(name = "slidefill")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Assemble a presentation from content records
    Build(BuildArgs),
    /// List the slides and named shapes of a template
    Inspect(InspectArgs),
}

#[derive(clap::Args, Debug)]
struct BuildArgs {
    /// Template presentation (.pptx)
    #[arg(short, long)]
    template: PathBuf,

    /// JSON file holding an array of content records
    #[arg(short, long)]
    records: PathBuf,

    /// JSON binding table (default: built-in bindings)
    #[arg(short, long)]
    bindings: Option<PathBuf>,

    /// Output file (default: records file name with .pptx)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Language tag for inserted text
    #[arg(long, default_value = "en-US")]
    lang: String,

    /// Only use these record ids, in this order (repeatable)
    #[arg(long = "record")]
    record_ids: Vec<String>,

    /// Keep speaker-notes links on generated slides
    #[arg(long)]
    keep_notes: bool,
}

#[derive(clap::Args, Debug)]
struct InspectArgs {
    /// Template presentation (.pptx)
    #[arg(short, long)]
    template: PathBuf,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    match cli.command {
        Command::Build(args) => build(&args, cli.verbose),
        Command::Inspect(args) => inspect(&args),
    }
}

fn build(args: &BuildArgs, verbose: bool) -> Result<()> {
    let template = fs::read(&args.template)
        .with_context(|| format!("Failed to read template {}", args.template.display()))?;

    let bindings = match &args.bindings {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("Failed to read bindings {}", path.display()))?;
            BindingTable::from_json(&json)
                .with_context(|| format!("Invalid bindings in {}", path.display()))?
        }
        None => {
            log::debug!("Using built-in bindings");
            BindingTable::defaults()
        }
    };

    let mut records = load_records(&args.records, &args.record_ids)?;
    log::debug!("Loaded {} record(s) from {}", records.len(), args.records.display());
    if verbose {
        eprintln!("Loaded {} record(s)", records.len());
    }

    let base_dir = args
        .records
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let images = resolve_images(&mut records, &FileFetcher::new(base_dir));
    log::info!(
        "Images: {} resolved, {} failed",
        images.resolved,
        images.failed
    );
    if verbose {
        eprintln!(
            "  Images: {} resolved, {} failed",
            images.resolved, images.failed
        );
    }

    let options = AssemblyOptions::new()
        .with_lang(args.lang.clone())
        .with_strip_notes(!args.keep_notes);
    let output = Assembler::new()
        .with_options(options)
        .assemble(&template, &records, &bindings)
        .context("Failed to assemble presentation")?;

    let output_path = get_output_path(&args.records, args.output.as_ref());
    fs::write(&output_path, output)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;
    log::info!("Wrote {}", output_path.display());

    if verbose {
        eprintln!("Written to: {}", output_path.display());
    }
    Ok(())
}

fn load_records(path: &Path, record_ids: &[String]) -> Result<Vec<ContentRecord>> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read records {}", path.display()))?;
    let set = RecordSet::from_json(&json)
        .with_context(|| format!("Invalid records in {}", path.display()))?;

    if record_ids.is_empty() {
        Ok(set.into_records())
    } else {
        fetch_records(&set, record_ids).context("Failed to select records")
    }
}

fn inspect(args: &InspectArgs) -> Result<()> {
    let template = fs::read(&args.template)
        .with_context(|| format!("Failed to read template {}", args.template.display()))?;
    let slides = inspect_template(&template)
        .with_context(|| format!("Failed to inspect {}", args.template.display()))?;
    log::debug!("Template has {} slide(s)", slides.len());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&slides)?);
        return Ok(());
    }

    for slide in &slides {
        println!("Slide {} (position {})", slide.template_slide_number, slide.position);
        for shape in &slide.shapes {
            let placeholder = shape
                .placeholder_type
                .as_deref()
                .map(|t| format!(" [{}]", t))
                .unwrap_or_default();
            let text = if shape.has_text_body {
                format!(": {}", shape.text.join(" / "))
            } else {
                String::new()
            };
            println!("  {:<14} {}{}{}", shape.kind, shape.name, placeholder, text);
        }
    }
    Ok(())
}

/// Determine the output path for an assembled deck.
fn get_output_path(records_path: &Path, output: Option<&PathBuf>) -> PathBuf {
    if let Some(path) = output {
        return path.clone();
    }
    let stem = records_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    records_path.with_file_name(format!("{}.pptx", stem))
}

/// Reads images from the local filesystem.
///
/// Relative paths and `file://` URLs resolve against `base_dir`.
struct FileFetcher {
    base_dir: PathBuf,
}

impl FileFetcher {
    fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    fn resolve(&self, locator: &str) -> Option<PathBuf> {
        let path = match locator.split_once("://") {
            Some(("file", rest)) => rest,
            Some(_) => return None,
            None => locator,
        };
        let path = Path::new(path);
        Some(if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        })
    }
}

impl ImageFetcher for FileFetcher {
    fn fetch(&self, locator: &str) -> slidefill_core::Result<Vec<u8>> {
        let path = self.resolve(locator).ok_or_else(|| Error::ImageFetch {
            locator: locator.to_string(),
            reason: "only local paths and file:// URLs are supported".to_string(),
        })?;
        fs::read(&path).map_err(|e| Error::ImageFetch {
            locator: locator.to_string(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_locators() {
        let fetcher = FileFetcher::new(PathBuf::from("/data/deck"));
        assert_eq!(
            fetcher.resolve("shots/a.png"),
            Some(PathBuf::from("/data/deck/shots/a.png"))
        );
        assert_eq!(
            fetcher.resolve("file:///tmp/b.png"),
            Some(PathBuf::from("/tmp/b.png"))
        );
        assert_eq!(
            fetcher.resolve("file://img/c.gif"),
            Some(PathBuf::from("/data/deck/img/c.gif"))
        );
        assert_eq!(fetcher.resolve("https://cdn.example/x.png"), None);
    }

    #[test]
    fn test_unsupported_scheme_is_image_fetch_error() {
        let fetcher = FileFetcher::new(PathBuf::from("."));
        let err = fetcher.fetch("https://cdn.example/x.png").unwrap_err();
        assert!(matches!(err, Error::ImageFetch { .. }));
    }

    #[test]
    fn test_output_path() {
        assert_eq!(
            get_output_path(Path::new("/work/q3.json"), None),
            PathBuf::from("/work/q3.pptx")
        );
        let explicit = PathBuf::from("out/deck.pptx");
        assert_eq!(get_output_path(Path::new("q3.json"), Some(&explicit)), explicit);
    }

    #[test]
    fn test_cli_parses_build() {
        let cli = Cli::try_parse_from([
            "slidefill", "build", "-t", "t.pptx", "-r", "r.json", "--record", "b", "--record", "a",
        ])
        .unwrap();
        match cli.command {
            Command::Build(args) => {
                assert_eq!(args.record_ids, vec!["b".to_string(), "a".to_string()]);
                assert_eq!(args.lang, "en-US");
                assert!(!args.keep_notes);
            }
            Command::Inspect(_) => panic!("expected build"),
        }
    }
}

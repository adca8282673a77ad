use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use doc_model::{Color, Document, MetadataUpdate, PageId, PageSelector, WatermarkPosition};
use pdf_editor_core::{
    DispatchOutcome, DocumentSource, EditorAction, EditorConfig, ExportFormat, PageRange, SaveOptions, Store,
    TextOptions, WatermarkOptions,
};
use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use storage::Storage;

#[derive(Debug, Parser)]
#[command(name = "pdf-editor-cli")]
#[command(about = "Scriptable PDF editing")]
pub struct Cli {
    /// Editor configuration file; defaults to the stored user configuration.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print machine-readable document information.
    Info {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Create a document of blank pages.
    New {
        #[arg(long, default_value_t = 1)]
        pages: usize,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        output: PathBuf,
    },
    /// Rotate one page by a multiple of 90 degrees.
    Rotate {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long)]
        page: u32,
        #[arg(long, allow_hyphen_values = true)]
        angle: i32,
        #[arg(long)]
        output: PathBuf,
    },
    /// Append or insert the pages of a second document.
    Merge {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(value_name = "OTHER")]
        other: PathBuf,
        /// 1-based page number the merged pages start at.
        #[arg(long)]
        at: Option<usize>,
        #[arg(long)]
        output: PathBuf,
    },
    /// Write one document per page range.
    Split {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Comma separated ranges such as `1-2,3-4`.
        #[arg(long)]
        ranges: String,
        #[arg(long)]
        out_dir: PathBuf,
    },
    /// Copy selected pages into a new document.
    Extract {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Comma separated page numbers or ranges.
        #[arg(long)]
        pages: String,
        #[arg(long)]
        output: PathBuf,
    },
    /// Place a line of text; coordinates are from the page's top-left corner.
    AddText {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        x: f32,
        #[arg(long)]
        y: f32,
        #[arg(long)]
        text: String,
        #[arg(long)]
        size: Option<f32>,
        /// Hex color such as `#336699`.
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        output: PathBuf,
    },
    /// Stamp a text watermark across pages.
    Watermark {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long)]
        text: String,
        /// `all`, `odd`, `even` or a list such as `1,3`.
        #[arg(long, default_value = "all")]
        pages: String,
        #[arg(long, default_value = "center")]
        position: String,
        #[arg(long, default_value_t = 48.0)]
        size: f32,
        #[arg(long, default_value_t = 0.3)]
        opacity: f32,
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        rotation: f32,
        #[arg(long)]
        output: PathBuf,
    },
    /// Render one page to an image.
    ExportPage {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, value_enum, default_value_t = RasterArg::Png)]
        format: RasterArg,
        #[arg(long)]
        output: PathBuf,
    },
    /// Print CLI version.
    Version,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RasterArg {
    Png,
    Jpeg,
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    path: String,
    page_count: usize,
    title: Option<String>,
    author: Option<String>,
    pages: Vec<PageOutput>,
}

#[derive(Debug, Serialize)]
struct PageOutput {
    number: u32,
    width: f32,
    height: f32,
    rotation: i32,
    text_runs: usize,
    annotations: usize,
    form_fields: usize,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Info { file } => run_info(config, &file),
        Commands::New { pages, title, output } => {
            let mut store = Store::new(config);
            dispatch(&mut store, EditorAction::CreateNew { page_count: pages })?;
            if let Some(title) = title {
                dispatch(&mut store, EditorAction::SetMetadata(MetadataUpdate { title: Some(title), ..MetadataUpdate::default() }))?;
            }
            write_document(&mut store, &output)
        }
        Commands::Rotate { file, page, angle, output } => {
            let mut store = open(config, &file)?;
            let page_id = page_id(&store, page)?;
            dispatch(&mut store, EditorAction::RotatePage { page_id, degrees: angle })?;
            write_document(&mut store, &output)
        }
        Commands::Merge { file, other, at, output } => {
            ensure_pdf_exists(&other)?;
            let mut store = open(config, &file)?;
            let at = at.map(|number| number.saturating_sub(1));
            dispatch(&mut store, EditorAction::Merge { source: DocumentSource::Path(other), at })?;
            write_document(&mut store, &output)
        }
        Commands::Split { file, ranges, out_dir } => run_split(config, &file, &ranges, &out_dir),
        Commands::Extract { file, pages, output } => {
            let store = open(config, &file)?;
            let numbers: Vec<u32> =
                PageRange::parse_list(&pages)?.iter().flat_map(PageRange::numbers).collect();
            let bytes = store.extract_pages(&numbers)?.encode()?;
            write_bytes(&output, &bytes)
        }
        Commands::AddText { file, page, x, y, text, size, color, output } => {
            let mut store = open(config, &file)?;
            let page_id = page_id(&store, page)?;
            let mut options = TextOptions::new(text, x, y);
            options.font_size = size;
            if let Some(color) = color {
                options.color = Color::from_hex(&color)?;
            }
            dispatch(&mut store, EditorAction::AddText { page_id, options })?;
            write_document(&mut store, &output)
        }
        Commands::Watermark { file, text, pages, position, size, opacity, rotation, output } => {
            let mut store = open(config, &file)?;
            let options = WatermarkOptions {
                pages: pages.parse::<PageSelector>()?,
                position: position.parse::<WatermarkPosition>()?,
                opacity,
                rotation,
                ..WatermarkOptions::text(text, size)
            };
            dispatch(&mut store, EditorAction::AddWatermark(options))?;
            write_document(&mut store, &output)
        }
        Commands::ExportPage { file, page, format, output } => {
            let mut store = open(config, &file)?;
            let format = match format {
                RasterArg::Png => ExportFormat::Png { page },
                RasterArg::Jpeg => ExportFormat::Jpeg { page },
            };
            let bytes = into_bytes(dispatch(&mut store, EditorAction::Export(format))?)?;
            write_bytes(&output, &bytes)
        }
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<EditorConfig> {
    if let Some(path) = path {
        return Storage::read_config(path)
            .with_context(|| format!("failed to read config {}", path.display()));
    }

    match Storage::from_default_project() {
        Ok(storage) => storage.load_config().context("failed to read stored config"),
        Err(error) => {
            log::warn!("{error}; using default config");
            Ok(EditorConfig::default())
        }
    }
}

fn run_info(config: EditorConfig, file: &Path) -> Result<()> {
    let store = open(config, file)?;
    let snapshot = store.snapshot();
    let document = snapshot.document.as_ref().context("no document is loaded")?;

    let payload = InfoOutput {
        path: file.display().to_string(),
        page_count: document.page_count(),
        title: document.metadata.title.clone(),
        author: document.metadata.author.clone(),
        pages: document
            .pages
            .iter()
            .map(|page| {
                let size = page.size();
                PageOutput {
                    number: page.number,
                    width: size.width,
                    height: size.height,
                    rotation: page.rotation.degrees(),
                    text_runs: page.texts.len(),
                    annotations: page.annotations.len(),
                    form_fields: page.form_fields.len(),
                }
            })
            .collect(),
    };

    let json = serde_json::to_string_pretty(&payload)?;
    println!("{json}");

    Ok(())
}

fn run_split(config: EditorConfig, file: &Path, ranges: &str, out_dir: &Path) -> Result<()> {
    let store = open(config, file)?;
    let ranges = PageRange::parse_list(ranges)?;
    let parts = store.split_document(&ranges)?;

    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;
    let stem = file.file_stem().and_then(|name| name.to_str()).unwrap_or("document");
    for (range, graph) in ranges.iter().zip(parts) {
        let output = out_dir.join(format!("{stem}-{}-{}.pdf", range.start, range.end));
        write_bytes(&output, &graph.encode()?)?;
    }

    Ok(())
}

fn open(config: EditorConfig, file: &Path) -> Result<Store> {
    ensure_pdf_exists(file)?;

    let mut store = Store::new(config);
    dispatch(&mut store, EditorAction::Load(DocumentSource::Path(file.to_path_buf())))
        .context("failed to open PDF")?;
    Ok(store)
}

fn dispatch(store: &mut Store, action: EditorAction) -> Result<DispatchOutcome> {
    Ok(store.dispatch(action)?)
}

fn page_id(store: &Store, number: u32) -> Result<PageId> {
    let snapshot = store.snapshot();
    let document: &Document = snapshot.document.as_ref().context("no document is loaded")?;
    document
        .page_by_number(number)
        .map(|page| page.id)
        .with_context(|| format!("page {number} is out of range (1..={})", document.page_count()))
}

fn write_document(store: &mut Store, output: &Path) -> Result<()> {
    let bytes = into_bytes(dispatch(store, EditorAction::Save(SaveOptions::default()))?)?;
    write_bytes(output, &bytes)
}

fn into_bytes(outcome: DispatchOutcome) -> Result<Vec<u8>> {
    match outcome {
        DispatchOutcome::Bytes(bytes) => Ok(bytes),
        other => anyhow::bail!("expected serialized output, got {other:?}"),
    }
}

fn write_bytes(output: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = output.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    fs::write(output, bytes).with_context(|| format!("failed to write {}", output.display()))?;
    println!("{}", output.display());
    Ok(())
}

fn ensure_pdf_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    Ok(())
}

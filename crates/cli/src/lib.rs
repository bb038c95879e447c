use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use doc_model::{AnnotationRecord, DisplaySize, Preferences};
use exhibit_core::{DocumentSession, SessionConfig};
use pdf_engine::PlaceholderRenderer;
use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use sticker::StickerComposer;
use storage::Storage;
use viewer_core::displayed_size_for;

#[derive(Debug, Parser)]
#[command(name = "exhibit-cli")]
#[command(about = "Place exhibit stickers on PDF pages")]
pub struct Cli {
    /// Directory holding preferences.json (overrides EXHIBIT_CONFIG_DIR).
    #[arg(long, global = true, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print machine-readable PDF metadata.
    Info {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Place a sticker at a display-space position on a page.
    Place {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, allow_hyphen_values = true)]
        x: f32,
        #[arg(long, allow_hyphen_values = true)]
        y: f32,
        /// Width of the displayed page in pixels. Derived from the zoom and
        /// base DPI when omitted.
        #[arg(long)]
        display_width: Option<f32>,
        #[arg(long)]
        display_height: Option<f32>,
        #[arg(long)]
        top: Option<String>,
        #[arg(long)]
        bottom: Option<String>,
        #[arg(long, default_value_t = 1.0)]
        zoom: f32,
        /// Defaults to rewriting FILE.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Remove every sticker from a page.
    Delete {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// List the stickers recorded in a PDF.
    List {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Render a page to PNG with the built-in placeholder renderer.
    Render {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 1.0)]
        zoom: f32,
        /// Overrides the preferred base DPI.
        #[arg(long)]
        dpi: Option<f32>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Write a sticker image as PNG.
    Sticker {
        #[arg(long)]
        top: Option<String>,
        #[arg(long)]
        bottom: Option<String>,
        #[arg(long)]
        output: PathBuf,
    },
    /// Print CLI version.
    Version,
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    path: String,
    page_count: u32,
    page_sizes_pt: Vec<PageSizeOutput>,
    sticker_count: usize,
}

#[derive(Debug, Serialize)]
struct PageSizeOutput {
    width: f32,
    height: f32,
}

#[derive(Debug, Serialize)]
struct PlaceOutput {
    output: String,
    page: u32,
    rect_pdf: [f32; 4],
    embedded_object_id: String,
    content_object_id: String,
    resource_name: String,
    top_text: String,
    bottom_text: String,
}

impl PlaceOutput {
    fn new(output: &Path, record: &AnnotationRecord) -> Self {
        Self {
            output: output.display().to_string(),
            page: record.page_index + 1,
            rect_pdf: record.rect.to_array(),
            embedded_object_id: record.embedded_object_id.to_string(),
            content_object_id: record.content_object_id.to_string(),
            resource_name: record.resource_name.clone(),
            top_text: record.top_text.clone(),
            bottom_text: record.bottom_text.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct DeleteOutput {
    output: String,
    page: u32,
    removed: usize,
    stale: Vec<String>,
    failed: Vec<String>,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    let config_dir = cli.config_dir;

    match cli.command {
        Commands::Info { file } => run_info(&file),
        Commands::Place {
            file,
            page,
            x,
            y,
            display_width,
            display_height,
            top,
            bottom,
            zoom,
            output,
        } => {
            let preferences = load_preferences(config_dir)?;
            let request = PlaceRequest {
                page,
                x,
                y,
                display: (display_width, display_height),
                top,
                bottom,
                zoom,
            };
            run_place(&preferences, &file, request, output.as_deref())
        }
        Commands::Delete { file, page, output } => run_delete(&file, page, output.as_deref()),
        Commands::List { file } => run_list(&file),
        Commands::Render { file, page, zoom, dpi, output } => {
            let mut preferences = load_preferences(config_dir)?;
            if let Some(dpi) = dpi {
                preferences.base_dpi = dpi;
            }
            run_render(&preferences, &file, page, zoom, output.as_deref())
        }
        Commands::Sticker { top, bottom, output } => {
            let preferences = load_preferences(config_dir)?;
            run_sticker(&preferences, top, bottom, &output)
        }
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

struct PlaceRequest {
    page: u32,
    x: f32,
    y: f32,
    display: (Option<f32>, Option<f32>),
    top: Option<String>,
    bottom: Option<String>,
    zoom: f32,
}

fn load_preferences(config_dir: Option<PathBuf>) -> Result<Preferences> {
    let storage = Storage::resolve(config_dir).context("failed to locate preferences")?;
    storage
        .load_preferences()
        .with_context(|| format!("failed to read {}", storage.preferences_path().display()))
}

fn run_info(file: &Path) -> Result<()> {
    let session = open_session(file, &SessionConfig::default())?;
    let document = session.document();

    let payload = InfoOutput {
        path: file.display().to_string(),
        page_count: document.page_count(),
        page_sizes_pt: document
            .page_sizes()
            .into_iter()
            .map(|size| PageSizeOutput { width: size.width_pt, height: size.height_pt })
            .collect(),
        sticker_count: session.store().count(),
    };

    print_json(&payload)
}

fn run_place(
    preferences: &Preferences,
    file: &Path,
    request: PlaceRequest,
    output: Option<&Path>,
) -> Result<()> {
    if !(request.zoom.is_finite() && request.zoom > 0.0) {
        anyhow::bail!("--zoom must be a positive number");
    }

    let mut session = open_session(file, &SessionConfig::from(preferences))?;
    select_page(&mut session, request.page)?;
    session.zoom_by(request.zoom);

    let displayed = match request.display {
        (Some(width), Some(height)) => DisplaySize::new(width, height),
        (None, None) => {
            let page_size = session.document().page_size(session.current_page())?;
            displayed_size_for(page_size, session.effective_dpi())
        }
        _ => anyhow::bail!("--display-width and --display-height must be given together"),
    };
    session.set_displayed_size(displayed);

    let defaults = preferences.default_sticker_text();
    session.arm_sticker(
        request.top.unwrap_or(defaults.top),
        request.bottom.unwrap_or(defaults.bottom),
    );
    let record = session.handle_click(request.x, request.y).context("failed to place sticker")?;

    let output = output.unwrap_or(file);
    let saved =
        session.save(output).with_context(|| format!("failed to write {}", output.display()))?;

    print_json(&PlaceOutput::new(&saved, &record))
}

fn run_delete(file: &Path, page: u32, output: Option<&Path>) -> Result<()> {
    let mut session = open_session(file, &SessionConfig::default())?;
    select_page(&mut session, page)?;

    let report = session.delete_stickers().context("failed to delete stickers")?;

    let output = output.unwrap_or(file);
    let saved =
        session.save(output).with_context(|| format!("failed to write {}", output.display()))?;

    print_json(&DeleteOutput {
        output: saved.display().to_string(),
        page,
        removed: report.removed,
        stale: report.stale.iter().map(ToString::to_string).collect(),
        failed: report.failed.iter().map(ToString::to_string).collect(),
    })
}

fn run_list(file: &Path) -> Result<()> {
    let session = open_session(file, &SessionConfig::default())?;
    print_json(&session.store().all_records())
}

fn run_render(
    preferences: &Preferences,
    file: &Path,
    page: u32,
    zoom: f32,
    output: Option<&Path>,
) -> Result<()> {
    if !(zoom.is_finite() && zoom > 0.0) {
        anyhow::bail!("--zoom must be a positive number");
    }
    if !(preferences.base_dpi.is_finite() && preferences.base_dpi > 0.0) {
        anyhow::bail!("--dpi must be a positive number");
    }

    let mut session = open_session(file, &SessionConfig::from(preferences))?;
    select_page(&mut session, page)?;
    session.zoom_by(zoom);

    let raster =
        session.render_current(&PlaceholderRenderer).context("failed to render page")?;
    let image = raster.to_rgba_image().context("raster has an unexpected layout")?;

    let output =
        output.map(ToOwned::to_owned).unwrap_or_else(|| default_render_output(file, page));
    create_parent(&output)?;

    image
        .save_with_format(&output, image::ImageFormat::Png)
        .with_context(|| format!("failed to write image to {}", output.display()))?;

    println!("{}", output.display());
    Ok(())
}

fn run_sticker(
    preferences: &Preferences,
    top: Option<String>,
    bottom: Option<String>,
    output: &Path,
) -> Result<()> {
    let defaults = preferences.default_sticker_text();
    let composer = StickerComposer::new(preferences.font_path.as_deref());
    let sticker = composer.compose(
        top.as_deref().unwrap_or(&defaults.top),
        bottom.as_deref().unwrap_or(&defaults.bottom),
    );

    if sticker.png().is_empty() {
        anyhow::bail!("sticker could not be encoded as PNG");
    }

    create_parent(output)?;
    fs::write(output, sticker.png())
        .with_context(|| format!("failed to write image to {}", output.display()))?;

    println!("{}", output.display());
    Ok(())
}

fn open_session(file: &Path, config: &SessionConfig) -> Result<DocumentSession> {
    ensure_pdf_exists(file)?;
    DocumentSession::open(doc_model::DocumentId(1), file, config).context("failed to open PDF")
}

fn select_page(session: &mut DocumentSession, page: u32) -> Result<()> {
    if page == 0 {
        anyhow::bail!("--page is 1-based and must be >= 1");
    }
    if page > session.page_count() {
        anyhow::bail!("page {page} out of range (document has {} pages)", session.page_count());
    }

    session.goto_page(page);
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

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(payload: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(payload)?;
    println!("{json}");
    Ok(())
}

fn default_render_output(file: &Path, page: u32) -> PathBuf {
    let stem = file.file_stem().and_then(|name| name.to_str()).unwrap_or("page");

    file.with_file_name(format!("{stem}-page-{page}.png"))
}

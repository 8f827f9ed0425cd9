use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use inkframe::api;
use inkframe::models::{AppConfig, PanelSpec, ResizeMode};
use inkframe::panel::{BoxedBus, SimulatedPanel};
use inkframe::rendering::encode_preview;
use inkframe::server;
use inkframe::services::{decode_image, CoordinatorStatus};

#[derive(Parser)]
#[command(name = "inkframe")]
#[command(about = "Photo frame server for a Waveshare 7.3\" ACeP e-paper panel")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve,
    /// Convert a photo to the panel format without touching any hardware
    Convert {
        /// Input JPEG, PNG or WebP file
        input: PathBuf,

        /// Output preview PNG (4-bit indexed, panel colors)
        #[arg(short, long)]
        output: PathBuf,

        /// Also write the raw packed frame
        #[arg(long)]
        frame: Option<PathBuf>,

        /// Letterbox (fit) or crop (fill)
        #[arg(long, value_enum)]
        mode: Option<ResizeMode>,

        /// Clockwise rotation in degrees: 0, 90, 180 or 270
        #[arg(long)]
        rotate: Option<u16>,

        /// Nearest color only, no error diffusion
        #[arg(long)]
        no_dither: bool,

        /// Contrast factor (1.0 = unchanged)
        #[arg(long)]
        contrast: Option<f32>,

        /// Saturation factor (1.0 = unchanged)
        #[arg(long)]
        saturation: Option<f32>,

        /// Target width (default: panel width)
        #[arg(long, requires = "height")]
        width: Option<u32>,

        /// Target height (default: panel height)
        #[arg(long, requires = "width")]
        height: Option<u32>,
    },
    /// Run a full render cycle against the simulated panel
    Show {
        /// Input JPEG, PNG or WebP file
        input: PathBuf,
    },
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "inkframe API",
        description = "Photo upload server for a 7.3\" ACeP e-paper frame",
        version = "0.1.0",
        license(name = "MIT")
    ),
    paths(api::handle_upload, api::handle_status),
    components(schemas(api::UploadForm, api::UploadResponse, CoordinatorStatus)),
    tags(
        (name = "Upload", description = "Photo upload and display"),
        (name = "Status", description = "Panel and queue status")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve) => run_server().await,
        Some(Commands::Convert {
            input,
            output,
            frame,
            mode,
            rotate,
            no_dither,
            contrast,
            saturation,
            width,
            height,
        }) => {
            init_cli_tracing();
            let mut config = load_config();
            if let Some(mode) = mode {
                config.render.mode = mode;
            }
            if let Some(rotate) = rotate {
                config.render.rotate = rotate;
            }
            if no_dither {
                config.render.dither = inkframe::models::DitherSetting::None;
            }
            if let Some(contrast) = contrast {
                config.render.contrast = contrast;
            }
            if let Some(saturation) = saturation {
                config.render.saturation = saturation;
            }
            let spec = match (width, height) {
                (Some(width), Some(height)) => PanelSpec {
                    name: "custom",
                    width,
                    height,
                },
                _ => PanelSpec::ACEP_7IN3F,
            };
            run_convert_command(&config, &spec, &input, &output, frame.as_deref())
        }
        Some(Commands::Show { input }) => {
            init_cli_tracing();
            run_show_command(&load_config(), &input).await
        }
        None => {
            run_status_command();
            Ok(())
        }
    }
}

fn init_cli_tracing() {
    // Minimal logging for CLI
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inkframe=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();
}

fn load_config() -> AppConfig {
    let config_file = std::env::var("CONFIG_FILE").ok().map(PathBuf::from);
    AppConfig::load(config_file.as_deref())
}

fn read_image(input: &Path) -> anyhow::Result<eink_frame::RasterImage> {
    let bytes = std::fs::read(input)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", input.display()))?;
    decode_image(&bytes).map_err(|e| anyhow::anyhow!("{}: {e}", input.display()))
}

/// Quantize and pack a photo, writing the preview and optionally the frame
fn run_convert_command(
    config: &AppConfig,
    spec: &PanelSpec,
    input: &Path,
    output: &Path,
    frame_path: Option<&Path>,
) -> anyhow::Result<()> {
    let image = read_image(input)?;
    let quantizer = config.build_quantizer(spec)?;

    let raster = quantizer.quantize(&image, spec.width, spec.height)?;
    let frame = eink_frame::pack(&raster);

    let png_bytes = encode_preview(&frame, quantizer.palette())?;
    std::fs::write(output, &png_bytes)?;
    println!(
        "Converted {} ({}x{}) -> {} ({}x{}, {} bytes)",
        input.display(),
        image.width(),
        image.height(),
        output.display(),
        frame.width(),
        frame.height(),
        png_bytes.len()
    );

    if let Some(path) = frame_path {
        std::fs::write(path, frame.as_bytes())?;
        println!("Frame {} ({} bytes)", path.display(), frame.len());
    }

    let histogram = raster.histogram();
    let total = raster.indices().len().max(1);
    println!("\nPalette usage:");
    for (index, count) in histogram.iter().enumerate() {
        let [r, g, b] = quantizer.palette().official(index).to_bytes();
        println!(
            "  {index}  #{r:02X}{g:02X}{b:02X}  {:5.1}%",
            *count as f64 * 100.0 / total as f64
        );
    }

    Ok(())
}

/// Render a photo through the coordinator onto the simulated panel
async fn run_show_command(config: &AppConfig, input: &Path) -> anyhow::Result<()> {
    let image = read_image(input)?;

    let panel = SimulatedPanel::new();
    let log = panel.log();
    let bus: BoxedBus = Box::new(panel);

    let mut config = config.clone();
    config.upload.preview_dir = None;
    let state = server::create_app_state(&config, bus)?;

    let report = state.coordinator.render(image).await?;
    let status = state.coordinator.status();

    println!(
        "Cycle {} complete, panel {}",
        report.cycle, status.state
    );
    println!("\nBus transcript:");
    println!("  resets         {}", log.resets());
    println!("  commands       {}", log.commands().len());
    println!(
        "  frame          {} bytes in {} writes",
        log.last_frame().map(|f| f.len()).unwrap_or_default(),
        log.last_frame_chunks().len()
    );
    println!("  busy polls     {}", log.busy_polls());
    println!("  panel time     {} ms (simulated)", log.elapsed().as_millis());
    println!("  host time      {} ms", report.hardware.as_millis());

    Ok(())
}

/// Display status and configuration information
fn run_status_command() {
    const VERSION: &str = env!("CARGO_PKG_VERSION");

    // Read environment variables
    let bind_addr = std::env::var("BIND_ADDR").ok();
    let config_file = std::env::var("CONFIG_FILE").ok();

    // Header
    println!("inkframe v{VERSION}");
    println!("Photo frame server for a Waveshare 7.3\" ACeP e-paper panel\n");

    // Environment variables section
    println!("Environment Variables:");
    println!(
        "  BIND_ADDR   = {}",
        bind_addr.as_deref().unwrap_or("0.0.0.0:3000 (default)")
    );
    println!(
        "  CONFIG_FILE = {}",
        config_file.as_deref().unwrap_or("(not set)")
    );

    // Configuration section
    let config = match config_file.as_deref().map(Path::new) {
        Some(path) => match AppConfig::from_file(path) {
            Ok(config) => {
                println!("\nConfiguration: {}", path.display());
                config
            }
            Err(e) => {
                println!("\nConfiguration: defaults ({e})");
                AppConfig::default()
            }
        },
        None => {
            println!("\nConfiguration: defaults");
            AppConfig::default()
        }
    };
    let spec = PanelSpec::ACEP_7IN3F;
    println!(
        "  Panel:    {} ({}x{}, {} colors)",
        spec.name,
        spec.width,
        spec.height,
        spec.palette().len()
    );
    println!(
        "  Render:   {:?}, rotate {}, {:?}, contrast {}, saturation {}",
        config.render.mode,
        config.render.rotate,
        config.render.dither,
        config.render.contrast,
        config.render.saturation
    );
    println!(
        "  Upload:   max {} bytes, queue timeout {} s",
        config.upload.max_bytes, config.upload.queue_timeout_secs
    );
    println!(
        "  Previews: {}",
        config
            .upload
            .preview_dir
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "disabled".to_string())
    );

    // Commands section
    println!("\nCommands:");
    println!("  inkframe serve     Start the HTTP server");
    println!("  inkframe convert   Convert a photo to a panel frame and preview");
    println!("  inkframe show      Render a photo on the simulated panel");
    println!("\nRun 'inkframe --help' for more details.");
}

/// Run the HTTP server
async fn run_server() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inkframe=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let config = load_config();

    if let Some(dir) = &config.upload.preview_dir {
        tokio::fs::create_dir_all(dir).await?;
    }

    tracing::warn!("No hardware transport configured, driving the simulated panel");
    let bus: BoxedBus = Box::new(SimulatedPanel::new().real_time(true));

    // Create application state using shared server module
    let state = server::create_app_state(&config, bus)?;

    // Build router: start with shared API routes, add production-only routes
    let app = server::build_router(state)
        // OpenAPI documentation (production only)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "inkframe server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_convert_mode_parses_as_enum() {
        let args = ["inkframe", "convert", "in.jpg", "-o", "out.png", "--mode", "fill"];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Some(Commands::Convert { mode, .. }) => assert_eq!(mode, Some(ResizeMode::Fill)),
            _ => panic!("expected convert"),
        }

        let args = ["inkframe", "convert", "in.jpg", "-o", "out.png", "--mode", "zoom"];
        assert!(Cli::try_parse_from(args).is_err(), "unknown mode must be rejected");
    }
}

//! CLI for Imagist - prompt-to-image generation.

use clap::{Args, Parser, Subcommand, ValueEnum};
use imagist::{
    read_reference, AspectRatio, GeminiClient, Session, SessionState, MAX_REFERENCE_BYTES,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "imagist")]
#[command(about = "Generate images from text prompts via the Gemini image API")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an image from a text prompt
    Generate(GenerateArgs),

    /// Show accepted reference-image formats and limits
    Formats,
}

#[derive(Args)]
struct GenerateArgs {
    /// The text prompt describing the image
    prompt: String,

    /// Aspect ratio of the generated image
    #[arg(short, long, value_enum, default_value = "1:1")]
    aspect_ratio: AspectRatioArg,

    /// Reference image to guide or edit (PNG, JPEG, or WebP, up to 5 MiB)
    #[arg(short, long)]
    reference: Option<PathBuf>,

    /// Output file path (defaults to ai-image-<timestamp>.png in the
    /// current directory)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AspectRatioArg {
    #[value(name = "1:1")]
    Square,
    #[value(name = "16:9")]
    Landscape,
    #[value(name = "9:16")]
    Portrait,
    #[value(name = "4:3")]
    Standard,
    #[value(name = "3:4")]
    StandardPortrait,
}

impl From<AspectRatioArg> for AspectRatio {
    fn from(arg: AspectRatioArg) -> Self {
        match arg {
            AspectRatioArg::Square => AspectRatio::Square,
            AspectRatioArg::Landscape => AspectRatio::Landscape,
            AspectRatioArg::Portrait => AspectRatio::Portrait,
            AspectRatioArg::Standard => AspectRatio::Standard,
            AspectRatioArg::StandardPortrait => AspectRatio::StandardPortrait,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate(args) => generate(args, cli.json).await?,
        Commands::Formats => list_formats(cli.json)?,
    }

    Ok(())
}

async fn generate(args: GenerateArgs, json_output: bool) -> anyhow::Result<()> {
    let client = GeminiClient::builder().build()?;
    let mut session = Session::new(client);

    session.set_prompt(&args.prompt);
    session.set_aspect_ratio(args.aspect_ratio.into());

    if let Some(ref reference_path) = args.reference {
        let upload = read_reference(reference_path)?;
        session.attach_reference(upload);
    }

    session.submit().await;

    match session.state() {
        SessionState::Success(image) => {
            let path = match args.output {
                Some(path) => {
                    image.save(&path)?;
                    path
                }
                None => session
                    .download_to(".")?
                    .expect("success state carries an image"),
            };

            if json_output {
                let result = serde_json::json!({
                    "success": true,
                    "output": path.display().to_string(),
                    "size_bytes": image.size(),
                    "format": image.format.extension(),
                    "aspect_ratio": session.aspect_ratio().to_string(),
                    "model": image.metadata.model,
                    "duration_ms": image.metadata.duration_ms,
                });
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Generated image: {} ({} bytes)", path.display(), image.size());
                if let Some(duration) = image.metadata.duration_ms {
                    println!("Duration: {}ms", duration);
                }
            }
            Ok(())
        }
        SessionState::Failure(message) => {
            if json_output {
                let result = serde_json::json!({
                    "success": false,
                    "error": message,
                });
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
            anyhow::bail!("{message}");
        }
        // A blank prompt makes submit a no-op and leaves the session idle.
        SessionState::Idle | SessionState::Loading => {
            anyhow::bail!("nothing was submitted; provide a non-empty prompt");
        }
    }
}

fn list_formats(json_output: bool) -> anyhow::Result<()> {
    let formats = ["png", "jpeg", "webp"];

    if json_output {
        let result = serde_json::json!({
            "reference_formats": formats,
            "max_reference_bytes": MAX_REFERENCE_BYTES,
            "aspect_ratios": AspectRatio::all()
                .iter()
                .map(|r| r.to_string())
                .collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("Reference image formats: {}", formats.join(", "));
        println!("Size limit: {} bytes (5 MiB)", MAX_REFERENCE_BYTES);
        println!(
            "Aspect ratios: {}",
            AspectRatio::all()
                .iter()
                .map(|r| r.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    Ok(())
}

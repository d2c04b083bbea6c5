use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "spoiler-mask", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a mask atlas as a PNG.
    Render(GenerateArgs),
    /// Write a mask as a cache blob.
    Cache(GenerateArgs),
    /// Print the header of a cache blob and whether it decodes.
    Inspect(InspectArgs),
    /// Load or generate the default mask through a cache directory.
    Default(DefaultArgs),
}

#[derive(Parser, Debug)]
struct GenerateArgs {
    /// Descriptor JSON. Defaults to the built-in mask parameters.
    #[arg(long)]
    descriptor: Option<PathBuf>,

    /// Scale applied to the built-in parameters (ignored with --descriptor).
    #[arg(long, default_value_t = 1.0)]
    scale: f64,

    /// Output path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct InspectArgs {
    /// Cache blob to inspect.
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Parser, Debug)]
struct DefaultArgs {
    /// Base cache directory; the mask is stored under `spoiler/mask`.
    #[arg(long)]
    cache_dir: PathBuf,

    /// UI scale times device pixel ratio.
    #[arg(long, default_value_t = 1.0)]
    scale: f64,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Cache(args) => cmd_cache(args),
        Command::Inspect(args) => cmd_inspect(args),
        Command::Default(args) => cmd_default(args),
    }
}

fn read_descriptor_json(path: &Path) -> anyhow::Result<spoiler_mask::Descriptor> {
    let f = File::open(path).with_context(|| format!("open descriptor '{}'", path.display()))?;
    let r = BufReader::new(f);
    let descriptor: spoiler_mask::Descriptor =
        serde_json::from_reader(r).with_context(|| "parse descriptor JSON")?;
    Ok(descriptor)
}

fn build_mask(args: &GenerateArgs) -> anyhow::Result<spoiler_mask::SpoilerMask> {
    let descriptor = match &args.descriptor {
        Some(path) => read_descriptor_json(path)?,
        None => spoiler_mask::Descriptor::for_scale(args.scale),
    };
    Ok(spoiler_mask::generate(&descriptor)?)
}

fn create_parent(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    Ok(())
}

fn cmd_render(args: GenerateArgs) -> anyhow::Result<()> {
    let mask = build_mask(&args)?;
    create_parent(&args.out)?;
    mask.image()
        .save_with_format(&args.out, image::ImageFormat::Png)
        .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!(
        "wrote {} ({} frames, {}px tiles)",
        args.out.display(),
        mask.frames_count(),
        mask.canvas_size()
    );
    Ok(())
}

fn cmd_cache(args: GenerateArgs) -> anyhow::Result<()> {
    let mask = build_mask(&args)?;
    let bytes = spoiler_mask::serialize(&mask)?;
    if bytes.len() as u64 > spoiler_mask::MAX_CACHE_SIZE {
        anyhow::bail!(
            "encoded mask is {} bytes, above the {} byte cache ceiling",
            bytes.len(),
            spoiler_mask::MAX_CACHE_SIZE
        );
    }
    create_parent(&args.out)?;
    std::fs::write(&args.out, &bytes)
        .with_context(|| format!("write cache blob '{}'", args.out.display()))?;

    eprintln!("wrote {} ({} bytes)", args.out.display(), bytes.len());
    Ok(())
}

fn cmd_inspect(args: InspectArgs) -> anyhow::Result<()> {
    let bytes = std::fs::read(&args.in_path)
        .with_context(|| format!("read cache blob '{}'", args.in_path.display()))?;
    let header = spoiler_mask::Header::from_bytes(&bytes)
        .with_context(|| format!("'{}' is shorter than a header", args.in_path.display()))?;
    let rejection = spoiler_mask::codec::decode(&bytes, None).err();
    let report = serde_json::json!({
        "header": header,
        "decodes": rejection.is_none(),
        "rejection": rejection.map(|r| r.to_string()),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn cmd_default(args: DefaultArgs) -> anyhow::Result<()> {
    spoiler_mask::prepare_default_mask(spoiler_mask::DefaultMaskOpts {
        scale: args.scale,
        cache_base: Some(args.cache_dir),
    })?;
    let mask = spoiler_mask::default_mask();
    spoiler_mask::finish_default_mask();

    eprintln!(
        "default mask ready ({} frames, {}px tiles)",
        mask.frames_count(),
        mask.canvas_size()
    );
    Ok(())
}

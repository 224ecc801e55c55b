//! `trigforge` command-line entry point.
//!
//! Inspects and patches levels in the local-levels save container, and
//! converts between level strings and their compressed payload form.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use log::info;
use trigforge_data::{FieldTable, decode_level, decode_level_string, encode_level};
use trigforge_save::{Config, SaveFile, SavePaths, strip_marked};

#[derive(Parser)]
#[command(author, version, about = "Inspect and patch levels in the local-levels save file.")]
struct Cli {
    /// Directory containing CCLocalLevels.dat (overrides config and detection).
    #[arg(long, global = true, value_name = "DIR")]
    save_dir: Option<PathBuf>,
    /// Config file; defaults to ./trigforge.toml when present.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List level names in file order.
    Levels,
    /// Print a level's decoded level string.
    Show(ShowArgs),
    /// Replace a level's contents with a level string read from a file.
    Set(WriteArgs),
    /// Append a level string read from a file to a level.
    Append(WriteArgs),
    /// Remove objects tagged with the export marker group.
    Clean(CleanArgs),
    /// Compress a level string into payload form.
    Encode(InputArgs),
    /// Expand a payload back into its level string.
    Decode(InputArgs),
}

#[derive(Args)]
struct LevelArg {
    /// Level name; the first level when omitted.
    #[arg(long, short)]
    level: Option<String>,
}

#[derive(Args)]
struct ShowArgs {
    #[command(flatten)]
    level: LevelArg,
    /// Print decoded objects as JSON instead of the raw level string.
    #[arg(long)]
    objects: bool,
}

#[derive(Args)]
struct WriteArgs {
    #[command(flatten)]
    level: LevelArg,
    /// File holding the level string, or `-` for stdin.
    #[arg(value_name = "FILE")]
    input: PathBuf,
}

#[derive(Args)]
struct CleanArgs {
    #[command(flatten)]
    level: LevelArg,
    /// Marker group to strip (defaults to the configured one).
    #[arg(long)]
    marker: Option<u32>,
}

#[derive(Args)]
struct InputArgs {
    /// Input file, or `-` for stdin.
    #[arg(value_name = "FILE", default_value = "-")]
    input: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(Path::new("."))?,
    };
    let paths = match &cli.save_dir {
        Some(dir) => SavePaths::new(dir),
        None => config.save_paths(),
    };
    info!("using save directory {}", paths.dir().display());

    match cli.command {
        Commands::Levels => list_levels(&paths),
        Commands::Show(args) => show(&paths, &config, &args),
        Commands::Set(args) => write_level(&paths, &config, &args, false),
        Commands::Append(args) => write_level(&paths, &config, &args, true),
        Commands::Clean(args) => clean(&paths, &config, &args),
        Commands::Encode(args) => {
            println!("{}", encode_level(read_input(&args.input)?.trim_end()));
            Ok(())
        },
        Commands::Decode(args) => {
            println!("{}", decode_level(&read_input(&args.input)?)?);
            Ok(())
        },
    }
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf).context("reading stdin")?;
        return Ok(buf);
    }
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn level_name<'a>(arg: &'a LevelArg, config: &'a Config) -> Option<&'a str> {
    arg.level.as_deref().or(config.level.as_deref())
}

fn list_levels(paths: &SavePaths) -> Result<()> {
    let names = SaveFile::level_names(paths)?;
    if names.is_empty() {
        println!("{}", "no levels in save file".yellow());
    }
    for (i, name) in names.iter().enumerate() {
        println!("{:>3}  {}", i + 1, name.bold());
    }
    Ok(())
}

fn show(paths: &SavePaths, config: &Config, args: &ShowArgs) -> Result<()> {
    let save = SaveFile::open(paths, level_name(&args.level, config))?;
    if args.objects {
        let objects = decode_level_string(&save.data.levelstring, FieldTable::builtin());
        println!("{}", serde_json::to_string_pretty(&objects)?);
    } else {
        println!("{}", save.data.levelstring);
    }
    Ok(())
}

fn write_level(paths: &SavePaths, config: &Config, args: &WriteArgs, append: bool) -> Result<()> {
    let text = read_input(&args.input)?;
    let text = text.trim_end();
    if !text.is_empty() && !text.ends_with(';') {
        bail!("input does not look like a level string (expected a trailing ';')");
    }
    let mut save = SaveFile::open(paths, level_name(&args.level, config))?;
    if append {
        save.add(text)?;
    } else {
        save.set(text)?;
    }
    save.save()?;
    println!("{} '{}'", "updated".green().bold(), save.data.name);
    Ok(())
}

fn clean(paths: &SavePaths, config: &Config, args: &CleanArgs) -> Result<()> {
    let marker = args.marker.unwrap_or(config.marker_group);
    let mut save = SaveFile::open(paths, level_name(&args.level, config))?;
    let (kept, removed) = strip_marked(&save.data.levelstring, marker, FieldTable::builtin());
    if removed == 0 {
        println!("{}", format!("nothing tagged with group {marker}").yellow());
        return Ok(());
    }
    save.set(&kept)?;
    save.save()?;
    println!("{} {removed} objects from '{}'", "removed".green().bold(), save.data.name);
    Ok(())
}

use clap::{Parser, Subcommand};
use pagemill::pipeline::{BuildContext, run_build};
use pagemill::{config, output, site};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "pagemill")]
#[command(version)]
#[command(about = "Processor-pipeline static site builder")]
#[command(long_about = "\
Processor-pipeline static site builder

Every file under the source directory becomes a page. site.toml rules map
path patterns to ordered stage lists; each stage transforms the page's
content, output path, or metadata in place:

  [[rule]]
  pattern = \"*.md\"
  stages = [\"config\", \"ext .html\", \"directorify\", \"markdown\",
            \"template\", \"relativize\", \"minify\"]

Templates can reference other pages' processed output for cache busting:

  <link rel=stylesheet href=\"{{ version(\"css/site.css\") }}\">

renders as css/site.css?v=<content-hash>, forcing the stylesheet through
its own pipeline first. The terminal minify stage writes a pre-compressed
sibling (index-min.html.gz) alongside every primary output.

Run 'pagemill gen-config' for a documented starter site.toml and
'pagemill processors' for the available stages.")]
struct Cli {
    /// Source content directory
    #[arg(long, default_value = "content", global = true)]
    source: PathBuf,

    /// Output directory
    #[arg(long, default_value = "dist", global = true)]
    output: PathBuf,

    /// Config file name, looked up inside the source directory
    #[arg(long, default_value = "site.toml", global = true)]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline and write the site
    Build,
    /// Load the site and validate rules and stage names without writing
    Check,
    /// List registered processors
    Processors,
    /// Print a documented starter site.toml
    GenConfig,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    match cli.command {
        Command::Build => {
            let (site, _config) = load(cli)?;
            println!("==> Building {} pages from {}", site.len(), cli.source.display());
            let ctx = BuildContext::new(site, &cli.output);
            let report = run_build(&ctx)?;
            let failed = !report.failed.is_empty();
            output::print_build_report(&report, &cli.output.display().to_string());
            Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
        }
        Command::Check => {
            let (site, _config) = load(cli)?;
            let registry = pagemill::processor::default_processors();
            let mut unknown = Vec::new();
            for page in site.pages() {
                for stage in &page.stages {
                    if registry.get(&stage.name).is_none() {
                        unknown.push(format!("{}: unknown processor {}", page.path, stage.name));
                    }
                }
            }
            if unknown.is_empty() {
                println!("==> {} pages, all stage names resolve", site.len());
                Ok(ExitCode::SUCCESS)
            } else {
                for line in &unknown {
                    eprintln!("{line}");
                }
                Ok(ExitCode::FAILURE)
            }
        }
        Command::Processors => {
            let registry = pagemill::processor::default_processors();
            output::print_processor_list(&registry.describe_all());
            Ok(ExitCode::SUCCESS)
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Load site.toml (if present) and the source tree.
fn load(cli: &Cli) -> Result<(site::Site, config::BuildConfig), Box<dyn std::error::Error>> {
    let config_path = cli.source.join(&cli.config);
    let config = if config_path.exists() {
        config::BuildConfig::load(&config_path)?
    } else {
        config::BuildConfig::default()
    };
    let site = site::load_site(&cli.source, &config, &cli.config)?;
    Ok((site, config))
}

//! gotmpl CLI: renders a Go template file against a JSON, XML or YAML data
//! file and prints the result.
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use clap::Parser;
use log::debug;
use gotmpl::{detect_and_parse, Config, DataFormat, Error, Library, Renderer, Value};


#[derive(Parser)]
#[command(name = "gotmpl", about = "Render Go text/template files against structured data", version)]
struct Cli {
    /// Template file
    #[arg(long, short)]
    template: PathBuf,

    /// Data file; the format follows the extension or is detected from content
    #[arg(long, short)]
    data: PathBuf,

    /// Default timezone for datetime functions (overrides GOTMPL_TIMEZONE)
    #[arg(long)]
    timezone: Option<String>,
}


fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let library = match library(cli.timezone.as_deref()) {
        Ok(library) => library,
        Err(err) => {
            eprintln!("ConfigurationError: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let result = read(&cli.template)
        .and_then(|template| Ok((template, load_data(&cli.data)?)))
        .and_then(|(template, data)| {
            Renderer::new(&library).render(&template, &data, &mut io::stdout().lock())
        });
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}: {}", err.kind().reason(), err.message());
            ExitCode::FAILURE
        }
    }
}


fn library(timezone: Option<&str>) -> Result<Library, gotmpl::ConfigError> {
    let config = match timezone {
        Some(zone) => Config::from_env().with_timezone(zone),
        None => Config::from_env(),
    };
    debug!("default timezone {}", config.default_timezone);
    Library::new(&config)
}

fn read(path: &Path) -> Result<String, Error> {
    fs::read_to_string(path).map_err(|err| Error::TemplateCompile(
        format!("cannot read {}: {}", path.display(), err)
    ))
}

fn load_data(path: &Path) -> Result<Value, Error> {
    let raw = fs::read(path).map_err(|err| Error::DataFormat(
        format!("cannot read {}: {}", path.display(), err)
    ))?;
    let format = path.extension()
        .and_then(|extension| extension.to_str())
        .and_then(DataFormat::from_extension);
    match format {
        Some(format) => {
            debug!("reading {} as {}", path.display(), format.name());
            let text = String::from_utf8(raw).map_err(|err| Error::DataFormat(
                format!("data is not valid UTF-8: {}", err)
            ))?;
            format.parse(text.trim())
        },
        None => detect_and_parse(raw),
    }
}

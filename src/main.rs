use anyhow::Context;
use argh::FromArgs;
use log::LevelFilter;
use pipesh::env::{Environment, PATH_KEY};
use pipesh::{ExitPolicy, Interpreter, Prompt, ScriptLines};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(FromArgs)]
/// run commands and pipelines, interactively or from a script.
struct Cli {
    #[argh(positional)]
    /// script to run line by line instead of reading from the terminal.
    script: Option<PathBuf>,

    #[argh(option)]
    /// initial command search path, replacing the inherited PATH.
    path: Option<String>,

    #[argh(option, default = "LevelFilter::Off")]
    /// internal log level written to stderr: off, error, warn, info, debug or trace.
    log_level: LevelFilter,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(u8::MAX)),
        Err(err) => {
            eprintln!("pipesh: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<pipesh::ExitCode> {
    let cli: Cli = argh::from_env();

    TermLogger::init(
        cli.log_level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )
    .context("failed to initialise logging")?;

    let mut env = Environment::new();
    if let Some(path) = cli.path {
        env.set_var(PATH_KEY, path);
    }
    let mut sh = Interpreter::new(env);

    match cli.script {
        Some(script) => {
            let file = File::open(&script)
                .with_context(|| format!("cannot open script {}", script.display()))?;
            log::info!("running script {}", script.display());
            let mut source = ScriptLines::new(BufReader::new(file));
            sh.run(&mut source, ExitPolicy::LastStatus)
        }
        None => {
            let mut prompt = Prompt::new().context("failed to start the line editor")?;
            sh.run(&mut prompt, ExitPolicy::FailureFlag)
        }
    }
}

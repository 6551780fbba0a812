use std::io::IsTerminal;

use clap::{CommandFactory, Parser};
use orfail::OrFail;

mod client;
mod perform_tests;
mod script;

use crate::client::DaemonClient;
use crate::perform_tests::PerformTestsCommand;

/// JSON-RPC command line interface for a running fsdev storage daemon.
///
/// Without a subcommand, reads one invocation per line from standard input
/// and replays them over a single connection.
#[derive(Debug, Parser)]
#[clap(version)]
pub struct Args {
    /// RPC domain socket path or IP address.
    #[clap(short = 's', default_value = "/var/tmp/fsdev.sock")]
    pub server_addr: String,

    /// RPC port number (used when the server address is an IP address).
    #[clap(short = 'p', default_value_t = 5260)]
    pub port: u16,

    /// Seconds to wait for a response, as a floating point number.
    #[clap(short = 't', default_value_t = 60.0)]
    pub timeout: f64,

    /// Shorthand for `--verbose INFO`.
    #[clap(short = 'v')]
    pub verbose: bool,

    /// Log level of the RPC transport.
    #[clap(long = "verbose", value_name = "LEVEL", value_enum)]
    pub verbose_level: Option<LogLevel>,

    #[clap(subcommand)]
    pub command: Option<Command>,
}

impl Args {
    /// Resolved transport log level: an explicit `--verbose` wins over `-v`,
    /// and the quiet default is ERROR.
    pub fn log_level(&self) -> LogLevel {
        match self.verbose_level {
            Some(level) => level,
            None if self.verbose => LogLevel::Info,
            None => LogLevel::Error,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[clap(rename_all = "UPPER")]
pub enum LogLevel {
    Debug,
    Info,
    Error,
}

impl LogLevel {
    fn to_filter(self) -> log::LevelFilter {
        match self {
            Self::Debug => log::LevelFilter::Debug,
            Self::Info => log::LevelFilter::Info,
            Self::Error => log::LevelFilter::Error,
        }
    }
}

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// Run fsdev I/O tests on the selected filesystem device, or on all of them.
    #[clap(name = "perform_tests")]
    PerformTests(PerformTestsCommand),
}

impl Command {
    pub fn run(&self, client: &mut DaemonClient) -> orfail::Result<()> {
        match self {
            Self::PerformTests(c) => c.run(client).or_fail(),
        }
    }
}

/// Execution paths of one process run, chosen exactly once from the parsed
/// arguments and the kind of standard input.
#[derive(Debug)]
enum Mode {
    Direct(Command),
    Help,
    Replay,
}

impl Mode {
    fn select(command: Option<Command>, stdin_is_terminal: bool) -> Self {
        match command {
            Some(command) => Self::Direct(command),
            None if stdin_is_terminal => Self::Help,
            None => Self::Replay,
        }
    }
}

/// Runs one subcommand on the shared connection. A failing call prints its
/// message and ends the process.
pub fn execute(command: &Command, client: &mut DaemonClient) {
    if let Err(failure) = command.run(client) {
        println!("{}", failure.message);
        std::process::exit(1);
    }
}

fn main() -> orfail::Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.log_level().to_filter())
        .init();

    // One connection per process, shared by every invocation below.
    let mut client = match DaemonClient::connect(&args.server_addr, args.port, args.timeout) {
        Ok(client) => client,
        Err(failure) => {
            println!("{}", failure.message);
            std::process::exit(1);
        }
    };

    match Mode::select(args.command, std::io::stdin().is_terminal()) {
        Mode::Direct(command) => execute(&command, &mut client),
        Mode::Help => {
            Args::command().print_help().or_fail()?;
            std::process::exit(1);
        }
        Mode::Replay => {
            let stdin = std::io::stdin();
            script::replay(stdin.lock(), &mut client).or_fail()?;
        }
    }
    Ok(())
}

use std::io::BufRead;

use clap::Parser;
use orfail::{Failure, OrFail};

use crate::client::DaemonClient;
use crate::{execute, Args};

/// Replays RPC invocations read line by line from `reader`, all on the same
/// shared connection.
///
/// Blank lines are skipped without a parse or a call. Each remaining line is
/// tokenized with shell quoting rules and parsed under the full CLI grammar;
/// connection options on a line are accepted but the session's connection
/// stays as it is. The first failing line ends the process.
pub fn replay<R: BufRead>(reader: R, client: &mut DaemonClient) -> orfail::Result<()> {
    for line in reader.lines() {
        let line = line.or_fail()?;
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        run_line(line, client).or_fail()?;
    }
    Ok(())
}

fn run_line(line: &str, client: &mut DaemonClient) -> orfail::Result<()> {
    let tokens =
        shlex::split(line).or_fail_with(|()| format!("Malformed command line: {line:?}"))?;
    let argv = std::iter::once("fsdevio".to_owned()).chain(tokens);
    match Args::try_parse_from(argv) {
        Ok(args) => match args.command {
            Some(command) => execute(&command, client),
            None => return Err(Failure::new(format!("No command in line: {line:?}"))),
        },
        Err(e) => {
            // clap renders the usage error for the offending line itself.
            let _ = e.print();
            std::process::exit(1);
        }
    }
    Ok(())
}

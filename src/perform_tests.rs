use orfail::OrFail;

use crate::client::DaemonClient;

/// Run the fsdev I/O test suite on one filesystem device, or on all of them.
#[derive(Debug, clap::Args)]
pub struct PerformTestsCommand {
    /// Name of the fsdev to test. Example: Fs0
    #[clap(short = 'f', long = "name")]
    pub name: Option<String>,
}

impl PerformTestsCommand {
    pub fn run(&self, client: &mut DaemonClient) -> orfail::Result<()> {
        let result = perform_tests(client, self.name.as_deref()).or_fail()?;
        println!("{}", serde_json::to_string_pretty(&result).or_fail()?);
        Ok(())
    }
}

/// Asks the daemon to run its I/O tests, on `name` when given, otherwise on
/// every registered fsdev. The result is the daemon's failure count
/// (0 means every test passed).
pub fn perform_tests(
    client: &mut DaemonClient,
    name: Option<&str>,
) -> orfail::Result<serde_json::Value> {
    let mut params = serde_json::Map::new();
    if let Some(name) = name {
        params.insert("name".to_owned(), name.into());
    }
    client.call("perform_tests", params).or_fail()
}

#[cfg(test)]
mod tests {
    use super::perform_tests;
    use crate::client::{testing, DaemonClient};

    #[test]
    fn sends_name_only_when_filtered() {
        let (addr, requests) = testing::spawn_daemon(serde_json::json!(0));
        let mut client = DaemonClient::connect("127.0.0.1", addr.port(), 60.0).expect("connect");

        perform_tests(&mut client, None).expect("unfiltered call");
        perform_tests(&mut client, Some("Fs0")).expect("filtered call");

        let first = serde_json::to_value(&requests.recv().expect("first request")).expect("json");
        assert_eq!(first["method"], "perform_tests");
        assert!(first.get("params").is_none());

        let second = serde_json::to_value(&requests.recv().expect("second request")).expect("json");
        assert_eq!(second["params"], serde_json::json!({"name": "Fs0"}));
    }
}

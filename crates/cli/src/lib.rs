//! # Polycall CLI
//!
//! `polycall [--config PATH] <endpoint> [PARAMS_JSON]`
//!
//! Loads the endpoint catalog, performs one call through the process-wide
//! orchestrator and returns the generic result map.

use std::path::PathBuf;

use anyhow::{bail, Context};
use polycall_infra::{config, default_orchestrator};
use serde_json::{Map, Value};
use tracing::info;

pub const USAGE: &str = "\
usage: polycall [--config PATH] <endpoint> [PARAMS_JSON]

  --config PATH   endpoint catalog (TOML or JSON); defaults to $POLYCALL_CONFIG,
                  then ./polycall.toml, ./polycall.json, ./config/polycall.toml
  endpoint        friendly name of a catalog endpoint
  PARAMS_JSON     call parameters, e.g. '{\"method\":\"POST\",\"body\":{\"id\":1}}'
";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Call(CallArgs),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallArgs {
    pub config: Option<PathBuf>,
    pub endpoint: String,
    pub params: Option<Map<String, Value>>,
}

/// Parse command-line arguments, excluding the program name.
///
/// # Errors
/// Fails on unknown flags, a missing endpoint name, extra positionals or
/// parameters that are not a JSON object.
pub fn parse_args<I>(args: I) -> anyhow::Result<Command>
where
    I: IntoIterator<Item = String>,
{
    let mut config = None;
    let mut positionals = Vec::new();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "-c" | "--config" => {
                let path = args.next().context("--config requires a path")?;
                config = Some(PathBuf::from(path));
            }
            flag if flag.starts_with("--config=") => {
                config = Some(PathBuf::from(&flag["--config=".len()..]));
            }
            flag if flag.starts_with('-') && flag.len() > 1 => bail!("unknown option: {flag}"),
            _ => positionals.push(arg),
        }
    }

    let mut positionals = positionals.into_iter();
    let endpoint = positionals.next().context("missing endpoint name")?;
    let params = positionals.next().map(|raw| parse_params(&raw)).transpose()?;
    if let Some(extra) = positionals.next() {
        bail!("unexpected argument: {extra}");
    }

    Ok(Command::Call(CallArgs { config, endpoint, params }))
}

fn parse_params(raw: &str) -> anyhow::Result<Map<String, Value>> {
    match serde_json::from_str(raw).context("PARAMS_JSON is not valid JSON")? {
        Value::Object(map) => Ok(map),
        other => bail!("PARAMS_JSON must be a JSON object, got {other}"),
    }
}

/// Result map of one call and whether it succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub result: Map<String, Value>,
    pub success: bool,
}

/// Perform the call described by `args`.
///
/// Failures that still produced a result (HTTP errors, faults, timeouts)
/// come back as an unsuccessful [`Outcome`].
///
/// # Errors
/// Catalog problems, an unknown endpoint, and failures before any attempt
/// (validation, client setup).
pub async fn run(args: &CallArgs) -> anyhow::Result<Outcome> {
    let catalog = config::load(args.config.as_deref()).context("failed to load endpoint catalog")?;
    let Some(endpoint) = catalog.get(&args.endpoint) else {
        let known: Vec<_> = catalog.names().collect();
        bail!("unknown endpoint {:?}; catalog defines: {}", args.endpoint, known.join(", "));
    };

    info!(endpoint = %endpoint.friendly_name, protocol = %endpoint.protocol, "calling endpoint");
    match default_orchestrator()
        .call_with_map(endpoint, args.params.as_ref(), Some(&catalog.connection))
        .await
    {
        Ok(result) => Ok(Outcome { result: result.to_map(), success: true }),
        Err(err) => match err.result {
            Some(result) => Ok(Outcome { result: result.to_map(), success: false }),
            None => Err(err.error).context("call failed before reaching the endpoint"),
        },
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{body_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn parses_endpoint_config_and_params() {
        let command = parse_args(args(&[
            "--config",
            "catalog.toml",
            "users",
            r#"{"method":"POST","body":{"id":1}}"#,
        ]))
        .unwrap();

        let Command::Call(call) = command else { panic!("expected a call") };
        assert_eq!(call.config, Some(PathBuf::from("catalog.toml")));
        assert_eq!(call.endpoint, "users");
        assert_eq!(call.params.unwrap()["method"], json!("POST"));
    }

    #[test]
    fn help_and_bad_input() {
        assert_eq!(parse_args(args(&["users", "--help"])).unwrap(), Command::Help);
        assert!(parse_args(args(&[])).is_err());
        assert!(parse_args(args(&["--config"])).is_err());
        assert!(parse_args(args(&["--verbose", "users"])).is_err());
        assert!(parse_args(args(&["users", "[1,2]"])).is_err());
        assert!(parse_args(args(&["users", "{}", "extra"])).is_err());

        let Command::Call(call) = parse_args(args(&["--config=a.json", "users"])).unwrap() else {
            panic!("expected a call")
        };
        assert_eq!(call.config, Some(PathBuf::from("a.json")));
        assert!(call.params.is_none());
    }

    fn write_catalog(dir: &TempDir, url: &str) -> PathBuf {
        let path = dir.path().join("polycall.json");
        let catalog = json!({
            "endpoints": [{ "friendly_name": "echo", "url": url, "type": "rest" }]
        });
        std::fs::write(&path, catalog.to_string()).unwrap();
        path
    }

    #[tokio::test]
    async fn run_calls_the_catalog_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_json(json!({ "id": 1 })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "created": true })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let call = CallArgs {
            config: Some(write_catalog(&dir, &format!("{}/items", server.uri()))),
            endpoint: "echo".into(),
            params: json!({ "method": "POST", "body": { "id": 1 } }).as_object().cloned(),
        };

        let outcome = run(&call).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.result["statusCode"], json!(201));
        assert_eq!(outcome.result["body"], json!({ "created": true }));
    }

    #[tokio::test]
    async fn unknown_endpoint_lists_the_catalog() {
        let dir = TempDir::new().unwrap();
        let call = CallArgs {
            config: Some(write_catalog(&dir, "http://localhost:1")),
            endpoint: "missing".into(),
            params: None,
        };

        let err = run(&call).await.unwrap_err();
        assert!(err.to_string().contains("echo"));
    }
}

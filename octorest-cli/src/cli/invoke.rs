//! # Invoke Command
//!
//! Sends an arbitrary REST call through the engine and prints the result as
//! pretty JSON.

use anyhow::{Context, Result};
use clap::Args;
use octorest_core::print_success;
use octorest_gh::{Method, RequestSpec};
use serde_json::{Value, json};

use crate::clients::{block_on_cancellable, create_runtime_and_client};

/// Arguments for the invoke command
#[derive(Args, Debug)]
pub struct InvokeArgs {
  /// Path and query after the API base URL, e.g. repos/OWNER/REPO/issues
  #[arg(required = true)]
  pub fragment: String,

  /// HTTP method
  #[arg(short = 'X', long, default_value = "GET", value_parser = parse_method)]
  pub method: Method,

  /// JSON request body (ignored for GET)
  #[arg(long)]
  pub body: Option<String>,

  /// Accept header; defaults to the configured media type
  #[arg(long)]
  pub accept: Option<String>,

  /// Extra request header as NAME:VALUE (repeatable)
  #[arg(short = 'H', long = "header", value_parser = parse_header)]
  pub headers: Vec<(String, String)>,

  /// Token to use instead of the default credential
  #[arg(long)]
  pub token: Option<String>,

  /// GitHub host, e.g. github.com or ghe.example.com
  #[arg(long)]
  pub host: Option<String>,

  /// Follow pagination links and print every item
  #[arg(long = "all-pages")]
  pub all_pages: bool,

  /// Run without progress reporting
  #[arg(long = "no-status")]
  pub no_status: bool,

  /// Print response metadata and call statistics along with the body
  #[arg(long)]
  pub extended: bool,

  /// Description shown in progress output and logs
  #[arg(long)]
  pub description: Option<String>,
}

fn parse_method(value: &str) -> Result<Method, String> {
  value.parse::<Method>().map_err(|e| e.to_string())
}

/// Parse a `NAME:VALUE` header argument
fn parse_header(value: &str) -> Result<(String, String), String> {
  match value.split_once(':') {
    Some((name, header_value)) if !name.trim().is_empty() => {
      Ok((name.trim().to_string(), header_value.trim().to_string()))
    }
    _ => Err(format!("expected NAME:VALUE, got '{value}'")),
  }
}

impl InvokeArgs {
  fn to_spec(&self) -> Result<RequestSpec> {
    let mut builder = RequestSpec::builder(self.method, self.fragment.trim())
      .multiple_pages(self.all_pages)
      .extended_result(self.extended)
      .event_name("cli.invoke");

    if let Some(body) = &self.body {
      let body: Value = serde_json::from_str(body).context("--body must be valid JSON")?;
      builder = builder.body(body);
    }
    if let Some(accept) = &self.accept {
      builder = builder.accept(accept);
    }
    for (name, value) in &self.headers {
      builder = builder.header(name, value);
    }
    if let Some(token) = &self.token {
      builder = builder.access_token(token);
    }
    if let Some(description) = &self.description {
      builder = builder.description(description);
    }
    if self.no_status {
      builder = builder.no_status(true);
    }

    Ok(builder.build())
  }
}

/// Handle the invoke command
pub(crate) fn handle_invoke_command(args: InvokeArgs) -> Result<()> {
  let spec = args.to_spec()?;
  let (rt, client) = create_runtime_and_client(args.host.as_deref())?;

  let output = block_on_cancellable(&rt, |cancel| async move { client.invoke(spec, &cancel).await })
    .with_context(|| format!("{} {} failed", args.method, args.fragment))?;

  let printed = if args.extended {
    json!({
      "body": output.body,
      "meta": output.meta,
      "stats": output.stats,
    })
  } else if output.body.is_null() {
    print_success("Request completed with no response body");
    return Ok(());
  } else {
    output.body
  };

  println!("{}", serde_json::to_string_pretty(&printed)?);
  Ok(())
}

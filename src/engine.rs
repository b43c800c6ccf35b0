use anyhow::{Context, Result};
use std::io::{BufRead, Write};

use crate::cli::ServeArgs;
use crate::exit_codes::exit;
use crate::local::LocalConnector;
use crate::plugin::{Plugin, PluginOptions, ResourcePlugin};
use crate::reporter::Reporter;
use crate::resource::{Request, Response};
use crate::sftp::SftpConnector;

/// Serve requests from stdin, one JSON object per line, until EOF.
pub fn serve(args: ServeArgs) -> Result<i32> {
    let options = PluginOptions {
        poll_interval: args.poll_interval.into(),
        default_directory: args.default_directory,
    };
    let plugin = match args.local_root {
        Some(root) => {
            let root = root
                .canonicalize()
                .with_context(|| format!("local root {}", root.display()))?;
            tracing::info!(root = %root.display(), "serving from local directory");
            Plugin::new(LocalConnector { root }, options)
        }
        None => Plugin::new(SftpConnector, options),
    };

    let stdin = std::io::stdin();
    let mut reporter = Reporter::new(std::io::stdout().lock());
    let handled = serve_lines(&plugin, stdin.lock(), &mut reporter)?;
    let running = plugin.store().in_progress();
    if !running.is_empty() {
        tracing::warn!(jobs = running.len(), "input closed with jobs still in progress");
    }
    plugin.close();
    tracing::info!(handled, "{}", reporter.summary());
    Ok(exit::SUCCESS)
}

/// Decode and dispatch each non-empty line of `input`. Returns the number of
/// lines handled.
pub fn serve_lines<R: BufRead, W: Write>(
    plugin: &dyn ResourcePlugin,
    input: R,
    reporter: &mut Reporter<W>,
) -> Result<usize> {
    let mut handled = 0;
    for line in input.lines() {
        let line = line.context("failed to read request")?;
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => dispatch(plugin, &request),
            Err(e) => {
                tracing::warn!("malformed request: {e}");
                Response::Error {
                    error: format!("invalid request: {e}"),
                }
            }
        };
        reporter.record(&response)?;
        handled += 1;
    }
    Ok(handled)
}

pub fn dispatch(plugin: &dyn ResourcePlugin, request: &Request) -> Response {
    match request {
        Request::Create(req) => Response::Progress(plugin.create(req)),
        Request::Read(req) => Response::Read(plugin.read(req)),
        Request::Update(req) => Response::Progress(plugin.update(req)),
        Request::Delete(req) => Response::Progress(plugin.delete(req)),
        Request::Status(req) => Response::Progress(plugin.status(req)),
        Request::List(req) => Response::List(plugin.list(req)),
    }
}

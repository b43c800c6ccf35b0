use anyhow::Result;
use std::io::Write;

use crate::resource::Response;

/// Writes one JSON response per line and keeps simple counters.
pub struct Reporter<W: Write> {
    out: W,
    responses: usize,
    errors: usize,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            responses: 0,
            errors: 0,
        }
    }

    pub fn record(&mut self, response: &Response) -> Result<()> {
        if matches!(response, Response::Error { .. }) {
            self.errors += 1;
        }
        self.responses += 1;
        let line = serde_json::to_string(response)?;
        writeln!(self.out, "{line}")?;
        self.out.flush()?;
        Ok(())
    }

    pub fn summary(&self) -> String {
        format!("{} responses written, {} malformed requests", self.responses, self.errors)
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ListResult;

    #[test]
    fn records_one_line_per_response() {
        let mut reporter = Reporter::new(Vec::new());
        reporter.record(&Response::List(ListResult::default())).unwrap();
        reporter
            .record(&Response::Error { error: "bad line".into() })
            .unwrap();
        assert_eq!(reporter.summary(), "2 responses written, 1 malformed requests");

        let out = String::from_utf8(reporter.into_inner()).unwrap();
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], r#"{"error":"bad line"}"#);
    }
}

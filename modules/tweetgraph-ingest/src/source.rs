//! Raw record sources. One JSON value per call, in input order.

use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use tweetgraph_common::SourceError;

/// An ordered, finite sequence of raw records.
///
/// `None` ends the stream. `Some(Err(SourceError::Decode { .. }))` is a single
/// bad record and the stream may continue; `SourceError::Io` is terminal.
#[async_trait]
pub trait RecordSource: Send {
    async fn next_record(&mut self) -> Option<Result<Value, SourceError>>;
}

/// Newline-delimited JSON. Blank lines are framing noise and are skipped.
pub struct JsonLinesSource<R> {
    reader: R,
    line: u64,
    buf: String,
}

impl JsonLinesSource<BufReader<tokio::fs::File>> {
    pub async fn open(path: &Path) -> Result<Self, SourceError> {
        let file = tokio::fs::File::open(path).await?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: AsyncBufRead + Unpin + Send> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            buf: String::new(),
        }
    }

    /// Line number of the last record returned (1-based).
    pub fn line(&self) -> u64 {
        self.line
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> RecordSource for JsonLinesSource<R> {
    async fn next_record(&mut self) -> Option<Result<Value, SourceError>> {
        loop {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf).await {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(SourceError::Io(e))),
            }
            self.line += 1;

            let text = self.buf.trim();
            if text.is_empty() {
                continue;
            }
            return Some(serde_json::from_str(text).map_err(|source| SourceError::Decode {
                line: self.line,
                source,
            }));
        }
    }
}

/// In-memory source over already-decoded values.
pub struct IterSource {
    records: std::vec::IntoIter<Value>,
}

impl IterSource {
    pub fn new(records: Vec<Value>) -> Self {
        Self {
            records: records.into_iter(),
        }
    }
}

#[async_trait]
impl RecordSource for IterSource {
    async fn next_record(&mut self) -> Option<Result<Value, SourceError>> {
        self.records.next().map(Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn skips_blank_lines_and_reports_bad_ones() {
        let input = b"{\"id\":1}\n\n   \n{not json\n{\"id\":2}\n".as_slice();
        let mut source = JsonLinesSource::new(input);

        let first = source.next_record().await.unwrap().unwrap();
        assert_eq!(first, json!({"id": 1}));

        match source.next_record().await.unwrap() {
            Err(SourceError::Decode { line, .. }) => assert_eq!(line, 4),
            other => panic!("expected decode error, got {other:?}"),
        }

        let third = source.next_record().await.unwrap().unwrap();
        assert_eq!(third, json!({"id": 2}));
        assert_eq!(source.line(), 5);
        assert!(source.next_record().await.is_none());
    }

    #[tokio::test]
    async fn last_line_without_newline_is_read() {
        let mut source = JsonLinesSource::new(b"{\"id\":9}".as_slice());
        assert_eq!(source.next_record().await.unwrap().unwrap(), json!({"id": 9}));
        assert!(source.next_record().await.is_none());
    }

    #[tokio::test]
    async fn iter_source_preserves_order() {
        let mut source = IterSource::new(vec![json!(1), json!(2)]);
        assert_eq!(source.next_record().await.unwrap().unwrap(), json!(1));
        assert_eq!(source.next_record().await.unwrap().unwrap(), json!(2));
        assert!(source.next_record().await.is_none());
    }
}

//! JSON Lines output of split rows

use crate::json::{encode_keyed, encode_record};
use crate::split::types::SplitConfig;
use crate::value::Record;
use anyhow::{Context, Result};
use std::io::Write;

/// Writes split rows as JSON Lines
pub struct RowWriter<W: Write> {
    writer: W,
    labels: Vec<String>,
    keyed: bool,
    pretty: bool,
}

impl<W: Write> RowWriter<W> {
    pub fn new(writer: W, labels: Vec<String>, config: &SplitConfig) -> Self {
        RowWriter {
            writer,
            labels,
            keyed: config.keyed_output,
            pretty: config.pretty,
        }
    }

    pub fn write_row(&mut self, row: &Record) -> Result<()> {
        let json = if self.keyed {
            encode_keyed(row, &self.labels)
        } else {
            encode_record(row)
        };

        let text = if self.pretty {
            serde_json::to_string_pretty(&json)
        } else {
            serde_json::to_string(&json)
        }
        .context("Failed to serialize row")?;

        writeln!(self.writer, "{}", text).context("Failed to write row")
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().context("Failed to flush writer")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_keyed_and_array_rows() {
        let row = Record::new(vec![Value::Int(5), Value::String("x".to_string())]);
        let labels = vec!["a.b".to_string(), "c".to_string()];

        let mut buffer = Vec::new();
        let mut writer = RowWriter::new(&mut buffer, labels.clone(), &SplitConfig::default());
        writer.write_row(&row).unwrap();

        let config = SplitConfig {
            keyed_output: false,
            ..SplitConfig::default()
        };
        let mut writer = RowWriter::new(&mut buffer, labels, &config);
        writer.write_row(&row).unwrap();
        writer.flush().unwrap();

        let output = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines, vec![r#"{"a.b":5,"c":"x"}"#, r#"[5,"x"]"#]);
    }
}

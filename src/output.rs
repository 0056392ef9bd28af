//! Stream writers: where views send their rows.
//!
//! A [`StreamWriter`] receives one [`Row`] per view run. The kernel
//! never formats values itself; formatting is the writer's concern.
//!
//! | Writer | Target |
//! |---|---|
//! | [`Storage`] | in-memory rows, inspected after the run |
//! | [`TextWriter`] | `time;column=value` lines on any `io::Write` |
//! | [`JsonWriter`] | one JSON object per line (feature `serialize`) |

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{DevsError, DevsResult};
use crate::time::Time;
use crate::value::Value;

// ── Row ───────────────────────────────────────────────────────────────

/// One sampling of every observable of a view.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Row {
    pub time: Time,
    /// `(column, value)` pairs; the column is `model path.port`. A
    /// `None` value means the model did not answer for that port.
    pub values: Vec<(String, Option<Value>)>,
}

impl Row {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(c, _)| c == column)
            .and_then(|(_, v)| v.as_ref())
    }
}

// ── StreamWriter ──────────────────────────────────────────────────────

/// Sink for the rows produced by one view.
pub trait StreamWriter {
    /// Called once before the first row.
    fn open(&mut self, _view: &str, _time: Time) -> DevsResult<()> {
        Ok(())
    }

    fn write(&mut self, row: &Row) -> DevsResult<()>;

    /// Called once at the end of the simulation.
    fn close(&mut self, _time: Time) -> DevsResult<()> {
        Ok(())
    }

    /// Downcast support, required for `Coordinator::output::<T>()`.
    fn as_any(&self) -> &dyn std::any::Any;
}

// ── Storage ───────────────────────────────────────────────────────────

/// Keeps every row in memory.
#[derive(Debug, Clone, Default)]
pub struct Storage {
    view: String,
    rows: Vec<Row>,
    closed_at: Option<Time>,
}

impl Storage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name of the view feeding this storage, set on open.
    pub fn view(&self) -> &str {
        &self.view
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Rows recorded at exactly `time`.
    pub fn rows_at(&self, time: Time) -> Vec<&Row> {
        self.rows.iter().filter(|r| r.time == time).collect()
    }

    /// The history of one column: `(time, value)` per row that has it.
    pub fn column(&self, column: &str) -> Vec<(Time, Option<Value>)> {
        self.rows
            .iter()
            .filter_map(|r| {
                r.values
                    .iter()
                    .find(|(c, _)| c == column)
                    .map(|(_, v)| (r.time, v.clone()))
            })
            .collect()
    }

    pub fn closed_at(&self) -> Option<Time> {
        self.closed_at
    }
}

impl StreamWriter for Storage {
    fn open(&mut self, view: &str, _time: Time) -> DevsResult<()> {
        self.view = view.to_string();
        Ok(())
    }

    fn write(&mut self, row: &Row) -> DevsResult<()> {
        self.rows.push(row.clone());
        Ok(())
    }

    fn close(&mut self, time: Time) -> DevsResult<()> {
        self.closed_at = Some(time);
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

// ── TextWriter ────────────────────────────────────────────────────────

/// Writes `time;column=value;...` lines. Missing values print as `NA`.
#[derive(Debug)]
pub struct TextWriter<W: Write> {
    out: W,
}

impl TextWriter<BufWriter<File>> {
    /// Create (or truncate) `path`. Fails with `DevsError::Io` if the
    /// file cannot be created.
    pub fn create(path: impl AsRef<Path>) -> DevsResult<Self> {
        let path = path.as_ref();
        let file = File::create(path)
            .map_err(|e| DevsError::Io(format!("cannot create `{}`: {}", path.display(), e)))?;
        Ok(TextWriter::new(BufWriter::new(file)))
    }
}

impl<W: Write> TextWriter<W> {
    pub fn new(out: W) -> Self {
        TextWriter { out }
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }
}

impl<W: Write + 'static> StreamWriter for TextWriter<W> {
    fn open(&mut self, view: &str, time: Time) -> DevsResult<()> {
        writeln!(self.out, "# view {} opened at {}", view, time.value())?;
        Ok(())
    }

    fn write(&mut self, row: &Row) -> DevsResult<()> {
        write!(self.out, "{}", row.time.value())?;
        for (column, value) in &row.values {
            match value {
                Some(v) => write!(self.out, ";{}={}", column, v)?,
                None => write!(self.out, ";{}=NA", column)?,
            }
        }
        writeln!(self.out)?;
        Ok(())
    }

    fn close(&mut self, _time: Time) -> DevsResult<()> {
        self.out.flush()?;
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

// ── JsonWriter ────────────────────────────────────────────────────────

#[cfg(feature = "serialize")]
pub use json::JsonWriter;

#[cfg(feature = "serialize")]
mod json {
    use std::fs::File;
    use std::io::{BufWriter, Write};
    use std::path::Path;

    use super::{Row, StreamWriter};
    use crate::error::{DevsError, DevsResult};
    use crate::value::Value;

    /// Writes one JSON object per row: `{"time":..,"values":{..}}`.
    #[derive(Debug)]
    pub struct JsonWriter<W: Write> {
        out: W,
    }

    impl JsonWriter<BufWriter<File>> {
        pub fn create(path: impl AsRef<Path>) -> DevsResult<Self> {
            let path = path.as_ref();
            let file = File::create(path).map_err(|e| {
                DevsError::Io(format!("cannot create `{}`: {}", path.display(), e))
            })?;
            Ok(JsonWriter::new(BufWriter::new(file)))
        }
    }

    impl<W: Write> JsonWriter<W> {
        pub fn new(out: W) -> Self {
            JsonWriter { out }
        }

        pub fn get_ref(&self) -> &W {
            &self.out
        }
    }

    fn to_json(value: &Value) -> serde_json::Value {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Integer(i) => serde_json::Value::from(*i),
            Value::Double(d) => serde_json::Value::from(*d),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Set(items) => serde_json::Value::Array(items.iter().map(to_json).collect()),
            Value::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), to_json(v))).collect(),
            ),
        }
    }

    impl<W: Write + 'static> StreamWriter for JsonWriter<W> {
        fn write(&mut self, row: &Row) -> DevsResult<()> {
            let values: serde_json::Map<String, serde_json::Value> = row
                .values
                .iter()
                .map(|(c, v)| {
                    (
                        c.clone(),
                        v.as_ref().map_or(serde_json::Value::Null, to_json),
                    )
                })
                .collect();
            let line = serde_json::json!({ "time": row.time.value(), "values": values });
            serde_json::to_writer(&mut self.out, &line)
                .map_err(|e| DevsError::Io(e.to_string()))?;
            writeln!(self.out)?;
            Ok(())
        }

        fn close(&mut self, _time: crate::time::Time) -> DevsResult<()> {
            self.out.flush()?;
            Ok(())
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::time::Time;

        #[test]
        fn test_json_line_per_row() {
            let mut writer = JsonWriter::new(Vec::new());
            writer
                .write(&Row {
                    time: Time::new(1.5),
                    values: vec![("top:a.count".into(), Some(Value::Integer(2)))],
                })
                .unwrap();
            let text = String::from_utf8(writer.get_ref().clone()).unwrap();
            let parsed: serde_json::Value = serde_json::from_str(text.trim()).unwrap();
            assert_eq!(parsed["time"], 1.5);
            assert_eq!(parsed["values"]["top:a.count"], 2);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(t: f64, v: Option<i64>) -> Row {
        Row {
            time: Time::new(t),
            values: vec![("top:a.count".into(), v.map(Value::Integer))],
        }
    }

    #[test]
    fn test_storage_keeps_rows() {
        let mut storage = Storage::new();
        storage.open("v", Time::ZERO).unwrap();
        storage.write(&row(0.0, Some(1))).unwrap();
        storage.write(&row(1.0, None)).unwrap();
        storage.close(Time::new(1.0)).unwrap();

        assert_eq!(storage.view(), "v");
        assert_eq!(storage.rows().len(), 2);
        assert_eq!(
            storage.column("top:a.count"),
            vec![
                (Time::ZERO, Some(Value::Integer(1))),
                (Time::new(1.0), None)
            ]
        );
        assert_eq!(storage.closed_at(), Some(Time::new(1.0)));
    }

    #[test]
    fn test_text_writer_format() {
        let mut writer = TextWriter::new(Vec::new());
        writer.write(&row(2.5, Some(3))).unwrap();
        writer.write(&row(3.0, None)).unwrap();
        let text = String::from_utf8(writer.get_ref().clone()).unwrap();
        assert_eq!(text, "2.5;top:a.count=3\n3;top:a.count=NA\n");
    }

    #[test]
    fn test_text_writer_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("view.txt");
        let mut writer = TextWriter::create(&path).unwrap();
        writer.open("v", Time::ZERO).unwrap();
        writer.write(&row(1.0, Some(4))).unwrap();
        writer.close(Time::new(1.0)).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("# view v opened at 0\n"));
        assert!(text.contains("1;top:a.count=4"));
    }

    #[test]
    fn test_text_writer_bad_path_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("view.txt");
        assert!(matches!(TextWriter::create(&path), Err(DevsError::Io(_))));
    }
}

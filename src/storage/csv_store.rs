//! CSV record store

use crate::schema::{CanonicalRecord, Schema, INDEX_COLUMN};
use crate::storage::{Storage, StorageError, StorageResult};
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Append-only CSV store
///
/// The first column is a running row index; the remaining columns are the
/// schema columns in the order the header lists them. An existing header is
/// authoritative: rows are written in its order, whatever order the schema
/// uses.
pub struct CsvStorage {
    path: PathBuf,
    file: File,
    schema: Schema,
    null_marker: String,

    /// Schema position of each on-disk column after the index; `None` until
    /// a header exists
    layout: Option<Vec<usize>>,

    rows: u64,
}

impl CsvStorage {
    /// Opens or creates the store and verifies its header
    ///
    /// A trailing partial row left by an interrupted write is truncated
    /// before anything else happens. A complete final row that only lacks its
    /// newline is kept.
    pub fn open(path: impl AsRef<Path>, schema: Schema, null_marker: &str) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)?;

        let mut contents = Vec::new();
        file.read_to_end(&mut contents)?;
        repair_torn_tail(&mut file, &path, &schema, &mut contents)?;

        let (layout, rows) = if contents.is_empty() {
            (None, 0)
        } else {
            let mut reader = csv::ReaderBuilder::new()
                .has_headers(true)
                .from_reader(contents.as_slice());
            let found: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
            let layout = align_header(&path, &schema, found)?;

            let mut rows = 0;
            for record in reader.records() {
                record?;
                rows += 1;
            }
            (Some(layout), rows)
        };

        tracing::info!(
            "Opened store {} ({} existing rows)",
            path.display(),
            rows
        );

        Ok(Self {
            path,
            file,
            schema,
            null_marker: null_marker.to_string(),
            layout,
            rows,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Index the next appended row will carry
    pub fn next_index(&self) -> u64 {
        self.rows + 1
    }

    fn write_header(&mut self) -> StorageResult<Vec<usize>> {
        let line = encode_line(self.schema.header())?;
        self.file.write_all(&line)?;
        self.file.flush()?;
        tracing::debug!("Wrote header to {}", self.path.display());
        Ok((0..self.schema.len()).collect())
    }

    fn append_rows(&mut self, layout: &[usize], records: &[CanonicalRecord]) -> StorageResult<usize> {
        for record in records {
            let index = (self.rows + 1).to_string();
            let cells = record.cells();

            let mut fields = Vec::with_capacity(layout.len() + 1);
            fields.push(index.as_str());
            fields.extend(
                layout
                    .iter()
                    .map(|&position| cells[position].render(&self.null_marker)),
            );

            let line = encode_line(&fields)?;
            self.file.write_all(&line)?;
            self.file.flush()?;
            self.rows += 1;
        }
        Ok(records.len())
    }
}

impl Storage for CsvStorage {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn row_count(&self) -> u64 {
        self.rows
    }

    fn append(&mut self, records: &[CanonicalRecord]) -> StorageResult<usize> {
        if records.iter().any(|record| record.schema() != &self.schema) {
            return Err(StorageError::RecordSchema);
        }

        let layout = match self.layout.take() {
            Some(layout) => layout,
            None => self.write_header()?,
        };
        let result = self.append_rows(&layout, records);
        self.layout = Some(layout);
        let written = result?;

        self.file.sync_data()?;
        tracing::debug!("Appended {} rows to {}", written, self.path.display());
        Ok(written)
    }
}

/// Serializes one CSV line in memory
fn encode_line<I, T>(fields: I) -> StorageResult<Vec<u8>>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(fields)?;
    writer
        .into_inner()
        .map_err(|e| StorageError::Io(e.into_error()))
}

/// Completes or drops a final line that lacks its newline
///
/// The line is kept, and terminated, when it parses as exactly one record
/// with as many fields as the header. Otherwise it is a row torn by an
/// interrupted write and is truncated.
fn repair_torn_tail(
    file: &mut File,
    path: &Path,
    schema: &Schema,
    contents: &mut Vec<u8>,
) -> StorageResult<()> {
    if contents.is_empty() || contents.ends_with(b"\n") {
        return Ok(());
    }

    let keep = contents
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |pos| pos + 1);
    // With no newline at all the tail is the header itself
    let expected = if keep == 0 {
        schema.len() + 1
    } else {
        first_record_len(&contents[..keep]).unwrap_or(0)
    };

    if is_whole_record(&contents[keep..], expected) {
        tracing::warn!(
            "Final line of {} has no line terminator, completing it",
            path.display()
        );
        file.write_all(b"\n")?;
        file.flush()?;
        contents.push(b'\n');
        return Ok(());
    }

    tracing::warn!(
        "Truncating {} bytes of a partial row at the end of {}",
        contents.len() - keep,
        path.display()
    );

    file.set_len(keep as u64)?;
    contents.truncate(keep);
    Ok(())
}

fn tail_reader(bytes: &[u8]) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes)
}

/// Field count of the first record in `bytes`
fn first_record_len(bytes: &[u8]) -> Option<usize> {
    let record = tail_reader(bytes).records().next()?.ok()?;
    Some(record.len())
}

/// Whether `line` is exactly one record of `expected` fields
fn is_whole_record(line: &[u8], expected: usize) -> bool {
    // An odd quote count means the write stopped inside a quoted field
    if line.iter().filter(|&&b| b == b'"').count() % 2 != 0 {
        return false;
    }

    let mut reader = tail_reader(line);
    let mut records = reader.records();
    match (records.next(), records.next()) {
        (Some(Ok(record)), None) => record.len() == expected,
        _ => false,
    }
}

/// Maps an existing header onto schema positions
fn align_header(path: &Path, schema: &Schema, found: Vec<String>) -> StorageResult<Vec<usize>> {
    let mismatch = |found: Vec<String>| StorageError::SchemaMismatch {
        path: path.display().to_string(),
        expected: schema.header().into_iter().map(str::to_string).collect(),
        found,
    };

    let Some((first, columns)) = found.split_first() else {
        return Err(mismatch(found));
    };
    if first != INDEX_COLUMN || columns.len() != schema.len() {
        return Err(mismatch(found));
    }

    let mut layout = Vec::with_capacity(columns.len());
    let mut seen = vec![false; schema.len()];
    for column in columns {
        match schema.position(column) {
            Some(position) if !seen[position] => {
                seen[position] = true;
                layout.push(position);
            }
            _ => return Err(mismatch(found)),
        }
    }
    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{reconcile, AliasTable, RawAttributeMap};
    use std::fs;
    use tempfile::TempDir;

    fn schema() -> Schema {
        Schema::new(["CENA", "Balkón", "STAV"]).unwrap()
    }

    fn record(price: &str) -> CanonicalRecord {
        let raw: RawAttributeMap = [("CENA", price), ("Balkón", "")].into_iter().collect();
        reconcile(&raw, &schema(), &AliasTable::empty()).record
    }

    #[test]
    fn test_first_append_writes_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.csv");

        let mut store = CsvStorage::open(&path, schema(), "NaN").unwrap();
        assert_eq!(store.append(&[record("15 000 Kč")]).unwrap(), 1);

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "Index,CENA,Balkón,STAV\n1,15 000 Kč,1,NaN\n");
    }

    #[test]
    fn test_empty_append_still_writes_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.csv");

        let mut store = CsvStorage::open(&path, schema(), "NaN").unwrap();
        assert_eq!(store.append(&[]).unwrap(), 0);
        assert_eq!(fs::read_to_string(&path).unwrap(), "Index,CENA,Balkón,STAV\n");

        store.append(&[]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "Index,CENA,Balkón,STAV\n");
    }

    #[test]
    fn test_append_to_existing_store_keeps_single_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.csv");

        {
            let mut store = CsvStorage::open(&path, schema(), "NaN").unwrap();
            let records: Vec<_> = (0..10).map(|i| record(&format!("{} Kč", i))).collect();
            store.append(&records).unwrap();
        }

        let mut store = CsvStorage::open(&path, schema(), "NaN").unwrap();
        assert_eq!(store.row_count(), 10);
        assert_eq!(store.next_index(), 11);
        store.append(&[record("99 Kč")]).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 12);
        assert_eq!(
            lines.iter().filter(|l| l.starts_with("Index,")).count(),
            1
        );
        assert_eq!(lines[11], "11,99 Kč,1,NaN");
    }

    #[test]
    fn test_rows_follow_existing_header_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.csv");
        fs::write(&path, "Index,STAV,CENA,Balkón\n1,Dobrý,9 Kč,NaN\n").unwrap();

        let mut store = CsvStorage::open(&path, schema(), "NaN").unwrap();
        store.append(&[record("15 000 Kč")]).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.ends_with("2,NaN,15 000 Kč,1\n"));
    }

    #[test]
    fn test_header_mismatch_is_rejected() {
        let dir = TempDir::new().unwrap();

        for header in [
            "CENA,Balkón,STAV\n",
            "Index,CENA,Balkón\n",
            "Index,CENA,Balkón,STAV,Sauna\n",
            "Index,CENA,CENA,STAV\n",
        ] {
            let path = dir.path().join("store.csv");
            fs::write(&path, header).unwrap();

            let result = CsvStorage::open(&path, schema(), "NaN");
            assert!(
                matches!(result, Err(StorageError::SchemaMismatch { .. })),
                "header {:?} accepted",
                header
            );
        }
    }

    #[test]
    fn test_torn_tail_is_truncated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.csv");
        fs::write(&path, "Index,CENA,Balkón,STAV\n1,9 Kč,1,NaN\n2,12 0").unwrap();

        let mut store = CsvStorage::open(&path, schema(), "NaN").unwrap();
        assert_eq!(store.row_count(), 1);
        store.append(&[record("15 000 Kč")]).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "Index,CENA,Balkón,STAV\n1,9 Kč,1,NaN\n2,15 000 Kč,1,NaN\n"
        );
    }

    #[test]
    fn test_complete_final_row_without_newline_is_kept() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.csv");
        fs::write(&path, "Index,CENA,Balkón,STAV\n1,9 Kč,1,NaN\n2,12 Kč,NaN,Dobrý").unwrap();

        let mut store = CsvStorage::open(&path, schema(), "NaN").unwrap();
        assert_eq!(store.row_count(), 2);
        store.append(&[record("15 000 Kč")]).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "Index,CENA,Balkón,STAV\n1,9 Kč,1,NaN\n2,12 Kč,NaN,Dobrý\n3,15 000 Kč,1,NaN\n"
        );
    }

    #[test]
    fn test_row_torn_inside_quotes_is_truncated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.csv");
        fs::write(&path, "Index,CENA,Balkón,STAV\n1,9 Kč,1,NaN\n2,1,NaN,\"Velmi").unwrap();

        let store = CsvStorage::open(&path, schema(), "NaN").unwrap();
        assert_eq!(store.row_count(), 1);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "Index,CENA,Balkón,STAV\n1,9 Kč,1,NaN\n"
        );
    }

    #[test]
    fn test_header_without_newline_is_kept() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.csv");
        fs::write(&path, "Index,STAV,CENA,Balkón").unwrap();

        let mut store = CsvStorage::open(&path, schema(), "NaN").unwrap();
        assert_eq!(store.row_count(), 0);
        store.append(&[record("15 000 Kč")]).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "Index,STAV,CENA,Balkón\n1,NaN,15 000 Kč,1\n"
        );
    }

    #[test]
    fn test_record_from_other_schema_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.csv");
        let other = Schema::new(["CENA"]).unwrap();
        let foreign = reconcile(&RawAttributeMap::new(), &other, &AliasTable::empty()).record;

        let mut store = CsvStorage::open(&path, schema(), "NaN").unwrap();
        assert!(matches!(
            store.append(&[foreign]),
            Err(StorageError::RecordSchema)
        ));
    }
}

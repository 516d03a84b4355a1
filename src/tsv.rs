//! Tab-delimited source reader: header sniffing, header canonicalization and typed rows.
//!
//! A file either starts with a literal header row (recognized by the family's probe token)
//! or is positional, in which case the family's fallback header list names the columns.

use crate::error::SourceError;
use crate::util::open_with_backoff;
use ahash::AHashMap;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// A typed record for one source family.
pub trait SourceRecord: Sized {
    /// Leading text of a file that carries its own header row.
    const PROBE: &'static str;
    /// Positional header used when the probe does not match. Empty means the header row is mandatory.
    const FALLBACK_HEADERS: &'static [&'static str];
    /// Canonical column keys `from_row` reads with `Row::get`.
    const REQUIRED: &'static [&'static str];

    fn from_row(row: &Row<'_>) -> Self;
}

/// Canonical field key of a header cell: `"[39]Alternate School Number"` -> `alternate_school_number`.
pub fn canonical_header(raw: &str) -> String {
    let lower: String = raw
        .to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();
    let body = match lower.find(']') {
        Some(i) if i > 0 => &lower[i + 1..],
        _ => lower.as_str(),
    };
    body.chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_')
        .collect()
}

/// Resolved column layout of one source file.
#[derive(Debug)]
pub struct Header {
    keys: Vec<String>,
    index: AHashMap<String, usize>,
}

impl Header {
    fn new<I, S>(cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keys: Vec<String> = cells.into_iter().map(|c| canonical_header(c.as_ref())).collect();
        let mut index = AHashMap::with_capacity(keys.len());
        for (i, k) in keys.iter().enumerate() {
            index.entry(k.clone()).or_insert(i);
        }
        Self { keys, index }
    }

    fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }
}

/// One data row viewed through its header. Cells are decoded lossily; `bytes` exposes the
/// undecoded field for binary-encoded columns.
pub struct Row<'a> {
    header: &'a Header,
    cells: &'a [String],
    raw: &'a csv::ByteRecord,
}

impl<'a> Row<'a> {
    /// Value of a column declared in `SourceRecord::REQUIRED`.
    #[inline]
    pub fn get(&self, key: &str) -> &'a str {
        self.opt(key).unwrap_or("")
    }

    /// Value of a column that some extracts do not carry.
    #[inline]
    pub fn opt(&self, key: &str) -> Option<&'a str> {
        let i = *self.header.index.get(key)?;
        self.cells.get(i).map(String::as_str)
    }

    /// Undecoded bytes of a column that some extracts do not carry.
    #[inline]
    pub fn bytes(&self, key: &str) -> Option<&'a [u8]> {
        let i = *self.header.index.get(key)?;
        self.raw.get(i)
    }

    #[inline]
    pub fn string(&self, key: &str) -> String {
        self.get(key).to_string()
    }

    #[inline]
    pub fn opt_string(&self, key: &str) -> Option<String> {
        self.opt(key).map(str::to_string)
    }
}

/// Lazy typed row sequence over one source file.
pub struct SourceReader<R> {
    path: PathBuf,
    header: Header,
    rdr: csv::Reader<BufReader<File>>,
    record: csv::ByteRecord,
    cells: Vec<String>,
    _marker: PhantomData<fn() -> R>,
}

impl<R: SourceRecord> SourceReader<R> {
    /// Open `path`, decide whether it carries a header row and check the required columns.
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let io_err = |source: io::Error| SourceError::Io { path: path.to_path_buf(), source };
        let mut file = match open_with_backoff(path, 16, 50) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(SourceError::NotFound { path: path.to_path_buf() })
            }
            Err(e) => return Err(io_err(e)),
        };

        let mut probe = Vec::with_capacity(R::PROBE.len());
        (&mut file).take(R::PROBE.len() as u64).read_to_end(&mut probe).map_err(io_err)?;
        file.seek(SeekFrom::Start(0)).map_err(io_err)?;
        let has_header = !R::PROBE.is_empty() && probe == R::PROBE.as_bytes();

        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .quoting(false)
            .flexible(true)
            .from_reader(BufReader::with_capacity(256 * 1024, file));

        let header = if has_header {
            let mut first = csv::ByteRecord::new();
            rdr.read_byte_record(&mut first)
                .map_err(|source| SourceError::Format { path: path.to_path_buf(), source })?;
            Header::new(first.iter().map(String::from_utf8_lossy))
        } else if !R::FALLBACK_HEADERS.is_empty() {
            Header::new(R::FALLBACK_HEADERS.iter())
        } else {
            return Err(SourceError::MissingHeader { path: path.to_path_buf() });
        };

        if let Some(column) = R::REQUIRED.iter().copied().find(|c| !header.contains(c)) {
            return Err(SourceError::MissingColumn { path: path.to_path_buf(), column });
        }

        tracing::debug!(path = %path.display(), has_header, columns = header.len(), "opened source");
        Ok(Self {
            path: path.to_path_buf(),
            header,
            rdr,
            record: csv::ByteRecord::new(),
            cells: Vec::new(),
            _marker: PhantomData,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }
}

impl<R: SourceRecord> Iterator for SourceReader<R> {
    type Item = Result<R, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.rdr.read_byte_record(&mut self.record) {
            Ok(false) => None,
            Err(source) => Some(Err(SourceError::Format { path: self.path.clone(), source })),
            Ok(true) if self.record.len() != self.header.len() => Some(Err(SourceError::ColumnCount {
                path: self.path.clone(),
                line: self.record.position().map(|p| p.line()).unwrap_or(0),
                expected: self.header.len(),
                found: self.record.len(),
            })),
            Ok(true) => {
                self.cells.clear();
                self.cells.extend(self.record.iter().map(|c| String::from_utf8_lossy(c).into_owned()));
                Some(Ok(R::from_row(&Row { header: &self.header, cells: &self.cells, raw: &self.record })))
            }
        }
    }
}

/// Stream every record of `path` into `on_record`; returns the number of rows read.
pub fn for_each_record<R: SourceRecord>(
    path: &Path,
    on_record: impl FnMut(R) -> anyhow::Result<()>,
) -> anyhow::Result<u64> {
    drain(SourceReader::<R>::open(path)?, on_record)
}

/// Like `for_each_record`, but an absent file means "no data for this family": `Ok(None)`.
pub fn for_each_present_record<R: SourceRecord>(
    path: &Path,
    on_record: impl FnMut(R) -> anyhow::Result<()>,
) -> anyhow::Result<Option<u64>> {
    match SourceReader::<R>::open(path) {
        Ok(reader) => drain(reader, on_record).map(Some),
        Err(e) if e.is_not_found() => {
            tracing::info!(path = %path.display(), "source file absent; skipping family");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn drain<R: SourceRecord>(
    reader: SourceReader<R>,
    mut on_record: impl FnMut(R) -> anyhow::Result<()>,
) -> anyhow::Result<u64> {
    let mut rows = 0u64;
    for rec in reader {
        on_record(rec?)?;
        rows += 1;
    }
    Ok(rows)
}

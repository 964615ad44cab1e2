//! An annotation file reader.

use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::io::{self};
use std::iter;
use std::path::Path;

use flate2::read::MultiGzDecoder;

use crate::annotation::record;
use crate::annotation::record::Record;
use crate::annotation::Feature;

/// The new line character.
const NEW_LINE: char = '\n';

/// The carriage return character.
const CARRIAGE_RETURN: char = '\r';

/// The prefix of a comment line.
const COMMENT_PREFIX: char = '#';

/// The extension marking a gzip-compressed file.
const GZIP_EXTENSION: &str = "gz";

/// An error related to a [`Reader`].
#[derive(Debug)]
pub enum Error {
    /// An I/O error.
    Io(io::Error),

    /// A record error, with the 1-based line number it occurred on.
    Record(record::Error, usize),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err) => write!(f, "i/o error: {err}"),
            Error::Record(err, line) => write!(f, "record error on line {line}: {err}"),
        }
    }
}

impl std::error::Error for Error {}

/// An annotation file reader.
#[derive(Clone, Debug)]
pub struct Reader<T>(T)
where
    T: BufRead;

impl Reader<Box<dyn BufRead>> {
    /// Opens the annotation file at `path`, decompressing it when the file
    /// name ends in `.gz`.
    pub fn from_path(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;

        let inner: Box<dyn BufRead> = match path.extension().and_then(|ext| ext.to_str()) {
            Some(GZIP_EXTENSION) => Box::new(BufReader::new(MultiGzDecoder::new(file))),
            _ => Box::new(BufReader::new(file)),
        };

        Ok(Self(inner))
    }
}

impl<T> Reader<T>
where
    T: BufRead,
{
    /// Creates an annotation file reader.
    ///
    /// # Examples
    ///
    /// ```
    /// let data = b"Actb\tActb\tchr5\t-\t100\t401\t100\t401\t1\t100\t401";
    /// let reader = strtquant::annotation::Reader::new(&data[..]);
    /// ```
    pub fn new(inner: T) -> Self {
        Self::from(inner)
    }

    /// Gets a reference to the inner reader.
    pub fn inner(&self) -> &T {
        &self.0
    }

    /// Consumes self and returns the inner reader.
    pub fn into_inner(self) -> T {
        self.0
    }

    /// Reads a raw, textual line from the underlying reader.
    pub fn read_line_raw(&mut self, buffer: &mut String) -> io::Result<usize> {
        read_line(&mut self.0, buffer)
    }

    /// Returns an iterator over the [`Record`]s in the underlying reader.
    ///
    /// Empty lines and lines starting with `#` are skipped.
    pub fn records(&mut self) -> impl Iterator<Item = Result<Record, Error>> + '_ {
        self.numbered_records()
            .map(|result| result.map(|(_, record)| record))
    }

    /// Returns an iterator over the [`Feature`]s in the underlying reader.
    ///
    /// # Examples
    ///
    /// ```
    /// let data = b"# refFlat\nActb\tActb\tchr5\t-\t100\t401\t100\t401\t1\t100\t401\n";
    /// let mut reader = strtquant::annotation::Reader::new(&data[..]);
    ///
    /// let features = reader.features().collect::<Result<Vec<_>, _>>()?;
    /// assert_eq!(features.len(), 1);
    /// assert_eq!(features[0].name(), "Actb");
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn features(&mut self) -> impl Iterator<Item = Result<Feature, Error>> + '_ {
        self.numbered_records().map(|result| {
            result.and_then(|(line, record)| {
                Feature::try_from(record).map_err(|err| Error::Record(err, line))
            })
        })
    }

    /// Returns an iterator over the records paired with their line numbers.
    fn numbered_records(&mut self) -> impl Iterator<Item = Result<(usize, Record), Error>> + '_ {
        let mut buffer = String::new();
        let mut line = 0;

        iter::from_fn(move || loop {
            match self.read_line_raw(&mut buffer) {
                Ok(0) => return None,
                Ok(_) => {
                    line += 1;

                    if buffer.is_empty() || buffer.starts_with(COMMENT_PREFIX) {
                        continue;
                    }

                    return Some(
                        buffer
                            .parse::<Record>()
                            .map(|record| (line, record))
                            .map_err(|err| Error::Record(record::Error::Parse(err), line)),
                    );
                }
                Err(err) => return Some(Err(Error::Io(err))),
            }
        })
    }
}

impl<T> From<T> for Reader<T>
where
    T: BufRead,
{
    fn from(inner: T) -> Self {
        Self(inner)
    }
}

/// Reads a line from a buffered reader, stripping the line terminator.
fn read_line<T>(reader: &mut T, buffer: &mut String) -> io::Result<usize>
where
    T: BufRead,
{
    buffer.clear();

    match reader.read_line(buffer) {
        Ok(0) => Ok(0),
        Ok(n) => {
            if buffer.ends_with(NEW_LINE) {
                buffer.pop();

                if buffer.ends_with(CARRIAGE_RETURN) {
                    buffer.pop();
                }
            }

            Ok(n)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use flate2::write::GzEncoder;
    use flate2::Compression;

    use super::*;

    const DATA: &[u8] = b"#locus\tname\n\
        Actb\tActb\tchr5\t-\t100\t401\t100\t401\t2\t100,300,\t201,401,\r\n\
        \n\
        r_L1\tr_L1\tchr5\t.\t150\t161\t150\t161\t1\t150,\t161,\n";

    #[test]
    fn test_read_line() {
        let data = b"hello\r\nworld!";
        let mut cursor = io::Cursor::new(data);

        let mut buffer = String::new();
        let len = read_line(&mut cursor, &mut buffer).unwrap();
        assert_eq!(buffer, "hello");
        assert_eq!(len, 7);

        let len = read_line(&mut cursor, &mut buffer).unwrap();
        assert_eq!(buffer, "world!");
        assert_eq!(len, 6);
    }

    #[test]
    fn test_features() -> Result<(), Box<dyn std::error::Error>> {
        let mut reader = Reader::new(DATA);
        let features = reader.features().collect::<Result<Vec<_>, _>>()?;

        assert_eq!(features.len(), 2);
        assert_eq!(features[0].exons().len(), 2);
        assert!(features[1].is_repeat());

        Ok(())
    }

    #[test]
    fn test_error_reports_line_number() {
        let data = b"#header\nActb\tActb\tchr5\n";
        let mut reader = Reader::new(&data[..]);

        let err = reader.records().next().unwrap().unwrap_err();
        assert_eq!(
            err.to_string(),
            "record error on line 2: parse error: invalid number of fields in record: expected \
             11 fields, found 3 fields"
        );
    }

    #[test]
    fn test_gzipped_file() -> Result<(), Box<dyn std::error::Error>> {
        let path = std::env::temp_dir().join(format!("strtquant-{}.refflat.gz", std::process::id()));

        let mut encoder = GzEncoder::new(File::create(&path)?, Compression::default());
        encoder.write_all(DATA)?;
        encoder.finish()?;

        let mut reader = Reader::from_path(&path)?;
        let features = reader.features().collect::<Result<Vec<_>, _>>()?;
        std::fs::remove_file(&path)?;

        assert_eq!(features.len(), 2);
        Ok(())
    }
}

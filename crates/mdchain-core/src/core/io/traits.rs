use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Common reading interface for structure file formats.
pub trait StructureFile {
    /// The parsed representation of one file.
    type Output;

    /// The error type for parsing and I/O failures.
    type Error: Error + From<io::Error>;

    /// Parses a structure from a buffered reader.
    ///
    /// # Errors
    ///
    /// Returns an error if a record is malformed or the reader fails.
    fn read_from(reader: &mut impl BufRead) -> Result<Self::Output, Self::Error>;

    /// Opens `path` and parses it with [`Self::read_from`].
    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Self::Output, Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }
}

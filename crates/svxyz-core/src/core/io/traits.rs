use crate::core::models::frame::Frame;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Defines the interface for formats that frames can be read from.
///
/// Implementors parse every frame contained in the stream; trajectory formats yield many
/// frames, single-structure formats exactly one.
pub trait TrajectoryReader {
    /// The error type for parse and I/O failures.
    type Error: Error + From<io::Error>;

    /// Reads all frames from a buffered reader.
    ///
    /// # Errors
    ///
    /// Returns an error if the content is malformed or the reader fails.
    fn read_frames(reader: &mut impl BufRead) -> Result<Vec<Frame>, Self::Error>;

    /// Reads all frames from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or parsing fails.
    fn read_frames_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Frame>, Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_frames(&mut reader)
    }
}

/// Defines the interface for formats that frames can be written to.
pub trait TrajectoryWriter {
    /// The error type for serialisation and I/O failures.
    type Error: Error + From<io::Error>;

    /// Whether the format can hold more than one frame per file.
    const MULTI_FRAME: bool;

    /// Writes frames to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if a frame cannot be represented in the format or writing fails.
    fn write_frames(frames: &[Frame], writer: &mut impl Write) -> Result<(), Self::Error>;

    /// Writes frames to a file path, creating or truncating it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or writing fails.
    fn write_frames_to_path<P: AsRef<Path>>(frames: &[Frame], path: P) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_frames(frames, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

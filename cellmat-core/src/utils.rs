use std::ffi::OsStr;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;

fn is_gzipped(path: &Path) -> bool {
    path.extension() == Some(OsStr::new("gz"))
}

///
/// Get a reader for either a gzip'd or non-gzip'd file.
///
/// # Arguments
///
/// - path: path to the file to read
///
pub fn get_dynamic_reader(path: &Path) -> io::Result<BufReader<Box<dyn Read>>> {
    let file = File::open(path)?;
    let file: Box<dyn Read> = match is_gzipped(path) {
        true => Box::new(MultiGzDecoder::new(file)),
        false => Box::new(file),
    };

    Ok(BufReader::new(file))
}

/// A buffered file writer that gzips its output when the path ends in `.gz`.
pub enum DynamicWriter {
    Plain(BufWriter<File>),
    Gzip(BufWriter<GzEncoder<File>>),
}

impl Write for DynamicWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            DynamicWriter::Plain(writer) => writer.write(buf),
            DynamicWriter::Gzip(writer) => writer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            DynamicWriter::Plain(writer) => writer.flush(),
            DynamicWriter::Gzip(writer) => writer.flush(),
        }
    }
}

impl DynamicWriter {
    /// Flush buffered output and, for gzip, write the trailer. Errors are reported here
    /// rather than lost on drop.
    pub fn finish(self) -> io::Result<()> {
        match self {
            DynamicWriter::Plain(mut writer) => writer.flush(),
            DynamicWriter::Gzip(writer) => {
                let encoder = writer.into_inner().map_err(|e| e.into_error())?;
                encoder.finish()?;
                Ok(())
            }
        }
    }
}

///
/// Get a writer that gzips its output if `path` ends in `.gz`.
///
/// Call [`DynamicWriter::finish`] when done so a gzip stream is completed.
///
pub fn get_dynamic_writer(path: &Path) -> io::Result<DynamicWriter> {
    let file = File::create(path)?;
    Ok(match is_gzipped(path) {
        true => DynamicWriter::Gzip(BufWriter::new(GzEncoder::new(file, Compression::default()))),
        false => DynamicWriter::Plain(BufWriter::new(file)),
    })
}

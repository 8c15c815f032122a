//! # Module for File IO
//!
//! Opening (possibly compressed) input files and parsing DIMACS CNF/WCNF instances.

use std::{
    fs::File,
    io::{self, BufReader},
    path::Path,
};

pub mod dimacs;

/// Opens a reader for the file at Path.
/// With feature `compression` supports bzip2, gzip and xz compression.
///
/// # Errors
///
/// If the file cannot be opened.
pub fn open_compressed_uncompressed_read<P: AsRef<Path>>(
    path: P,
) -> Result<Box<dyn io::BufRead>, io::Error> {
    let path = path.as_ref();
    let raw_reader = File::open(path)?;
    #[cfg(feature = "compression")]
    if let Some(ext) = path.extension() {
        if ext.eq_ignore_ascii_case(std::ffi::OsStr::new("bz2")) {
            return Ok(Box::new(BufReader::new(bzip2::read::BzDecoder::new(
                raw_reader,
            ))));
        }
        if ext.eq_ignore_ascii_case(std::ffi::OsStr::new("gz")) {
            return Ok(Box::new(BufReader::new(flate2::read::GzDecoder::new(
                raw_reader,
            ))));
        }
        if ext.eq_ignore_ascii_case(std::ffi::OsStr::new("xz")) {
            return Ok(Box::new(BufReader::new(xz2::read::XzDecoder::new(
                raw_reader,
            ))));
        }
    }
    Ok(Box::new(BufReader::new(raw_reader)))
}

//! File input and output helpers for pipeline data.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

pub mod off;
pub mod point_cloud;

pub use off::write_off;
pub use point_cloud::read_point_cloud;

/// Reads a file to string.
pub fn read_to_string(path: impl AsRef<Path>) -> io::Result<String> {
    let mut buffer = String::new();
    File::open(path)?.read_to_string(&mut buffer)?;
    Ok(buffer)
}

/// Reads all lines of a text file.
pub fn read_lines(path: impl AsRef<Path>) -> io::Result<Vec<String>> {
    BufReader::new(File::open(path)?).lines().collect()
}

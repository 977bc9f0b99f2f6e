//! Compression of backup files

use crate::core::config::ConfigError;
use bzip2::write::BzEncoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, Write};
use std::str::FromStr;
use xz2::write::XzEncoder;

/// Compression algorithm applied to backup output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    Gzip,
    /// Written as `.xz` containers, accepts both `lzma` and `xz`
    Lzma,
    Bz2,
    #[default]
    Plain,
}

impl Compression {
    /// File extension appended after the provider's extension
    pub fn file_extension(&self) -> &'static str {
        match self {
            Compression::Gzip => ".gz",
            Compression::Lzma => ".xz",
            Compression::Bz2 => ".bz2",
            Compression::Plain => "",
        }
    }

    /// Wrap a file in the matching encoder
    pub fn writer(&self, file: File) -> CompressedWriter {
        match self {
            Compression::Gzip => {
                CompressedWriter::Gzip(GzEncoder::new(file, flate2::Compression::default()))
            }
            Compression::Lzma => CompressedWriter::Xz(XzEncoder::new(file, 6)),
            Compression::Bz2 => {
                CompressedWriter::Bz2(BzEncoder::new(file, bzip2::Compression::default()))
            }
            Compression::Plain => CompressedWriter::Plain(file),
        }
    }
}

impl FromStr for Compression {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "gzip" => Ok(Compression::Gzip),
            "lzma" | "xz" => Ok(Compression::Lzma),
            "bz2" => Ok(Compression::Bz2),
            "plain" => Ok(Compression::Plain),
            other => Err(ConfigError::UnknownCompression(other.to_string())),
        }
    }
}

impl std::fmt::Display for Compression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Compression::Gzip => "gzip",
            Compression::Lzma => "lzma",
            Compression::Bz2 => "bz2",
            Compression::Plain => "plain",
        };
        f.write_str(name)
    }
}

/// A file writer that compresses on the way through.
///
/// Encoders only emit their trailer on [`CompressedWriter::finish`]; dropping
/// the writer without finishing leaves a truncated stream behind.
pub enum CompressedWriter {
    Gzip(GzEncoder<File>),
    Xz(XzEncoder<File>),
    Bz2(BzEncoder<File>),
    Plain(File),
}

impl CompressedWriter {
    /// Flush the encoder trailer and hand back the underlying file
    pub fn finish(self) -> io::Result<File> {
        match self {
            CompressedWriter::Gzip(encoder) => encoder.finish(),
            CompressedWriter::Xz(encoder) => encoder.finish(),
            CompressedWriter::Bz2(encoder) => encoder.finish(),
            CompressedWriter::Plain(mut file) => {
                file.flush()?;
                Ok(file)
            }
        }
    }
}

impl Write for CompressedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            CompressedWriter::Gzip(w) => w.write(buf),
            CompressedWriter::Xz(w) => w.write(buf),
            CompressedWriter::Bz2(w) => w.write(buf),
            CompressedWriter::Plain(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            CompressedWriter::Gzip(w) => w.flush(),
            CompressedWriter::Xz(w) => w.flush(),
            CompressedWriter::Bz2(w) => w.flush(),
            CompressedWriter::Plain(w) => w.flush(),
        }
    }
}

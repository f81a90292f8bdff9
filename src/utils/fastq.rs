use seq_io::fastq::{Reader, Record};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use anyhow::{anyhow, Result};
use flate2::read::MultiGzDecoder;
use crate::utils::file::is_gzipped;

pub enum FastqReader {
    Uncompressed(BufReader<File>),
    Gzipped(MultiGzDecoder<File>),
}

impl Read for FastqReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            FastqReader::Uncompressed(r) => r.read(buf),
            FastqReader::Gzipped(r) => r.read(buf),
        }
    }
}

pub fn fastq_reader(path: &Path) -> io::Result<Reader<FastqReader>> {
    let file = File::open(path)?;
    let reader = if is_gzipped(path)? {
        Reader::new(FastqReader::Gzipped(MultiGzDecoder::new(file)))
    } else {
        Reader::new(FastqReader::Uncompressed(BufReader::new(file)))
    };
    Ok(reader)
}

/// Parses the first record of a FASTQ file and returns its read id.
pub fn first_read_id(path: &Path) -> Result<String> {
    let mut reader = fastq_reader(path)?;
    let record = reader
        .next()
        .ok_or_else(|| anyhow!("no FASTQ records"))??;
    let head = std::str::from_utf8(record.head())?;
    let id = head
        .split_whitespace()
        .next()
        .ok_or_else(|| anyhow!("empty read header"))?;
    Ok(id.to_string())
}

/// True when two read ids name the same fragment, ignoring `/1` `/2` mate tags.
pub fn mates_match(id1: &str, id2: &str) -> bool {
    let strip = |id: &str| -> String {
        let id = id.split_whitespace().next().unwrap_or("");
        id.strip_suffix("/1")
            .or_else(|| id.strip_suffix("/2"))
            .unwrap_or(id)
            .to_string()
    };
    strip(id1) == strip(id2)
}

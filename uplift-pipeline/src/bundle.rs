//! Zip packaging of the per-type prediction sheets.

use std::io::{Cursor, Read, Write};

use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{PipelineError, PipelineResult};

/// Pack `(entry name, bytes)` pairs into one deflated zip archive.
pub fn pack(entries: &[(String, Vec<u8>)]) -> PipelineResult<Vec<u8>> {
    let fail = |e: &dyn std::fmt::Display| PipelineError::Bundle(e.to_string());
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        zip.start_file(name.as_str(), options).map_err(|e| fail(&e))?;
        zip.write_all(data).map_err(|e| fail(&e))?;
    }
    let cursor = zip.finish().map_err(|e| fail(&e))?;
    Ok(cursor.into_inner())
}

/// Read every entry of an archive produced by [`pack`], in archive order.
pub fn unpack(bytes: &[u8]) -> PipelineResult<Vec<(String, Vec<u8>)>> {
    let fail = |e: &dyn std::fmt::Display| PipelineError::Bundle(e.to_string());
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(|e| fail(&e))?;
    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut file = archive.by_index(i).map_err(|e| fail(&e))?;
        let mut data = Vec::new();
        file.read_to_end(&mut data).map_err(|e| fail(&e))?;
        entries.push((file.name().to_string(), data));
    }
    Ok(entries)
}

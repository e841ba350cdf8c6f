use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::fs::File;

use crate::notebook::{Notebook, NotebookError};

/// Writes a whole-session snapshot: the notebook serialized through a gzip
/// stream.
pub fn save_notebook(notebook: &Notebook, filename: &str) -> std::io::Result<()> {
    let file = File::create(filename)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut writer = std::io::BufWriter::new(encoder);

    serde_json::to_writer(&mut writer, notebook)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    Ok(())
}

pub fn load_notebook(filename: &str) -> std::io::Result<Notebook> {
    let file = File::open(filename)?;
    let decoder = GzDecoder::new(file);
    let reader = std::io::BufReader::new(decoder);

    let notebook: Notebook = serde_json::from_reader(reader)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    Ok(notebook)
}

/// Exports the live scene as the JSON array of entity records.
pub fn export_records(notebook: &Notebook, filename: &str) -> Result<(), NotebookError> {
    let json = serde_json::to_string_pretty(&notebook.to_records())?;
    std::fs::write(filename, json)?;
    Ok(())
}

/// Imports a JSON array of entity records into an existing scene. The file
/// is parsed in full before anything is created, so a malformed file leaves
/// the scene untouched. Returns the number of entities created.
pub fn import_records(notebook: &mut Notebook, filename: &str) -> Result<usize, NotebookError> {
    let text = std::fs::read_to_string(filename)?;
    notebook.load_records(&text)
}

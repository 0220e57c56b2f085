//! Persisted matrix store.
//!
//! A store is a small binary container with three named fields: `cells`, `features` and
//! `matrix`. The layout is
//!
//! ```text
//! CMTX | version: u8 | n_fields: u32 | n_fields x (name_len: u8, name, offset: u64, len: u64) | data
//! ```
//!
//! with all integers little endian and every field encoded with `bincode`. The field table lets
//! each field be fetched on its own, which is what backs lazy loading in
//! [`CountMatrix`](crate::CountMatrix).
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::debug;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::consts::{CELLS_FIELD, FEATURES_FIELD, MATRIX_FIELD, STORE_HEADER, STORE_VERSION};
use crate::errors::{MatrixError, Result};
use crate::models::{Barcode, FeatureLabel, Label, LabelIndex, MatrixData};

#[derive(Debug, Clone, Copy)]
struct FieldEntry {
    offset: u64,
    len: u64,
}

///
/// An open handle on a persisted matrix store.
///
/// The handle owns the file; dropping it releases the file on every exit path.
///
#[derive(Debug)]
pub struct MatrixStore {
    path: PathBuf,
    reader: BufReader<File>,
    fields: HashMap<String, FieldEntry>,
}

impl MatrixStore {
    ///
    /// Open a store and read its field table. No field data is read.
    ///
    /// # Arguments
    /// - path: path to the store file
    ///
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let mut reader = BufReader::new(file);

        let mut header = [0; 4];
        reader
            .read_exact(&mut header)
            .map_err(|_| MatrixError::InvalidStore(format!("{:?} is too short", path)))?;
        if &header != STORE_HEADER {
            return Err(MatrixError::InvalidStore(format!("bad header in {:?}", path)));
        }

        let version = reader.read_u8()?;
        if version != STORE_VERSION {
            return Err(MatrixError::InvalidStore(format!(
                "unsupported version {} in {:?}",
                version, path
            )));
        }

        let n_fields = reader.read_u32::<LittleEndian>()?;
        let mut fields = HashMap::with_capacity(n_fields as usize);
        for _ in 0..n_fields {
            let name_len = reader.read_u8()? as usize;
            let mut name = vec![0; name_len];
            reader.read_exact(&mut name)?;
            let name = String::from_utf8(name)
                .map_err(|_| MatrixError::InvalidStore("field name is not UTF-8".to_string()))?;
            let offset = reader.read_u64::<LittleEndian>()?;
            let len = reader.read_u64::<LittleEndian>()?;
            fields.insert(name, FieldEntry { offset, len });
        }

        debug!("Opened matrix store {:?} with {} fields", path, fields.len());

        Ok(MatrixStore {
            path,
            reader,
            fields,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn read_cells(&mut self) -> Result<LabelIndex<Barcode>> {
        let labels: Vec<Vec<u8>> = self.read_field(CELLS_FIELD)?;
        LabelIndex::from_bytes(labels)
    }

    pub fn read_features(&mut self) -> Result<LabelIndex<FeatureLabel>> {
        let labels: Vec<Vec<u8>> = self.read_field(FEATURES_FIELD)?;
        LabelIndex::from_bytes(labels)
    }

    pub fn read_matrix(&mut self) -> Result<MatrixData> {
        self.read_field(MATRIX_FIELD)
    }

    fn read_field<T: DeserializeOwned>(&mut self, name: &str) -> Result<T> {
        let entry = *self
            .fields
            .get(name)
            .ok_or_else(|| MatrixError::MissingField(name.to_string()))?;

        debug!("Reading field '{}' from {:?}", name, self.path);
        self.reader.seek(SeekFrom::Start(entry.offset))?;
        let value = bincode::deserialize_from((&mut self.reader).take(entry.len))?;

        Ok(value)
    }
}

impl Drop for MatrixStore {
    fn drop(&mut self) {
        debug!("Released matrix store {:?}", self.path);
    }
}

///
/// Write a matrix and its labels to a store file.
///
/// # Arguments
/// - path: the file to write, replaced if it exists
/// - features: row labels
/// - cells: column labels
/// - matrix: values, of shape `(features.len(), cells.len())`
///
pub fn write_store<P: AsRef<Path>>(
    path: P,
    features: &LabelIndex<FeatureLabel>,
    cells: &LabelIndex<Barcode>,
    matrix: &MatrixData,
) -> Result<()> {
    let expected = (features.len(), cells.len());
    if matrix.shape() != expected {
        return Err(MatrixError::ShapeMismatch {
            expected,
            found: matrix.shape(),
        });
    }

    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let cells: Vec<&[u8]> = cells.iter().map(Label::as_bytes).collect();
    let features: Vec<&[u8]> = features.iter().map(Label::as_bytes).collect();

    let names = [CELLS_FIELD, FEATURES_FIELD, MATRIX_FIELD];
    let sizes = [
        bincode::serialized_size(&cells)?,
        bincode::serialized_size(&features)?,
        bincode::serialized_size(matrix)?,
    ];

    let table_len: u64 = names.iter().map(|name| 1 + name.len() as u64 + 16).sum();
    let mut offset = STORE_HEADER.len() as u64 + 1 + 4 + table_len;

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    writer.write_all(STORE_HEADER)?;
    writer.write_u8(STORE_VERSION)?;
    writer.write_u32::<LittleEndian>(names.len() as u32)?;
    for (name, &len) in names.iter().zip(sizes.iter()) {
        writer.write_u8(name.len() as u8)?;
        writer.write_all(name.as_bytes())?;
        writer.write_u64::<LittleEndian>(offset)?;
        writer.write_u64::<LittleEndian>(len)?;
        offset += len;
    }

    write_field(&mut writer, &cells)?;
    write_field(&mut writer, &features)?;
    write_field(&mut writer, matrix)?;
    writer.flush()?;

    debug!(
        "Wrote matrix store {:?} ({} features x {} cells)",
        path, expected.0, expected.1
    );

    Ok(())
}

fn write_field<W: Write, T: Serialize + ?Sized>(writer: &mut W, value: &T) -> Result<()> {
    bincode::serialize_into(writer, value)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use ndarray::array;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_fields_are_read_independently() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sample.cmx");

        let features = LabelIndex::build(vec!["B".into(), "-".into(), "A".into()]).unwrap();
        let cells = LabelIndex::build(vec!["CCC".into(), "AAA".into()]).unwrap();
        let matrix = MatrixData::Counts(array![[1, 2], [3, 4], [5, 6]]);
        write_store(&path, &features, &cells, &matrix).unwrap();

        let mut store = MatrixStore::open(&path).unwrap();
        assert_eq!(store.read_matrix().unwrap(), matrix);
        assert_eq!(store.read_cells().unwrap(), cells);
        assert_eq!(store.read_features().unwrap(), features);
        assert!(store.read_features().unwrap().labels()[1].is_unknown());
    }

    #[test]
    fn test_rejects_foreign_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("not_a_store.cmx");
        std::fs::write(&path, b"GTOK\x01").unwrap();

        assert!(matches!(
            MatrixStore::open(&path),
            Err(MatrixError::InvalidStore(_))
        ));
    }

    #[test]
    fn test_shape_is_checked_on_write() {
        let dir = tempdir().unwrap();
        let features = LabelIndex::build(vec!["A".into()]).unwrap();
        let cells = LabelIndex::build(vec!["AAA".into()]).unwrap();
        let matrix = MatrixData::zeros(2, 1);

        let result = write_store(dir.path().join("bad.cmx"), &features, &cells, &matrix);
        assert!(matches!(result, Err(MatrixError::ShapeMismatch { .. })));
    }
}

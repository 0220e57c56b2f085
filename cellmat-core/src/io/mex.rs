//! Sparse coordinate ("MEX") bundles.
//!
//! A bundle is a directory holding three gzipped files:
//! - `barcodes.tsv.gz`: one cell label per line, suffixed with `-1`
//! - `features.tsv.gz`: `<id>\t<label>\t<feature type>` per feature
//! - `matrix.mtx.gz`: the values in Matrix Market coordinate format, 1-indexed, with the
//!   producing software recorded in a `metadata_json` comment
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::Path;

use flate2::Compression;
use flate2::write::GzEncoder;
use log::info;
use ndarray::Array2;
use serde::Serialize;
use sprs::{CsMat, TriMat};

use crate::consts::{
    MEX_BARCODE_SUFFIX, MEX_BARCODES, MEX_FEATURES, MEX_FORMAT_VERSION, MEX_MATRIX,
    SOFTWARE_VERSION,
};
use crate::errors::{MatrixError, Result};
use crate::models::{Barcode, Count, CountMatrix, FeatureLabel, Label, LabelIndex, MatrixData};
use crate::utils::get_dynamic_reader;

/// Recorded in the matrix file header comment.
#[derive(Serialize)]
struct BundleMetadata<'a> {
    software_version: &'a str,
    format_version: u32,
}

fn gz_writer(path: &Path) -> Result<BufWriter<GzEncoder<File>>> {
    let file = File::create(path)?;
    Ok(BufWriter::new(GzEncoder::new(file, Compression::default())))
}

fn finish(writer: BufWriter<GzEncoder<File>>) -> Result<()> {
    let encoder = writer.into_inner().map_err(|e| e.into_error())?;
    encoder.finish()?;
    Ok(())
}

fn write_entries<N, W>(writer: &mut W, values: &Array2<N>, field: &str) -> Result<()>
where
    N: Copy + Default + PartialEq + std::ops::Add<Output = N> + std::fmt::Display,
    W: Write,
{
    let mut triplets = TriMat::new(values.dim());
    for ((row, col), &value) in values.indexed_iter() {
        if value != N::default() {
            triplets.add_triplet(row, col, value);
        }
    }
    let sparse: CsMat<N> = triplets.to_csr();

    let metadata = serde_json::to_string(&BundleMetadata {
        software_version: SOFTWARE_VERSION,
        format_version: MEX_FORMAT_VERSION,
    })
    .map_err(|e| MatrixError::InvalidBundle(e.to_string()))?;
    writeln!(writer, "%%MatrixMarket matrix coordinate {} general", field)?;
    writeln!(writer, "%metadata_json: {}", metadata)?;
    writeln!(
        writer,
        "{} {} {}",
        values.nrows(),
        values.ncols(),
        sparse.nnz()
    )?;

    // entries of a CSR matrix come out sorted by (row, col); Matrix Market is 1-indexed
    for (value, (row, col)) in sparse.iter() {
        writeln!(writer, "{} {} {}", row + 1, col + 1, value)?;
    }

    Ok(())
}

///
/// Write a sparse coordinate bundle into a new directory.
///
/// # Arguments
/// - matrix: the matrix to export
/// - dir: the bundle directory; must not exist yet
/// - feature_type: third column of the features file, e.g. `Gene Expression`
/// - feature_ids: ids for the first column of the features file, keyed by feature label.
///   Features without an id get `unknown_<index>`.
///
pub fn write_mex<P: AsRef<Path>>(
    matrix: &mut CountMatrix,
    dir: P,
    feature_type: &str,
    feature_ids: Option<&HashMap<String, String>>,
) -> Result<()> {
    let dir = dir.as_ref();
    std::fs::create_dir(dir).map_err(|e| match e.kind() {
        io::ErrorKind::AlreadyExists => MatrixError::DestinationExists(dir.to_path_buf()),
        _ => MatrixError::Io(e),
    })?;

    // barcodes, raw bytes
    let mut writer = gz_writer(&dir.join(MEX_BARCODES))?;
    for cell in matrix.cells()?.iter() {
        writer.write_all(cell.as_bytes())?;
        writer.write_all(MEX_BARCODE_SUFFIX)?;
        writer.write_all(b"\n")?;
    }
    finish(writer)?;

    // features as text
    let mut writer = gz_writer(&dir.join(MEX_FEATURES))?;
    for (i, feature) in matrix.text_features()?.iter().enumerate() {
        let id = feature_ids
            .and_then(|ids| ids.get(feature))
            .cloned()
            .unwrap_or_else(|| format!("unknown_{:05}", i));
        writeln!(writer, "{}\t{}\t{}", id, feature, feature_type)?;
    }
    finish(writer)?;

    let mut writer = gz_writer(&dir.join(MEX_MATRIX))?;
    match &*matrix.matrix()? {
        MatrixData::Counts(values) => write_entries(&mut writer, values, "integer")?,
        MatrixData::Scaled(values) => write_entries(&mut writer, values, "real")?,
    }
    finish(writer)?;

    info!("Wrote sparse matrix bundle to {:?}", dir);
    Ok(())
}

fn read_lines(path: &Path) -> Result<Vec<Vec<u8>>> {
    let reader = get_dynamic_reader(path)?;
    let mut lines = Vec::new();
    for line in reader.split(b'\n') {
        let mut line = line?;
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        if !line.is_empty() {
            lines.push(line);
        }
    }
    Ok(lines)
}

fn parse<T: std::str::FromStr>(token: Option<&str>, line: &str) -> Result<T> {
    token
        .and_then(|t| t.parse().ok())
        .ok_or_else(|| MatrixError::InvalidBundle(format!("cannot parse line '{}'", line)))
}

fn read_entries<N>(
    lines: &mut dyn Iterator<Item = String>,
    shape: (usize, usize),
    nnz: usize,
) -> Result<Array2<N>>
where
    N: Copy + Default + num_traits::Zero + std::ops::Add<Output = N> + std::str::FromStr,
{
    let mut triplets = TriMat::with_capacity(shape, nnz);
    for line in lines.take(nnz) {
        let mut tokens = line.split_whitespace();
        let row: usize = parse(tokens.next(), &line)?;
        let col: usize = parse(tokens.next(), &line)?;
        let value: N = parse(tokens.next(), &line)?;
        if row == 0 || col == 0 || row > shape.0 || col > shape.1 {
            return Err(MatrixError::InvalidBundle(format!(
                "entry out of bounds: '{}'",
                line
            )));
        }
        triplets.add_triplet(row - 1, col - 1, value);
    }
    if triplets.nnz() != nnz {
        return Err(MatrixError::InvalidBundle(format!(
            "expected {} entries, found {}",
            nnz,
            triplets.nnz()
        )));
    }

    let sparse: CsMat<N> = triplets.to_csr();
    Ok(sparse.to_dense())
}

///
/// Read a sparse coordinate bundle back into a dense, materialized matrix.
///
/// The `-1` suffix is stripped from barcodes and feature labels are taken from the second
/// column of the features file.
///
pub fn read_mex<P: AsRef<Path>>(dir: P) -> Result<CountMatrix> {
    let dir = dir.as_ref();

    let cells: Vec<Barcode> = read_lines(&dir.join(MEX_BARCODES))?
        .into_iter()
        .map(|line| match line.strip_suffix(MEX_BARCODE_SUFFIX) {
            Some(label) => Barcode::from_bytes(label.to_vec()),
            None => Barcode::from_bytes(line),
        })
        .collect();

    let features = read_lines(&dir.join(MEX_FEATURES))?
        .into_iter()
        .map(|line| {
            line.split(|&b| b == b'\t')
                .nth(1)
                .map(|label| FeatureLabel::from_bytes(label.to_vec()))
                .ok_or_else(|| {
                    MatrixError::InvalidBundle(format!(
                        "feature line without label: '{}'",
                        String::from_utf8_lossy(&line)
                    ))
                })
        })
        .collect::<Result<Vec<_>>>()?;

    let reader = get_dynamic_reader(&dir.join(MEX_MATRIX))?;
    let mut lines = reader.lines().map_while(|line| line.ok());

    let header = lines
        .next()
        .ok_or_else(|| MatrixError::InvalidBundle("empty matrix file".to_string()))?;
    if !header.starts_with("%%MatrixMarket matrix coordinate") {
        return Err(MatrixError::InvalidBundle(format!(
            "unsupported header '{}'",
            header
        )));
    }
    let integer = header.contains(" integer ");

    let mut lines = lines.filter(|line| !line.starts_with('%') && !line.trim().is_empty());
    let size = lines
        .next()
        .ok_or_else(|| MatrixError::InvalidBundle("missing size line".to_string()))?;
    let mut tokens = size.split_whitespace();
    let rows: usize = parse(tokens.next(), &size)?;
    let cols: usize = parse(tokens.next(), &size)?;
    let nnz: usize = parse(tokens.next(), &size)?;

    if rows != features.len() || cols != cells.len() {
        return Err(MatrixError::ShapeMismatch {
            expected: (features.len(), cells.len()),
            found: (rows, cols),
        });
    }

    let values = if integer {
        MatrixData::Counts(read_entries::<Count>(&mut lines, (rows, cols), nnz)?)
    } else {
        MatrixData::Scaled(read_entries::<f64>(&mut lines, (rows, cols), nnz)?)
    };

    CountMatrix::new(
        values,
        LabelIndex::build(features)?,
        LabelIndex::build(cells)?,
    )
}

impl CountMatrix {
    /// Export to a sparse coordinate bundle. See [`write_mex`].
    pub fn to_mex<P: AsRef<Path>>(
        &mut self,
        dir: P,
        feature_type: &str,
        feature_ids: Option<&HashMap<String, String>>,
    ) -> Result<()> {
        write_mex(self, dir, feature_type, feature_ids)
    }
}

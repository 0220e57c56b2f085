use std::path::PathBuf;

use ndarray::{Array2, array};
use rstest::*;
use tempfile::{TempDir, tempdir};

use cellmat_core::io::read_mex;
use cellmat_core::{
    Barcode, CountMatrix, FeatureLabel, LabelIndex, MatrixData, MatrixError, SkewReport,
};

fn features(labels: &[&str]) -> LabelIndex<FeatureLabel> {
    LabelIndex::build(labels.iter().map(|&l| l.into()).collect()).unwrap()
}

fn cells(labels: &[&str]) -> LabelIndex<Barcode> {
    LabelIndex::build(labels.iter().map(|&l| l.into()).collect()).unwrap()
}

fn counts(mut matrix: CountMatrix) -> Array2<u32> {
    matrix.matrix().unwrap().as_counts().unwrap().clone()
}

#[fixture]
fn expression() -> CountMatrix {
    // 5 features x 4 cells
    CountMatrix::new(
        MatrixData::Counts(array![
            [1, 0, 2, 0],
            [0, 0, 3, 0],
            [4, 1, 1, 0],
            [0, 0, 0, 7],
            [2, 8, 0, 1],
        ]),
        features(&["ACTB", "-", "MT-CO1", "MT-ND4", "GAPDH"]),
        cells(&["AAA", "CCC", "GGG", "TTT"]),
    )
    .unwrap()
}

#[fixture]
fn stored(mut expression: CountMatrix) -> (TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("expression.cmx");
    expression.to_store(&path).unwrap();
    (dir, path)
}

mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[rstest]
    fn test_store_round_trip(stored: (TempDir, PathBuf), mut expression: CountMatrix) {
        let (_dir, path) = stored;
        let mut loaded = CountMatrix::from_store(&path, true).unwrap();

        assert_eq!(*loaded.features().unwrap(), *expression.features().unwrap());
        assert_eq!(*loaded.cells().unwrap(), *expression.cells().unwrap());
        assert_eq!(*loaded.matrix().unwrap(), *expression.matrix().unwrap());
    }

    #[rstest]
    #[case(true)]
    #[case(false)]
    fn test_store_backed_access(stored: (TempDir, PathBuf), #[case] cache: bool) {
        let (_dir, path) = stored;
        let mut matrix = CountMatrix::from_store(&path, cache).unwrap();

        assert!(matrix.is_store_backed());
        assert_eq!(matrix.shape().unwrap(), (5, 4));
        assert_eq!(matrix.total_counts().unwrap(), 30.0);
        // repeated access gives the same answer whether or not it was cached
        assert_eq!(matrix.shape().unwrap(), (5, 4));
    }

    #[rstest]
    fn test_closed_store_keeps_only_cached_fields(stored: (TempDir, PathBuf)) {
        let (_dir, path) = stored;
        let mut matrix = CountMatrix::from_store(&path, true).unwrap();
        let n_cells = matrix.cells().unwrap().len();

        matrix.close();

        assert!(!matrix.is_store_backed());
        assert_eq!(matrix.cells().unwrap().len(), n_cells);
        assert!(matches!(
            matrix.matrix(),
            Err(MatrixError::Uninitialized("matrix"))
        ));
    }

    #[rstest]
    fn test_uncached_store_is_uninitialized_after_close(stored: (TempDir, PathBuf)) {
        let (_dir, path) = stored;
        let mut matrix = CountMatrix::from_store(&path, false).unwrap();
        matrix.features().unwrap();

        matrix.close();

        assert!(matches!(
            matrix.features(),
            Err(MatrixError::Uninitialized("features"))
        ));
    }

    #[rstest]
    fn test_default_matrix_is_uninitialized() {
        let mut matrix = CountMatrix::default();
        assert!(matches!(matrix.cells(), Err(MatrixError::Uninitialized(_))));
        assert!(matches!(matrix.remove_cells(1), Err(MatrixError::Uninitialized(_))));
    }

    #[rstest]
    fn test_shape_is_validated() {
        let result = CountMatrix::new(
            MatrixData::zeros(2, 2),
            features(&["A", "B", "C"]),
            cells(&["X", "Y"]),
        );
        assert!(matches!(result, Err(MatrixError::ShapeMismatch { .. })));
    }

    #[rstest]
    fn test_zeros_are_allocated_on_access() {
        let mut matrix = CountMatrix::zeros(features(&["A", "B"]), cells(&["X"]));
        assert!(!matrix.is_materialized());
        assert_eq!(counts(matrix), array![[0u32], [0]]);
    }

    #[rstest]
    fn test_mean_expression(mut expression: CountMatrix) {
        let means = expression.mean_expression().unwrap();
        assert_eq!(means.to_vec(), vec![7.0 / 5.0, 9.0 / 5.0, 6.0 / 5.0, 8.0 / 5.0]);
    }

    #[rstest]
    fn test_remove_features(mut expression: CountMatrix) {
        expression.remove_features(2).unwrap();

        assert_eq!(
            expression.text_features().unwrap(),
            vec!["ACTB", "MT-CO1", "GAPDH"]
        );
        assert_eq!(
            counts(expression),
            array![[1u32, 0, 2, 0], [4, 1, 1, 0], [2, 8, 0, 1]]
        );
    }

    #[rstest]
    fn test_remove_cells(mut expression: CountMatrix) {
        expression.remove_cells(3).unwrap();

        assert_eq!(expression.text_cells().unwrap(), vec!["AAA", "GGG"]);
        assert_eq!(
            counts(expression),
            array![[1u32, 2], [0, 3], [4, 1], [0, 0], [2, 0]]
        );
    }

    #[rstest]
    fn test_thresholds_are_monotonic() {
        let mut previous_features = usize::MAX;
        let mut previous_cells = usize::MAX;

        for threshold in 0..6 {
            let mut by_features = expression();
            let n_features = by_features.remove_features(threshold).unwrap().shape().unwrap().0;
            assert!(n_features <= previous_features);
            previous_features = n_features;

            let mut by_cells = expression();
            let n_cells = by_cells.remove_cells(threshold).unwrap().shape().unwrap().1;
            assert!(n_cells <= previous_cells);
            previous_cells = n_cells;
        }
    }

    #[rstest]
    fn test_dual_filter_uses_original_counts(mut expression: CountMatrix) {
        expression.remove_cells_and_features(3, 2).unwrap();

        // cells with >= 3 features: AAA, GGG; features in >= 2 cells: ACTB, MT-CO1, GAPDH
        assert_eq!(expression.text_cells().unwrap(), vec!["AAA", "GGG"]);
        assert_eq!(
            expression.text_features().unwrap(),
            vec!["ACTB", "MT-CO1", "GAPDH"]
        );
        assert_eq!(counts(expression), array![[1u32, 2], [4, 1], [2, 0]]);
    }

    #[rstest]
    fn test_dual_filter_differs_from_sequential() {
        let mut sequential = expression();
        sequential.remove_cells(3).unwrap().remove_features(2).unwrap();

        let mut simultaneous = expression();
        simultaneous.remove_cells_and_features(3, 2).unwrap();

        // GAPDH only survives the simultaneous filter
        assert_eq!(sequential.text_features().unwrap(), vec!["ACTB", "MT-CO1"]);
        assert_eq!(simultaneous.shape().unwrap(), (3, 2));
    }

    #[rstest]
    fn test_dual_filter_is_order_independent() {
        // the masks do not depend on each other, so building the result from either mask first
        // gives the same matrix
        let mut a = expression();
        a.remove_cells_and_features(2, 2).unwrap();

        let mut reference = expression();
        let keep_cells: Vec<usize> = reference
            .matrix()
            .unwrap()
            .nonzero_per_col()
            .iter()
            .enumerate()
            .filter(|(_, n)| **n >= 2)
            .map(|(i, _)| i)
            .collect();
        let keep_features: Vec<usize> = reference
            .matrix()
            .unwrap()
            .nonzero_per_row()
            .iter()
            .enumerate()
            .filter(|(_, n)| **n >= 2)
            .map(|(i, _)| i)
            .collect();
        let values = reference.matrix().unwrap().into_owned();
        let cells_first = values
            .select(ndarray::Axis(1), &keep_cells)
            .select(ndarray::Axis(0), &keep_features);
        let features_first = values
            .select(ndarray::Axis(0), &keep_features)
            .select(ndarray::Axis(1), &keep_cells);

        assert_eq!(cells_first, features_first);
        assert_eq!(*a.matrix().unwrap(), cells_first);
    }

    #[rstest]
    fn test_find_features(mut expression: CountMatrix) {
        assert_eq!(expression.find_features(&["MT-"], false).unwrap(), vec![2, 3]);
        assert_eq!(
            expression.find_features(&["MT-CO", "GAP"], false).unwrap(),
            vec![2, 4]
        );
        assert_eq!(
            expression.find_features(&["MT-"], true).unwrap(),
            vec![0, 1, 4]
        );
    }

    #[rstest]
    fn test_remove_unknown(mut expression: CountMatrix) {
        expression.remove_unknown().unwrap();

        let features = expression.features().unwrap().into_owned();
        assert_eq!(features.len(), 4);
        assert!(!features.contains(&FeatureLabel::Unknown));
        assert_eq!(features.position_of(&"MT-CO1".into()), Some(1));
    }

    #[rstest]
    fn test_remove_skewed_cells_with_report(mut expression: CountMatrix) {
        let dir = tempdir().unwrap();
        let report = dir.path().join("mito.tsv");

        expression
            .remove_skewed_cells(
                0.5,
                &["MT-"],
                Some(SkewReport {
                    path: &report,
                    label: "mito_pct",
                }),
            )
            .unwrap();

        // mito fractions: AAA 4/7, CCC 1/9, GGG 1/6, TTT 7/8
        assert_eq!(expression.text_cells().unwrap(), vec!["CCC", "GGG"]);

        let content = std::fs::read_to_string(&report).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "CB\tmito_pct");
        assert_eq!(lines.len(), 5);
        assert!(lines[4].starts_with("TTT\t87.5"));
    }

    #[rstest]
    fn test_normalize(mut expression: CountMatrix) {
        expression.normalize(100.0).unwrap();

        let matrix = expression.matrix().unwrap();
        assert!(!matrix.is_counts());
        for total in matrix.column_sums() {
            assert!((total - 100.0).abs() < 1e-9);
        }
    }

    #[rstest]
    fn test_normalize_rejects_empty_cells() {
        let mut matrix = CountMatrix::new(
            MatrixData::Counts(array![[1, 0], [2, 0]]),
            features(&["A", "B"]),
            cells(&["X", "Y"]),
        )
        .unwrap();

        assert!(matches!(
            matrix.normalize(10.0),
            Err(MatrixError::DegenerateNormalization { cells: 1 })
        ));
        assert!(matrix.matrix().unwrap().is_counts());
    }

    #[rstest]
    fn test_log_transform() {
        let mut matrix = CountMatrix::new(
            MatrixData::Counts(array![[0, 9]]),
            features(&["A"]),
            cells(&["X", "Y"]),
        )
        .unwrap();

        matrix.log_transform().unwrap();

        let values = matrix.matrix().unwrap().to_scaled();
        assert!((values[[0, 0]] - 0.0).abs() < 1e-12);
        assert!((values[[0, 1]] - 1.0).abs() < 1e-12);
    }

    #[rstest]
    fn test_combine_aligns_by_label() {
        let mut full = CountMatrix::zeros(features(&["A", "B", "C"]), cells(&["X", "Y", "Z"]));
        let mut part = CountMatrix::new(
            MatrixData::Counts(array![[1, 2], [3, 4]]),
            features(&["C", "A"]),
            cells(&["Z", "X"]),
        )
        .unwrap();

        full.combine(&mut part).unwrap();
        full.combine(&mut part).unwrap();

        assert_eq!(counts(full), array![[8u32, 0, 6], [0, 0, 0], [4, 0, 2]]);
    }

    #[rstest]
    fn test_combine_rejects_unknown_labels() {
        let mut full = CountMatrix::zeros(features(&["A", "B"]), cells(&["X"]));
        let mut part = CountMatrix::new(
            MatrixData::Counts(array![[1], [5]]),
            features(&["A", "Q"]),
            cells(&["X"]),
        )
        .unwrap();

        match full.combine(&mut part) {
            Err(MatrixError::LabelMismatch { axis, label }) => {
                assert_eq!(axis, "feature");
                assert_eq!(label, "Q");
            }
            other => panic!("expected label mismatch, got {:?}", other.map(|_| ())),
        }
        assert_eq!(counts(full), array![[0u32], [0]]);
    }

    #[rstest]
    fn test_sparse_bundle_round_trip(mut expression: CountMatrix) {
        let dir = tempdir().unwrap();
        let bundle = dir.path().join("mex");

        expression.to_mex(&bundle, "Gene Expression", None).unwrap();
        let mut restored = read_mex(&bundle).unwrap();

        assert_eq!(*restored.matrix().unwrap(), *expression.matrix().unwrap());
        assert_eq!(*restored.cells().unwrap(), *expression.cells().unwrap());
        assert_eq!(*restored.features().unwrap(), *expression.features().unwrap());
    }

    #[rstest]
    fn test_tsv_export(mut expression: CountMatrix) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("expression.tsv");

        expression.to_tsv(&path, "gene").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "gene\tAAA\tCCC\tGGG\tTTT");
        assert_eq!(lines[2], "-\t0\t0\t3\t0");
        assert_eq!(lines.len(), 6);
    }

    #[rstest]
    fn test_remove_skewed_cells_drops_empty_cells() {
        let mut matrix = CountMatrix::new(
            MatrixData::Counts(array![[1, 0], [1, 0]]),
            features(&["ACTB", "MT-CO1"]),
            cells(&["X", "Y"]),
        )
        .unwrap();

        matrix.remove_skewed_cells(0.9, &["MT-"], None).unwrap();

        assert_eq!(matrix.text_cells().unwrap(), vec!["X"]);
        assert_eq!(counts(matrix), array![[1u32], [1]]);
    }

    #[rstest]
    fn test_scaled_values_survive_the_store(mut expression: CountMatrix) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("normalized.cmx");
        expression.normalize(100.0).unwrap().log_transform().unwrap();
        expression.to_store(&path).unwrap();

        let mut loaded = CountMatrix::from_store(&path, false).unwrap();
        let values = loaded.matrix().unwrap().into_owned();

        assert!(!values.is_counts());
        assert_eq!(values, *expression.matrix().unwrap());
    }

    #[rstest]
    fn test_scaled_values_survive_the_sparse_bundle(mut expression: CountMatrix) {
        let dir = tempdir().unwrap();
        let bundle = dir.path().join("mex");
        expression.normalize(100.0).unwrap();

        expression.to_mex(&bundle, "Gene Expression", None).unwrap();
        let mut restored = read_mex(&bundle).unwrap();

        assert!(!restored.matrix().unwrap().is_counts());
        assert_eq!(*restored.matrix().unwrap(), *expression.matrix().unwrap());
    }
}

use std::cmp::Ordering;
use std::fmt::{self, Debug, Display};
use std::hash::{Hash, Hasher};

use crate::consts::UNKNOWN_FEATURE;

/// An opaque row or column label, compared as raw bytes.
pub trait Label: Ord + Clone + Debug {
    /// Axis name used in error messages.
    const AXIS: &'static str;

    fn as_bytes(&self) -> &[u8];

    fn from_bytes(bytes: Vec<u8>) -> Self;

    /// A lossy UTF-8 copy of the label.
    fn to_text(&self) -> String {
        String::from_utf8_lossy(self.as_bytes()).into_owned()
    }
}

///
/// A row label of the count matrix.
///
/// Reads that could not be assigned to a feature carry the `-` label in tag tables and stores.
/// That marker is parsed into [`FeatureLabel::Unknown`] at the boundary so it can never be
/// confused with a real feature name inside the crate. Comparison, ordering and hashing go
/// through the label bytes, so the marker sorts like `-` among named features.
///
#[derive(Clone)]
pub enum FeatureLabel {
    Unknown,
    Named(Vec<u8>),
}

impl FeatureLabel {
    pub fn is_unknown(&self) -> bool {
        matches!(self, FeatureLabel::Unknown)
    }
}

impl Label for FeatureLabel {
    const AXIS: &'static str = "feature";

    fn as_bytes(&self) -> &[u8] {
        match self {
            FeatureLabel::Unknown => UNKNOWN_FEATURE,
            FeatureLabel::Named(name) => name,
        }
    }

    fn from_bytes(bytes: Vec<u8>) -> Self {
        if bytes == UNKNOWN_FEATURE {
            FeatureLabel::Unknown
        } else {
            FeatureLabel::Named(bytes)
        }
    }
}

impl From<&str> for FeatureLabel {
    fn from(value: &str) -> Self {
        FeatureLabel::from_bytes(value.as_bytes().to_vec())
    }
}

impl PartialEq for FeatureLabel {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for FeatureLabel {}

impl PartialOrd for FeatureLabel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FeatureLabel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_bytes().cmp(other.as_bytes())
    }
}

impl Hash for FeatureLabel {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_bytes().hash(state);
    }
}

impl Debug for FeatureLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureLabel::Unknown => write!(f, "Unknown"),
            FeatureLabel::Named(_) => write!(f, "Named({:?})", self.to_text()),
        }
    }
}

impl Display for FeatureLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_text())
    }
}

/// A column label of the count matrix: the cell barcode.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Barcode(pub Vec<u8>);

impl Label for Barcode {
    const AXIS: &'static str = "cell";

    fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    fn from_bytes(bytes: Vec<u8>) -> Self {
        Barcode(bytes)
    }
}

impl From<&str> for Barcode {
    fn from(value: &str) -> Self {
        Barcode(value.as_bytes().to_vec())
    }
}

impl Debug for Barcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Barcode({:?})", self.to_text())
    }
}

impl Display for Barcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_text())
    }
}

//! Fault-tolerant field extraction from profile datasets.
//!
//! Extraction failures never propagate past this module: a field that is
//! absent, mis-typed, 0-dimensional, undersized or length-mismatched
//! degrades to a typed missing marker (NaN for numerics, `'9'` for QC
//! flags, `None` for strings) and is logged at debug level only.

use tracing::debug;

/// QC flag meaning missing / not evaluated.
pub const QC_MISSING: char = '9';

/// A depth-level array extracted for one profile index, always of the
/// caller-supplied reference length.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedLevels {
    pub values: Vec<f64>,
    /// True when the field was unusable and the array is marker-filled.
    pub was_default: bool,
}

/// Read every value of a numeric variable as f64, flattened row-major,
/// together with its dimension lengths.
fn read_all_f64(file: &netcdf::File, name: &str) -> Option<(Vec<f64>, Vec<usize>)> {
    let var = file.variable(name)?;
    let dims: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
    match var.get_values::<f64, _>(..) {
        Ok(values) => Some((values, dims)),
        Err(e) => {
            debug!(field = name, error = %e, "Field not readable as numeric");
            None
        }
    }
}

/// Read every byte of a character variable, together with its dimension
/// names and lengths.
fn read_all_bytes(file: &netcdf::File, name: &str) -> Option<(Vec<u8>, Vec<(String, usize)>)> {
    let var = file.variable(name)?;
    let dims: Vec<(String, usize)> = var
        .dimensions()
        .iter()
        .map(|d| (d.name(), d.len()))
        .collect();
    match var.get_raw_values(..) {
        Ok(buf) => Some((buf, dims)),
        Err(e) => {
            debug!(field = name, error = %e, "Field not readable as bytes");
            None
        }
    }
}

/// Decode NetCDF byte strings, tolerating non-UTF-8 content (latin-1
/// fallback) and trimming NUL padding.
fn decode_bytes(bytes: &[u8]) -> String {
    let s = match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    };
    s.trim_matches(|c: char| c == '\0' || c.is_whitespace())
        .to_string()
}

/// Whether a trailing dimension is a string-length axis rather than a data
/// axis. Argo files name these `STRING2`..`STRING256` and `DATE_TIME`.
fn is_string_axis(dim_name: &str) -> bool {
    dim_name.starts_with("STRING") || dim_name == "DATE_TIME"
}

/// Extract a numeric scalar for one profile index.
///
/// 0-dimensional variables return their single value regardless of index
/// (single-profile file convention); an out-of-range index or unusable
/// field yields `None`.
pub fn scalar_f64(file: &netcdf::File, name: &str, index: usize) -> Option<f64> {
    let (values, dims) = read_all_f64(file, name)?;
    if dims.is_empty() {
        return values.first().copied();
    }
    match values.get(index).copied() {
        Some(v) => Some(v),
        None => {
            debug!(field = name, index = index, "Index out of range");
            None
        }
    }
}

/// Extract a string (or per-profile character) field for one profile index.
///
/// Handles the three layouts seen in the wild: `(N_PROF, STRINGn)` string
/// rows, bare `(STRINGn)` single strings, and `(N_PROF)` one-character
/// fields such as `DATA_MODE`. Empty after trimming decodes to `None`.
pub fn scalar_string(file: &netcdf::File, name: &str, index: usize) -> Option<String> {
    let (buf, dims) = read_all_bytes(file, name)?;

    let decoded = match dims.len() {
        0 => decode_bytes(&buf),
        1 => {
            if is_string_axis(&dims[0].0) {
                decode_bytes(&buf)
            } else {
                // One character per profile.
                let byte = *buf.get(index)?;
                decode_bytes(&[byte])
            }
        }
        _ => {
            let strlen = dims.last().map(|(_, len)| *len)?.max(1);
            let row_count = buf.len() / strlen;
            if index >= row_count {
                debug!(field = name, index = index, "Index out of range");
                return None;
            }
            decode_bytes(&buf[index * strlen..(index + 1) * strlen])
        }
    };

    if decoded.is_empty() {
        None
    } else {
        Some(decoded)
    }
}

/// Read the raw depth-level row for one profile index, without any length
/// guarantee. `None` when the field is absent, unreadable or the index is
/// out of range.
pub fn read_levels(file: &netcdf::File, name: &str, index: usize) -> Option<Vec<f64>> {
    let (values, dims) = read_all_f64(file, name)?;
    match dims.len() {
        // Degenerate and single-profile layouts: the whole variable is the row.
        0 | 1 => Some(values),
        _ => {
            let n_levels = *dims.last()?;
            if n_levels == 0 || index >= dims[0] {
                return None;
            }
            Some(values[index * n_levels..(index + 1) * n_levels].to_vec())
        }
    }
}

/// Extract a numeric depth-level array of exactly `reference_len` values.
///
/// This is the single fallback point for the level-by-level parser: any
/// unusable or length-mismatched field becomes a NaN-filled array of the
/// reference length, so iteration never indexes out of bounds.
pub fn extract_or_default(
    file: &netcdf::File,
    name: &str,
    index: usize,
    reference_len: usize,
) -> ExtractedLevels {
    match read_levels(file, name, index) {
        Some(values) if values.len() == reference_len => ExtractedLevels {
            values,
            was_default: false,
        },
        Some(values) => {
            debug!(
                field = name,
                got = values.len(),
                expected = reference_len,
                "Length mismatch, using missing-marker array"
            );
            ExtractedLevels {
                values: vec![f64::NAN; reference_len],
                was_default: true,
            }
        }
        None => {
            debug!(field = name, "Field unusable, using missing-marker array");
            ExtractedLevels {
                values: vec![f64::NAN; reference_len],
                was_default: true,
            }
        }
    }
}

/// Extract a QC flag array of exactly `reference_len` characters.
///
/// Unusable fields (and unreadable individual flags) become `'9'`.
pub fn extract_qc_or_default(
    file: &netcdf::File,
    name: &str,
    index: usize,
    reference_len: usize,
) -> (Vec<char>, bool) {
    let row = read_qc_levels(file, name, index);
    match row {
        Some(flags) if flags.len() == reference_len => (flags, false),
        _ => {
            debug!(field = name, "QC field unusable, defaulting to '9'");
            (vec![QC_MISSING; reference_len], true)
        }
    }
}

fn read_qc_levels(file: &netcdf::File, name: &str, index: usize) -> Option<Vec<char>> {
    let (buf, dims) = read_all_bytes(file, name)?;

    let row = match dims.len() {
        0 | 1 => buf,
        _ => {
            let n_levels = dims.last().map(|(_, len)| *len)?;
            if n_levels == 0 || index >= dims[0].1 {
                return None;
            }
            buf[index * n_levels..(index + 1) * n_levels].to_vec()
        }
    };

    Some(
        row.into_iter()
            .map(|b| match b {
                0 | b' ' => QC_MISSING,
                other => other as char,
            })
            .collect(),
    )
}

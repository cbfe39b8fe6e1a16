use itertools::Itertools;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::matrix::Matrix;
use crate::libs::fragtree::FragTree;

/// Shortest representation that reads back to `x`, in the layout of Java's
/// `Double.toString`: plain decimals with at least one fractional digit for
/// magnitudes in `[1e-3, 1e7)`, `d.dddE±n` otherwise.
///
/// ```
/// use ftalign::libs::similarity::java_double;
///
/// assert_eq!(java_double(1.0), "1.0");
/// assert_eq!(java_double(0.25), "0.25");
/// assert_eq!(java_double(1.0e-4), "1.0E-4");
/// assert_eq!(java_double(12345678.0), "1.2345678E7");
/// ```
pub fn java_double(x: f64) -> String {
    if x.is_nan() {
        return "NaN".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }

    let abs = x.abs();
    if abs == 0.0 || (1e-3..1e7).contains(&abs) {
        let s = x.to_string();
        if s.contains('.') {
            s
        } else {
            format!("{}.0", s)
        }
    } else {
        let s = format!("{:e}", x);
        match s.split_once('e') {
            Some((mantissa, exp)) if mantissa.contains('.') => format!("{}E{}", mantissa, exp),
            Some((mantissa, exp)) => format!("{}.0E{}", mantissa, exp),
            None => s,
        }
    }
}

/// `x` with exactly `digits` decimals, ties rounded away from zero. Rounding
/// works on the shortest decimal form of `x`, so `0.125` gives `0.13`.
///
/// ```
/// use ftalign::libs::similarity::round_half_up;
///
/// assert_eq!(round_half_up(0.125, 2), "0.13");
/// assert_eq!(round_half_up(-0.125, 2), "-0.13");
/// assert_eq!(round_half_up(2.5, 0), "3");
/// assert_eq!(round_half_up(1.0, 3), "1.000");
/// ```
pub fn round_half_up(x: f64, digits: usize) -> String {
    if !x.is_finite() {
        return java_double(x);
    }

    let plain = x.abs().to_string();
    let (int_part, frac_part) = plain.split_once('.').unwrap_or((plain.as_str(), ""));

    let mut frac: Vec<u8> = frac_part.bytes().collect();
    let round_up = frac.len() > digits && frac[digits] >= b'5';
    frac.resize(digits, b'0');

    let mut number: Vec<u8> = int_part.bytes().chain(frac).collect();
    if round_up {
        let mut pos = number.len();
        loop {
            if pos == 0 {
                number.insert(0, b'1');
                break;
            }
            pos -= 1;
            if number[pos] == b'9' {
                number[pos] = b'0';
            } else {
                number[pos] += 1;
                break;
            }
        }
    }

    let split = number.len() - digits;
    let mut out = String::with_capacity(number.len() + 2);
    if x < 0.0 && number.iter().any(|&d| d != b'0') {
        out.push('-');
    }
    out.extend(number[..split].iter().map(|&d| d as char));
    if digits > 0 {
        out.push('.');
        out.extend(number[split..].iter().map(|&d| d as char));
    }
    out
}

/// Quoted CSV field, inner quotes doubled.
///
/// ```
/// use ftalign::libs::similarity::csv_quote;
///
/// assert_eq!(csv_quote("toluene"), "\"toluene\"");
/// assert_eq!(csv_quote("a,\"b\""), "\"a,\"\"b\"\"\"");
/// ```
pub fn csv_quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// Header of the pairwise CSV layout, see [`csv_row`].
pub const CSV_HEADER: &str = "left,right,depthLeft,depthRight,sizeLeft,sizeRight,score";

/// One pair of trees: quoted names, depths, fragment counts, score.
pub fn csv_row(left: &FragTree, right: &FragTree, score: f64) -> String {
    format!(
        "{},{},{},{},{},{},{}",
        csv_quote(left.name()),
        csv_quote(right.name()),
        left.depth(),
        right.depth(),
        left.len(),
        right.len(),
        score
    )
}

/// Layout of a written matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatrixFormat {
    /// `#name...` header and bare rows, loadable with `numpy.loadtxt`
    pub numpy: bool,
    /// Fixed decimals for the labelled layout
    pub digits: Option<usize>,
}

impl MatrixFormat {
    pub fn extension(&self) -> &'static str {
        if self.numpy {
            "txt"
        } else {
            "tsv"
        }
    }

    fn value(&self, x: f64) -> String {
        match self.digits {
            Some(d) if !self.numpy => round_half_up(x, d),
            _ => java_double(x),
        }
    }
}

/// Writes `matrix` in either layout.
///
/// ```
/// use ftalign::libs::similarity::{write_matrix_to, MatrixFormat};
///
/// let names = vec!["a".to_string(), "b".to_string()];
/// let matrix = vec![vec![1.0, 0.5], vec![0.5, 1.0]];
/// let mut out = Vec::new();
/// write_matrix_to(&mut out, &names, &matrix, MatrixFormat::default()).unwrap();
/// assert_eq!(
///     String::from_utf8(out).unwrap(),
///     "FeatureName\ta\tb\na\t1.0\t0.5\nb\t0.5\t1.0\n"
/// );
/// ```
pub fn write_matrix_to<W: Write>(
    out: &mut W,
    names: &[String],
    matrix: &Matrix,
    format: MatrixFormat,
) -> std::io::Result<()> {
    if format.numpy {
        writeln!(out, "#{}", names.iter().join("\t"))?;
        for row in matrix {
            writeln!(out, "{}", row.iter().map(|&v| format.value(v)).join("\t"))?;
        }
    } else {
        writeln!(out, "FeatureName\t{}", names.iter().join("\t"))?;
        for (name, row) in names.iter().zip(matrix) {
            writeln!(
                out,
                "{}\t{}",
                name,
                row.iter().map(|&v| format.value(v)).join("\t")
            )?;
        }
    }
    Ok(())
}

fn try_write_matrix(
    path: &Path,
    names: &[String],
    matrix: &Matrix,
    format: MatrixFormat,
) -> anyhow::Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let mut writer = crate::writer(&path.to_string_lossy())?;
    write_matrix_to(&mut writer, names, matrix, format)?;
    writer.flush()?;
    Ok(())
}

/// Writes `<dir>/<name>.tsv` (or `.txt`). Failures are logged and `None` is
/// returned, so the remaining matrices can still be written.
pub fn write_matrix(
    dir: &Path,
    name: &str,
    names: &[String],
    matrix: &Matrix,
    format: MatrixFormat,
) -> Option<PathBuf> {
    let path = dir.join(format!("{}.{}", name, format.extension()));
    match try_write_matrix(&path, names, matrix, format) {
        Ok(()) => {
            log::info!("{} written", path.display());
            Some(path)
        }
        Err(e) => {
            log::error!("{} cannot be written: {:#}", path.display(), e);
            None
        }
    }
}

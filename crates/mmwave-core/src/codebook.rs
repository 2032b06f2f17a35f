//! # Beamforming Codebooks
//!
//! A codebook is an ordered list of beams; each beam is a vector of complex
//! antenna weights. Codebooks are stored as plain text, one beam per line,
//! with comma-separated complex tokens:
//!
//! ```text
//! 0.125000+0.000000i,0.088388-0.088388i,-0.125000i,0.5
//! ```
//!
//! Each token is one of
//!
//! | Form                   | Example   | Value     |
//! |------------------------|-----------|-----------|
//! | `<real><sign><imag>i`  | `3+4i`    | (3, 4)    |
//! | `<real>`               | `7`       | (7, 0)    |
//! | `<imag>i`              | `5i`      | (0, 5)    |
//!
//! The real/imaginary split is made at the first `+`/`-` after the first
//! character that does not continue an exponent. Tokens outside these forms
//! are rejected instead of guessed at.
//!
//! ## Example
//!
//! ```
//! use mmwave_core::codebook::{parse_weight, Codebook};
//!
//! let w = parse_weight("-2-3i").unwrap();
//! assert_eq!((w.re, w.im), (-2.0, -3.0));
//!
//! let cb = Codebook::parse("1,0\n0.5+0.5i,0.5-0.5i\n").unwrap();
//! assert_eq!(cb.len(), 2);
//! assert_eq!(cb.antenna_count(), Some(2));
//! ```

use std::f64::consts::PI;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use num_complex::Complex64;
use thiserror::Error;

use crate::types::{ComplexWeight, WeightVector};

/// Result type for codebook operations.
pub type CodebookResult<T> = Result<T, CodebookError>;

/// Errors raised while loading a codebook.
#[derive(Debug, Error)]
pub enum CodebookError {
    /// The codebook file could not be opened or read.
    #[error("cannot read codebook {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file contained no beams.
    #[error("codebook contains no beams")]
    EmptyCodebook,

    /// A line parsed to zero weights.
    #[error("line {line}: beam has no weights")]
    EmptyRow { line: usize },

    /// A token is not a number in any accepted form.
    #[error("line {line}: malformed weight {token:?}")]
    MalformedToken { line: usize, token: String },

    /// A token does not match one of the canonical complex forms.
    #[error("line {line}: ambiguous weight {token:?}")]
    AmbiguousToken { line: usize, token: String },
}

/// Errors for a single complex token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WeightParseError {
    #[error("malformed weight {0:?}")]
    Malformed(String),

    #[error("ambiguous weight {0:?}")]
    Ambiguous(String),
}

impl WeightParseError {
    fn at_line(self, line: usize) -> CodebookError {
        match self {
            WeightParseError::Malformed(token) => CodebookError::MalformedToken { line, token },
            WeightParseError::Ambiguous(token) => CodebookError::AmbiguousToken { line, token },
        }
    }
}

/// Parse one complex token.
pub fn parse_weight(token: &str) -> Result<ComplexWeight, WeightParseError> {
    let t = token.trim();
    let malformed = || WeightParseError::Malformed(t.to_string());

    let Some(marker) = t.find('i') else {
        if let Some(re) = parse_finite(t) {
            return Ok(Complex64::new(re, 0.0));
        }
        // `3+4` has a numeric real part followed by a dangling signed term.
        return match split_point(t) {
            Some(k) if parse_finite(&t[..k]).is_some() => {
                Err(WeightParseError::Ambiguous(t.to_string()))
            }
            _ => Err(malformed()),
        };
    };

    // The marker must terminate the token.
    if marker + 1 != t.len() {
        return Err(WeightParseError::Ambiguous(t.to_string()));
    }
    let body = &t[..marker];
    if body.is_empty() {
        return Err(malformed());
    }

    match split_point(body) {
        Some(k) => {
            let re = parse_finite(&body[..k]).ok_or_else(malformed)?;
            let im = parse_finite(&body[k..]).ok_or_else(malformed)?;
            Ok(Complex64::new(re, im))
        }
        None => {
            // A sign inside an imaginary-only token (e.g. `1e-3i`) would have
            // been read as a real part by a stream reader.
            if body.bytes().skip(1).any(|b| b == b'+' || b == b'-') {
                return Err(WeightParseError::Ambiguous(t.to_string()));
            }
            let im = parse_finite(body).ok_or_else(malformed)?;
            Ok(Complex64::new(0.0, im))
        }
    }
}

/// Byte offset of the sign separating real and imaginary parts.
fn split_point(body: &str) -> Option<usize> {
    let bytes = body.as_bytes();
    (1..bytes.len()).find(|&k| {
        matches!(bytes[k], b'+' | b'-') && !matches!(bytes[k - 1], b'e' | b'E')
    })
}

fn parse_finite(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Ordered collection of beams.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Codebook {
    beams: Vec<WeightVector>,
}

impl Codebook {
    /// Wrap already-built beams. No validation is performed.
    pub fn new(beams: Vec<WeightVector>) -> Self {
        Self { beams }
    }

    /// Load a codebook file.
    pub fn load(path: impl AsRef<Path>) -> CodebookResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| CodebookError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let codebook = Self::parse(&text)?;
        tracing::info!(
            path = %path.display(),
            beams = codebook.len(),
            antennas = ?codebook.antenna_count(),
            "Loaded codebook"
        );
        Ok(codebook)
    }

    /// Parse codebook text.
    pub fn parse(text: &str) -> CodebookResult<Self> {
        let mut beams = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            let line_no = idx + 1;
            let mut tokens: Vec<&str> = line.split(',').collect();
            if tokens.len() > 1 && tokens.last().is_some_and(|t| t.trim().is_empty()) {
                tokens.pop();
            }
            if tokens.len() == 1 && tokens[0].trim().is_empty() {
                return Err(CodebookError::EmptyRow { line: line_no });
            }

            let beam = tokens
                .iter()
                .map(|tok| parse_weight(tok).map_err(|e| e.at_line(line_no)))
                .collect::<CodebookResult<WeightVector>>()?;
            beams.push(beam);
        }

        if beams.is_empty() {
            return Err(CodebookError::EmptyCodebook);
        }
        Ok(Self { beams })
    }

    /// DFT codebook for a linear array: `num_elements` orthogonal beams.
    pub fn dft(num_elements: usize) -> Self {
        let n = num_elements as f64;
        let norm = 1.0 / n.sqrt();
        let beams = (0..num_elements)
            .map(|k| {
                (0..num_elements)
                    .map(|m| {
                        let phase = -2.0 * PI * (m * k) as f64 / n;
                        Complex64::from_polar(norm, phase)
                    })
                    .collect()
            })
            .collect();
        Self { beams }
    }

    /// Planar-array codebook built as the Kronecker product of a horizontal
    /// and a vertical linear codebook.
    ///
    /// Beams are ordered vertical-major; element `r * H + c` of each beam is
    /// `vertical[r] * horizontal[c]`.
    pub fn kronecker(horizontal: &Codebook, vertical: &Codebook) -> Self {
        let mut beams = Vec::with_capacity(horizontal.len() * vertical.len());
        for v in &vertical.beams {
            for h in &horizontal.beams {
                let mut beam = Vec::with_capacity(v.len() * h.len());
                for &wv in v {
                    for &wh in h {
                        beam.push(wv * wh);
                    }
                }
                beams.push(beam);
            }
        }
        Self { beams }
    }

    /// Render in the codebook text format.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for beam in &self.beams {
            for (i, w) in beam.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                let _ = write!(out, "{:.6}{:+.6}i", w.re, w.im);
            }
            out.push('\n');
        }
        out
    }

    /// Number of beams.
    #[inline]
    pub fn len(&self) -> usize {
        self.beams.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.beams.is_empty()
    }

    /// Beam at `index`.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&WeightVector> {
        self.beams.get(index)
    }

    /// Iterate over beams in order.
    pub fn iter(&self) -> impl Iterator<Item = &WeightVector> {
        self.beams.iter()
    }

    /// Common beam length, if every beam has the same number of weights.
    pub fn antenna_count(&self) -> Option<usize> {
        let first = self.beams.first()?.len();
        self.beams.iter().all(|b| b.len() == first).then_some(first)
    }
}

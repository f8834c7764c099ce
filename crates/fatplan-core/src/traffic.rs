//! Traffic inputs. A workload is either a list of explicit flow records or a dense host-to-host
//! traffic matrix.

use std::str::FromStr;

use ndarray::Array2;

use crate::ident::HostId;
use crate::units::Nanosecs;

/// The shape of a traffic file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrafficFormat {
    /// One `src dst size start` record per line. Sizes are in bits, start times in seconds.
    FlowList,
    /// One row of byte volumes per source host.
    Matrix,
}

impl TrafficFormat {
    /// The divisor that turns a weighted volume from this format into bytes.
    pub fn size_divisor(&self) -> f64 {
        match self {
            TrafficFormat::FlowList => 8.0,
            TrafficFormat::Matrix => 1.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrafficFormat::FlowList => "flow-list",
            TrafficFormat::Matrix => "matrix",
        }
    }
}

impl FromStr for TrafficFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flow-list" | "flows" => Ok(TrafficFormat::FlowList),
            "matrix" | "tm" => Ok(TrafficFormat::Matrix),
            _ => Err(UnknownFormat(s.to_owned())),
        }
    }
}

impl std::fmt::Display for TrafficFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An unrecognized traffic format name.
#[derive(Debug, thiserror::Error)]
#[error("unknown traffic format `{0}` (expected `flow-list` or `matrix`)")]
pub struct UnknownFormat(String);

/// How malformed numbers in traffic files are handled.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberParsing {
    /// Malformed numbers are errors.
    #[default]
    Strict,
    /// Each field reads the longest number at the front of what is left of the line, so `80.9`
    /// reads as `80` and leaves `.9` for the next field. A field with no number there reads as
    /// zero, as do all fields after it on the same line. Missing fields read as zero and extra
    /// input is ignored.
    Lenient,
}

/// A parsed traffic file.
#[derive(Debug, Clone)]
pub enum Traffic {
    FlowList(Vec<FlowRecord>),
    Matrix(TrafficMatrix),
}

impl Traffic {
    pub fn parse(
        s: &str,
        format: TrafficFormat,
        parsing: NumberParsing,
    ) -> Result<Self, TrafficError> {
        let traffic = match format {
            TrafficFormat::FlowList => Traffic::FlowList(FlowRecord::parse_all(s, parsing)?),
            TrafficFormat::Matrix => Traffic::Matrix(TrafficMatrix::parse(s, parsing)?),
        };
        Ok(traffic)
    }

    pub fn format(&self) -> TrafficFormat {
        match self {
            Traffic::FlowList(_) => TrafficFormat::FlowList,
            Traffic::Matrix(_) => TrafficFormat::Matrix,
        }
    }
}

/// An explicit flow record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FlowRecord {
    pub src: HostId,
    pub dst: HostId,
    /// Flow size in bits.
    pub size: u64,
    pub start: Nanosecs,
}

impl FlowRecord {
    const NR_FIELDS: usize = 4;

    /// Parses a flow list. Each non-blank line holds `src dst size start`, separated by commas or
    /// whitespace.
    pub fn parse_all(s: &str, parsing: NumberParsing) -> Result<Vec<Self>, TrafficError> {
        let mut records = Vec::new();
        for (i, line) in s.lines().enumerate() {
            let fields = fields(line);
            if fields.is_empty() {
                continue;
            }
            let lineno = i + 1;
            let record = match parsing {
                NumberParsing::Strict => Self::parse_strict(&fields, lineno)?,
                NumberParsing::Lenient => Self::parse_lenient(&fields, lineno),
            };
            records.push(record);
        }
        log::info!("read {} flow records", records.len());
        Ok(records)
    }

    fn parse_strict(fields: &[&str], line: usize) -> Result<Self, TrafficError> {
        if fields.len() != Self::NR_FIELDS {
            return Err(TrafficError::WrongNrFields {
                line,
                expected: Self::NR_FIELDS,
                got: fields.len(),
            });
        }
        let invalid = |field, token: &str| TrafficError::InvalidField {
            line,
            field,
            token: token.to_owned(),
        };
        let src = fields[0].parse().map_err(|_| invalid("src", fields[0]))?;
        let dst = fields[1].parse().map_err(|_| invalid("dst", fields[1]))?;
        let size = fields[2].parse().map_err(|_| invalid("size", fields[2]))?;
        let start = fields[3]
            .parse::<f64>()
            .ok()
            .filter(|t| t.is_finite() && *t >= 0.0)
            .ok_or_else(|| invalid("start", fields[3]))?;
        Ok(Self {
            src: HostId::new(src),
            dst: HostId::new(dst),
            size,
            start: Nanosecs::from_secs_f64(start),
        })
    }

    fn parse_lenient(fields: &[&str], line: usize) -> Self {
        let ([src, dst, size], start, complete) = extract_lenient(fields);
        if !complete || fields.len() != Self::NR_FIELDS {
            log::warn!(
                "line {line}: coerced malformed flow record {fields:?} to ({src}, {dst}, {size}, {start})"
            );
        }
        Self {
            src: HostId::new(src as usize),
            dst: HostId::new(dst as usize),
            size,
            start: Nanosecs::from_secs_f64(start),
        }
    }
}

// Mirrors stream extraction over the whole line: each field takes the longest numeric prefix at
// the cursor and leaves the rest for the next field. Once a field fails, it and every field after
// it read as zero. Negative numbers fail, since no field can hold them.
fn extract_lenient(fields: &[&str]) -> ([u64; 3], f64, bool) {
    let line = fields.join(" ");
    let mut rest = line.as_str();
    let mut ints = [0; 3];
    for slot in ints.iter_mut() {
        match take_uint(&mut rest) {
            Some(v) => *slot = v,
            None => return (ints, 0.0, false),
        }
    }
    match take_float(&mut rest) {
        Some(start) => (ints, start, rest.trim().is_empty()),
        None => (ints, 0.0, false),
    }
}

fn take_uint(rest: &mut &str) -> Option<u64> {
    let s = (*rest).trim_start();
    let s = s.strip_prefix('+').unwrap_or(s);
    let len = s.bytes().take_while(u8::is_ascii_digit).count();
    let v = s[..len].parse().ok()?;
    *rest = &s[len..];
    Some(v)
}

fn take_float(rest: &mut &str) -> Option<f64> {
    let s = (*rest).trim_start();
    let b = s.as_bytes();
    let digits = |from: usize| b[from..].iter().take_while(|c| c.is_ascii_digit()).count();
    let mut end = usize::from(matches!(b.first(), Some(b'+' | b'-')));
    let int_len = digits(end);
    end += int_len;
    let mut frac_len = 0;
    if b.get(end) == Some(&b'.') {
        frac_len = digits(end + 1);
        end += 1 + frac_len;
    }
    if int_len + frac_len == 0 {
        return None;
    }
    if matches!(b.get(end), Some(b'e' | b'E')) {
        let sign = usize::from(matches!(b.get(end + 1), Some(b'+' | b'-')));
        let exp_len = digits(end + 1 + sign);
        if exp_len > 0 {
            end += 1 + sign + exp_len;
        }
    }
    let v = s[..end]
        .parse::<f64>()
        .ok()
        .filter(|t| t.is_finite() && *t >= 0.0)?;
    *rest = &s[end..];
    Some(v)
}

/// A dense traffic matrix. Entry `(i, j)` is the demand, in bytes, from host `i` to host `j`.
#[derive(Debug, Clone, PartialEq)]
pub struct TrafficMatrix {
    inner: Array2<f64>,
}

impl TrafficMatrix {
    /// Parses a traffic matrix with one comma- or whitespace-separated row per non-blank line.
    /// All rows must have the same width.
    pub fn parse(s: &str, parsing: NumberParsing) -> Result<Self, TrafficError> {
        let mut rows = Vec::new();
        let mut width = None;
        for (i, line) in s.lines().enumerate() {
            let fields = fields(line);
            if fields.is_empty() {
                continue;
            }
            let lineno = i + 1;
            let expected = *width.get_or_insert(fields.len());
            if fields.len() != expected {
                return Err(TrafficError::RaggedRow {
                    line: lineno,
                    expected,
                    got: fields.len(),
                });
            }
            let row = match parsing {
                NumberParsing::Strict => fields
                    .iter()
                    .map(|t| {
                        t.parse::<f64>()
                            .ok()
                            .filter(|v| v.is_finite() && *v >= 0.0)
                            .ok_or_else(|| TrafficError::InvalidField {
                                line: lineno,
                                field: "demand",
                                token: (*t).to_owned(),
                            })
                    })
                    .collect::<Result<Vec<_>, _>>()?,
                NumberParsing::Lenient => {
                    let nr_good = fields
                        .iter()
                        .take_while(|t| t.parse::<f64>().map_or(false, f64::is_finite))
                        .count();
                    if nr_good < fields.len() {
                        log::warn!(
                            "line {lineno}: malformed demand {:?}; reading the rest of the row as zero",
                            fields[nr_good]
                        );
                    }
                    fields
                        .iter()
                        .enumerate()
                        .map(|(j, t)| if j < nr_good { t.parse().unwrap_or(0.0) } else { 0.0 })
                        .collect()
                }
            };
            rows.push(row);
        }
        let matrix = Self::from_rows(rows)?;
        log::info!("read {}x{} traffic matrix", matrix.nr_rows(), matrix.nr_cols());
        Ok(matrix)
    }

    /// Creates a matrix from rows of equal width.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, TrafficError> {
        let nr_rows = rows.len();
        let nr_cols = rows.first().map(Vec::len).unwrap_or(0);
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != nr_cols) {
            return Err(TrafficError::RaggedRow {
                line: i + 1,
                expected: nr_cols,
                got: row.len(),
            });
        }
        let flat = rows.into_iter().flatten().collect();
        let inner = Array2::from_shape_vec((nr_rows, nr_cols), flat)
            .map_err(|_| TrafficError::Dimensions {
                rows: nr_rows,
                cols: nr_cols,
                nr_hosts: nr_rows,
            })?;
        Ok(Self { inner })
    }

    /// Checks that the matrix is square with one row per host.
    pub fn validate_for(&self, nr_hosts: usize) -> Result<(), TrafficError> {
        if self.nr_rows() != nr_hosts || self.nr_cols() != nr_hosts {
            return Err(TrafficError::Dimensions {
                rows: self.nr_rows(),
                cols: self.nr_cols(),
                nr_hosts,
            });
        }
        Ok(())
    }

    pub fn nr_rows(&self) -> usize {
        self.inner.nrows()
    }

    pub fn nr_cols(&self) -> usize {
        self.inner.ncols()
    }

    /// Returns the demand from `src` to `dst`, if both are in range.
    pub fn demand(&self, src: HostId, dst: HostId) -> Option<f64> {
        self.inner.get((src.inner(), dst.inner())).copied()
    }

    /// Returns the largest demand in the matrix, or zero if it is empty.
    pub fn max_demand(&self) -> f64 {
        self.inner.iter().copied().fold(0.0, f64::max)
    }

    /// Returns every cell in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (HostId, HostId, f64)> + '_ {
        self.inner
            .indexed_iter()
            .map(|((i, j), &v)| (HostId::new(i), HostId::new(j), v))
    }
}

fn fields(line: &str) -> Vec<&str> {
    line.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Error parsing traffic files.
#[derive(Debug, thiserror::Error)]
pub enum TrafficError {
    #[error("line {line}: wrong number of fields (expected {expected}, got {got})")]
    WrongNrFields {
        line: usize,
        expected: usize,
        got: usize,
    },

    #[error("line {line}: invalid {field} `{token}`")]
    InvalidField {
        line: usize,
        field: &'static str,
        token: String,
    },

    #[error("line {line}: ragged matrix row (expected {expected} columns, got {got})")]
    RaggedRow {
        line: usize,
        expected: usize,
        got: usize,
    },

    #[error("traffic matrix is {rows}x{cols}, but the topology has {nr_hosts} hosts")]
    Dimensions {
        rows: usize,
        cols: usize,
        nr_hosts: usize,
    },
}

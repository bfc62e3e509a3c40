//! Minimal FITS reader for the posterior chain file.
//!
//! Only what the chain summary needs is supported: walk the HDUs of a file,
//! parse the first `BINTABLE` extension header, and decode fixed-width numeric
//! columns (`B I J K E D`, with repeat counts) into physical values using
//! `TSCALn`/`TZEROn`. Other column types are skipped over by width and can be
//! present in the file, but cannot be requested.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::AppError;

const BLOCK: usize = 2880;
const CARD: usize = 80;

/// Element type of a binary-table column (the letter of `TFORMn`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    UInt8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    /// Any non-numeric or variable-length type; holds the element width in bytes.
    Opaque(usize),
}

impl ColumnType {
    fn element_width(self) -> usize {
        match self {
            ColumnType::UInt8 => 1,
            ColumnType::Int16 => 2,
            ColumnType::Int32 | ColumnType::Float32 => 4,
            ColumnType::Int64 | ColumnType::Float64 => 8,
            ColumnType::Opaque(w) => w,
        }
    }

    fn is_numeric(self) -> bool {
        !matches!(self, ColumnType::Opaque(_))
    }
}

#[derive(Debug, Clone)]
pub struct BinColumn {
    pub name: String,
    pub column_type: ColumnType,
    pub repeat: usize,
    /// Byte offset of the column inside a row.
    pub offset: usize,
    pub scale: f64,
    pub zero: f64,
}

impl BinColumn {
    /// Bytes per row; `None` when the repeat count overflows.
    fn width(&self) -> Option<usize> {
        match self.column_type {
            // Bit arrays pack `repeat` bits.
            ColumnType::Opaque(0) => Some(self.repeat.div_ceil(8)),
            t => t.element_width().checked_mul(self.repeat),
        }
    }
}

/// A decoded binary-table HDU: column descriptors plus the raw row bytes.
#[derive(Debug, Clone)]
pub struct BinTable {
    pub path: PathBuf,
    pub columns: Vec<BinColumn>,
    pub n_rows: usize,
    row_len: usize,
    data: Vec<u8>,
}

impl BinTable {
    pub fn column(&self, name: &str) -> Option<&BinColumn> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Physical values of one column, one `Vec` (of `repeat` values) per row.
    pub fn column_rows(&self, name: &str) -> Result<Vec<Vec<f64>>, AppError> {
        let col = self.column(name).ok_or_else(|| {
            let known: Vec<&str> = self.columns.iter().map(|c| c.name.as_str()).collect();
            AppError::input(format!(
                "'{}' has no column `{name}` (columns: {}).",
                self.path.display(),
                known.join(", ")
            ))
        })?;
        if !col.column_type.is_numeric() {
            return Err(AppError::input(format!(
                "'{}': column `{name}` is not a numeric column.",
                self.path.display()
            )));
        }

        let width = col.column_type.element_width();
        let mut rows = Vec::with_capacity(self.n_rows);
        for r in 0..self.n_rows {
            let start = r * self.row_len + col.offset;
            let mut values = Vec::with_capacity(col.repeat);
            for k in 0..col.repeat {
                let at = start + k * width;
                let bytes = &self.data[at..at + width];
                let raw = decode(col.column_type, bytes);
                values.push(col.zero + col.scale * raw);
            }
            rows.push(values);
        }
        Ok(rows)
    }
}

fn decode(column_type: ColumnType, bytes: &[u8]) -> f64 {
    let mut buf = [0u8; 8];
    buf[..bytes.len()].copy_from_slice(bytes);
    match column_type {
        ColumnType::UInt8 => f64::from(bytes[0]),
        ColumnType::Int16 => f64::from(i16::from_be_bytes([buf[0], buf[1]])),
        ColumnType::Int32 => f64::from(i32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]])),
        ColumnType::Int64 => i64::from_be_bytes(buf) as f64,
        ColumnType::Float32 => f64::from(f32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]])),
        ColumnType::Float64 => f64::from_be_bytes(buf),
        ColumnType::Opaque(_) => f64::NAN,
    }
}

/// Parse a `TFORMn` value such as `D`, `250D` or `1J`.
pub fn parse_tform(tform: &str) -> Option<(usize, ColumnType)> {
    let tform = tform.trim();
    let digits_end = tform.find(|c: char| !c.is_ascii_digit())?;
    let repeat = if digits_end == 0 {
        1
    } else {
        tform[..digits_end].parse().ok()?
    };
    let code = tform[digits_end..].chars().next()?;
    let column_type = match code {
        'B' => ColumnType::UInt8,
        'I' => ColumnType::Int16,
        'J' => ColumnType::Int32,
        'K' => ColumnType::Int64,
        'E' => ColumnType::Float32,
        'D' => ColumnType::Float64,
        'L' | 'A' => ColumnType::Opaque(1),
        'X' => ColumnType::Opaque(0),
        'C' | 'P' => ColumnType::Opaque(8),
        'M' | 'Q' => ColumnType::Opaque(16),
        _ => return None,
    };
    Some((repeat, column_type))
}

type Header = HashMap<String, String>;

/// Parse one header starting at `pos`; returns the keywords and the offset of
/// the first byte after the header's last block.
fn parse_header(bytes: &[u8], pos: usize, path: &Path) -> Result<(Header, usize), AppError> {
    let mut header = Header::new();
    let mut at = pos;
    loop {
        if at + CARD > bytes.len() {
            return Err(AppError::input(format!(
                "'{}': FITS header starting at byte {pos} has no END card.",
                path.display()
            )));
        }
        let card = String::from_utf8_lossy(&bytes[at..at + CARD]).into_owned();
        at += CARD;

        let key = card.get(..8).unwrap_or(card.as_str()).trim().to_string();
        if key == "END" {
            break;
        }
        if card.get(8..10) == Some("= ") {
            header.insert(key, parse_card_value(card.get(10..).unwrap_or("")));
        }
    }
    Ok((header, at.div_ceil(BLOCK) * BLOCK))
}

fn parse_card_value(raw: &str) -> String {
    let raw = raw.trim_start();
    if let Some(rest) = raw.strip_prefix('\'') {
        // Quoted string; `''` is an escaped quote, trailing blanks are insignificant.
        let mut out = String::new();
        let mut chars = rest.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '\'' {
                if chars.peek() == Some(&'\'') {
                    chars.next();
                    out.push('\'');
                    continue;
                }
                break;
            }
            out.push(c);
        }
        return out.trim_end().to_string();
    }
    raw.split('/').next().unwrap_or("").trim().to_string()
}

fn int_key(header: &Header, key: &str, default: Option<i64>, path: &Path) -> Result<i64, AppError> {
    match header.get(key) {
        Some(v) => v.parse().map_err(|_| {
            AppError::input(format!("'{}': FITS keyword {key} = '{v}' is not an integer.", path.display()))
        }),
        None => default.ok_or_else(|| {
            AppError::input(format!("'{}': FITS header is missing keyword {key}.", path.display()))
        }),
    }
}

fn float_key(header: &Header, key: &str, default: f64) -> f64 {
    header
        .get(key)
        .and_then(|v| v.replace('D', "E").parse().ok())
        .unwrap_or(default)
}

/// A header count (axis length, `PCOUNT`, `TFIELDS`, ...), which must not be negative.
fn count_key(header: &Header, key: &str, default: Option<i64>, path: &Path) -> Result<usize, AppError> {
    let value = int_key(header, key, default, path)?;
    usize::try_from(value).map_err(|_| {
        AppError::input(format!(
            "'{}': FITS keyword {key} = {value} must not be negative.",
            path.display()
        ))
    })
}

/// Size in bytes of an HDU's data unit, without block padding.
fn data_size(header: &Header, path: &Path) -> Result<usize, AppError> {
    let bitpix = int_key(header, "BITPIX", None, path)?;
    let naxis = count_key(header, "NAXIS", None, path)?;
    if naxis == 0 {
        return Ok(0);
    }
    let overflow = || AppError::input(format!("'{}': FITS data size overflows.", path.display()));

    let mut elements: usize = 1;
    for i in 1..=naxis {
        let axis = count_key(header, &format!("NAXIS{i}"), None, path)?;
        elements = elements.checked_mul(axis).ok_or_else(overflow)?;
    }
    let pcount = count_key(header, "PCOUNT", Some(0), path)?;
    let gcount = count_key(header, "GCOUNT", Some(1), path)?;
    let bytes_per_element = usize::try_from(bitpix.unsigned_abs() / 8).map_err(|_| overflow())?;

    pcount
        .checked_add(elements)
        .and_then(|n| n.checked_mul(gcount))
        .and_then(|n| n.checked_mul(bytes_per_element))
        .ok_or_else(overflow)
}

/// Read the first `BINTABLE` extension of a FITS file.
pub fn read_first_bintable(path: &Path) -> Result<BinTable, AppError> {
    let bytes = fs::read(path).map_err(|e| {
        AppError::input(format!(
            "Failed to read '{}': {e}. Expected a FITS file with a binary-table extension.",
            path.display()
        ))
    })?;

    let mut pos = 0;
    let mut hdu = 0;
    while pos < bytes.len() {
        let (header, data_start) = parse_header(&bytes, pos, path)?;
        let size = data_size(&header, path)?;
        let available = bytes.len().saturating_sub(data_start);
        if size > available {
            return Err(AppError::input(format!(
                "'{}': data of HDU {hdu} is truncated ({available} of {size} bytes).",
                path.display()
            )));
        }

        if hdu > 0 && header.get("XTENSION").map(String::as_str) == Some("BINTABLE") {
            debug!(path = %path.display(), hdu, "found binary table");
            return build_table(&header, bytes[data_start..data_start + size].to_vec(), path);
        }

        pos = data_start + size.div_ceil(BLOCK) * BLOCK;
        hdu += 1;
    }

    Err(AppError::input(format!(
        "'{}' contains no BINTABLE extension.",
        path.display()
    )))
}

fn build_table(header: &Header, data: Vec<u8>, path: &Path) -> Result<BinTable, AppError> {
    let row_len = count_key(header, "NAXIS1", None, path)?;
    let n_rows = count_key(header, "NAXIS2", None, path)?;
    let tfields = count_key(header, "TFIELDS", None, path)?;

    let mut columns = Vec::new();
    let mut offset = 0;
    for i in 1..=tfields {
        let tform = header.get(&format!("TFORM{i}")).ok_or_else(|| {
            AppError::input(format!("'{}': FITS header is missing TFORM{i}.", path.display()))
        })?;
        let (repeat, column_type) = parse_tform(tform).ok_or_else(|| {
            AppError::input(format!("'{}': unsupported TFORM{i} = '{tform}'.", path.display()))
        })?;
        let column = BinColumn {
            name: header.get(&format!("TTYPE{i}")).cloned().unwrap_or_else(|| format!("col{i}")),
            column_type,
            repeat,
            offset,
            scale: float_key(header, &format!("TSCAL{i}"), 1.0),
            zero: float_key(header, &format!("TZERO{i}"), 0.0),
        };
        offset = column
            .width()
            .and_then(|w| offset.checked_add(w))
            .ok_or_else(|| AppError::input(format!("'{}': TFORM{i} = '{tform}' is too wide.", path.display())))?;
        columns.push(column);
    }

    if offset > row_len {
        return Err(AppError::input(format!(
            "'{}': columns need {offset} bytes per row but NAXIS1 = {row_len}.",
            path.display()
        )));
    }
    if row_len.checked_mul(n_rows).is_none_or(|needed| needed > data.len()) {
        return Err(AppError::input(format!(
            "'{}': {n_rows} rows of {row_len} bytes do not fit in {} bytes of table data.",
            path.display(),
            data.len()
        )));
    }

    Ok(BinTable {
        path: path.to_path_buf(),
        columns,
        n_rows,
        row_len,
        data,
    })
}

/// Writer used by tests to build chain files.
#[cfg(test)]
pub(crate) mod testing {
    use super::BLOCK;
    use std::path::Path;

    fn card(text: &str) -> String {
        format!("{text:<80}")
    }

    fn int_card(key: &str, v: i64) -> String {
        card(&format!("{key:<8}= {v:>20}"))
    }

    fn str_card(key: &str, v: &str) -> String {
        card(&format!("{key:<8}= '{v:<8}'"))
    }

    fn pad_block(buf: &mut Vec<u8>, fill: u8) {
        while buf.len() % BLOCK != 0 {
            buf.push(fill);
        }
    }

    /// Write a file with an empty primary HDU and one `D` binary table.
    /// Each column is `(name, rows)`; every row of a column has the same length.
    pub fn write_f64_bintable(path: &Path, columns: &[(&str, Vec<Vec<f64>>)]) {
        let n_rows = columns.first().map_or(0, |(_, rows)| rows.len());
        let repeats: Vec<usize> = columns.iter().map(|(_, rows)| rows.first().map_or(1, Vec::len)).collect();
        let row_len: usize = repeats.iter().map(|r| r * 8).sum();

        let mut out = Vec::new();
        let primary = [
            card(&format!("{:<8}= {:>20}", "SIMPLE", "T")),
            int_card("BITPIX", 8),
            int_card("NAXIS", 0),
            card(&format!("{:<8}= {:>20}", "EXTEND", "T")),
            card("END"),
        ];
        for c in primary {
            out.extend_from_slice(c.as_bytes());
        }
        pad_block(&mut out, b' ');

        let mut ext = vec![
            str_card("XTENSION", "BINTABLE"),
            int_card("BITPIX", 8),
            int_card("NAXIS", 2),
            int_card("NAXIS1", row_len as i64),
            int_card("NAXIS2", n_rows as i64),
            int_card("PCOUNT", 0),
            int_card("GCOUNT", 1),
            int_card("TFIELDS", columns.len() as i64),
        ];
        for (i, ((name, _), repeat)) in columns.iter().zip(&repeats).enumerate() {
            ext.push(str_card(&format!("TTYPE{}", i + 1), name));
            ext.push(str_card(&format!("TFORM{}", i + 1), &format!("{repeat}D")));
        }
        ext.push(card("END"));
        for c in ext {
            out.extend_from_slice(c.as_bytes());
        }
        pad_block(&mut out, b' ');

        for r in 0..n_rows {
            for (_, rows) in columns {
                for v in &rows[r] {
                    out.extend_from_slice(&v.to_be_bytes());
                }
            }
        }
        pad_block(&mut out, 0);

        std::fs::write(path, out).unwrap();
    }
}

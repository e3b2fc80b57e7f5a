//! CSV loading with encoding and delimiter auto-detection.
//!
//! Every cell is read as a string; typing is the job of features.

use serde_json::Value;
use std::path::Path;

use crate::dataframe::{DataFrame, Row};
use crate::error::{CsvError, CsvResult};

/// Loaded frame with detection metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub frame: DataFrame,
    /// Detected or used encoding
    pub encoding: String,
    /// Detected or used delimiter
    pub delimiter: char,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes using the given encoding, falling back to lossy UTF-8.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::ISO_8859_15.decode(bytes).0.to_string(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.to_string(),
        _ => String::from_utf8_lossy(bytes).to_string(),
    }
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let mut best_sep = ',';
    let mut best_count = 0;
    for sep in [';', ',', '\t', '|'] {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }
    best_sep
}

/// Parse CSV text with an explicit delimiter.
///
/// # Example
/// ```
/// use featurekit::parser::parse_str;
///
/// let df = parse_str("name;age\nAlice;30\nBob;25", ';').unwrap();
///
/// assert_eq!(df.columns(), ["name", "age"]);
/// assert_eq!(df.to_records()[1]["age"], "25");
/// ```
pub fn parse_str(content: &str, delimiter: char) -> CsvResult<DataFrame> {
    if content.trim().is_empty() {
        return Err(CsvError::EmptyFile);
    }
    let delimiter = u8::try_from(delimiter).map_err(|_| CsvError::ParseError {
        line: 0,
        message: format!("delimiter '{}' is not a single byte", delimiter),
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(to_parse_error)?
        .iter()
        .map(str::to_string)
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(CsvError::EmptyFile);
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(to_parse_error)?;
        if record.iter().all(|v| v.is_empty()) {
            continue;
        }
        let row: Row = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.clone(), Value::String(record.get(i).unwrap_or("").to_string())))
            .collect();
        rows.push(row);
    }

    Ok(DataFrame::from_rows(headers, rows))
}

fn to_parse_error(err: csv::Error) -> CsvError {
    CsvError::ParseError {
        line: err.position().map(|p| p.line() as usize).unwrap_or(0),
        message: err.to_string(),
    }
}

/// Parse CSV bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto(bytes: &[u8]) -> CsvResult<ParseResult> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = detect_delimiter(&content);
    let frame = parse_str(&content, delimiter)?;

    Ok(ParseResult { frame, encoding, delimiter })
}

/// Parse a CSV file with auto-detection of encoding and delimiter.
pub fn parse_file_auto(path: impl AsRef<Path>) -> CsvResult<ParseResult> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes_auto(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_csv() {
        let df = parse_str("name;age\nAlice;30\nBob;25", ';').unwrap();
        let rows = df.to_records();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name"], "Alice");
        assert_eq!(rows[1]["age"], "25");
    }

    #[test]
    fn test_quoted_values_keep_delimiter() {
        let df = parse_str("name,value\n\"Alice\",\"Hello, World\"", ',').unwrap();
        assert_eq!(df.to_records()[0]["value"], "Hello, World");
    }

    #[test]
    fn test_empty_lines_skipped() {
        let df = parse_str("a;b\n1;2\n\n3;4\n", ';').unwrap();
        assert_eq!(df.num_rows(), 2);
    }

    #[test]
    fn test_missing_and_extra_values() {
        let df = parse_str("a;b;c\n1;;3\n4\n5;6;7;8", ';').unwrap();
        let rows = df.to_records();

        assert_eq!(rows[0]["b"], "");
        assert_eq!(rows[1]["c"], "");
        assert_eq!(rows[2]["c"], "7");
        assert_eq!(df.columns(), ["a", "b", "c"]);
    }

    #[test]
    fn test_empty_csv_error() {
        assert!(matches!(parse_str("", ';'), Err(CsvError::EmptyFile)));
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), '\t');
        assert_eq!(detect_delimiter("a|b|c\n1|2|3"), '|');
    }

    #[test]
    fn test_auto_parse() {
        let result = parse_bytes_auto(b"name;age\nAlice;30\nBob;25").unwrap();

        assert_eq!(result.delimiter, ';');
        assert_eq!(result.frame.num_rows(), 2);
        assert_eq!(result.frame.columns(), ["name", "age"]);
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        assert_eq!(decode_content(bytes, "iso-8859-1"), "Société");
    }

    #[test]
    fn test_parse_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.csv");
        std::fs::write(&path, "id,raw\n1,10\n").unwrap();

        let result = parse_file_auto(&path).unwrap();
        assert_eq!(result.delimiter, ',');
        assert_eq!(result.frame.to_records()[0]["raw"], "10");
    }
}

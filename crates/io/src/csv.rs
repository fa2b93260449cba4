// CSV/TSV import

use std::io::Read;
use std::path::Path;

use fuelcheck_recon::{load_csv_table, Table};

pub fn import(path: &Path) -> Result<Table, String> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content);
    let label = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    load_csv_table(&label, &content, delimiter).map_err(|e| e.to_string())
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        // Header line must split into >1 field for the candidate to be viable
        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        // Score: (number of lines with same field count as the header) * field_count
        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1, etc.)
pub fn read_file_as_utf8(path: &Path) -> Result<String, String> {
    let mut file = std::fs::File::open(path).map_err(|e| e.to_string())?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| e.to_string())?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            // Fall back to Windows-1252 (common for Excel-exported CSVs)
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_sniff_semicolon_delimiter() {
        let content = "Date_UTC;Time_UTC;HFO_ROB\n01.01.2024;12:00;100\n02.01.2024;12:00;90\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_sniff_comma_delimiter() {
        let content = "Date_UTC,Time_UTC,HFO_ROB\n01.01.2024,12:00,100\n";
        assert_eq!(sniff_delimiter(content), b',');
    }

    #[test]
    fn test_sniff_tab_delimiter() {
        let content = "Date_UTC\tTime_UTC\tHFO_ROB\n01.01.2024\t12:00\t100\n";
        assert_eq!(sniff_delimiter(content), b'\t');
    }

    #[test]
    fn test_sniff_semicolon_with_decimal_commas_quoted() {
        let content = "Fuel_Type;Mass;Note\nHFO;\"350,5\";\"barge 1, berth 4\"\nMGO;12;\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_semicolon_csv_import() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("readings.csv");
        fs::write(&path, "Date_UTC;Time_UTC;HFO_ROB\n01.01.2024;12:00;100\n02.01.2024;12:00\n").unwrap();

        let table = import(&path).unwrap();
        assert_eq!(table.headers, vec!["Date_UTC", "Time_UTC", "HFO_ROB"]);
        assert_eq!(table.rows[0], vec!["01.01.2024", "12:00", "100"]);
        // short record padded
        assert_eq!(table.rows[1], vec!["02.01.2024", "12:00", ""]);
    }

    #[test]
    fn test_windows_1252_fallback() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bunkers.csv");
        // 0xE9 = 'é' in Windows-1252, invalid as a lone UTF-8 byte
        let mut bytes = b"Fuel_Type,Mass,Port\nHFO,10,Le Havre \xE9\n".to_vec();
        bytes.push(b'\n');
        fs::write(&path, bytes).unwrap();

        let table = import(&path).unwrap();
        assert_eq!(table.rows[0][2], "Le Havre \u{e9}");
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = tempdir().unwrap();
        assert!(import(&dir.path().join("nope.csv")).is_err());
    }
}

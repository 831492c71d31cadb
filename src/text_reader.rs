//! Line reader for plain or gzip compressed text inputs
//!

use std::fs::File;
use std::io::{BufRead, BufReader};

use camino::Utf8Path;
use flate2::read::MultiGzDecoder;
use unwrap::unwrap;

/// Open a text file for line-oriented reading, decompressing if the filename ends in '.gz'
///
/// * `label` - used to describe the file in an error message
///
pub fn open_text_file(filename: &Utf8Path, label: &str) -> Box<dyn BufRead> {
    let f = unwrap!(
        File::open(filename),
        "Unable to open {} file: '{}'",
        label,
        filename
    );
    if filename.extension() == Some("gz") {
        Box::new(BufReader::new(MultiGzDecoder::new(f)))
    } else {
        Box::new(BufReader::new(f))
    }
}

/// Iterate over the data lines of a tab-delimited text file
///
/// Returns (1-indexed line number, split fields) for each non-empty line. Lines starting with '#'
/// and a header line starting with `header_prefix` are skipped.
///
pub fn for_each_data_line(
    filename: &Utf8Path,
    label: &str,
    header_prefix: &str,
    mut f: impl FnMut(usize, &[&str]),
) {
    let reader = open_text_file(filename, label);
    for (line_index, line) in reader.lines().enumerate() {
        let line = unwrap!(
            line,
            "Can't read text from {} file: '{}'",
            label,
            filename
        );
        if line.is_empty() || line.starts_with('#') || line.starts_with(header_prefix) {
            continue;
        }
        let words = line.split('\t').collect::<Vec<_>>();
        f(line_index + 1, &words);
    }
}

/// Parse one field of a data line, aborting with file and line context on failure
///
pub fn parse_field<T: std::str::FromStr>(
    words: &[&str],
    field_index: usize,
    field_label: &str,
    filename: &Utf8Path,
    line_number: usize,
) -> T {
    let word = unwrap!(
        words.get(field_index),
        "Missing {} field on line {} of file: '{}'",
        field_label,
        line_number,
        filename
    );
    match word.trim().parse::<T>() {
        Ok(x) => x,
        Err(_) => panic!(
            "Can't parse {field_label} field value '{word}' on line {line_number} of file: '{filename}'"
        ),
    }
}

#[cfg(test)]
pub mod test_utils {
    use std::fs::File;
    use std::io::Write;

    use camino::Utf8PathBuf;

    /// Write `content` to a process-unique file in the temp directory
    pub fn write_temp_file(name: &str, content: &[u8]) -> Utf8PathBuf {
        let dir = Utf8PathBuf::from_path_buf(std::env::temp_dir()).unwrap();
        let filename = dir.join(format!("covratio_test_{}_{}", std::process::id(), name));
        let mut f = File::create(&filename).unwrap();
        f.write_all(content).unwrap();
        filename
    }
}

//! Parsers for the MovieLens 100k data files.
//!
//! - `u.data`: tab-separated, userId \t movieId \t rating \t timestamp
//! - `u.item`: pipe-separated, ISO-8859-1 encoded; only the first two
//!   fields (movieId | title) are kept, the rest (release date, URL,
//!   genre flags) are metadata the engine never touches.

use crate::error::{DataError, Result};
use crate::types::{Movie, Rating};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Read a file with ISO-8859-1 (Latin-1) encoding.
///
/// The MovieLens item file is not UTF-8. Latin-1 is a single-byte
/// encoding where each byte maps directly to the same Unicode code
/// point, so the conversion is a plain byte-to-char widening.
fn read_lines_latin1(path: &Path) -> Result<Vec<String>> {
    let mut file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => DataError::FileNotFound {
            path: path.display().to_string(),
        },
        _ => DataError::Io(e),
    })?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;

    let content: String = bytes.iter().map(|&b| b as char).collect();
    Ok(content.lines().map(|s| s.to_string()).collect())
}

fn parse_error(file: &str, line: usize, reason: impl Into<String>) -> DataError {
    DataError::ParseError {
        file: file.to_string(),
        line,
        reason: reason.into(),
    }
}

/// Parse the ratings file (`u.data`).
///
/// Format: userId \t movieId \t rating \t timestamp
pub fn parse_ratings(path: &Path) -> Result<Vec<Rating>> {
    let file_name = "u.data";
    let lines = read_lines_latin1(path)?;
    let mut ratings = Vec::with_capacity(lines.len());

    for (idx, line) in lines.iter().enumerate() {
        let line_no = idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let mut parts = trimmed.split('\t');
        let user_id = parts
            .next()
            .ok_or_else(|| parse_error(file_name, line_no, "Missing userId"))?;
        let movie_id = parts
            .next()
            .ok_or_else(|| parse_error(file_name, line_no, "Missing movieId"))?;
        let rating_value = parts
            .next()
            .ok_or_else(|| parse_error(file_name, line_no, "Missing rating"))?;
        let timestamp = parts
            .next()
            .ok_or_else(|| parse_error(file_name, line_no, "Missing timestamp"))?;

        let rating = Rating {
            user_id: user_id.parse().map_err(|e| {
                parse_error(file_name, line_no, format!("Invalid userId: {}", e))
            })?,
            movie_id: movie_id.parse().map_err(|e| {
                parse_error(file_name, line_no, format!("Invalid movieId: {}", e))
            })?,
            rating: rating_value.parse().map_err(|e| {
                parse_error(file_name, line_no, format!("Invalid rating: {}", e))
            })?,
            timestamp: timestamp.parse().map_err(|e| {
                parse_error(file_name, line_no, format!("Invalid timestamp: {}", e))
            })?,
        };

        ratings.push(rating);
    }

    Ok(ratings)
}

/// Parse the item metadata file (`u.item`).
///
/// Format: movieId | title | release_date | video_release_date | URL | [genre flags...]
pub fn parse_movies(path: &Path) -> Result<Vec<Movie>> {
    let file_name = "u.item";
    let lines = read_lines_latin1(path)?;
    let mut movies = Vec::with_capacity(lines.len());

    for (idx, line) in lines.iter().enumerate() {
        let line_no = idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let mut parts = trimmed.split('|');
        let movie_id = parts
            .next()
            .ok_or_else(|| parse_error(file_name, line_no, "Missing movieId"))?;
        let title = parts
            .next()
            .ok_or_else(|| parse_error(file_name, line_no, "Missing title"))?;

        movies.push(Movie {
            id: movie_id.parse().map_err(|e| {
                parse_error(file_name, line_no, format!("Invalid movieId: {}", e))
            })?,
            title: title.to_string(),
        });
    }

    Ok(movies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(dir: &tempfile::TempDir, name: &str, content: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(content).unwrap();
        path
    }

    #[test]
    fn parses_tab_separated_ratings() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "u.data", b"196\t242\t3\t881250949\n186\t302\t3\t891717742\n");

        let ratings = parse_ratings(&path).unwrap();
        assert_eq!(ratings.len(), 2);
        assert_eq!(ratings[0].user_id, 196);
        assert_eq!(ratings[0].movie_id, 242);
        assert_eq!(ratings[0].rating, 3.0);
        assert_eq!(ratings[1].timestamp, 891717742);
    }

    #[test]
    fn parses_pipe_separated_movies_with_latin1_titles() {
        let dir = tempfile::tempdir().unwrap();
        // 0xE9 is 'é' in Latin-1; title also keeps its trailing fields ignored
        let line = b"1|Am\xE9lie (2001)|01-Jan-2001||http://example|0|1|0\n";
        let path = write_temp(&dir, "u.item", line);

        let movies = parse_movies(&path).unwrap();
        assert_eq!(movies.len(), 1);
        assert_eq!(movies[0].id, 1);
        assert_eq!(movies[0].title, "Am\u{e9}lie (2001)");
    }

    #[test]
    fn missing_file_reports_file_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = parse_ratings(&dir.path().join("nope.data")).unwrap_err();
        assert!(matches!(err, DataError::FileNotFound { .. }));
    }

    #[test]
    fn malformed_rating_line_reports_line_number() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "u.data", b"196\t242\t3\t881250949\nnot-a-user\t1\t2\t3\n");

        let err = parse_ratings(&path).unwrap_err();
        match err {
            DataError::ParseError { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}

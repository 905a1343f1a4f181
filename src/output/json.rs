//! Nested JSON result set
//!
//! The result set is a JSON array of places, each embedding its histogram and
//! reviews. It is rewritten in full on every persist.

use crate::model::Place;
use crate::output::traits::OutputResult;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

/// Writes `places` to `path`, replacing any previous content
pub fn write_places(path: &Path, places: &[Place]) -> OutputResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, places)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Loads a result set; a missing file is an empty set
pub fn load_places(path: &Path) -> OutputResult<Vec<Place>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    Ok(serde_json::from_reader(BufReader::new(file))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Review;
    use tempfile::TempDir;

    #[test]
    fn test_write_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");

        let mut place = Place::discovered("Hotel Sol", "0x1:0xa", "4.5", "1234", "https://maps.test/sol");
        place.push_review(Review::new("r1", "Ana", "5", "2 weeks ago", "Great"));

        write_places(&path, &[place.clone()]).unwrap();
        assert_eq!(load_places(&path).unwrap(), vec![place]);
    }

    #[test]
    fn test_owner_fields_are_strings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");

        let mut place = Place::discovered("Hotel Sol", "0x1:0xa", "4.5", "1", "https://maps.test/sol");
        place.push_review(Review::new("r1", "Ana", "5", "2 weeks ago", "Great"));
        write_places(&path, &[place]).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let review = &json[0]["reviews"][0];
        assert_eq!(review["owner_answer"], "");
        assert_eq!(review["owner_answer_timestamp"], "");
        assert!(review["review_link"].is_null());
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(load_places(&dir.path().join("none.json")).unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, "[{").unwrap();
        assert!(load_places(&path).is_err());
    }
}

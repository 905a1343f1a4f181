use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// The set of location links whose places were fully processed
///
/// Membership is the only dedup authority across runs. The set is loaded once
/// from a newline-delimited checkpoint file and every new member is appended to
/// that file immediately, so an interrupted crawl loses at most the place that
/// was in progress.
#[derive(Debug, Default)]
pub struct CrawlState {
    path: Option<PathBuf>,
    visited: HashSet<String>,
}

impl CrawlState {
    /// Creates a state that is not backed by a file
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Loads the checkpoint at `path`
    ///
    /// A missing file is an empty checkpoint. Blank lines are ignored.
    pub fn load(path: &Path) -> io::Result<Self> {
        let mut visited = HashSet::new();

        match File::open(path) {
            Ok(file) => {
                for line in BufReader::new(file).lines() {
                    let line = line?;
                    let link = line.trim();
                    if !link.is_empty() {
                        visited.insert(link.to_string());
                    }
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }

        Ok(Self {
            path: Some(path.to_path_buf()),
            visited,
        })
    }

    /// Starts over: truncates the checkpoint at `path` and returns an empty state
    pub fn fresh(path: &Path) -> io::Result<Self> {
        File::create(path)?;
        Ok(Self {
            path: Some(path.to_path_buf()),
            visited: HashSet::new(),
        })
    }

    pub fn contains(&self, location_link: &str) -> bool {
        self.visited.contains(location_link)
    }

    /// Adds a link and appends it to the checkpoint file
    ///
    /// Returns false if the link was already a member; nothing is written then.
    pub fn record(&mut self, location_link: &str) -> io::Result<bool> {
        if self.visited.contains(location_link) {
            return Ok(false);
        }

        if let Some(path) = &self.path {
            let mut file = OpenOptions::new().create(true).append(true).open(path)?;
            writeln!(file, "{}", location_link)?;
        }

        self.visited.insert(location_link.to_string());
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.visited.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visited.is_empty()
    }
}

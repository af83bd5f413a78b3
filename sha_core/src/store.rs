//! The on-disk image store below the image directory.
//!
//! ```text
//! img/
//! ├── {hall_id}/availability_{YYYYMMDD}_{wkd}.png
//! ├── headers/{header.png,footer.png,manifest.json}
//! └── availability_overview_{hall_id}_{hall_name}.png
//! ```

use std::{
    fs::{create_dir_all, read_dir, read_to_string, remove_dir_all, write},
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    amis_client::{self, AvailabilitySource, ObjectId},
    error::{Error, Result},
    weekday::{date_range, DateKey, HallId, Weekday},
};

static FILE_PREFIX: &str = "availability";
static FILE_EXTENSION: &str = "png";
static HEADERS_DIR: &str = "headers";
static MANIFEST: &str = "manifest.json";

/// Name of the image file for a date, e.g. `availability_20250106_mon.png`.
pub fn file_name(date: DateKey) -> String {
    format!(
        "{FILE_PREFIX}_{date}_{}.{FILE_EXTENSION}",
        date.weekday().abbreviation()
    )
}

/// Split an image file name into its weekday and date.
pub fn parse_file_name(name: &str) -> Result<(Weekday, DateKey)> {
    let lowercase = name.to_lowercase();
    let parts: Vec<&str> = lowercase.split(['_', '.']).collect();
    let [prefix, date, day, extension] = parts[..] else {
        return Err(Error::Parse(String::from(name)));
    };
    if prefix != FILE_PREFIX || extension != FILE_EXTENSION {
        return Err(Error::Parse(String::from(name)));
    }
    let weekday = Weekday::from_abbreviation(day)
        .filter(|weekday| weekday.abbreviation() == day)
        .ok_or_else(|| Error::Parse(String::from(name)))?;
    let date = date
        .parse::<DateKey>()
        .map_err(|_| Error::Parse(String::from(name)))?;
    Ok((weekday, date))
}

/// Result of fetching the images of one hall.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FetchSummary {
    pub saved: usize,
    pub failed: usize,
}

/// The shared decoration images, absent when they could not be fetched.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Decorations {
    pub header: Option<PathBuf>,
    pub footer: Option<PathBuf>,
}

/// Records which decoration images were written completely.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Manifest {
    #[serde(default)]
    header: bool,
    #[serde(default)]
    footer: bool,
}

#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn hall_dir(&self, hall_id: HallId) -> PathBuf {
        self.root.join(hall_id.to_string())
    }

    pub fn headers_dir(&self) -> PathBuf {
        self.root.join(HEADERS_DIR)
    }

    /// Where the overview figure of a hall is written.
    pub fn overview_path(&self, hall_id: HallId, hall_name: &str) -> PathBuf {
        let hall_name: String = hall_name
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
                c => c,
            })
            .collect();
        self.root
            .join(format!("availability_overview_{hall_id}_{hall_name}.png"))
    }

    /// The halls with a directory in the store, sorted by id.
    pub fn hall_ids(&self) -> Result<Vec<HallId>> {
        if !self.root.is_dir() {
            return Err(Error::DirectoryNotFound(self.root.clone()));
        }
        let mut hall_ids = vec![];
        for entry in read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if name.is_empty() || !name.bytes().all(|byte| byte.is_ascii_digit()) {
                continue;
            }
            if let Ok(hall_id) = name.parse() {
                hall_ids.push(hall_id);
            }
        }
        hall_ids.sort_unstable();
        Ok(hall_ids)
    }

    /// Replace the stored images of a hall with fresh ones for the given weekdays and dates.
    ///
    /// The hall directory is cleared once before anything is fetched. A failed fetch is
    /// logged and counted, the remaining dates are still fetched.
    pub async fn save_run<S: AvailabilitySource>(
        &self,
        source: &S,
        hall_id: HallId,
        days: &[Weekday],
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<FetchSummary> {
        let dir = self.hall_dir(hall_id);
        if dir.exists() {
            remove_dir_all(&dir)?;
        }
        create_dir_all(&dir)?;
        let mut summary = FetchSummary::default();
        for date in date_range(start_date, end_date) {
            let date = DateKey::new(date);
            let weekday = date.weekday();
            if !days.contains(&weekday) {
                continue;
            }
            match amis_client::fetch(source, hall_id, date).await {
                Ok(bytes) => {
                    let path = dir.join(file_name(date));
                    write(&path, bytes)?;
                    info!(path = %path.display(), "saved availability image");
                    summary.saved += 1;
                }
                Err(err) => {
                    warn!(
                        hall_id,
                        %date,
                        weekday = weekday.abbreviation(),
                        error = %err,
                        "failed to retrieve availability image"
                    );
                    summary.failed += 1;
                }
            }
        }
        Ok(summary)
    }

    /// Make sure the header and footer images exist, fetching only the missing ones.
    pub async fn ensure_headers<S: AvailabilitySource>(&self, source: &S) -> Result<Decorations> {
        let dir = self.headers_dir();
        create_dir_all(&dir)?;
        let manifest_path = dir.join(MANIFEST);
        let mut manifest = read_manifest(&manifest_path);
        let mut changed = false;
        for (object, recorded) in [
            (ObjectId::Header, &mut manifest.header),
            (ObjectId::Footer, &mut manifest.footer),
        ] {
            let path = dir.join(decoration_file_name(object));
            if *recorded && path.is_file() {
                continue;
            }
            changed = true;
            *recorded = false;
            match source.fetch_schema(object, None).await {
                Ok(bytes) => {
                    write(&path, bytes)?;
                    *recorded = true;
                    info!(path = %path.display(), "saved {object} image");
                }
                Err(err) => warn!(error = %err, "failed to retrieve {object} image"),
            }
        }
        if changed {
            write(&manifest_path, serde_json::to_vec_pretty(&manifest)?)?;
        }
        Ok(Decorations {
            header: manifest
                .header
                .then(|| dir.join(decoration_file_name(ObjectId::Header))),
            footer: manifest
                .footer
                .then(|| dir.join(decoration_file_name(ObjectId::Footer))),
        })
    }
}

fn decoration_file_name(object: ObjectId) -> String {
    format!("{object}.{FILE_EXTENSION}")
}

fn read_manifest(path: &Path) -> Manifest {
    let Ok(json) = read_to_string(path) else {
        return Manifest::default();
    };
    serde_json::from_str(&json).unwrap_or_else(|err| {
        warn!(path = %path.display(), error = %err, "ignoring unreadable manifest");
        Manifest::default()
    })
}

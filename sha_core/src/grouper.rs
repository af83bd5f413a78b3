//! Groups the stored images of a hall by weekday.

use std::{
    collections::BTreeMap,
    fs::read_dir,
    path::{Path, PathBuf},
};

use tracing::warn;

use crate::{
    error::{Error, Result},
    store::parse_file_name,
    weekday::{DateKey, Weekday},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayEntry {
    pub date: DateKey,
    pub path: PathBuf,
}

/// Images per weekday, Monday first, each list ordered by date.
pub type WeekdayBuckets = BTreeMap<Weekday, Vec<DayEntry>>;

/// Read a hall directory into weekday buckets.
///
/// Files that do not follow the image naming scheme are skipped with a warning.
/// Weekdays without images are not part of the result.
pub fn group_by_weekday(hall_dir: &Path) -> Result<WeekdayBuckets> {
    if !hall_dir.is_dir() {
        return Err(Error::DirectoryNotFound(hall_dir.to_path_buf()));
    }
    let mut buckets = WeekdayBuckets::new();
    for entry in read_dir(hall_dir)? {
        let path = entry?.path();
        let is_png = path
            .extension()
            .and_then(|extension| extension.to_str())
            .is_some_and(|extension| extension.eq_ignore_ascii_case("png"));
        if !path.is_file() || !is_png {
            continue;
        }
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        match parse_file_name(name) {
            Ok((weekday, date)) => buckets.entry(weekday).or_default().push(DayEntry { date, path }),
            Err(err) => warn!(error = %err, "skipping file"),
        }
    }
    for entries in buckets.values_mut() {
        entries.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.path.cmp(&b.path)));
        entries.dedup_by_key(|entry| entry.date);
    }
    Ok(buckets)
}

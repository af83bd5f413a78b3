//! Turns the stored images of every hall into overview figures.

use std::{fs::remove_file, path::PathBuf};

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use crate::{
    amis_client::{resolve_hall_name, AvailabilitySource},
    chart::{render_figure, DayPanel, OverviewFigure},
    compositor::stack_vertical,
    grouper::group_by_weekday,
    store::LocalStore,
    weekday::{DateKey, HallId},
};

/// Result of rendering all halls.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RenderSummary {
    pub rendered: usize,
    pub failed: usize,
}

/// Group the images of a hall and stack each weekday between the shared header and footer.
pub async fn load_day_panels<S: AvailabilitySource>(
    store: &LocalStore,
    source: &S,
    hall_id: HallId,
) -> crate::error::Result<Vec<DayPanel>> {
    let buckets = group_by_weekday(&store.hall_dir(hall_id))?;
    let decorations = store.ensure_headers(source).await?;
    let mut panels = Vec::with_capacity(buckets.len());
    for (weekday, entries) in buckets {
        let paths: Vec<&PathBuf> = entries.iter().map(|entry| &entry.path).collect();
        let Some(image) = stack_vertical(
            &paths,
            decorations.header.as_deref(),
            decorations.footer.as_deref(),
        ) else {
            continue;
        };
        let dates: Vec<DateKey> = entries
            .iter()
            .enumerate()
            .filter(|(index, _)| !image.skipped().contains(index))
            .map(|(_, entry)| entry.date)
            .collect();
        if dates.is_empty() {
            warn!(hall_id, %weekday, "no decodable images left");
            continue;
        }
        panels.push(DayPanel {
            weekday,
            dates,
            image,
        });
    }
    Ok(panels)
}

/// Render the overview figure of one hall.
pub async fn render_overview<S: AvailabilitySource>(
    store: &LocalStore,
    source: &S,
    hall_id: HallId,
    hall_name: &str,
    with_text: bool,
) -> Result<OverviewFigure> {
    let panels = load_day_panels(store, source, hall_id)
        .await
        .with_context(|| format!("cannot load images of hall {hall_id}"))?;
    if panels.is_empty() {
        bail!("no availability images for hall {hall_id}");
    }
    render_figure(
        &format!("Availability overview {hall_name}"),
        &panels,
        with_text,
    )
}

/// Render and write the overview of one hall, replacing an earlier one.
pub async fn write_overview<S: AvailabilitySource>(
    store: &LocalStore,
    source: &S,
    hall_id: HallId,
    with_text: bool,
) -> Result<PathBuf> {
    let hall_name = resolve_hall_name(source, hall_id).await;
    let figure = render_overview(store, source, hall_id, &hall_name, with_text).await?;
    let path = store.overview_path(hall_id, &hall_name);
    if path.exists() {
        remove_file(&path).with_context(|| format!("cannot remove {}", path.display()))?;
    }
    figure
        .save(&path)
        .with_context(|| format!("cannot write {}", path.display()))?;
    Ok(path)
}

/// Render every hall that has a numeric directory in the store.
///
/// A hall that fails is logged and skipped.
pub async fn render_all_halls<S: AvailabilitySource>(
    store: &LocalStore,
    source: &S,
    with_text: bool,
) -> Result<RenderSummary> {
    let hall_ids = store
        .hall_ids()
        .with_context(|| format!("cannot list halls in {}", store.root().display()))?;
    let mut summary = RenderSummary::default();
    for hall_id in hall_ids {
        match write_overview(store, source, hall_id, with_text).await {
            Ok(path) => {
                info!(hall_id, path = %path.display(), "saved availability overview");
                summary.rendered += 1;
            }
            Err(err) => {
                warn!(hall_id, error = %format!("{err:#}"), "failed to render overview");
                summary.failed += 1;
            }
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::fs::{create_dir, write};

    use chrono::NaiveDate;

    use crate::{
        overview::{render_all_halls, render_overview, RenderSummary},
        store::{FetchSummary, LocalStore},
        testing::{FakeSource, FOOTER_HEIGHT, HEADER_HEIGHT, IMAGE_HEIGHT},
        weekday::Weekday,
    };

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_and_render_single_hall() {
        let root = tempfile::tempdir().unwrap();
        let store = LocalStore::new(root.path().join("img"));
        let source = FakeSource::new().with_hall_name(42, "Sporthal Test");
        let summary = store
            .save_run(
                &source,
                42,
                &[Weekday::Monday],
                date(2025, 1, 1),
                date(2025, 1, 31),
            )
            .await
            .unwrap();
        assert_eq!(summary, FetchSummary { saved: 4, failed: 0 });

        let summary = render_all_halls(&store, &source, false).await.unwrap();
        assert_eq!(summary, RenderSummary { rendered: 1, failed: 0 });
        let path = store.overview_path(42, "Sporthal Test");
        assert!(path.ends_with("availability_overview_42_Sporthal Test.png"));
        let figure = image::open(&path).unwrap();
        assert_eq!((figure.width(), figure.height()), (800, 280));
        // header, four dates, footer
        assert_eq!(source.schema_calls(), 6);
    }

    #[tokio::test]
    async fn test_render_overview_panels() {
        let root = tempfile::tempdir().unwrap();
        let store = LocalStore::new(root.path());
        let source = FakeSource::new();
        store
            .save_run(
                &source,
                7,
                &[Weekday::Tuesday, Weekday::Thursday, Weekday::Sunday],
                date(2025, 3, 1),
                date(2025, 3, 16),
            )
            .await
            .unwrap();
        let panels = crate::overview::load_day_panels(&store, &source, 7)
            .await
            .unwrap();
        let weekdays: Vec<Weekday> = panels.iter().map(|panel| panel.weekday).collect();
        assert_eq!(
            weekdays,
            vec![Weekday::Tuesday, Weekday::Thursday, Weekday::Sunday]
        );
        assert_eq!(panels[2].dates.len(), 3);
        assert_eq!(
            panels[2].image.height(),
            HEADER_HEIGHT + 3 * IMAGE_HEIGHT + FOOTER_HEIGHT
        );
        let figure = render_overview(&store, &source, 7, "Hall_7", false)
            .await
            .unwrap();
        assert_eq!((figure.width(), figure.height()), (1500, 400));
    }

    #[tokio::test]
    async fn test_render_without_decorations() {
        let root = tempfile::tempdir().unwrap();
        let store = LocalStore::new(root.path());
        let source = FakeSource::new().without_decorations();
        store
            .save_run(&source, 7, &[Weekday::Friday], date(2025, 3, 1), date(2025, 3, 14))
            .await
            .unwrap();
        let panels = crate::overview::load_day_panels(&store, &source, 7)
            .await
            .unwrap();
        assert_eq!(panels.len(), 1);
        assert_eq!(panels[0].image.height(), 2 * IMAGE_HEIGHT);
    }

    #[tokio::test]
    async fn test_undecodable_image_leaves_a_gap() {
        let root = tempfile::tempdir().unwrap();
        let store = LocalStore::new(root.path());
        let source = FakeSource::new().with_hall_name(42, "Sporthal Test");
        store
            .save_run(&source, 42, &[Weekday::Monday], date(2025, 1, 1), date(2025, 1, 31))
            .await
            .unwrap();
        write(
            store.hall_dir(42).join("availability_20250113_mon.png"),
            b"<html>error</html>",
        )
        .unwrap();
        let panels = crate::overview::load_day_panels(&store, &source, 42)
            .await
            .unwrap();
        assert_eq!(panels.len(), 1);
        let dates: Vec<String> = panels[0].dates.iter().map(ToString::to_string).collect();
        assert_eq!(dates, vec!["20250106", "20250120", "20250127"]);
        assert_eq!(
            panels[0].image.height(),
            HEADER_HEIGHT + 3 * IMAGE_HEIGHT + FOOTER_HEIGHT
        );
        let summary = render_all_halls(&store, &source, false).await.unwrap();
        assert_eq!(summary, RenderSummary { rendered: 1, failed: 0 });
    }

    #[tokio::test]
    async fn test_failed_hall_does_not_stop_others() {
        let root = tempfile::tempdir().unwrap();
        let store = LocalStore::new(root.path());
        let source = FakeSource::new();
        store
            .save_run(&source, 42, &[Weekday::Monday], date(2025, 1, 1), date(2025, 1, 10))
            .await
            .unwrap();
        create_dir(root.path().join("43")).unwrap();
        let stale = store.overview_path(42, "Hall_42");
        write(&stale, b"stale").unwrap();

        let summary = render_all_halls(&store, &source, false).await.unwrap();
        assert_eq!(summary, RenderSummary { rendered: 1, failed: 1 });
        assert!(image::open(&stale).is_ok());
        assert!(!store.overview_path(43, "Hall_43").exists());
    }

    #[tokio::test]
    async fn test_render_all_halls_missing_store() {
        let root = tempfile::tempdir().unwrap();
        let store = LocalStore::new(root.path().join("img"));
        assert!(render_all_halls(&store, &FakeSource::new(), false)
            .await
            .is_err());
    }
}

//! Scrape engine that replays previously captured listings from a JSON-lines file.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use scout_core::numeric_field;
use scout_engine::{AtomicFile, ScrapeEngine, ScrapeError, ScrapeJob, ScrapeSink};
use scout_logging::{scout_info, scout_warn};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

pub const ENV_REPLAY_FILE: &str = "SCOUT_REPLAY_FILE";
pub const ENV_REPLAY_DELAY_MS: &str = "SCOUT_REPLAY_DELAY_MS";

pub struct ReplayEngine {
    source: Option<PathBuf>,
    delay: Duration,
}

impl ReplayEngine {
    pub fn new(source: Option<PathBuf>, delay: Duration) -> Self {
        Self { source, delay }
    }

    pub fn from_env() -> Self {
        let source = std::env::var_os(ENV_REPLAY_FILE).map(PathBuf::from);
        let delay = std::env::var(ENV_REPLAY_DELAY_MS)
            .ok()
            .and_then(|ms| ms.trim().parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::ZERO);
        Self::new(source, delay)
    }

    fn listings(&self) -> Result<Vec<Value>, ScrapeError> {
        let source = self.source.as_ref().ok_or_else(|| {
            ScrapeError::Failed(format!("no listing source; set {ENV_REPLAY_FILE}"))
        })?;
        let text = fs::read_to_string(source)?;
        let mut listings = Vec::new();
        for (number, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Value>(line) {
                Ok(value) if value.is_object() => listings.push(value),
                Ok(_) => scout_warn!("{:?}:{} is not an object, skipped", source, number + 1),
                Err(err) => scout_warn!("{:?}:{} unreadable: {}", source, number + 1, err),
            }
        }
        Ok(listings)
    }
}

/// Cheap enough, pinned often enough and reviewed often enough.
fn passes(job: &ScrapeJob, listing: &Value) -> bool {
    let field = |name: &str| numeric_field(listing, name).unwrap_or(0.0);
    field("price") <= job.price_threshold
        && field("pinned") >= job.pinned_threshold
        && field("reviews") >= job.reviews_threshold as f64
}

impl ScrapeEngine for ReplayEngine {
    fn run(
        &self,
        job: &ScrapeJob,
        sink: &dyn ScrapeSink,
        cancel: &CancellationToken,
    ) -> Result<(), ScrapeError> {
        let listings = self.listings()?;
        let total = listings.len();
        scout_info!("Replaying {} listings for {:?}", total, job.keyword);

        let (mut visited, mut filtered) = (0usize, 0usize);
        let mut kept = Vec::new();
        for listing in listings {
            if cancel.is_cancelled() {
                scout_info!("Replay cancelled after {} listings", visited);
                break;
            }
            visited += 1;
            if passes(job, &listing) {
                kept.push(listing.to_string());
                sink.on_item(listing);
            } else {
                filtered += 1;
            }
            sink.on_progress(json!({
                "visited": visited,
                "collected": kept.len(),
                "filtered": filtered,
                "list_count": total,
                "batch_progress": format!("{visited}/{total}"),
            }));
            if !self.delay.is_zero() {
                std::thread::sleep(self.delay);
            }
        }

        let mut content = kept.join("\n");
        if !content.is_empty() {
            content.push('\n');
        }
        AtomicFile::new(&job.output_path).write(content.as_bytes())?;
        scout_info!("Wrote {} listings to {:?}", kept.len(), job.output_path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    #[derive(Default)]
    struct Collect {
        items: Mutex<Vec<Value>>,
        progress: Mutex<Vec<Value>>,
    }

    impl ScrapeSink for Collect {
        fn on_item(&self, item: Value) {
            self.items.lock().unwrap().push(item);
        }

        fn on_progress(&self, info: Value) {
            self.progress.lock().unwrap().push(info);
        }
    }

    fn job(dir: &TempDir) -> ScrapeJob {
        ScrapeJob {
            keyword: "shoes".to_string(),
            price_threshold: 50.0,
            pinned_threshold: 1000.0,
            reviews_threshold: 100,
            output_path: dir.path().join("out").join("pdd_results.jsonl"),
        }
    }

    fn source(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("listings.jsonl");
        let lines = [
            r#"{"title":"cheap","price":"19.9","pinned":5000,"reviews":300}"#,
            r#"{"title":"pricey","price":80,"pinned":5000,"reviews":300}"#,
            "",
            "not json",
            r#"{"title":"quiet","price":10,"pinned":20,"reviews":300}"#,
        ];
        fs::write(&path, lines.join("\n")).unwrap();
        path
    }

    #[test]
    fn keeps_matching_listings_and_writes_them() {
        let dir = TempDir::new().unwrap();
        let engine = ReplayEngine::new(Some(source(&dir)), Duration::ZERO);
        let sink = Collect::default();

        engine
            .run(&job(&dir), &sink, &CancellationToken::new())
            .unwrap();

        let items = sink.items.lock().unwrap().clone();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["title"], "cheap");

        let last = sink.progress.lock().unwrap().last().cloned().unwrap();
        assert_eq!(
            last,
            json!({
                "visited": 3,
                "collected": 1,
                "filtered": 2,
                "list_count": 3,
                "batch_progress": "3/3",
            })
        );

        let written = fs::read_to_string(job(&dir).output_path).unwrap();
        assert_eq!(written.lines().count(), 1);
    }

    #[test]
    fn cancelled_run_stops_early_but_still_writes() {
        let dir = TempDir::new().unwrap();
        let engine = ReplayEngine::new(Some(source(&dir)), Duration::ZERO);
        let sink = Collect::default();
        let cancel = CancellationToken::new();
        cancel.cancel();

        engine.run(&job(&dir), &sink, &cancel).unwrap();

        assert!(sink.progress.lock().unwrap().is_empty());
        assert_eq!(fs::read_to_string(job(&dir).output_path).unwrap(), "");
    }

    #[test]
    fn missing_source_fails_the_run() {
        let dir = TempDir::new().unwrap();
        let engine = ReplayEngine::new(None, Duration::ZERO);
        let err = engine
            .run(&job(&dir), &Collect::default(), &CancellationToken::new())
            .unwrap_err();
        assert!(err.to_string().contains(ENV_REPLAY_FILE));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use crate::analysis::*;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<Notification>>,
    }

    impl Notifier for Recorder {
        fn notify(&self, notification: Notification) {
            self.seen.lock().unwrap().push(notification);
        }
    }

    impl Recorder {
        fn processing(&self) -> Vec<ProcessingStatus> {
            self.seen
                .lock()
                .unwrap()
                .iter()
                .filter_map(|n| match n {
                    Notification::Processing { status, .. } => Some(*status),
                    _ => None,
                })
                .collect()
        }

        fn diagnostics(&self) -> Vec<(i32, usize)> {
            self.seen
                .lock()
                .unwrap()
                .iter()
                .filter_map(|n| match n {
                    Notification::Diagnostics { version, diagnostics, .. } => Some((*version, diagnostics.len())),
                    _ => None,
                })
                .collect()
        }
    }

    fn cache(threshold: Duration) -> (AnalysisCache, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let notifier: Arc<dyn Notifier> = recorder.clone();
        (AnalysisCache::new(notifier, threshold), recorder)
    }

    /// Sleeps before analysing any text starting with `slow`; panics on `boom`.
    fn scripted() -> Builder {
        Arc::new(|path: &str, text: &str| {
            if text.starts_with("boom") {
                panic!("builder exploded");
            }
            if text.starts_with("slow") {
                std::thread::sleep(Duration::from_millis(200));
            }
            analyze(path, text)
        })
    }

    #[tokio::test]
    async fn update_then_get() {
        let (cache, recorder) = cache(Duration::from_secs(5));
        assert!(cache.get("a.jsonnet").is_none());

        let handle = cache.update("a.jsonnet", 1, "{a: 1}").unwrap();
        handle.await.unwrap();

        let snapshot = cache.get("a.jsonnet").unwrap();
        assert_eq!(snapshot.version, 1);
        assert_eq!(&*snapshot.text, "{a: 1}");
        assert!(snapshot.diagnostics.is_empty());
        assert!(!cache.is_rebuilding("a.jsonnet"));
        assert!(recorder.processing().is_empty());
        assert_eq!(recorder.diagnostics(), vec![(1, 0)]);
    }

    #[tokio::test]
    async fn unchanged_text_is_not_rebuilt() {
        let (cache, recorder) = cache(Duration::from_secs(5));
        cache.update("a.jsonnet", 1, "1").unwrap().await.unwrap();
        assert!(cache.update("a.jsonnet", 2, "1").is_none());
        assert_eq!(cache.get("a.jsonnet").unwrap().version, 1);
        assert_eq!(recorder.diagnostics().len(), 1);
    }

    #[tokio::test]
    async fn invalidate_forces_a_rebuild() {
        let (cache, recorder) = cache(Duration::from_secs(5));
        cache.update("a.jsonnet", 1, "1").unwrap().await.unwrap();
        cache.invalidate("a.jsonnet");
        cache.update("a.jsonnet", 2, "1").unwrap().await.unwrap();
        assert_eq!(cache.get("a.jsonnet").unwrap().version, 2);
        assert_eq!(recorder.diagnostics().len(), 2);
    }

    #[tokio::test]
    async fn diagnostics_are_published_for_broken_text() {
        let (cache, recorder) = cache(Duration::from_secs(5));
        cache.update("a.jsonnet", 1, "local a=1;").unwrap().await.unwrap();
        let snapshot = cache.get("a.jsonnet").unwrap();
        assert!(!snapshot.diagnostics.is_empty());
        assert_eq!(recorder.diagnostics(), vec![(1, snapshot.diagnostics.len())]);
    }

    #[tokio::test]
    async fn newest_update_wins() {
        let (cache, _) = cache(Duration::from_secs(5));
        let cache = cache.with_builder(scripted());

        let slow = cache.update("a.jsonnet", 1, "slow + 1").unwrap();
        let fast = cache.update("a.jsonnet", 2, "2").unwrap();
        fast.await.unwrap();
        assert_eq!(cache.get("a.jsonnet").unwrap().version, 2);

        slow.await.unwrap();
        assert_eq!(cache.get("a.jsonnet").unwrap().version, 2);
        assert!(!cache.is_rebuilding("a.jsonnet"));
    }

    #[tokio::test]
    async fn get_returns_previous_snapshot_while_rebuilding() {
        let (cache, _) = cache(Duration::from_secs(5));
        let cache = cache.with_builder(scripted());
        cache.update("a.jsonnet", 1, "1").unwrap().await.unwrap();

        let pending = cache.update("a.jsonnet", 2, "slow").unwrap();
        assert!(cache.is_rebuilding("a.jsonnet"));
        assert_eq!(cache.get("a.jsonnet").unwrap().version, 1);
        pending.await.unwrap();
        assert_eq!(cache.get("a.jsonnet").unwrap().version, 2);
    }

    #[tokio::test]
    async fn remove_discards_in_flight_result() {
        let (cache, recorder) = cache(Duration::from_secs(5));
        let cache = cache.with_builder(scripted());

        let pending = cache.update("a.jsonnet", 1, "slow").unwrap();
        assert!(cache.remove("a.jsonnet"));
        pending.await.unwrap();

        assert!(cache.get("a.jsonnet").is_none());
        assert!(cache.is_empty());
        assert!(recorder.diagnostics().is_empty());
        assert!(!cache.remove("a.jsonnet"));
    }

    #[tokio::test]
    async fn reopen_discards_result_from_before_close() {
        let (cache, recorder) = cache(Duration::from_secs(5));
        let cache = cache.with_builder(scripted());

        let closed = cache.update("a.jsonnet", 1, "slow").unwrap();
        assert!(cache.remove("a.jsonnet"));
        cache.update("a.jsonnet", 2, "2").unwrap().await.unwrap();
        closed.await.unwrap();

        let snapshot = cache.get("a.jsonnet").unwrap();
        assert_eq!(snapshot.version, 2);
        assert_eq!(&*snapshot.text, "2");
        assert!(!cache.is_rebuilding("a.jsonnet"));
        assert_eq!(recorder.diagnostics(), vec![(2, 0)]);
    }

    #[tokio::test]
    async fn slow_rebuild_notifies_once() {
        let (cache, recorder) = cache(Duration::from_millis(20));
        let cache = cache.with_builder(scripted());

        cache.update("a.jsonnet", 1, "slow").unwrap().await.unwrap();
        assert_eq!(
            recorder.processing(),
            vec![ProcessingStatus::Running, ProcessingStatus::Complete]
        );
        assert_eq!(recorder.diagnostics().len(), 1);
    }

    #[tokio::test]
    async fn fast_rebuild_notifies_nothing() {
        let (cache, recorder) = cache(Duration::from_secs(5));
        cache.update("a.jsonnet", 1, "{}").unwrap().await.unwrap();
        assert!(recorder.processing().is_empty());
    }

    #[tokio::test]
    async fn panicking_rebuild_is_recorded_as_failure() {
        let (cache, recorder) = cache(Duration::from_secs(5));
        let cache = cache.with_builder(scripted());
        cache.update("a.jsonnet", 1, "1").unwrap().await.unwrap();

        cache.update("a.jsonnet", 2, "boom").unwrap().await.unwrap();
        assert_eq!(cache.get("a.jsonnet").unwrap().version, 1);
        let failure = cache.failure("a.jsonnet").unwrap();
        assert_eq!(failure.len(), 1);
        assert!(failure[0].message.starts_with("analysis failed"));
        assert_eq!(recorder.diagnostics(), vec![(1, 0), (2, 1)]);

        cache.update("a.jsonnet", 3, "3").unwrap().await.unwrap();
        assert!(cache.failure("a.jsonnet").is_none());
        assert_eq!(cache.get("a.jsonnet").unwrap().version, 3);
    }

    #[tokio::test]
    async fn desugar_failure_keeps_last_good_tree() {
        let (cache, _) = cache(Duration::from_secs(5));
        cache.update("a.jsonnet", 1, "{a: 1}").unwrap().await.unwrap();
        cache.update("a.jsonnet", 2, "{a: 1, a: 2}").unwrap().await.unwrap();
        assert_eq!(cache.get("a.jsonnet").unwrap().version, 1);
        assert!(cache.failure("a.jsonnet").is_some());
    }
}

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use office_interop::{BatchProvider, ItemReport, friendly_error_hint};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// A file the provider could not process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub path: PathBuf,
    pub error: String,
    pub hint: Option<&'static str>,
}

/// Outcome of a whole batch, in input order.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub processed: Vec<ItemReport>,
    pub failures: Vec<Failure>,
}

impl BatchSummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn total_items(&self) -> usize {
        self.processed.iter().map(|r| r.items).sum()
    }

    pub fn total_shapes_removed(&self) -> usize {
        self.processed.iter().map(|r| r.shapes_removed).sum()
    }

    pub fn warning_count(&self) -> usize {
        self.processed.iter().map(|r| r.warnings.len()).sum()
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for report in &self.processed {
            write!(
                f,
                "ok    {}  items={} shapes={}",
                report.path.display(),
                report.items,
                report.shapes
            )?;
            if report.shapes_removed > 0 {
                write!(f, " removed={}", report.shapes_removed)?;
            }
            if report.saved {
                write!(f, " saved")?;
            }
            writeln!(f)?;
            for warning in &report.warnings {
                writeln!(f, "      warning: {warning}")?;
            }
        }
        for failure in &self.failures {
            writeln!(f, "FAIL  {}  {}", failure.path.display(), failure.error)?;
            if let Some(hint) = failure.hint {
                writeln!(f, "      hint: {hint}")?;
            }
        }
        write!(
            f,
            "{} processed, {} failed, {} items, {} shapes removed, {} warnings",
            self.processed.len(),
            self.failures.len(),
            self.total_items(),
            self.total_shapes_removed(),
            self.warning_count()
        )
    }
}

/// Processes every file, at most `concurrency` at a time. One file failing
/// never stops the others.
pub async fn run_batch(
    provider: Arc<dyn BatchProvider>,
    files: Vec<PathBuf>,
    concurrency: usize,
) -> BatchSummary {
    let permits = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();

    for (position, path) in files.into_iter().enumerate() {
        let provider = Arc::clone(&provider);
        let permits = Arc::clone(&permits);
        tasks.spawn(async move {
            let _permit = permits.acquire_owned().await;
            let result = provider.process(path.clone()).await;
            (position, path, result)
        });
    }

    let mut outcomes = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => error!(error = %e, "batch task failed to complete"),
        }
    }
    outcomes.sort_by_key(|(position, ..)| *position);

    let mut summary = BatchSummary::default();
    for (_, path, result) in outcomes {
        match result {
            Ok(report) => {
                info!(path = %path.display(), items = report.items, "file processed");
                summary.processed.push(report);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "file failed");
                summary.failures.push(Failure {
                    path,
                    hint: friendly_error_hint(&e),
                    error: e.to_string(),
                });
            }
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::*;
    use office_interop::native::{NativeError, codes};
    use office_interop::{InteropError, MockBatchProvider};

    fn report(path: PathBuf, items: usize, removed: usize) -> ItemReport {
        ItemReport {
            path,
            items,
            shapes: removed,
            shapes_removed: removed,
            ..ItemReport::default()
        }
    }

    #[tokio::test]
    async fn test_run_batch_all_succeed() {
        let mut mock = MockBatchProvider::new();
        mock.expect_process()
            .times(3)
            .returning(|path| Ok(report(path, 4, 1)));

        let files = vec!["a.docx".into(), "b.docx".into(), "c.docx".into()];
        let summary = run_batch(Arc::new(mock), files, 2).await;

        assert!(summary.is_success());
        assert_eq!(summary.total_items(), 12);
        assert_eq!(summary.total_shapes_removed(), 3);
        let order: Vec<_> = summary.processed.iter().map(|r| r.path.clone()).collect();
        assert_eq!(order, [PathBuf::from("a.docx"), "b.docx".into(), "c.docx".into()]);
    }

    #[tokio::test]
    async fn test_run_batch_failure_does_not_stop_others() {
        let mut mock = MockBatchProvider::new();
        mock.expect_process()
            .with(eq(PathBuf::from("locked.docx")))
            .times(1)
            .returning(|_| {
                Err(InteropError::native(
                    "call Open",
                    "Documents",
                    NativeError::new(codes::RPC_E_CALL_REJECTED, "Call was rejected by callee."),
                ))
            });
        mock.expect_process()
            .with(eq(PathBuf::from("fine.docx")))
            .times(1)
            .returning(|path| Ok(report(path, 2, 0)));

        let files = vec!["locked.docx".into(), "fine.docx".into()];
        let summary = run_batch(Arc::new(mock), files, 1).await;

        assert!(!summary.is_success());
        assert_eq!(summary.processed.len(), 1);
        assert_eq!(summary.failures.len(), 1);
        let failure = &summary.failures[0];
        assert_eq!(failure.path, PathBuf::from("locked.docx"));
        assert!(failure.error.contains("0x80010001"));
        assert!(failure.hint.unwrap().contains("busy"));
    }

    #[tokio::test]
    async fn test_run_batch_empty() {
        let mock = MockBatchProvider::new();
        let summary = run_batch(Arc::new(mock), Vec::new(), 4).await;
        assert!(summary.is_success());
        assert_eq!(summary.to_string(), "0 processed, 0 failed, 0 items, 0 shapes removed, 0 warnings");
    }

    #[test]
    fn test_summary_display_lists_warnings_and_hints() {
        let mut ok = report("deck.pptx".into(), 3, 1);
        ok.warnings.push("shape 0: denied".into());
        ok.saved = true;
        let summary = BatchSummary {
            processed: vec![ok],
            failures: vec![Failure {
                path: "gone.docx".into(),
                error: "boom".into(),
                hint: Some("try again"),
            }],
        };
        let text = summary.to_string();
        assert!(text.contains("ok    deck.pptx  items=3 shapes=1 removed=1 saved"));
        assert!(text.contains("warning: shape 0: denied"));
        assert!(text.contains("FAIL  gone.docx  boom"));
        assert!(text.contains("hint: try again"));
        assert!(text.ends_with("1 processed, 1 failed, 3 items, 1 shapes removed, 1 warnings"));
    }
}

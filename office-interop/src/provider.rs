//! Document batch jobs and the async provider that runs them.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tracing::{debug, info, warn};

#[cfg(any(test, feature = "test-support"))]
use mockall::automock;

use crate::application::{Application, OfficeApp};
use crate::collection::BatchReport;
use crate::convert::SaveOptions;
use crate::error::{InteropError, InteropResult};
use crate::native::NativeObject;
use crate::powerpoint::Presentation;
use crate::word::Document;
use crate::worker::{ApartmentFactory, ApartmentWorker};
use crate::wrapper::Dispose;

/// What a job does to each file besides inspecting it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobOptions {
    /// Delete every shape in the document, or on every slide.
    pub strip_shapes: bool,
    /// Save the file before closing it. Without this the file opens
    /// read-only.
    pub save: bool,
}

/// Result of processing one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemReport {
    pub path: PathBuf,
    /// Paragraphs for Word documents, slides for presentations.
    pub items: usize,
    pub shapes: usize,
    pub shapes_removed: usize,
    pub saved: bool,
    /// Per-member failures that did not stop the job.
    pub warnings: Vec<String>,
}

impl ItemReport {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            ..Self::default()
        }
    }

    fn absorb(&mut self, what: &str, batch: &BatchReport) {
        for (index, error) in &batch.failed {
            self.warnings.push(format!("{what} {index}: {error}"));
        }
    }
}

/// Async entry point for batch processing.
///
/// Implementations own their Office instances; callers only see paths and
/// reports.
#[cfg_attr(any(test, feature = "test-support"), automock)]
#[async_trait]
pub trait BatchProvider: Send + Sync {
    /// Opens `path`, applies the configured job, and closes it again.
    ///
    /// # Errors
    /// Returns `Err` if the file cannot be opened or the host fails
    /// outside the best-effort steps.
    async fn process(&self, path: PathBuf) -> InteropResult<ItemReport>;
}

/// Runs one job against whichever host `application` drives.
pub fn process_file<H: NativeObject>(
    application: &Application<H>,
    path: &Path,
    options: JobOptions,
) -> InteropResult<ItemReport> {
    match application.kind() {
        OfficeApp::Word => process_word_document(application, path, options),
        OfficeApp::PowerPoint => process_presentation(application, path, options),
        other => Err(InteropError::Unsupported(format!("no batch job for {other}"))),
    }
}

fn path_text(path: &Path) -> InteropResult<&str> {
    path.to_str()
        .ok_or_else(|| InteropError::Conversion(format!("{} is not valid Unicode", path.display())))
}

pub fn process_word_document<H: NativeObject>(
    application: &Application<H>,
    path: &Path,
    options: JobOptions,
) -> InteropResult<ItemReport> {
    let document = application.documents()?.open(path_text(path)?, !options.save)?;
    let report = inspect_document(&document, path, options);
    if let Err(e) = document.close(SaveOptions::DoNotSaveChanges) {
        warn!(path = %path.display(), error = %e, "closing document failed");
        document.dispose();
    }
    report
}

fn inspect_document<H: NativeObject>(
    document: &Document<H>,
    path: &Path,
    options: JobOptions,
) -> InteropResult<ItemReport> {
    let mut report = ItemReport::new(path);
    report.items = count(document.paragraphs()?.count()?);

    let shapes = document.shapes()?;
    report.shapes = count(shapes.count()?);
    if options.strip_shapes {
        let batch = shapes.clear()?;
        report.shapes_removed = batch.succeeded;
        report.absorb("shape", &batch);
    }
    drop(shapes);

    if options.save {
        document.save()?;
        report.saved = document.saved()?;
    }
    debug!(path = %path.display(), paragraphs = report.items, shapes = report.shapes, "document processed");
    Ok(report)
}

pub fn process_presentation<H: NativeObject>(
    application: &Application<H>,
    path: &Path,
    options: JobOptions,
) -> InteropResult<ItemReport> {
    let presentation = application
        .presentations()?
        .open(path_text(path)?, !options.save)?;
    let report = inspect_presentation(&presentation, path, options);
    if let Err(e) = presentation.close() {
        warn!(path = %path.display(), error = %e, "closing presentation failed");
        presentation.dispose();
    }
    report
}

fn inspect_presentation<H: NativeObject>(
    presentation: &Presentation<H>,
    path: &Path,
    options: JobOptions,
) -> InteropResult<ItemReport> {
    let mut report = ItemReport::new(path);
    let slides = presentation.slides()?;
    report.items = count(slides.count()?);

    let mut shapes = 0;
    let mut removed = 0;
    let mut shape_batches = Vec::new();
    let walk = slides.for_each_best_effort(|slide| {
        let slide_shapes = slide.shapes()?;
        shapes += count(slide_shapes.count()?);
        if options.strip_shapes {
            let batch = slide_shapes.clear()?;
            removed += batch.succeeded;
            shape_batches.push(batch);
        }
        Ok(())
    })?;
    report.shapes = shapes;
    report.shapes_removed = removed;
    report.absorb("slide", &walk);
    for batch in &shape_batches {
        report.absorb("shape", batch);
    }
    drop(slides);

    if options.save {
        presentation.save()?;
        report.saved = presentation.saved()?;
    }
    debug!(path = %path.display(), slides = report.items, shapes = report.shapes, "presentation processed");
    Ok(report)
}

fn count(value: i32) -> usize {
    usize::try_from(value).unwrap_or_default()
}

/// A fixed set of apartment workers fed round-robin.
pub struct WorkerPool<F: ApartmentFactory> {
    workers: Vec<ApartmentWorker<F>>,
    next: AtomicUsize,
    options: JobOptions,
}

impl<F: ApartmentFactory + Clone> WorkerPool<F> {
    /// Starts `size` workers, each with its own host instance.
    ///
    /// Blocks until every host is up.
    ///
    /// # Errors
    ///
    /// Returns the first worker start-up failure; workers already started
    /// are shut down again.
    pub fn start(factory: &F, size: usize, options: JobOptions) -> InteropResult<Self> {
        let size = size.max(1);
        let workers = (0..size)
            .map(|i| ApartmentWorker::start(format!("office-worker-{i}"), factory.clone()))
            .collect::<InteropResult<Vec<_>>>()?;
        info!(workers = size, ?options, "worker pool ready");
        Ok(Self {
            workers,
            next: AtomicUsize::new(0),
            options,
        })
    }
}

impl<F: ApartmentFactory> WorkerPool<F> {
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    fn pick(&self) -> InteropResult<&ApartmentWorker<F>> {
        let slot = self.next.fetch_add(1, Ordering::Relaxed) % self.workers.len().max(1);
        self.workers
            .get(slot)
            .ok_or_else(|| InteropError::Internal("worker pool is empty".into()))
    }
}

#[async_trait]
impl<F: ApartmentFactory> BatchProvider for WorkerPool<F> {
    async fn process(&self, path: PathBuf) -> InteropResult<ItemReport> {
        let options = self.options;
        self.pick()?
            .run(move |application| process_file(application, &path, options))
            .await
    }
}

impl<F: ApartmentFactory> std::fmt::Debug for WorkerPool<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers.len())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::codes;
    use crate::testing::{FakeHandle, FakeHost};

    const REPORT: &str = "C:\\docs\\report.docx";

    fn word_with_report() -> (FakeHost, Application<FakeHandle>, usize) {
        let host = FakeHost::word();
        let doc = host.add_document("report.docx", &["one", "two", "three"]);
        host.add_shape(doc, "Logo");
        host.add_shape(doc, "Footer");
        let app = host.application().unwrap();
        (host, app, doc)
    }

    #[test]
    fn word_job_counts_and_closes() {
        let (host, app, doc) = word_with_report();
        let report = process_file(&app, Path::new(REPORT), JobOptions::default()).unwrap();
        assert_eq!(report.items, 3);
        assert_eq!(report.shapes, 2);
        assert_eq!(report.shapes_removed, 0);
        assert!(!report.saved);
        assert!(host.is_deleted(doc), "document should be closed");
        assert_eq!(host.live_references(doc), 0);
        // Only the cached Documents collection is left.
        assert_eq!(app.live_wrappers(), 1);
    }

    #[test]
    fn word_job_strips_and_saves() {
        let (host, app, doc) = word_with_report();
        host.set_property(doc, "Saved", crate::testing::Value::Bool(false));
        let options = JobOptions {
            strip_shapes: true,
            save: true,
        };
        let report = process_file(&app, Path::new(REPORT), options).unwrap();
        assert_eq!(report.shapes_removed, 2);
        assert!(report.saved);
        assert!(report.warnings.is_empty());
        let shapes = host.object(doc, "Shapes");
        assert!(host.members(shapes).is_empty());
    }

    #[test]
    fn failing_shape_becomes_a_warning() {
        let (host, app, doc) = word_with_report();
        let shapes = host.object(doc, "Shapes");
        let logo = host.members(shapes)[0];
        host.fail(logo, "Delete", codes::E_ACCESSDENIED);
        let options = JobOptions {
            strip_shapes: true,
            save: false,
        };
        let report = process_file(&app, Path::new(REPORT), options).unwrap();
        assert_eq!(report.shapes_removed, 1);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].starts_with("shape 0:"));
    }

    #[test]
    fn document_is_closed_even_when_the_job_fails() {
        let (host, app, doc) = word_with_report();
        host.fail(doc, "Save", codes::E_ACCESSDENIED);
        let options = JobOptions {
            strip_shapes: false,
            save: true,
        };
        let err = process_file(&app, Path::new(REPORT), options).unwrap_err();
        assert_eq!(err.native_code(), Some(codes::E_ACCESSDENIED));
        assert!(host.is_deleted(doc));
        assert_eq!(host.live_references(doc), 0);
    }

    #[test]
    fn presentation_job_walks_every_slide() {
        let host = FakeHost::powerpoint();
        let pres = host.add_presentation("deck.pptx", 3);
        let slides = host.object(pres, "Slides");
        for slide in host.members(slides) {
            host.add_shape(slide, "Title");
        }
        let app = host.application().unwrap();
        let options = JobOptions {
            strip_shapes: true,
            save: false,
        };
        let report = process_file(&app, Path::new("C:\\decks\\deck.pptx"), options).unwrap();
        assert_eq!(report.items, 3);
        assert_eq!(report.shapes, 3);
        assert_eq!(report.shapes_removed, 3);
        assert!(host.is_deleted(pres));
        assert_eq!(host.live_references(pres), 0);
        assert_eq!(app.live_wrappers(), 1);
    }

    #[derive(Clone)]
    struct SeededWord;

    impl ApartmentFactory for SeededWord {
        type Native = FakeHandle;
        type Guard = ();

        fn enter(&self) -> InteropResult<()> {
            Ok(())
        }

        fn create(&self) -> InteropResult<Application<FakeHandle>> {
            let host = FakeHost::word();
            for name in ["report.docx", "notes.docx"] {
                host.add_document(name, &["only"]);
            }
            host.application()
        }
    }

    #[tokio::test]
    async fn pool_spreads_files_across_workers() {
        let pool = tokio::task::spawn_blocking(|| WorkerPool::start(&SeededWord, 2, JobOptions::default()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(pool.size(), 2);

        // Each worker has its own copy of both files.
        for path in [REPORT, "C:\\docs\\notes.docx", "C:\\docs\\notes.docx"] {
            let report = pool.process(PathBuf::from(path)).await.unwrap();
            assert_eq!(report.items, 1);
        }
        tokio::task::spawn_blocking(move || drop(pool)).await.unwrap();
    }

    #[tokio::test]
    async fn mock_provider_satisfies_callers() {
        let mut mock = MockBatchProvider::new();
        mock.expect_process().times(1).returning(|path| {
            Ok(ItemReport {
                path,
                items: 7,
                ..ItemReport::default()
            })
        });
        let report = mock.process(PathBuf::from("a.docx")).await.unwrap();
        assert_eq!(report.items, 7);
    }
}

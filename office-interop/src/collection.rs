//! Zero-based, bounds-checked access to the host's one-based collections.

use std::fmt;
use std::marker::PhantomData;

use tracing::{debug, warn};

use crate::error::{InteropError, InteropResult};
use crate::native::{NativeObject, Variant};
use crate::wrapper::{Dispose, Wrapper, WrapperCore};

/// Maps a zero-based index to the host's one-based index, rejecting
/// anything outside `0..count`.
pub fn to_native_index(index: i32, count: i32) -> InteropResult<i32> {
    if index < 0 || index >= count {
        return Err(InteropError::OutOfRange { index, count });
    }
    index
        .checked_add(1)
        .ok_or(InteropError::OutOfRange { index, count })
}

/// Outcome of a best-effort operation over several members.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub succeeded: usize,
    /// Zero-based index and cause of every member that failed.
    pub failed: Vec<(i32, InteropError)>,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    fn record(&mut self, index: i32, result: InteropResult<()>) {
        match result {
            Ok(()) => self.succeeded += 1,
            Err(e) => {
                warn!(index, error = %e, "collection member failed");
                self.failed.push((index, e));
            }
        }
    }
}

/// A host collection whose members wrap as `W`.
///
/// The collection owns only its own reference. Members returned by
/// [`Collection::item`] and the iterator are fresh wrappers owned by the
/// caller.
pub struct Collection<H: NativeObject, W: Wrapper<H>> {
    core: WrapperCore<H>,
    _member: PhantomData<fn() -> W>,
}

impl<H: NativeObject, W: Wrapper<H>> Wrapper<H> for Collection<H, W> {
    const TYPE_NAME: &'static str = W::COLLECTION_NAME;

    fn from_core(core: WrapperCore<H>) -> Self {
        Self {
            core,
            _member: PhantomData,
        }
    }

    fn core(&self) -> &WrapperCore<H> {
        &self.core
    }
}

impl<H: NativeObject, W: Wrapper<H>> Dispose for Collection<H, W> {
    fn dispose(&self) {
        self.core.release();
    }

    fn is_disposed(&self) -> bool {
        self.core.is_disposed()
    }
}

impl<H: NativeObject, W: Wrapper<H>> Collection<H, W> {
    /// Current member count, read from the host on every call.
    pub fn count(&self) -> InteropResult<i32> {
        self.core.get_i32("Count")
    }

    pub fn is_empty(&self) -> InteropResult<bool> {
        self.count().map(|c| c == 0)
    }

    /// Member at zero-based `index`. Out-of-range indices fail before the
    /// host is asked.
    ///
    /// # Errors
    ///
    /// Returns [`InteropError::OutOfRange`] when `index` is outside
    /// `0..count`, and [`InteropError::Native`] when the host fails `Count`
    /// or `Item`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use office_interop::word::Paragraphs;
    /// # use office_interop::{Dispose, InteropResult, NativeObject};
    /// # fn demo<H: NativeObject>(paragraphs: &Paragraphs<H>) -> InteropResult<()> {
    /// // The host's Paragraphs(1).
    /// let first = paragraphs.item(0)?;
    /// println!("{}", first.text()?);
    /// first.dispose();
    /// # Ok(())
    /// # }
    /// ```
    pub fn item(&self, index: i32) -> InteropResult<W> {
        let native = to_native_index(index, self.count()?)?;
        self.fetch(native)
    }

    pub fn first(&self) -> InteropResult<Option<W>> {
        match self.count()? {
            0 => Ok(None),
            _ => self.fetch(1).map(Some),
        }
    }

    pub fn last(&self) -> InteropResult<Option<W>> {
        match self.count()? {
            0 => Ok(None),
            n => self.fetch(n).map(Some),
        }
    }

    fn fetch(&self, native_index: i32) -> InteropResult<W> {
        self.core.required_call("Item", &[Variant::Int(native_index)])
    }

    pub fn iter(&self) -> CollectionIter<'_, H, W> {
        CollectionIter {
            collection: self,
            position: 0,
            done: false,
        }
    }

    /// Calls the host's `Add` with `args` and wraps the new member.
    pub fn add(&self, args: &[Variant<H>]) -> InteropResult<W> {
        self.core.required_call("Add", args)
    }

    /// Deletes the members at the given zero-based indices.
    ///
    /// Every index is validated first; if any is out of range nothing is
    /// deleted. Deletion then runs from the highest index down so earlier
    /// deletions don't shift later targets. A member that fails to delete
    /// is recorded and the rest still run.
    ///
    /// # Errors
    ///
    /// Returns [`InteropError::OutOfRange`] for the first invalid index,
    /// before anything is deleted, and [`InteropError::Native`] when `Count`
    /// fails. Per-member failures land in the report.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use office_interop::shape::Shapes;
    /// # use office_interop::{InteropResult, NativeObject};
    /// # fn demo<H: NativeObject>(shapes: &Shapes<H>) -> InteropResult<()> {
    /// // Deletes Shapes(3), then Shapes(2).
    /// let report = shapes.delete_many(&[1, 2])?;
    /// for (index, error) in &report.failed {
    ///     eprintln!("shape {index}: {error}");
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn delete_many(&self, indices: &[i32]) -> InteropResult<BatchReport> {
        let count = self.count()?;
        let mut targets = indices
            .iter()
            .map(|&i| to_native_index(i, count))
            .collect::<InteropResult<Vec<_>>>()?;
        targets.sort_unstable_by(|a, b| b.cmp(a));
        targets.dedup();
        let mut report = BatchReport::default();
        for native in targets {
            report.record(native - 1, self.delete_at(native));
        }
        debug!(collection = W::COLLECTION_NAME, deleted = report.succeeded, failed = report.failed.len(), "delete_many finished");
        Ok(report)
    }

    /// Deletes every member, last first.
    ///
    /// # Errors
    ///
    /// Returns `Err` only when `Count` fails; member failures are reported.
    pub fn clear(&self) -> InteropResult<BatchReport> {
        let count = self.count()?;
        let mut report = BatchReport::default();
        for native in (1..=count).rev() {
            report.record(native - 1, self.delete_at(native));
        }
        Ok(report)
    }

    fn delete_at(&self, native_index: i32) -> InteropResult<()> {
        let member = self.fetch(native_index)?;
        let result = member.core().call("Delete", &[]).map(drop);
        member.dispose();
        result
    }

    /// Applies `op` to every member, disposing each member afterwards.
    /// Failures are recorded per member instead of stopping the walk.
    ///
    /// # Errors
    ///
    /// Returns `Err` only when `Count` fails.
    pub fn for_each_best_effort(
        &self,
        mut op: impl FnMut(&W) -> InteropResult<()>,
    ) -> InteropResult<BatchReport> {
        let count = self.count()?;
        let mut report = BatchReport::default();
        for native in 1..=count {
            let result = self.fetch(native).and_then(|member| {
                let result = op(&member);
                member.dispose();
                result
            });
            report.record(native - 1, result);
        }
        Ok(report)
    }
}

impl<'a, H: NativeObject, W: Wrapper<H>> IntoIterator for &'a Collection<H, W> {
    type Item = InteropResult<W>;
    type IntoIter = CollectionIter<'a, H, W>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<H: NativeObject, W: Wrapper<H>> fmt::Debug for Collection<H, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(W::COLLECTION_NAME)
            .field("disposed", &self.core.is_disposed())
            .finish_non_exhaustive()
    }
}

/// Iterator over a live collection.
///
/// `Count` is re-read before every step, so members added or removed during
/// iteration are seen. A failure is yielded once and ends the iteration.
pub struct CollectionIter<'a, H: NativeObject, W: Wrapper<H>> {
    collection: &'a Collection<H, W>,
    position: i32,
    done: bool,
}

impl<H: NativeObject, W: Wrapper<H>> Iterator for CollectionIter<'_, H, W> {
    type Item = InteropResult<W>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let count = match self.collection.count() {
            Ok(count) => count,
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };
        if self.position >= count {
            self.done = true;
            return None;
        }
        self.position += 1;
        let item = self.collection.fetch(self.position);
        if item.is_err() {
            self.done = true;
        }
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_index_is_one_based() {
        assert_eq!(to_native_index(0, 3).unwrap(), 1);
        assert_eq!(to_native_index(2, 3).unwrap(), 3);
    }

    #[test]
    fn out_of_range_indices_are_rejected() {
        for (index, count) in [(-1, 3), (3, 3), (0, 0), (i32::MAX, i32::MAX), (i32::MIN, 5)] {
            let err = to_native_index(index, count).unwrap_err();
            assert!(
                matches!(err, InteropError::OutOfRange { index: i, count: c } if i == index && c == count),
                "{index}/{count}"
            );
        }
    }

    #[test]
    fn every_valid_index_maps_into_host_range() {
        for count in 0..20 {
            for index in -2..count + 2 {
                match to_native_index(index, count) {
                    Ok(native) => assert!((1..=count).contains(&native)),
                    Err(_) => assert!(index < 0 || index >= count),
                }
            }
        }
    }
}

use super::{BlockSource, DataSource, SourceResult};
use crate::data::{collate_block, DataResult, RawSample, TimeSeriesBlock};

/// Function-pointer form of the default collation.
pub type CollateFn = fn(RawSample) -> DataResult<TimeSeriesBlock>;

/// Wraps a [`DataSource`] with a collation function and an optional block limit.
pub struct StreamDataLoader<S, F = CollateFn> {
    source: S,
    collate: F,
    max_blocks: Option<usize>,
    consumed: usize,
    exhausted: bool,
}

impl<S> StreamDataLoader<S>
where
    S: DataSource<Item = RawSample>,
{
    /// Loader using [`collate_block`].
    pub fn new(source: S) -> Self {
        Self::with_collate(source, collate_block as CollateFn)
    }
}

impl<S, F> StreamDataLoader<S, F>
where
    S: DataSource,
    F: FnMut(S::Item) -> DataResult<TimeSeriesBlock> + Send,
{
    pub fn with_collate(source: S, collate: F) -> Self {
        Self {
            source,
            collate,
            max_blocks: None,
            consumed: 0,
            exhausted: false,
        }
    }

    /// Stop after `max_blocks` raw items.
    pub fn max_blocks(mut self, max_blocks: usize) -> Self {
        self.max_blocks = Some(max_blocks);
        self
    }

    /// Raw items pulled since construction or the last reset.
    pub fn consumed_blocks(&self) -> usize {
        self.consumed
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

impl<S, F> BlockSource for StreamDataLoader<S, F>
where
    S: DataSource,
    F: FnMut(S::Item) -> DataResult<TimeSeriesBlock> + Send,
{
    fn next_block(&mut self) -> SourceResult<Option<TimeSeriesBlock>> {
        if self.exhausted {
            return Ok(None);
        }
        if self.max_blocks.is_some_and(|max| self.consumed >= max) {
            self.exhausted = true;
            return Ok(None);
        }
        let Some(raw) = self.source.next_raw_block()? else {
            self.exhausted = true;
            return Ok(None);
        };
        self.consumed += 1;
        Ok(Some((self.collate)(raw)?))
    }

    fn reset(&mut self) -> SourceResult<()> {
        self.source.reset()?;
        self.consumed = 0;
        self.exhausted = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataError, Samples};
    use crate::source::{OnceSource, SourceError, VecSource};

    fn raw(v: f64) -> RawSample {
        serde_json::json!({"values": [v], "sample_rate": 1.0, "timestamp": 0}).into()
    }

    #[test]
    fn test_max_blocks() {
        let mut loader = StreamDataLoader::new(VecSource::new((0..5).map(f64::from).map(raw).collect()))
            .max_blocks(2);
        assert!(loader.next_block().unwrap().is_some());
        assert!(loader.next_block().unwrap().is_some());
        assert!(loader.next_block().unwrap().is_none());
        assert!(loader.is_exhausted());
        assert_eq!(loader.consumed_blocks(), 2);
    }

    #[test]
    fn test_reset_rewinds() {
        let mut loader = StreamDataLoader::new(VecSource::new(vec![raw(1.0)]));
        assert!(loader.next_block().unwrap().is_some());
        assert!(loader.next_block().unwrap().is_none());
        loader.reset().unwrap();
        assert!(!loader.is_exhausted());
        assert_eq!(loader.consumed_blocks(), 0);
        assert!(loader.next_block().unwrap().is_some());
    }

    #[test]
    fn test_reset_unsupported_propagates() {
        let mut loader = StreamDataLoader::new(OnceSource::new(vec![raw(1.0)].into_iter()));
        assert!(matches!(loader.reset(), Err(SourceError::Unsupported)));
    }

    #[test]
    fn test_collation_failure_is_data_error() {
        let bad: RawSample = serde_json::json!(42).into();
        let mut loader = StreamDataLoader::new(VecSource::new(vec![bad, raw(1.0)]));
        let err = loader.next_block().unwrap_err();
        assert!(matches!(err, SourceError::Data(DataError::UnsupportedSample(_))));
        assert!(err.is_recoverable());
        assert!(loader.next_block().unwrap().is_some());
    }

    #[test]
    fn test_custom_collate() {
        let mut loader = StreamDataLoader::with_collate(VecSource::new(vec![3usize]), |n: usize| {
            TimeSeriesBlock::new(Samples::from_vec(vec![0.0; n]), 10.0, 0.0)
        });
        assert_eq!(loader.next_block().unwrap().unwrap().block_size(), 3);
    }
}

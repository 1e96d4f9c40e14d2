//! In-memory and iterator-backed sources.

use super::{DataSource, SourceResult};

/// Items held in a `Vec`, optionally repeated forever.
pub struct VecSource<T> {
    items: Vec<T>,
    position: usize,
    cycle: bool,
}

impl<T: Clone + Send> VecSource<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            position: 0,
            cycle: false,
        }
    }

    /// Restart from the first item instead of ending.
    pub fn cycle(mut self, cycle: bool) -> Self {
        self.cycle = cycle;
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T: Clone + Send> DataSource for VecSource<T> {
    type Item = T;

    fn next_raw_block(&mut self) -> SourceResult<Option<T>> {
        if self.position >= self.items.len() {
            if !self.cycle || self.items.is_empty() {
                return Ok(None);
            }
            self.position = 0;
        }
        let item = self.items[self.position].clone();
        self.position += 1;
        Ok(Some(item))
    }

    fn reset(&mut self) -> SourceResult<()> {
        self.position = 0;
        Ok(())
    }
}

/// Iterator recreated from a factory on every reset.
pub struct IteratorSource<F, I> {
    factory: F,
    current: Option<I>,
}

impl<F, I> IteratorSource<F, I>
where
    F: FnMut() -> I + Send,
    I: Iterator + Send,
{
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            current: None,
        }
    }
}

impl<F, I> DataSource for IteratorSource<F, I>
where
    F: FnMut() -> I + Send,
    I: Iterator + Send,
{
    type Item = I::Item;

    fn next_raw_block(&mut self) -> SourceResult<Option<I::Item>> {
        let iter = self.current.get_or_insert_with(&mut self.factory);
        Ok(iter.next())
    }

    fn reset(&mut self) -> SourceResult<()> {
        self.current = None;
        Ok(())
    }
}

/// One-shot iterator. Cannot be rewound.
pub struct OnceSource<I> {
    iter: I,
}

impl<I: Iterator + Send> OnceSource<I> {
    pub fn new(iter: I) -> Self {
        Self { iter }
    }
}

impl<I: Iterator + Send> DataSource for OnceSource<I> {
    type Item = I::Item;

    fn next_raw_block(&mut self) -> SourceResult<Option<I::Item>> {
        Ok(self.iter.next())
    }
}

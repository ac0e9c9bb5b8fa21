use derive_where::derive_where;
use serde::{Deserialize, Serialize};

// the whole point of keeping a log instead of the subject itself: a branch is
// a `Vec` of events, and a clone of it never shares storage with its origin
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive_where(Default)]
pub struct History<E> {
    timeline: Vec<E>,
    cursor: usize,
}

impl<E> History<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_event(&mut self, event: E) {
        self.timeline.push(event)
    }

    // idempotent
    pub fn restart(&mut self) {
        self.cursor = 0
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.timeline.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timeline.is_empty()
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.timeline.len()
    }

    pub fn timeline(&self) -> &[E] {
        &self.timeline
    }

    /// Events from the cursor to the end of the timeline.
    ///
    /// The cursor moves along as the iterator is consumed, so dropping the
    /// iterator half way leaves the history positioned at the first event
    /// that was not taken.
    pub fn events(&mut self) -> Events<'_, E> {
        Events { history: self }
    }
}

impl<E: Clone> History<E> {
    /// A copy of this history extended with `event`, rewound to replay from
    /// the start.
    pub fn fork(&self, event: E) -> Self {
        let mut history = self.clone();
        history.add_event(event);
        history.restart();
        history
    }
}

impl<E> FromIterator<E> for History<E> {
    fn from_iter<T: IntoIterator<Item = E>>(iter: T) -> Self {
        Self {
            timeline: iter.into_iter().collect(),
            cursor: 0,
        }
    }
}

#[derive(Debug)]
pub struct Events<'a, E> {
    history: &'a mut History<E>,
}

impl<E: Clone> Iterator for Events<'_, E> {
    type Item = E;

    fn next(&mut self) -> Option<Self::Item> {
        let event = self.history.timeline.get(self.history.cursor)?.clone();
        self.history.cursor += 1;
        Some(event)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.history.len().saturating_sub(self.history.cursor);
        (remaining, Some(remaining))
    }
}

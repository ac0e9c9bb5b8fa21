pub mod replay;

use std::{collections::VecDeque, num::NonZeroUsize};

use derive_more::Display;
use derive_where::derive_where;
use tracing::{debug, trace, warn};

use crate::history::History;

use self::replay::{advance_one, align, Outcome};

/// A nondeterministic state machine explored by [`Execute`].
///
/// Replaying the same events into a fresh instance must reach the same state,
/// and `next_events` must list candidates in the same order every time it is
/// asked from the same state. The first candidate is continued in place, the
/// others are replayed later from scratch.
///
/// The state space must have finite depth: every path has to end up done,
/// errored or without candidates. Nothing detects cycles.
pub trait Subject {
    type Event;

    fn has_error(&self) -> bool;

    /// Returns whether the subject is done after the event.
    fn apply_event(&mut self, event: Self::Event) -> bool;

    fn next_events(&self) -> Vec<Self::Event>;
}

#[derive_where(Debug; S, S::Event)]
pub struct Pair<S: Subject> {
    pub history: History<S::Event>,
    pub subject: S,
}

impl<S: Subject> Pair<S> {
    pub fn new(subject: S) -> Self {
        Self::branch(History::new(), subject)
    }

    pub fn branch(history: History<S::Event>, subject: S) -> Self {
        Self { history, subject }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Order {
    #[default]
    BreadthFirst,
    DepthFirst,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub order: Order,
    // counted in events applied to subjects, replayed ones included. checked
    // before popping a branch and before each fresh event, but a replay that
    // has started runs to its end, so the count may overshoot by one path
    pub max_steps: Option<NonZeroUsize>,
    pub emit_starved: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            order: Default::default(),
            max_steps: None,
            emit_starved: true,
        }
    }
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Termination {
    Done,
    Errored,
    // no candidate events while neither done nor errored
    Starved,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stats {
    pub replayed: usize,
    pub applied: usize,
    pub branched: usize,
    pub done: usize,
    pub errored: usize,
    pub starved: usize,
}

/// Exhaustive search over every path of the subjects built by `init`.
///
/// Yields subjects that end up done as soon as they are found, then the
/// errored and starved ones once nothing is left to explore. Work only happens
/// while the iterator is pulled.
pub struct Execute<S: Subject, F> {
    init: F,
    settings: Settings,
    seeded: bool,
    queue: VecDeque<Pair<S>>,
    invalid: VecDeque<(Termination, S)>,
    stats: Stats,
    truncated: bool,
    exhausted: bool,
}

pub fn execute<S, F>(init: F) -> Execute<S, F>
where
    S: Subject,
    S::Event: Clone,
    F: FnMut() -> S,
{
    Execute::new(init, Default::default())
}

impl<S, F> Execute<S, F>
where
    S: Subject,
    S::Event: Clone,
    F: FnMut() -> S,
{
    pub fn new(init: F, settings: Settings) -> Self {
        Self {
            init,
            settings,
            seeded: false,
            queue: Default::default(),
            invalid: Default::default(),
            stats: Default::default(),
            truncated: false,
            exhausted: false,
        }
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn classified(self) -> Classified<S, F> {
        Classified(self)
    }

    pub fn next_terminal(&mut self) -> Option<(Termination, S)> {
        if !self.seeded {
            self.seeded = true;
            let subject = (self.init)();
            self.queue.push_back(Pair::new(subject))
        }
        while !self.budget_exhausted() {
            let Some(mut pair) = self.pop() else {
                break;
            };
            let outcome = align(&mut pair.history, &mut pair.subject);
            self.stats.replayed += pair.history.cursor();
            match outcome {
                Outcome::Continue => {
                    if let Some(subject) = self.extend(pair) {
                        return Some((Termination::Done, subject));
                    }
                }
                Outcome::Done => {
                    self.stats.done += 1;
                    return Some((Termination::Done, pair.subject));
                }
                Outcome::Errored => self.file(Termination::Errored, pair.subject),
                Outcome::ReplayExhausted => unreachable!("align never exhausts replay"),
            }
        }
        if !self.exhausted {
            self.exhausted = true;
            debug!(stats = ?self.stats, truncated = self.truncated, "search exhausted");
        }
        self.invalid.pop_front()
    }

    fn pop(&mut self) -> Option<Pair<S>> {
        match self.settings.order {
            Order::BreadthFirst => self.queue.pop_front(),
            Order::DepthFirst => self.queue.pop_back(),
        }
    }

    // keep applying the first candidate to the same subject, deferring the
    // rest, until the subject leaves the search. returns it if it is done
    fn extend(&mut self, mut pair: Pair<S>) -> Option<S> {
        loop {
            if self.budget_exhausted() {
                return None;
            }
            let mut events = pair.subject.next_events().into_iter();
            let Some(head) = events.next() else {
                self.file(Termination::Starved, pair.subject);
                return None;
            };
            for event in events {
                let history = pair.history.fork(event);
                trace!(depth = history.len(), "branch");
                self.stats.branched += 1;
                self.queue.push_back(Pair::branch(history, (self.init)()))
            }
            pair.history.add_event(head);
            self.stats.applied += 1;
            match advance_one(&mut pair.history, &mut pair.subject) {
                Outcome::Continue => {}
                Outcome::Done => {
                    self.stats.done += 1;
                    return Some(pair.subject);
                }
                Outcome::Errored => {
                    self.file(Termination::Errored, pair.subject);
                    return None;
                }
                Outcome::ReplayExhausted => unreachable!("appended event is always pending"),
            }
        }
    }

    fn file(&mut self, termination: Termination, subject: S) {
        trace!(%termination, "filed");
        match termination {
            Termination::Done => unreachable!(),
            Termination::Errored => self.stats.errored += 1,
            Termination::Starved => {
                self.stats.starved += 1;
                if !self.settings.emit_starved {
                    return;
                }
            }
        }
        self.invalid.push_back((termination, subject))
    }

    fn budget_exhausted(&mut self) -> bool {
        let Some(max_steps) = self.settings.max_steps else {
            return false;
        };
        let steps = self.stats.replayed + self.stats.applied;
        if steps < max_steps.get() {
            return false;
        }
        if !self.truncated {
            warn!(steps, pending = self.queue.len(), "step budget exhausted");
            self.truncated = true;
            self.queue.clear()
        }
        true
    }
}

impl<S, F> Iterator for Execute<S, F>
where
    S: Subject,
    S::Event: Clone,
    F: FnMut() -> S,
{
    type Item = S;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_terminal().map(|(_, subject)| subject)
    }
}

pub struct Classified<S: Subject, F>(Execute<S, F>);

impl<S: Subject, F> Classified<S, F> {
    pub fn stats(&self) -> &Stats {
        &self.0.stats
    }

    pub fn is_truncated(&self) -> bool {
        self.0.truncated
    }
}

impl<S, F> Iterator for Classified<S, F>
where
    S: Subject,
    S::Event: Clone,
    F: FnMut() -> S,
{
    type Item = (Termination, S);

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next_terminal()
    }
}

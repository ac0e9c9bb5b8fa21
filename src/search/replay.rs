use derive_more::{Display, Error};

use crate::history::History;

use super::Subject;

#[derive(Debug, Display, Error)]
pub struct HistoryEnded;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Continue,
    Done,
    Errored,
    ReplayExhausted,
}

impl Outcome {
    pub fn into_result(self) -> anyhow::Result<Self> {
        match self {
            Self::ReplayExhausted => anyhow::bail!(HistoryEnded),
            outcome => Ok(outcome),
        }
    }
}

/// Apply the event under the cursor of `history` to `subject`.
///
/// Error takes precedence over completion: a subject that reports both after
/// the event is `Errored`.
pub fn advance_one<S: Subject>(history: &mut History<S::Event>, subject: &mut S) -> Outcome
where
    S::Event: Clone,
{
    let Some(event) = history.events().next() else {
        return Outcome::ReplayExhausted;
    };
    let done = subject.apply_event(event);
    if subject.has_error() {
        Outcome::Errored
    } else if done {
        Outcome::Done
    } else {
        Outcome::Continue
    }
}

/// Replay the rest of `history` into `subject`.
///
/// Returns `Continue` once the cursor reaches the end, i.e. the subject is
/// caught up and ready to propose events, or the first terminal outcome met on
/// the way. Never returns `ReplayExhausted`.
pub fn align<S: Subject>(history: &mut History<S::Event>, subject: &mut S) -> Outcome
where
    S::Event: Clone,
{
    while !history.is_exhausted() {
        match advance_one(history, subject) {
            Outcome::Continue => {}
            outcome => return outcome,
        }
    }
    Outcome::Continue
}

#[cfg(test)]
mod tests {
    use super::*;

    // counts up by the applied amounts, done at `goal`, broken past it
    #[derive(Debug, Default)]
    struct Counter {
        value: u32,
        goal: u32,
    }

    impl Subject for Counter {
        type Event = u32;

        fn has_error(&self) -> bool {
            self.value > self.goal
        }

        fn apply_event(&mut self, event: Self::Event) -> bool {
            self.value += event;
            self.value == self.goal
        }

        fn next_events(&self) -> Vec<Self::Event> {
            vec![1, 2]
        }
    }

    #[test]
    fn advance_outcomes() -> anyhow::Result<()> {
        let mut history = History::from_iter([1, 1, 5]);
        let mut counter = Counter {
            goal: 2,
            ..Default::default()
        };
        anyhow::ensure!(advance_one(&mut history, &mut counter) == Outcome::Continue);
        anyhow::ensure!(advance_one(&mut history, &mut counter) == Outcome::Done);
        anyhow::ensure!(advance_one(&mut history, &mut counter) == Outcome::Errored);
        anyhow::ensure!(history.cursor() == 3);
        anyhow::ensure!(advance_one(&mut history, &mut counter) == Outcome::ReplayExhausted);
        anyhow::ensure!(history.cursor() == 3);
        Ok(())
    }

    #[test]
    fn exhausted_into_error() -> anyhow::Result<()> {
        let err = Outcome::ReplayExhausted.into_result().unwrap_err();
        anyhow::ensure!(err.is::<HistoryEnded>());
        anyhow::ensure!(Outcome::Done.into_result()? == Outcome::Done);
        Ok(())
    }

    #[test]
    fn align_catches_up() -> anyhow::Result<()> {
        let mut history = History::from_iter([2, 1, 2]);
        let mut counter = Counter {
            goal: 10,
            ..Default::default()
        };
        anyhow::ensure!(align(&mut history, &mut counter) == Outcome::Continue);
        anyhow::ensure!(counter.value == 5);
        anyhow::ensure!(history.is_exhausted());
        // nothing left to replay
        anyhow::ensure!(align(&mut history, &mut counter) == Outcome::Continue);
        anyhow::ensure!(counter.value == 5);
        Ok(())
    }

    #[test]
    fn align_stops_at_terminal() -> anyhow::Result<()> {
        let mut history = History::from_iter([2, 1, 2]);
        let mut counter = Counter {
            goal: 3,
            ..Default::default()
        };
        anyhow::ensure!(align(&mut history, &mut counter) == Outcome::Done);
        anyhow::ensure!(history.cursor() == 2);

        history.restart();
        let mut counter = Counter {
            goal: 1,
            ..Default::default()
        };
        anyhow::ensure!(align(&mut history, &mut counter) == Outcome::Errored);
        anyhow::ensure!(history.cursor() == 1);
        Ok(())
    }

    #[test]
    fn align_matches_direct_apply() -> anyhow::Result<()> {
        let events = [1, 2, 2, 1];
        let mut direct = Counter {
            goal: 100,
            ..Default::default()
        };
        for event in events {
            direct.apply_event(event);
        }
        let mut history = History::from_iter(events);
        let mut replayed = Counter {
            goal: 100,
            ..Default::default()
        };
        align(&mut history, &mut replayed);
        anyhow::ensure!(replayed.value == direct.value);
        Ok(())
    }
}

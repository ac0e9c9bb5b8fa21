use std::sync::Arc;

use derive_where::derive_where;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::search::{Execute, Settings, Subject, Termination};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Deref)]
#[derive_where(Default)]
pub struct Team<M>(Vec<M>);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Deref)]
#[derive_where(Default)]
pub struct League<M>(Vec<Team<M>>);

impl<M: Ord + Clone> League<M> {
    // teams and members are unordered, this is the representative to compare
    // leagues with
    pub fn sorted(&self) -> Self {
        let mut teams = self
            .0
            .iter()
            .map(|Team(members)| {
                let mut members = members.clone();
                members.sort();
                Team(members)
            })
            .collect::<Vec<_>>();
        teams.sort_by(|Team(a), Team(b)| a.cmp(b));
        Self(teams)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Placement {
    Join(usize),
    New,
}

/// Places roster members into teams one at a time, never putting two enemies
/// on the same team.
///
/// Candidates for the next member are worked out right after each placement,
/// so a failing enemy check turns the subject errored before it is asked for
/// events.
#[derive_where(Debug; M)]
pub struct Active<M, F> {
    roster: Arc<[M]>,
    #[derive_where(skip)]
    are_enemy: Arc<F>,
    pos: usize,
    league: League<M>,
    candidates: Vec<Placement>,
    error: Option<anyhow::Error>,
}

impl<M, F> Active<M, F>
where
    M: Clone,
    F: Fn(&M, &M) -> anyhow::Result<bool>,
{
    pub fn new(roster: Arc<[M]>, are_enemy: Arc<F>) -> Self {
        let mut active = Self {
            roster,
            are_enemy,
            pos: 0,
            league: Default::default(),
            candidates: Default::default(),
            error: None,
        };
        active.propose();
        active
    }

    fn propose(&mut self) {
        self.candidates.clear();
        let Some(member) = self.roster.get(self.pos) else {
            return;
        };
        'teams: for (index, Team(members)) in self.league.0.iter().enumerate() {
            for other in members {
                match (self.are_enemy)(other, member) {
                    Ok(false) => {}
                    Ok(true) => continue 'teams,
                    Err(err) => {
                        self.error = Some(err.context(format!("check enemy for team {index}")));
                        self.candidates.clear();
                        return;
                    }
                }
            }
            self.candidates.push(Placement::Join(index))
        }
        self.candidates.push(Placement::New)
    }
}

impl<M, F> Active<M, F> {
    pub fn league(&self) -> &League<M> {
        &self.league
    }

    pub fn into_league(self) -> League<M> {
        self.league
    }

    pub fn error(&self) -> Option<&anyhow::Error> {
        self.error.as_ref()
    }

    pub fn is_complete(&self) -> bool {
        self.pos == self.roster.len()
    }
}

impl<M, F> Subject for Active<M, F>
where
    M: Clone,
    F: Fn(&M, &M) -> anyhow::Result<bool>,
{
    type Event = Placement;

    fn has_error(&self) -> bool {
        self.error.is_some()
    }

    fn apply_event(&mut self, event: Self::Event) -> bool {
        let Some(member) = self.roster.get(self.pos).cloned() else {
            self.error = Some(anyhow::anyhow!("no member left to place"));
            return false;
        };
        match event {
            Placement::Join(index) => {
                let Some(Team(members)) = self.league.0.get_mut(index) else {
                    self.error = Some(anyhow::anyhow!("missing team {index}"));
                    return false;
                };
                members.push(member)
            }
            Placement::New => self.league.0.push(Team(vec![member])),
        }
        self.pos += 1;
        self.propose();
        self.is_complete()
    }

    fn next_events(&self) -> Vec<Self::Event> {
        self.candidates.clone()
    }
}

/// Every way to split `roster` into teams without enemies sharing a team,
/// subjects that hit a failing enemy check included.
pub fn leagues<M, F>(
    roster: impl IntoIterator<Item = M>,
    are_enemy: F,
    settings: Settings,
) -> Execute<Active<M, F>, impl FnMut() -> Active<M, F>>
where
    M: Clone,
    F: Fn(&M, &M) -> anyhow::Result<bool>,
{
    let roster = roster.into_iter().collect::<Arc<[M]>>();
    let are_enemy = Arc::new(are_enemy);
    Execute::new(
        move || Active::new(roster.clone(), are_enemy.clone()),
        settings,
    )
}

pub fn evaluate_teams<M, F>(
    roster: impl IntoIterator<Item = M>,
    are_enemy: F,
    filters: &[Filter<'_, M>],
) -> Vec<League<M>>
where
    M: Clone,
    F: Fn(&M, &M) -> anyhow::Result<bool>,
{
    evaluate_teams_with(roster, are_enemy, filters, Default::default())
}

pub fn evaluate_teams_with<M, F>(
    roster: impl IntoIterator<Item = M>,
    are_enemy: F,
    filters: &[Filter<'_, M>],
    settings: Settings,
) -> Vec<League<M>>
where
    M: Clone,
    F: Fn(&M, &M) -> anyhow::Result<bool>,
{
    let roster = roster.into_iter().collect::<Vec<_>>();
    let mut found = if roster.is_empty() {
        // nothing to place, and a subject only finishes by placing someone
        vec![League::default()]
    } else {
        let mut classified = leagues(roster, are_enemy, settings).classified();
        let done = classified
            .by_ref()
            .filter(|(termination, _)| *termination == Termination::Done)
            .map(|(_, active)| active.into_league())
            .collect::<Vec<_>>();
        debug!(leagues = done.len(), stats = ?classified.stats(), "evaluated teams");
        done
    };
    for filter in filters {
        found.retain(|league| filter(league))
    }
    found
}

pub type Filter<'a, M> = Box<dyn Fn(&League<M>) -> bool + 'a>;

pub fn with_n_teams<'a, M: 'a>(n: usize) -> Filter<'a, M> {
    Box::new(move |league: &League<M>| league.len() == n)
}

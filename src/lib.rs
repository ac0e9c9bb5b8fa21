pub mod history;
pub mod search;
pub mod team;

pub use history::History;
pub use search::{execute, Execute, Settings, Subject};

// develop notes that does not apply to any specific code
//
// the search never clones a subject. a branch is remembered as the list of
// events that leads to it, and is brought back by feeding that list into a
// fresh subject from the init closure. this is why `Subject` asks for so
// little (no `Clone`, no `Hash`), and also why it asks for determinism: a
// subject that does anything different the second time silently explores a
// different tree
//
// the first candidate at every decision point continues on the live subject,
// which is most of the work for narrow trees. the remaining candidates pay
// one replay each when they are popped. the queue holds (history, subject)
// pairs that share nothing with each other, so handing them to workers later
// is not blocked by anything in the data layout. there is no worker pool yet,
// single thread and pull based is enough for the team solver
//
// errored and starved subjects are held back until the queue is empty, so a
// consumer that only wants successful results can stop pulling at the first
// non-done item when reading through `classified`

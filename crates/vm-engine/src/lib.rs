//! vm-engine: the version-consolidation engine.
//!
//! Items of one kind are read from a [`vm_core::Catalog`], partitioned into
//! duplicate groups, and each group is converged to one primary version
//! with every other member linked under it as an alternate. The split
//! operator reverses that linkage.
//!
//! The batch entry points live in [`driver`]; the building blocks are
//! public so callers can run a single stage (e.g. [`split::split_item`]).

pub mod driver;
pub mod election;
pub mod grouping;
pub mod memory;
pub mod progress;
pub mod reader;
pub mod reconcile;
pub mod split;

pub use driver::{merge_episodes, merge_movies, split_episodes, split_movies, MergeReport, SplitReport};
pub use election::elect_primary;
pub use grouping::{build_groups, Group, GroupingKey};
pub use memory::MemoryCatalog;
pub use progress::ProgressSink;
pub use reconcile::{reconcile_group, GroupOutcome, GroupStatus};
pub use split::{split_item, SplitOutcome};

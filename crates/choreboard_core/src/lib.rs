pub mod classify;
pub mod domain;
pub mod ingest;
pub mod ports;
pub mod time;
pub mod views;

pub use classify::{classify, my_chores, my_immediate_chores, Classification};
pub use domain::{
    ArcadeSession, Chore, ChoreAction, ChoreLeaderboard, ChoreStatus, Completion, HighScore,
    LastCompletion, RankedUser, Snapshot, User, UserRef,
};
pub use ports::{ChoreBoardService, PortError, PortResult};
pub use views::{build_views, Breakdown, PointsPeriod, UserViews, ViewCounts, ViewSet};

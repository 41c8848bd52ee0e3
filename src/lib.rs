// ============================================================================
// cmdb-topo Library
// ============================================================================

pub mod config;
pub mod core;
pub mod cursor;
pub mod host;
pub mod migration;
pub mod storage;
pub mod topology;

// Re-export main types for convenience
pub use config::TopoConfig;
pub use core::{
    CancelHandle, HostPage, HostRecord, Record, RequestContext, Result, Stage, TopoError, Value,
};
pub use cursor::{CursorMode, CursorReport, PageCursor};
pub use host::{HostModuleFind, HostService, ListHosts, ListHostsParameter, ListHostsWithNoBizParameter, Page};
pub use migration::{MigrationReport, StepOutcome, UpgradeStep, Upgrader};
pub use storage::{Filter, FindOptions, Fixture, InMemoryStore, IndexSpec, Store};
pub use topology::{HostTopo, HostTopoResult, ModuleTopo, SetTopo, build_host_topology};

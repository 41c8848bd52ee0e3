pub mod context;
pub mod error;
pub mod ids;
pub mod types;
pub mod value;

pub use context::{CancelHandle, RequestContext};
pub use error::{Result, Stage, TopoError};
pub use types::{HostPage, HostRecord, NamedNode, RelationRow};
pub use value::{Record, Value};

//! Host inventory listing and the business topology query.

mod params;
mod service;

pub use params::{
    HostModuleFind, ListHosts, ListHostsParameter, ListHostsWithNoBizParameter, Page,
};
pub use service::HostService;

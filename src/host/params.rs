use crate::config::NO_LIMIT;
use crate::core::{Result, TopoError};
use crate::storage::Filter;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub start: usize,
    #[serde(default)]
    pub limit: usize,
    /// Sort field, `-` prefix for descending. Defaults to `bk_host_id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
}

impl Page {
    pub fn new(start: usize, limit: usize) -> Self {
        Self {
            start,
            limit,
            sort: None,
        }
    }

    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    /// A zero limit, or one above `max_limit` other than [`NO_LIMIT`].
    pub fn is_illegal(&self, max_limit: usize) -> bool {
        self.limit == 0 || (self.limit > max_limit && self.limit != NO_LIMIT)
    }

    pub fn validate(&self, max_limit: usize) -> Result<()> {
        if self.is_illegal(max_limit) {
            return Err(TopoError::Validation("page.limit".to_string()));
        }
        Ok(())
    }

    pub(crate) fn effective_limit(&self) -> Option<usize> {
        (self.limit != NO_LIMIT).then_some(self.limit)
    }
}

/// Host listing under a business.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListHostsParameter {
    #[serde(default, rename = "bk_set_ids")]
    pub set_ids: Option<Vec<i64>>,
    #[serde(default)]
    pub set_cond: Option<Filter>,
    #[serde(default, rename = "bk_module_ids")]
    pub module_ids: Vec<i64>,
    #[serde(default)]
    pub host_property_filter: Option<Filter>,
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub page: Page,
}

impl ListHostsParameter {
    /// `bk_set_ids` and `set_cond` are mutually exclusive.
    pub fn validate(&self) -> Result<()> {
        let has_set_ids = self.set_ids.as_ref().is_some_and(|ids| !ids.is_empty());
        let has_set_cond = self
            .set_cond
            .as_ref()
            .is_some_and(|cond| *cond != Filter::All);
        if has_set_ids && has_set_cond {
            return Err(TopoError::Validation(
                "bk_set_ids and set_cond can't both be set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Host listing with no business scoping; also the input of the
/// business topology query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListHostsWithNoBizParameter {
    #[serde(default)]
    pub host_property_filter: Option<Filter>,
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub page: Page,
}

/// Hosts placed in any of `module_ids` of a business.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostModuleFind {
    #[serde(rename = "bk_biz_id")]
    pub biz_id: i64,
    #[serde(rename = "bk_module_ids")]
    pub module_ids: Vec<i64>,
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub page: Page,
}

/// Resolved listing option handed to [`HostService::list_hosts`](super::HostService::list_hosts).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListHosts {
    pub biz_id: Option<i64>,
    pub set_ids: Vec<i64>,
    pub module_ids: Vec<i64>,
    pub host_property_filter: Option<Filter>,
    pub fields: Vec<String>,
    pub page: Page,
}

impl ListHosts {
    /// True when the host universe must come from relation rows.
    pub fn is_topology_scoped(&self) -> bool {
        self.biz_id.is_some() || !self.set_ids.is_empty() || !self.module_ids.is_empty()
    }
}

use super::ids::{field_i64, field_string};
use super::{Record, Result};
use serde::Serialize;

// Collections
pub const TABLE_HOST: &str = "cc_HostBase";
pub const TABLE_MODULE_HOST_CONFIG: &str = "cc_ModuleHostConfig";
pub const TABLE_SET: &str = "cc_SetBase";
pub const TABLE_MODULE: &str = "cc_ModuleBase";
pub const TABLE_PLAT: &str = "cc_PlatBase";
pub const TABLE_SET_TEMPLATE: &str = "cc_SetTemplate";

// Fields
pub const FIELD_ID: &str = "id";
pub const FIELD_BIZ_ID: &str = "bk_biz_id";
pub const FIELD_HOST_ID: &str = "bk_host_id";
pub const FIELD_SET_ID: &str = "bk_set_id";
pub const FIELD_SET_NAME: &str = "bk_set_name";
pub const FIELD_MODULE_ID: &str = "bk_module_id";
pub const FIELD_MODULE_NAME: &str = "bk_module_name";
pub const FIELD_CLOUD_ID: &str = "bk_cloud_id";
pub const FIELD_SET_TEMPLATE_VERSION: &str = "set_template_version";
pub const FIELD_VERSION: &str = "version";

/// One page of a host listing. `count` is the total number of matches,
/// not the length of `info`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HostPage {
    pub count: u64,
    pub info: Vec<Record>,
}

/// A host document with its identifier validated at ingestion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostRecord {
    #[serde(skip)]
    pub host_id: i64,
    #[serde(flatten)]
    pub fields: Record,
}

impl HostRecord {
    pub fn from_record(fields: Record) -> Result<Self> {
        let host_id = field_i64(&fields, FIELD_HOST_ID)?;
        Ok(Self { host_id, fields })
    }
}

/// One host membership: the host sits in `module_id`, which belongs to `set_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RelationRow {
    pub host_id: i64,
    pub set_id: i64,
    pub module_id: i64,
}

impl RelationRow {
    pub fn from_record(record: &Record) -> Result<Self> {
        Ok(Self {
            host_id: field_i64(record, FIELD_HOST_ID)?,
            set_id: field_i64(record, FIELD_SET_ID)?,
            module_id: field_i64(record, FIELD_MODULE_ID)?,
        })
    }
}

/// An (id, name) pair read from a set or module document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedNode {
    pub id: i64,
    pub name: String,
}

impl NamedNode {
    pub fn from_record(record: &Record, id_field: &str, name_field: &str) -> Result<Self> {
        Ok(Self {
            id: field_i64(record, id_field)?,
            name: field_string(record, name_field)?,
        })
    }
}

use super::{Adjacency, NameMaps};
use crate::core::HostRecord;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleTopo {
    pub module_id: i64,
    pub module_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetTopo {
    pub set_id: i64,
    pub set_name: String,
    pub modules: Vec<ModuleTopo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostTopo {
    pub host: HostRecord,
    pub topo: Vec<SetTopo>,
}

/// `count` is the unpaged number of matching hosts; `info` holds only the
/// current page.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HostTopoResult {
    pub count: u64,
    pub info: Vec<HostTopo>,
}

/// Builds one [`HostTopo`] per host, in page order. A host without any
/// relation rows gets an empty `topo`.
pub fn assemble(
    count: u64,
    hosts: Vec<HostRecord>,
    adjacency: &Adjacency,
    names: &NameMaps,
) -> HostTopoResult {
    let info = hosts
        .into_iter()
        .map(|host| {
            let topo = adjacency
                .get(host.host_id)
                .map(|set_modules| {
                    set_modules
                        .iter()
                        .map(|(&set_id, module_ids)| SetTopo {
                            set_id,
                            set_name: names.set_name(set_id).to_string(),
                            modules: module_ids
                                .iter()
                                .map(|&module_id| ModuleTopo {
                                    module_id,
                                    module_name: names.module_name(module_id).to_string(),
                                })
                                .collect(),
                        })
                        .collect()
                })
                .unwrap_or_default();
            HostTopo { host, topo }
        })
        .collect();

    HostTopoResult { count, info }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RelationRow;
    use crate::record;
    use pretty_assertions::assert_eq;

    fn host(id: i64) -> HostRecord {
        HostRecord::from_record(record! {"bk_host_id" => id}).unwrap()
    }

    fn rel(host_id: i64, set_id: i64, module_id: i64) -> RelationRow {
        RelationRow {
            host_id,
            set_id,
            module_id,
        }
    }

    fn names() -> NameMaps {
        NameMaps {
            sets: [(10, "SetA".to_string()), (20, "SetB".to_string())].into(),
            modules: [
                (100, "Mod1".to_string()),
                (101, "Mod2".to_string()),
                (200, "Mod3".to_string()),
            ]
            .into(),
        }
    }

    #[test]
    fn test_assemble_two_hosts() {
        let adj = Adjacency::from_rows([rel(1, 10, 100), rel(1, 10, 101), rel(2, 20, 200)]);
        let result = assemble(2, vec![host(1), host(2)], &adj, &names());

        assert_eq!(result.count, 2);
        assert_eq!(
            result.info[0].topo,
            vec![SetTopo {
                set_id: 10,
                set_name: "SetA".into(),
                modules: vec![
                    ModuleTopo { module_id: 100, module_name: "Mod1".into() },
                    ModuleTopo { module_id: 101, module_name: "Mod2".into() },
                ],
            }]
        );
        assert_eq!(
            result.info[1].topo,
            vec![SetTopo {
                set_id: 20,
                set_name: "SetB".into(),
                modules: vec![ModuleTopo { module_id: 200, module_name: "Mod3".into() }],
            }]
        );
    }

    #[test]
    fn test_host_without_relations_kept_with_empty_topo() {
        let adj = Adjacency::from_rows([rel(1, 10, 100)]);
        let result = assemble(40, vec![host(7), host(1)], &adj, &names());

        assert_eq!(result.count, 40);
        assert_eq!(result.info.len(), 2);
        assert_eq!(result.info[0].host.host_id, 7);
        assert!(result.info[0].topo.is_empty());
        assert_eq!(result.info[1].topo.len(), 1);
    }

    #[test]
    fn test_dangling_ids_get_empty_names() {
        let adj = Adjacency::from_rows([rel(1, 30, 300)]);
        let result = assemble(1, vec![host(1)], &adj, &names());

        let group = &result.info[0].topo[0];
        assert_eq!(group.set_name, "");
        assert_eq!(group.modules[0].module_name, "");
    }

    #[test]
    fn test_response_json_shape() {
        let adj = Adjacency::from_rows([rel(1, 10, 100)]);
        let result = assemble(1, vec![host(1)], &adj, &names());

        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            serde_json::json!({
                "count": 1,
                "info": [{
                    "host": {"bk_host_id": 1},
                    "topo": [{
                        "setId": 10,
                        "setName": "SetA",
                        "modules": [{"moduleId": 100, "moduleName": "Mod1"}]
                    }]
                }]
            })
        );
    }
}

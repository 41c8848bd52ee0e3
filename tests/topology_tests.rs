/// Integration tests for the business host topology query
///
/// Run with: cargo test --test topology_tests

use cmdb_topo::core::types::{
    TABLE_HOST, TABLE_MODULE, TABLE_MODULE_HOST_CONFIG, TABLE_SET,
};
use cmdb_topo::record;
use cmdb_topo::storage::{InstrumentedStore, StoreOp};
use cmdb_topo::{
    HostService, InMemoryStore, ListHostsWithNoBizParameter, ModuleTopo, Page, RequestContext,
    SetTopo, TopoConfig, TopoError,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

async fn seeded_store() -> InMemoryStore {
    let store = InMemoryStore::new();
    store
        .insert_many(
            TABLE_HOST,
            vec![
                record! {"bk_host_id" => 1, "bk_host_innerip" => "10.0.0.1", "bk_cloud_id" => 0},
                record! {"bk_host_id" => 2, "bk_host_innerip" => "10.0.0.2", "bk_cloud_id" => 0},
                record! {"bk_host_id" => 3, "bk_host_innerip" => "10.0.0.3", "bk_cloud_id" => 1},
            ],
        )
        .await
        .unwrap();
    store
        .insert_many(
            TABLE_MODULE_HOST_CONFIG,
            vec![
                record! {"bk_biz_id" => 3, "bk_host_id" => 1, "bk_set_id" => 10, "bk_module_id" => 100},
                record! {"bk_biz_id" => 3, "bk_host_id" => 1, "bk_set_id" => 10, "bk_module_id" => 101},
                record! {"bk_biz_id" => 3, "bk_host_id" => 2, "bk_set_id" => 20, "bk_module_id" => 200},
                record! {"bk_biz_id" => 4, "bk_host_id" => 3, "bk_set_id" => 30, "bk_module_id" => 300},
            ],
        )
        .await
        .unwrap();
    store
        .insert_many(
            TABLE_SET,
            vec![
                record! {"bk_set_id" => 10, "bk_set_name" => "SetA", "bk_biz_id" => 3},
                record! {"bk_set_id" => 20, "bk_set_name" => "SetB", "bk_biz_id" => 3},
                record! {"bk_set_id" => 30, "bk_set_name" => "SetC", "bk_biz_id" => 4},
            ],
        )
        .await
        .unwrap();
    store
        .insert_many(
            TABLE_MODULE,
            vec![
                record! {"bk_module_id" => 100, "bk_module_name" => "Mod1", "bk_set_id" => 10},
                record! {"bk_module_id" => 101, "bk_module_name" => "Mod2", "bk_set_id" => 10},
                record! {"bk_module_id" => 200, "bk_module_name" => "Mod3", "bk_set_id" => 20},
                record! {"bk_module_id" => 300, "bk_module_name" => "Mod4", "bk_set_id" => 30},
            ],
        )
        .await
        .unwrap();
    store
}

fn page(start: usize, limit: usize) -> ListHostsWithNoBizParameter {
    ListHostsWithNoBizParameter {
        page: Page::new(start, limit),
        ..Default::default()
    }
}

fn module(id: i64, name: &str) -> ModuleTopo {
    ModuleTopo {
        module_id: id,
        module_name: name.to_string(),
    }
}

#[tokio::test]
async fn test_two_hosts_end_to_end() {
    let service = HostService::new(Arc::new(seeded_store().await), TopoConfig::default());
    let ctx = RequestContext::new();

    let result = service.list_biz_hosts_topo(&ctx, 3, page(0, 10)).await.unwrap();

    assert_eq!(result.count, 2);
    assert_eq!(result.info.len(), 2);

    assert_eq!(result.info[0].host.host_id, 1);
    assert_eq!(
        result.info[0].topo,
        vec![SetTopo {
            set_id: 10,
            set_name: "SetA".to_string(),
            modules: vec![module(100, "Mod1"), module(101, "Mod2")],
        }]
    );

    assert_eq!(result.info[1].host.host_id, 2);
    assert_eq!(
        result.info[1].topo,
        vec![SetTopo {
            set_id: 20,
            set_name: "SetB".to_string(),
            modules: vec![module(200, "Mod3")],
        }]
    );
}

#[tokio::test]
async fn test_count_is_total_while_info_is_the_page() {
    let service = HostService::new(Arc::new(seeded_store().await), TopoConfig::default());
    let ctx = RequestContext::new();

    let first = service.list_biz_hosts_topo(&ctx, 3, page(0, 1)).await.unwrap();
    assert_eq!(first.count, 2);
    assert_eq!(first.info.len(), 1);
    assert_eq!(first.info[0].host.host_id, 1);

    let second = service.list_biz_hosts_topo(&ctx, 3, page(1, 1)).await.unwrap();
    assert_eq!(second.count, 2);
    assert_eq!(second.info[0].host.host_id, 2);
}

#[tokio::test]
async fn test_dangling_names_render_empty() {
    let store = seeded_store().await;
    store
        .insert_many(
            TABLE_MODULE_HOST_CONFIG,
            vec![record! {"bk_biz_id" => 3, "bk_host_id" => 2, "bk_set_id" => 99, "bk_module_id" => 999}],
        )
        .await
        .unwrap();
    let service = HostService::new(Arc::new(store), TopoConfig::default());
    let ctx = RequestContext::new();

    let result = service.list_biz_hosts_topo(&ctx, 3, page(0, 10)).await.unwrap();
    let host2 = &result.info[1];
    assert_eq!(host2.topo.len(), 2);
    assert_eq!(
        host2.topo[1],
        SetTopo {
            set_id: 99,
            set_name: String::new(),
            modules: vec![module(999, "")],
        }
    );
}

#[tokio::test]
async fn test_response_json_shape() {
    let service = HostService::new(Arc::new(seeded_store().await), TopoConfig::default());
    let ctx = RequestContext::new();

    let param = ListHostsWithNoBizParameter {
        fields: vec!["bk_host_innerip".to_string()],
        page: Page::new(0, 1),
        ..Default::default()
    };
    let result = service.list_biz_hosts_topo(&ctx, 3, param).await.unwrap();

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "count": 2,
            "info": [{
                "host": {"bk_host_id": 1, "bk_host_innerip": "10.0.0.1"},
                "topo": [{
                    "setId": 10,
                    "setName": "SetA",
                    "modules": [
                        {"moduleId": 100, "moduleName": "Mod1"},
                        {"moduleId": 101, "moduleName": "Mod2"}
                    ]
                }]
            }]
        })
    );
}

#[tokio::test]
async fn test_business_without_hosts_skips_lookups() {
    let store = Arc::new(InstrumentedStore::new(seeded_store().await));
    let service = HostService::new(store.clone(), TopoConfig::default());
    let ctx = RequestContext::new();

    let result = service.list_biz_hosts_topo(&ctx, 42, page(0, 10)).await.unwrap();
    assert_eq!(result.count, 0);
    assert!(result.info.is_empty());
    assert_eq!(store.calls(StoreOp::Count, TABLE_HOST), 0);
    assert_eq!(store.calls(StoreOp::Find, TABLE_SET), 0);
    assert_eq!(store.calls(StoreOp::Find, TABLE_MODULE), 0);
}

#[tokio::test]
async fn test_invalid_requests_touch_no_store() {
    let store = Arc::new(InstrumentedStore::new(seeded_store().await));
    let service = HostService::new(store.clone(), TopoConfig::default());
    let ctx = RequestContext::new();

    let err = service.list_biz_hosts_topo(&ctx, 0, page(0, 10)).await.unwrap_err();
    assert!(matches!(err, TopoError::Validation(ref key) if key == "bk_biz_id"));

    let err = service.list_biz_hosts_topo(&ctx, 3, page(0, 0)).await.unwrap_err();
    assert!(matches!(err, TopoError::Validation(ref key) if key == "page.limit"));

    let err = service.list_biz_hosts_topo(&ctx, 3, page(0, 501)).await.unwrap_err();
    assert!(matches!(err, TopoError::Validation(_)));

    assert_eq!(store.total_calls(), 0);
}

#[tokio::test]
async fn test_relation_failure_fails_whole_request() {
    let store = Arc::new(InstrumentedStore::new(seeded_store().await));
    let service = HostService::new(store.clone(), TopoConfig::default());
    store.fail_on(StoreOp::Find, TABLE_MODULE, "connection reset");
    let ctx = RequestContext::new();

    let err = service.list_biz_hosts_topo(&ctx, 3, page(0, 10)).await.unwrap_err();
    assert!(matches!(
        err.root_cause(),
        TopoError::Lookup { collection, .. } if collection == TABLE_MODULE
    ));
}

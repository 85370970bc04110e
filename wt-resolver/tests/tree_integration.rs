//! Package tree resolution against a mock DataONE coordinating node

mod helpers;

use helpers::*;
use wiremock::MockServer;
use wt_resolver::{ResolveError, Resolver};

/// Two-level package
///
/// Root: documenting EML, an ISO metadata record, two data files and one child
/// map. Child: documenting EML and one data file.
async fn mount_nested_fixture(server: &MockServer) {
    let base = server.uri();

    mount_query(
        server,
        "identifier:\"urn:uuid:root-meta\"",
        solr_envelope(vec![located_doc("urn:uuid:root-meta", "METADATA", &["resource_map_root"])]),
    )
    .await;

    mount_query(
        server,
        "resourceMap:\"resource_map_root\"",
        solr_envelope(vec![
            metadata_doc(
                "urn:uuid:root-meta",
                "Alpine soil survey",
                18648,
                Some(&[
                    "urn:uuid:root-meta",
                    "urn:uuid:soil-csv",
                    "urn:uuid:pit-photos",
                    "resource_map_child",
                ]),
            ),
            metadata_doc("urn:uuid:root-iso", "Alpine soil survey (ISO)", 4302, None),
            data_doc("urn:uuid:soil-csv", "soil.csv", 1757, "text/csv"),
            data_doc("urn:uuid:pit-photos", "pit-photos.zip", 5242880, "application/zip"),
            resource_doc("resource_map_child"),
        ]),
    )
    .await;

    mount_graph(
        server,
        "resource_map_root",
        resource_map(
            &base,
            "resource_map_root",
            &[
                "urn:uuid:root-meta",
                "urn:uuid:root-iso",
                "urn:uuid:soil-csv",
                "urn:uuid:pit-photos",
                "resource_map_child",
            ],
            &[
                ("urn:uuid:soil-csv", "urn:uuid:root-meta"),
                ("urn:uuid:pit-photos", "urn:uuid:root-meta"),
                ("resource_map_child", "urn:uuid:root-meta"),
            ],
        ),
    )
    .await;

    mount_query(
        server,
        "resourceMap:\"resource_map_child\"",
        solr_envelope(vec![
            metadata_doc(
                "urn:uuid:child-meta",
                "Snow depth transects",
                9120,
                Some(&["urn:uuid:child-meta", "urn:uuid:snow-csv"]),
            ),
            data_doc("urn:uuid:snow-csv", "snow.csv", 40960, "text/csv"),
        ]),
    )
    .await;

    mount_graph(
        server,
        "resource_map_child",
        resource_map(
            &base,
            "resource_map_child",
            &["urn:uuid:child-meta", "urn:uuid:snow-csv"],
            &[("urn:uuid:snow-csv", "urn:uuid:child-meta")],
        ),
    )
    .await;
}

#[tokio::test]
async fn test_nested_package_from_landing_page() {
    let server = MockServer::start().await;
    mount_nested_fixture(&server).await;

    let resolver = Resolver::from_config(&config_for(&server)).unwrap();
    let tree = resolver
        .tree
        .build_tree("https://search.dataone.org/#view/urn:uuid:root-meta")
        .await
        .unwrap();

    assert_eq!(tree.name, "Alpine soil survey");
    assert_eq!(tree.identifier.as_str(), "resource_map_root");
    // Two data files plus the ISO record; the documenting EML names the node
    assert_eq!(tree.file_list.len(), 2 + 1);
    assert_eq!(tree.children.len(), 1);
    assert!(!tree.file_list.contains_key("urn_uuid_root-meta.xml"));

    let soil = &tree.file_list["soil.csv"];
    assert_eq!(soil.size, 1757);
    assert_eq!(soil.identifier.as_str(), "urn:uuid:soil-csv");
    assert_eq!(soil.mime_type.as_deref(), Some("text/csv"));
    assert_eq!(soil.url, format!("{}/resolve/urn%3Auuid%3Asoil-csv", server.uri()));
    assert_eq!(tree.file_list["pit-photos.zip"].size, 5242880);
    assert_eq!(tree.file_list["pit-photos.zip"].mime_type.as_deref(), Some("application/zip"));

    let iso = &tree.file_list["urn_uuid_root-iso.xml"];
    assert_eq!(iso.size, 4302);
    assert_eq!(iso.identifier.as_str(), "urn:uuid:root-iso");

    assert_eq!(tree.children.len(), 1);
    let child = tree.child("Snow depth transects").unwrap();
    assert_eq!(child.identifier.as_str(), "resource_map_child");
    assert_eq!(child.file_list.len(), 1);
    assert_eq!(child.file_list["snow.csv"].size, 40960);
    assert!(child.children.is_empty());

    assert_eq!(tree.file_count(), 4);
    assert_eq!(tree.total_size(), 1757 + 5242880 + 4302 + 40960);
}

#[tokio::test]
async fn test_tree_serializes_with_wire_field_names() {
    let server = MockServer::start().await;
    mount_nested_fixture(&server).await;

    let resolver = Resolver::from_config(&config_for(&server)).unwrap();
    let tree = resolver.tree.build_tree("urn:uuid:root-meta").await.unwrap();
    let value = serde_json::to_value(&tree).unwrap();

    assert_eq!(value["name"], "Alpine soil survey");
    assert_eq!(value["fileList"]["soil.csv"]["mimeType"], "text/csv");
    assert_eq!(value["children"]["Snow depth transects"]["fileList"]["snow.csv"]["size"], 40960);
}

#[tokio::test]
async fn test_full_page_is_truncated() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_query(
        &server,
        "identifier:\"resource_map_big\"",
        solr_envelope(vec![resource_doc("resource_map_big")]),
    )
    .await;
    mount_query(
        &server,
        "resourceMap:\"resource_map_big\"",
        solr_envelope_with_count(
            vec![
                metadata_doc("urn:uuid:big-meta", "Big", 10, Some(&["urn:uuid:big-meta", "urn:uuid:d0"])),
                data_doc("urn:uuid:d0", "d0.csv", 1, "text/csv"),
            ],
            1000,
        ),
    )
    .await;
    mount_graph(
        &server,
        "resource_map_big",
        resource_map(
            &base,
            "resource_map_big",
            &["urn:uuid:big-meta", "urn:uuid:d0"],
            &[("urn:uuid:d0", "urn:uuid:big-meta")],
        ),
    )
    .await;

    let resolver = Resolver::from_config(&config_for(&server)).unwrap();
    let result = resolver.tree.build_tree("resource_map_big").await;

    match result {
        Err(ResolveError::Truncated { num_found, rows, .. }) => {
            assert_eq!(num_found, 1000);
            assert_eq!(rows, 1000);
        }
        other => panic!("expected Truncated, got {:?}", other),
    }
}

#[tokio::test]
async fn test_inconsistent_graph_stops_before_children() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_query(
        &server,
        "identifier:\"resource_map_root\"",
        solr_envelope(vec![resource_doc("resource_map_root")]),
    )
    .await;
    mount_query(
        &server,
        "resourceMap:\"resource_map_root\"",
        solr_envelope(vec![
            metadata_doc("urn:uuid:meta", "Root", 10, Some(&["urn:uuid:meta", "resource_map_child"])),
            resource_doc("resource_map_child"),
        ]),
    )
    .await;
    mount_graph(
        &server,
        "resource_map_root",
        resource_map(
            &base,
            "resource_map_root",
            &["urn:uuid:meta", "resource_map_child", "urn:uuid:unindexed"],
            &[("resource_map_child", "urn:uuid:meta")],
        ),
    )
    .await;
    mount_query_expecting(&server, "resourceMap:\"resource_map_child\"", solr_envelope(Vec::new()), 0).await;

    let resolver = Resolver::from_config(&config_for(&server)).unwrap();
    let result = resolver.tree.build_tree("resource_map_root").await;

    match result {
        Err(ResolveError::Inconsistent {
            missing_from_index,
            missing_from_graph,
            ..
        }) => {
            assert_eq!(missing_from_index, vec!["urn:uuid:unindexed".to_string()]);
            assert!(missing_from_graph.is_empty());
        }
        other => panic!("expected Inconsistent, got {:?}", other),
    }
}

/// Package `resource_map_pkg` whose graph documents `urn:uuid:data` by `documented_by`
async fn mount_single_package(
    server: &MockServer,
    metadata: Vec<serde_json::Value>,
    members: &[&str],
    documented_by: &str,
) {
    let base = server.uri();

    mount_query(server, "identifier:\"resource_map_pkg\"", solr_envelope(vec![resource_doc("resource_map_pkg")])).await;

    let mut docs = metadata;
    docs.push(data_doc("urn:uuid:data", "data.csv", 5, "text/csv"));
    mount_query(server, "resourceMap:\"resource_map_pkg\"", solr_envelope(docs)).await;

    mount_graph(
        server,
        "resource_map_pkg",
        resource_map(&base, "resource_map_pkg", members, &[("urn:uuid:data", documented_by)]),
    )
    .await;
}

#[tokio::test]
async fn test_zero_documenting_metadata_is_ambiguous() {
    let server = MockServer::start().await;
    mount_single_package(
        &server,
        vec![metadata_doc("urn:uuid:meta", "Untitled", 10, None)],
        &["urn:uuid:meta", "urn:uuid:data"],
        "urn:uuid:meta",
    )
    .await;

    let resolver = Resolver::from_config(&config_for(&server)).unwrap();
    let result = resolver.tree.build_tree("resource_map_pkg").await;
    assert!(matches!(result, Err(ResolveError::Ambiguous(_))), "got {:?}", result);
}

#[tokio::test]
async fn test_two_documenting_metadata_is_ambiguous() {
    let server = MockServer::start().await;
    mount_single_package(
        &server,
        vec![
            metadata_doc("urn:uuid:eml", "EML", 10, Some(&["urn:uuid:eml", "urn:uuid:data"])),
            metadata_doc("urn:uuid:iso", "ISO", 10, Some(&["urn:uuid:iso", "urn:uuid:data"])),
        ],
        &["urn:uuid:eml", "urn:uuid:iso", "urn:uuid:data"],
        "urn:uuid:eml",
    )
    .await;

    let resolver = Resolver::from_config(&config_for(&server)).unwrap();
    let result = resolver.tree.build_tree("resource_map_pkg").await;
    assert!(matches!(result, Err(ResolveError::Ambiguous(_))), "got {:?}", result);
}

#[tokio::test]
async fn test_graph_without_documenting_relation_is_ambiguous() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_query(&server, "identifier:\"resource_map_pkg\"", solr_envelope(vec![resource_doc("resource_map_pkg")])).await;
    mount_query(
        &server,
        "resourceMap:\"resource_map_pkg\"",
        solr_envelope(vec![
            metadata_doc("urn:uuid:meta", "Plot survey", 10, Some(&["urn:uuid:meta", "urn:uuid:data"])),
            data_doc("urn:uuid:data", "data.csv", 5, "text/csv"),
        ]),
    )
    .await;
    mount_graph(
        &server,
        "resource_map_pkg",
        resource_map(&base, "resource_map_pkg", &["urn:uuid:meta", "urn:uuid:data"], &[]),
    )
    .await;

    let resolver = Resolver::from_config(&config_for(&server)).unwrap();
    let result = resolver.tree.build_tree("resource_map_pkg").await;
    assert!(matches!(result, Err(ResolveError::Ambiguous(_))), "got {:?}", result);
}

#[tokio::test]
async fn test_unknown_reference_is_not_found() {
    let server = MockServer::start().await;
    mount_query(&server, "identifier:\"urn:uuid:nothing\"", solr_envelope(Vec::new())).await;

    let resolver = Resolver::from_config(&config_for(&server)).unwrap();
    let result = resolver.tree.build_tree("urn:uuid:nothing").await;
    assert!(matches!(result, Err(ResolveError::NotFound(_))));
}

#[tokio::test]
async fn test_index_outage_is_upstream_unavailable() {
    let server = MockServer::start().await;

    let resolver = Resolver::from_config(&config_for(&server)).unwrap();
    let result = resolver.tree.build_tree("urn:uuid:anything").await;
    assert!(matches!(result, Err(ResolveError::UpstreamUnavailable(_))));
}

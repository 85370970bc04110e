//! Test Helper Utilities
//!
//! Canned Solr envelopes and resource maps served by a wiremock server that
//! stands in for both the index and the graph service.

#![allow(dead_code)]

use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use wt_resolver::ResolverConfig;

/// Config pointing every service at the mock server
pub fn config_for(server: &MockServer) -> ResolverConfig {
    ResolverConfig::with_base(&server.uri())
}

/// Solr JSON envelope with `numFound` equal to the number of docs
pub fn solr_envelope(docs: Vec<Value>) -> Value {
    let num_found = docs.len();
    solr_envelope_with_count(docs, num_found as u64)
}

pub fn solr_envelope_with_count(docs: Vec<Value>, num_found: u64) -> Value {
    json!({
        "responseHeader": { "status": 0, "QTime": 1 },
        "response": { "numFound": num_found, "start": 0, "docs": docs }
    })
}

pub fn metadata_doc(pid: &str, title: &str, size: u64, documents: Option<&[&str]>) -> Value {
    let mut doc = json!({
        "identifier": pid,
        "formatType": "METADATA",
        "formatId": "eml://ecoinformatics.org/eml-2.1.1",
        "title": title,
        "size": size,
        "fileName": format!("{}.xml", pid.replace(':', "_")),
    });
    if let Some(documents) = documents {
        doc["documents"] = json!(documents);
    }
    doc
}

pub fn data_doc(pid: &str, file_name: &str, size: u64, format_id: &str) -> Value {
    json!({
        "identifier": pid,
        "formatType": "DATA",
        "formatId": format_id,
        "fileName": file_name,
        "size": size,
    })
}

pub fn resource_doc(pid: &str) -> Value {
    json!({ "identifier": pid, "formatType": "RESOURCE" })
}

/// Locate-query document: `pid` aggregated by `resource_maps`
pub fn located_doc(pid: &str, format_type: &str, resource_maps: &[&str]) -> Value {
    json!({ "identifier": pid, "formatType": format_type, "resourceMap": resource_maps })
}

/// Answer index query `q` with `body`
pub async fn mount_query(server: &MockServer, q: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path("/query/solr/"))
        .and(query_param("q", q))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Like [`mount_query`] but asserts the number of calls when the server drops
pub async fn mount_query_expecting(server: &MockServer, q: &str, body: Value, calls: u64) {
    Mock::given(method("GET"))
        .and(path("/query/solr/"))
        .and(query_param("q", q))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(calls)
        .mount(server)
        .await;
}

/// Serve `rdf` as the resource map of `package`
pub async fn mount_graph(server: &MockServer, package: &str, rdf: String) {
    Mock::given(method("GET"))
        .and(path(format!("/resolve/{}", urlencoding::encode(package))))
        .respond_with(ResponseTemplate::new(200).set_body_raw(rdf, "application/rdf+xml"))
        .mount(server)
        .await;
}

/// RDF/XML resource map aggregating `members`
///
/// `documented_by` pairs are `(described, metadata)`.
pub fn resource_map(base: &str, package: &str, members: &[&str], documented_by: &[(&str, &str)]) -> String {
    let object_uri = |pid: &str| format!("{}/resolve/{}", base, urlencoding::encode(pid));

    let mut rdf = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rdf:RDF xmlns:cito="http://purl.org/spar/cito/"
         xmlns:dcterms="http://purl.org/dc/terms/"
         xmlns:ore="http://www.openarchives.org/ore/terms/"
         xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
"#,
    );

    rdf.push_str(&format!(
        "  <rdf:Description rdf:about=\"{}#aggregation\">\n",
        object_uri(package)
    ));
    for member in members {
        rdf.push_str(&format!("    <ore:aggregates rdf:resource=\"{}\"/>\n", object_uri(member)));
    }
    rdf.push_str("  </rdf:Description>\n");

    for member in members {
        rdf.push_str(&format!("  <rdf:Description rdf:about=\"{}\">\n", object_uri(member)));
        rdf.push_str(&format!("    <dcterms:identifier>{}</dcterms:identifier>\n", member));
        for (described, metadata) in documented_by {
            if described == member {
                rdf.push_str(&format!(
                    "    <cito:isDocumentedBy rdf:resource=\"{}\"/>\n",
                    object_uri(metadata)
                ));
            }
        }
        rdf.push_str("  </rdf:Description>\n");
    }

    rdf.push_str("</rdf:RDF>\n");
    rdf
}

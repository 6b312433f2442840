//! Mock version endpoints

use mockito::{Mock, Server};

use template_provisioner::config::SourcesConfig;

#[allow(dead_code)]
pub const FEED_PATH: &str = "/releases.atom";
#[allow(dead_code)]
pub const LATEST_PATH: &str = "/releases/latest.json";

#[allow(dead_code)]
pub fn sources_config(server: &Server) -> SourcesConfig {
    SourcesConfig {
        feed_url: format!("{}{}", server.url(), FEED_PATH),
        latest_url: format!("{}{}", server.url(), LATEST_PATH),
    }
}

#[allow(dead_code)]
pub async fn mock_latest(server: &mut Server, version: &str, hits: usize) -> Mock {
    server
        .mock("GET", LATEST_PATH)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(format!(r#"{{"version": "{}"}}"#, version))
        .expect(hits)
        .create_async()
        .await
}

#[allow(dead_code)]
pub async fn mock_feed(server: &mut Server, entry_ids: &[&str], hits: usize) -> Mock {
    let entries: String = entry_ids
        .iter()
        .map(|id| format!("<entry><id>{}</id><title>release</title></entry>", id))
        .collect();
    server
        .mock("GET", FEED_PATH)
        .with_status(200)
        .with_header("content-type", "application/atom+xml")
        .with_body(format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><feed xmlns="http://www.w3.org/2005/Atom"><title>Releases</title>{}</feed>"#,
            entries
        ))
        .expect(hits)
        .create_async()
        .await
}

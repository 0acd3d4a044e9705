//! End-to-end merge pipeline tests: local HTTP fixtures through fetch, parse,
//! merge and serialization.

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use epg_combiner::config::FetchConfig;
use epg_combiner::generator::XmltvGenerator;
use epg_combiner::ingestor::EpgIngestor;
use epg_combiner::merge::GuideMerger;
use epg_combiner::models::EpgSource;
use epg_combiner::utils::xmltv_parser::parse_xmltv;

const SOURCE_A: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<tv>
  <channel id="bbc1"><display-name>BBC One</display-name></channel>
  <channel id="bbc2"><display-name>BBC Two</display-name></channel>
  <programme start="20231215120000 +0000" stop="20231215130000 +0000" channel="bbc1"><title>A News</title></programme>
  <programme start="20231215130000 +0000" stop="20231215140000 +0000" channel="bbc2"><title>A Drama</title></programme>
</tv>"#;

const SOURCE_B: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<tv>
  <channel id="bbc1"><display-name>BBC 1 Backup</display-name></channel>
  <channel id="itv"><display-name>ITV</display-name></channel>
  <programme start="20231215120000 +0000" stop="20231215130000 +0000" channel="bbc1"><title>B News</title></programme>
  <programme start="20231215140000 +0000" stop="20231215150000 +0000" channel="itv"><title>B Quiz</title></programme>
</tv>"#;

const SOURCE_C: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<tv>
  <channel id="cnn"><display-name>CNN</display-name></channel>
  <programme start="20231215120000 +0000" stop="20231215140000 +0000" channel="cnn"><title>C World</title></programme>
</tv>"#;

/// Serve a single canned HTTP response on an ephemeral local port
async fn serve_once(status_line: &'static str, body: &'static str) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let head = format!(
                "{}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                status_line,
                body.len()
            );
            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.write_all(body.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    format!("http://{}", addr)
}

fn merger() -> GuideMerger {
    let ingestor = EpgIngestor::new(&FetchConfig::default()).unwrap();
    GuideMerger::new(ingestor, 3)
}

fn strip_date_attr(content: &str) -> String {
    match content.find(" date=\"") {
        Some(start) => {
            let rest = &content[start + 7..];
            match rest.find('"') {
                Some(i) => format!("{}{}", &content[..start], &rest[i + 1..]),
                None => content.to_string(),
            }
        }
        None => content.to_string(),
    }
}

#[tokio::test]
async fn test_one_failing_source_does_not_abort_the_run() {
    let url_a = serve_once("HTTP/1.1 200 OK", SOURCE_A).await;
    let url_b = serve_once("HTTP/1.1 500 Internal Server Error", "boom").await;
    let url_c = serve_once("HTTP/1.1 200 OK", SOURCE_C).await;

    let sources = vec![
        EpgSource::new("a", url_a),
        EpgSource::new("b", url_b),
        EpgSource::new("c", url_c),
    ];

    let (guide, report) = merger().merge_sources(&sources).await;

    assert_eq!(report.sources_total, 3);
    assert_eq!(report.sources_merged, 2);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].name, "b");
    assert!(!report.all_failed());

    // everything from the surviving sources is present
    assert_eq!(guide.channels.len(), 3);
    assert_eq!(guide.programs.len(), 3);

    // the combined guide still serializes and re-parses cleanly
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("epg.xml");
    XmltvGenerator::new()
        .write_guide(&guide, &path)
        .await
        .unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let reparsed = parse_xmltv(&content, "combined").unwrap();
    assert_eq!(reparsed.channels.len(), 3);
    assert_eq!(reparsed.programs.len(), 3);
}

#[test]
fn test_channel_count_bounds() {
    // with a collision: strictly fewer channels than the per-source sum
    let a = EpgSource::new("a", "https://example.com/a.xml");
    let b = EpgSource::new("b", "https://example.com/b.xml");
    let (guide, _) = GuideMerger::accumulate(vec![
        (a.clone(), parse_xmltv(SOURCE_A, "a")),
        (b.clone(), parse_xmltv(SOURCE_B, "b")),
    ]);
    assert_eq!(guide.channels.len(), 3); // 2 + 2 declared, bbc1 collides

    // without collisions: equality
    let c = EpgSource::new("c", "https://example.com/c.xml");
    let (guide, _) = GuideMerger::accumulate(vec![
        (a, parse_xmltv(SOURCE_A, "a")),
        (c, parse_xmltv(SOURCE_C, "c")),
    ]);
    assert_eq!(guide.channels.len(), 3); // 2 + 1, no collision
}

#[test]
fn test_programme_concatenation_is_lossless() {
    let sources = vec![
        (
            EpgSource::new("a", "https://example.com/a.xml"),
            parse_xmltv(SOURCE_A, "a"),
        ),
        (
            EpgSource::new("b", "https://example.com/b.xml"),
            parse_xmltv(SOURCE_B, "b"),
        ),
        (
            EpgSource::new("c", "https://example.com/c.xml"),
            parse_xmltv(SOURCE_C, "c"),
        ),
    ];

    let per_source_total: usize = sources
        .iter()
        .map(|(_, r)| r.as_ref().unwrap().programs.len())
        .sum();

    let (guide, _) = GuideMerger::accumulate(sources);
    assert_eq!(guide.programs.len(), per_source_total);
}

#[tokio::test]
async fn test_first_seen_display_name_survives_serialization() {
    let (guide, _) = GuideMerger::accumulate(vec![
        (
            EpgSource::new("a", "https://example.com/a.xml"),
            parse_xmltv(SOURCE_A, "a"),
        ),
        (
            EpgSource::new("b", "https://example.com/b.xml"),
            parse_xmltv(SOURCE_B, "b"),
        ),
    ]);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("epg.xml");
    XmltvGenerator::new()
        .write_guide(&guide, &path)
        .await
        .unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("<display-name>BBC One</display-name>"));
    assert!(!content.contains("BBC 1 Backup"));
}

#[tokio::test]
async fn test_merge_and_serialize_are_structurally_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let generator = XmltvGenerator::new();

    let mut outputs = Vec::new();
    for run in 0..2 {
        let (guide, _) = GuideMerger::accumulate(vec![
            (
                EpgSource::new("a", "https://example.com/a.xml"),
                parse_xmltv(SOURCE_A, "a"),
            ),
            (
                EpgSource::new("b", "https://example.com/b.xml"),
                parse_xmltv(SOURCE_B, "b"),
            ),
        ]);

        let path = dir.path().join(format!("epg-{run}.xml"));
        generator.write_guide(&guide, &path).await.unwrap();
        outputs.push(std::fs::read_to_string(&path).unwrap());
    }

    assert_eq!(strip_date_attr(&outputs[0]), strip_date_attr(&outputs[1]));
}

#[tokio::test]
async fn test_all_sources_failing_leaves_previous_output_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("epg.xml");

    // a previous run published a guide
    let parsed = parse_xmltv(SOURCE_A, "a").unwrap();
    let previous = epg_combiner::models::CombinedGuide {
        channels: parsed.channels,
        programs: parsed.programs,
    };
    XmltvGenerator::new()
        .write_guide(&previous, &path)
        .await
        .unwrap();
    let published = std::fs::read_to_string(&path).unwrap();

    // this run: every source is down
    let url_x = serve_once("HTTP/1.1 502 Bad Gateway", "down").await;
    let url_y = serve_once("HTTP/1.1 503 Service Unavailable", "down").await;
    let sources = vec![EpgSource::new("x", url_x), EpgSource::new("y", url_y)];

    let (guide, report) = merger().merge_sources(&sources).await;

    assert!(report.all_failed());
    assert_eq!(report.skipped.len(), 2);
    assert!(guide.is_empty());

    // the caller bails without writing, so the published file is intact
    assert_eq!(std::fs::read_to_string(&path).unwrap(), published);
}

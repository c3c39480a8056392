//! End-to-end runs of the log source and filter pipeline over a fixture

use std::collections::HashSet;

use alogview_logs::{
    FilterChain, LifecycleGrammar, LineSource, LogRecord, PackageFilter, Pipeline, ProcessCensus,
    SourceStats, stage_channel,
};

const SESSION_LOG: &[u8] = include_bytes!("fixtures/session.log");

const PS_OUTPUT: &str = "\
USER           PID  PPID     VSZ    RSS WCHAN            ADDR S NAME
system         512     1 1234560  81234 SyS_epoll_wait      0 S system_server
u0_a12         123   320 1410052 102312 SyS_epoll_wait      0 S com.seeded
";

async fn run(pipeline: Pipeline) -> (Vec<LogRecord>, SourceStats) {
    let (tx, rx) = stage_channel();
    let (mut out, tasks) = pipeline.spawn(rx);

    let source = tokio::spawn(async move { LineSource::default().pump(SESSION_LOG, tx).await });

    let mut records = Vec::new();
    while let Some(record) = out.recv().await {
        records.push(record);
    }

    let stats = source.await.unwrap().unwrap();
    for task in tasks {
        task.await.unwrap();
    }
    (records, stats)
}

fn strings(items: &[&str]) -> HashSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn messages(records: &[LogRecord]) -> Vec<&str> {
    records.iter().map(|r| r.message.as_str()).collect()
}

#[tokio::test]
async fn unfiltered_stream_keeps_every_parsed_line_in_order() {
    let (records, stats) = run(Pipeline::new()).await;

    assert_eq!(stats.forwarded, 17);
    assert_eq!(stats.malformed, 1);
    assert_eq!(stats.markers, 2);
    assert_eq!(records.len(), 17);
    assert_eq!(records[0].message, "first test message");
    assert_eq!(records[16].message, "after kill");
}

#[tokio::test]
async fn package_filter_follows_process_lifecycle() {
    let filter = PackageFilter::new(
        LifecycleGrammar::default(),
        strings(&["com.example.test"]),
        HashSet::new(),
    );
    let (records, _) = run(FilterChain::new().packages(filter).build()).await;

    assert_eq!(
        messages(&records),
        vec![
            "Start proc 789:com.example.test/u0a57 for activity com.example.test/.MainActivity",
            "application created",
            "about to crash",
            "Fatal signal 6 (SIGABRT), code -6 in tid 789 (com.example.test), pid 789 (com.example.test)",
            "Process com.example.test (pid 789) has died: fore TOP",
            "Start proc 801:com.example.test/u0a57 for activity com.example.test/.MainActivity",
            "application created again",
            "Killing 801:com.example.test/u0a57 (adj 900): empty #17",
        ]
    );
}

#[tokio::test]
async fn census_seeds_package_filter() {
    let packages = strings(&["com.seeded"]);
    let pids = ProcessCensus::new().count(PS_OUTPUT.lines(), &packages);
    assert_eq!(pids, HashSet::from([123]));

    let filter = PackageFilter::new(LifecycleGrammar::default(), packages, pids);
    let (records, _) = run(FilterChain::new().packages(filter).build()).await;

    assert_eq!(
        messages(&records),
        vec!["first test message", "second test message"]
    );
}

#[tokio::test]
async fn tags_and_packages_combine() {
    let filter = PackageFilter::new(
        LifecycleGrammar::default(),
        strings(&["com.example.test"]),
        HashSet::new(),
    );
    let pipeline = FilterChain::new()
        .tags(strings(&["TestTag1"]))
        .packages(filter)
        .build();
    let (records, _) = run(pipeline).await;

    // Lifecycle announcements never reach the package stage: the tag stage
    // runs first and drops them, so pid 789 and 801 are never learned.
    assert!(records.is_empty());
}

#[tokio::test]
async fn tag_filter_alone() {
    let pipeline = FilterChain::new().tags(strings(&["TestTag1"])).build();
    let (records, _) = run(pipeline).await;

    assert_eq!(
        messages(&records),
        vec![
            "first test message",
            "third test message",
            "application created",
            "other app noise",
            "late line from a dead pid",
            "application created again",
            "after kill",
        ]
    );
}

use pipeline_workflow::dsl::NodeId;
use pipeline_workflow::runtime::storage::{self, Failure};

#[tokio::test]
async fn test_collects_from_concurrent_sinks() {
    let (sink, collector) = storage::channel();

    let mut handles = Vec::new();
    for i in 0..16 {
        let sink = sink.clone();
        handles.push(tokio::spawn(async move {
            sink.emit(Failure::new(NodeId::from(format!("node-{}", i)), format!("error {}", i)));
        }));
    }
    for handle in handles {
        handle.await.expect("emitter panicked");
    }
    drop(sink);

    let failures = collector.finish().await.expect("collector failed");
    assert_eq!(failures.len(), 16);
    assert_eq!(failures[&NodeId::from("node-3")], "error 3");
}

#[tokio::test]
async fn test_finish_waits_for_every_sink() {
    let (sink, collector) = storage::channel();
    let late = sink.clone();
    drop(sink);

    let emitter = tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        late.emit(Failure::new(NodeId::from("late"), "slow failure"));
    });

    let failures = collector.finish().await.expect("collector failed");
    emitter.await.expect("emitter panicked");

    assert_eq!(failures.get(&NodeId::from("late")).map(String::as_str), Some("slow failure"));
}

#[tokio::test]
async fn test_empty_run_has_no_failures() {
    let (sink, collector) = storage::channel();
    drop(sink);

    assert!(collector.finish().await.expect("collector failed").is_empty());
}

#[tokio::test]
async fn test_channels_are_independent() {
    let (first_sink, first) = storage::channel();
    let (second_sink, second) = storage::channel();

    first_sink.emit(Failure::new(NodeId::from("a"), "first"));
    second_sink.emit(Failure::new(NodeId::from("b"), "second"));
    drop(first_sink);
    drop(second_sink);

    let first = first.finish().await.expect("collector failed");
    let second = second.finish().await.expect("collector failed");
    assert_eq!(first.keys().collect::<Vec<_>>(), vec![&NodeId::from("a")]);
    assert_eq!(second.keys().collect::<Vec<_>>(), vec![&NodeId::from("b")]);
}

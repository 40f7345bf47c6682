//! Worker pool behaviour against a mock HTTP server.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use launch_core::core::downloader::{
    CancelHandle, DownloadScheduler, DownloadTask, Downloader, RetryPolicy,
};
use launch_core::core::http::build_http_client;
use sha1::{Digest, Sha1};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sha1_hex(bytes: &[u8]) -> String {
    hex::encode(Sha1::digest(bytes))
}

fn scheduler(retry: RetryPolicy) -> DownloadScheduler {
    let client = build_http_client().expect("client");
    DownloadScheduler::new(Downloader::new(client).with_retry(retry))
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay_ms: 10,
        max_delay_ms: 40,
        multiplier: 2.0,
    }
}

async fn serve(server: &MockServer, route: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn verified_existing_file_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fresh".to_vec()))
        .expect(0)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("libraries/a.jar");
    std::fs::create_dir_all(dest.parent().unwrap()).unwrap();
    std::fs::write(&dest, b"cached").unwrap();

    let hooked = Arc::new(AtomicUsize::new(0));
    let seen = hooked.clone();
    let task = DownloadTask::new(format!("{}/a.jar", server.uri()), &dest)
        .with_sha1(Some(sha1_hex(b"cached")))
        .on_complete(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

    let failures = scheduler(RetryPolicy::none()).run(vec![task], 5).await;
    assert!(failures.is_empty());
    assert_eq!(std::fs::read(&dest).unwrap(), b"cached");
    assert_eq!(hooked.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn panicking_hook_fails_its_task_and_the_worker_keeps_going() {
    let temp = TempDir::new().unwrap();
    let a = temp.path().join("a.jar");
    let b = temp.path().join("b.jar");
    std::fs::write(&a, b"alpha").unwrap();
    std::fs::write(&b, b"beta").unwrap();

    let b_hooked = Arc::new(AtomicUsize::new(0));
    let seen = b_hooked.clone();
    let tasks = vec![
        DownloadTask::new("http://127.0.0.1:9/a.jar", &a)
            .with_sha1(Some(sha1_hex(b"alpha")))
            .on_complete(|_| panic!("hook exploded")),
        DownloadTask::new("http://127.0.0.1:9/b.jar", &b)
            .with_sha1(Some(sha1_hex(b"beta")))
            .on_complete(move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
            }),
    ];

    let failures = scheduler(RetryPolicy::none()).run(tasks, 1).await;

    assert_eq!(failures.len(), 1, "failures: {:?}", failures);
    assert!(failures[0].url.ends_with("/a.jar"));
    assert!(failures[0].error.contains("hook exploded"));
    assert!(failures[0].required);
    assert_eq!(b_hooked.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn hash_mismatch_fails_only_that_task_and_leaves_file() {
    let server = MockServer::start().await;
    serve(&server, "/good-1.jar", b"one").await;
    serve(&server, "/bad.jar", b"tampered").await;
    serve(&server, "/good-2.jar", b"two").await;

    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    let tasks = vec![
        DownloadTask::new(format!("{}/good-1.jar", server.uri()), dir.join("good-1.jar"))
            .with_sha1(Some(sha1_hex(b"one"))),
        DownloadTask::new(format!("{}/bad.jar", server.uri()), dir.join("bad.jar"))
            .with_sha1(Some(sha1_hex(b"expected"))),
        DownloadTask::new(format!("{}/good-2.jar", server.uri()), dir.join("good-2.jar"))
            .with_size(Some(3)),
    ];

    let failures = scheduler(RetryPolicy::none()).run(tasks, 3).await;

    assert_eq!(failures.len(), 1, "failures: {:?}", failures);
    assert!(failures[0].url.ends_with("/bad.jar"));
    assert!(failures[0].error.contains("SHA-1 mismatch"));
    assert_eq!(std::fs::read(dir.join("bad.jar")).unwrap(), b"tampered");
    assert!(!dir.join("bad.jar.part").exists());
    assert_eq!(std::fs::read(dir.join("good-1.jar")).unwrap(), b"one");
    assert_eq!(std::fs::read(dir.join("good-2.jar")).unwrap(), b"two");
}

#[tokio::test]
async fn bad_file_from_previous_run_is_replaced() {
    let server = MockServer::start().await;
    serve(&server, "/lib.jar", b"correct").await;

    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("lib.jar");
    std::fs::write(&dest, b"corrupt").unwrap();

    let task = DownloadTask::new(format!("{}/lib.jar", server.uri()), &dest)
        .with_sha1(Some(sha1_hex(b"correct")));
    let failures = scheduler(RetryPolicy::none()).run(vec![task], 1).await;

    assert!(failures.is_empty());
    assert_eq!(std::fs::read(&dest).unwrap(), b"correct");
}

#[tokio::test]
async fn batch_returns_after_every_task_for_any_worker_count() {
    const N: usize = 12;
    let server = MockServer::start().await;
    for i in 0..N {
        Mock::given(method("GET"))
            .and(path(format!("/file-{i}.bin")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(format!("payload {i}").into_bytes())
                    .set_delay(Duration::from_millis(5 * (i as u64 % 4))),
            )
            .mount(&server)
            .await;
    }

    for workers in [1, 5, N + 10] {
        let temp = TempDir::new().unwrap();
        let done = Arc::new(AtomicUsize::new(0));
        let tasks: Vec<_> = (0..N)
            .map(|i| {
                let done = done.clone();
                DownloadTask::new(
                    format!("{}/file-{i}.bin", server.uri()),
                    temp.path().join(format!("nested/{i}/file.bin")),
                )
                .with_sha1(Some(sha1_hex(format!("payload {i}").as_bytes())))
                .on_complete(move |_| {
                    done.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();

        let failures = scheduler(RetryPolicy::none()).run(tasks, workers).await;

        assert!(failures.is_empty(), "workers={workers}: {:?}", failures);
        assert_eq!(done.load(Ordering::SeqCst), N, "workers={workers}");
        for i in 0..N {
            assert!(temp.path().join(format!("nested/{i}/file.bin")).is_file());
        }
    }
}

#[tokio::test]
async fn transient_errors_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky.jar"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    serve(&server, "/flaky.jar", b"finally").await;

    let temp = TempDir::new().unwrap();
    let task = DownloadTask::new(format!("{}/flaky.jar", server.uri()), temp.path().join("flaky.jar"))
        .with_sha1(Some(sha1_hex(b"finally")));

    let failures = scheduler(fast_retry()).run(vec![task], 1).await;
    assert!(failures.is_empty(), "{:?}", failures);
    assert_eq!(std::fs::read(temp.path().join("flaky.jar")).unwrap(), b"finally");
}

#[tokio::test]
async fn not_found_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing.jar"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let task = DownloadTask::new(
        format!("{}/missing.jar", server.uri()),
        temp.path().join("missing.jar"),
    );

    let failures = scheduler(fast_retry()).run(vec![task], 1).await;
    assert_eq!(failures.len(), 1);
    assert!(failures[0].error.contains("404"));
    assert!(failures[0].required);
    assert!(!temp.path().join("missing.jar").exists());
}

#[tokio::test]
async fn cancelled_batch_retires_every_task_without_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"x".to_vec()))
        .expect(0)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let tasks: Vec<_> = (0..4)
        .map(|i| {
            DownloadTask::new(
                format!("{}/{i}.jar", server.uri()),
                temp.path().join(format!("{i}.jar")),
            )
        })
        .collect();

    let handle = CancelHandle::new();
    handle.cancel();
    let failures = scheduler(RetryPolicy::none())
        .with_cancel(handle.signal())
        .run(tasks, 2)
        .await;

    assert_eq!(failures.len(), 4);
    assert!(failures.iter().all(|f| f.error.contains("cancelled")));
}

#[tokio::test]
async fn cancel_interrupts_in_flight_download() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow.jar"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"slow".to_vec())
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let task = DownloadTask::new(format!("{}/slow.jar", server.uri()), temp.path().join("slow.jar"));

    let handle = CancelHandle::new();
    let pool = scheduler(RetryPolicy::none()).with_cancel(handle.signal());
    let run = tokio::spawn(async move { pool.run(vec![task], 1).await });

    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.cancel();

    let failures = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("batch should stop promptly")
        .unwrap();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].error.contains("cancelled"));
    assert!(!temp.path().join("slow.jar").exists());
}

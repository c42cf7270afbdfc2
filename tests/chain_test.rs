//! 端到端：假渲染器 + 脚本化模型 + 本地题目服务器 + 真实 HTTP 客户端

mod support;

use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::time::Instant;

use quiz_chain_solver::config::ChainPolicy;
use quiz_chain_solver::models::{ChainStatus, FailureKind, Identity, QuizTask};
use quiz_chain_solver::services::FailureLog;
use quiz_chain_solver::workflow::{Capabilities, HopFlow};
use quiz_chain_solver::{ChainRunner, Dispatcher};

use support::*;

const MEAN_Q: &str = "What is the mean of the value column in the CSV file?";
const SUM_Q: &str = "What is the sum of the value column in the CSV file?";

fn task(id: u64, url: &str, deadline: Duration) -> QuizTask {
    QuizTask::new(
        id,
        Arc::new(Identity::new(EMAIL, SECRET)),
        url,
        Instant::now() + deadline,
    )
}

fn runner(capabilities: &Capabilities, policy: ChainPolicy) -> ChainRunner {
    ChainRunner::new(HopFlow::new(capabilities, policy))
}

fn page_route(server: &QuizServer, path: &str) -> String {
    format!("Page URL: {}", server.url(path))
}

#[tokio::test]
async fn test_single_hop_csv_mean() {
    let server = QuizServer::start(HashMap::from([(
        "/q1".to_string(),
        Verdict::new(json!(20), None),
    )]))
    .await;

    let (caps, renderer, _, solve) = capabilities(
        FakeRenderer::new().page(&server.url("/q1"), MEAN_Q),
        RoutedModel::new("extract").route(
            page_route(&server, "/q1"),
            extraction_reply(MEAN_Q, &["/data.csv"], "number"),
        ),
        RoutedModel::new("solve").route("mean=20", "The mean is 20.\nANSWER: 20"),
    );

    let outcome = runner(&caps, fast_policy())
        .run(task(1, &server.url("/q1"), Duration::from_secs(20)))
        .await;

    assert_eq!(
        outcome.status,
        ChainStatus::Done {
            depth_limit_reached: false
        }
    );
    assert_eq!(outcome.hops.len(), 1);
    assert_eq!(outcome.hops[0].answer, Some(json!(20)));
    assert_eq!(outcome.hops[0].degraded_files, 0);
    assert_eq!(renderer.renders.load(Ordering::SeqCst), 1);
    assert_eq!(solve.calls.load(Ordering::SeqCst), 1);

    let submissions = server.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(
        submissions[0],
        json!({"email": EMAIL, "secret": SECRET, "url": server.url("/q1"), "answer": 20})
    );
}

#[tokio::test]
async fn test_follows_next_url_until_done() {
    let server = QuizServer::start(HashMap::from([
        ("/q1".to_string(), Verdict::new(json!(20), Some("/q2"))),
        ("/q2".to_string(), Verdict::new(json!(60), None)),
    ]))
    .await;

    let (caps, renderer, _, _) = capabilities(
        FakeRenderer::new()
            .page(&server.url("/q1"), MEAN_Q)
            .page(&server.url("/q2"), SUM_Q),
        RoutedModel::new("extract")
            .route(
                page_route(&server, "/q1"),
                extraction_reply(MEAN_Q, &["/data.csv"], "number"),
            )
            .route(
                page_route(&server, "/q2"),
                extraction_reply(SUM_Q, &["/data.csv"], "number"),
            ),
        RoutedModel::new("solve")
            .route("What is the mean", "ANSWER: 20")
            .route("What is the sum", "ANSWER: 60"),
    );

    let outcome = runner(&caps, fast_policy())
        .run(task(2, &server.url("/q1"), Duration::from_secs(20)))
        .await;

    assert!(outcome.is_done(), "{}", outcome);
    assert_eq!(outcome.hops.len(), 2);
    assert_eq!(outcome.hops[0].depth, 0);
    assert_eq!(outcome.hops[1].depth, 1);
    assert_eq!(outcome.hops[1].url, server.url("/q2"));
    assert_eq!(renderer.renders.load(Ordering::SeqCst), 2);

    let submissions = server.submissions();
    assert_eq!(submissions.len(), 2);
    assert_eq!(submissions[1]["url"], json!(server.url("/q2")));
    assert_eq!(submissions[1]["answer"], json!(60));
}

#[tokio::test]
async fn test_wrong_answer_is_definitive_and_not_resubmitted() {
    let server = QuizServer::start(HashMap::from([(
        "/q1".to_string(),
        Verdict::new(json!(21), Some("/q2")),
    )]))
    .await;

    let (caps, _, _, _) = capabilities(
        FakeRenderer::new().page(&server.url("/q1"), MEAN_Q),
        RoutedModel::new("extract").route(
            page_route(&server, "/q1"),
            extraction_reply(MEAN_Q, &["/data.csv"], "number"),
        ),
        RoutedModel::new("solve").route("mean=20", "ANSWER: 20"),
    );

    let outcome = runner(&caps, fast_policy())
        .run(task(3, &server.url("/q1"), Duration::from_secs(20)))
        .await;

    let failure = outcome.failure().expect("chain should fail");
    assert_eq!(failure.kind, FailureKind::DefinitiveRejection);
    assert_eq!(failure.hop, 0);
    assert!(failure.message.contains("Wrong answer"));
    assert_eq!(outcome.hops[0].accepted, Some(false));
    assert_eq!(server.submissions().len(), 1);
}

#[tokio::test]
async fn test_skip_on_rejection_moves_to_next_question() {
    let mut wrong = Verdict::new(json!(21), Some("/q2"));
    wrong.next_on_wrong = true;
    let server = QuizServer::start(HashMap::from([
        ("/q1".to_string(), wrong),
        ("/q2".to_string(), Verdict::new(json!(60), None)),
    ]))
    .await;

    let (caps, _, _, _) = capabilities(
        FakeRenderer::new()
            .page(&server.url("/q1"), MEAN_Q)
            .page(&server.url("/q2"), SUM_Q),
        RoutedModel::new("extract")
            .route(
                page_route(&server, "/q1"),
                extraction_reply(MEAN_Q, &["/data.csv"], "number"),
            )
            .route(
                page_route(&server, "/q2"),
                extraction_reply(SUM_Q, &["/data.csv"], "number"),
            ),
        RoutedModel::new("solve")
            .route("What is the mean", "ANSWER: 20")
            .route("What is the sum", "ANSWER: 60"),
    );

    let policy = ChainPolicy {
        skip_on_rejection: true,
        ..fast_policy()
    };
    let outcome = runner(&caps, policy)
        .run(task(4, &server.url("/q1"), Duration::from_secs(20)))
        .await;

    assert!(outcome.is_done(), "{}", outcome);
    assert_eq!(outcome.hops[0].accepted, Some(false));
    assert_eq!(outcome.hops[1].accepted, Some(true));
}

#[tokio::test]
async fn test_depth_limit_stops_chain() {
    let server = QuizServer::start(HashMap::from([(
        "/q1".to_string(),
        Verdict::new(json!(20), Some("/q2")),
    )]))
    .await;

    let (caps, renderer, _, _) = capabilities(
        FakeRenderer::new().page(&server.url("/q1"), MEAN_Q),
        RoutedModel::new("extract").route(
            page_route(&server, "/q1"),
            extraction_reply(MEAN_Q, &["/data.csv"], "number"),
        ),
        RoutedModel::new("solve").route("mean=20", "ANSWER: 20"),
    );

    let policy = ChainPolicy {
        max_chain_depth: 1,
        ..fast_policy()
    };
    let outcome = runner(&caps, policy)
        .run(task(5, &server.url("/q1"), Duration::from_secs(20)))
        .await;

    assert_eq!(
        outcome.status,
        ChainStatus::Done {
            depth_limit_reached: true
        }
    );
    assert_eq!(renderer.renders.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_task_beyond_max_depth_is_rejected() {
    let (caps, renderer, _, _) = capabilities(
        FakeRenderer::new(),
        RoutedModel::new("extract"),
        RoutedModel::new("solve"),
    );
    let policy = ChainPolicy {
        max_chain_depth: 1,
        ..fast_policy()
    };

    let start = task(6, "http://127.0.0.1:9/q1", Duration::from_secs(20));
    let outcome = runner(&caps, policy).run(start.next_hop("http://127.0.0.1:9/q2")).await;

    assert_eq!(outcome.failure().map(|f| f.kind), Some(FailureKind::ChainDepthExceeded));
    assert_eq!(renderer.renders.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_no_hop_started_without_minimum_time() {
    let (caps, renderer, _, _) = capabilities(
        FakeRenderer::new().page("http://127.0.0.1:9/q1", MEAN_Q),
        RoutedModel::new("extract"),
        RoutedModel::new("solve"),
    );
    let policy = ChainPolicy {
        min_hop: Duration::from_secs(5),
        ..fast_policy()
    };

    let outcome = runner(&caps, policy)
        .run(task(7, "http://127.0.0.1:9/q1", Duration::from_secs(1)))
        .await;

    assert_eq!(outcome.failure().map(|f| f.kind), Some(FailureKind::DeadlineExceeded));
    assert!(outcome.hops.is_empty());
    assert_eq!(renderer.renders.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_deadline_interrupts_slow_render() {
    let server = QuizServer::start(HashMap::new()).await;
    let (caps, _, extract, _) = capabilities(
        FakeRenderer::new()
            .page(&server.url("/q1"), MEAN_Q)
            .with_delay(Duration::from_secs(3)),
        RoutedModel::new("extract"),
        RoutedModel::new("solve"),
    );
    let policy = ChainPolicy {
        min_hop: Duration::from_millis(100),
        ..fast_policy()
    };

    let started = std::time::Instant::now();
    let outcome = runner(&caps, policy)
        .run(task(8, &server.url("/q1"), Duration::from_millis(500)))
        .await;

    assert_eq!(outcome.failure().map(|f| f.kind), Some(FailureKind::DeadlineExceeded));
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(extract.calls.load(Ordering::SeqCst), 0);
    assert!(server.submissions().is_empty());
}

#[tokio::test]
async fn test_missing_file_degrades_instead_of_failing() {
    let server = QuizServer::start(HashMap::from([(
        "/q1".to_string(),
        Verdict::new(json!(20), None),
    )]))
    .await;

    let (caps, _, _, _) = capabilities(
        FakeRenderer::new().page(&server.url("/q1"), MEAN_Q),
        RoutedModel::new("extract").route(
            page_route(&server, "/q1"),
            extraction_reply(MEAN_Q, &["/data.csv", "/missing.csv"], "number"),
        ),
        RoutedModel::new("solve").route("[unavailable:", "ANSWER: 20"),
    );

    let outcome = runner(&caps, fast_policy())
        .run(task(9, &server.url("/q1"), Duration::from_secs(20)))
        .await;

    assert!(outcome.is_done(), "{}", outcome);
    assert_eq!(outcome.hops[0].degraded_files, 1);
}

#[tokio::test]
async fn test_chains_fail_independently() {
    let server = QuizServer::start(HashMap::from([(
        "/q1".to_string(),
        Verdict::new(json!(20), None),
    )]))
    .await;

    let (caps, _, _, _) = capabilities(
        FakeRenderer::new().page(&server.url("/q1"), MEAN_Q),
        RoutedModel::new("extract").route(
            page_route(&server, "/q1"),
            extraction_reply(MEAN_Q, &["/data.csv"], "number"),
        ),
        RoutedModel::new("solve").route("mean=20", "ANSWER: 20"),
    );
    let runner = runner(&caps, fast_policy());

    let (good, bad) = tokio::join!(
        runner.run(task(10, &server.url("/q1"), Duration::from_secs(20))),
        runner.run(task(11, &server.url("/nowhere"), Duration::from_secs(20))),
    );

    assert!(good.is_done(), "{}", good);
    assert_eq!(bad.failure().map(|f| f.kind), Some(FailureKind::Render));
    assert_eq!(server.submissions().len(), 1);
}

/// 提交在截止时间之后才返回，即使答对也不算完成
#[tokio::test]
async fn test_correct_answer_after_deadline_is_not_done() {
    let server = QuizServer::start(HashMap::from([(
        "/q1".to_string(),
        Verdict::new(json!(20), None).with_delay(Duration::from_secs(2)),
    )]))
    .await;

    let (caps, _, _, _) = capabilities(
        FakeRenderer::new().page(&server.url("/q1"), MEAN_Q),
        RoutedModel::new("extract").route(
            page_route(&server, "/q1"),
            extraction_reply(MEAN_Q, &["/data.csv"], "number"),
        ),
        RoutedModel::new("solve").route("mean=20", "ANSWER: 20"),
    );
    let policy = ChainPolicy {
        min_hop: Duration::from_millis(100),
        ..fast_policy()
    };

    let outcome = runner(&caps, policy)
        .run(task(12, &server.url("/q1"), Duration::from_millis(1500)))
        .await;

    assert!(!outcome.is_done(), "{}", outcome);
    assert_eq!(outcome.failure().map(|f| f.kind), Some(FailureKind::DeadlineExceeded));
    assert_eq!(outcome.hops.len(), 1);
    assert_eq!(outcome.hops[0].accepted, Some(true));
    assert_eq!(server.submissions().len(), 1);
}

/// 同一个起始 URL 重复提交会得到两条独立的链
#[tokio::test]
async fn test_same_origin_runs_as_independent_chains() {
    let server = QuizServer::start(HashMap::from([(
        "/q1".to_string(),
        Verdict::new(json!(20), None),
    )]))
    .await;

    let (caps, renderer, _, _) = capabilities(
        FakeRenderer::new().page(&server.url("/q1"), MEAN_Q),
        RoutedModel::new("extract").route(
            page_route(&server, "/q1"),
            extraction_reply(MEAN_Q, &["/data.csv"], "number"),
        ),
        RoutedModel::new("solve").route("mean=20", "ANSWER: 20"),
    );
    let failure_log = std::env::temp_dir().join(format!("failed_chains_{}.txt", std::process::id()));
    let dispatcher = Dispatcher::new(
        runner(&caps, fast_policy()),
        Identity::new(EMAIL, SECRET),
        Duration::from_secs(20),
        4,
        FailureLog::with_path(failure_log.to_string_lossy().to_string()),
    );

    let origin = server.url("/q1");
    let (first, second) = tokio::join!(dispatcher.solve(&origin), dispatcher.solve(&origin));

    assert!(first.is_done(), "{}", first);
    assert!(second.is_done(), "{}", second);
    assert_ne!(first.chain_id, second.chain_id);
    assert_eq!(first.origin_url, second.origin_url);
    assert_eq!(renderer.renders.load(Ordering::SeqCst), 2);

    let submissions = server.submissions();
    assert_eq!(submissions.len(), 2);
    assert!(submissions.iter().all(|s| s["url"] == json!(origin)));
}

//! Encode pipeline behavior against a scripted engine

mod common;

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use common::{ExecOutcome, FakeEngine, FakeLoader, Script};
use vidshrink::planner::EncodePlanner;
use vidshrink::ports::{EncoderEngine, ProgressListener};
use vidshrink::{
    CancellationToken, CodecDescriptor, CodecId, CompressionError, CompressionOptions,
    EncodePipeline, EncodePlan, InputMetadata, PipelineState,
};

fn plan() -> EncodePlan {
    let meta = InputMetadata::new(1920, 1080, 10 * 1024 * 1024).unwrap();
    EncodePlanner::default()
        .plan(
            &meta,
            &CompressionOptions::default(),
            CodecDescriptor::for_id(CodecId::H264),
        )
        .unwrap()
}

fn silent() -> ProgressListener {
    Arc::new(|_: f64| {})
}

fn pipeline_for(loader: FakeLoader) -> (Arc<EncodePipeline>, Arc<FakeLoader>) {
    let loader = Arc::new(loader);
    let pipeline = Arc::new(EncodePipeline::new(loader.clone(), 2));
    (pipeline, loader)
}

#[tokio::test]
async fn test_concurrent_first_calls_load_once() {
    let engine = FakeEngine::new(Script::default());
    let (pipeline, loader) =
        pipeline_for(FakeLoader::new(engine).with_delay(Duration::from_millis(50)));

    let (a, b, c) = tokio::join!(
        pipeline.load_engine(),
        pipeline.load_engine(),
        pipeline.load_engine()
    );
    assert!(a.is_ok() && b.is_ok() && c.is_ok());
    assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
    assert_eq!(pipeline.state(), PipelineState::Ready);

    pipeline.load_engine().await.unwrap();
    assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failed_load_is_retried() {
    let engine = FakeEngine::new(Script::default());
    let (pipeline, loader) = pipeline_for(FakeLoader::new(engine).failing(1));

    let first = pipeline.load_engine().await;
    assert!(matches!(
        first,
        Err(CompressionError::InitializationFailure { .. })
    ));
    assert_eq!(pipeline.state(), PipelineState::Uninitialized);

    assert!(pipeline.load_engine().await.is_ok());
    assert_eq!(loader.loads.load(Ordering::SeqCst), 2);
    assert_eq!(pipeline.state(), PipelineState::Ready);
}

#[tokio::test]
async fn test_missing_engine_is_unsupported_environment() {
    let engine = FakeEngine::new(Script::default());
    let (pipeline, _) = pipeline_for(FakeLoader::new(engine).unavailable());

    let result = pipeline
        .execute(b"data", "clip.mp4", &plan(), silent(), &CancellationToken::new())
        .await;
    assert!(matches!(
        result,
        Err(CompressionError::UnsupportedEnvironment { .. })
    ));
}

#[tokio::test]
async fn test_successful_encode_returns_output_and_cleans_up() {
    let engine = FakeEngine::new(Script::default());
    let (pipeline, _) = pipeline_for(FakeLoader::new(engine.clone()));

    let seen = Arc::new(Mutex::new(Vec::new()));
    let listener: ProgressListener = {
        let seen = seen.clone();
        Arc::new(move |fraction: f64| seen.lock().unwrap().push(fraction))
    };

    let output = pipeline
        .execute(&[1u8; 1000], "clip.mov", &plan(), listener, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(output.len(), 400);
    assert_eq!(*seen.lock().unwrap(), vec![0.25, 0.5, 0.75, 1.0]);
    assert!(engine.list_files().is_empty());
    assert_eq!(engine.listener_count(), 0);
    assert_eq!(pipeline.state(), PipelineState::Idle);

    let args = engine.last_args.lock().unwrap().clone();
    assert!(args.contains(&"input_0.mov".to_string()));
    assert_eq!(args.last().map(String::as_str), Some("output_0.mp4"));
}

#[tokio::test]
async fn test_encode_failure_carries_diagnostic_and_cleans_up() {
    let engine = FakeEngine::new(Script {
        outcome: ExecOutcome::Fail("Invalid data found when processing input".to_string()),
        ..Script::default()
    });
    let (pipeline, _) = pipeline_for(FakeLoader::new(engine.clone()));

    let result = pipeline
        .execute(b"garbage", "clip.mp4", &plan(), silent(), &CancellationToken::new())
        .await;

    match result {
        Err(CompressionError::EncodeFailure { message }) => {
            assert!(message.contains("Invalid data found"));
        }
        other => panic!("expected encode failure, got {:?}", other),
    }
    assert!(engine.list_files().is_empty());
    assert_eq!(engine.listener_count(), 0);
    assert_eq!(pipeline.state(), PipelineState::Failed);
}

#[tokio::test]
async fn test_missing_output_is_encode_failure() {
    let engine = FakeEngine::new(Script {
        outcome: ExecOutcome::NoOutput,
        ..Script::default()
    });
    let (pipeline, _) = pipeline_for(FakeLoader::new(engine.clone()));

    let result = pipeline
        .execute(b"data", "clip.mp4", &plan(), silent(), &CancellationToken::new())
        .await;
    assert!(matches!(result, Err(CompressionError::EncodeFailure { .. })));
    assert!(engine.list_files().is_empty());
}

#[tokio::test]
async fn test_cancel_before_staging_touches_nothing() {
    let engine = FakeEngine::new(Script::default());
    engine.insert_file("unrelated.bin", b"keep");
    let (pipeline, _) = pipeline_for(FakeLoader::new(engine.clone()));

    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = pipeline
        .execute(b"data", "clip.mp4", &plan(), silent(), &cancel)
        .await;

    assert!(matches!(result, Err(CompressionError::Cancelled)));
    assert_eq!(engine.list_files(), vec!["unrelated.bin".to_string()]);
    assert_eq!(engine.exec_calls.load(Ordering::SeqCst), 0);
    assert_eq!(pipeline.state(), PipelineState::Cancelled);
}

#[tokio::test]
async fn test_cancel_during_encode_discards_output() {
    let engine = FakeEngine::new(Script {
        duration: Duration::from_millis(200),
        ..Script::default()
    });
    let (pipeline, _) = pipeline_for(FakeLoader::new(engine.clone()));

    let cancel = CancellationToken::new();
    let running = {
        let pipeline = pipeline.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            pipeline
                .execute(b"data", "clip.mp4", &plan(), silent(), &cancel)
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(pipeline.state(), PipelineState::Encoding);
    cancel.cancel();

    let result = running.await.unwrap();
    assert!(matches!(result, Err(CompressionError::Cancelled)));
    assert_eq!(engine.exec_calls.load(Ordering::SeqCst), 1);
    assert!(engine.list_files().is_empty());
}

#[tokio::test]
async fn test_cancel_during_failing_encode_reports_cancelled() {
    let engine = FakeEngine::new(Script {
        duration: Duration::from_millis(200),
        outcome: ExecOutcome::Fail("boom".to_string()),
        ..Script::default()
    });
    let (pipeline, _) = pipeline_for(FakeLoader::new(engine.clone()));

    let cancel = CancellationToken::new();
    let running = {
        let pipeline = pipeline.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            pipeline
                .execute(b"data", "clip.mp4", &plan(), silent(), &cancel)
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();

    let result = running.await.unwrap();
    assert!(matches!(result, Err(CompressionError::Cancelled)));
    assert!(engine.list_files().is_empty());
    assert_eq!(engine.listener_count(), 0);
    assert_eq!(pipeline.state(), PipelineState::Cancelled);
}

#[tokio::test]
async fn test_pipeline_cancel_targets_running_call() {
    let engine = FakeEngine::new(Script {
        duration: Duration::from_millis(200),
        ..Script::default()
    });
    let (pipeline, _) = pipeline_for(FakeLoader::new(engine.clone()));
    assert!(!pipeline.cancel());

    let running = {
        let pipeline = pipeline.clone();
        tokio::spawn(async move {
            pipeline
                .execute(b"data", "clip.mp4", &plan(), silent(), &CancellationToken::new())
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(pipeline.cancel());
    assert!(matches!(
        running.await.unwrap(),
        Err(CompressionError::Cancelled)
    ));
    assert!(!pipeline.cancel());
}

#[tokio::test]
async fn test_time_budget_aborts_encoder() {
    let engine = FakeEngine::new(Script {
        duration: Duration::from_secs(30),
        ..Script::default()
    });
    let (pipeline, _) = pipeline_for(FakeLoader::new(engine.clone()));

    let mut plan = plan();
    plan.time_budget_seconds = 1;

    let started = Instant::now();
    let result = pipeline
        .execute(b"data", "clip.mp4", &plan, silent(), &CancellationToken::new())
        .await;

    assert!(matches!(
        result,
        Err(CompressionError::TimedOut { seconds: 1 })
    ));
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(engine.aborts.load(Ordering::SeqCst), 1);
    assert!(engine.list_files().is_empty());
    assert_eq!(pipeline.state(), PipelineState::Cancelled);
}

#[tokio::test]
async fn test_stuck_encoder_is_cleaned_up_after_it_returns() {
    let engine = FakeEngine::new(Script {
        duration: Duration::from_secs(7),
        honor_abort: false,
        ..Script::default()
    });
    let (pipeline, _) = pipeline_for(FakeLoader::new(engine.clone()));

    let mut budgeted = plan();
    budgeted.time_budget_seconds = 1;

    let started = Instant::now();
    let result = pipeline
        .execute(b"data", "clip.mp4", &budgeted, silent(), &CancellationToken::new())
        .await;

    assert!(matches!(
        result,
        Err(CompressionError::TimedOut { seconds: 1 })
    ));
    assert_eq!(engine.aborts.load(Ordering::SeqCst), 1);
    assert_eq!(engine.listener_count(), 0);
    assert!(engine.list_files().is_empty());

    // The ignored native call finishes and writes its output afterwards
    let remaining = Duration::from_secs(8).saturating_sub(started.elapsed());
    tokio::time::sleep(remaining).await;
    assert!(engine.list_files().is_empty(), "{:?}", engine.list_files());

    engine.set_script(Script::default());
    assert!(pipeline
        .execute(b"data", "next.mp4", &plan(), silent(), &CancellationToken::new())
        .await
        .is_ok());
    assert!(engine.list_files().is_empty());
}

#[tokio::test]
async fn test_concurrent_calls_are_serialized() {
    let engine = FakeEngine::new(Script {
        duration: Duration::from_millis(80),
        ..Script::default()
    });
    let (pipeline, _) = pipeline_for(FakeLoader::new(engine.clone()));

    let calls: Vec<_> = (0..3)
        .map(|i| {
            let pipeline = pipeline.clone();
            tokio::spawn(async move {
                pipeline
                    .execute(
                        &[i as u8; 64],
                        &format!("clip{}.mp4", i),
                        &plan(),
                        silent(),
                        &CancellationToken::new(),
                    )
                    .await
            })
        })
        .collect();

    for call in calls {
        assert!(call.await.unwrap().is_ok());
    }
    assert_eq!(engine.exec_calls.load(Ordering::SeqCst), 3);
    assert_eq!(engine.max_concurrent.load(Ordering::SeqCst), 1);
    assert!(engine.list_files().is_empty());
}

#[tokio::test]
async fn test_pipeline_recovers_after_failure() {
    let engine = FakeEngine::new(Script {
        outcome: ExecOutcome::Fail("boom".to_string()),
        ..Script::default()
    });
    let (pipeline, loader) = pipeline_for(FakeLoader::new(engine.clone()));

    assert!(pipeline
        .execute(b"data", "a.mp4", &plan(), silent(), &CancellationToken::new())
        .await
        .is_err());

    engine.set_script(Script::default());
    assert!(pipeline
        .execute(b"data", "b.mp4", &plan(), silent(), &CancellationToken::new())
        .await
        .is_ok());
    assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
    assert_eq!(pipeline.state(), PipelineState::Idle);
}

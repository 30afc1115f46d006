use pipewright::logger::{LogLevel, LOGGER};
use pipewright::*;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::io;
use std::sync::{Arc, Mutex, Once};

static TRACING: Once = Once::new();

fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new("pipewright=debug"))
            .with_test_writer()
            .try_init();
    });
}

#[derive(Clone, Default)]
struct CapturedOutput(Arc<Mutex<Vec<u8>>>);

impl CapturedOutput {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Outer pipeline of [+1, conditional(>5 ? x10 : x2), +1]
#[test]
fn test_conditional_inside_pipeline() {
    init_tracing();

    let pipeline = Pipeline::new()
        .pipe(stage(|n: i64| n + 1))
        .pipe(
            ConditionalStage::new(|n: &i64| *n > 5, stage(|n: i64| n * 10))
                .otherwise(stage(|n: i64| n * 2)),
        )
        .pipe(stage(|n: i64| n + 1));

    assert_eq!(pipeline.process(7).unwrap(), 81); // (7+1) * 10 + 1
    assert_eq!(pipeline.process(3).unwrap(), 9); // (3+1) * 2 + 1
}

#[test]
fn test_order_matches_manual_composition() {
    let s1 = stage(|n: i64| n * 3).shared();
    let s2 = stage(|n: i64| n - 4).shared();

    let pipeline = PipelineFactory::build([s1.clone(), s2.clone()]);

    for p in [-3, 0, 5, 42] {
        let manual = s2.invoke(s1.invoke(p).unwrap()).unwrap();
        assert_eq!(pipeline.process(p).unwrap(), manual);
    }
}

#[test]
fn test_early_stop_returns_stopping_stage_output() {
    let later_calls = Arc::new(AtomicUsize::new(0));
    let counter = later_calls.clone();

    let pipeline = pipeline![
        stage(|n: i64| n + 5),
        stage(|n: i64| n * 2).stop_when(|_: &i64| true),
        stage(move |n: i64| {
            counter.fetch_add(1, Ordering::SeqCst);
            n + 100
        }),
    ];

    assert_eq!(pipeline.process(3).unwrap(), 16);
    assert_eq!(later_calls.load(Ordering::SeqCst), 0);

    let run = pipeline.execute(3).unwrap();
    assert_eq!(run.payload, 16);
    assert_eq!(run.remaining_stages(), 1);
}

#[test]
fn test_switch_routes_heterogeneous_json_payloads() {
    let sum = stage(|payload: Value| {
        let total: i64 = payload["items"]
            .as_array()
            .map(|items| items.iter().filter_map(Value::as_i64).sum())
            .unwrap_or_default();
        json!(total)
    });
    let count = stage(|payload: Value| {
        json!(payload["items"].as_array().map(|items| items.len()).unwrap_or(0))
    });

    let router = SwitchStage::builder(|payload: &Value| payload["op"].clone())
        .case("sum", sum)
        .case("count", count)
        .default(stage(|_: Value| Value::Null))
        .build();

    let pipeline = Pipeline::named("aggregate").pipe(router);

    assert_eq!(
        pipeline.process(json!({"op": "sum", "items": [1, 2, 3]})).unwrap(),
        json!(6)
    );
    assert_eq!(
        pipeline.process(json!({"op": "count", "items": [1, 2, 3]})).unwrap(),
        json!(3)
    );
    assert_eq!(
        pipeline.process(json!({"op": "max", "items": [1]})).unwrap(),
        Value::Null
    );
}

#[test]
fn test_contract_violation_aborts_process() {
    let reached = Arc::new(AtomicUsize::new(0));
    let counter = reached.clone();

    let pipeline = Pipeline::new()
        .pipe(
            SwitchStage::builder(|payload: &Value| payload.clone())
                .case("a", stage(|p: Value| p))
                .build(),
        )
        .pipe(stage(move |p: Value| {
            counter.fetch_add(1, Ordering::SeqCst);
            p
        }));

    let err = pipeline.process(json!({"not": "a key"})).unwrap_err();
    assert!(err.is_contract_violation());
    assert_eq!(err.to_string(), "Selector must return a string or integer");
    assert_eq!(reached.load(Ordering::SeqCst), 0);
}

#[test]
fn test_violation_inside_nested_pipeline_keeps_its_kind() {
    let inner = Pipeline::new().pipe(ConditionalStage::new(|_: &i64| "yes", stage(|n: i64| n)));
    let outer = Pipeline::new().pipe(FnStage::try_new(move |n: i64| inner.process(n)));

    let err = outer.process(1).unwrap_err();
    assert!(matches!(err, PipelineError::NonBooleanCondition { found: "string" }));
}

#[test]
fn test_failures_are_logged() {
    LOGGER.set_min_level(LogLevel::Error);

    let pipeline = Pipeline::named("logging-check").pipe(FnStage::try_new(|_: i64| {
        Err::<i64, _>(std::io::Error::new(std::io::ErrorKind::Other, "disk on fire"))
    }));

    let err = pipeline.process(1).unwrap_err();
    assert_eq!(err.to_string(), "disk on fire");

    let logged = LOGGER
        .get_logs()
        .into_iter()
        .any(|entry| {
            entry.level == LogLevel::Error
                && entry.source == "pipeline"
                && entry.message.contains("disk on fire")
                && entry.message.contains("logging-check")
        });
    assert!(logged);
}

#[test]
fn test_debug_events_reach_subscriber_above_min_level() {
    LOGGER.set_min_level(LogLevel::Error);

    let output = CapturedOutput::default();
    let writer = output.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    let pipeline = Pipeline::named("tracing-check").pipe(stage(|n: i64| n + 1).named("Increment"));
    let result = tracing::subscriber::with_default(subscriber, || pipeline.process(1));

    assert_eq!(result.unwrap(), 2);
    let captured = output.contents();
    assert!(captured.contains("DEBUG"));
    assert!(captured.contains("Executing stage 1/1: Increment (pipeline: tracing-check)"));
}

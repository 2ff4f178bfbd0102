#![cfg(test)]

use std::{
    fs,
    num::NonZeroUsize,
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use comms::{
    Container, ProtocolDecodeErr,
    msg::{ACK_SENTINEL, MessageClass, Request},
    specs::server::CheckpointMode,
};

use crate::{
    access::{AccessMethod, Additive, GradientDescent, PullAccess, PushAccess},
    checkpoint::{CheckpointSink, Checkpointer},
    service::{Handler, HandlerErr, PullHandler, PushHandler},
    storage::ParameterTable,
};

struct Fixture<A: AccessMethod> {
    table: Arc<ParameterTable<u64, A::Param>>,
    pull: PullHandler<u64, PullAccess<u64, A>>,
    push: PushHandler<u64, PushAccess<u64, A>>,
    counter: Arc<AtomicU64>,
}

impl<A: AccessMethod> Fixture<A> {
    fn new(method: A, backup: Option<(&Path, i64)>) -> Self {
        Self::with_mode(method, backup, CheckpointMode::Sync)
    }

    fn with_mode(method: A, backup: Option<(&Path, i64)>, mode: CheckpointMode) -> Self {
        let table = Arc::new(ParameterTable::new(NonZeroUsize::new(4).unwrap()));
        let method = Arc::new(method);
        let counter = Arc::new(AtomicU64::new(0));

        let sink = backup.map(|(root, period)| -> Arc<dyn CheckpointSink> {
            Arc::new(Checkpointer::new(Arc::clone(&table), root, period, mode))
        });

        Self {
            pull: PullHandler::new(PullAccess::new(Arc::clone(&table), Arc::clone(&method))),
            push: PushHandler::new(
                PushAccess::new(Arc::clone(&table), method),
                Arc::clone(&counter),
                sink,
            ),
            table,
            counter,
        }
    }

    fn pushes(&self) -> u64 {
        self.counter.load(Ordering::Acquire)
    }
}

fn request(class: MessageClass, fields: impl FnOnce(&mut Container)) -> Request {
    let mut payload = Container::new();
    fields(&mut payload);
    Request::new(class, 1, payload)
}

fn push_scalars(items: &[(u64, f32)]) -> Request {
    request(MessageClass::WorkerPushRequest, |cont| {
        for (key, grad) in items {
            cont.push(key).push(grad);
        }
    })
}

fn pull_scalars(keys: &[u64]) -> Request {
    request(MessageClass::WorkerPullRequest, |cont| {
        for key in keys {
            cont.push(key).push(&0f32);
        }
    })
}

fn checkpoint_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<_> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    names.sort();
    names
}

#[test]
fn test_additive_push_then_pull() {
    let fx = Fixture::new(Additive::<f32>::new(), None);

    let mut ack = fx.push.handle(push_scalars(&[(11, 0.5), (22, -2.0)])).unwrap();
    assert_eq!(ack.payload.read::<i32>().unwrap(), ACK_SENTINEL);
    assert!(ack.payload.read_finished());
    assert_eq!(fx.pushes(), 1);

    let mut rsp = fx.pull.handle(pull_scalars(&[11, 22])).unwrap();
    let pairs = rsp.payload.read_pairs::<u64, f32>().unwrap();
    assert_eq!(pairs, [(11, 0.5), (22, -2.0)]);
}

#[test]
fn test_pull_preserves_request_order_and_duplicates() {
    let fx = Fixture::new(Additive::<f32>::new(), None);
    fx.push.handle(push_scalars(&[(1, 1.0), (2, 2.0), (3, 3.0)])).unwrap();

    let mut rsp = fx.pull.handle(pull_scalars(&[3, 1, 3, 2])).unwrap();
    let pairs = rsp.payload.read_pairs::<u64, f32>().unwrap();

    assert_eq!(pairs, [(3, 3.0), (1, 1.0), (3, 3.0), (2, 2.0)]);
}

#[test]
fn test_pull_materializes_defaults() {
    let fx = Fixture::new(GradientDescent::new(0.1, 2), None);

    let req = request(MessageClass::WorkerPullRequest, |cont| {
        cont.push(&8u64).push(&Vec::<f32>::new());
    });
    let mut rsp = fx.pull.handle(req).unwrap();

    assert_eq!(rsp.payload.read::<u64>().unwrap(), 8);
    assert_eq!(rsp.payload.read::<Vec<f32>>().unwrap(), [0.0, 0.0]);
    assert_eq!(fx.table.len(), 1);
    assert_eq!(fx.pushes(), 0);
}

#[test]
fn test_empty_push_still_counts() {
    let fx = Fixture::new(Additive::<f32>::new(), None);

    fx.push.handle(push_scalars(&[])).unwrap();
    assert_eq!(fx.pushes(), 1);
    assert!(fx.table.is_empty());
}

#[test]
fn test_malformed_push_applies_nothing() {
    let fx = Fixture::new(Additive::<f32>::new(), None);

    // Third item carries a key without its gradient.
    let req = request(MessageClass::WorkerPushRequest, |cont| {
        cont.push(&1u64).push(&1.0f32).push(&2u64).push(&1.0f32).push(&3u64);
    });

    let err = fx.push.handle(req).unwrap_err();
    assert!(matches!(
        err,
        HandlerErr::Decode(ProtocolDecodeErr::Truncated { .. })
    ));
    assert!(fx.table.is_empty());
    assert_eq!(fx.pushes(), 0);
}

#[test]
fn test_mistyped_pull_is_rejected() {
    let fx = Fixture::new(Additive::<f32>::new(), None);

    let req = request(MessageClass::WorkerPullRequest, |cont| {
        cont.push(&1u64).push(&1.0f64);
    });

    assert!(matches!(
        fx.pull.handle(req),
        Err(HandlerErr::Decode(ProtocolDecodeErr::TypeMismatch { .. }))
    ));
    assert!(fx.table.is_empty());
}

#[test]
fn test_wrong_dimension_rejects_whole_push() {
    let fx = Fixture::new(GradientDescent::new(1.0, 2), None);

    let req = request(MessageClass::WorkerPushRequest, |cont| {
        cont.push(&1u64).push(&vec![1.0f32, 1.0]);
        cont.push(&2u64).push(&vec![1.0f32]);
    });

    let err = fx.push.handle(req).unwrap_err();
    assert!(matches!(err, HandlerErr::SizeMismatch { index: 1, .. }));
    assert_eq!(fx.table.get(&1), None);
    assert_eq!(fx.pushes(), 0);
}

#[test]
fn test_checkpoint_every_second_push() {
    let dir = tempfile::tempdir().unwrap();
    let fx = Fixture::new(Additive::<f32>::new(), Some((dir.path(), 2)));

    fx.push.handle(push_scalars(&[(1, 1.0)])).unwrap();
    assert!(checkpoint_names(dir.path()).is_empty());

    fx.push.handle(push_scalars(&[(2, 1.0)])).unwrap();
    assert_eq!(checkpoint_names(dir.path()), ["param-2.txt"]);

    fx.push.handle(push_scalars(&[(3, 1.0)])).unwrap();
    assert_eq!(checkpoint_names(dir.path()), ["param-2.txt"]);
    assert_eq!(fx.pushes(), 3);

    // The dump holds both keys applied before it.
    let text = fs::read_to_string(dir.path().join("param-2.txt")).unwrap();
    let mut lines: Vec<_> = text.lines().collect();
    lines.sort();
    assert_eq!(lines, ["1\t1", "2\t1"]);
}

#[test]
fn test_disabled_period_never_writes() {
    let dir = tempfile::tempdir().unwrap();
    let fx = Fixture::new(Additive::<f32>::new(), Some((dir.path(), 0)));

    for key in 0..10 {
        fx.push.handle(push_scalars(&[(key, 1.0)])).unwrap();
    }

    assert_eq!(fx.pushes(), 10);
    assert!(checkpoint_names(dir.path()).is_empty());
}

#[test]
fn test_failed_checkpoint_doesnt_fail_push() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    fs::write(&blocker, "").unwrap();

    let fx = Fixture::new(Additive::<f32>::new(), Some((blocker.as_path(), 1)));

    let mut ack = fx.push.handle(push_scalars(&[(1, 4.0)])).unwrap();
    assert_eq!(ack.payload.read::<i32>().unwrap(), ACK_SENTINEL);
    assert_eq!(fx.pushes(), 1);
    assert_eq!(fx.table.get(&1), Some(4.0));
}

fn wait_for_file(path: &Path) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);

    while Instant::now() < deadline {
        if path.is_file() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }

    false
}

#[test]
fn test_background_checkpoint_lands_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let fx = Fixture::with_mode(
        Additive::<f32>::new(),
        Some((dir.path(), 3)),
        CheckpointMode::Background,
    );

    for key in 0..3 {
        let mut ack = fx.push.handle(push_scalars(&[(key, 2.0)])).unwrap();
        assert_eq!(ack.payload.read::<i32>().unwrap(), ACK_SENTINEL);
    }
    assert_eq!(fx.pushes(), 3);

    let path = dir.path().join("param-3.txt");
    assert!(wait_for_file(&path), "{path:?} never appeared");

    // The file is renamed into place only once complete.
    let text = fs::read_to_string(&path).unwrap();
    let mut lines: Vec<_> = text.lines().collect();
    lines.sort();
    assert_eq!(lines, ["0\t2", "1\t2", "2\t2"]);
}

#[test]
fn test_failed_background_checkpoint_doesnt_fail_push() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    fs::write(&blocker, "").unwrap();

    let fx = Fixture::with_mode(
        Additive::<f32>::new(),
        Some((blocker.as_path(), 1)),
        CheckpointMode::Background,
    );

    for round in 1..=3 {
        let mut ack = fx.push.handle(push_scalars(&[(1, 1.0)])).unwrap();
        assert_eq!(ack.payload.read::<i32>().unwrap(), ACK_SENTINEL);
        assert_eq!(fx.pushes(), round);
    }

    assert_eq!(fx.table.get(&1), Some(3.0));
    assert!(blocker.is_file());
    assert_eq!(checkpoint_names(dir.path()), ["not-a-dir"]);
}

#[test]
fn test_concurrent_pushes_lose_nothing() {
    const THREADS: u64 = 8;
    const PUSHES: u64 = 250;

    let fx = Fixture::new(Additive::<f32>::new(), None);

    thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| {
                for _ in 0..PUSHES {
                    fx.push.handle(push_scalars(&[(7, 1.0), (9, 0.5)])).unwrap();
                }
            });
        }
    });

    assert_eq!(fx.pushes(), THREADS * PUSHES);
    assert_eq!(fx.table.get(&7), Some((THREADS * PUSHES) as f32));
    assert_eq!(fx.table.get(&9), Some((THREADS * PUSHES) as f32 * 0.5));
}

use rendezvous::{
    BarrierConfig, BarrierEvent, BarrierRegistry, BarrierState, LockName, LockNamespace,
    NamedLock,
};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn names(count: usize) -> Vec<LockName> {
    (0..count)
        .map(|i| LockName::new(format!("p{}", i)).unwrap())
        .collect()
}

#[derive(Debug, Clone)]
struct LogEntry {
    participant: LockName,
    event: BarrierEvent,
    self_claimed: bool,
}

#[test]
fn test_empty_peer_set_returns_immediately() {
    let temp = TempDir::new().unwrap();
    let ns = LockNamespace::new(temp.path()).unwrap();
    let registry = BarrierRegistry::new();
    let name = LockName::new("alone").unwrap();

    let participant = registry
        .get_instance(&ns, &name, Vec::new(), BarrierConfig::default())
        .unwrap();

    let start = Instant::now();
    participant.wait().unwrap();

    // Default poll interval is 3s; no sleep may have happened
    assert!(start.elapsed() < Duration::from_secs(1));
    assert_eq!(participant.state(), BarrierState::Passed);
}

#[test]
fn test_five_participants_rendezvous() {
    let temp = TempDir::new().unwrap();
    let ns = LockNamespace::new(temp.path()).unwrap();
    let registry = Arc::new(BarrierRegistry::new());
    let all = names(5);
    let log = Arc::new(Mutex::new(Vec::<LogEntry>::new()));
    let (done_tx, done_rx) = mpsc::channel();

    for (i, name) in all.iter().enumerate() {
        let peers: Vec<LockName> = all.iter().filter(|p| *p != name).cloned().collect();
        let name = name.clone();
        let ns = ns.clone();
        let registry = registry.clone();
        let log = log.clone();
        let done_tx = done_tx.clone();

        thread::spawn(move || {
            // Stagger arrivals so early participants really have to poll
            thread::sleep(Duration::from_millis(40 * i as u64));

            let config = BarrierConfig::new(Duration::from_millis(50));
            let participant = registry.get_instance(&ns, &name, peers, config).unwrap();

            let result = participant.wait_observed(|event| {
                let self_claimed = NamedLock::probe_claim(&ns, &name).unwrap();
                log.lock().unwrap().push(LogEntry {
                    participant: name.clone(),
                    event: event.clone(),
                    self_claimed,
                });
            });
            done_tx.send((name, result.is_ok())).unwrap();
        });
    }

    for _ in 0..all.len() {
        let (name, ok) = done_rx
            .recv_timeout(Duration::from_secs(20))
            .expect("a participant never passed the barrier");
        assert!(ok, "participant {} failed", name);
    }

    let log = log.lock().unwrap();
    for name in &all {
        let entries: Vec<&LogEntry> = log.iter().filter(|e| &e.participant == name).collect();

        assert_eq!(entries.first().unwrap().event, BarrierEvent::SelfClaimed);
        assert!(entries.first().unwrap().self_claimed);

        let scans: Vec<&&LogEntry> = entries
            .iter()
            .filter(|e| matches!(e.event, BarrierEvent::Scanned { .. }))
            .collect();
        assert!(!scans.is_empty());
        assert!(
            scans.iter().all(|e| e.self_claimed),
            "{} scanned without holding its own claim",
            name
        );

        // Only the last scan may find everyone present
        let (last_scan, earlier) = scans.split_last().unwrap();
        assert!(matches!(&last_scan.event, BarrierEvent::Scanned { missing, .. } if missing.is_empty()));
        assert!(earlier
            .iter()
            .all(|e| matches!(&e.event, BarrierEvent::Scanned { missing, .. } if !missing.is_empty())));

        let last = entries.last().unwrap();
        match last.event {
            BarrierEvent::Passed { rounds } => {
                assert_eq!(rounds as usize, scans.len());
                assert!(rounds < 100, "{} needed {} rounds", name, rounds);
            }
            ref other => panic!("{} ended with {:?}", name, other),
        }
        assert!(!last.self_claimed, "{} kept its claim after passing", name);
    }
}

#[test]
fn test_waits_for_late_peer() {
    let temp = TempDir::new().unwrap();
    let ns = LockNamespace::new(temp.path()).unwrap();
    let registry = Arc::new(BarrierRegistry::new());
    let early = LockName::new("early").unwrap();
    let late = LockName::new("late").unwrap();
    let config = BarrierConfig::new(Duration::from_millis(20));

    let participant = registry
        .get_instance(&ns, &early, [late.clone()], config.clone())
        .unwrap();

    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut rounds = 0;
        let result = participant.wait_observed(|event| {
            if let BarrierEvent::Passed { rounds: r } = event {
                rounds = *r;
            }
        });
        tx.send((result.is_ok(), rounds)).unwrap();
    });

    thread::sleep(Duration::from_millis(200));
    assert!(matches!(rx.try_recv(), Err(mpsc::TryRecvError::Empty)));

    // Registering is enough to be seen; `late` never has to wait itself
    registry
        .get_instance(&ns, &late, [early.clone()], config)
        .unwrap();

    let (ok, rounds) = rx.recv_timeout(Duration::from_secs(10)).unwrap();
    assert!(ok);
    assert!(rounds > 1);
}

#[test]
fn test_absent_peer_blocks_indefinitely() {
    let temp = TempDir::new().unwrap();
    let ns = LockNamespace::new(temp.path()).unwrap();
    let registry = BarrierRegistry::new();
    let p0 = LockName::new("p0").unwrap();
    let p1 = LockName::new("p1").unwrap();

    let participant = registry
        .get_instance(
            &ns,
            &p0,
            [p1.clone()],
            BarrierConfig::new(Duration::from_millis(20)),
        )
        .unwrap();

    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(participant.wait().is_ok());
    });

    assert_eq!(
        rx.recv_timeout(Duration::from_millis(600)),
        Err(RecvTimeoutError::Timeout),
        "wait returned although p1 never appeared"
    );
    assert_eq!(participant.state(), BarrierState::Scanning);
    assert!(NamedLock::probe_claim(&ns, &p0).unwrap());
    assert!(!NamedLock::probe(&ns, &p1).unwrap());
}

#[test]
fn test_concurrent_presence_checks_do_not_fake_presence() {
    let temp = TempDir::new().unwrap();
    let ns = LockNamespace::new(temp.path()).unwrap();
    let registry = BarrierRegistry::new();
    let p0 = LockName::new("p0").unwrap();
    let q0 = LockName::new("q0").unwrap();
    let p1 = LockName::new("p1").unwrap();

    // p1 was opened once and is gone again
    drop(NamedLock::open(&ns, &p1).unwrap());

    let busy = registry
        .get_instance(&ns, &p0, [p1.clone()], BarrierConfig::new(Duration::ZERO))
        .unwrap();
    // Scans on a different gate run at the same time as p0's
    let other_gate = BarrierConfig::new(Duration::from_millis(20))
        .with_gate_name(LockName::new("other-gate").unwrap());
    let ungated = registry
        .get_instance(&ns, &q0, [p1.clone()], other_gate)
        .unwrap();

    let stop = Arc::new(AtomicBool::new(false));
    let checker = {
        let stop = stop.clone();
        let ns = ns.clone();
        let p1 = p1.clone();
        thread::spawn(move || {
            let mut seen = false;
            while !stop.load(Ordering::Relaxed) {
                seen |= NamedLock::probe(&ns, &p1).unwrap();
                seen |= NamedLock::probe_claim(&ns, &p1).unwrap();
            }
            seen
        })
    };

    let (tx, rx) = mpsc::channel();
    for participant in [busy, ungated] {
        let tx = tx.clone();
        thread::spawn(move || {
            let _ = tx.send((participant.name().clone(), participant.wait().is_ok()));
        });
    }

    let outcome = rx.recv_timeout(Duration::from_millis(800));
    stop.store(true, Ordering::Relaxed);
    let seen = checker.join().unwrap();

    assert_eq!(
        outcome,
        Err(RecvTimeoutError::Timeout),
        "a participant passed although p1 never started"
    );
    assert!(!seen, "p1 was reported present or claimed");
    assert_eq!(busy.state(), BarrierState::Scanning);
    assert_eq!(ungated.state(), BarrierState::Scanning);
}

//! The full multi-device wake cycle: schedule, ring, acknowledge one by
//! one, stop together, reset, re-arm for the next morning.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use reveille_core::alarm::ops;
use reveille_core::clock::FixedClock;
use reveille_core::device::ReconcileEngine;
use reveille_core::events::Event;
use reveille_core::store::memory::MemoryStore;
use reveille_core::store::DocumentStore;
use reveille_core::time::SimpleTime;
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};

fn clock() -> FixedClock {
    // Local wall clock 10:00, UTC+5:30 (04:30 reference).
    let now = DateTime::parse_from_rfc3339("2024-03-10T04:30:00Z")
        .unwrap()
        .with_timezone(&Utc);
    FixedClock::new(now, 330)
}

async fn next(rx: &mut mpsc::UnboundedReceiver<Event>) -> Event {
    timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("event expected")
        .expect("engine alive")
}

#[tokio::test]
async fn two_member_group_rides_a_full_cycle() {
    let store = Arc::new(MemoryStore::new());

    // a signs in, creates the group; b signs in and joins.
    assert_eq!(ops::attach(store.as_ref(), "a@x").unwrap(), None);
    ops::create(store.as_ref(), "G", "a@x").unwrap();
    ops::join(store.as_ref(), "G", "b@x").unwrap();
    ops::update_time(store.as_ref(), "G", SimpleTime::new(23, 30).unwrap()).unwrap();

    let (dev_a, mut ev_a) = ReconcileEngine::spawn(store.clone(), clock(), "a@x");
    let (dev_b, mut ev_b) = ReconcileEngine::spawn(store.clone(), clock(), "b@x");
    let group = ops::attach(store.as_ref(), "a@x").unwrap().unwrap().group_id;
    dev_a.connect(Some(&group));
    dev_b.connect(Some(&group));

    // Reference 23:30 at UTC+5:30 arms for 05:00 local the next day.
    let expected = Utc.with_ymd_and_hms(2024, 3, 10, 23, 30, 0).unwrap();
    for ev in [&mut ev_a, &mut ev_b] {
        assert_eq!(
            next(ev).await,
            Event::GroupChanged {
                group: Some("G".into())
            }
        );
        match next(ev).await {
            Event::AlarmScheduled { local_instant, .. } => {
                assert_eq!(local_instant, expected)
            }
            other => panic!("expected AlarmScheduled, got {other:?}"),
        }
    }

    // The trigger fires on both devices.
    dev_a.trigger_now();
    dev_b.trigger_now();
    assert_eq!(
        next(&mut ev_a).await,
        Event::RingingStarted { group: "G".into() }
    );
    assert_eq!(
        next(&mut ev_b).await,
        Event::RingingStarted { group: "G".into() }
    );

    // a acknowledges first: group flips to ringing, not yet complete.
    dev_a.acknowledge().await.unwrap();
    let rec = store
        .run_transaction(&mut |tx| Ok(tx.get_alarm("G")?.unwrap()))
        .unwrap();
    assert_eq!(rec.awake, ["a@x"]);
    assert!(rec.ringing && !rec.all_awake);

    // b completes the set: everyone stops together, b pushes the reset.
    dev_b.acknowledge().await.unwrap();
    assert_eq!(
        next(&mut ev_a).await,
        Event::RingingStopped { group: "G".into() }
    );
    assert_eq!(
        next(&mut ev_b).await,
        Event::RingingStopped { group: "G".into() }
    );
    assert_eq!(
        next(&mut ev_b).await,
        Event::CycleReset { group: "G".into() }
    );

    let rec = store
        .run_transaction(&mut |tx| Ok(tx.get_alarm("G")?.unwrap()))
        .unwrap();
    assert!(rec.awake.is_empty());
    assert!(!rec.ringing && !rec.all_awake);
    assert_eq!(rec.time, SimpleTime::new(23, 30).unwrap());

    // With the cycle reset, tomorrow's time can move; devices re-arm.
    let tomorrow = SimpleTime::new(22, 0).unwrap();
    ops::update_time(store.as_ref(), "G", tomorrow).unwrap();
    for ev in [&mut ev_a, &mut ev_b] {
        match next(ev).await {
            Event::AlarmScheduled { time, .. } => assert_eq!(time, tomorrow),
            other => panic!("expected AlarmScheduled, got {other:?}"),
        }
    }

    dev_a.shutdown();
    dev_b.shutdown();
}

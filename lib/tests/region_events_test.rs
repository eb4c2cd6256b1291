// Copyright 2025 The Drasi Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Region entry events from native notification threads to region wrappers.

use std::rc::Rc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use gemfire_bridge::test_support::{
    entry_created, entry_destroyed, entry_updated, panicking_emitter, recording_emitter,
    EmitterProbe,
};
use gemfire_bridge::{
    BridgeConfig, CacheListener, DefaultValueConverter, EntryEvent, EventLoop, HostValue,
    NativeValue, RegionEventRouter, RegionId, RegionWrapper,
};
use tokio::time::timeout;

fn setup() -> (EventLoop, RegionEventRouter) {
    let event_loop = EventLoop::new(&BridgeConfig {
        worker_pool_size: 1,
        ..BridgeConfig::default()
    })
    .unwrap();
    let router = RegionEventRouter::new(&event_loop, Rc::new(DefaultValueConverter::new()));
    (event_loop, router)
}

fn region(router: &RegionEventRouter, path: &str) -> (Rc<RegionWrapper>, EmitterProbe) {
    let (emitter, probe) = recording_emitter();
    (RegionWrapper::new(router, RegionId::new(path), emitter), probe)
}

/// Fire events from a separate thread, the way the SDK does.
fn notify_from_sdk_thread(listener: Arc<dyn CacheListener>, events: Vec<(&'static str, EntryEvent)>) {
    thread::spawn(move || {
        for (kind, event) in events {
            match kind {
                "create" => listener.after_create(&event),
                "update" => listener.after_update(&event),
                "destroy" => listener.after_destroy(&event),
                other => panic!("unknown kind {other}"),
            }
        }
    })
    .join()
    .unwrap();
}

async fn run(event_loop: &EventLoop) {
    timeout(Duration::from_secs(10), event_loop.run())
        .await
        .expect("event loop did not go idle")
        .unwrap();
}

#[tokio::test]
async fn test_event_reaches_only_matching_region() {
    let (event_loop, router) = setup();
    let (_r1, p1) = region(&router, "/r1");
    let (_r2, p2) = region(&router, "/r2");

    notify_from_sdk_thread(
        router.listener(),
        vec![(
            "create",
            entry_created("/r1", NativeValue::string("k"), NativeValue::Int32(1)),
        )],
    );
    run(&event_loop).await;

    assert_eq!(p1.names(), vec!["create"]);
    assert_eq!(
        p1.events()[0].payload,
        Some(HostValue::object([
            ("key", HostValue::string("k")),
            ("oldValue", HostValue::Null),
            ("newValue", HostValue::Number(1.0)),
        ]))
    );
    assert!(p2.events().is_empty());
}

#[tokio::test]
async fn test_deregistered_region_receives_nothing() {
    let (event_loop, router) = setup();
    let (r1, p1) = region(&router, "/r1");
    let (_r2, p2) = region(&router, "/r2");
    assert_eq!(router.registered_count(), 2);

    drop(r1);
    assert_eq!(router.registered_count(), 1);
    assert_eq!(p1.drop_count(), 1);

    notify_from_sdk_thread(
        router.listener(),
        vec![(
            "update",
            entry_updated(
                "/r1",
                NativeValue::string("k"),
                NativeValue::Int32(1),
                NativeValue::Int32(2),
            ),
        )],
    );
    run(&event_loop).await;

    assert!(p1.events().is_empty());
    assert!(p2.events().is_empty());
}

#[tokio::test]
async fn test_event_buffered_before_deregistration_is_dropped() {
    let (event_loop, router) = setup();
    let (r1, p1) = region(&router, "/r1");

    notify_from_sdk_thread(
        router.listener(),
        vec![(
            "destroy",
            entry_destroyed("/r1", NativeValue::string("k"), NativeValue::Int32(1)),
        )],
    );
    drop(r1);
    run(&event_loop).await;

    assert!(p1.events().is_empty());
}

#[tokio::test]
async fn test_all_wrappers_for_a_region_are_notified_in_order() {
    let (event_loop, router) = setup();
    let (_a, pa) = region(&router, "/orders");
    let (_b, pb) = region(&router, "orders");

    notify_from_sdk_thread(
        router.listener(),
        vec![
            (
                "create",
                entry_created("/orders", NativeValue::string("o1"), NativeValue::Boolean(true)),
            ),
            (
                "update",
                entry_updated(
                    "/orders",
                    NativeValue::string("o1"),
                    NativeValue::Boolean(true),
                    NativeValue::Boolean(false),
                ),
            ),
            (
                "destroy",
                entry_destroyed("/orders", NativeValue::string("o1"), NativeValue::Boolean(false)),
            ),
        ],
    );
    run(&event_loop).await;

    for probe in [&pa, &pb] {
        assert_eq!(probe.names(), vec!["create", "update", "destroy"]);
        let destroy = probe.events()[2].payload.clone().unwrap();
        assert_eq!(destroy.get("oldValue"), &HostValue::Boolean(false));
        assert_eq!(destroy.get("newValue"), &HostValue::Null);
    }
}

#[tokio::test]
async fn test_conversion_failure_is_isolated_to_its_region() {
    let (event_loop, router) = setup();
    let (_bad, p_bad) = region(&router, "/bad");
    let (_good, p_good) = region(&router, "/good");

    let unconvertible = NativeValue::Map(vec![(NativeValue::List(vec![]), NativeValue::Null)]);
    notify_from_sdk_thread(
        router.listener(),
        vec![
            (
                "create",
                entry_created("/bad", NativeValue::string("k"), unconvertible),
            ),
            (
                "create",
                entry_created("/good", NativeValue::string("k"), NativeValue::Int32(3)),
            ),
        ],
    );
    run(&event_loop).await;

    assert_eq!(p_bad.names(), vec!["error"]);
    assert_eq!(p_good.names(), vec!["create"]);
}

#[tokio::test]
async fn test_panicking_listener_does_not_block_other_regions() {
    let (event_loop, router) = setup();
    let (emitter, p_bad) = panicking_emitter("create");
    let _bad = RegionWrapper::new(&router, RegionId::new("/bad"), emitter);
    let (_good, p_good) = region(&router, "/good");

    notify_from_sdk_thread(
        router.listener(),
        vec![
            (
                "create",
                entry_created("/bad", NativeValue::string("k"), NativeValue::Int32(1)),
            ),
            (
                "create",
                entry_created("/good", NativeValue::string("k"), NativeValue::Int32(2)),
            ),
            (
                "create",
                entry_created("/bad", NativeValue::string("k2"), NativeValue::Int32(3)),
            ),
        ],
    );
    run(&event_loop).await;

    assert_eq!(p_bad.names(), vec!["create", "create"]);
    assert_eq!(p_good.names(), vec!["create"]);
}

#[tokio::test]
async fn test_panicking_error_listener_does_not_abort_drain() {
    let (event_loop, router) = setup();
    let (emitter, p_bad) = panicking_emitter("error");
    let _bad = RegionWrapper::new(&router, RegionId::new("/bad"), emitter);
    let (_good, p_good) = region(&router, "/good");

    let unconvertible = NativeValue::Map(vec![(NativeValue::List(vec![]), NativeValue::Null)]);
    notify_from_sdk_thread(
        router.listener(),
        vec![
            (
                "create",
                entry_created("/bad", NativeValue::string("k"), unconvertible),
            ),
            (
                "create",
                entry_created("/good", NativeValue::string("k"), NativeValue::Int32(3)),
            ),
        ],
    );
    run(&event_loop).await;

    assert_eq!(p_bad.names(), vec!["error"]);
    assert_eq!(p_good.names(), vec!["create"]);

    // Later wakes still reach the router.
    notify_from_sdk_thread(
        router.listener(),
        vec![(
            "update",
            entry_updated(
                "/good",
                NativeValue::string("k"),
                NativeValue::Int32(3),
                NativeValue::Int32(4),
            ),
        )],
    );
    run(&event_loop).await;
    assert_eq!(p_good.names(), vec!["create", "update"]);
}

#[tokio::test]
async fn test_events_from_many_threads_keep_per_thread_order() {
    let (event_loop, router) = setup();
    let (_wrapper, probe) = region(&router, "/counters");

    let producers: Vec<_> = (0..4)
        .map(|t| {
            let listener = router.listener();
            thread::spawn(move || {
                for i in 0..50 {
                    listener.after_update(&entry_updated(
                        "/counters",
                        NativeValue::Int32(t),
                        NativeValue::Int32(i),
                        NativeValue::Int32(i + 1),
                    ));
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }
    run(&event_loop).await;

    let events = probe.events();
    assert_eq!(events.len(), 200);
    for t in 0..4 {
        let olds: Vec<HostValue> = events
            .iter()
            .filter_map(|e| e.payload.as_ref())
            .filter(|p| p.get("key") == &HostValue::Number(f64::from(t)))
            .map(|p| p.get("oldValue").clone())
            .collect();
        let expected: Vec<HostValue> = (0..50).map(|i| HostValue::Number(f64::from(i))).collect();
        assert_eq!(olds, expected);
    }
}

#[tokio::test]
async fn test_idle_router_does_not_keep_loop_alive() {
    let (event_loop, router) = setup();
    let (_wrapper, probe) = region(&router, "/quiet");
    assert!(!event_loop.is_alive());
    run(&event_loop).await;
    assert!(probe.events().is_empty());
}

#[tokio::test]
async fn test_shutdown_stops_delivery() {
    let (event_loop, router) = setup();
    let (_wrapper, probe) = region(&router, "/r1");

    router.shutdown();
    assert!(router.is_shut_down());
    notify_from_sdk_thread(
        router.listener(),
        vec![(
            "create",
            entry_created("/r1", NativeValue::string("k"), NativeValue::Null),
        )],
    );
    run(&event_loop).await;

    assert!(probe.events().is_empty());
    assert_eq!(event_loop.handle_count(), 0);
}

#[tokio::test]
async fn test_wrapper_reports_name_and_region() {
    let (_event_loop, router) = setup();
    let (wrapper, _probe) = region(&router, "parent/child");
    assert_eq!(wrapper.region().full_path(), "/parent/child");
    assert_eq!(wrapper.name(), "child");
}

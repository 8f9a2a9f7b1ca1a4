#![cfg(all(feature = "advanced-tests", loom))]
//! Concurrency tests for the stream registry using loom.
//!
//! The registry mutex is swapped for `loom::sync::Mutex` under `cfg(loom)`, so
//! these models explore every interleaving of concurrent allocation, removal
//! and termination.

use std::sync::Arc;

use loom::{model, thread};
use rsocket_core::{Error, FrameHandler, StreamRegistry};
use rsocket_testing::RecordingHandler;

fn handler() -> Arc<dyn FrameHandler> { Arc::new(RecordingHandler::default()) }

#[test]
fn concurrent_allocations_receive_distinct_ids() {
    model(|| {
        let registry = Arc::new(StreamRegistry::client());
        let r1 = Arc::clone(&registry);
        let r2 = Arc::clone(&registry);

        let t1 = thread::spawn(move || r1.add_and_get_next_stream_id(handler()));
        let t2 = thread::spawn(move || r2.add_and_get_next_stream_id(handler()));

        let a = t1
            .join()
            .expect("first allocation thread panicked")
            .expect("first allocation");
        let b = t2
            .join()
            .expect("second allocation thread panicked")
            .expect("second allocation");

        assert_ne!(a, b);
        let mut ids = vec![a.get(), b.get()];
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(registry.len(), 2);
    });
}

#[test]
fn allocation_racing_terminate_leaves_no_entry() {
    model(|| {
        let registry = Arc::new(StreamRegistry::server());
        let recording = Arc::new(RecordingHandler::default());
        let allocator = Arc::clone(&registry);
        let stream_handler: Arc<dyn FrameHandler> = recording.clone();

        let t1 = thread::spawn(move || allocator.add_and_get_next_stream_id(stream_handler));
        let t2 = {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                registry.terminate(&Error::ConnectionClosed {
                    reason: "transport closed".into(),
                })
            })
        };

        let allocated = t1.join().expect("allocation thread panicked");
        let notified = t2.join().expect("terminate thread panicked");

        assert!(registry.is_empty());
        match allocated {
            // Registered before terminate ran: it must have been notified.
            Ok(_) => {
                assert_eq!(notified, 1);
                assert_eq!(recording.errors().len(), 1);
            }
            Err(err) => {
                assert!(matches!(err, Error::ConnectionClosed { .. }));
                assert_eq!(notified, 0);
                assert!(recording.is_empty());
            }
        }
    });
}

#[test]
fn concurrent_remove_of_same_stream_succeeds_once() {
    model(|| {
        let registry = Arc::new(StreamRegistry::client());
        let owner = handler();
        let id = registry
            .add_and_get_next_stream_id(Arc::clone(&owner))
            .expect("allocation");

        let spawn_remove = |registry: &Arc<StreamRegistry>, owner: &Arc<dyn FrameHandler>| {
            let registry = Arc::clone(registry);
            let owner = Arc::clone(owner);
            thread::spawn(move || registry.remove(id, &owner))
        };
        let t1 = spawn_remove(&registry, &owner);
        let t2 = spawn_remove(&registry, &owner);

        let removed = [
            t1.join().expect("first remove thread panicked"),
            t2.join().expect("second remove thread panicked"),
        ];
        assert_eq!(removed.iter().filter(|r| **r).count(), 1);
        assert!(registry.is_empty());
    });
}

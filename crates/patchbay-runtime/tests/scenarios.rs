//! Cross-crate scenarios from spec §8: propagation through the runtime, the
//! kernel's fire-and-forget dispatch not blocking the caller, shutdown
//! draining pending work, and an external input round-tripping back into
//! the network.

use std::sync::Arc;
use std::time::Duration;

use patchbay_core::{BlendMode, ExternalInput, ExternalReply, Value, WireKind};
use patchbay_kernel::{Kernel, KernelConfig, UserspaceHandler};
use patchbay_runtime::Runtime;
use patchbay_test::{CapturingDriver, SlowStorageDriver};

async fn runtime_with_driver(driver: CapturingDriver) -> (Arc<Runtime>, Arc<Kernel>) {
    let kernel = Arc::new(Kernel::new(KernelConfig::default()));
    kernel.register_driver(Box::new(driver)).await.unwrap();
    let runtime = Arc::new(Runtime::new(Arc::clone(&kernel)));
    kernel.set_userspace_handler(runtime.clone()).await;
    (runtime, kernel)
}

#[tokio::test]
async fn s1_simple_propagation_reaches_every_driver() {
    let driver = CapturingDriver::new("cap");
    let (runtime, kernel) = runtime_with_driver(driver.clone()).await;
    let root = runtime.root_group_id().await;

    let a = runtime.add_contact(root, BlendMode::AcceptLast, None).await.unwrap();
    let b = runtime.add_contact(root, BlendMode::AcceptLast, None).await.unwrap();
    runtime.connect(root, a, b, WireKind::Bidirectional).await.unwrap();

    runtime.schedule_update(a, Value::Number(42.0)).await.unwrap();
    kernel.wait_for_completion().await;

    assert_eq!(runtime.contact_content(a).await, Some(Value::Number(42.0)));
    assert_eq!(runtime.contact_content(b).await, Some(Value::Number(42.0)));

    let captured = driver.captured();
    assert_eq!(captured.len(), 2);
    assert!(captured.iter().any(|c| c.contact_id == a));
    assert!(captured.iter().any(|c| c.contact_id == b));
}

#[tokio::test(start_paused = true)]
async fn s2_slow_storage_does_not_block_schedule_update() {
    let slow = SlowStorageDriver::new("slow", Duration::from_millis(100));
    let kernel = Arc::new(Kernel::new(KernelConfig::default()));
    kernel.register_driver(Box::new(slow.clone())).await.unwrap();
    let runtime = Arc::new(Runtime::new(Arc::clone(&kernel)));
    kernel.set_userspace_handler(runtime.clone()).await;

    let root = runtime.root_group_id().await;
    let a = runtime.add_contact(root, BlendMode::AcceptLast, None).await.unwrap();

    let started = tokio::time::Instant::now();
    runtime.schedule_update(a, Value::Number(999.0)).await.unwrap();
    assert!(started.elapsed() < Duration::from_millis(10));
    assert!(kernel.has_pending_work().await);

    tokio::time::advance(Duration::from_millis(150)).await;
    kernel.wait_for_completion().await;

    assert!(!kernel.has_pending_work().await);
    assert_eq!(slow.get(a), Some(Value::Number(999.0)));
}

#[tokio::test]
async fn s3_shutdown_drains_every_pending_change() {
    let driver = CapturingDriver::new("cap");
    let (runtime, kernel) = runtime_with_driver(driver.clone()).await;
    let root = runtime.root_group_id().await;
    let a = runtime.add_contact(root, BlendMode::AcceptLast, None).await.unwrap();

    for i in 0..10 {
        runtime.schedule_update(a, Value::Number(f64::from(i))).await.unwrap();
    }

    kernel.shutdown().await;

    assert!(!kernel.has_pending_work().await);
    assert_eq!(driver.len(), 10);
}

#[tokio::test]
async fn s6_external_input_round_trips_into_the_network() {
    let driver = CapturingDriver::new("cap");
    let (runtime, kernel) = runtime_with_driver(driver.clone()).await;
    let root = runtime.root_group_id().await;
    let a = runtime.add_contact(root, BlendMode::AcceptLast, None).await.unwrap();

    let reply = kernel
        .handle_external_input(ExternalInput::ScheduleUpdate {
            contact_id: a,
            value: Value::Number(7.0),
        })
        .await
        .unwrap();

    assert_eq!(reply, ExternalReply::Updated { changed: vec![a] });
    assert_eq!(runtime.contact_content(a).await, Some(Value::Number(7.0)));

    kernel.wait_for_completion().await;
    assert_eq!(driver.captured().last().unwrap().contact_id, a);
}

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use flightline_rs::gfx;
use flightline_rs::gfx::soft;

use gfx::CmdBuf;
use gfx::CmdQueue;
use gfx::Device;

fn create_device() -> soft::Device {
    soft::Device::create(&gfx::DeviceInfo::default())
}

#[test]
fn signal_targets_strictly_increase() {
    let device = create_device();
    let mut queue = device.create_cmd_queue().unwrap();

    let mut last = 0;
    for _ in 0..100 {
        let target = queue.signal();
        assert!(target > last);
        last = target;
    }
    assert_eq!(queue.get_last_signalled(), last);
}

#[test]
fn is_complete_tracks_the_gpu_timeline() {
    let device = create_device();
    let mut queue = device.create_cmd_queue().unwrap();
    let timeline = queue.get_timeline();

    // nothing signalled yet, target 0 is trivially complete
    assert!(queue.is_complete(0));

    timeline.hold();
    let cmd = queue.acquire(&device);
    let target = queue.submit(cmd);
    assert!(!queue.is_complete(target));
    assert_eq!(queue.get_in_flight_count(), 1);

    timeline.retire_one();
    assert!(queue.is_complete(target));
    assert_eq!(queue.get_in_flight_count(), 0);
}

#[test]
fn wait_blocks_until_the_target_completes() {
    let device = create_device();
    let mut queue = device.create_cmd_queue().unwrap();
    let timeline = queue.get_timeline();

    timeline.hold();
    let cmd = queue.acquire(&device);
    let target = queue.submit(cmd);

    let (send, recv) = mpsc::channel();
    let waiter = thread::spawn(move || {
        queue.wait(target);
        send.send(queue.is_complete(target)).unwrap();
    });

    // the wait must not return while the work is still pending
    assert!(recv.recv_timeout(Duration::from_millis(100)).is_err());

    timeline.retire_one();
    assert!(recv.recv_timeout(Duration::from_secs(5)).unwrap());
    waiter.join().unwrap();
}

#[test]
fn wait_returns_immediately_for_completed_targets() {
    let device = create_device();
    let mut queue = device.create_cmd_queue().unwrap();

    let cmd = queue.acquire(&device);
    let target = queue.submit(cmd);

    // the timeline is not held so the work already retired
    queue.wait(target);
    queue.wait(0);
    assert!(queue.is_complete(target));
}

#[test]
fn allocators_are_reused_only_after_their_fence_completes() {
    let device = create_device();
    let mut queue = device.create_cmd_queue().unwrap();
    let timeline = queue.get_timeline();

    timeline.hold();

    let first = queue.acquire(&device);
    let first_id = first.get_allocator_id();
    let first_target = queue.submit(first);

    // the first allocator is still in flight, a fresh one must be handed out
    let second = queue.acquire(&device);
    assert_ne!(second.get_allocator_id(), first_id);
    queue.submit(second);

    assert_eq!(timeline.retire_one(), Some(first_target));

    // the oldest allocator retired with its fence target, reclaim it
    let third = queue.acquire(&device);
    assert_eq!(third.get_allocator_id(), first_id);
    assert_eq!(third.get_allocator_reset_count(), 1);
    queue.submit(third);

    timeline.release();
}

#[test]
fn flush_leaves_the_last_signalled_target_complete() {
    let device = create_device();
    let mut queue = device.create_cmd_queue().unwrap();
    let timeline = queue.get_timeline();

    timeline.hold();
    for _ in 0..3 {
        let cmd = queue.acquire(&device);
        queue.submit(cmd);
    }
    assert_eq!(queue.get_in_flight_count(), 3);

    // flush blocks until the timeline drains, release it from another thread
    let release_timeline = timeline.clone();
    let releaser = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        release_timeline.release();
    });

    queue.flush();
    assert!(queue.is_complete(queue.get_last_signalled()));
    assert_eq!(queue.get_in_flight_count(), 0);
    releaser.join().unwrap();
}

#[test]
fn submissions_retire_in_fifo_order() {
    let device = create_device();
    let mut queue = device.create_cmd_queue().unwrap();
    let timeline = queue.get_timeline();

    timeline.hold();
    let mut targets = Vec::new();
    for _ in 0..4 {
        let cmd = queue.acquire(&device);
        targets.push(queue.submit(cmd));
    }

    // the completed value advances through the targets in submission order
    for target in &targets {
        assert_eq!(timeline.retire_one(), Some(*target));
        assert!(queue.is_complete(*target));
    }
    assert_eq!(timeline.retire_one(), None);
}

#[test]
fn command_buffers_record_into_the_free_pool() {
    let device = create_device();
    let mut queue = device.create_cmd_queue().unwrap();

    let mut cmd = queue.acquire(&device);
    cmd.set_topology(gfx::Topology::TriangleList);
    cmd.draw_instanced(3, 2, 0, 0);
    assert_eq!(cmd.get_draw_count(), 1);
    assert_eq!(cmd.get_drawn_vertex_count(), 6);
    assert_eq!(cmd.get_bound_topology(), Some(gfx::Topology::TriangleList));
    queue.submit(cmd);

    // with the work retired the same allocator cycles straight back around
    let again = queue.acquire(&device);
    assert_eq!(again.get_allocator_id(), 0);
    assert_eq!(again.get_command_count(), 0);
    queue.submit(again);
}

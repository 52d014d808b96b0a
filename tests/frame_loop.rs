use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use flightline_rs::client;
use flightline_rs::gfx;
use flightline_rs::gfx::soft;
use flightline_rs::os;
use flightline_rs::os::headless;

use gfx::CmdBuf;
use gfx::CmdQueue;
use gfx::Device;
use gfx::SwapChain;

use os::App;
use os::Window;

fn create_swap_chain(
    num_buffers: u32,
) -> (
    soft::Device,
    soft::CmdQueue,
    soft::SwapChain,
    headless::Window,
    headless::App,
) {
    let mut app = headless::App::create(os::AppInfo {
        name: String::from("frame_loop"),
        dpi_aware: false,
    });
    let window = app.create_window(os::WindowInfo::default());
    let mut device = soft::Device::create(&gfx::DeviceInfo::default());
    let queue = device.create_cmd_queue().unwrap();
    let swap_chain = device
        .create_swap_chain::<headless::App>(
            &gfx::SwapChainInfo {
                num_buffers,
                ..Default::default()
            },
            &queue,
            &window,
        )
        .unwrap();
    (device, queue, swap_chain, window, app)
}

#[test]
fn in_flight_frames_are_bounded_by_the_slot_count() {
    let (device, mut queue, mut swap_chain, _window, _app) = create_swap_chain(3);
    let timeline = queue.get_timeline();
    timeline.hold();

    let (progress, recorded) = mpsc::channel();
    let renderer = thread::spawn(move || {
        for frame in 0..5u32 {
            swap_chain.new_frame(&queue);
            let mut cmd = queue.acquire(&device);
            cmd.begin_render(&swap_chain);
            cmd.end_render(&swap_chain);
            queue.submit(cmd);
            swap_chain.swap(&mut queue);
            progress.send(frame).unwrap();
        }
    });

    // 3 slots let 3 frames record back to back without any GPU progress
    for expected in 0..3 {
        assert_eq!(
            recorded.recv_timeout(Duration::from_secs(5)).unwrap(),
            expected
        );
    }

    // the 4th frame reuses the first slot, it must block until the first
    // frame's presented work retires
    assert!(recorded.recv_timeout(Duration::from_millis(100)).is_err());

    // the first frame signalled twice, submission then present, retiring the
    // submission alone is not enough to free its slot
    timeline.retire_one();
    assert!(recorded.recv_timeout(Duration::from_millis(100)).is_err());

    timeline.retire_one();
    assert_eq!(recorded.recv_timeout(Duration::from_secs(5)).unwrap(), 3);

    // the 5th frame waits on the second slot the same way
    assert!(recorded.recv_timeout(Duration::from_millis(100)).is_err());
    timeline.retire_one();
    timeline.retire_one();
    assert_eq!(recorded.recv_timeout(Duration::from_secs(5)).unwrap(), 4);

    timeline.release();
    renderer.join().unwrap();
}

#[test]
fn slots_rotate_and_tag_their_fence_values() {
    let (device, mut queue, mut swap_chain, _window, _app) = create_swap_chain(2);

    assert_eq!(swap_chain.get_num_buffers(), 2);
    assert_eq!(swap_chain.get_backbuffer_index(), 0);

    let cmd = queue.acquire(&device);
    queue.submit(cmd);
    swap_chain.swap(&mut queue);

    // the present target tagged the slot and the chain moved to the next one
    assert_eq!(swap_chain.get_frame_fence_value(), queue.get_last_signalled());
    assert_eq!(swap_chain.get_backbuffer_index(), 1);

    swap_chain.swap(&mut queue);
    assert_eq!(swap_chain.get_backbuffer_index(), 0);

    swap_chain.wait_for_last_frame(&queue);
    assert_eq!(queue.get_in_flight_count(), 0);
}

#[test]
fn resize_flushes_outstanding_work_first() {
    let (mut device, mut queue, mut swap_chain, mut window, _app) = create_swap_chain(2);
    let timeline = queue.get_timeline();
    timeline.hold();

    for _ in 0..2 {
        swap_chain.new_frame(&queue);
        let cmd = queue.acquire(&device);
        queue.submit(cmd);
        swap_chain.swap(&mut queue);
    }
    assert!(queue.get_in_flight_count() > 0);

    window.set_size(640, 360);

    let (done, resized) = mpsc::channel();
    let resizer = thread::spawn(move || {
        swap_chain.update::<headless::App>(&mut device, &mut queue, &window);
        done.send(()).unwrap();
        (queue, swap_chain)
    });

    // the backbuffers may still be referenced by in-flight work, the resize
    // path must not proceed until the queue drains
    assert!(resized.recv_timeout(Duration::from_millis(100)).is_err());

    timeline.release();
    resized.recv_timeout(Duration::from_secs(5)).unwrap();

    let (queue, swap_chain) = resizer.join().unwrap();
    assert_eq!(swap_chain.get_backbuffer_size(), (640, 360));
    assert_eq!(swap_chain.get_backbuffer_index(), 0);
    assert_eq!(queue.get_in_flight_count(), 0);
}

#[test]
fn update_without_a_size_change_starts_a_new_frame() {
    let (mut device, mut queue, mut swap_chain, window, _app) = create_swap_chain(2);

    for _ in 0..3 {
        swap_chain.update::<headless::App>(&mut device, &mut queue, &window);
        let cmd = queue.acquire(&device);
        queue.submit(cmd);
        swap_chain.swap(&mut queue);
    }

    // no resize happened, the original size is intact
    let (width, height) = window.get_size();
    assert_eq!(swap_chain.get_backbuffer_size(), (width, height));
}

#[test]
fn client_frames_record_submit_and_present() {
    let mut client = client::Client::<soft::Device, headless::App>::create(client::ClientInfo {
        name: String::from("frame_loop_client"),
        num_buffers: 2,
        user_config: Some(client::UserConfig {
            main_window_rect: os::Rect {
                x: 10,
                y: 10,
                width: 320,
                height: 240,
            },
        }),
        ..Default::default()
    })
    .unwrap();

    for _ in 0..4 {
        let mut cmd = client.new_frame();
        cmd.begin_render(&client.swap_chain);
        cmd.end_render(&client.swap_chain);
        client.present(cmd);
    }

    assert_eq!(
        client.swap_chain.get_frame_fence_value(),
        client.queue.get_last_signalled()
    );
    client.wait_for_last_frame();
    assert_eq!(client.queue.get_in_flight_count(), 0);
}

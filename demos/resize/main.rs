use flightline_rs::gfx;
use flightline_rs::os;

use gfx::CmdBuf;
use gfx::CmdQueue;
use gfx::Device;
use gfx::SwapChain;

use os::App;
use os::Window;

#[cfg(target_os = "windows")]
use os::win32 as os_platform;

#[cfg(target_os = "windows")]
use gfx::d3d12 as gfx_platform;

#[cfg(not(target_os = "windows"))]
use os::headless as os_platform;

#[cfg(not(target_os = "windows"))]
use gfx::soft as gfx_platform;

/// Exercises the resize path: the swap chain flushes the queue before its
/// buffers are reallocated, then frames continue against the new size. On
/// windows drag the window edges, elsewhere the demo drives the sizes itself.
fn main() -> Result<(), flightline_rs::Error> {
    env_logger::init();

    let mut app = os_platform::App::create(os::AppInfo {
        name: String::from("resize"),
        dpi_aware: true,
    });

    let mut window = app.create_window(os::WindowInfo {
        title: String::from("resize!"),
        ..Default::default()
    });

    let mut device = gfx_platform::Device::create(&gfx::DeviceInfo::default());
    let mut queue = device.create_cmd_queue()?;
    let mut swap_chain = device.create_swap_chain::<os_platform::App>(
        &gfx::SwapChainInfo {
            num_buffers: 3,
            ..Default::default()
        },
        &queue,
        &window,
    )?;

    let sizes = [(1280, 720), (960, 540), (640, 360), (1920, 1080)];
    let drive_sizes = !cfg!(target_os = "windows");
    let max_frames: u64 = if drive_sizes { 480 } else { u64::MAX };

    let mut frame: u64 = 0;
    while app.run() && frame < max_frames {
        if drive_sizes && frame % 120 == 0 {
            let (width, height) = sizes[(frame / 120) as usize % sizes.len()];
            window.set_size(width, height);
        }

        window.update(&mut app);
        swap_chain.update::<os_platform::App>(&mut device, &mut queue, &window);

        let mut cmd = queue.acquire(&device);
        cmd.begin_render(&swap_chain);
        cmd.end_render(&swap_chain);
        queue.submit(cmd);
        swap_chain.swap(&mut queue);

        frame += 1;
    }

    swap_chain.wait_for_last_frame(&queue);
    Ok(())
}

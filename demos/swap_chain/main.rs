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

fn main() -> Result<(), flightline_rs::Error> {
    env_logger::init();

    // create an app
    let mut app = os_platform::App::create(os::AppInfo {
        name: String::from("swap_chain"),
        dpi_aware: true,
    });

    // create a window
    let mut window = app.create_window(os::WindowInfo {
        title: String::from("swap_chain!"),
        ..Default::default()
    });

    // create a device, queue and swap chain
    let num_buffers = 2;
    let mut device = gfx_platform::Device::create(&gfx::DeviceInfo::default());
    let mut queue = device.create_cmd_queue()?;

    let colours = [
        gfx::ClearColour {
            r: 1.00,
            g: 0.00,
            b: 0.00,
            a: 1.00,
        },
        gfx::ClearColour {
            r: 0.00,
            g: 1.00,
            b: 0.00,
            a: 1.00,
        },
        gfx::ClearColour {
            r: 0.00,
            g: 0.00,
            b: 1.00,
            a: 1.00,
        },
        gfx::ClearColour {
            r: 0.00,
            g: 1.00,
            b: 1.00,
            a: 1.00,
        },
        gfx::ClearColour {
            r: 1.00,
            g: 0.00,
            b: 1.00,
            a: 1.00,
        },
        gfx::ClearColour {
            r: 1.00,
            g: 1.00,
            b: 0.00,
            a: 1.00,
        },
    ];

    let mut swap_chain = device.create_swap_chain::<os_platform::App>(
        &gfx::SwapChainInfo {
            num_buffers,
            clear_colour: Some(colours[0]),
            ..Default::default()
        },
        &queue,
        &window,
    )?;

    // headless platforms have no display to watch, bound the loop
    let max_frames = if cfg!(target_os = "windows") {
        u64::MAX
    } else {
        360
    };

    let mut frame: u64 = 0;
    while app.run() && frame < max_frames {
        // update window and swap chain for the new frame
        window.update(&mut app);
        swap_chain.update::<os_platform::App>(&mut device, &mut queue, &window);

        // change the clear colour every second or so
        let col_index = (frame / 60) as usize % colours.len();
        swap_chain.set_clear_colour(Some(colours[col_index]));

        // clear the backbuffer and present
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

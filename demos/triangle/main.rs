use flightline_rs::client::Client;
use flightline_rs::client::ClientInfo;
use flightline_rs::gfx;
use flightline_rs::os::App;

use gfx::CmdBuf;
use gfx::Device;
use gfx::SwapChain;

#[cfg(target_os = "windows")]
use flightline_rs::os::win32 as os_platform;

#[cfg(target_os = "windows")]
use gfx::d3d12 as gfx_platform;

#[cfg(not(target_os = "windows"))]
use flightline_rs::os::headless as os_platform;

#[cfg(not(target_os = "windows"))]
use gfx::soft as gfx_platform;

#[repr(C)]
struct Vertex {
    position: [f32; 3],
    colour: [f32; 4],
}

fn main() -> Result<(), flightline_rs::Error> {
    env_logger::init();

    let mut client = Client::<gfx_platform::Device, os_platform::App>::create(ClientInfo {
        name: String::from("triangle"),
        num_buffers: 3,
        ..Default::default()
    })?;

    let vertices = [
        Vertex {
            position: [0.0, 0.5, 0.0],
            colour: [1.0, 0.0, 0.0, 1.0],
        },
        Vertex {
            position: [0.5, -0.5, 0.0],
            colour: [0.0, 1.0, 0.0, 1.0],
        },
        Vertex {
            position: [-0.5, -0.5, 0.0],
            colour: [0.0, 0.0, 1.0, 1.0],
        },
    ];

    let vb = client.device.create_buffer(
        &gfx::BufferInfo {
            usage: gfx::BufferUsage::Vertex,
            stride: std::mem::size_of::<Vertex>(),
        },
        &vertices,
    )?;

    // headless platforms have no display to watch, bound the loop
    let max_frames: u64 = if cfg!(target_os = "windows") {
        u64::MAX
    } else {
        360
    };

    let mut frame: u64 = 0;
    client.run(move |client, mut cmd| {
        let (width, height) = client.swap_chain.get_backbuffer_size();

        cmd.begin_render(&client.swap_chain);
        cmd.set_viewport(&gfx::Viewport {
            x: 0.0,
            y: 0.0,
            width: width as f32,
            height: height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        });
        cmd.set_scissor_rect(&gfx::ScissorRect {
            left: 0,
            top: 0,
            right: width,
            bottom: height,
        });
        cmd.set_topology(gfx::Topology::TriangleList);
        cmd.set_vertex_buffer(&vb, 0);
        cmd.draw_instanced(3, 1, 0, 0);
        cmd.end_render(&client.swap_chain);

        frame += 1;
        if frame >= max_frames {
            client.app.exit(0);
        }
        cmd
    });

    Ok(())
}

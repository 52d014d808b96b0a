use crate::gfx;
use crate::os;

use gfx::CmdQueue;
use gfx::Device;
use gfx::SwapChain;

use os::App;
use os::Window;

use serde::{Deserialize, Serialize};

/// Information to create a client context which will create an app, window,
/// device, queue and swap chain.
pub struct ClientInfo {
    /// Name for the app and window title
    pub name: String,
    /// Window rect {pos_x, pos_y, width, height}
    pub window_rect: os::Rect<i32>,
    /// Signify if the app is DPI aware or not
    pub dpi_aware: bool,
    /// Clear colour of the default swap chain
    pub clear_colour: Option<gfx::ClearColour>,
    /// Optional name of gpu adapter, use None for the default / primary device
    pub adapter_name: Option<String>,
    /// Number of buffers in the swap chain (2 for double buffered, 3 for triple etc)
    pub num_buffers: u32,
    /// Present with vertical sync
    pub vsync: bool,
    /// Optional user config, the default is located next to the executable,
    /// this allows the launch configuration to be overridden
    pub user_config: Option<UserConfig>,
}

/// Useful defaults for quick ClientInfo initialisation
impl Default for ClientInfo {
    fn default() -> Self {
        ClientInfo {
            name: "flightline".to_string(),
            window_rect: os::Rect {
                x: 100,
                y: 100,
                width: 1280,
                height: 720,
            },
            dpi_aware: true,
            clear_colour: Some(gfx::ClearColour {
                r: 0.45,
                g: 0.55,
                b: 0.60,
                a: 1.00,
            }),
            adapter_name: None,
            num_buffers: 2,
            vsync: true,
            user_config: None,
        }
    }
}

/// Serialisable user configuration settings and saved state
#[derive(Serialize, Deserialize, Clone)]
pub struct UserConfig {
    // pos xy, size xy
    pub main_window_rect: os::Rect<i32>,
}

/// Client data members
pub struct Client<D: gfx::Device, A: os::App> {
    pub app: A,
    pub device: D,
    pub main_window: A::Window,
    pub queue: D::CmdQueue,
    pub swap_chain: D::SwapChain,
    pub user_config: UserConfig,
}

/// `Client` implementation
impl<D, A> Client<D, A>
where
    D: gfx::Device,
    A: os::App,
{
    /// Create a client context consisting of core resources
    pub fn create(info: ClientInfo) -> Result<Self, super::Error> {
        // read user config or get defaults
        let user_config_path = super::get_data_path("user_config.json");
        let saved_user_config = if std::path::Path::new(&user_config_path).exists() {
            let user_data = std::fs::read(user_config_path)?;
            serde_json::from_slice(&user_data)?
        } else {
            UserConfig {
                main_window_rect: info.window_rect,
            }
        };

        // override by the supplied user config
        let user_config = info.user_config.unwrap_or(saved_user_config);

        // app
        let mut app = A::create(os::AppInfo {
            name: info.name.to_string(),
            dpi_aware: info.dpi_aware,
        });

        // device
        let mut device = D::create(&gfx::DeviceInfo {
            adapter_name: info.adapter_name,
        });

        // main window
        let main_window = app.create_window(os::WindowInfo {
            title: info.name.to_string(),
            rect: user_config.main_window_rect,
            style: os::WindowStyleFlags::NONE,
        });

        // queue + swap chain
        let queue = device.create_cmd_queue()?;
        let swap_chain_info = gfx::SwapChainInfo {
            num_buffers: info.num_buffers,
            format: gfx::Format::RGBA8n,
            vsync: info.vsync,
            clear_colour: info.clear_colour,
        };
        let swap_chain = device.create_swap_chain::<A>(&swap_chain_info, &queue, &main_window)?;

        Ok(Client {
            app,
            device,
            main_window,
            queue,
            swap_chain,
            user_config,
        })
    }

    /// Start a new frame synchronised to the swap chain, returns a
    /// ready-to-record command buffer for the frame. Blocks when the GPU is
    /// more than `num_buffers` frames behind.
    pub fn new_frame(&mut self) -> D::CmdBuf {
        self.main_window.update(&mut self.app);
        self.swap_chain
            .update::<A>(&mut self.device, &mut self.queue, &self.main_window);
        self.queue.acquire(&self.device)
    }

    /// Submit the frame's command buffer and present the current backbuffer
    pub fn present(&mut self, cmd: D::CmdBuf) {
        self.queue.submit(cmd);
        self.swap_chain.swap(&mut self.queue);
        self.update_user_config_window();
    }

    /// internal function tracking window placement changes into the user config
    fn update_user_config_window(&mut self) {
        let current = self.main_window.get_window_rect();
        if current.x > 0
            && current.y > 0
            && current.width > 0
            && current.height > 0
            && self.user_config.main_window_rect != current
        {
            self.user_config.main_window_rect = current;
        }
    }

    /// Write the user config to disk, called automatically at the end of `run`
    pub fn save_user_config(&self) -> Result<(), super::Error> {
        let user_config_file_text = serde_json::to_string_pretty(&self.user_config)?;
        let user_config_path = super::get_data_path("user_config.json");
        std::fs::write(user_config_path, user_config_file_text)?;
        Ok(())
    }

    /// Wait for the last submitted frame to complete to ensure safe shutdown
    /// once all in-flight resources are no longer needed
    pub fn wait_for_last_frame(&mut self) {
        self.swap_chain.wait_for_last_frame(&self.queue);
    }

    /// Very simple run loop which can take control of your application, you
    /// could roll your own; `frame_fn` records the frame into the supplied
    /// command buffer and hands it back for submission
    pub fn run<F>(mut self, mut frame_fn: F)
    where
        F: FnMut(&mut Self, D::CmdBuf) -> D::CmdBuf,
    {
        while self.app.run() {
            let cmd = self.new_frame();
            let cmd = frame_fn(&mut self, cmd);
            self.present(cmd);
        }

        // save out values for next time
        if let Err(error) = self.save_user_config() {
            log::warn!("flightline::client: failed to save user config: {:?}", error);
        }

        self.wait_for_last_frame();
    }
}

impl<D, A> Drop for Client<D, A>
where
    D: gfx::Device,
    A: os::App,
{
    fn drop(&mut self) {
        // the GPU may still reference frame resources, drain before they drop
        self.queue.flush();
    }
}

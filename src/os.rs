/// Implements this interface for the windows win32 platform
#[cfg(target_os = "windows")]
pub mod win32;

/// Windowless implementation used by tests and headless runs
pub mod headless;

use std::any::Any;

use serde::{Deserialize, Serialize};

bitflags! {
    /// Style flags applied when a window is created
    pub struct WindowStyleFlags: u32 {
        /// No flags, the platform default decorated window
        const NONE = 0;
        /// Window is shown immediately after creation
        const VISIBLE = 1<<0;
        /// Borderless popup window
        const POPUP = 1<<1;
    }
}

/// Describes a rectangle starting at the top left corner specified by x,y
/// with the size of width and height.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Rect<T> {
    pub x: T,
    pub y: T,
    pub width: T,
    pub height: T,
}

/// Information to create an application instance
pub struct AppInfo {
    /// Name of the application
    pub name: String,
    /// Signify if the app is DPI aware or not
    pub dpi_aware: bool,
}

/// Filled out to specify various window parameters
/// when a window is created by `App::create_window`
pub struct WindowInfo {
    pub title: String,
    pub rect: Rect<i32>,
    pub style: WindowStyleFlags,
}

impl Default for WindowInfo {
    fn default() -> Self {
        WindowInfo {
            title: "flightline".to_string(),
            rect: Rect {
                x: 100,
                y: 100,
                width: 1280,
                height: 720,
            },
            style: WindowStyleFlags::NONE,
        }
    }
}

/// An opaque, platform specific window handle which graphics backends
/// consume when creating a presentation surface.
pub trait NativeHandle<A: App> {
    fn get_isize(&self) -> isize;
    fn copy(&self) -> Self;
}

/// An interface which all platforms need to implement
/// for general operating system calls
pub trait App: 'static + Any + Sized {
    type Window: Window<Self>;
    type NativeHandle: NativeHandle<Self>;

    /// Create an application instance, a process should create only one
    fn create(info: AppInfo) -> Self;

    /// Create a new operating system window
    fn create_window(&mut self, info: WindowInfo) -> Self::Window;

    /// Pump the platform message loop, returns false when the app should quit
    fn run(&mut self) -> bool;

    /// Request the app to quit with `exit_code`
    fn exit(&mut self, exit_code: i32);
}

/// An instance of an operating system window
pub trait Window<A: App>: Any + Sized {
    /// Move / resize the window to `rect` (position and outer size)
    fn set_rect(&mut self, rect: Rect<i32>);

    /// Returns the window rect (position and outer size)
    fn get_rect(&self) -> Rect<i32>;

    /// Resize the client area to width x height
    fn set_size(&mut self, width: i32, height: i32);

    /// Returns the client area size, this is the drawable surface size
    fn get_size(&self) -> (i32, i32);

    /// Returns the outer window rect, used to persist window placement
    fn get_window_rect(&self) -> Rect<i32>;

    /// Returns the platform handle to pass to `gfx::Device::create_swap_chain`
    fn get_native_handle(&self) -> A::NativeHandle;

    /// Poll the window state (position, size, close requests)
    fn update(&mut self, app: &mut A);

    /// Destroy the window
    fn close(&mut self);
}

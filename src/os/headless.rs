use super::AppInfo;
use super::Rect;
use super::WindowInfo;

/// Windowless app used by tests, CI and platforms with no native backend.
/// Windows are plain rectangles in memory and `run` never requests a quit,
/// callers bound their own frame loops.
pub struct App {
    name: String,
    exit_requested: bool,
}

pub struct Window {
    info: WindowInfo,
}

#[derive(Clone)]
pub struct NativeHandle;

impl super::NativeHandle<App> for NativeHandle {
    fn get_isize(&self) -> isize {
        0
    }
    fn copy(&self) -> Self {
        NativeHandle
    }
}

impl super::App for App {
    type Window = Window;
    type NativeHandle = NativeHandle;

    fn create(info: AppInfo) -> Self {
        App {
            name: info.name,
            exit_requested: false,
        }
    }

    fn create_window(&mut self, info: WindowInfo) -> Window {
        Window { info }
    }

    fn run(&mut self) -> bool {
        !self.exit_requested
    }

    fn exit(&mut self, _exit_code: i32) {
        self.exit_requested = true;
    }
}

impl App {
    pub fn get_name(&self) -> &str {
        &self.name
    }
}

impl super::Window<App> for Window {
    fn set_rect(&mut self, rect: Rect<i32>) {
        self.info.rect = rect;
    }

    fn get_rect(&self) -> Rect<i32> {
        self.info.rect
    }

    fn set_size(&mut self, width: i32, height: i32) {
        self.info.rect.width = width;
        self.info.rect.height = height;
    }

    fn get_size(&self) -> (i32, i32) {
        (self.info.rect.width, self.info.rect.height)
    }

    fn get_window_rect(&self) -> Rect<i32> {
        self.info.rect
    }

    fn get_native_handle(&self) -> NativeHandle {
        NativeHandle
    }

    fn update(&mut self, _app: &mut App) {}

    fn close(&mut self) {}
}

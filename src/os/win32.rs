use windows::{
    core::*, Win32::Foundation::*, Win32::Graphics::Gdi::ValidateRect,
    Win32::System::LibraryLoader::*, Win32::UI::WindowsAndMessaging::*,
};

use super::AppInfo;
use super::Rect;
use super::WindowInfo;
use super::WindowStyleFlags;

pub struct App {
    window_class: String,
    hinstance: HMODULE,
}

pub struct Window {
    rect: Rect<i32>,
    client_size: (i32, i32),
    hwnd: HWND,
}

#[derive(Clone)]
pub struct NativeHandle {
    pub hwnd: HWND,
}

impl super::NativeHandle<App> for NativeHandle {
    fn get_isize(&self) -> isize {
        self.hwnd.0 as isize
    }
    fn copy(&self) -> Self {
        NativeHandle { hwnd: self.hwnd }
    }
}

fn to_win32_dw_style(style: WindowStyleFlags) -> WINDOW_STYLE {
    if style.contains(WindowStyleFlags::POPUP) {
        WS_POPUP | WS_VISIBLE
    } else {
        WS_OVERLAPPEDWINDOW | WS_VISIBLE
    }
}

impl super::App for App {
    type Window = Window;
    type NativeHandle = NativeHandle;

    fn create(info: AppInfo) -> Self {
        unsafe {
            // class name must be null terminated for the win32 api
            let window_class = info.name + "\0";
            let instance = GetModuleHandleA(None).expect("flightline::os::win32: failed to get module handle");

            if info.dpi_aware {
                let _ = SetProcessDPIAware();
            }

            let wc = WNDCLASSA {
                hCursor: LoadCursorW(None, IDC_ARROW).unwrap(),
                hInstance: instance.into(),
                lpszClassName: PCSTR(window_class.as_ptr() as _),
                style: CS_HREDRAW | CS_VREDRAW,
                lpfnWndProc: Some(wndproc),
                ..Default::default()
            };

            if RegisterClassA(&wc) == 0 {
                panic!("flightline::os::win32: window class already registered!");
            }

            App {
                window_class,
                hinstance: instance,
            }
        }
    }

    fn create_window(&mut self, info: WindowInfo) -> Window {
        unsafe {
            let title = info.title + "\0";
            let hwnd = CreateWindowExA(
                WINDOW_EX_STYLE::default(),
                PCSTR(self.window_class.as_ptr() as _),
                PCSTR(title.as_ptr() as _),
                to_win32_dw_style(info.style),
                info.rect.x,
                info.rect.y,
                info.rect.width,
                info.rect.height,
                None,
                None,
                Some(self.hinstance.into()),
                None,
            )
            .expect("flightline::os::win32: failed to create window");

            let mut window = Window {
                rect: info.rect,
                client_size: (info.rect.width, info.rect.height),
                hwnd,
            };
            window.refresh_rects();
            window
        }
    }

    fn run(&mut self) -> bool {
        unsafe {
            let mut msg = MSG::default();
            let mut quit = false;
            loop {
                if PeekMessageA(&mut msg, None, 0, 0, PM_REMOVE).into() {
                    let _ = TranslateMessage(&msg);
                    DispatchMessageA(&msg);
                    if msg.message == WM_QUIT {
                        quit = true;
                        break;
                    }
                } else {
                    break;
                }
            }
            !quit
        }
    }

    fn exit(&mut self, exit_code: i32) {
        unsafe {
            PostQuitMessage(exit_code);
        }
    }
}

impl Drop for App {
    fn drop(&mut self) {
        unsafe {
            let _ = UnregisterClassA(
                PCSTR(self.window_class.as_ptr() as _),
                Some(self.hinstance.into()),
            );
        }
    }
}

impl Window {
    fn refresh_rects(&mut self) {
        unsafe {
            let mut win_rect = RECT::default();
            if GetWindowRect(self.hwnd, &mut win_rect).is_ok() {
                self.rect = Rect {
                    x: win_rect.left,
                    y: win_rect.top,
                    width: win_rect.right - win_rect.left,
                    height: win_rect.bottom - win_rect.top,
                };
            }
            let mut client_rect = RECT::default();
            if GetClientRect(self.hwnd, &mut client_rect).is_ok() {
                self.client_size = (
                    client_rect.right - client_rect.left,
                    client_rect.bottom - client_rect.top,
                );
            }
        }
    }
}

impl super::Window<App> for Window {
    fn set_rect(&mut self, rect: Rect<i32>) {
        unsafe {
            let _ = SetWindowPos(
                self.hwnd,
                None,
                rect.x,
                rect.y,
                rect.width,
                rect.height,
                SWP_ASYNCWINDOWPOS,
            );
        }
        self.rect = rect;
    }

    fn get_rect(&self) -> Rect<i32> {
        self.rect
    }

    fn set_size(&mut self, width: i32, height: i32) {
        let rect = Rect {
            x: self.rect.x,
            y: self.rect.y,
            width,
            height,
        };
        self.set_rect(rect);
    }

    fn get_size(&self) -> (i32, i32) {
        self.client_size
    }

    fn get_window_rect(&self) -> Rect<i32> {
        self.rect
    }

    fn get_native_handle(&self) -> NativeHandle {
        NativeHandle { hwnd: self.hwnd }
    }

    fn update(&mut self, _app: &mut App) {
        self.refresh_rects();
    }

    fn close(&mut self) {
        unsafe {
            let _ = DestroyWindow(self.hwnd);
        }
    }
}

extern "system" fn wndproc(window: HWND, message: u32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    unsafe {
        match message {
            WM_PAINT => {
                let _ = ValidateRect(Some(window), None);
                LRESULT(0)
            }
            WM_DESTROY => {
                PostQuitMessage(0);
                LRESULT(0)
            }
            _ => DefWindowProcA(window, message, wparam, lparam),
        }
    }
}

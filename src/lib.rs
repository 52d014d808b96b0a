/// Operating system module (app, window).
pub mod os;

/// Graphics device, command submission and presentation module.
pub mod gfx;

/// Client context bundling an app, device, queue and swap chain.
pub mod client;

/// Use bitmask for flags
#[macro_use]
extern crate bitflags;

/// Generic errors for modules to define their own
pub struct Error {
    pub msg: String,
}

/// Generic debug for errors
impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.msg)
    }
}

// conversion for windows-rs win32 errors
#[cfg(target_os = "windows")]
impl From<windows::core::Error> for Error {
    fn from(err: windows::core::Error) -> Error {
        Error {
            msg: err.message().to_string(),
        }
    }
}

// std errors
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error {
            msg: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error {
            msg: err.to_string(),
        }
    }
}

/// Returns an absolute path for `filename` located next to the running executable,
/// used for user config and other per-install data.
pub fn get_data_path(filename: &str) -> String {
    let exe_path = std::env::current_exe().ok().unwrap();
    let exe_dir = exe_path.parent().unwrap();
    exe_dir.join(filename).to_str().unwrap().to_string()
}

/*
 * Windows adapter layer. Everything in here talks to the live desktop: the
 * COM automation collection the file manager registers its tabs in
 * (`shell_session`), the window-registration event sink (`events`), and the
 * raw HWND operations for the tab-host control, close requests and process
 * launches (`desktop`). The core layer only sees these through its
 * capability traits, so this module tree is compiled on Windows only.
 */
pub mod com;
pub mod desktop;
pub mod error;
pub mod events;
pub mod shell_session;

pub use desktop::Win32Desktop;
pub use error::{PlatformError, Result as PlatformResult};
pub use shell_session::ComShellSession;

// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.
use sdl2::event::{Event, WindowEvent};
use sdl2::log::{Category, Priority};
use sdl2::video::{GLContext, GLProfile, SwapInterval, Window, WindowPos};
use sdl2::{EventPump, Sdl, VideoSubsystem};
use thiserror::Error;

use crate::input::{close_requested, MovementKeys};
use crate::settings::WindowSettings;
use crate::shader::ShaderError;

#[derive(Debug, Error)]
pub enum WindowError {
    #[error("Unable to initialize SDL: {0}")]
    Init(String),

    #[error("Unable to initialize the video subsystem: {0}")]
    Video(String),

    #[error("Failed to create the window: {0}")]
    WindowBuild(#[from] sdl2::video::WindowBuildError),

    #[error("Failed to query the primary display: {0}")]
    DisplayMode(String),

    #[error("Failed to create or activate the GL context: {0}")]
    Context(String),

    #[error("Failed to set the swap interval: {0}")]
    SwapInterval(String),

    #[error("Failed to acquire the event pump: {0}")]
    EventPump(String),

    #[error(transparent)]
    Shader(#[from] ShaderError),
}

fn forward_to_log(priority: Priority, _category: Category, message: &str) {
    match priority {
        Priority::Verbose | Priority::Debug => log::debug!(target: "sdl", "{}", message),
        Priority::Info => log::info!(target: "sdl", "{}", message),
        Priority::Warn => log::warn!(target: "sdl", "{}", message),
        _ => log::error!(target: "sdl", "{}", message),
    }
}

fn discard(_priority: Priority, _category: Category, _message: &str) {}

/// Routes SDL's own diagnostics into `log` until dropped.
pub struct ErrorSink {
    _private: (),
}

impl ErrorSink {
    pub fn install() -> Self {
        sdl2::log::set_output_function(forward_to_log);
        Self { _private: () }
    }
}

impl Drop for ErrorSink {
    fn drop(&mut self) {
        sdl2::log::set_output_function(discard);
    }
}

/// Top-left corner that centres a window of `window` size on a display of `display` resolution.
pub fn centered_position(window: (u32, u32), display: (i32, i32)) -> (i32, i32) {
    (
        (display.0 - window.0 as i32) / 2,
        (display.1 - window.1 as i32) / 2,
    )
}

/// The OS window, its GL context and the event pump.
///
/// Fields drop in declaration order, which is the reverse of acquisition.
pub struct HelloWindow {
    event_pump: EventPump,
    gl_context: GLContext,
    window: Window,
    video: VideoSubsystem,
    sdl: Sdl,
    error_sink: ErrorSink,
    should_close: bool,
}

impl HelloWindow {
    /// Creates the hidden window, centres it on the primary display, makes the
    /// GL context current on this thread, applies the swap interval and shows it.
    pub fn init(settings: &WindowSettings) -> Result<Self, WindowError> {
        let error_sink = ErrorSink::install();

        let sdl = sdl2::init().map_err(WindowError::Init)?;
        let video = sdl.video().map_err(WindowError::Video)?;

        let gl_attr = video.gl_attr();
        gl_attr.set_context_profile(GLProfile::Core);
        gl_attr.set_context_version(3, 3);
        gl_attr.set_depth_size(24);
        gl_attr.set_context_flags().forward_compatible().set();

        let mut builder = video.window(&settings.title, settings.width, settings.height);
        builder.opengl().hidden();
        if settings.resizable {
            builder.resizable();
        }
        let mut window = builder.build()?;

        {
            let size = window.size();
            let display = video
                .desktop_display_mode(0)
                .map_err(WindowError::DisplayMode)?;
            let (x, y) = centered_position(size, (display.w, display.h));
            log::debug!(
                "Centering {}x{} window on {}x{} display at ({}, {})",
                size.0,
                size.1,
                display.w,
                display.h,
                x,
                y
            );
            window.set_position(WindowPos::Positioned(x), WindowPos::Positioned(y));
        }

        let gl_context = window.gl_create_context().map_err(WindowError::Context)?;
        window
            .gl_make_current(&gl_context)
            .map_err(WindowError::Context)?;

        let interval = if settings.vsync {
            SwapInterval::VSync
        } else {
            SwapInterval::Immediate
        };
        video
            .gl_set_swap_interval(interval)
            .map_err(WindowError::SwapInterval)?;

        window.show();

        let event_pump = sdl.event_pump().map_err(WindowError::EventPump)?;
        log::info!(
            "Opened \"{}\" ({}x{})",
            settings.title,
            settings.width,
            settings.height
        );

        Ok(Self {
            event_pump,
            gl_context,
            window,
            video,
            sdl,
            error_sink,
            should_close: false,
        })
    }

    /// Loads GL entry points for the context current on this thread.
    ///
    /// # Safety
    /// The returned context is only valid on the thread that called [`HelloWindow::init`].
    pub unsafe fn load_gl(&self) -> glow::Context {
        glow::Context::from_loader_function(|s| self.video.gl_get_proc_address(s) as *const _)
    }

    pub fn should_close(&self) -> bool {
        self.should_close
    }

    /// Drains pending OS events. Escape release and quit requests raise the
    /// close flag. Returns the newest drawable size if the window was resized.
    pub fn poll_events(&mut self) -> Option<(i32, i32)> {
        let mut resized = None;
        for event in self.event_pump.poll_iter() {
            if close_requested(&event) {
                log::debug!("Close requested by {:?}", event);
                self.should_close = true;
                continue;
            }
            if let Event::Window {
                win_event: WindowEvent::SizeChanged(w, h),
                ..
            } = event
            {
                resized = Some((w, h));
            }
        }
        resized
    }

    /// Keys held right now, as of the last poll.
    pub fn movement_keys(&self) -> MovementKeys {
        MovementKeys::sample(&self.event_pump.keyboard_state())
    }

    pub fn swap_buffers(&self) {
        self.window.gl_swap_window();
    }

    pub fn set_title(&mut self, title: &str) {
        if let Err(e) = self.window.set_title(title) {
            log::warn!("Could not set window title: {}", e);
        }
    }

    /// Tears everything down in reverse order of acquisition.
    pub fn shutdown(self) {
        let HelloWindow {
            event_pump,
            gl_context,
            window,
            video,
            sdl,
            error_sink,
            ..
        } = self;

        drop(event_pump);
        log::debug!("Released input handling");
        drop(gl_context);
        drop(window);
        log::debug!("Destroyed window");
        drop(video);
        drop(sdl);
        log::debug!("Shut down SDL");
        drop(error_sink);
        log::info!("Window closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centers_square_window() {
        assert_eq!(centered_position((300, 300), (1920, 1080)), (810, 390));
    }

    #[test]
    fn centers_non_square_window() {
        assert_eq!(centered_position((640, 200), (1920, 1080)), (640, 440));
        assert_eq!(centered_position((301, 199), (1280, 1024)), (489, 412));
    }

    #[test]
    fn oversized_window_gets_negative_origin() {
        assert_eq!(centered_position((2000, 100), (1920, 1080)), (-40, 490));
    }

    #[test]
    fn errors_display_readable_messages() {
        let err = WindowError::Init("no video device".into());
        assert_eq!(err.to_string(), "Unable to initialize SDL: no video device");

        let err = WindowError::from(ShaderError::Link("missing main".into()));
        assert_eq!(err.to_string(), "Program linking failed: missing main");
    }
}

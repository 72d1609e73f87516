// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.

pub mod camera;
pub mod fps_counter;
pub mod frustum;
pub mod input;
pub mod renderer;
pub mod settings;
pub mod shader;
pub mod texture;
pub mod window;

use std::path::PathBuf;
use std::rc::Rc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use glow::HasContext;

use crate::camera::{CameraState, CameraSteps};
use crate::fps_counter::{fps_title, FpsCounter};
use crate::renderer::QuadRenderer;
use crate::settings::Settings;
use crate::texture::{Texture, TextureError, TextureOptions, UploadPolicy};
use crate::window::{HelloWindow, WindowError};

type PendingTexture = JoinHandle<Result<Texture, TextureError>>;

pub struct HelloWorld {
    settings: Settings,
}

impl HelloWorld {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Opens the window, renders until it is asked to close, then tears down.
    pub fn run(&self) -> Result<(), WindowError> {
        let pending_texture = self.render_texture_path().map(Self::decode_in_background);

        let mut window = HelloWindow::init(&self.settings.window)?;
        let gl = Rc::new(unsafe { window.load_gl() });
        unsafe {
            log::info!(
                "OpenGL {} on {} ({})",
                gl.get_parameter_string(glow::VERSION),
                gl.get_parameter_string(glow::RENDERER),
                gl.get_parameter_string(glow::VENDOR)
            );
        }

        let mut renderer = QuadRenderer::new(gl.clone(), &self.settings)?;
        if let Some(pending) = pending_texture {
            if let Some(texture) = Self::finish_texture(&gl, pending) {
                renderer.set_texture(texture);
            }
        }

        self.render_loop(&mut window, &mut renderer);

        renderer.destroy();
        log::info!("Rendered {} frames", renderer.frames_rendered());
        drop(renderer);
        drop(gl);
        window.shutdown();
        Ok(())
    }

    fn render_texture_path(&self) -> Option<PathBuf> {
        self.settings.render.texture.clone()
    }

    /// PNG decode is pure CPU and IO work, so it runs while the window comes up.
    fn decode_in_background(path: PathBuf) -> PendingTexture {
        thread::spawn(move || {
            Texture::open(&path, TextureOptions::default(), UploadPolicy::Deferred)
                .inspect_err(|e| log::warn!("Could not load {}: {}", path.display(), e))
        })
    }

    /// Joins the decode thread and uploads on the GL thread. Falls back to the
    /// flat colour on any failure.
    fn finish_texture(gl: &glow::Context, pending: PendingTexture) -> Option<Texture> {
        let mut texture = match pending.join() {
            Ok(Ok(texture)) => texture,
            Ok(Err(_)) => return None,
            Err(_) => {
                log::error!("Texture decode thread panicked");
                return None;
            }
        };

        match texture.upload(gl) {
            Ok(_) => {
                log::info!("Uploaded {}x{} texture", texture.width(), texture.height());
                Some(texture)
            }
            Err(e) => {
                log::warn!("Texture upload failed: {}", e);
                None
            }
        }
    }

    fn render_loop(&self, window: &mut HelloWindow, renderer: &mut QuadRenderer) {
        let steps = CameraSteps::from(&self.settings.camera);
        let mut camera = CameraState::default();
        let mut fps = FpsCounter::new();

        while !window.should_close() {
            renderer.clear();

            camera.apply_keys(&window.movement_keys(), &steps);
            renderer.draw(&camera);

            window.swap_buffers();

            // Key handling only happens here.
            if let Some((width, height)) = window.poll_events() {
                renderer.resize(width, height);
            }

            if let Some(frames) = fps.tick(Instant::now()) {
                window.set_title(&fps_title(frames));
            }
        }
    }
}

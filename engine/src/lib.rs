#![allow(dead_code, clippy::missing_safety_doc)]

use anyhow::Result;
use log::*;
use winit::dpi::LogicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::EventLoop;
use winit::window::{Window, WindowBuilder};

mod config;
mod error;
mod renderer;
mod vulkan;

pub use config::{EngineConfig, RendererConfig};
pub use error::RendererError;
pub use renderer::Renderer;
pub use vulkan::{validation_error_count, MAX_FRAMES_IN_FLIGHT};

/// A window with a triangle renderer attached to it.
///
/// The renderer is declared first so it is torn down before the window.
#[derive(Debug)]
pub struct Engine {
    renderer: Renderer,
    window: Window,
    event_loop: EventLoop<()>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Engine> {
        // Window
        let event_loop = EventLoop::new()?;
        let window = WindowBuilder::new()
            .with_title(config.title.as_str())
            .with_inner_size(LogicalSize::new(config.width, config.height))
            .build(&event_loop)?;

        let renderer = unsafe { Renderer::create(&window, &config.renderer)? };

        Ok(Engine {
            renderer,
            window,
            event_loop,
        })
    }

    pub fn run(self) -> Result<()> {
        let Engine {
            renderer,
            window,
            event_loop,
        } = self;
        let mut renderer = Some(renderer);
        let mut render_error = None;
        let first_error = &mut render_error;

        event_loop.run(move |event, elwt| {
            match event {
                // Request a redraw when all events were processed.
                Event::AboutToWait => window.request_redraw(),
                Event::WindowEvent { event, .. } => match event {
                    WindowEvent::RedrawRequested if !elwt.exiting() => {
                        if let Some(renderer) = renderer.as_mut() {
                            if let Err(err) = renderer.render() {
                                error!("Failed to draw frame: {}", err);
                                first_error.get_or_insert(err);
                                elwt.exit();
                            }
                        }
                    }
                    WindowEvent::CloseRequested => elwt.exit(),
                    _ => {}
                },
                // Release every Vulkan object while the window still exists.
                Event::LoopExiting => {
                    renderer.take();
                }
                _ => {}
            }
        })?;

        loop_result(render_error)
    }
}

/// The outcome of the event loop: the first frame that failed, if any.
fn loop_result(render_error: Option<RendererError>) -> Result<()> {
    match render_error {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vulkanalia::vk;

    #[test]
    fn failed_frame_fails_the_run() {
        let result = loop_result(Some(RendererError::Vulkan(vk::ErrorCode::OUT_OF_DATE_KHR)));

        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RendererError>(),
            Some(RendererError::Vulkan(vk::ErrorCode::OUT_OF_DATE_KHR))
        ));
        assert!(loop_result(None).is_ok());
    }
}

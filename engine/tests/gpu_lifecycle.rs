//! Needs a display and a Vulkan driver with the Khronos validation layer.
//! Reads the compiled shaders from the workspace `shaders/` directory. Run with
//! `cargo test -p triangle-engine -- --ignored`.

use std::path::PathBuf;

use engine::{validation_error_count, Renderer, RendererConfig, MAX_FRAMES_IN_FLIGHT};
use winit::dpi::LogicalSize;
use winit::event_loop::{EventLoop, EventLoopBuilder};
use winit::window::WindowBuilder;

fn event_loop() -> EventLoop<()> {
    let mut builder = EventLoopBuilder::new();
    #[cfg(all(unix, not(target_os = "macos")))]
    {
        use winit::platform::x11::EventLoopBuilderExtX11;
        builder.with_any_thread(true);
    }
    builder.build().unwrap()
}

fn shader(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../shaders")
        .join(name)
}

#[test]
#[ignore]
fn init_draw_and_teardown() {
    let _ = pretty_env_logger::try_init();

    let event_loop = event_loop();
    let window = WindowBuilder::new()
        .with_title("gpu lifecycle")
        .with_inner_size(LogicalSize::new(320, 240))
        .build(&event_loop)
        .unwrap();

    let config = RendererConfig::default()
        .with_validation(true)
        .with_shaders(shader("vert.spv"), shader("frag.spv"));

    let mut renderer = unsafe { Renderer::create(&window, &config) }.unwrap();

    // One framebuffer and one command buffer per swapchain image.
    assert!(renderer.image_count() > 0);
    assert_eq!(renderer.framebuffer_count(), renderer.image_count());
    assert_eq!(renderer.command_buffer_count(), renderer.image_count());

    for _ in 0..(MAX_FRAMES_IN_FLIGHT * 3) {
        renderer.render().unwrap();
    }
    renderer.wait_idle().unwrap();

    drop(renderer);
    drop(window);

    assert_eq!(validation_error_count(), 0);
}

// Copyright 2025 the Meshwarp Authors
// SPDX-License-Identifier: Apache-2.0

//! Meshwarp: interactive mesh-warp and perspective editing sessions for
//! canvas objects

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use kurbo::{Point, Vec2};

pub mod canvas;
pub mod coords;
pub mod engine;
pub mod error;
pub mod model;
pub mod modes;
pub mod session;
pub mod settings;
pub mod theme;

pub use canvas::{Canvas, CanvasEvent, MemoryCanvas, SceneObject};
pub use engine::{GridWarp, MeshEngine};
pub use error::{WarpError, WarpResult};
pub use model::{ObjectId, WarpState};
pub use modes::{Mode, Perspective, PerspectiveOptions, Warp, WarpOptions};
pub use session::{ControllerOptions, RenderOptions, WarpController};

use canvas::{MovingObject, TransformAction};

/// Steps a scripted drag is split into
const DRAG_STEPS: u32 = 4;

/// Entry point for the demo binary
pub fn run() -> Result<()> {
    // Initialize tracing subscriber (can be controlled via RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("meshwarp=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        bail!("usage: meshwarp <input.png> <output.png> [warp|perspective]");
    }
    let input = PathBuf::from(&args[1]);
    let output = PathBuf::from(&args[2]);
    let mode = args.get(3).map_or("warp", String::as_str);
    warp_file(&input, &output, mode)
}

/// Load `input`, deform it with a scripted handle drag and save the result
fn warp_file(input: &Path, output: &Path, mode_name: &str) -> Result<()> {
    let image = image::open(input)
        .with_context(|| format!("failed to open {}", input.display()))?
        .to_rgba8();
    let (w, h) = (image.width() as f64, image.height() as f64);
    tracing::info!("Loaded {} ({}x{})", input.display(), w, h);

    let mut canvas = MemoryCanvas::new();
    let target = canvas.insert(SceneObject::image(image, Point::new(w / 2.0, h / 2.0)));
    canvas.add(target);

    let mut controller = WarpController::new(canvas, ControllerOptions::default());
    controller.on_history_change(|records| {
        tracing::debug!(
            "history: {} undo, {} redo",
            records.undo.len(),
            records.redo.len()
        );
    });

    let mode: Box<dyn Mode> = match mode_name {
        "warp" => Box::new(Warp::default()),
        "perspective" => Box::new(Perspective::default()),
        other => bail!("unknown mode '{other}', expected warp or perspective"),
    };
    controller.enter_editing(target, None, mode)?;

    // pull one corner inwards
    let (handle, delta) = if let Some(warp) = controller.mode_as::<Warp>() {
        let handle = warp.control_objects().last().copied();
        (handle, Vec2::new(-w * 0.15, -h * 0.1))
    } else if let Some(perspective) = controller.mode_as::<Perspective>() {
        let handle = perspective.control_objects().get(1).copied();
        (handle, Vec2::new(-w * 0.2, h * 0.15))
    } else {
        (None, Vec2::ZERO)
    };
    let handle = handle.context("mode created no handles")?;
    scripted_drag(&mut controller, handle, delta)?;

    let pixels = controller
        .session()
        .and_then(|s| s.warp_object())
        .and_then(|id| controller.canvas().object(id))
        .and_then(|o| o.pixels())
        .context("session has no warped image")?;
    pixels
        .save(output)
        .with_context(|| format!("failed to write {}", output.display()))?;

    if let Some(state) = controller.get_warp_state() {
        let path = output.with_extension("json");
        let json = serde_json::to_string_pretty(&state)?;
        std::fs::write(&path, json)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!("Warp state written to {}", path.display());
    }
    tracing::info!("Warped image written to {}", output.display());

    controller.leave_editing();
    Ok(())
}

/// Drag `handle` by `delta` the way a host canvas reports it
fn scripted_drag(
    controller: &mut WarpController<MemoryCanvas>,
    handle: ObjectId,
    delta: Vec2,
) -> Result<()> {
    let original = controller
        .canvas()
        .object(handle)
        .map(|o| o.center)
        .context("handle is not on the canvas")?;
    for step in 1..=DRAG_STEPS {
        let to = original + delta * (step as f64 / DRAG_STEPS as f64);
        if let Some(object) = controller.canvas_mut().object_mut(handle) {
            object.center = to;
        }
        controller.handle_event(&CanvasEvent::ObjectMoving(vec![MovingObject {
            id: handle,
            original,
        }]));
        controller.on_animation_frame();
    }
    controller.handle_event(&CanvasEvent::ObjectModified {
        targets: vec![handle],
        action: TransformAction::Drag,
    });
    Ok(())
}

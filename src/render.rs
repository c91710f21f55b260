//! Composites frames onto the logical screen.
use crate::image::Image;
use crate::types::{Animation, Color, DisposalMethod, Frame, ImageDescriptor};

/// Disposal left behind by the last drawn frame.
#[derive(Debug)]
struct PendingDisposal {
    method: DisposalMethod,
    area: ImageDescriptor,
    saved: Option<Image>,
}

/// Keeps the canvas between frames and applies disposal methods.
#[derive(Debug)]
pub struct Compositor {
    canvas: Image,
    pending: Option<PendingDisposal>,
}

impl Compositor {
    pub fn new(width: usize, height: usize) -> Self {
        Compositor {
            canvas: Image::new(width, height),
            pending: None,
        }
    }

    /// Disposes of the previous frame, draws `frame` and returns the canvas.
    /// Transparent frame pixels keep what is underneath; anything outside
    /// the canvas is clipped.
    pub fn add_frame(&mut self, frame: &Frame) -> &Image {
        if let Some(pending) = self.pending.take() {
            self.dispose(pending);
        }

        let method = frame.disposal_method().unwrap_or_default();
        let saved = (method == DisposalMethod::RestoreToPrevious).then(|| self.canvas.clone());

        let left = frame.image_descriptor.left as usize;
        let top = frame.image_descriptor.top as usize;
        for row in 0..frame.image.height() {
            for column in 0..frame.image.width() {
                let color = frame.image[(row, column)];
                if !color.is_transparent() {
                    self.canvas.set(top + row, left + column, color);
                }
            }
        }

        self.pending = Some(PendingDisposal {
            method,
            area: frame.image_descriptor,
            saved,
        });
        &self.canvas
    }

    fn dispose(&mut self, pending: PendingDisposal) {
        match pending.method {
            DisposalMethod::NoDisposal | DisposalMethod::DoNotDispose => {}
            DisposalMethod::ClearCanvas => {
                let area = pending.area;
                for row in 0..area.height as usize {
                    for column in 0..area.width as usize {
                        self.canvas.set(
                            area.top as usize + row,
                            area.left as usize + column,
                            Color::TRANSPARENT,
                        );
                    }
                }
            }
            DisposalMethod::RestoreToPrevious => {
                if let Some(saved) = pending.saved {
                    self.canvas = saved;
                }
            }
        }
    }
}

/// Full-canvas image of every frame as it would be displayed.
pub fn render_frames(animation: &Animation) -> Vec<Image> {
    let lsd = &animation.logical_screen_descriptor;
    let mut compositor = Compositor::new(lsd.canvas_width as usize, lsd.canvas_height as usize);
    animation
        .frames
        .iter()
        .map(|frame| compositor.add_frame(frame).clone())
        .collect()
}

//! SDL2 "Video" window showing each filtered frame.

use sdl2::pixels::PixelFormatEnum;
use sdl2::render::{Canvas, TextureCreator};
use sdl2::video::{Window, WindowContext};
use sdl2::VideoSubsystem;
use tracing::{debug, info};

use crate::capture::Frame;
use crate::error::PipelineError;

/// Window that resizes itself to whatever frame it is given.
pub struct VideoWindow {
    canvas: Canvas<Window>,
    texture_creator: TextureCreator<WindowContext>,
    width: u32,
    height: u32,
}

impl VideoWindow {
    pub fn new(
        video: &VideoSubsystem,
        title: &str,
        width: u32,
        height: u32,
    ) -> Result<Self, PipelineError> {
        let window = video
            .window(title, width, height)
            .position_centered()
            .build()
            .map_err(|e| PipelineError::Display(e.to_string()))?;

        let canvas = window
            .into_canvas()
            .build()
            .map_err(|e| PipelineError::Display(e.to_string()))?;
        let texture_creator = canvas.texture_creator();

        info!("Video window open at {}x{}", width, height);
        Ok(Self {
            canvas,
            texture_creator,
            width,
            height,
        })
    }

    pub fn render_frame(&mut self, frame: &Frame) -> Result<(), PipelineError> {
        let (width, height) = frame.dimensions();
        if (width, height) != (self.width, self.height) {
            debug!("Video window resized to {}x{}", width, height);
            self.canvas
                .window_mut()
                .set_size(width, height)
                .map_err(|e| PipelineError::Display(e.to_string()))?;
            self.width = width;
            self.height = height;
        }

        let mut texture = self
            .texture_creator
            .create_texture_streaming(PixelFormatEnum::RGB24, width, height)
            .map_err(|e| PipelineError::Display(e.to_string()))?;

        texture
            .update(None, frame.image.as_raw(), (width * 3) as usize)
            .map_err(|e| PipelineError::Display(e.to_string()))?;

        self.canvas.clear();
        self.canvas
            .copy(&texture, None, None)
            .map_err(PipelineError::Display)?;

        self.canvas.present();
        Ok(())
    }
}

use crate::constants::pad::{DEFAULT_HEIGHT, DEFAULT_WIDTH};

/// Window position and size of a pad
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Geometry {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub fn size(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    pub fn position(&self) -> (i32, i32) {
        (self.x, self.y)
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self::new(0, 0, DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}

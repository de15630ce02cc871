/// Big ol' fat z-buffer. One value per pixel, greater means closer to the camera.
/// Stored values only ever grow until `clear` is called.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthBuffer {
    pub width: u32,
    pub height: u32,
    values: Vec<f64>,
}

impl DepthBuffer {
    /// Value of a pixel nothing was drawn to.
    pub const EMPTY: f64 = f64::MIN;

    pub fn new(width: u32, height: u32) -> Self {
        return Self {
            width,
            height,
            values: vec![Self::EMPTY; width as usize * height as usize],
        };
    }

    /// Resets every pixel to `EMPTY`.
    pub fn clear(&mut self) {
        self.values.fill(Self::EMPTY);
    }

    fn index(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        return Some(x as usize + y as usize * self.width as usize);
    }

    /// Stored depth, `None` outside of the buffer.
    pub fn get(&self, x: i64, y: i64) -> Option<f64> {
        return self.index(x, y).map(|index| self.values[index]);
    }

    /// Stores `depth` if it is strictly greater than what the pixel holds.
    /// Returns whether the value was stored.
    pub fn test_and_set(&mut self, x: i64, y: i64, depth: f64) -> bool {
        let index = match self.index(x, y) {
            Some(index) => index,
            None => return false,
        };
        if depth > self.values[index] {
            self.values[index] = depth;
            return true;
        }
        return false;
    }

    pub fn as_slice(&self) -> &[f64] {
        return &self.values[..];
    }
}

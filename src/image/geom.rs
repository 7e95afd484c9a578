/// An integer point, used both for raster sizes and origin offsets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IPoint {
    pub x: i32,
    pub y: i32,
}

impl IPoint {
    pub const ZERO: IPoint = IPoint { x: 0, y: 0 };

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Area when the point is interpreted as a size.
    pub fn product(&self) -> i64 {
        self.x as i64 * self.y as i64
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0 && self.y == 0
    }
}

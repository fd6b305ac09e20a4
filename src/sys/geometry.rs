//! Integer window geometry plus the float bounds handed to the animation side.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Point { Point { x, y } }

    pub fn offset(self, by: Point) -> Point { Point::new(self.x + by.x, self.y + by.y) }
}

#[derive(Serialize, Deserialize, Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
#[serde(deny_unknown_fields)]
pub struct Rect {
    pub pos_x: i32,
    pub pos_y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const ZERO: Rect = Rect::new(0, 0, 0, 0);

    pub const fn new(pos_x: i32, pos_y: i32, width: u32, height: u32) -> Rect {
        Rect { pos_x, pos_y, width, height }
    }

    pub fn origin(&self) -> Point { Point::new(self.pos_x, self.pos_y) }

    pub fn right(&self) -> i32 { self.pos_x + self.width as i32 }

    pub fn bottom(&self) -> i32 { self.pos_y + self.height as i32 }

    pub fn is_empty(&self) -> bool { self.width == 0 || self.height == 0 }

    /// Left and top edges are inclusive, right and bottom exclusive.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.pos_x && point.x < self.right() && point.y >= self.pos_y && point.y < self.bottom()
    }

    /// True only when the point is off every edge.
    pub fn strictly_contains(&self, point: Point) -> bool {
        point.x > self.pos_x && point.x < self.right() && point.y > self.pos_y && point.y < self.bottom()
    }

    pub fn with_origin(self, origin: Point) -> Rect {
        Rect { pos_x: origin.x, pos_y: origin.y, ..self }
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct RectF {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl From<Rect> for RectF {
    fn from(rect: Rect) -> Self {
        RectF {
            left: rect.pos_x as f32,
            top: rect.pos_y as f32,
            width: rect.width as f32,
            height: rect.height as f32,
        }
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct RoundedRect {
    pub rect: RectF,
    pub radius: f32,
}

impl RoundedRect {
    pub fn new(rect: impl Into<RectF>, radius: f32) -> Self {
        RoundedRect { rect: rect.into(), radius }
    }
}

pub trait IsWithin {
    fn is_within(&self, how_much: f32, other: Self) -> bool;
}

impl IsWithin for f32 {
    fn is_within(&self, how_much: f32, other: Self) -> bool { (self - other).abs() < how_much }
}

impl IsWithin for RectF {
    fn is_within(&self, how_much: f32, other: Self) -> bool {
        self.left.is_within(how_much, other.left)
            && self.top.is_within(how_much, other.top)
            && self.width.is_within(how_much, other.width)
            && self.height.is_within(how_much, other.height)
    }
}

//! Touch events and the observer they are delivered to.

use embedded_graphics::geometry::Point;

#[cfg(feature = "defmt")]
use defmt::Format;

/// Direction of a touch transition.
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchDirection {
    Down,
    Up,
}

/// A classified touch transition.
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TouchEvent {
    pub direction: TouchDirection,
    /// X in `0..=max_x` of the configured dimensions.
    pub x: u16,
    /// Y in `0..=max_y` of the configured dimensions.
    pub y: u16,
    /// Averaged raw pressure measurement.
    pub z: u8,
    /// 1 for a DOWN, since nothing is known about its length yet. For an
    /// UP read from the controller, the number of samples drained with it.
    /// A synthesized UP keeps the value of the DOWN it terminates.
    pub duration_hint: u8,
}

impl TouchEvent {
    /// The "nothing touched" state the driver starts from.
    pub const RELEASED: Self = Self {
        direction: TouchDirection::Up,
        x: 0,
        y: 0,
        z: 0,
        duration_hint: 0,
    };

    pub fn is_down(&self) -> bool {
        self.direction == TouchDirection::Down
    }

    /// The coordinates as an
    /// [embedded_graphics](https://docs.rs/embedded-graphics/latest/embedded_graphics/index.html)
    /// point.
    pub fn point(&self) -> Point {
        Point::new(i32::from(self.x), i32::from(self.y))
    }
}

impl Default for TouchEvent {
    fn default() -> Self {
        Self::RELEASED
    }
}

/// Receives every event the driver produces.
///
/// The handler runs synchronously from the interrupt or recovery timer
/// context the driver is called from. It must not block or do long running
/// work, and it must not call back into the driver.
pub trait TouchHandler {
    fn on_touch(&mut self, event: &TouchEvent);
}

impl<F> TouchHandler for F
where
    F: FnMut(&TouchEvent),
{
    fn on_touch(&mut self, event: &TouchEvent) {
        self(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn released_is_default() {
        let event = TouchEvent::default();
        assert_eq!(event, TouchEvent::RELEASED);
        assert!(!event.is_down());
    }

    #[test]
    fn point_conversion() {
        let event = TouchEvent {
            direction: TouchDirection::Down,
            x: 12,
            y: 4095,
            z: 3,
            duration_hint: 1,
        };
        assert!(event.is_down());
        assert_eq!(event.point(), Point::new(12, 4095));
    }

    #[test]
    fn closures_are_handlers() {
        let mut seen = 0;
        {
            let mut handler = |event: &TouchEvent| seen += event.duration_hint;
            handler.on_touch(&TouchEvent {
                duration_hint: 5,
                ..TouchEvent::RELEASED
            });
        }
        assert_eq!(seen, 5);
    }
}

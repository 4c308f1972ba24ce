use crate::models::SwipeType;

pub const MAX_DRAG: f64 = 100.0;
pub const SWIPE_THRESHOLD: f64 = 50.0;

pub fn clamp_drag(offset: f64) -> f64 {
    offset.clamp(-MAX_DRAG, MAX_DRAG)
}

/// The decision a card released at `offset` pixels makes, if any.
pub fn release(offset: f64) -> Option<SwipeType> {
    let offset = clamp_drag(offset);
    if offset > SWIPE_THRESHOLD {
        Some(SwipeType::Like)
    } else if offset < -SWIPE_THRESHOLD {
        Some(SwipeType::Pass)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drag_is_clamped() {
        assert_eq!(clamp_drag(250.0), 100.0);
        assert_eq!(clamp_drag(-250.0), -100.0);
        assert_eq!(clamp_drag(12.5), 12.5);
    }

    #[test]
    fn release_needs_more_than_threshold() {
        assert_eq!(release(51.0), Some(SwipeType::Like));
        assert_eq!(release(400.0), Some(SwipeType::Like));
        assert_eq!(release(-51.0), Some(SwipeType::Pass));
        assert_eq!(release(50.0), None);
        assert_eq!(release(-50.0), None);
        assert_eq!(release(0.0), None);
        assert_eq!(release(f64::NAN), None);
    }
}

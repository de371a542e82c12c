//! Synthetic request payloads.

use routeguide_core::{
    geo::COORD_FACTOR,
    proto::{Point, Rectangle, RouteNote},
};

/// Points streamed by one `RecordRoute` call.
pub const POINTS_PER_ROUTE: usize = 20;

/// Notes sent by one `RouteChat` call.
pub const NOTES_PER_CHAT: usize = 20;

const SCALE: i32 = COORD_FACTOR as i32;

/// A point on a whole-degree grid anywhere on the globe.
pub fn random_point() -> Point {
    let latitude = (rand::random_range(0..180) - 90) * SCALE;
    let longitude = (rand::random_range(0..360) - 180) * SCALE;
    Point::new(latitude, longitude)
}

/// A rectangle between two random corners, in no particular order.
pub fn random_rectangle() -> Rectangle {
    Rectangle::new(random_point(), random_point())
}

pub fn random_route() -> Vec<Point> {
    (0..POINTS_PER_ROUTE).map(|_| random_point()).collect()
}

/// The `seq`-th note of a chat, still unacknowledged.
pub fn chat_note(seq: usize) -> RouteNote {
    RouteNote {
        location: Some(random_point()),
        message: chat_message(&chrono::Local::now().to_rfc3339(), seq),
    }
}

fn chat_message(timestamp: &str, seq: usize) -> String {
    format!("[{timestamp}] ack=0 msg='message #{seq}'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_points_stay_on_the_globe() {
        for _ in 0..1_000 {
            let p = random_point();
            assert!((-90 * SCALE..90 * SCALE).contains(&p.latitude));
            assert!((-180 * SCALE..180 * SCALE).contains(&p.longitude));
            assert_eq!(p.latitude % SCALE, 0);
            assert_eq!(p.longitude % SCALE, 0);
        }
    }

    #[test]
    fn chat_messages_carry_the_ack_marker() {
        assert_eq!(
            chat_message("2024-01-01T00:00:00+00:00", 7),
            "[2024-01-01T00:00:00+00:00] ack=0 msg='message #7'"
        );
        let note = chat_note(3);
        assert!(note.message.contains("ack=0"));
        assert!(note.message.ends_with("msg='message #3'"));
        assert!(note.location.is_some());
    }

    #[test]
    fn routes_have_fixed_length() {
        assert_eq!(random_route().len(), POINTS_PER_ROUTE);
    }
}

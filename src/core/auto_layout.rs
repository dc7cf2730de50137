//! Auto-layout module for table arrangement
//!
//! Tables are placed evenly on a circle whose radius grows with the number of
//! tables. The same placement is used for a full re-arrangement of the canvas
//! and for batches of newly added tables, which start a quarter turn further
//! round so they do not land on top of the tables already at angle 0.
//!
//! Every function here is a pure function of its arguments.

use super::schema::Position;
use std::f64::consts::{FRAC_PI_2, PI};

/// Start angle for a batch of tables added to a non-empty canvas
pub const NEW_BATCH_START_ANGLE: f64 = FRAC_PI_2;

/// Layout configuration
#[derive(Clone, Debug)]
pub struct LayoutConfig {
    /// Smallest circle radius, used for small schemas
    pub min_radius: f64,
    /// Radius contributed by each table once past the minimum
    pub spacing_per_table: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            min_radius: 300.0,
            spacing_per_table: 100.0,
        }
    }
}

impl LayoutConfig {
    pub fn radius_for(&self, count: usize) -> f64 {
        (count as f64 * self.spacing_per_table).max(self.min_radius)
    }
}

/// Positions for `count` tables on a circle of radius
/// `max(min_radius, count * spacing_per_table)` centered at `(radius, radius)`.
///
/// Angles are spread evenly over a full turn, starting at `start_angle`.
pub fn calculate_circular_layout(
    count: usize,
    start_angle: f64,
    config: &LayoutConfig,
) -> Vec<Position> {
    if count == 0 {
        return Vec::new();
    }

    let radius = config.radius_for(count);
    let angle_step = 2.0 * PI / count as f64;

    (0..count)
        .map(|i| {
            let angle = start_angle + i as f64 * angle_step;
            Position::new(radius + radius * angle.cos(), radius + radius * angle.sin())
        })
        .collect()
}

/// Convenience function using the default config
pub fn circular_positions(count: usize, start_angle: f64) -> Vec<Position> {
    calculate_circular_layout(count, start_angle, &LayoutConfig::default())
}

/// Positions for `added` tables appended after `existing` ones.
///
/// The circle is sized for the combined total and the new tables take the
/// trailing slots.
pub fn positions_for_new_tables(existing: usize, added: usize) -> Vec<Position> {
    let start_angle = if existing > 0 {
        NEW_BATCH_START_ANGLE
    } else {
        0.0
    };

    circular_positions(existing + added, start_angle)
        .into_iter()
        .skip(existing)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 0.001,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_empty_layout() {
        assert!(circular_positions(0, 0.0).is_empty());
        assert!(positions_for_new_tables(3, 0).is_empty());
    }

    #[test]
    fn test_single_table() {
        let positions = circular_positions(1, 0.0);
        assert_eq!(positions.len(), 1);
        assert_close(positions[0].x, 600.0);
        assert_close(positions[0].y, 300.0);
    }

    #[test]
    fn test_four_tables_quarter_turns() {
        let positions = circular_positions(4, 0.0);

        assert_eq!(positions.len(), 4);
        assert_close(positions[0].x, 800.0);
        assert_close(positions[0].y, 400.0);
        assert_close(positions[1].x, 400.0);
        assert_close(positions[1].y, 800.0);
        assert_close(positions[2].x, 0.0);
        assert_close(positions[2].y, 400.0);
        assert_close(positions[3].x, 400.0);
        assert_close(positions[3].y, 0.0);

        for p in &positions {
            let distance = ((p.x - 400.0).powi(2) + (p.y - 400.0).powi(2)).sqrt();
            assert_close(distance, 400.0);
        }
    }

    #[test]
    fn test_radius_has_minimum() {
        let config = LayoutConfig::default();
        assert_eq!(config.radius_for(1), 300.0);
        assert_eq!(config.radius_for(3), 300.0);
        assert_eq!(config.radius_for(7), 700.0);
    }

    #[test]
    fn test_start_angle_offset() {
        let positions = circular_positions(2, NEW_BATCH_START_ANGLE);
        assert_close(positions[0].x, 300.0);
        assert_close(positions[0].y, 600.0);
    }

    #[test]
    fn test_new_tables_take_trailing_slots() {
        let all = circular_positions(5, NEW_BATCH_START_ANGLE);
        let added = positions_for_new_tables(3, 2);

        assert_eq!(added.len(), 2);
        assert_eq!(added[0], all[3]);
        assert_eq!(added[1], all[4]);
    }

    #[test]
    fn test_first_batch_starts_at_zero() {
        assert_eq!(positions_for_new_tables(0, 3), circular_positions(3, 0.0));
    }

    #[test]
    fn test_custom_config() {
        let config = LayoutConfig {
            min_radius: 50.0,
            spacing_per_table: 10.0,
        };
        let positions = calculate_circular_layout(2, 0.0, &config);
        assert_close(positions[0].x, 100.0);
        assert_close(positions[0].y, 50.0);
        assert_close(positions[1].x, 0.0);
        assert_close(positions[1].y, 50.0);
    }
}

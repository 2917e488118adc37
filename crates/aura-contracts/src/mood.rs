use serde::{Deserialize, Serialize};

/// One day of the weekly energy series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodPoint {
    pub day: String,
    pub level: u8,
}

/// Highest level the chart renders; levels are clamped to this when drawn.
pub const MOOD_LEVEL_MAX: u8 = 10;

/// The fixed sample series shown on the dashboard. There is no write path:
/// length and day labels are immutable for the session.
pub fn seeded_week() -> Vec<MoodPoint> {
    [
        ("Seg", 7),
        ("Ter", 6),
        ("Qua", 8),
        ("Qui", 9),
        ("Sex", 7),
        ("Sáb", 8),
        ("Dom", 10),
    ]
    .into_iter()
    .map(|(day, level)| MoodPoint {
        day: day.to_string(),
        level,
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::{seeded_week, MOOD_LEVEL_MAX};

    #[test]
    fn week_has_seven_fixed_labels() {
        let week = seeded_week();
        let labels: Vec<&str> = week.iter().map(|point| point.day.as_str()).collect();
        assert_eq!(
            labels,
            vec!["Seg", "Ter", "Qua", "Qui", "Sex", "Sáb", "Dom"]
        );
    }

    #[test]
    fn levels_stay_within_chart_bounds() {
        assert!(seeded_week()
            .iter()
            .all(|point| point.level >= 1 && point.level <= MOOD_LEVEL_MAX));
    }
}

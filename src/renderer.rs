//! # ASCII HUD Rendering
//!
//! Development-mode output for terminals: the celestial vector, one gauge
//! per cyclic field, the current sector and the next forecast event. The
//! graphical ring display is a separate collaborator and not part of this
//! crate.

use crate::lunar::{phase_label, PHASE_COUNT};
use crate::rotation::format_angle;
use crate::sector::UNKNOWN_SECTOR;
use crate::vector::CelestialVector;
use crate::{CosmicEvent, RotationMode, Season};
use chrono::{DateTime, Utc};
use std::fmt::Write;

const GAUGE_WIDTH: usize = 36;
const LABEL_WIDTH: usize = 12;

/// Everything one HUD frame shows.
#[derive(Debug, Clone)]
pub struct HudView<'a> {
    pub vector: &'a CelestialVector,
    pub mode: RotationMode,
    pub event: Option<&'a CosmicEvent>,
    pub now: DateTime<Utc>,
}

/// Horizontal gauge: `value` out of `max` as a bar with a `◆` marker.
pub fn gauge(value: f64, max: f64, width: usize) -> String {
    if width == 0 {
        return String::new();
    }
    let fraction = if value.is_finite() && max > 0.0 {
        (value / max).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let marker = ((fraction * (width - 1) as f64).round() as usize).min(width - 1);

    (0..width)
        .map(|i| match i.cmp(&marker) {
            std::cmp::Ordering::Less => '━',
            std::cmp::Ordering::Equal => '◆',
            std::cmp::Ordering::Greater => '─',
        })
        .collect()
}

fn row(out: &mut String, label: &str, value: &str) {
    let _ = writeln!(out, "{:<width$}{}", label, value, width = LABEL_WIDTH);
}

/// Render one HUD frame.
pub fn render_ascii(view: &HudView<'_>) -> String {
    let vector = view.vector;
    let mut out = String::new();

    let _ = writeln!(out, "CELESTIUM");
    let _ = writeln!(out, "{}", vector.full());
    let _ = writeln!(out);

    match vector.solar {
        Some(solar) => match (solar.arc(), solar.countdown()) {
            (Some(arc), _) => {
                row(&mut out, "SOLAR ARC", &format!("{:07.3}  {}", arc, solar.season().label()));
                row(&mut out, "", &gauge(arc, 360.0, GAUGE_WIDTH));
            }
            (None, countdown) => {
                row(&mut out, "SOLAR ARC", &format!("NULL     {}", Season::Anomaly.label()));
                if let Some(countdown) = countdown {
                    row(&mut out, "", &format!("next equinox in {}", countdown));
                }
            }
        },
        None => row(&mut out, "SOLAR ARC", "NULL     outside equinox table"),
    }

    let sector = vector
        .sector()
        .map(|s| format!("{} ({})", s.name, s.abbreviation))
        .unwrap_or_else(|| UNKNOWN_SECTOR.to_string());
    row(&mut out, "SECTOR", &sector);

    row(
        &mut out,
        "LUNAR PHASE",
        &format!("{} / {}", phase_label(vector.lunar_phase), PHASE_COUNT - 1),
    );
    row(
        &mut out,
        "",
        &gauge(f64::from(vector.lunar_phase), f64::from(PHASE_COUNT - 1), GAUGE_WIDTH),
    );

    row(
        &mut out,
        "ROTATION",
        &format!("{}°  [{}]", format_angle(vector.rotation_deg), view.mode),
    );
    row(&mut out, "", &gauge(vector.rotation_deg, 360.0, GAUGE_WIDTH));
    let _ = writeln!(out);

    match view.event {
        Some(event) => {
            row(&mut out, "NEXT EVENT", &format!("{} [{}]", event.label, event.badge()));
            row(
                &mut out,
                "",
                &format!("{} UTC · {}", event.formatted_date(), event.time_until(view.now)),
            );
        }
        None => row(&mut out, "NEXT EVENT", "none forecast"),
    }

    out
}

/// Print one HUD frame to stdout.
pub fn draw_ascii(view: &HudView<'_>) {
    print!("{}", render_ascii(view));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Countdown, EventCategory, SolarState};
    use chrono::TimeZone;

    #[test]
    fn test_gauge_marker_positions() {
        assert_eq!(gauge(0.0, 360.0, 5), "◆────");
        assert_eq!(gauge(180.0, 360.0, 5), "━━◆──");
        assert_eq!(gauge(360.0, 360.0, 5), "━━━━◆");
        assert_eq!(gauge(f64::NAN, 360.0, 5), "◆────");
        assert_eq!(gauge(10.0, 360.0, 0), "");
    }

    #[test]
    fn test_hud_with_arc_and_event() {
        let vector = CelestialVector {
            solar: Some(SolarState::from_arc(5.0)),
            lunar_phase: 15,
            rotation_deg: 90.0,
        };
        let event = CosmicEvent {
            category: EventCategory::EclipseSolar,
            label: "TOTAL SOLAR ECLIPSE".to_string(),
            instant: Utc.with_ymd_and_hms(2024, 4, 8, 18, 17, 0).unwrap(),
        };
        let view = HudView {
            vector: &vector,
            mode: RotationMode::TrueSolar,
            event: Some(&event),
            now: Utc.with_ymd_and_hms(2024, 3, 25, 3, 6, 0).unwrap(),
        };
        let hud = render_ascii(&view);

        assert!(hud.contains("175k :: 358° . 005.000 . 15 | 090.000°"));
        assert!(hud.contains("005.000  Spring (Growth)"));
        assert!(hud.contains("PISCES (PIS)"));
        assert!(hud.contains("15 / 29"));
        assert!(hud.contains("[TRUE_SOLAR]"));
        assert!(hud.contains("TOTAL SOLAR ECLIPSE [SOLAR]"));
        assert!(hud.contains("Apr 08, 2024 18:17 UTC · 14 DAYS"));
    }

    #[test]
    fn test_hud_in_anomaly_interval() {
        let vector = CelestialVector {
            solar: Some(SolarState::anomaly(Countdown {
                days: 3,
                hours: 2,
                minutes: 1,
                seconds: 0,
            })),
            lunar_phase: 0,
            rotation_deg: 0.0,
        };
        let view = HudView {
            vector: &vector,
            mode: RotationMode::Standard,
            event: None,
            now: Utc.with_ymd_and_hms(2025, 3, 17, 0, 0, 0).unwrap(),
        };
        let hud = render_ascii(&view);

        assert!(hud.contains("NULL     Calibration"));
        assert!(hud.contains("next equinox in 3d 2h 1m 0s"));
        assert!(hud.contains(UNKNOWN_SECTOR));
        assert!(hud.contains("none forecast"));
    }
}

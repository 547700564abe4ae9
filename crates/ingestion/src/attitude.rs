//! `Yaw: <f>, Pitch: <f>, Roll: <f>` text protocol
//!
//! Serial IMU boards print one fused attitude per line. Anything before the
//! `Yaw:` marker (board chatter, prompts) is ignored.

use contracts::AttitudeReading;

use crate::error::{IngestionError, Result};

const FIELDS: [&str; 3] = ["Yaw:", "Pitch:", "Roll:"];

/// Parse one attitude line, stamping it with `timestamp`
pub fn parse_attitude_line(line: &str, timestamp: f64) -> Result<AttitudeReading> {
    let start = line
        .find(FIELDS[0])
        .ok_or_else(|| IngestionError::parse("line", format!("no '{}' in {line:?}", FIELDS[0])))?;

    let mut rest = &line[start..];
    let mut values = [0.0f64; 3];
    for (i, field) in FIELDS.iter().enumerate() {
        if i > 0 {
            rest = rest
                .trim_start()
                .strip_prefix(',')
                .ok_or_else(|| IngestionError::parse("line", format!("expected ',' before {field}")))?;
        }
        rest = rest
            .trim_start()
            .strip_prefix(field)
            .ok_or_else(|| IngestionError::parse("line", format!("expected '{field}'")))?;
        let (value, tail) = take_number(rest.trim_start())
            .ok_or_else(|| IngestionError::parse("line", format!("bad number after '{field}'")))?;
        values[i] = value;
        rest = tail;
    }

    Ok(AttitudeReading {
        timestamp,
        yaw_deg: values[0],
        pitch_deg: values[1],
        roll_deg: values[2],
    })
}

/// Leading `[-0-9.]+` token parsed as f64
fn take_number(s: &str) -> Option<(f64, &str)> {
    let end = s
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_digit() || *c == '-' || *c == '.'))
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    if end == 0 {
        return None;
    }
    let value = s[..end].parse::<f64>().ok()?;
    Some((value, &s[end..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_plain_line() {
        let reading = parse_attitude_line("Yaw: 12.5, Pitch: -3.25, Roll: 0.0", 1.5).unwrap();
        assert_eq!(reading.timestamp, 1.5);
        assert_eq!(reading.yaw_deg, 12.5);
        assert_eq!(reading.pitch_deg, -3.25);
        assert_eq!(reading.roll_deg, 0.0);
    }

    #[test]
    fn test_tolerates_prefix_and_line_ending() {
        let reading = parse_attitude_line("> imu0 Yaw:1,Pitch:2,  Roll: -3\r\n", 0.0).unwrap();
        assert_eq!((reading.yaw_deg, reading.pitch_deg, reading.roll_deg), (1.0, 2.0, -3.0));
    }

    #[test]
    fn test_rejects_malformed_lines() {
        for line in [
            "",
            "hello",
            "Yaw: 1, Pitch: 2",
            "Yaw: abc, Pitch: 2, Roll: 3",
            "Yaw: 1.2.3, Pitch: 2, Roll: 3",
            "Pitch: 2, Yaw: 1, Roll: 3",
            "Yaw: 1 Pitch: 2 Roll: 3",
        ] {
            assert!(
                parse_attitude_line(line, 0.0).is_err(),
                "accepted {line:?}"
            );
        }
    }
}

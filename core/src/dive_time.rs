//! Elapsed dive time in the `MMM:SS` form shown on screen and written to
//! the dive-end record.

use nom::{
    bytes::complete::take_while_m_n,
    character::complete::{char, digit1},
    IResult, Parser,
};

use crate::error::DiveLogError;

/// Format elapsed seconds as zero-padded `MMM:SS`.
pub fn format_dive_time(elapsed_secs: i64) -> String {
    let secs = elapsed_secs.max(0);
    format!("{:03}:{:02}", secs / 60, secs % 60)
}

/// Parse `MMM:SS` back into seconds. Minutes may have any number of digits.
pub fn parse_dive_time(input: &str) -> Result<i64, DiveLogError> {
    match dive_time(input.trim()) {
        Ok(("", secs)) => Ok(secs),
        _ => Err(DiveLogError::DiveTime(input.to_string())),
    }
}

fn dive_time(input: &str) -> IResult<&str, i64> {
    let (input, minutes) = digit1(input)?;
    let (input, _) = char(':').parse(input)?;
    let (input, seconds) = take_while_m_n(2, 2, |c: char| c.is_ascii_digit()).parse(input)?;

    let minutes: i64 = minutes.parse().map_err(|_| {
        nom::Err::Failure(nom::error::Error::new(input, nom::error::ErrorKind::Digit))
    })?;
    let seconds: i64 = seconds.parse().map_err(|_| {
        nom::Err::Failure(nom::error::Error::new(input, nom::error::ErrorKind::Digit))
    })?;
    if seconds >= 60 {
        return Err(nom::Err::Failure(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Verify,
        )));
    }
    Ok((input, minutes * 60 + seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_dive_time() {
        assert_eq!(format_dive_time(100), "001:40");
        assert_eq!(format_dive_time(0), "000:00");
        assert_eq!(format_dive_time(3 * 3600 + 5), "180:05");
        assert_eq!(format_dive_time(-20), "000:00");
        assert_eq!(format_dive_time(1000 * 60 + 1), "1000:01");
    }

    #[test]
    fn test_parse_dive_time() {
        assert_eq!(parse_dive_time("001:40").unwrap(), 100);
        assert_eq!(parse_dive_time("1000:01").unwrap(), 60_001);
        assert_eq!(parse_dive_time(&format_dive_time(4321)).unwrap(), 4321);
    }

    #[test]
    fn test_parse_dive_time_rejects_malformed() {
        for bad in ["", "12", "001:4", "001:75", "001:400", "aa:10", "-01:10"] {
            assert!(
                matches!(parse_dive_time(bad), Err(DiveLogError::DiveTime(_))),
                "{bad:?} should not parse"
            );
        }
    }
}

use crate::error::FaersError;

const DAYS_IN_MONTH: [u8; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

fn is_leap_year(year: u32) -> bool {
    (year.is_multiple_of(4) && !year.is_multiple_of(100)) || year.is_multiple_of(400)
}

/// Validates an ISO-basic `YYYYMMDD` date and returns it trimmed.
pub(crate) fn validate_yyyymmdd(field: &str, value: &str) -> Result<String, FaersError> {
    let v = value.trim();
    if v.len() != 8 || !v.chars().all(|c| c.is_ascii_digit()) {
        return Err(FaersError::InvalidArgument(format!(
            "{field} must be in YYYYMMDD format (got '{v}')"
        )));
    }

    let year: u32 = v[0..4]
        .parse()
        .map_err(|_| FaersError::InvalidArgument(format!("Invalid year in {field}")))?;
    let month: u32 = v[4..6]
        .parse()
        .map_err(|_| FaersError::InvalidArgument(format!("Invalid month in {field}")))?;
    let day: u32 = v[6..8]
        .parse()
        .map_err(|_| FaersError::InvalidArgument(format!("Invalid day in {field}")))?;

    if !(1..=12).contains(&month) {
        return Err(FaersError::InvalidArgument(format!(
            "Invalid month {month} in {field} (must be 01-12)"
        )));
    }

    let max_day = if month == 2 && is_leap_year(year) {
        29
    } else {
        DAYS_IN_MONTH[(month - 1) as usize]
    };
    if day < 1 || day > max_day as u32 {
        return Err(FaersError::InvalidArgument(format!(
            "Invalid day {day} for month {month} in {field}"
        )));
    }

    Ok(v.to_string())
}

/// Turns an upstream `YYYYMMDD` value into `YYYY-MM-DD`; anything else yields `None`.
pub(crate) fn iso_from_yyyymmdd(value: Option<&str>) -> Option<String> {
    let v = value?.trim();
    if v.len() != 8 || !v.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(format!("{}-{}-{}", &v[0..4], &v[4..6], &v[6..8]))
}

#[cfg(test)]
mod tests {
    use super::{iso_from_yyyymmdd, validate_yyyymmdd};

    #[test]
    fn accepts_leap_day() {
        assert_eq!(
            validate_yyyymmdd("date_from", "20240229").expect("leap day"),
            "20240229"
        );
    }

    #[test]
    fn rejects_non_leap_february_29() {
        let err = validate_yyyymmdd("date_from", "20230229").expect_err("not a leap year");
        assert!(err.to_string().contains("Invalid day 29"));
    }

    #[test]
    fn rejects_dashed_dates_and_names_field() {
        let err = validate_yyyymmdd("date_to", "2024-01-01").expect_err("dashed");
        let msg = err.to_string();
        assert!(msg.contains("date_to"));
        assert!(msg.contains("YYYYMMDD"));
    }

    #[test]
    fn rejects_invalid_month() {
        let err = validate_yyyymmdd("date_from", "20241301").expect_err("month 13");
        assert!(err.to_string().contains("Invalid month"));
    }

    #[test]
    fn iso_inserts_hyphens() {
        assert_eq!(
            iso_from_yyyymmdd(Some("20210315")).as_deref(),
            Some("2021-03-15")
        );
        assert_eq!(iso_from_yyyymmdd(Some("2021")), None);
        assert_eq!(iso_from_yyyymmdd(None), None);
    }
}

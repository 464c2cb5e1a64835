//! Schedule expressions
//!
//! Rates such as `every 5m` and 5 or 6 field cron expressions are turned
//! into `cron(...)` schedule expressions with six fields.

use once_cell::sync::Lazy;
use regex::Regex;

static RATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^every (\d+)(m|h)$").expect("rate regex is valid"));

/// Convert a schedule to a `cron(...)` expression
///
/// Returns `None` when the schedule is neither a supported rate nor a cron
/// expression.
#[must_use]
pub fn to_cron_expression(schedule: &str) -> Option<String> {
    let schedule = schedule.trim();
    let fields = match schedule {
        "every day" => "0 0 * * ? *".to_string(),
        "every week" => "0 0 ? * 1 *".to_string(),
        "every month" => "0 0 1 * ? *".to_string(),
        "every year" => "0 0 1 1 ? *".to_string(),
        _ if schedule.starts_with("every ") => rate_fields(schedule)?,
        _ => cron_fields(schedule)?,
    };
    Some(format!("cron({fields})"))
}

fn rate_fields(schedule: &str) -> Option<String> {
    let captures = RATE.captures(schedule)?;
    let value: u32 = captures[1].parse().ok()?;
    match &captures[2] {
        "m" if (1..60).contains(&value) => Some(format!("*/{value} * * * ? *")),
        "h" if (1..24).contains(&value) => Some(format!("0 */{value} * * ? *")),
        _ => None,
    }
}

fn cron_fields(schedule: &str) -> Option<String> {
    let fields: Vec<&str> = schedule.split_whitespace().collect();
    let valid = |field: &&str| field.chars().all(|c| c.is_ascii_alphanumeric() || "*?/,-#L".contains(c));
    if !fields.iter().all(valid) {
        return None;
    }
    match fields.len() {
        5 => Some(format!("{} *", fields.join(" "))),
        6 => Some(fields.join(" ")),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rates() {
        assert_eq!(to_cron_expression("every 5m").as_deref(), Some("cron(*/5 * * * ? *)"));
        assert_eq!(to_cron_expression("every 2h").as_deref(), Some("cron(0 */2 * * ? *)"));
        assert_eq!(to_cron_expression("every day").as_deref(), Some("cron(0 0 * * ? *)"));
        assert_eq!(to_cron_expression("every 60m"), None);
        assert_eq!(to_cron_expression("every 5s"), None);
    }

    #[test]
    fn cron() {
        assert_eq!(to_cron_expression("0 1 * * ?").as_deref(), Some("cron(0 1 * * ? *)"));
        assert_eq!(to_cron_expression("0 1 * * ? 2030").as_deref(), Some("cron(0 1 * * ? 2030)"));
        assert_eq!(to_cron_expression("0 1 *"), None);
        assert_eq!(to_cron_expression("0 1 * * $"), None);
    }
}

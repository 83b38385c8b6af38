//! Markup builders shaped like the rendered sportsbook listing

use chrono::NaiveDate;

pub(crate) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
}

pub(crate) fn match_fragment(home: &str, away: &str, odds: &[&str]) -> String {
    let buttons: String = odds
        .iter()
        .map(|o| format!("<button class=\"odds-button\">{}</button>", o))
        .collect();
    format!(
        "<div class=\"sports-event\"><div class=\"event-time\">20:00</div>\
         <div class=\"team-name\">{}</div><div class=\"team-name\">{}</div>{}</div>",
        home, away, buttons
    )
}

pub(crate) fn section(label: &str, matches: &[String]) -> String {
    format!(
        "<div class=\"sports-group\"><div class=\"sports-group-header\">{}</div>\
         <div class=\"sports-tournament-header\">Test League</div>{}</div>",
        label,
        matches.concat()
    )
}

pub(crate) fn listing(sections: &[String]) -> String {
    format!("<html><body><main>{}</main></body></html>", sections.concat())
}

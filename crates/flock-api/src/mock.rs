//! Static payloads served when the remote backend cannot answer.

use serde_json::{Value, json};

pub fn ministries() -> Value {
    json!([
        {
            "id": "worship",
            "name": "Worship Team",
            "leader": "Music Director",
            "meets": "Thursdays 19:00",
            "description": "Leads the congregation in song on Sundays and at special services."
        },
        {
            "id": "youth",
            "name": "Youth Ministry",
            "leader": "Youth Pastor",
            "meets": "Fridays 18:30",
            "description": "Bible study, games and mentoring for ages 12 to 18."
        },
        {
            "id": "outreach",
            "name": "Community Outreach",
            "leader": "Outreach Coordinator",
            "meets": "First Saturday of the month",
            "description": "Food bank, hospital visits and neighbourhood service days."
        },
        {
            "id": "children",
            "name": "Children's Church",
            "leader": "Children's Coordinator",
            "meets": "Sundays 10:00",
            "description": "Age-appropriate teaching during the main service."
        }
    ])
}

pub fn announcements() -> Value {
    json!([
        {
            "id": "welcome",
            "title": "Welcome to our church family",
            "body": "New here? Stop by the welcome desk after the service.",
            "pinned": true
        },
        {
            "id": "volunteers",
            "title": "Volunteers needed",
            "body": "The hospitality team is looking for helpers for the monthly potluck.",
            "pinned": false
        }
    ])
}

pub fn resources() -> Value {
    json!([
        {
            "id": "reading-plan",
            "title": "One-year Bible reading plan",
            "category": "study",
            "url": "/resources/reading-plan.pdf"
        },
        {
            "id": "prayer-guide",
            "title": "Guide to intercessory prayer",
            "category": "prayer",
            "url": "/resources/prayer-guide.pdf"
        },
        {
            "id": "small-group-kit",
            "title": "Small group leader kit",
            "category": "leadership",
            "url": "/resources/small-group-kit.pdf"
        },
        {
            "id": "devotional",
            "title": "Morning devotional series",
            "category": "study",
            "url": "/resources/devotional.pdf"
        }
    ])
}

/// Mock resources narrowed to `category`. `None`, blank and `all` keep everything;
/// otherwise the match is exact but case-insensitive.
pub fn resources_in(category: Option<&str>) -> Value {
    let all = resources();
    let Some(wanted) = category
        .map(str::trim)
        .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("all"))
    else {
        return all;
    };

    let filtered: Vec<Value> = all
        .as_array()
        .into_iter()
        .flatten()
        .filter(|r| {
            r.get("category")
                .and_then(Value::as_str)
                .is_some_and(|c| c.eq_ignore_ascii_case(wanted))
        })
        .cloned()
        .collect();
    Value::Array(filtered)
}

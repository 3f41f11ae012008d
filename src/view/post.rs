use std::fmt::Display;

use chrono::{DateTime, Local, TimeZone};
use uuid::Uuid;

use crate::models::Post;

/// Format a timestamp like `6/1/2022, 1:05:09 PM`
pub fn format_timestamp<Tz>(timestamp: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    timestamp.format("%-m/%-d/%Y, %-I:%M:%S %p").to_string()
}

/// One post as rendered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostCard {
    pub id: Uuid,
    pub body: String,
    pub created_at: String,
}

impl PostCard {
    /// Timestamp shown in the viewer's local time
    pub fn new(post: &Post) -> Self {
        Self::with_timezone(post, &Local)
    }

    pub fn with_timezone<Tz>(post: &Post, tz: &Tz) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        Self {
            id: post.id,
            body: post.body.clone(),
            created_at: format_timestamp(&post.created_at.with_timezone(tz)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    fn post() -> Post {
        Post {
            id: Uuid::new_v4(),
            body: "hello".to_string(),
            created_at: "2022-06-01T13:05:09Z".parse().unwrap(),
        }
    }

    #[test]
    fn test_format_timestamp() {
        let card = PostCard::with_timezone(&post(), &Utc);
        assert_eq!(card.body, "hello");
        assert_eq!(card.created_at, "6/1/2022, 1:05:09 PM");
    }

    #[test]
    fn test_format_in_other_timezone() {
        let tz = FixedOffset::west_opt(14 * 3600).unwrap();
        let card = PostCard::with_timezone(&post(), &tz);
        assert_eq!(card.created_at, "5/31/2022, 11:05:09 PM");
    }

    #[test]
    fn test_midnight_is_twelve_am() {
        let ts: DateTime<Utc> = "2023-01-09T00:00:00Z".parse().unwrap();
        assert_eq!(format_timestamp(&ts), "1/9/2023, 12:00:00 AM");
    }
}

use crate::roadmap::Roadmap;
use chrono::NaiveDate;
use serde::Serialize;

/// Data rendered onto the completion certificate once every topic is done.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Certificate {
    pub course_name: String,
    pub completed_on: NaiveDate,
    /// `completed_on` as printed on the certificate, e.g. "October 19, 2026".
    pub display_date: String,
    /// Module titles, in roadmap order.
    pub modules: Vec<String>,
    pub topic_count: usize,
    /// Suggested file name for the exported image.
    pub file_name: String,
}

impl Certificate {
    /// Issues a certificate for a completed roadmap, or `None` while any topic
    /// is still open.
    pub fn issue(course_name: &str, roadmap: &Roadmap, completed_on: NaiveDate) -> Option<Self> {
        if !roadmap.is_complete() {
            return None;
        }
        Some(Self {
            course_name: course_name.to_string(),
            completed_on,
            display_date: completed_on.format("%B %-d, %Y").to_string(),
            modules: roadmap
                .modules()
                .iter()
                .map(|module| module.title.clone())
                .collect(),
            topic_count: roadmap.topics().count(),
            file_name: format!(
                "Sikho_Certificate_{}.png",
                course_name.split_whitespace().collect::<Vec<_>>().join("_")
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roadmap::{Module, Topic};

    fn roadmap() -> Roadmap {
        Roadmap::new(vec![Module {
            title: "Basics".to_string(),
            topics: vec![Topic::new("Intro", "desc"), Topic::new("Loops", "desc")],
        }])
    }

    #[test]
    fn test_no_certificate_until_complete() {
        let mut roadmap = roadmap();
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        roadmap.mark_complete("Intro");
        assert!(Certificate::issue("Rust Basics", &roadmap, date).is_none());

        roadmap.mark_complete("Loops");
        let certificate = Certificate::issue("Rust  Basics", &roadmap, date).unwrap();
        assert_eq!(certificate.file_name, "Sikho_Certificate_Rust_Basics.png");
        assert_eq!(certificate.modules, vec!["Basics".to_string()]);
        assert_eq!(certificate.topic_count, 2);
        assert_eq!(certificate.display_date, "October 19, 2026");

        let json = serde_json::to_value(&certificate).unwrap();
        assert_eq!(json["display_date"], "October 19, 2026");
        assert_eq!(json["completed_on"], "2026-10-19");
    }
}

use serde::Deserialize;

use crate::models::{non_blank, split_list};

const EMPLOYMENT_TYPES: &[&str] = &["full-time", "part-time", "contract", "freelance", "internship"];
const EXPERIENCE_LEVELS: &[&str] = &["entry", "junior", "mid", "senior", "executive"];

/// The vacancy form as the browser posts it.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct VacancyForm {
    pub title: String,
    pub description: Option<String>,
    pub requirements: Option<String>,
    pub responsibilities: Option<String>,
    pub salary_range: Option<String>,
    pub employment_type: Option<String>,
    pub experience_level: Option<String>,
    pub location: Option<String>,
    /// Checkbox; present when ticked.
    pub remote_work: Option<String>,
    pub skills_required: Option<String>,
    pub benefits: Option<String>,
    pub department: Option<String>,
    pub is_active: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VacancyFields {
    pub title: String,
    pub description: Option<String>,
    pub requirements: Option<String>,
    pub responsibilities: Option<String>,
    pub salary_range: Option<String>,
    pub employment_type: Option<String>,
    pub experience_level: Option<String>,
    pub location: Option<String>,
    pub remote_work: bool,
    pub skills_required: Vec<String>,
    pub benefits: Vec<String>,
    pub department: Option<String>,
    pub is_active: bool,
}

fn checked(raw: Option<&str>, default: bool) -> bool {
    match raw.map(str::trim) {
        None => default,
        Some(value) => matches!(value, "on" | "true" | "1" | "yes"),
    }
}

impl VacancyForm {
    pub fn validate(self) -> Result<VacancyFields, &'static str> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err("Title is required");
        }

        let employment_type = non_blank(self.employment_type);
        if employment_type.as_deref().is_some_and(|t| !EMPLOYMENT_TYPES.contains(&t)) {
            return Err("Unknown employment type");
        }
        let experience_level = non_blank(self.experience_level);
        if experience_level.as_deref().is_some_and(|l| !EXPERIENCE_LEVELS.contains(&l)) {
            return Err("Unknown experience level");
        }

        Ok(VacancyFields {
            title: title.to_owned(),
            description: non_blank(self.description),
            requirements: non_blank(self.requirements),
            responsibilities: non_blank(self.responsibilities),
            salary_range: non_blank(self.salary_range),
            employment_type,
            experience_level,
            location: non_blank(self.location),
            remote_work: checked(self.remote_work.as_deref(), false),
            skills_required: split_list(self.skills_required.as_deref().unwrap_or_default()),
            benefits: split_list(self.benefits.as_deref().unwrap_or_default()),
            department: non_blank(self.department),
            is_active: checked(self.is_active.as_deref(), true),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_is_required() {
        let form = VacancyForm { title: "   ".to_owned(), ..Default::default() };
        assert_eq!(form.validate(), Err("Title is required"));
    }

    #[test]
    fn lists_and_blanks_are_normalized() {
        let form = VacancyForm {
            title: " Backend Engineer ".to_owned(),
            description: Some("".to_owned()),
            employment_type: Some("full-time".to_owned()),
            remote_work: Some("on".to_owned()),
            skills_required: Some("rust, sql, ,tokio".to_owned()),
            benefits: Some(" ".to_owned()),
            ..Default::default()
        };

        let fields = form.validate().unwrap();
        assert_eq!(fields.title, "Backend Engineer");
        assert_eq!(fields.description, None);
        assert!(fields.remote_work);
        assert!(fields.is_active);
        assert_eq!(fields.skills_required, vec!["rust", "sql", "tokio"]);
        assert!(fields.benefits.is_empty());
    }

    #[test]
    fn unknown_enumerations_are_rejected() {
        let form = VacancyForm {
            title: "Designer".to_owned(),
            employment_type: Some("gig".to_owned()),
            ..Default::default()
        };
        assert_eq!(form.validate(), Err("Unknown employment type"));

        let form = VacancyForm {
            title: "Designer".to_owned(),
            experience_level: Some("guru".to_owned()),
            ..Default::default()
        };
        assert_eq!(form.validate(), Err("Unknown experience level"));
    }
}

//! Lead form validation and normalization
//!
//! Turns a raw contact-form payload into a [`LeadFormData`] or a map of
//! field-level errors. Every field is checked; errors are never fail-fast.

mod phone;

pub use phone::*;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use url::Url;

const NAME_MIN: usize = 2;
const NAME_MAX: usize = 100;
const PRACTICE_MIN: usize = 2;
const PRACTICE_MAX: usize = 200;

/// Field name → messages, keyed with the form's field names
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.fields().collect();
        write!(f, "invalid fields: {}", fields.join(", "))
    }
}

/// Project category offered on the form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectType {
    NewWebsite,
    WebsiteRedesign,
    SeoWebsite,
    NotSure,
}

impl ProjectType {
    pub const ALL: [ProjectType; 4] = [
        ProjectType::NewWebsite,
        ProjectType::WebsiteRedesign,
        ProjectType::SeoWebsite,
        ProjectType::NotSure,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectType::NewWebsite => "new-website",
            ProjectType::WebsiteRedesign => "website-redesign",
            ProjectType::SeoWebsite => "seo-website",
            ProjectType::NotSure => "not-sure",
        }
    }

    /// Human label used in emails
    pub fn label(&self) -> &'static str {
        match self {
            ProjectType::NewWebsite => "New website design",
            ProjectType::WebsiteRedesign => "Website redesign",
            ProjectType::SeoWebsite => "SEO + website",
            ProjectType::NotSure => "Not sure yet",
        }
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ProjectType::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("Unknown project type: {}", s))
    }
}

/// Raw form fields as submitted by the browser
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadFormInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub practice_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub project_type: Option<String>,
}

/// Validated and normalized contact fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadFormData {
    pub name: String,
    pub practice_name: String,
    /// Trimmed, lower-cased
    pub email: String,
    /// Ten digits, country code stripped
    pub phone: String,
    /// Always carries an explicit scheme
    pub website: Option<String>,
    pub project_type: Option<ProjectType>,
}

impl From<&LeadFormData> for LeadFormInput {
    fn from(data: &LeadFormData) -> Self {
        Self {
            name: Some(data.name.clone()),
            practice_name: Some(data.practice_name.clone()),
            email: Some(data.email.clone()),
            phone: Some(data.phone.clone()),
            website: data.website.clone(),
            project_type: data.project_type.map(|p| p.as_str().to_string()),
        }
    }
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(
            r"^[a-z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?)+$",
        )
        .expect("email pattern is valid")
    })
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn check_length(
    errors: &mut FieldErrors,
    field: &str,
    label: &str,
    value: Option<&str>,
    min: usize,
    max: usize,
) -> Option<String> {
    let Some(value) = value else {
        errors.add(field, format!("{} is required", label));
        return None;
    };

    let len = value.chars().count();
    if len < min {
        errors.add(field, format!("{} must be at least {} characters", label, min));
        None
    } else if len > max {
        errors.add(field, format!("{} must be at most {} characters", label, max));
        None
    } else {
        Some(value.to_string())
    }
}

fn normalize_email(errors: &mut FieldErrors, value: Option<&str>) -> Option<String> {
    let Some(value) = value else {
        errors.add("email", "Email is required");
        return None;
    };

    let email = value.to_lowercase();
    if email_regex().is_match(&email) && !email.contains("..") {
        Some(email)
    } else {
        errors.add("email", "Please enter a valid email address");
        None
    }
}

fn normalize_website(errors: &mut FieldErrors, value: Option<&str>) -> Option<String> {
    let value = value?;

    let candidate = if value.contains("://") {
        value.to_string()
    } else {
        format!("https://{}", value)
    };

    let valid = Url::parse(&candidate)
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .and_then(|url| url.host_str().map(|host| host.contains('.')))
        .unwrap_or(false);

    if valid {
        Some(candidate)
    } else {
        errors.add("website", "Please enter a valid URL");
        None
    }
}

fn parse_project_type(errors: &mut FieldErrors, value: Option<&str>) -> Option<ProjectType> {
    let value = value?;
    match value.parse() {
        Ok(project) => Some(project),
        Err(_) => {
            errors.add("projectType", "Please select a valid project type");
            None
        }
    }
}

/// Validate a raw submission, collecting every field error
pub fn validate_lead_form(input: &LeadFormInput) -> Result<LeadFormData, FieldErrors> {
    let mut errors = FieldErrors::default();

    let name = check_length(
        &mut errors,
        "name",
        "Name",
        non_blank(&input.name),
        NAME_MIN,
        NAME_MAX,
    );
    let practice_name = check_length(
        &mut errors,
        "practiceName",
        "Practice name",
        non_blank(&input.practice_name),
        PRACTICE_MIN,
        PRACTICE_MAX,
    );
    let email = normalize_email(&mut errors, non_blank(&input.email));

    let phone = match non_blank(&input.phone) {
        None => {
            errors.add("phone", "Phone number is required");
            None
        }
        Some(raw) => match normalize_phone(raw) {
            Some(digits) => Some(digits),
            None => {
                errors.add("phone", "Please enter a valid phone number");
                None
            }
        },
    };

    let website = normalize_website(&mut errors, non_blank(&input.website));
    let project_type = parse_project_type(&mut errors, non_blank(&input.project_type));

    match (name, practice_name, email, phone) {
        (Some(name), Some(practice_name), Some(email), Some(phone)) if errors.is_empty() => {
            Ok(LeadFormData {
                name,
                practice_name,
                email,
                phone,
                website,
                project_type,
            })
        }
        _ => Err(errors),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str, practice: &str, email: &str, phone: &str) -> LeadFormInput {
        LeadFormInput {
            name: Some(name.to_string()),
            practice_name: Some(practice.to_string()),
            email: Some(email.to_string()),
            phone: Some(phone.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_normalizes_basic_submission() {
        let data = validate_lead_form(&input("Jo Li", "Li Clinic", "JO@X.COM", "555-123-4567"))
            .unwrap();
        assert_eq!(data.email, "jo@x.com");
        assert_eq!(data.phone, "5551234567");
        assert_eq!(data.website, None);
        assert_eq!(data.project_type, None);
    }

    #[test]
    fn test_reports_every_error_at_once() {
        let mut raw = input("J", "", "not-an-email", "123");
        raw.website = Some("not a url".to_string());
        raw.project_type = Some("mobile-app".to_string());

        let errors = validate_lead_form(&raw).unwrap_err();
        let fields: Vec<&str> = errors.fields().collect();
        assert_eq!(
            fields,
            vec!["email", "name", "phone", "practiceName", "projectType", "website"]
        );
        assert_eq!(
            errors.get("practiceName").unwrap(),
            &["Practice name is required".to_string()]
        );
    }

    #[test]
    fn test_length_bounds_count_characters_after_trim() {
        let data = validate_lead_form(&input("  Jo  ", "Li", "a@b.co", "5551234567")).unwrap();
        assert_eq!(data.name, "Jo");

        let long = "é".repeat(101);
        let errors = validate_lead_form(&input(&long, "Li", "a@b.co", "5551234567")).unwrap_err();
        assert!(errors.get("name").is_some());

        let max = "é".repeat(100);
        assert!(validate_lead_form(&input(&max, "Li", "a@b.co", "5551234567")).is_ok());
    }

    #[test]
    fn test_website_gets_scheme() {
        let mut raw = input("Jo Li", "Li Clinic", "jo@x.com", "5551234567");
        raw.website = Some("liclinic.com".to_string());
        let data = validate_lead_form(&raw).unwrap();
        assert_eq!(data.website.as_deref(), Some("https://liclinic.com"));

        raw.website = Some("http://liclinic.com/about".to_string());
        let data = validate_lead_form(&raw).unwrap();
        assert_eq!(data.website.as_deref(), Some("http://liclinic.com/about"));

        raw.website = Some("   ".to_string());
        let data = validate_lead_form(&raw).unwrap();
        assert_eq!(data.website, None);

        raw.website = Some("ftp://liclinic.com".to_string());
        assert!(validate_lead_form(&raw).is_err());
    }

    #[test]
    fn test_project_type_enumeration() {
        let mut raw = input("Jo Li", "Li Clinic", "jo@x.com", "5551234567");
        raw.project_type = Some("seo-website".to_string());
        let data = validate_lead_form(&raw).unwrap();
        assert_eq!(data.project_type, Some(ProjectType::SeoWebsite));

        raw.project_type = Some(String::new());
        assert_eq!(validate_lead_form(&raw).unwrap().project_type, None);
    }

    #[test]
    fn test_revalidation_is_stable() {
        let mut raw = input(" Jo Li ", "Li Clinic", " Jo@X.Com ", "+1 (555) 123.4567");
        raw.website = Some("liclinic.com".to_string());
        raw.project_type = Some("not-sure".to_string());

        let first = validate_lead_form(&raw).unwrap();
        let second = validate_lead_form(&LeadFormInput::from(&first)).unwrap();
        assert_eq!(first, second);
    }
}

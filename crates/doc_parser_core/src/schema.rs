//! crates/doc_parser_core/src/schema.rs
//!
//! The field set requested from the extraction service for each resume.

use serde_json::{json, Map, Value};

/// Structured fields extracted from one resume.
///
/// Reading is lenient: a field with an unexpected JSON type is treated as absent,
/// and the untouched extraction output is always kept alongside as `raw_data`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResumeFields {
    /// Full name of the candidate.
    pub name: Option<String>,
    /// Email address.
    pub email: Option<String>,
    /// Phone number.
    pub phone: Option<String>,
    /// Location or address of the candidate.
    pub location: Option<String>,
    /// Technical skills and technologies.
    pub skills: Vec<String>,
    /// Work experience with company, position and duration.
    pub experience: Vec<Value>,
    /// Education details with degree, institution and year.
    pub education: Vec<Value>,
    /// Projects with name, description and technologies used.
    pub projects: Vec<Value>,
    /// Languages spoken by the candidate.
    pub languages: Vec<String>,
    /// LinkedIn profile URL.
    pub linkedin: Option<String>,
    /// GitHub profile URL.
    pub github: Option<String>,
    /// Twitter profile URL.
    pub twitter: Option<String>,
    /// Personal or portfolio website URL.
    pub website: Option<String>,
    /// Awards or recognitions received.
    pub awards: Vec<String>,
    /// Hobbies or interests.
    pub hobbies: Vec<String>,
    /// Certifications with name, issuing organization and year.
    pub certifications: Vec<String>,
    /// Achievements or notable accomplishments.
    pub achievements: Vec<String>,
    /// References with name and contact information.
    pub references: Vec<String>,
    /// Any additional information or notes.
    pub additional_info: Map<String, Value>,
    /// Professional summary.
    pub summary: Option<String>,
    /// Career objective or goal.
    pub objective: Option<String>,
    /// Custom metadata for the document.
    pub metadata: Map<String, Value>,
}

impl ResumeFields {
    /// Reads the typed view out of an extraction field map.
    pub fn from_map(fields: &Map<String, Value>) -> Self {
        let text = |key: &str| fields.get(key).and_then(Value::as_str).map(str::to_string);
        let strings = |key: &str| match fields.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        };
        let entries = |key: &str| match fields.get(key) {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        };
        let object = |key: &str| match fields.get(key) {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        };

        Self {
            name: text("name"),
            email: text("email"),
            phone: text("phone"),
            location: text("location"),
            skills: strings("skills"),
            experience: entries("experience"),
            education: entries("education"),
            projects: entries("projects"),
            languages: strings("languages"),
            linkedin: text("linkedin"),
            github: text("github"),
            twitter: text("twitter"),
            website: text("website"),
            awards: strings("awards"),
            hobbies: strings("hobbies"),
            certifications: strings("certifications"),
            achievements: strings("achievements"),
            references: strings("references"),
            additional_info: object("additional_info"),
            summary: text("summary"),
            objective: text("objective"),
            metadata: object("metadata"),
        }
    }

    /// The JSON Schema sent to the extraction service when its agent is created.
    pub fn json_schema() -> Value {
        let string = |description: &str| json!({ "type": "string", "description": description });
        let string_list = |description: &str| {
            json!({ "type": "array", "items": { "type": "string" }, "description": description })
        };
        let object = |description: &str| json!({ "type": "object", "description": description });

        json!({
            "type": "object",
            "properties": {
                "name": string("Full name of candidate"),
                "email": string("Email address"),
                "phone": string("Phone number"),
                "location": string("Location/Address of candidate"),
                "skills": string_list("Technical skills and technologies"),
                "experience": string_list("Work experience with company, position, duration"),
                "education": string_list("Education details with degree, institution, year"),
                "projects": string_list("Projects with name, description, technologies used"),
                "languages": string_list("Languages spoken by the candidate"),
                "linkedin": string("LinkedIn profile URL"),
                "github": string("GitHub profile URL"),
                "twitter": string("Twitter profile URL"),
                "website": string("Personal or portfolio website URL"),
                "awards": string_list("Awards or recognitions received"),
                "hobbies": string_list("Hobbies or interests"),
                "certifications": string_list("Certifications with name, issuing organization, year"),
                "achievements": string_list("Achievements or notable accomplishments"),
                "references": string_list("References with name, contact information"),
                "additional_info": object("Any additional information or notes"),
                "summary": string("Professional summary or objective"),
                "objective": string("Career objective or goal"),
                "metadata": object("Custom metadata for the document")
            },
            "required": ["name", "email", "skills", "experience", "education", "projects"]
        })
    }
}

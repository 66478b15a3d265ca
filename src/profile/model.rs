//! Visitor input and derived agent profile.

use serde::{Deserialize, Serialize};

use super::template::domain_company_name;

/// Contact details submitted through the form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserData {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub website: String,
}

impl UserData {
    /// Check that every field is filled in and the website names a host.
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        let fields = [
            ("name", &self.name),
            ("phone", &self.phone),
            ("email", &self.email),
            ("website", &self.website),
        ];
        if let Some((field, _)) = fields.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(format!("{field} is required"));
        }
        if domain_company_name(&self.website).is_empty() {
            return Err("website has no host name".to_string());
        }
        Ok(())
    }
}

/// Company knowledge used to configure a voice assistant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentProfile {
    pub company_name: String,
    pub system_instruction: String,
    pub welcome_message: String,
    /// Set once the hosted assistant exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assistant_id: Option<String>,
}

impl AgentProfile {
    /// Build a profile whose greeting is derived from the company name.
    pub fn new(company_name: impl Into<String>, system_instruction: impl Into<String>) -> Self {
        let company_name = company_name.into();
        Self {
            welcome_message: welcome_message(&company_name),
            company_name,
            system_instruction: system_instruction.into(),
            assistant_id: None,
        }
    }

    pub fn with_assistant_id(mut self, id: impl Into<String>) -> Self {
        self.assistant_id = Some(id.into());
        self
    }
}

/// The fixed opening line of every assistant.
pub fn welcome_message(company_name: &str) -> String {
    format!(
        "Hallo, hier ist die Digitale Assistenz von {company_name}, wie kann ich Ihnen weiterhelfen?"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserData {
        UserData {
            name: "Anna Beispiel".into(),
            phone: "+49123".into(),
            email: "a@b.de".into(),
            website: "www.beispielfirma.de".into(),
        }
    }

    #[test]
    fn validate_accepts_complete_input() {
        assert!(user().validate().is_ok());
    }

    #[test]
    fn validate_rejects_blank_fields() {
        let mut data = user();
        data.email = "   ".into();
        assert_eq!(data.validate().unwrap_err(), "email is required");

        let mut data = user();
        data.name.clear();
        assert_eq!(data.validate().unwrap_err(), "name is required");
    }

    #[test]
    fn validate_rejects_website_without_host() {
        for website in ["https://", "http://www.", ".de"] {
            let mut data = user();
            data.website = website.into();
            assert_eq!(
                data.validate().unwrap_err(),
                "website has no host name",
                "{website}"
            );
        }
    }

    #[test]
    fn greeting_uses_company_name() {
        let profile = AgentProfile::new("Beispiel GmbH", "...");
        assert_eq!(
            profile.welcome_message,
            "Hallo, hier ist die Digitale Assistenz von Beispiel GmbH, wie kann ich Ihnen weiterhelfen?"
        );
        assert!(profile.assistant_id.is_none());
    }

    #[test]
    fn profile_serializes_camel_case() {
        let profile = AgentProfile::new("X", "inst").with_assistant_id("asst_1");
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["companyName"], "X");
        assert_eq!(json["systemInstruction"], "inst");
        assert_eq!(json["assistantId"], "asst_1");
        assert!(json["welcomeMessage"].as_str().unwrap().contains("von X,"));
    }
}

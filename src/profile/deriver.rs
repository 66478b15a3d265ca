//! Profile deriver — asks the generation service to research the prospect's
//! website and fill the assistant template.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Deserialize;
use tracing::{info, warn};

use super::model::{AgentProfile, UserData};
use super::template::{SYSTEM_TEMPLATE, domain_company_name, fill_fallback};
use crate::error::LlmError;
use crate::llm::{GenerationRequest, GenerationService};

/// Name of the agency building the assistant, quoted in the prompt.
pub const DEFAULT_AGENCY: &str = "Software Service Agentur Hit";

static FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```json\n?|\n?```").expect("valid fence regex"));

/// Derives an `AgentProfile` from a visitor's form input.
pub struct ProfileDeriver {
    llm: Arc<dyn GenerationService>,
    agency: String,
}

impl ProfileDeriver {
    pub fn new(llm: Arc<dyn GenerationService>) -> Self {
        Self {
            llm,
            agency: DEFAULT_AGENCY.to_string(),
        }
    }

    pub fn with_agency(mut self, agency: impl Into<String>) -> Self {
        self.agency = agency.into();
        self
    }

    /// Research the website and build a profile.
    ///
    /// Only a failed generation call is an error. Anything the model returns is
    /// turned into a complete profile, falling back to the template when the
    /// answer cannot be parsed.
    pub async fn derive(&self, user: &UserData) -> Result<AgentProfile, LlmError> {
        info!(
            website = %user.website,
            model = self.llm.model_name(),
            "Deriving agent profile"
        );

        let request = GenerationRequest::new(build_prompt(user, &self.agency)).with_web_search();
        let raw = self.llm.generate(request).await?;

        let profile = profile_from_response(&raw, user);
        info!(company = %profile.company_name, "Agent profile derived");
        Ok(profile)
    }
}

/// Build the research + template-filling prompt.
pub fn build_prompt(user: &UserData, agency: &str) -> String {
    let website = &user.website;
    let name = &user.name;
    format!(
        r#"
I am building a voice assistant for a client using {agency}.
User Inputs:
Website: {website}
Name: {name}

TASK 1: DEEP ANALYSIS (CRAWLING)
Use Google Search to thoroughly analyze the website content.
Find the following specific details:
1. **OFFICIAL COMPANY NAME**: Look for the legal name in the footer, impressum, or page title. Do NOT use "{name}" unless it is explicitly part of the company name.
2. **LOCATION**: City and region.
3. **SERVICES**: Detailed list of what they do.
4. **KNOWLEDGE**: Opening hours, contact info details, history, team members, or specific product details found on the site.

TASK 2: CREATE SYSTEM INSTRUCTION
Fill out the German template below with the scraped data.

- Replace [FIRMENNAME] with the EXACT OFFICIAL COMPANY NAME found.
- Replace [ORT/REGION] and [ORT] with the city/region.
- Replace [DIENSTLEISTUNGEN] with a summary of services.
- Replace [WISSENSDATENBANK_VON_WEBSEITE] with a comprehensive summary of the facts found (e.g., "Wir haben Montag bis Freitag von 8 bis 17 Uhr geöffnet", "Wir sind spezialisiert auf X und Y", "Unser Sitz ist in Musterstadt").
- Replace [DIENSTLEISTUNGEN AUFZÄHLEN] with a list of key services.
- Replace [SPEZIFISCHE DIENSTLEISTUNG] with the main service category.

TEMPLATE:
"""
{SYSTEM_TEMPLATE}
"""

OUTPUT:
Return a valid JSON object with:
- "companyName": The extracted official company name (e.g. "Müller Bau GmbH", NOT "Max Müller's Firma").
- "systemInstruction": The fully filled-out template string.

Do not use markdown formatting like ```json. Just return the raw JSON string.
"#
    )
}

/// Remove markdown code fences the model may add despite instructions.
pub fn strip_fences(text: &str) -> String {
    FENCE.replace_all(text, "").trim().to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileResponse {
    company_name: Option<String>,
    system_instruction: Option<String>,
}

/// Turn raw model output into a profile. Never fails.
pub fn profile_from_response(raw: &str, user: &UserData) -> AgentProfile {
    let text = if raw.trim().is_empty() { "{}" } else { raw };
    let cleaned = strip_fences(text);

    match serde_json::from_str::<ProfileResponse>(&cleaned) {
        Ok(parsed) => {
            let company_name = parsed
                .company_name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty() && !is_placeholder_name(n, &user.name))
                .unwrap_or_else(|| domain_company_name(&user.website));

            let system_instruction = parsed
                .system_instruction
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| SYSTEM_TEMPLATE.to_string());

            AgentProfile::new(company_name, system_instruction)
        }
        Err(e) => {
            warn!(
                error = %e,
                response = %cleaned.chars().take(200).collect::<String>(),
                "Failed to parse agent profile, using template fallback"
            );
            fallback_profile(user)
        }
    }
}

/// Profile built only from the form input.
pub fn fallback_profile(user: &UserData) -> AgentProfile {
    let company_name = domain_company_name(&user.website);
    let system_instruction = fill_fallback(&company_name, &user.website);
    AgentProfile::new(company_name, system_instruction)
}

/// `"{user}'s firma"` means the model gave up and named the company after the
/// visitor.
fn is_placeholder_name(company_name: &str, user_name: &str) -> bool {
    let pattern = format!("{}'s firma", user_name.trim().to_lowercase());
    company_name.to_lowercase().contains(&pattern)
}

//! Generation Request Types
//!
//! Immutable description of one policy generation: which framework, which
//! policy, how detailed, for whom, and the organisation's business context.

use serde::{Deserialize, Serialize};

use super::error::{ValidationError, ValidationErrorKind};

/// Policy document kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PolicyType {
    #[default]
    PrivacyPolicy,
    DataProtection,
    InformationSecurity,
    AcceptableUse,
    IncidentResponse,
    DataRetention,
    BusinessContinuity,
    RiskManagement,
}

impl PolicyType {
    pub const ALL: [PolicyType; 8] = [
        PolicyType::PrivacyPolicy,
        PolicyType::DataProtection,
        PolicyType::InformationSecurity,
        PolicyType::AcceptableUse,
        PolicyType::IncidentResponse,
        PolicyType::DataRetention,
        PolicyType::BusinessContinuity,
        PolicyType::RiskManagement,
    ];

    /// Stable identifier, identical to the serde representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PrivacyPolicy => "privacy_policy",
            Self::DataProtection => "data_protection",
            Self::InformationSecurity => "information_security",
            Self::AcceptableUse => "acceptable_use",
            Self::IncidentResponse => "incident_response",
            Self::DataRetention => "data_retention",
            Self::BusinessContinuity => "business_continuity",
            Self::RiskManagement => "risk_management",
        }
    }

    /// Human readable title used in prompts and fallback documents
    pub fn title(&self) -> &'static str {
        match self {
            Self::PrivacyPolicy => "Privacy Policy",
            Self::DataProtection => "Data Protection Policy",
            Self::InformationSecurity => "Information Security Policy",
            Self::AcceptableUse => "Acceptable Use Policy",
            Self::IncidentResponse => "Incident Response Policy",
            Self::DataRetention => "Data Retention Policy",
            Self::BusinessContinuity => "Business Continuity Policy",
            Self::RiskManagement => "Risk Management Policy",
        }
    }
}

impl std::fmt::Display for PolicyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PolicyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == normalized)
            .ok_or_else(|| {
                format!(
                    "Unknown policy type: {}. Valid values: {}",
                    s,
                    Self::ALL.map(|p| p.as_str()).join(", ")
                )
            })
    }
}

/// How much tailoring the generated document receives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CustomizationLevel {
    Basic,
    #[default]
    Standard,
    Detailed,
    Comprehensive,
}

impl CustomizationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Standard => "standard",
            Self::Detailed => "detailed",
            Self::Comprehensive => "comprehensive",
        }
    }

    /// Drafting instruction embedded in the prompt
    pub fn guidance(&self) -> &'static str {
        match self {
            Self::Basic => "Produce a concise policy covering the essential obligations only.",
            Self::Standard => {
                "Produce a complete policy with clear sections, responsibilities and procedures."
            }
            Self::Detailed => {
                "Produce a detailed policy with step-by-step procedures, roles and review cycles."
            }
            Self::Comprehensive => {
                "Produce a comprehensive policy with procedures, roles, monitoring, training, \
                 exceptions handling and an implementation checklist."
            }
        }
    }

    /// Minimum character length expected from a provider at this level
    pub fn min_content_chars(&self) -> usize {
        match self {
            Self::Basic => 800,
            Self::Standard => 2_000,
            Self::Detailed => 4_000,
            Self::Comprehensive => 6_000,
        }
    }
}

impl std::fmt::Display for CustomizationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CustomizationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "standard" => Ok(Self::Standard),
            "detailed" => Ok(Self::Detailed),
            "comprehensive" => Ok(Self::Comprehensive),
            _ => Err(format!(
                "Unknown customization level: {}. Valid values: basic, standard, detailed, comprehensive",
                s
            )),
        }
    }
}

/// Intended readership of the policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TargetAudience {
    #[default]
    AllEmployees,
    Management,
    TechnicalStaff,
    Customers,
    Regulators,
}

impl TargetAudience {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AllEmployees => "all_employees",
            Self::Management => "management",
            Self::TechnicalStaff => "technical_staff",
            Self::Customers => "customers",
            Self::Regulators => "regulators",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::AllEmployees => "all employees, in plain English",
            Self::Management => "senior management and board members",
            Self::TechnicalStaff => "technical and IT staff",
            Self::Customers => "customers and members of the public",
            Self::Regulators => "regulators and external auditors",
        }
    }
}

impl std::str::FromStr for TargetAudience {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "all_employees" | "employees" => Ok(Self::AllEmployees),
            "management" => Ok(Self::Management),
            "technical_staff" | "technical" => Ok(Self::TechnicalStaff),
            "customers" => Ok(Self::Customers),
            "regulators" => Ok(Self::Regulators),
            _ => Err(format!(
                "Unknown target audience: {}. Valid values: all_employees, management, technical_staff, customers, regulators",
                s
            )),
        }
    }
}

/// Organisation facts that drive policy customization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessContext {
    pub organization_name: String,
    pub industry: String,
    pub employee_count: u32,
    /// Categories of personal or sensitive data processed
    #[serde(default)]
    pub data_types: Vec<String>,
    /// Whether data leaves the UK (international transfers)
    #[serde(default)]
    pub cross_border_transfers: bool,
}

/// One policy generation request. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub framework_id: String,
    pub business_context: BusinessContext,
    #[serde(default)]
    pub policy_type: PolicyType,
    #[serde(default)]
    pub customization_level: CustomizationLevel,
    #[serde(default)]
    pub target_audience: TargetAudience,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_language() -> String {
    "en-GB".to_string()
}

impl GenerationRequest {
    /// Reject requests that can never produce a meaningful policy
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.framework_id.trim().is_empty() {
            return Err(ValidationError::missing("framework_id"));
        }

        let ctx = &self.business_context;
        if ctx.organization_name.trim().is_empty() {
            return Err(ValidationError::missing(
                "business_context.organization_name",
            ));
        }
        if ctx.industry.trim().is_empty() {
            return Err(ValidationError::missing("business_context.industry"));
        }
        if ctx.employee_count == 0 {
            return Err(ValidationError::new(
                ValidationErrorKind::Range,
                "employee_count must be at least 1",
            )
            .with_field("business_context.employee_count"));
        }
        if !is_language_tag(&self.language) {
            return Err(ValidationError::new(
                ValidationErrorKind::Format,
                format!("'{}' is not a language tag such as en-GB", self.language),
            )
            .with_field("language"));
        }

        Ok(())
    }

    /// Copy with surrounding whitespace stripped and the framework id
    /// upper-cased, so equal requests hash, prompt and report identically
    pub fn normalized(&self) -> Self {
        let ctx = &self.business_context;
        Self {
            framework_id: self.framework_id.trim().to_ascii_uppercase(),
            business_context: BusinessContext {
                organization_name: ctx.organization_name.trim().to_string(),
                industry: ctx.industry.trim().to_string(),
                employee_count: ctx.employee_count,
                data_types: ctx
                    .data_types
                    .iter()
                    .map(|d| d.trim().to_string())
                    .filter(|d| !d.is_empty())
                    .collect(),
                cross_border_transfers: ctx.cross_border_transfers,
            },
            policy_type: self.policy_type,
            customization_level: self.customization_level,
            target_audience: self.target_audience,
            language: self.language.trim().to_string(),
        }
    }
}

/// Loose BCP 47 check: alphabetic primary subtag, alphanumeric subtags
fn is_language_tag(tag: &str) -> bool {
    let mut parts = tag.split('-');
    let primary_ok = parts
        .next()
        .is_some_and(|p| (2..=3).contains(&p.len()) && p.chars().all(|c| c.is_ascii_alphabetic()));
    primary_ok && parts.all(|p| !p.is_empty() && p.len() <= 8 && p.chars().all(|c| c.is_ascii_alphanumeric()))
}

#[cfg(test)]
pub(crate) fn sample_request() -> GenerationRequest {
    GenerationRequest {
        framework_id: "GDPR".to_string(),
        business_context: BusinessContext {
            organization_name: "Acme Ltd".to_string(),
            industry: "Retail".to_string(),
            employee_count: 120,
            data_types: vec!["customer contact details".to_string(), "payment data".to_string()],
            cross_border_transfers: true,
        },
        policy_type: PolicyType::PrivacyPolicy,
        customization_level: CustomizationLevel::Standard,
        target_audience: TargetAudience::Customers,
        language: "en-GB".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_request() {
        assert!(sample_request().validate().is_ok());
    }

    #[test]
    fn test_normalized_trims_and_uppercases() {
        let mut request = sample_request();
        request.framework_id = " gdpr ".to_string();
        request.business_context.organization_name = "  Acme Ltd ".to_string();
        request.business_context.industry = "Retail\n".to_string();
        request.business_context.data_types = vec![" payroll ".to_string(), "  ".to_string()];

        let normalized = request.normalized();
        assert_eq!(normalized.framework_id, "GDPR");
        assert_eq!(normalized.business_context.organization_name, "Acme Ltd");
        assert_eq!(normalized.business_context.industry, "Retail");
        assert_eq!(normalized.business_context.data_types, vec!["payroll".to_string()]);
        assert_eq!(normalized.normalized(), normalized);
    }

    #[test]
    fn test_missing_framework_rejected() {
        let mut request = sample_request();
        request.framework_id = "  ".to_string();
        let err = request.validate().unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::MissingField);
        assert_eq!(err.field.as_deref(), Some("framework_id"));
    }

    #[test]
    fn test_zero_employees_rejected() {
        let mut request = sample_request();
        request.business_context.employee_count = 0;
        assert_eq!(request.validate().unwrap_err().kind, ValidationErrorKind::Range);
    }

    #[test]
    fn test_language_tag() {
        assert!(is_language_tag("en"));
        assert!(is_language_tag("en-GB"));
        assert!(is_language_tag("cy-GB"));
        assert!(!is_language_tag(""));
        assert!(!is_language_tag("english"));
        assert!(!is_language_tag("en--GB"));
    }

    #[test]
    fn test_policy_type_parse() {
        assert_eq!(
            "privacy-policy".parse::<PolicyType>().unwrap(),
            PolicyType::PrivacyPolicy
        );
        assert_eq!(
            "INCIDENT_RESPONSE".parse::<PolicyType>().unwrap(),
            PolicyType::IncidentResponse
        );
        assert!("nonsense".parse::<PolicyType>().is_err());
    }

    #[test]
    fn test_enum_serde_matches_as_str() {
        for policy_type in PolicyType::ALL {
            let json = serde_json::to_string(&policy_type).unwrap();
            assert_eq!(json.trim_matches('"'), policy_type.as_str());
        }
        assert_eq!(
            serde_json::to_string(&CustomizationLevel::Comprehensive).unwrap(),
            "\"comprehensive\""
        );
    }

    #[test]
    fn test_request_defaults_from_json() {
        let request: GenerationRequest = serde_json::from_value(serde_json::json!({
            "framework_id": "ISO27001",
            "business_context": {
                "organization_name": "Beta plc",
                "industry": "Finance",
                "employee_count": 40
            }
        }))
        .unwrap();

        assert_eq!(request.policy_type, PolicyType::PrivacyPolicy);
        assert_eq!(request.customization_level, CustomizationLevel::Standard);
        assert_eq!(request.language, "en-GB");
        assert!(request.business_context.data_types.is_empty());
    }
}

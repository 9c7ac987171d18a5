//! Compliance Framework Catalog
//!
//! Read-only UK regulatory framework data. A built-in catalog ships with the
//! binary; an optional YAML file adds frameworks or replaces built-ins with
//! the same id.
//!
//! ## YAML format
//!
//! ```yaml
//! - id: SOX
//!   name: SOX
//!   display_name: Sarbanes-Oxley Act
//!   jurisdiction: United States
//!   key_requirements:
//!     - Internal control over financial reporting
//!   policy_template: |
//!     # {policy_type} for {organization_name}
//! ```

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::types::{ComplianceFramework, PolicyError, Result};

/// Framework lookup used by generation
pub trait FrameworkSource: Send + Sync {
    /// Case-insensitive lookup by id
    fn get(&self, id: &str) -> Option<ComplianceFramework>;

    /// All frameworks, in catalog order
    fn list(&self) -> Vec<ComplianceFramework>;
}

pub type SharedFrameworks = Arc<dyn FrameworkSource>;

/// In-memory framework catalog
#[derive(Debug, Clone, Default)]
pub struct FrameworkCatalog {
    frameworks: Vec<ComplianceFramework>,
}

impl FrameworkCatalog {
    pub fn new(frameworks: Vec<ComplianceFramework>) -> Self {
        Self { frameworks }
    }

    /// Catalog of built-in UK frameworks
    pub fn builtin() -> Self {
        Self::new(builtin_catalog())
    }

    /// Built-ins, overlaid with the YAML file at `path` when given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut catalog = Self::builtin();
        if let Some(path) = path {
            let content = std::fs::read_to_string(path).map_err(|e| {
                PolicyError::Config(format!(
                    "Failed to read framework catalog {}: {}",
                    path.display(),
                    e
                ))
            })?;
            let extra = Self::parse_yaml(&content)?;
            info!(
                "Loaded {} frameworks from {}",
                extra.len(),
                path.display()
            );
            catalog.merge(extra);
        }
        Ok(catalog)
    }

    /// Parse a YAML list of frameworks
    pub fn parse_yaml(content: &str) -> Result<Vec<ComplianceFramework>> {
        let frameworks: Vec<ComplianceFramework> = serde_yaml::from_str(content)?;
        if let Some(blank) = frameworks.iter().find(|f| f.id.trim().is_empty()) {
            return Err(PolicyError::Config(format!(
                "Framework '{}' has an empty id",
                blank.name
            )));
        }
        Ok(frameworks)
    }

    /// Add frameworks; entries with an existing id replace it in place
    pub fn merge(&mut self, frameworks: Vec<ComplianceFramework>) {
        for framework in frameworks {
            match self.frameworks.iter_mut().find(|f| f.matches_id(&framework.id)) {
                Some(existing) => {
                    debug!("Framework {} overridden", framework.id);
                    *existing = framework;
                }
                None => self.frameworks.push(framework),
            }
        }
    }

    pub fn len(&self) -> usize {
        self.frameworks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frameworks.is_empty()
    }
}

impl FrameworkSource for FrameworkCatalog {
    fn get(&self, id: &str) -> Option<ComplianceFramework> {
        self.frameworks.iter().find(|f| f.matches_id(id)).cloned()
    }

    fn list(&self) -> Vec<ComplianceFramework> {
        self.frameworks.clone()
    }
}

fn framework(
    id: &str,
    name: &str,
    display_name: &str,
    description: &str,
    key_requirements: &[&str],
    policy_template: &str,
) -> ComplianceFramework {
    ComplianceFramework {
        id: id.to_string(),
        name: name.to_string(),
        display_name: display_name.to_string(),
        description: description.to_string(),
        jurisdiction: "United Kingdom".to_string(),
        key_requirements: key_requirements.iter().map(|r| r.to_string()).collect(),
        policy_template: policy_template.to_string(),
    }
}

/// Built-in UK framework definitions
pub fn builtin_catalog() -> Vec<ComplianceFramework> {
    vec![
        framework(
            "GDPR",
            "UK GDPR",
            "UK General Data Protection Regulation",
            "Retained EU GDPR as amended by the Data Protection Act 2018.",
            &[
                "Lawful basis for processing",
                "Data subject rights",
                "Data protection by design and by default",
                "Records of processing activities",
                "Personal data breach notification within 72 hours",
                "International transfer safeguards",
            ],
            "# {policy_type}\n\n\
             **Organisation:** {organization_name}\n\
             **Framework:** {framework}\n\
             **Sector:** {industry}\n\n\
             ## 1. Purpose\n\n\
             {organization_name} is committed to processing personal data lawfully, fairly \
             and transparently in line with {framework}.\n\n\
             ## 2. Lawful Basis\n\n\
             Personal data is only processed where a lawful basis has been identified and recorded.\n\n\
             ## 3. Data Subject Rights\n\n\
             Individuals may exercise their rights of access, rectification, erasure, restriction, \
             portability and objection by contacting the Data Protection Lead.\n\n\
             ## 4. Breach Notification\n\n\
             Personal data breaches are assessed immediately and reported to the ICO within \
             72 hours where required.\n\n\
             ## 5. International Transfers\n\n\
             Transfers outside the UK rely on adequacy regulations or appropriate safeguards.\n\n\
             ## 6. Review\n\n\
             This policy is reviewed annually by {organization_name}.",
        ),
        framework(
            "DPA2018",
            "DPA 2018",
            "Data Protection Act 2018",
            "UK implementation of data protection law, including law enforcement processing.",
            &[
                "Appropriate policy document for special category data",
                "Conditions for processing criminal offence data",
                "Data protection officer responsibilities",
                "Retention and erasure of personal data",
            ],
            "# {policy_type}\n\n\
             **Organisation:** {organization_name}\n\
             **Framework:** {framework}\n\n\
             ## 1. Scope\n\n\
             This document sets out how {organization_name} meets the {framework} when \
             processing special category and criminal offence data in the {industry} sector.\n\n\
             ## 2. Retention\n\n\
             Personal data is retained only for as long as necessary and erased securely.\n\n\
             ## 3. Accountability\n\n\
             The Data Protection Officer monitors compliance and reports to senior management.",
        ),
        framework(
            "ISO27001",
            "ISO/IEC 27001",
            "ISO/IEC 27001:2022 Information Security Management",
            "International standard for information security management systems.",
            &[
                "Information security policy and objectives",
                "Risk assessment and treatment",
                "Access control",
                "Incident management",
                "Business continuity",
                "Supplier relationships",
            ],
            "# {policy_type}\n\n\
             **Organisation:** {organization_name}\n\
             **Standard:** {framework}\n\n\
             ## 1. Policy Statement\n\n\
             {organization_name} protects the confidentiality, integrity and availability \
             of its information assets through an ISMS aligned with {framework}.\n\n\
             ## 2. Risk Management\n\n\
             Information security risks are assessed at least annually and treated according \
             to the risk treatment plan.\n\n\
             ## 3. Access Control\n\n\
             Access is granted on a least-privilege basis and reviewed quarterly.\n\n\
             ## 4. Incidents\n\n\
             Security incidents are reported, logged and investigated without delay.",
        ),
        framework(
            "CYBER_ESSENTIALS",
            "Cyber Essentials",
            "Cyber Essentials (NCSC)",
            "Government-backed scheme covering five technical controls.",
            &[
                "Firewalls",
                "Secure configuration",
                "User access control",
                "Malware protection",
                "Security update management",
            ],
            "# {policy_type}\n\n\
             **Organisation:** {organization_name}\n\
             **Scheme:** {framework}\n\n\
             {organization_name} maintains the five {framework} controls: firewalls, secure \
             configuration, user access control, malware protection and security update \
             management. Controls are checked before each annual certification.",
        ),
        framework(
            "FCA_SYSC",
            "FCA SYSC",
            "FCA Senior Management Arrangements, Systems and Controls",
            "FCA Handbook requirements including operational resilience (SYSC 15A).",
            &[
                "Important business services identified",
                "Impact tolerances set",
                "Mapping and scenario testing",
                "Self-assessment documentation",
                "Outsourcing and third-party risk",
            ],
            "",
        ),
        framework(
            "PCI_DSS",
            "PCI DSS",
            "Payment Card Industry Data Security Standard v4.0",
            "Security standard for organisations handling cardholder data.",
            &[
                "Protect stored account data",
                "Encrypt transmission of cardholder data",
                "Restrict access by business need to know",
                "Log and monitor all access",
                "Test security regularly",
            ],
            "# {policy_type}\n\n\
             **Organisation:** {organization_name}\n\
             **Standard:** {framework}\n\n\
             Cardholder data held by {organization_name} is stored only where necessary, \
             encrypted in transit and at rest, and accessible only to staff with a \
             documented business need.",
        ),
        framework(
            "NIS",
            "NIS Regulations",
            "Network and Information Systems Regulations 2018",
            "Security duties for operators of essential services and digital service providers.",
            &[
                "Appropriate and proportionate security measures",
                "Incident notification to the competent authority",
                "Cyber Assessment Framework alignment",
            ],
            "",
        ),
    ]
}

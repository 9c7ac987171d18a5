//! Prompt Builder System
//!
//! Standardized prompt construction for policy drafting.
//!
//! ## Design Principles
//!
//! 1. **Role Definition**: Clear AI role for each task
//! 2. **Structured Objectives**: Numbered goals
//! 3. **Context Sections**: Organized input data, in insertion order
//! 4. **Focus Enforcement**: Prevent topic drift
//! 5. **Anti-Patterns**: Explicit bad examples
//!
//! Prompts are pure functions of their inputs: identical requests and
//! frameworks yield byte-identical prompts.

use crate::types::{ComplianceFramework, GenerationRequest, tail_to_token_limit};

/// Tokens of already-streamed text repeated to the fallback provider
const CONTINUATION_TAIL_TOKENS: usize = 1_500;

/// Prompt section types
#[derive(Debug, Clone)]
pub enum PromptSection {
    /// Role definition with expertise area
    Role { expertise: String, task: String },
    /// Numbered objectives
    Objectives(Vec<String>),
    /// Ordered key-value pairs
    Context(Vec<(String, String)>),
    /// Raw text section with optional header
    Text {
        header: Option<String>,
        content: String,
    },
    /// Focus enforcement with restrictions
    Focus {
        target: String,
        restrictions: Vec<String>,
    },
    /// Anti-patterns with good/bad examples
    AntiPatterns { bad: Vec<String>, good: Vec<String> },
}

/// Prompt builder for consistent prompt construction
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    sections: Vec<PromptSection>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a role definition section
    pub fn role(mut self, expertise: &str, task: &str) -> Self {
        self.sections.push(PromptSection::Role {
            expertise: expertise.to_string(),
            task: task.to_string(),
        });
        self
    }

    /// Add objectives section
    pub fn objectives<S: AsRef<str>>(mut self, objectives: &[S]) -> Self {
        self.sections.push(PromptSection::Objectives(
            objectives.iter().map(|o| o.as_ref().to_string()).collect(),
        ));
        self
    }

    /// Add a context item, appended to the first context section
    pub fn context_item(mut self, key: &str, value: &str) -> Self {
        let item = (key.to_string(), value.to_string());
        match self
            .sections
            .iter_mut()
            .find_map(|s| match s {
                PromptSection::Context(ctx) => Some(ctx),
                _ => None,
            }) {
            Some(ctx) => ctx.push(item),
            None => self.sections.push(PromptSection::Context(vec![item])),
        }
        self
    }

    /// Add text section with header
    pub fn section(mut self, header: &str, content: &str) -> Self {
        self.sections.push(PromptSection::Text {
            header: Some(header.to_string()),
            content: content.to_string(),
        });
        self
    }

    /// Add text section
    pub fn text(mut self, content: &str) -> Self {
        self.sections.push(PromptSection::Text {
            header: None,
            content: content.to_string(),
        });
        self
    }

    /// Add focus enforcement section
    pub fn focus(mut self, target: &str, restrictions: &[&str]) -> Self {
        self.sections.push(PromptSection::Focus {
            target: target.to_string(),
            restrictions: restrictions.iter().map(|r| r.to_string()).collect(),
        });
        self
    }

    /// Add anti-patterns section
    pub fn anti_patterns(mut self, bad: &[&str], good: &[&str]) -> Self {
        self.sections.push(PromptSection::AntiPatterns {
            bad: bad.iter().map(|b| b.to_string()).collect(),
            good: good.iter().map(|g| g.to_string()).collect(),
        });
        self
    }

    /// Build the final prompt string
    pub fn build(self) -> String {
        let mut prompt = String::new();

        for section in self.sections {
            match section {
                PromptSection::Role { expertise, task } => {
                    prompt.push_str("<ROLE>\n");
                    prompt.push_str(&format!(
                        "You are an expert {} specializing in {}.\n",
                        expertise, task
                    ));
                    prompt.push_str("</ROLE>\n\n");
                }
                PromptSection::Objectives(objectives) => {
                    prompt.push_str("<OBJECTIVES>\n");
                    for (i, obj) in objectives.iter().enumerate() {
                        prompt.push_str(&format!("{}. {}\n", i + 1, obj));
                    }
                    prompt.push_str("</OBJECTIVES>\n\n");
                }
                PromptSection::Context(ctx) => {
                    prompt.push_str("# Context\n\n");
                    for (key, value) in ctx {
                        prompt.push_str(&format!("**{}**: {}\n", key, value));
                    }
                    prompt.push('\n');
                }
                PromptSection::Text { header, content } => {
                    if let Some(h) = header {
                        prompt.push_str(&format!("# {}\n\n", h));
                    }
                    prompt.push_str(&content);
                    prompt.push_str("\n\n");
                }
                PromptSection::Focus {
                    target,
                    restrictions,
                } => {
                    prompt.push_str("<FOCUS>\n");
                    prompt.push_str(&format!("IMPORTANT: Focus EXCLUSIVELY on: {}\n", target));
                    for restriction in restrictions {
                        prompt.push_str(&format!("- {}\n", restriction));
                    }
                    prompt.push_str("</FOCUS>\n\n");
                }
                PromptSection::AntiPatterns { bad, good } => {
                    prompt.push_str("## ANTI-PATTERNS\n\n");
                    prompt.push_str("<what_not_to_do>\n");
                    for example in bad {
                        prompt.push_str(&format!("WRONG: {}\n", example));
                    }
                    prompt.push_str("</what_not_to_do>\n\n");
                    prompt.push_str("<what_to_do>\n");
                    for example in good {
                        prompt.push_str(&format!("CORRECT: {}\n", example));
                    }
                    prompt.push_str("</what_to_do>\n\n");
                }
            }
        }

        prompt.trim_end().to_string()
    }
}

/// Drafting prompt for one policy request against one framework
pub fn policy_prompt(request: &GenerationRequest, framework: &ComplianceFramework) -> String {
    let ctx = &request.business_context;
    let data_types = if ctx.data_types.is_empty() {
        "not specified".to_string()
    } else {
        ctx.data_types.join(", ")
    };
    let cross_border = if ctx.cross_border_transfers {
        "yes - personal data is transferred outside the United Kingdom"
    } else {
        "no - data stays within the United Kingdom"
    };

    let requirements = if framework.key_requirements.is_empty() {
        "- Apply the framework's core obligations".to_string()
    } else {
        framework
            .key_requirements
            .iter()
            .map(|r| format!("- {}", r))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let title = request.policy_type.title();
    let target = format!("{} for {}", title, ctx.organization_name);

    PromptBuilder::new()
        .role(
            "UK compliance consultant",
            &format!("drafting {} documentation", framework.name),
        )
        .objectives(&[
            format!(
                "Draft a {} for {} that complies with {}",
                title, ctx.organization_name, framework.display_name
            ),
            "Address every key requirement listed below explicitly".to_string(),
            format!("Write for {}", request.target_audience.description()),
            request.customization_level.guidance().to_string(),
        ])
        .context_item("Organisation", &ctx.organization_name)
        .context_item("Industry", &ctx.industry)
        .context_item("Employees", &ctx.employee_count.to_string())
        .context_item("Data processed", &data_types)
        .context_item("International transfers", cross_border)
        .context_item("Framework", &format!("{} ({})", framework.display_name, framework.id))
        .context_item("Jurisdiction", &framework.jurisdiction)
        .context_item("Policy type", title)
        .context_item("Customization level", request.customization_level.as_str())
        .context_item("Language", &request.language)
        .section("Key Requirements", &requirements)
        .focus(
            &target,
            &[
                "Do NOT include legal advice disclaimers beyond one short notice",
                "Do NOT reference regulations from other jurisdictions unless transfers require it",
                "ONLY describe controls the organisation can realistically operate",
            ],
        )
        .anti_patterns(
            &[
                "Generic boilerplate that never names the organisation",
                "Listing requirements without saying who does what",
            ],
            &[
                "Named roles, concrete procedures and review dates",
                "Sections that map back to the key requirements",
            ],
        )
        .text("Respond with the complete policy in Markdown, starting with a level-one heading.")
        .build()
}

/// Prompt asking a second provider to finish a partially streamed policy
pub fn continuation_prompt(original: &str, partial: &str) -> String {
    let tail = tail_to_token_limit(partial, CONTINUATION_TAIL_TOKENS);

    PromptBuilder::new()
        .text(original)
        .section(
            "Partial Draft",
            &format!(
                "The policy below was interrupted. It ends with:\n\n<partial>\n{}\n</partial>",
                tail
            ),
        )
        .focus(
            "continuing the interrupted policy",
            &[
                "Continue exactly where the partial draft stops",
                "Do NOT repeat any text that is already present",
                "Do NOT restart the document or add a new title",
            ],
        )
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frameworks::builtin_catalog;
    use crate::types::request::sample_request;
    use proptest::prelude::*;

    fn gdpr() -> ComplianceFramework {
        builtin_catalog()
            .into_iter()
            .find(|f| f.matches_id("GDPR"))
            .unwrap()
    }

    #[test]
    fn test_basic_prompt() {
        let prompt = PromptBuilder::new()
            .role("compliance consultant", "UK GDPR")
            .objectives(&["Draft policy", "Cite requirements"])
            .build();

        assert!(prompt.contains("<ROLE>"));
        assert!(prompt.contains("compliance consultant"));
        assert!(prompt.contains("1. Draft policy"));
        assert!(prompt.contains("2. Cite requirements"));
    }

    #[test]
    fn test_context_items_keep_insertion_order() {
        let prompt = PromptBuilder::new()
            .context_item("Zeta", "last key, first added")
            .context_item("Alpha", "second")
            .build();

        let zeta = prompt.find("**Zeta**").unwrap();
        let alpha = prompt.find("**Alpha**").unwrap();
        assert!(zeta < alpha);
        assert_eq!(prompt.matches("# Context").count(), 1);
    }

    #[test]
    fn test_policy_prompt_embeds_business_context() {
        let request = sample_request();
        let framework = gdpr();
        let prompt = policy_prompt(&request, &framework);

        assert!(prompt.contains("Acme Ltd"));
        assert!(prompt.contains("**Industry**: Retail"));
        assert!(prompt.contains("**Employees**: 120"));
        assert!(prompt.contains("payment data"));
        assert!(prompt.contains("transferred outside the United Kingdom"));
        assert!(prompt.contains("Privacy Policy"));
        for requirement in &framework.key_requirements {
            assert!(prompt.contains(requirement.as_str()));
        }
    }

    #[test]
    fn test_continuation_prompt_carries_tail() {
        let prompt = continuation_prompt("ORIGINAL", "# Policy\n\n## 1. Scope\n\nThis policy");
        assert!(prompt.starts_with("ORIGINAL"));
        assert!(prompt.contains("This policy"));
        assert!(prompt.contains("Do NOT repeat"));
    }

    proptest! {
        #[test]
        fn prop_policy_prompt_is_deterministic(
            org in "[A-Za-z][A-Za-z &]{0,30}",
            industry in "[A-Za-z]{1,20}",
            employees in 1u32..100_000,
            cross_border in any::<bool>(),
            data_types in proptest::collection::vec("[a-z ]{1,15}", 0..4),
        ) {
            let mut request = sample_request();
            request.business_context.organization_name = org;
            request.business_context.industry = industry;
            request.business_context.employee_count = employees;
            request.business_context.cross_border_transfers = cross_border;
            request.business_context.data_types = data_types;

            let framework = gdpr();
            let first = policy_prompt(&request, &framework);
            let second = policy_prompt(&request.clone(), &framework.clone());
            prop_assert_eq!(first, second);
        }
    }
}

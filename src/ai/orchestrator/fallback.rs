//! Static fallback rendering and paragraph replay
//!
//! The last-resort document is the framework's `policy_template` with
//! request placeholders substituted. It is never empty: frameworks without a
//! template use the generic one below.

use crate::types::{ComplianceFramework, GenerationRequest};

const GENERIC_TEMPLATE: &str = "# {policy_type}\n\n\
**Organisation:** {organization_name}\n\
**Framework:** {framework}\n\
**Sector:** {industry}\n\n\
## 1. Purpose\n\n\
This {policy_type} sets out how {organization_name} meets its obligations under {framework}.\n\n\
## 2. Scope\n\n\
The policy applies to all staff, contractors and systems of {organization_name} operating in \
the {industry} sector.\n\n\
## 3. Responsibilities\n\n\
Senior management owns this policy. A named compliance lead maintains it and reports on \
compliance at least annually.\n\n\
## 4. Review\n\n\
This policy is a baseline template and must be reviewed and completed before adoption.";

/// Render the static fallback document for a request
pub fn render_fallback(framework: &ComplianceFramework, request: &GenerationRequest) -> String {
    let template = if framework.policy_template.trim().is_empty() {
        GENERIC_TEMPLATE
    } else {
        framework.policy_template.as_str()
    };

    let ctx = &request.business_context;
    template
        .replace("{organization_name}", ctx.organization_name.trim())
        .replace("{policy_type}", request.policy_type.title())
        .replace("{framework}", &framework.display_name)
        .replace("{industry}", ctx.industry.trim())
}

/// Split text on blank lines into at most `max_chunks` pieces.
///
/// Paragraphs are merged in order so the pieces concatenate back to the
/// normalized document (paragraphs joined by one blank line).
pub fn split_for_replay(text: &str, max_chunks: usize) -> Vec<String> {
    let paragraphs: Vec<&str> = text
        .split("\n\n")
        .map(|p| p.trim_matches('\n'))
        .filter(|p| !p.trim().is_empty())
        .collect();

    if paragraphs.is_empty() {
        return Vec::new();
    }

    let per_chunk = paragraphs.len().div_ceil(max_chunks.max(1));
    let groups: Vec<String> = paragraphs
        .chunks(per_chunk)
        .map(|group| group.join("\n\n"))
        .collect();

    let last = groups.len() - 1;
    groups
        .into_iter()
        .enumerate()
        .map(|(i, g)| if i < last { format!("{}\n\n", g) } else { g })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frameworks::FrameworkCatalog;
    use crate::frameworks::FrameworkSource;
    use crate::types::request::sample_request;

    #[test]
    fn test_framework_template_substituted() {
        let framework = FrameworkCatalog::builtin().get("GDPR").unwrap();
        let text = render_fallback(&framework, &sample_request());

        assert!(text.contains("Acme Ltd"));
        assert!(text.contains("Privacy Policy"));
        assert!(text.contains("UK General Data Protection Regulation"));
        assert!(!text.contains("{organization_name}"));
        assert!(!text.contains("{framework}"));
    }

    #[test]
    fn test_blank_template_uses_generic() {
        let framework = FrameworkCatalog::builtin().get("NIS").unwrap();
        assert!(framework.policy_template.is_empty());

        let text = render_fallback(&framework, &sample_request());
        assert!(!text.trim().is_empty());
        assert!(text.contains("Network and Information Systems Regulations 2018"));
        assert!(text.contains("Retail"));
    }

    #[test]
    fn test_split_respects_max_chunks() {
        let text = (1..=10)
            .map(|i| format!("Paragraph {}", i))
            .collect::<Vec<_>>()
            .join("\n\n");

        let pieces = split_for_replay(&text, 6);
        assert!(pieces.len() <= 6);
        assert_eq!(pieces.concat(), text);
    }

    #[test]
    fn test_split_short_text() {
        assert_eq!(split_for_replay("One paragraph", 6), vec!["One paragraph"]);
        assert!(split_for_replay("\n\n  \n\n", 6).is_empty());
        assert_eq!(split_for_replay("a\n\nb", 0), vec!["a\n\nb"]);
    }
}

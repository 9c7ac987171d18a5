//! Frameworks Command
//!
//! List the compliance frameworks available for generation.

use std::path::Path;

use crate::cli::load_config;
use crate::frameworks::{FrameworkCatalog, FrameworkSource};
use crate::types::{ComplianceFramework, PolicyError, Result};

pub fn run(format: &str, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let catalog = FrameworkCatalog::load(config.frameworks.catalog_path.as_deref())?;
    println!("{}", render(&catalog.list(), format)?);
    Ok(())
}

pub fn render(frameworks: &[ComplianceFramework], format: &str) -> Result<String> {
    match format {
        "json" => Ok(serde_json::to_string_pretty(frameworks)?),
        "yaml" => Ok(serde_yaml::to_string(frameworks)?),
        "text" => Ok(render_text(frameworks)),
        other => Err(PolicyError::Config(format!(
            "Unknown format: {}. Valid values: text, json, yaml",
            other
        ))),
    }
}

fn render_text(frameworks: &[ComplianceFramework]) -> String {
    let width = frameworks.iter().map(|f| f.id.len()).max().unwrap_or(0);
    let mut out = format!("Compliance Frameworks ({})\n", frameworks.len());
    out.push_str(&"═".repeat(40));
    out.push('\n');
    for framework in frameworks {
        out.push_str(&format!(
            "{:<width$}  {} [{}]\n",
            framework.id,
            framework.display_name,
            framework.jurisdiction,
            width = width
        ));
        for requirement in &framework.key_requirements {
            out.push_str(&format!("{:<width$}    - {}\n", "", requirement, width = width));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_formats() {
        let frameworks = FrameworkCatalog::builtin().list();

        let text = render(&frameworks, "text").unwrap();
        assert!(text.contains("GDPR"));
        assert!(text.contains("Data subject rights"));

        let json: serde_json::Value =
            serde_json::from_str(&render(&frameworks, "json").unwrap()).unwrap();
        assert_eq!(json.as_array().unwrap().len(), frameworks.len());

        let yaml = render(&frameworks, "yaml").unwrap();
        assert_eq!(FrameworkCatalog::parse_yaml(&yaml).unwrap(), frameworks);

        assert!(render(&frameworks, "xml").is_err());
    }
}

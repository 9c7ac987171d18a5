//! Generate Command
//!
//! Generate one policy from the command line, single-shot or streamed.
//!
//! Usage:
//!   policygen generate --framework GDPR --org "Acme Ltd" --industry Retail
//!       [--employees N] [--data-type ..]* [--cross-border]
//!       [--policy-type ..] [--level ..] [--audience ..] [--language ..]
//!       [--stream] [--format text|json]

use std::io::Write;
use std::path::PathBuf;

use futures::StreamExt;

use crate::cli::CommandContext;
use crate::cli::ui::Output;
use crate::types::{
    BusinessContext, ChunkKind, CustomizationLevel, GenerationRequest, GenerationResult,
    PolicyError, PolicyType, Result, StreamChunk, TargetAudience,
};

/// Options collected from the command line
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub framework: String,
    pub organization: String,
    pub industry: String,
    pub employees: u32,
    pub data_types: Vec<String>,
    pub cross_border: bool,
    pub policy_type: PolicyType,
    pub level: CustomizationLevel,
    pub audience: TargetAudience,
    pub language: String,
    pub stream: bool,
    pub format: String,
    pub config_path: Option<PathBuf>,
}

impl GenerateOptions {
    pub fn to_request(&self) -> GenerationRequest {
        GenerationRequest {
            framework_id: self.framework.clone(),
            business_context: BusinessContext {
                organization_name: self.organization.clone(),
                industry: self.industry.clone(),
                employee_count: self.employees,
                data_types: self.data_types.clone(),
                cross_border_transfers: self.cross_border,
            },
            policy_type: self.policy_type,
            customization_level: self.level,
            target_audience: self.audience,
            language: self.language.clone(),
        }
    }
}

pub async fn run(options: GenerateOptions) -> Result<()> {
    let ctx = CommandContext::load(options.config_path.as_deref())?;
    let request = options.to_request();
    let json_output = options.format == "json";

    if options.stream {
        run_stream(&ctx, request, json_output).await
    } else {
        let result = ctx.orchestrator.generate(&request).await?;
        report(&result);
        println!("{}", render_result(&result, json_output)?);
        match result.error_message {
            Some(message) if !result.success => Err(PolicyError::GenerationFailed(message)),
            _ => Ok(()),
        }
    }
}

async fn run_stream(ctx: &CommandContext, request: GenerationRequest, json_output: bool) -> Result<()> {
    let mut chunks = ctx.orchestrator.generate_stream(request)?;
    let out = Output::new();
    let mut failure = None;

    while let Some(chunk) = chunks.next().await {
        let mut stdout = std::io::stdout().lock();
        if let Some(message) = write_chunk(&mut stdout, &chunk, json_output, &out)? {
            failure = Some(message);
        }
    }

    match failure {
        Some(message) => Err(PolicyError::GenerationFailed(message)),
        None => Ok(()),
    }
}

/// Write one chunk to `stdout`; returns the message of a terminal error chunk
fn write_chunk<W: Write>(
    stdout: &mut W,
    chunk: &StreamChunk,
    json_output: bool,
    out: &Output,
) -> Result<Option<String>> {
    if json_output {
        writeln!(stdout, "{}", serde_json::to_string(chunk)?)?;
    } else {
        match chunk.kind {
            ChunkKind::Metadata => {}
            ChunkKind::Content => {
                write!(stdout, "{}", chunk.content)?;
                stdout.flush()?;
            }
            ChunkKind::Complete => {
                writeln!(stdout)?;
                out.success(&completion_summary(chunk));
            }
            ChunkKind::Error => {
                writeln!(stdout)?;
                out.error(&chunk.content);
                if let Some(fallback) = chunk
                    .metadata
                    .as_ref()
                    .and_then(|m| m["fallback_content"].as_str())
                {
                    out.warning("Showing static template instead");
                    writeln!(stdout, "{}", fallback)?;
                }
            }
        }
    }

    Ok((chunk.kind == ChunkKind::Error).then(|| chunk.content.clone()))
}

fn completion_summary(chunk: &StreamChunk) -> String {
    let meta = chunk.metadata.clone().unwrap_or_default();
    let provider = meta["provider"].as_str().unwrap_or("unknown");
    let millis = meta["generation_time_ms"].as_u64().unwrap_or_default();
    if meta["replayed"].as_bool().unwrap_or(false) {
        format!("Generated by {} in {}ms (replayed)", provider, millis)
    } else {
        format!("Generated by {} in {}ms", provider, millis)
    }
}

fn report(result: &GenerationResult) {
    let out = Output::new();
    if result.success {
        out.success(&format!(
            "Generated by {} (confidence {:.2}, {} tokens, ${:.4}){}",
            result.provider_used.as_deref().unwrap_or("unknown"),
            result.confidence_score,
            result.usage.total_tokens(),
            result.usage.estimated_cost_usd,
            if result.was_cached { " [cached]" } else { "" }
        ));
    } else {
        out.error(result.error_message.as_deref().unwrap_or("Generation failed"));
        out.warning("Showing static template instead");
    }
}

/// Document text, or the full result as JSON
pub fn render_result(result: &GenerationResult, json_output: bool) -> Result<String> {
    if json_output {
        Ok(serde_json::to_string_pretty(result)?)
    } else {
        Ok(result.text().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UsageEstimate;

    fn options() -> GenerateOptions {
        GenerateOptions {
            framework: "ISO27001".to_string(),
            organization: "Northwind".to_string(),
            industry: "Logistics".to_string(),
            employees: 40,
            data_types: vec!["employee records".to_string()],
            cross_border: false,
            policy_type: PolicyType::InformationSecurity,
            level: CustomizationLevel::Basic,
            audience: TargetAudience::TechnicalStaff,
            language: "en-GB".to_string(),
            stream: false,
            format: "text".to_string(),
            config_path: None,
        }
    }

    #[test]
    fn test_options_build_valid_request() {
        let request = options().to_request();
        assert!(request.validate().is_ok());
        assert_eq!(request.framework_id, "ISO27001");
        assert_eq!(request.business_context.employee_count, 40);
        assert_eq!(request.target_audience, TargetAudience::TechnicalStaff);
    }

    #[test]
    fn test_render_result() {
        let request = options().to_request();
        let failed = GenerationResult::all_failed(
            &request,
            "# Template".to_string(),
            "All AI providers failed".to_string(),
            3,
        );
        assert_eq!(render_result(&failed, false).unwrap(), "# Template");

        let ok = GenerationResult::generated(
            &request,
            "# Policy".to_string(),
            "openai",
            "gpt-4o",
            0.9,
            UsageEstimate::default(),
            10,
        );
        let json = render_result(&ok, true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["provider_used"], "openai");
    }

    #[test]
    fn test_error_chunk_is_reported_as_failure() {
        let out = Output::new();
        let mut buffer = Vec::new();

        let content = StreamChunk::content("s", "# Partial", 0.05);
        assert_eq!(write_chunk(&mut buffer, &content, false, &out).unwrap(), None);

        let error = StreamChunk::error(
            "s",
            "All AI providers failed",
            Some(serde_json::json!({"fallback_content": "# Template"})),
        );
        assert_eq!(
            write_chunk(&mut buffer, &error, false, &out).unwrap().as_deref(),
            Some("All AI providers failed")
        );
        assert_eq!(String::from_utf8(buffer).unwrap(), "# Partial\n# Template\n");

        let mut json = Vec::new();
        assert!(write_chunk(&mut json, &error, true, &out).unwrap().is_some());
        let line: serde_json::Value = serde_json::from_slice(&json).unwrap();
        assert_eq!(line["type"], "error");
    }

    #[test]
    fn test_completion_summary() {
        let chunk = StreamChunk::complete(
            "s",
            serde_json::json!({"provider": "google", "generation_time_ms": 42, "replayed": true}),
        );
        assert_eq!(
            completion_summary(&chunk),
            "Generated by google in 42ms (replayed)"
        );
    }
}

use console::style;

use crate::ai::provider::{CircuitBreakerStats, CircuitState};

/// Human-facing status lines. Everything goes to stderr so stdout carries
/// only the generated document.
pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    pub fn success(&self, message: &str) {
        eprintln!("{} {}", style("✓").green(), message);
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn warning(&self, message: &str) {
        eprintln!("{} {}", style("⚠").yellow(), message);
    }

    pub fn info(&self, message: &str) {
        eprintln!("{} {}", style("ℹ").blue(), message);
    }

    pub fn header(&self, message: &str) {
        eprintln!("\n{}", style(message).bold().underlined());
    }

    /// One line per provider breaker, colored by state
    pub fn breaker(&self, stats: &CircuitBreakerStats) {
        let state = match stats.state {
            CircuitState::Closed => style(stats.state.to_string()).green(),
            CircuitState::HalfOpen => style(stats.state.to_string()).yellow(),
            CircuitState::Open => style(stats.state.to_string()).red(),
        };
        eprintln!(
            "  {:<8} {:<10} failures={} blocked={}",
            stats.provider_name, state, stats.failure_count, stats.blocked_count
        );
        if let Some(error) = &stats.last_error {
            eprintln!("           last error: {}", style(error).dim());
        }
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

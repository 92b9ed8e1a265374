use tracing::info;

use super::{Logger, LoggerError};
use crate::metrics::Metrics;

/// Prints each write as one human-readable line through `tracing`.
#[derive(Debug, Default)]
pub struct TerminalLogger;

impl TerminalLogger {
    pub fn new() -> Self {
        Self
    }

    pub fn format(data: &Metrics, label: &str, env_steps: u64) -> String {
        let values = data
            .iter()
            .map(|(name, value)| format!("{}: {:.3}", title_case(name), value))
            .collect::<Vec<_>>()
            .join(" | ");
        format!(
            "{} >> Env Steps: {:.2e} | {}",
            title_case(label),
            env_steps as f64,
            values
        )
    }
}

impl Logger for TerminalLogger {
    fn write(&mut self, data: &Metrics, label: &str, env_steps: u64) -> Result<(), LoggerError> {
        info!("{}", Self::format(data, label, env_steps));
        Ok(())
    }

    fn renders_to_terminal(&self) -> bool {
        true
    }
}

fn title_case(snake: &str) -> String {
    snake
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_line() {
        let mut data = Metrics::new();
        data.insert("episode_return".to_string(), 0.5);
        data.insert("time".to_string(), 1.23456);
        let line = TerminalLogger::format(&data, "eval_stochastic", 12_800);
        assert_eq!(
            line,
            "Eval Stochastic >> Env Steps: 1.28e4 | Episode Return: 0.500 | Time: 1.235"
        );
    }

    #[test]
    fn test_renders_to_terminal() {
        assert!(TerminalLogger::new().renders_to_terminal());
    }
}

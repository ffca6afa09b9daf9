//! Console command grammar: one command per line, optional JSON or text argument.

use std::path::PathBuf;

use scout_core::RawScrapeParams;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Activate(String),
    Validate,
    EndSession,
    Start(RawScrapeParams),
    Stop,
    State,
    Results(Option<usize>),
    Clear,
    Pick,
    Open(Option<PathBuf>),
    Export,
    Info,
    Quit,
}

pub fn parse(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let argument = (!rest.is_empty()).then_some(rest);

    let command = match word.to_ascii_lowercase().as_str() {
        "activate" => Command::Activate(argument.unwrap_or_default().to_string()),
        "validate" => Command::Validate,
        "end" => Command::EndSession,
        "start" => {
            let params = match argument {
                Some(json) => serde_json::from_str(json)
                    .map_err(|err| format!("start expects a JSON object: {err}"))?,
                None => RawScrapeParams::default(),
            };
            Command::Start(params)
        }
        "stop" => Command::Stop,
        "state" => Command::State,
        "results" => Command::Results(
            argument
                .map(|n| n.parse().map_err(|_| format!("not a count: {n}")))
                .transpose()?,
        ),
        "clear" => Command::Clear,
        "pick" => Command::Pick,
        "open" => Command::Open(argument.map(PathBuf::from)),
        "export" => Command::Export,
        "info" => Command::Info,
        "quit" | "exit" => Command::Quit,
        "" => return Err("empty command".to_string()),
        other => return Err(format!("unknown command: {other}")),
    };
    Ok(command)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn start_takes_the_shell_payload() {
        let command = parse(r#"start {"keyword": "shoes", "price": "50", "exportDir": "/out"}"#);
        assert_eq!(
            command,
            Ok(Command::Start(RawScrapeParams {
                keyword: Some("shoes".to_string()),
                price: Some(json!("50")),
                export_dir: Some("/out".to_string()),
                ..RawScrapeParams::default()
            }))
        );
        assert_eq!(parse("start"), Ok(Command::Start(RawScrapeParams::default())));
        assert!(parse("start {oops").is_err());
    }

    #[test]
    fn simple_commands() {
        assert_eq!(parse("  activate ABC-123 "), Ok(Command::Activate("ABC-123".to_string())));
        assert_eq!(parse("results"), Ok(Command::Results(None)));
        assert_eq!(parse("results 5"), Ok(Command::Results(Some(5))));
        assert_eq!(parse("OPEN /tmp/x"), Ok(Command::Open(Some(PathBuf::from("/tmp/x")))));
        assert_eq!(parse("exit"), Ok(Command::Quit));
        assert!(parse("results many").is_err());
        assert!(parse("fly").is_err());
        assert!(parse("   ").is_err());
    }
}

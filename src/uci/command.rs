//! UCI command parsing.

/// One line of input, tokenized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UciCommand {
    Uci,
    IsReady,
    UciNewGame,
    /// Raw tokens after "position".
    Position(Vec<String>),
    /// Raw tokens after "go".
    Go(Vec<String>),
    SetOption { name: String, value: Option<String> },
    Stop,
    Quit,
    Unknown(String),
}

impl UciCommand {
    /// Parse one input line. Unknown commands are preserved verbatim so
    /// the driver can report them.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            None => UciCommand::Unknown(String::new()),
            Some("uci") => UciCommand::Uci,
            Some("isready") => UciCommand::IsReady,
            Some("ucinewgame") => UciCommand::UciNewGame,
            Some("position") => {
                UciCommand::Position(tokens.map(str::to_string).collect())
            }
            Some("go") => UciCommand::Go(tokens.map(str::to_string).collect()),
            Some("setoption") => parse_setoption(&tokens.collect::<Vec<_>>()),
            Some("stop") => UciCommand::Stop,
            Some("quit") => UciCommand::Quit,
            Some(_) => UciCommand::Unknown(line.trim().to_string()),
        }
    }
}

/// `setoption name <multi word name> [value <multi word value>]`
fn parse_setoption(tokens: &[&str]) -> UciCommand {
    if tokens.first() != Some(&"name") {
        return UciCommand::Unknown(format!("setoption {}", tokens.join(" ")));
    }
    let rest = &tokens[1..];
    let value_at = rest.iter().position(|&t| t == "value");
    let (name_tokens, value) = match value_at {
        Some(idx) => (&rest[..idx], Some(rest[idx + 1..].join(" "))),
        None => (rest, None),
    };
    UciCommand::SetOption {
        name: name_tokens.join(" "),
        value,
    }
}

/// Parsed `go` parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoParams {
    pub depth: Option<u32>,
    pub nodes: Option<u64>,
    pub movetime: Option<u64>,
    pub wtime: Option<u64>,
    pub btime: Option<u64>,
    pub winc: Option<u64>,
    pub binc: Option<u64>,
    pub movestogo: Option<u64>,
    pub infinite: bool,
    pub searchmoves: Vec<String>,
    pub perft: Option<u32>,
}

impl GoParams {
    #[must_use]
    pub fn parse(tokens: &[String]) -> Self {
        let mut params = GoParams::default();
        let mut i = 0;
        while i < tokens.len() {
            let consumed = match tokens[i].as_str() {
                "depth" => {
                    params.depth = next_number(tokens, i);
                    2
                }
                "nodes" => {
                    params.nodes = next_number(tokens, i);
                    2
                }
                "movetime" => {
                    params.movetime = next_number(tokens, i);
                    2
                }
                "wtime" => {
                    params.wtime = next_number(tokens, i);
                    2
                }
                "btime" => {
                    params.btime = next_number(tokens, i);
                    2
                }
                "winc" => {
                    params.winc = next_number(tokens, i);
                    2
                }
                "binc" => {
                    params.binc = next_number(tokens, i);
                    2
                }
                "movestogo" => {
                    params.movestogo = next_number(tokens, i);
                    2
                }
                "infinite" => {
                    params.infinite = true;
                    1
                }
                "perft" => {
                    params.perft = next_number(tokens, i);
                    2
                }
                "searchmoves" => {
                    // Everything after is a move until another keyword.
                    let mut j = i + 1;
                    while j < tokens.len() && looks_like_move(&tokens[j]) {
                        params.searchmoves.push(tokens[j].clone());
                        j += 1;
                    }
                    j - i
                }
                _ => 1,
            };
            i += consumed;
        }
        params
    }
}

fn next_number<T: std::str::FromStr>(tokens: &[String], i: usize) -> Option<T> {
    tokens.get(i + 1).and_then(|t| t.parse().ok())
}

fn looks_like_move(token: &str) -> bool {
    let bytes = token.as_bytes();
    (4..=5).contains(&bytes.len())
        && bytes[0].is_ascii_lowercase()
        && bytes[1].is_ascii_digit()
        && bytes[2].is_ascii_lowercase()
        && bytes[3].is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_commands() {
        assert_eq!(UciCommand::parse("uci"), UciCommand::Uci);
        assert_eq!(UciCommand::parse("isready"), UciCommand::IsReady);
        assert_eq!(UciCommand::parse("  stop  "), UciCommand::Stop);
        assert_eq!(UciCommand::parse("quit"), UciCommand::Quit);
        assert!(matches!(
            UciCommand::parse("xyzzy"),
            UciCommand::Unknown(_)
        ));
    }

    #[test]
    fn parses_setoption_multiword() {
        assert_eq!(
            UciCommand::parse("setoption name Hash value 64"),
            UciCommand::SetOption {
                name: "Hash".to_string(),
                value: Some("64".to_string())
            }
        );
        assert_eq!(
            UciCommand::parse("setoption name SyzygyPath value /tmp/my tables"),
            UciCommand::SetOption {
                name: "SyzygyPath".to_string(),
                value: Some("/tmp/my tables".to_string())
            }
        );
        assert_eq!(
            UciCommand::parse("setoption name Clear Hash"),
            UciCommand::SetOption {
                name: "Clear Hash".to_string(),
                value: None
            }
        );
    }

    #[test]
    fn parses_go_params() {
        let tokens: Vec<String> = "depth 8 wtime 60000 btime 55000 winc 1000 binc 1000 movestogo 38"
            .split_whitespace()
            .map(str::to_string)
            .collect();
        let params = GoParams::parse(&tokens);
        assert_eq!(params.depth, Some(8));
        assert_eq!(params.wtime, Some(60_000));
        assert_eq!(params.btime, Some(55_000));
        assert_eq!(params.movestogo, Some(38));
        assert!(!params.infinite);
    }

    #[test]
    fn parses_searchmoves_until_keyword() {
        let tokens: Vec<String> = "searchmoves e2e4 d2d4 infinite"
            .split_whitespace()
            .map(str::to_string)
            .collect();
        let params = GoParams::parse(&tokens);
        assert_eq!(params.searchmoves, ["e2e4", "d2d4"]);
        assert!(params.infinite);
    }

    #[test]
    fn parses_go_perft() {
        let tokens: Vec<String> = ["perft".to_string(), "5".to_string()].to_vec();
        assert_eq!(GoParams::parse(&tokens).perft, Some(5));
    }

    #[test]
    fn ignores_malformed_numbers() {
        let tokens: Vec<String> = "depth abc movetime 100"
            .split_whitespace()
            .map(str::to_string)
            .collect();
        let params = GoParams::parse(&tokens);
        assert_eq!(params.depth, None);
        assert_eq!(params.movetime, Some(100));
    }
}

use super::*;

fn parse_args(argv: &[&str]) -> Args {
    Args::try_parse_from(argv)
        .unwrap_or_else(|err| panic!("argv={argv:?} should parse successfully: {err}"))
}

#[test]
fn no_subcommand_defaults_to_chat() {
    let args = parse_args(&["chatstream"]);
    assert!(args.command.is_none());
    assert!(args.base_url.is_none());
    assert!(args.log.is_none());
}

#[test]
fn say_collects_trailing_words_and_session() {
    let argv = ["chatstream", "say", "--session", "abc", "what", "is", "-1?"];
    match parse_args(&argv).command {
        Some(Commands::Say { session, text }) => {
            assert_eq!(session.as_deref(), Some("abc"));
            assert_eq!(text.join(" "), "what is -1?");
        }
        _ => panic!("expected say subcommand for argv={argv:?}"),
    }
}

#[test]
fn say_requires_text() {
    assert!(Args::try_parse_from(["chatstream", "say"]).is_err());
}

#[test]
fn global_flags_work_after_subcommands() {
    let argv = [
        "chatstream",
        "sessions",
        "list",
        "--base-url",
        "http://backend:8080",
        "--log",
        "chat.log",
    ];
    let args = parse_args(&argv);
    assert_eq!(args.base_url.as_deref(), Some("http://backend:8080"));
    assert_eq!(args.log.as_deref(), Some("chat.log"));
    assert!(matches!(
        args.command,
        Some(Commands::Sessions {
            command: SessionCommands::List
        })
    ));
}

#[test]
fn import_accepts_merge_flag() {
    let argv = ["chatstream", "sessions", "import", "backup.json", "--merge"];
    match parse_args(&argv).command {
        Some(Commands::Sessions {
            command: SessionCommands::Import { file, merge },
        }) => {
            assert_eq!(file, "backup.json");
            assert!(merge);
        }
        _ => panic!("expected sessions import for argv={argv:?}"),
    }
}

#[test]
fn config_set_takes_key_and_value() {
    let argv = ["chatstream", "config", "set", "heartbeat-interval", "30"];
    match parse_args(&argv).command {
        Some(Commands::Config {
            command: Some(ConfigCommands::Set { key, value }),
        }) => {
            assert_eq!(key, "heartbeat-interval");
            assert_eq!(value, "30");
        }
        _ => panic!("expected config set for argv={argv:?}"),
    }
}

#[test]
fn bare_config_shows_settings() {
    assert!(matches!(
        parse_args(&["chatstream", "config"]).command,
        Some(Commands::Config { command: None })
    ));
}

#[test]
fn ai_config_set_takes_a_json_argument() {
    assert!(matches!(
        parse_args(&["chatstream", "ai-config"]).command,
        Some(Commands::AiConfig { command: None })
    ));
    let argv = ["chatstream", "ai-config", "set", r#"{"model":"large"}"#];
    match parse_args(&argv).command {
        Some(Commands::AiConfig {
            command: Some(AiConfigCommands::Set { json }),
        }) => assert_eq!(json, r#"{"model":"large"}"#),
        _ => panic!("expected ai-config set for argv={argv:?}"),
    }
}

#[test]
fn mcp_subcommands_parse() {
    let argv = ["chatstream", "mcp", "add", "files", r#"{"command":"fs"}"#];
    match parse_args(&argv).command {
        Some(Commands::Mcp {
            command: McpCommands::Add { name, json },
        }) => {
            assert_eq!(name, "files");
            assert_eq!(json, r#"{"command":"fs"}"#);
        }
        _ => panic!("expected mcp add for argv={argv:?}"),
    }

    match parse_args(&["chatstream", "mcp", "connect", "files", "search"]).command {
        Some(Commands::Mcp {
            command: McpCommands::Connect { names },
        }) => assert_eq!(names, ["files", "search"]),
        _ => panic!("expected mcp connect"),
    }
    match parse_args(&["chatstream", "mcp", "connect"]).command {
        Some(Commands::Mcp {
            command: McpCommands::Connect { names },
        }) => assert!(names.is_empty()),
        _ => panic!("expected mcp connect without names"),
    }
    assert!(matches!(
        parse_args(&["chatstream", "mcp", "disconnect"]).command,
        Some(Commands::Mcp {
            command: McpCommands::Disconnect
        })
    ));
    assert!(Args::try_parse_from(["chatstream", "mcp", "remove"]).is_err());
}

use atasim::config::{DEFAULT_COMMAND_PORT, DEFAULT_STATUS_PORT};
use atasim::protocol::{Response, ResponseKind};
use atasim::telemetry::STATUS_END_MARKER;
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use colored::*;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time;

const DEFAULT_HOST: &str = "127.0.0.1";
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);
/// Multi-line replies (`BF LIST ... ALL`) are considered complete once the
/// connection stays quiet this long.
const RESPONSE_QUIET: Duration = Duration::from_millis(200);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let command_port = DEFAULT_COMMAND_PORT.to_string();
    let status_port = DEFAULT_STATUS_PORT.to_string();

    let matches = App::new("atactl")
        .version(env!("CARGO_PKG_VERSION"))
        .about("📡 Client for the ATA control interface simulator")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("host")
                .short("H")
                .long("host")
                .value_name("HOST")
                .help("Simulator host address")
                .takes_value(true)
                .default_value(DEFAULT_HOST)
                .global(true),
        )
        .arg(
            Arg::with_name("port")
                .short("p")
                .long("port")
                .value_name("PORT")
                .help("Command port")
                .takes_value(true)
                .default_value(&command_port)
                .global(true),
        )
        .arg(
            Arg::with_name("status-port")
                .long("status-port")
                .value_name("PORT")
                .help("Status port")
                .takes_value(true)
                .default_value(&status_port)
                .global(true),
        )
        .arg(
            Arg::with_name("format")
                .short("f")
                .long("format")
                .value_name("FORMAT")
                .help("Output format")
                .takes_value(true)
                .possible_values(&["text", "json"])
                .default_value("text")
                .global(true),
        )
        .subcommand(
            SubCommand::with_name("send")
                .about("Send one command line and print the response")
                .setting(AppSettings::TrailingVarArg)
                .setting(AppSettings::AllowLeadingHyphen)
                .arg(
                    Arg::with_name("words")
                        .help("Command words, e.g. bf list ants all")
                        .required(true)
                        .multiple(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("monitor")
                .about("Print status snapshots from the status stream")
                .arg(
                    Arg::with_name("count")
                        .short("n")
                        .long("count")
                        .value_name("N")
                        .help("Stop after N snapshots (0 = forever)")
                        .takes_value(true)
                        .default_value("0")
                        .validator(|v| {
                            v.parse::<u64>()
                                .map(|_| ())
                                .map_err(|_| "count must be a non-negative number".to_string())
                        }),
                ),
        )
        .get_matches();

    let host = matches.value_of("host").unwrap_or(DEFAULT_HOST);
    let format = matches.value_of("format").unwrap_or("text");

    match matches.subcommand() {
        ("send", Some(sub)) => {
            let port = parse_port(&matches, "port")?;
            handle_send(sub, host, port, format).await
        }
        ("monitor", Some(sub)) => {
            let port = parse_port(&matches, "status-port")?;
            let count = sub.value_of("count").unwrap_or("0").parse()?;
            handle_monitor(host, port, count, format).await
        }
        _ => Ok(()),
    }
}

fn parse_port(matches: &ArgMatches<'_>, name: &str) -> Result<u16, Box<dyn std::error::Error>> {
    let value = matches.value_of(name).unwrap_or_default();
    value
        .parse()
        .map_err(|_| format!("invalid {name}: {value}").into())
}

async fn connect(host: &str, port: u16) -> Result<TcpStream, Box<dyn std::error::Error>> {
    let addr = format!("{host}:{port}");
    match TcpStream::connect(&addr).await {
        Ok(stream) => Ok(stream),
        Err(e) => {
            eprintln!("{} Failed to connect to simulator at {}", "❌".red(), addr.bright_white());
            if e.kind() == std::io::ErrorKind::ConnectionRefused {
                eprintln!("{} Server is not running. Start it with:", "💡".yellow());
                eprintln!("   {}", "atasim -commandport <n> -statusport <n>".bright_cyan());
            }
            Err(e.into())
        }
    }
}

async fn handle_send(
    matches: &ArgMatches<'_>,
    host: &str,
    port: u16,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let command = matches
        .values_of("words")
        .map(|words| words.collect::<Vec<_>>().join(" "))
        .unwrap_or_default();

    let stream = connect(host, port).await?;
    let (reader, mut writer) = stream.into_split();
    writer.write_all(command.as_bytes()).await?;
    writer.write_all(b"\n").await?;

    let mut reader = BufReader::new(reader);
    let mut lines = Vec::new();
    let mut line = String::new();

    let first = time::timeout(RESPONSE_TIMEOUT, reader.read_line(&mut line)).await;
    match first {
        Ok(Ok(0)) => return Err("server closed connection".into()),
        Ok(Ok(_)) => lines.push(line.trim_end().to_owned()),
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => {
            eprintln!("{} Command timed out after {} seconds", "⏰".yellow(), RESPONSE_TIMEOUT.as_secs());
            return Err("command timeout".into());
        }
    }

    loop {
        line.clear();
        match time::timeout(RESPONSE_QUIET, reader.read_line(&mut line)).await {
            Ok(Ok(n)) if n > 0 => lines.push(line.trim_end().to_owned()),
            _ => break,
        }
    }
    while lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }

    let response = Response::classify(&lines.join("\n"));
    print_response(&command, &response, format)?;
    if response.is_failure() {
        std::process::exit(2);
    }
    Ok(())
}

fn print_response(command: &str, response: &Response, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    if format == "json" {
        let value = serde_json::json!({
            "command": command,
            "kind": response.kind,
            "message": response.message,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    match response.kind {
        ResponseKind::Ok => println!("{} {}", "✅".green(), "OK".bright_green()),
        ResponseKind::Ready => println!("{} {}", "READY:".bright_cyan(), response.message),
        ResponseKind::Error => println!("{} {}", "ERROR:".bright_red(), response.message.red()),
        ResponseKind::Warning => println!("{} {}", "WARNING:".yellow(), response.message),
        ResponseKind::Info => println!("{} {}", "INFO:".bright_blue(), response.message),
        ResponseKind::Data => println!("{}", response.message),
    }
    Ok(())
}

async fn handle_monitor(host: &str, port: u16, count: u64, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    if format != "json" {
        println!("{}", "📡 Monitoring status stream (Press Ctrl+C to stop)...".bright_blue().bold());
    }

    let stream = connect(host, port).await?;
    let mut reader = BufReader::new(stream);
    let mut snapshot: Vec<String> = Vec::new();
    let mut received = 0u64;
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            println!("{}", "Status stream closed".yellow());
            return Ok(());
        }

        let text = line.trim_end();
        if text.is_empty() {
            continue;
        }
        snapshot.push(text.to_owned());
        if text != STATUS_END_MARKER {
            continue;
        }

        print_snapshot(&snapshot, format)?;
        snapshot.clear();
        received += 1;
        if count != 0 && received >= count {
            return Ok(());
        }
    }
}

fn print_snapshot(lines: &[String], format: &str) -> Result<(), Box<dyn std::error::Error>> {
    if format == "json" {
        println!("{}", serde_json::to_string(&serde_json::json!({ "lines": lines }))?);
        return Ok(());
    }

    for line in lines {
        if line.starts_with("ARRAY:") {
            println!("{}", line.bright_blue().bold());
        } else if line.starts_with("TUNING") {
            println!("{}", line.bright_cyan());
        } else if line == STATUS_END_MARKER {
            println!("{}", line.dimmed());
        } else if line.contains(": SUBARRAY:") && !line.contains(" NSLEW 0 ") {
            println!("{}", line.yellow());
        } else {
            println!("{line}");
        }
    }
    Ok(())
}

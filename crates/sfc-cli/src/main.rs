use clap::{Parser, Subcommand};
use serde::Serialize;
use sfc_parser::ScriptParser;
use sfc_template::{parse_component, Component, ParserOptions, TemplateBody};
use std::path::Path;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sfc")]
#[command(about = "Inspect the syntax tree of single-file components")]
#[command(version)]
struct Cli {
    /// JSON file with parser options
    #[arg(long, global = true)]
    options: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Report script and template syntax errors
    Check {
        /// Input file
        path: String,
    },

    /// Print script and template tokens as JSON
    Tokens {
        /// Input file
        path: String,
    },

    /// Print the template syntax tree as JSON
    Ast {
        /// Input file
        path: String,
    },
}

#[derive(Serialize)]
struct TokenDump<'a> {
    script: &'a [sfc_lexer::Token],
    template: Option<&'a [sfc_lexer::Token]>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let options = load_options(cli.options.as_deref());

    match cli.command {
        Command::Check { path } => cmd_check(&path, options),
        Command::Tokens { path } => cmd_tokens(&path, options),
        Command::Ast { path } => cmd_ast(&path, options),
    }
}

fn read_source(path: &str) -> String {
    let p = Path::new(path);
    if !p.exists() {
        eprintln!("Error: file not found: {path}");
        std::process::exit(1);
    }
    match std::fs::read_to_string(p) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error reading {path}: {e}");
            std::process::exit(1);
        }
    }
}

fn load_options(path: Option<&str>) -> ParserOptions {
    let Some(path) = path else {
        return ParserOptions::default();
    };
    match serde_json::from_str(&read_source(path)) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error in options {path}: {e}");
            std::process::exit(1);
        }
    }
}

fn parse(path: &str, mut options: ParserOptions) -> Component {
    let source = read_source(path);
    if options.file_path.is_none() {
        options = options.with_file_path(path);
    }

    match parse_component(&source, &options, &ScriptParser) {
        Ok(component) => component,
        Err(e) => {
            eprintln!("{path}: {e}");
            std::process::exit(1);
        }
    }
}

fn print_json(value: &impl Serialize) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Error serializing output: {e}");
            std::process::exit(1);
        }
    }
}

fn cmd_check(path: &str, options: ParserOptions) {
    let component = parse(path, options);

    let errors = component
        .template_body
        .as_ref()
        .map(TemplateBody::syntax_errors)
        .unwrap_or_default();
    for error in &errors {
        eprintln!("{path}:{}:{}: {}", error.line, error.column, error.message);
    }
    if !errors.is_empty() {
        std::process::exit(1);
    }

    eprintln!("OK: {path}");
}

fn cmd_tokens(path: &str, options: ParserOptions) {
    let component = parse(path, options);
    print_json(&TokenDump {
        script: &component.tokens,
        template: component.template_body.as_ref().map(|body| body.tokens.tokens()),
    });
}

fn cmd_ast(path: &str, options: ParserOptions) {
    let component = parse(path, options);
    match &component.template_body {
        Some(body) => print_json(&body.tree(TemplateBody::ROOT)),
        None => {
            eprintln!("{path}: no template");
            std::process::exit(1);
        }
    }
}

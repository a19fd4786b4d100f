//! Tether CLI
//!
//! Usage:
//!   tether [OPTIONS] [FILE]
//!
//! Options:
//!   -c, --config <FILE>  Layout configuration (TOML format)
//!   -a, --attributes     Also list the registered attributes per view
//!   -v, --verbose        Log installer decisions to stderr
//!   -g, --grammar        Show script grammar reference
//!   -h, --help           Print help

use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use clap::Parser;

use tether::{run_with_config, LayoutConfig};

#[derive(Parser)]
#[command(name = "tether")]
#[command(about = "Declarative layout attributes solved into view frames")]
struct Cli {
    /// Input file (reads from stdin if not provided)
    input: Option<PathBuf>,

    /// Layout configuration file (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Also list the registered attributes per view
    #[arg(short, long)]
    attributes: bool,

    /// Log installer decisions to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Show script grammar reference
    #[arg(short, long)]
    grammar: bool,
}

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if cli.verbose { "debug" } else { "warn" }),
    )
    .init();

    if cli.grammar {
        print_grammar();
        return;
    }

    // If no input file and stdin is a terminal (interactive), show intro help
    if cli.input.is_none() && io::stdin().is_terminal() {
        print_intro();
        return;
    }

    let config = match &cli.config {
        Some(path) => match LayoutConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading config '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => LayoutConfig::default(),
    };

    let (source, filename) = match &cli.input {
        Some(path) => match fs::read_to_string(path) {
            Ok(content) => (content, path.display().to_string()),
            Err(e) => {
                eprintln!("Error reading file '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => {
            let mut buffer = String::new();
            match io::stdin().read_to_string(&mut buffer) {
                Ok(_) => (buffer, "<stdin>".to_string()),
                Err(e) => {
                    eprintln!("Error reading from stdin: {}", e);
                    std::process::exit(1);
                }
            }
        }
    };

    match run_with_config(&source, config) {
        Ok(session) => {
            print!("{}", session.frames());
            if cli.attributes {
                println!();
                print!("{}", session.attributes_report());
            }
        }
        Err(e) => {
            eprintln!("{}", e.format(&source, &filename));
            std::process::exit(1);
        }
    }
}

fn print_intro() {
    println!(
        r#"Tether - declarative layout attributes solved into view frames

USAGE:
    tether [OPTIONS] [FILE]
    echo '<script>' | tether

OPTIONS:
    -c, --config       Layout configuration (TOML file)
    -a, --attributes   Also list the registered attributes per view
    -v, --verbose      Log installer decisions
    -g, --grammar      Show script grammar reference
    -h, --help         Print help

QUICK START:
    echo 'view root [width: 320, height: 480]
          view card in root
          card <- [edges(16)]' | tether

This pins a card 16 points inside the root view and prints its frame.
Run --grammar for syntax reference."#
    );
}

fn print_grammar() {
    println!(
        r#"TETHER SCRIPT GRAMMAR
=====================

VIEWS
-----
view name [width: W, height: H]     Root view of a fixed size
view name in parent                 Child view
view name in parent [width: W]      Child view with fixed size attributes
view name                           Detached view (no container)
attach view to parent               Move a view under a new container
detach view                         Take a view out of its container
remove view                         Destroy a view and its subtree

ATTRIBUTES
----------
view <- attribute
view <- [attribute, attribute, ...]

Kinds: width, height, left, right, top, bottom,
       leading, trailing, center_x, center_y
Compounds: size(w, h), edges(inset), center(offset)

Constants:
    top(20)            equal to 20
    height(>= 40)      at least 40
    width(<= 200)      at most 200
    width(* 0.5)       half of the related attribute
    width(* 0.5 + 8)   half plus 8

Modifiers:
    .to(view)          relate to the same attribute of view
    .to(view, bottom)  relate to a specific attribute of view
    .with(high)        priority: required, high, low or a number
    .when(flag)        only install while flag is true
    .when(!flag)       only install while flag is false

FLAGS
-----
flag name = true|false              Declare a condition flag
set name = true|false               Change it (takes effect on reload)

RELOADING
---------
reload view                         Re-resolve what view declared
clear view                          Drop everything view declared

COMMENTS
--------
// line comment
/* block comment */"#
    );
}

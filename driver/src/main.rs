#![deny(rust_2018_idioms)]
use std::{cell::RefCell, fs, path::PathBuf, process, rc::Rc};

use clap::Parser;

use lex_parse::ast::{AstPrint, Visitor};
use lex_parse::context::Context;
use lex_parse::error::ErrorHandler;
use lex_parse::{lexer, parser};

/// Built-in sample compiled when no input file is given.
const SAMPLE: &str = "int main() { return 0; }";

#[derive(Parser, Debug)]
#[command(name = "czy-compile")]
#[command(about = "Front end for the Czy language: lexes a source file and \nparses it into an abstract syntax tree.", long_about = None)]
#[command(version)] // Read from `Cargo.toml`
struct Cli {
    // Print the token queue before parsing
    #[arg(short = 't', long = "tokens", default_value_t = false)]
    tokens: bool,

    // Print the AST after parsing
    #[arg(short = 'v', long = "verbose", default_value_t = false)]
    verbose: bool,

    #[arg(value_name = "INPUT_FILE")]
    input: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    let input_stream = match cli.input {
        Some(path) => match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(error) => {
                eprintln!("Invalid input file {:?}: {}", path, error);
                process::exit(1);
            }
        },
        None => String::from(SAMPLE),
    };

    // "Global" error handler, one per compilation unit.
    let handler = Rc::new(RefCell::new(ErrorHandler::new(&input_stream)));
    let context = Context::new();

    let mut lexer = lexer::Lexer::new(&input_stream, &context, handler.clone());
    let queue = lexer.tokenize();

    if cli.tokens {
        for token in queue.iter() {
            print!("{} ", token.describe(&context));
        }
        println!();
    }

    let mut parser = parser::Parser::new(queue, &context, handler.clone());
    let ast = parser.parse();

    if let Some(ast) = ast {
        if cli.verbose {
            let mut printer = AstPrint::new(false);
            printer.traverse(&ast);
        }
    }

    if handler.borrow().had_error {
        process::exit(1);
    }
}

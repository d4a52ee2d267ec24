use crate::frontend::token::Token;
use std::fmt::Write;

pub struct TokenDumper {
    pub color: bool,
    pub show_arg: bool, // if true, prints the raw argument next to the operand
}

impl Default for TokenDumper {
    fn default() -> Self {
        Self {
            color: true,
            show_arg: false,
        }
    }
}

impl TokenDumper {
    // ANSI colors
    const RESET: &'static str = "\x1b[0m";
    const DIM: &'static str = "\x1b[2m";
    const GRN: &'static str = "\x1b[32m";
    const YEL: &'static str = "\x1b[33m";
    const CYN: &'static str = "\x1b[36m";
    const MAG: &'static str = "\x1b[35m";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_color(mut self) -> Self {
        self.color = false;
        self
    }

    pub fn with_args(mut self) -> Self {
        self.show_arg = true;
        self
    }

    pub fn dump(&self, tokens: &[Token]) {
        print!("{}", self.render(tokens));
    }

    pub fn render(&self, tokens: &[Token]) -> String {
        let mut out = String::new();
        for token in tokens {
            self.write_one(&mut out, token);
        }
        out
    }

    fn write_one(&self, out: &mut String, token: &Token) {
        let colr = if self.color { Self::color(token) } else { "" };
        let reset = if self.color { Self::RESET } else { "" };

        let offset = token.offset.to_string();
        let _ = write!(out, "{:>6}\t{}{:<17}{}", offset, colr, token.kind, reset);
        match (self.show_arg, token.arg) {
            (true, Some(arg)) => {
                let _ = writeln!(out, " {:<5} {}", arg, token.pattr());
            }
            _ => {
                let _ = writeln!(out, " {}", token.pattr());
            }
        }
    }

    fn color(token: &Token) -> &'static str {
        let kind = token.kind.as_str();
        if token.is_come_from() {
            Self::DIM
        } else if kind.starts_with("JUMP") || kind.starts_with("SETUP_") || kind == "FOR_LOOP" {
            Self::MAG
        } else if kind == "LOAD_CONST" || kind == "LOAD_LAMBDA" {
            Self::GRN
        } else if kind.starts_with("STORE_") || kind.starts_with("DELETE_") {
            Self::YEL
        } else if kind.starts_with("LOAD_") || kind.starts_with("IMPORT_") {
            Self::CYN
        } else {
            Self::RESET
        }
    }
}

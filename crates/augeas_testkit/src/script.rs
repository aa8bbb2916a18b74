//! Command language run by [`MemoryEngine`](crate::MemoryEngine)'s `srun`.
//!
//! One command per line; blank lines and lines starting with `#` are
//! skipped. Arguments are separated by whitespace and may be quoted with
//! `'` or `"`.

/// A parsed script command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `set PATH [VALUE]`
    Set {
        /// Target path.
        path: String,
        /// New value.
        value: Option<String>,
    },
    /// `rm PATH`
    Rm(String),
    /// `defnode NAME EXPR [VALUE]`
    Defnode {
        /// Variable name.
        name: String,
        /// Expression.
        expr: String,
        /// Value of a created node.
        value: Option<String>,
    },
    /// `get PATH`
    Get(String),
    /// `match PATH [VALUE]`
    Match {
        /// Expression.
        path: String,
        /// Only list nodes with this value.
        value: Option<String>,
    },
    /// `save`
    Save,
    /// `load`
    Load,
    /// `quit`
    Quit,
}

/// Splits a line into arguments, honouring quotes.
pub fn tokenize(line: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        let Some(&first) = chars.peek() else {
            break;
        };

        let mut token = String::new();
        if first == '"' || first == '\'' {
            chars.next();
            let mut closed = false;
            while let Some(c) = chars.next() {
                match c {
                    c if c == first => {
                        closed = true;
                        break;
                    }
                    '\\' if first == '"' => match chars.next() {
                        Some('n') => token.push('\n'),
                        Some('t') => token.push('\t'),
                        Some(other) => token.push(other),
                        None => break,
                    },
                    c => token.push(c),
                }
            }
            if !closed {
                return Err(format!("unmatched {first}"));
            }
        } else {
            while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                token.push(c);
            }
        }
        tokens.push(token);
    }
    Ok(tokens)
}

fn arity(name: &str, args: &[String], min: usize, max: usize) -> Result<(), String> {
    if args.len() < min {
        Err(format!("Not enough arguments for {name}"))
    } else if args.len() > max {
        Err(format!("Too many arguments for {name}"))
    } else {
        Ok(())
    }
}

/// Parses one script line. Returns `None` for blank lines and comments.
pub fn parse_line(line: &str) -> Result<Option<Command>, String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let mut tokens = tokenize(trimmed)?;
    let name = tokens.remove(0);
    let args = tokens;
    let arg = |i: usize| args[i].clone();
    let opt = |i: usize| args.get(i).cloned();

    let command = match name.as_str() {
        "set" => {
            arity("set", &args, 1, 2)?;
            Command::Set {
                path: arg(0),
                value: opt(1),
            }
        }
        "rm" | "remove" => {
            arity("rm", &args, 1, 1)?;
            Command::Rm(arg(0))
        }
        "defnode" => {
            arity("defnode", &args, 2, 3)?;
            Command::Defnode {
                name: arg(0),
                expr: arg(1),
                value: opt(2),
            }
        }
        "get" => {
            arity("get", &args, 1, 1)?;
            Command::Get(arg(0))
        }
        "match" => {
            arity("match", &args, 1, 2)?;
            Command::Match {
                path: arg(0),
                value: opt(1),
            }
        }
        "save" => {
            arity("save", &args, 0, 0)?;
            Command::Save
        }
        "load" => {
            arity("load", &args, 0, 0)?;
            Command::Load
        }
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("Unknown command '{other}'")),
    };
    Ok(Some(command))
}

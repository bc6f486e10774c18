//! Reader for the circuit text format.
//!
//! One gate per line, refs dense and ascending:
//!
//! ```text
//! : test 01 1          # directive lines start with ':'
//! : outputs 2
//! 0 input 0
//! 1 input 1
//! 2 MUL 0 1
//! ```
//!
//! Gate lines are `<ref> input <wire>`, `<ref> const <value>`, or
//! `<ref> <OP> <arg> ...` with `OP` one of `ADD`, `SUB`, `MUL`, `SET`.  An
//! op name that is not a builtin is resolved through the circuit's
//! external-gate registry and constructed by the registered build
//! callback.  `#` starts a comment; blank lines are skipped.
//!
//! Directive lines dispatch through the circuit's command registry.  The
//! built-ins are `test` (one test vector: input and expected-output digit
//! strings, index 0 rightmost), `outputs`, and `secrets`; callers can
//! attach more via `Circuit::add_command` before parsing.

use std::fmt;
use std::io::{BufRead, BufReader, Read};

use log::info;

use crate::ir::circuit::{Circuit, Command, GateKind, Ref, TestVector};

/// A malformed source line.  Construction aborts at the first error; no
/// partially built circuit is ever returned.
#[derive(Debug)]
pub struct ParseError {
    pub line: usize,
    pub msg: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "parse error on line {}: {}", self.line, self.msg)
    }
}

impl std::error::Error for ParseError {}

fn err<T>(line: usize, msg: String) -> Result<T, ParseError> {
    Err(ParseError { line, msg })
}

/// Parse a circuit from source text.
pub fn read<R: Read>(input: R) -> Result<Circuit, ParseError> {
    let mut c = Circuit::new();
    read_into(&mut c, input)?;
    Ok(c)
}

/// Populate `c` from source text.  Lets the caller register external gates
/// and extra commands beforehand.  On failure `c` is reset to a fresh
/// circuit, so no partial build can leak out.
pub fn read_into<R: Read>(c: &mut Circuit, input: R) -> Result<(), ParseError> {
    match read_lines(c, input) {
        Ok(()) => {
            info!(
                "parsed circuit: {} refs, {} inputs, {} consts, {} outputs",
                c.nrefs(), c.ninputs(), c.nconsts(), c.outputs().len(),
            );
            Ok(())
        },
        Err(e) => {
            *c = Circuit::new();
            Err(e)
        },
    }
}

fn read_lines<R: Read>(c: &mut Circuit, input: R) -> Result<(), ParseError> {
    let reader = BufReader::new(input);
    for (idx, line) in reader.lines().enumerate() {
        let lineno = idx + 1;
        let line = match line {
            Ok(l) => l,
            Err(e) => return err(lineno, format!("read failed: {}", e)),
        };
        let line = match line.find('#') {
            Some(pos) => &line[..pos],
            None => &line[..],
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if line.starts_with(':') {
            run_command(c, lineno, &line[1..])?;
        } else {
            parse_gate_line(c, lineno, line)?;
        }
    }
    Ok(())
}

fn run_command(c: &mut Circuit, lineno: usize, rest: &str) -> Result<(), ParseError> {
    let words = rest.split_whitespace().collect::<Vec<_>>();
    if words.is_empty() {
        return err(lineno, "missing command name".to_owned());
    }
    let cmd = match c.commands().iter().find(|cmd| cmd.name == words[0]) {
        Some(&cmd) => cmd,
        None => return err(lineno, format!("unknown command {:?}", words[0])),
    };
    (cmd.run)(c, &words[1..]).or_else(|msg| err(lineno, msg))
}

fn parse_gate_line(c: &mut Circuit, lineno: usize, line: &str) -> Result<(), ParseError> {
    let words = line.split_whitespace().collect::<Vec<_>>();
    if words.len() < 2 {
        return err(lineno, format!("malformed gate line {:?}", line));
    }

    let r = parse_usize(lineno, words[0])?;
    if r != c.nrefs() {
        return err(lineno, format!("expected ref {}, found {}", c.nrefs(), r));
    }

    match words[1] {
        "input" => {
            if words.len() != 3 {
                return err(lineno, "input takes one argument".to_owned());
            }
            let wire = parse_usize(lineno, words[2])?;
            if wire != c.ninputs() {
                return err(lineno, format!(
                    "expected input wire {}, found {}", c.ninputs(), wire,
                ));
            }
            c.push_input();
        },
        "const" => {
            if words.len() != 3 {
                return err(lineno, "const takes one argument".to_owned());
            }
            let value = match words[2].parse::<i64>() {
                Ok(v) => v,
                Err(_) => return err(lineno, format!("bad constant {:?}", words[2])),
            };
            c.push_const(value);
        },
        op => {
            let args = parse_refs(c, lineno, &words[2..])?;
            let kind = match op {
                "ADD" => GateKind::Add(args),
                "SUB" => GateKind::Sub(args),
                "MUL" => GateKind::Mul(args),
                "SET" => {
                    if args.len() != 1 {
                        return err(lineno, "SET takes exactly one argument".to_owned());
                    }
                    GateKind::Set(args[0])
                },
                _ => return build_external(c, lineno, op, r, &args),
            };
            if kind.args().is_empty() {
                return err(lineno, format!("{} gate with no arguments", op));
            }
            if let Err(e) = c.push_gate(kind) {
                return err(lineno, e.to_string());
            }
        },
    }
    Ok(())
}

fn build_external(
    c: &mut Circuit,
    lineno: usize,
    op: &str,
    expected: Ref,
    args: &[Ref],
) -> Result<(), ParseError> {
    let ext = match c.take_extgate(op) {
        Some(ext) => ext,
        None => return err(lineno, format!("unknown op {:?}", op)),
    };
    let result = (ext.build)(c, args);
    c.put_extgate(op.to_owned(), ext);
    match result {
        // The build callback must produce the ref this line declares.
        Ok(r) if r == expected && c.nrefs() == expected + 1 => Ok(()),
        Ok(r) => err(lineno, format!(
            "external gate {:?} built ref {}, expected {}", op, r, expected,
        )),
        Err(e) => err(lineno, e.to_string()),
    }
}

fn parse_usize(lineno: usize, word: &str) -> Result<usize, ParseError> {
    match word.parse::<usize>() {
        Ok(x) => Ok(x),
        Err(_) => err(lineno, format!("bad number {:?}", word)),
    }
}

fn parse_refs(c: &Circuit, lineno: usize, words: &[&str]) -> Result<Vec<Ref>, ParseError> {
    let mut args = Vec::with_capacity(words.len());
    for word in words {
        let arg = parse_usize(lineno, word)?;
        if arg >= c.nrefs() {
            return err(lineno, format!("arg {} names a gate that doesn't exist yet", arg));
        }
        args.push(arg);
    }
    Ok(args)
}

pub(crate) fn builtin_commands() -> Vec<Command> {
    vec![
        Command { name: "test", run: cmd_test },
        Command { name: "outputs", run: cmd_outputs },
        Command { name: "secrets", run: cmd_secrets },
    ]
}

fn cmd_test(c: &mut Circuit, args: &[&str]) -> Result<(), String> {
    if args.len() != 2 {
        return Err(format!("test takes 2 arguments, got {}", args.len()));
    }
    let inputs = parse_digits(args[0])?;
    let outputs = parse_digits(args[1])?;
    c.add_test(TestVector { inputs, outputs });
    Ok(())
}

fn cmd_outputs(c: &mut Circuit, args: &[&str]) -> Result<(), String> {
    for word in args {
        let r = word.parse::<usize>().map_err(|_| format!("bad ref {:?}", word))?;
        c.add_output(r).map_err(|e| e.to_string())?;
    }
    Ok(())
}

fn cmd_secrets(c: &mut Circuit, args: &[&str]) -> Result<(), String> {
    for word in args {
        let r = word.parse::<usize>().map_err(|_| format!("bad ref {:?}", word))?;
        c.add_secret(r).map_err(|e| e.to_string())?;
    }
    Ok(())
}

/// One value per character, index 0 rightmost.
pub(crate) fn parse_digits(s: &str) -> Result<Vec<i64>, String> {
    s.chars().rev().map(|ch| {
        ch.to_digit(10)
            .map(|d| d as i64)
            .ok_or_else(|| format!("bad digit {:?} in {:?}", ch, s))
    }).collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::eval;

    #[test]
    fn parse_mul_circuit() {
        let src = "\
: test 11 1
: outputs 2
0 input 0
1 input 1
2 MUL 0 1
";
        let c = read(src.as_bytes()).unwrap();
        assert_eq!(c.nrefs(), 3);
        assert_eq!(c.ninputs(), 2);
        assert_eq!(c.outputs(), &[2]);
        assert_eq!(c.tests().len(), 1);
        assert_eq!(c.tests()[0].inputs, vec![1, 1]);
        assert_eq!(eval::eval(&c, 2, &[3, 4]), Ok(12));
    }

    #[test]
    fn comments_and_blanks_skipped() {
        let src = "\
# a circuit
0 input 0   # first input

1 SET 0
";
        let c = read(src.as_bytes()).unwrap();
        assert_eq!(c.nrefs(), 2);
    }

    #[test]
    fn test_digits_are_reversed() {
        let src = "\
: outputs 2
0 input 0
1 input 1
2 SUB 0 1
: test 01 1
";
        let c = read(src.as_bytes()).unwrap();
        // "01" means input 0 = 1, input 1 = 0.
        assert_eq!(c.tests()[0].inputs, vec![1, 0]);
        assert_eq!(eval::ensure(&c), Ok(true));
    }

    #[test]
    fn refs_must_be_dense() {
        let src = "\
0 input 0
2 SET 0
";
        let e = read(src.as_bytes()).unwrap_err();
        assert_eq!(e.line, 2);
    }

    #[test]
    fn forward_arg_rejected() {
        let src = "\
0 input 0
1 ADD 0 2
";
        assert!(read(src.as_bytes()).is_err());
    }

    #[test]
    fn unknown_command_rejected() {
        let e = read(": frobnicate 1 2\n".as_bytes()).unwrap_err();
        assert_eq!(e.line, 1);
        assert!(e.msg.contains("frobnicate"));
    }

    #[test]
    fn unknown_op_without_registration_rejected() {
        let src = "\
0 input 0
1 XOR 0 0
";
        assert!(read(src.as_bytes()).is_err());
    }

    #[test]
    fn external_gate_built_through_registry() {
        let src = "\
0 input 0
1 input 1
2 xor 0 1
: outputs 2
";
        let mut c = Circuit::new();
        c.register(
            "xor",
            Box::new(|c, args| c.push_external("xor", args.to_vec())),
            Box::new(|_, vals| Ok(vals[0] ^ vals[1])),
        ).unwrap();
        read_into(&mut c, src.as_bytes()).unwrap();
        assert_eq!(eval::eval(&c, 2, &[1, 1]), Ok(0));
        assert_eq!(eval::eval(&c, 2, &[0, 1]), Ok(1));
    }

    #[test]
    fn failed_parse_resets_circuit() {
        let mut c = Circuit::new();
        assert!(read_into(&mut c, "0 input 0\nbogus\n".as_bytes()).is_err());
        assert_eq!(c.nrefs(), 0);
    }

    #[test]
    fn custom_command_dispatch() {
        fn cmd_nop(_: &mut Circuit, _: &[&str]) -> Result<(), String> {
            Ok(())
        }
        let mut c = Circuit::new();
        c.add_command(Command { name: "nop", run: cmd_nop });
        read_into(&mut c, ": nop 1 2 3\n".as_bytes()).unwrap();
    }
}
